use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use log::{info, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::settings::ExistingDirPolicy;

/// The `.zip` in `dir` with the latest creation time (mtime where the
/// filesystem does not record creation).
pub fn find_latest_archive(dir: &Path) -> Result<PathBuf> {
    let mut latest: Option<(SystemTime, PathBuf)> = None;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_zip = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("zip"));
        if !is_zip || !path.is_file() {
            continue;
        }

        let meta = entry.metadata()?;
        let stamp = meta.created().or_else(|_| meta.modified())?;
        if latest.as_ref().map_or(true, |(t, _)| stamp > *t) {
            latest = Some((stamp, path));
        }
    }

    match latest {
        Some((_, path)) => {
            info!("Latest archive: {:?}", path);
            Ok(path)
        }
        None => Err(Error::NotFound(format!(
            "no downloaded .zip archive in {:?}; check that the download finished",
            dir
        ))),
    }
}

/// Unpacks `archive` next to itself, then renames the folder to `canonical_name`
/// inside `work_dir`. Returns the canonical folder. A previous canonical folder is
/// only touched once the new archive has been fully extracted.
pub fn extract_archive(
    archive: &Path,
    work_dir: &Path,
    canonical_name: &str,
    policy: ExistingDirPolicy,
) -> Result<PathBuf> {
    let canonical = work_dir.join(canonical_name);
    if canonical.exists() && policy == ExistingDirPolicy::Refuse {
        return Err(Error::Configuration(format!(
            "{:?} already exists from an earlier run",
            canonical
        )));
    }

    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file).map_err(|e| zip_error(archive, e))?;

    let stem = archive
        .file_stem()
        .ok_or_else(|| Error::Format(format!("{:?} has no file name", archive)))?;
    let mut staging = work_dir.join(stem);
    if staging == canonical {
        let mut name = stem.to_os_string();
        name.push(".extracting");
        staging = work_dir.join(name);
    }
    if staging.exists() {
        return Err(Error::Configuration(format!(
            "staging folder {:?} already exists; remove it and retry",
            staging
        )));
    }

    if let Err(e) = zip.extract(&staging) {
        if staging.exists() {
            remove_path(&staging)?;
        }
        return Err(zip_error(archive, e));
    }
    info!("Extracted {} entries from {:?}", zip.len(), archive);

    if canonical.exists() {
        warn!("Replacing previous extraction {:?}", canonical);
        remove_path(&canonical)?;
    }
    fs::rename(&staging, &canonical)?;
    Ok(canonical)
}

fn zip_error(archive: &Path, err: ZipError) -> Error {
    match err {
        ZipError::Io(e) => Error::Io(e),
        other => Error::Format(format!("{:?} is not a valid zip archive: {}", archive, other)),
    }
}

fn remove_path(path: &Path) -> Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::thread;
    use std::time::Duration;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, files: &[(&str, &str)]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, content) in files {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_no_archive_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "not an archive").unwrap();
        assert!(matches!(find_latest_archive(dir.path()), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_latest_archive_wins() {
        let dir = tempfile::tempdir().unwrap();
        write_zip(&dir.path().join("first.zip"), &[("a.AT2", "a")]);
        thread::sleep(Duration::from_millis(50));
        write_zip(&dir.path().join("second.zip"), &[("b.AT2", "b")]);

        assert_eq!(find_latest_archive(dir.path()).unwrap(), dir.path().join("second.zip"));
    }

    #[test]
    fn test_extract_renames_to_canonical_folder() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("PEERNGARecords_Unscaled.zip");
        write_zip(&archive, &[("RSN1_A.AT2", "one"), ("RSN2_B.AT2", "two")]);

        let out = extract_archive(&archive, dir.path(), "raw ground motion data", ExistingDirPolicy::Replace)
            .unwrap();
        assert_eq!(out, dir.path().join("raw ground motion data"));
        assert_eq!(fs::read_to_string(out.join("RSN2_B.AT2")).unwrap(), "two");
        assert!(!dir.path().join("PEERNGARecords_Unscaled").exists());
    }

    #[test]
    fn test_existing_canonical_folder_policy() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("records.zip");
        write_zip(&archive, &[("new.AT2", "new")]);
        let canonical = dir.path().join("raw");
        fs::create_dir(&canonical).unwrap();
        fs::write(canonical.join("stale.AT2"), "old").unwrap();

        let err = extract_archive(&archive, dir.path(), "raw", ExistingDirPolicy::Refuse).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(canonical.join("stale.AT2").exists());

        extract_archive(&archive, dir.path(), "raw", ExistingDirPolicy::Replace).unwrap();
        assert!(!canonical.join("stale.AT2").exists());
        assert!(canonical.join("new.AT2").exists());
    }

    #[test]
    fn test_corrupt_archive_keeps_previous_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("raw");
        fs::create_dir(&canonical).unwrap();
        fs::write(canonical.join("good.AT2"), "kept").unwrap();
        let archive = dir.path().join("broken.zip");
        fs::write(&archive, "truncated download").unwrap();

        let err = extract_archive(&archive, dir.path(), "raw", ExistingDirPolicy::Replace).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        assert_eq!(fs::read_to_string(canonical.join("good.AT2")).unwrap(), "kept");
    }

    #[test]
    fn test_leftover_staging_keeps_previous_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("raw");
        fs::create_dir(&canonical).unwrap();
        fs::write(canonical.join("good.AT2"), "kept").unwrap();
        let archive = dir.path().join("records.zip");
        write_zip(&archive, &[("new.AT2", "new")]);
        fs::create_dir(dir.path().join("records")).unwrap();

        let err = extract_archive(&archive, dir.path(), "raw", ExistingDirPolicy::Replace).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(canonical.join("good.AT2").exists());
    }

    #[test]
    fn test_archive_named_like_canonical_folder() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("raw.zip");
        write_zip(&archive, &[("new.AT2", "new")]);
        fs::create_dir(dir.path().join("raw")).unwrap();
        fs::write(dir.path().join("raw").join("stale.AT2"), "old").unwrap();

        let out = extract_archive(&archive, dir.path(), "raw", ExistingDirPolicy::Replace).unwrap();
        assert!(out.join("new.AT2").exists());
        assert!(!out.join("stale.AT2").exists());
    }

    #[test]
    fn test_corrupt_archive_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.zip");
        fs::write(&archive, "this is not a zip file at all").unwrap();

        let err = extract_archive(&archive, dir.path(), "raw", ExistingDirPolicy::Replace).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }
}
