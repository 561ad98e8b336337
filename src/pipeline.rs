use std::path::{Path, PathBuf};
use log::info;

use crate::accelerogram::AccelerogramParser;
use crate::archive;
use crate::browser::{SessionState, UiSession};
use crate::download_monitor::DownloadMonitor;
use crate::error::{Error, Result};
use crate::portal;
use crate::record_locator::RecordLocator;
use crate::request::DownloadRequest;
use crate::settings::Settings;
use crate::table::AccelerogramTable;

/// Locate, download, extract and tabulate, then save the CSV.
pub fn fetch(request: &DownloadRequest, settings: &Settings) -> Result<AccelerogramTable> {
    settings.validate()?;
    let file_names = RecordLocator::new(request.database()).locate(
        request.flatfile(),
        request.record_sequence_numbers(),
        request.directions(),
    )?;

    let archive = download(request, settings)?;
    let table = tabulate(settings, &archive, &file_names)?;
    table.write_csv(&settings.output_path())?;
    Ok(table)
}

/// Runs the portal session and returns the archive the browser wrote.
pub fn download(request: &DownloadRequest, settings: &Settings) -> Result<PathBuf> {
    if !settings.work_dir.is_dir() {
        return Err(Error::Configuration(format!(
            "work directory {:?} does not exist",
            settings.work_dir
        )));
    }
    let monitor = DownloadMonitor::from_settings(settings)?;
    let portal = request.database().portal();

    let mut session = UiSession::launch(request.browser(), settings)?;
    portal::run_workflow(portal, &mut session, request)?;

    session.advance(SessionState::Downloading)?;
    let archive = monitor.wait_for_archive()?;
    session.advance(SessionState::Done)?;
    session.close();
    Ok(archive)
}

/// Works on the newest archive already in `work_dir`: no browser involved.
pub fn extract(settings: &Settings, file_names: &[String]) -> Result<AccelerogramTable> {
    let latest = archive::find_latest_archive(&settings.work_dir)?;
    tabulate(settings, &latest, file_names)
}

/// Extracts `archive` into the canonical folder and parses `file_names` from it.
pub fn tabulate(settings: &Settings, archive: &Path, file_names: &[String]) -> Result<AccelerogramTable> {
    let dir = archive::extract_archive(
        archive,
        &settings.work_dir,
        &settings.extracted_dir_name,
        settings.on_existing_extracted_dir,
    )?;
    info!("Reading {} record files from {:?}", file_names.len(), dir);
    AccelerogramParser::new().build_table(&dir, file_names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use std::thread;
    use std::time::Duration;
    use zip::write::SimpleFileOptions;

    fn record(npts: usize, dt: &str) -> String {
        let mut text = String::from("PEER NGA STRONG MOTION DATABASE RECORD\nEVENT\nUNITS OF G\n");
        text.push_str(&format!("NPTS=  {}, DT=  {} SEC\n", npts, dt));
        let values: Vec<String> = (0..npts).map(|i| format!("{:.6}", i as f64 * 1e-4)).collect();
        for chunk in values.chunks(5) {
            text.push_str(&format!("  {}\n", chunk.join("  ")));
        }
        text
    }

    fn write_archive(path: &Path, files: &[(&str, String)]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, content) in files {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_extract_two_records_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(
            &dir.path().join("PEERNGARecords_Unscaled.zip"),
            &[("RSN1_A.AT2", record(20, "0.005")), ("RSN2_B.AT2", record(28, ".0100"))],
        );

        let settings = Settings::default().with_work_dir(dir.path());
        let names = vec!["RSN1_A.AT2".to_string(), "RSN2_B.AT2".to_string()];
        let table = extract(&settings, &names).unwrap();

        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 30);
        assert!(table.column("RSN1_A.AT2").unwrap().values[22].is_nan());
        assert_eq!(table.column("RSN2_B.AT2").unwrap().values[1], 0.01);

        table.write_csv(&settings.output_path()).unwrap();
        let csv = fs::read_to_string(dir.path().join("acceleration_data.csv")).unwrap();
        assert_eq!(csv.lines().count(), 31);
        assert!(csv.starts_with("RSN1_A.AT2,RSN2_B.AT2\n20,28\n"));
    }

    #[test]
    fn test_tabulate_uses_the_given_archive() {
        let dir = tempfile::tempdir().unwrap();
        let downloaded = dir.path().join("downloaded.zip");
        write_archive(&downloaded, &[("RSN1_A.AT2", record(20, "0.005"))]);
        thread::sleep(Duration::from_millis(50));
        write_archive(&dir.path().join("unrelated.zip"), &[("other.AT2", record(5, "0.01"))]);

        let settings = Settings::default().with_work_dir(dir.path());
        let table = tabulate(&settings, &downloaded, &["RSN1_A.AT2".to_string()]).unwrap();
        assert_eq!(table.column_count(), 1);
        assert_eq!(table.row_count(), 22);
        assert!(settings.work_dir.join("raw ground motion data").join("RSN1_A.AT2").exists());
    }

    #[test]
    fn test_extract_without_archive_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::default().with_work_dir(dir.path());
        let err = extract(&settings, &["RSN1_A.AT2".to_string()]).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
