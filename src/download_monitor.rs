use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use log::{debug, info};

use crate::error::{Error, Result};
use crate::settings::Settings;

/// Extensions browsers give a file while it is still being written.
const PARTIAL_EXTENSIONS: [&str; 3] = ["crdownload", "part", "tmp"];

/// Watches the download directory until the browser's archive stops growing.
pub struct DownloadMonitor {
    dir: PathBuf,
    known: HashSet<OsString>,
    interval: Duration,
    timeout: Duration,
    stable_polls: u32,
}

#[derive(Debug, Clone, PartialEq)]
struct Observation {
    path: PathBuf,
    len: u64,
    modified: Option<SystemTime>,
}

impl DownloadMonitor {
    /// Remembers what is already in `dir` so only files created afterwards count.
    pub fn new(dir: &Path, interval: Duration, timeout: Duration, stable_polls: u32) -> Result<Self> {
        let known = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name())
            .collect::<HashSet<_>>();
        debug!("{} entries present in {:?} before download", known.len(), dir);
        Ok(DownloadMonitor {
            dir: dir.to_path_buf(),
            known,
            interval,
            timeout,
            stable_polls,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        DownloadMonitor::new(
            &settings.work_dir,
            settings.poll_interval(),
            settings.download_timeout(),
            settings.stable_polls,
        )
    }

    /// Blocks until a new `.zip` exists, no partial download remains, and the
    /// archive's size and mtime hold still for `stable_polls` polls in a row.
    pub fn wait_for_archive(&self) -> Result<PathBuf> {
        let started = Instant::now();
        let mut last: Option<Observation> = None;
        let mut stable = 0;

        loop {
            match self.observe()? {
                Some(current) if last.as_ref() == Some(&current) => {
                    stable += 1;
                    debug!("{:?} unchanged for {} poll(s)", current.path, stable);
                    if stable >= self.stable_polls {
                        info!("Download complete: {:?} ({} bytes)", current.path, current.len);
                        return Ok(current.path);
                    }
                }
                current => {
                    stable = 0;
                    last = current;
                }
            }

            if started.elapsed() >= self.timeout {
                return Err(Error::NotFound(format!(
                    "no finished archive appeared in {:?} within {:?}",
                    self.dir, self.timeout
                )));
            }
            info!("Waiting {:?} for download to settle...", self.interval);
            thread::sleep(self.interval);
        }
    }

    fn observe(&self) -> Result<Option<Observation>> {
        let mut newest: Option<(SystemTime, Observation)> = None;

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if self.known.contains(&entry.file_name()) {
                continue;
            }
            let path = entry.path();
            let extension = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();

            if PARTIAL_EXTENSIONS.contains(&extension.as_str()) {
                debug!("Partial download {:?} still present", path);
                return Ok(None);
            }
            if extension != "zip" {
                continue;
            }

            let meta = entry.metadata()?;
            let modified = meta.modified().ok();
            let observation = Observation { path, len: meta.len(), modified };
            let stamp = modified.unwrap_or(SystemTime::UNIX_EPOCH);
            if newest.as_ref().map_or(true, |(t, _)| stamp >= *t) {
                newest = Some((stamp, observation));
            }
        }
        Ok(newest.map(|(_, observation)| observation))
    }
}
