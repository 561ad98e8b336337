use std::fs;
use std::path::Path;
use regex::Regex;
use log::{info, warn};

use crate::error::{Error, Result};
use crate::table::AccelerogramTable;

/// Lines before the `NPTS=.. DT=..` line in a PEER `.AT2` file.
pub const HEADER_LINES_SKIPPED: usize = 3;
/// Samples per data line.
pub const VALUES_PER_LINE: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct AccelerogramRecord {
    pub npts: usize,
    /// Sampling interval in seconds.
    pub dt: f64,
    pub samples: Vec<f64>,
}

impl AccelerogramRecord {
    /// `[npts, dt, sample0, sample1, ...]`
    pub fn to_column(&self) -> Vec<f64> {
        let mut column = Vec::with_capacity(self.samples.len() + 2);
        column.push(self.npts as f64);
        column.push(self.dt);
        column.extend_from_slice(&self.samples);
        column
    }
}

pub struct AccelerogramParser {
    npts_regex: Regex,
    dt_regex: Regex,
}

impl Default for AccelerogramParser {
    fn default() -> Self {
        Self::new()
    }
}

impl AccelerogramParser {
    pub fn new() -> Self {
        AccelerogramParser {
            npts_regex: Regex::new(r"NPTS=\s*(\d+)").unwrap(),
            // DT must carry a decimal point, e.g. "DT= .0050 SEC"
            dt_regex: Regex::new(r"DT=\s*(\d*\.\d+)").unwrap(),
        }
    }

    pub fn parse_header(&self, line: &str) -> Option<(usize, f64)> {
        let npts = self.npts_regex.captures(line)?.get(1)?.as_str().parse().ok()?;
        let dt = self.dt_regex.captures(line)?.get(1)?.as_str().parse().ok()?;
        Some((npts, dt))
    }

    /// `Ok(None)` means the header is malformed and the record should be left out.
    pub fn parse_str(&self, name: &str, content: &str) -> Result<Option<AccelerogramRecord>> {
        let mut lines = content.lines();
        let header = lines.nth(HEADER_LINES_SKIPPED);

        let (npts, dt) = match header.and_then(|line| self.parse_header(line)) {
            Some(fields) => fields,
            None => {
                warn!("File {} has incorrect format. Skipping file.", name);
                return Ok(None);
            }
        };

        let data_lines = npts.div_ceil(VALUES_PER_LINE);
        // NPTS is untrusted until the data lines are read.
        let mut samples = Vec::with_capacity(npts.min(content.len()));
        for (i, line) in lines.take(data_lines).enumerate() {
            for token in line.split_whitespace() {
                let value = token.parse::<f64>().map_err(|_| {
                    Error::Format(format!(
                        "{}: data line {} has non-numeric value '{}'",
                        name,
                        HEADER_LINES_SKIPPED + 2 + i,
                        token
                    ))
                })?;
                samples.push(value);
            }
        }

        if samples.len() != npts {
            warn!("{}: header says NPTS={} but {} samples were read", name, npts, samples.len());
        }
        Ok(Some(AccelerogramRecord { npts, dt, samples }))
    }

    pub fn parse_file(&self, path: &Path) -> Result<Option<AccelerogramRecord>> {
        let content = fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.parse_str(&name, &content)
    }

    /// Parses `file_names` from `dir` in order and pads them into one table.
    /// Files with malformed headers are left out.
    pub fn build_table(&self, dir: &Path, file_names: &[String]) -> Result<AccelerogramTable> {
        let mut columns = Vec::with_capacity(file_names.len());
        for name in file_names {
            if let Some(record) = self.parse_file(&dir.join(name))? {
                columns.push((name.clone(), record.to_column()));
            }
        }

        let skipped = file_names.len() - columns.len();
        let table = AccelerogramTable::assemble(columns);
        info!(
            "Built acceleration table: {} columns x {} rows ({} skipped)",
            table.column_count(),
            table.row_count(),
            skipped
        );
        Ok(table)
    }
}
