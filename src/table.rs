use std::fs::File;
use std::io::Write;
use std::path::Path;
use log::{info, warn};

use crate::error::Result;

/// Fill value for cells past the end of a shorter record.
pub const MISSING: f64 = f64::NAN;
const MISSING_TEXT: &str = "NaN";

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// One column per record file; row 0 is NPTS, row 1 is DT, the rest are samples.
#[derive(Debug, Clone, Default)]
pub struct AccelerogramTable {
    columns: Vec<Column>,
    rows: usize,
}

impl AccelerogramTable {
    /// Right-pads every column with [`MISSING`] to the longest one. Input order is kept.
    pub fn assemble(columns: Vec<(String, Vec<f64>)>) -> Self {
        let rows = columns.iter().map(|(_, values)| values.len()).max().unwrap_or(0);
        let columns = columns
            .into_iter()
            .map(|(name, mut values)| {
                values.resize(rows, MISSING);
                Column { name, values }
            })
            .collect();
        AccelerogramTable { columns, rows }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(file)?;
        info!("Saved {} columns x {} rows to {:?}", self.column_count(), self.row_count(), path);
        Ok(())
    }

    /// Header row of file names, NPTS as integers, padding as `NaN`.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        if self.is_empty() {
            warn!("Acceleration table is empty; writing an empty file");
            return Ok(());
        }

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(self.columns.iter().map(|c| c.name.as_str()))?;
        for row in 0..self.rows {
            csv_writer.write_record(self.columns.iter().map(|c| format_cell(row, c.values[row])))?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

fn format_cell(row: usize, value: f64) -> String {
    if value.is_nan() {
        MISSING_TEXT.to_string()
    } else if row == 0 {
        format!("{}", value as u64)
    } else {
        value.to_string()
    }
}
