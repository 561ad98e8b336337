use std::fs::File;
use std::path::Path;
use log::{debug, info};
use calamine::{open_workbook_auto, Data, Reader};

use crate::error::{Error, Result};
use crate::request::Direction;

/// Column headers of one database's flatfile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatfileSchema {
    pub rsn: &'static str,
    pub horizontal_1: &'static str,
    pub horizontal_2: &'static str,
    pub vertical: &'static str,
}

pub const WEST2_SCHEMA: FlatfileSchema = FlatfileSchema {
    rsn: "Record Sequence Number",
    horizontal_1: "File Name (Horizontal 1)",
    horizontal_2: "File Name (Horizontal 2)",
    vertical: "File Name (Vertical)",
};

pub const SUB_SCHEMA: FlatfileSchema = FlatfileSchema {
    rsn: "NGAsubRSN",
    horizontal_1: "accFilePathH1",
    horizontal_2: "accFilePathH2",
    vertical: "accFilePathV",
};

#[derive(Debug, Clone, PartialEq)]
pub struct FlatfileRow {
    pub rsn: u64,
    pub horizontal_1: String,
    pub horizontal_2: String,
    pub vertical: String,
}

impl FlatfileRow {
    pub fn source_path(&self, direction: Direction) -> &str {
        match direction {
            Direction::Horizontal1 => &self.horizontal_1,
            Direction::Horizontal2 => &self.horizontal_2,
            Direction::Vertical => &self.vertical,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Flatfile {
    rows: Vec<FlatfileRow>,
}

impl Flatfile {
    #[cfg(test)]
    fn from_rows(rows: Vec<FlatfileRow>) -> Self {
        Flatfile { rows }
    }

    /// Loads a flatfile, choosing the spreadsheet or CSV reader from the extension.
    pub fn load<P: AsRef<Path>>(path: P, schema: &FlatfileSchema) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::Configuration(format!("flatfile {:?} not found", path)));
        }

        let is_excel = path.extension().map_or(false, |ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            ext == "xlsx" || ext == "xls" || ext == "xlsm"
        });

        let flatfile = if is_excel {
            load_excel(path, schema)?
        } else {
            load_csv(path, schema)?
        };
        info!("Loaded {} flatfile rows from {:?}", flatfile.rows.len(), path);
        Ok(flatfile)
    }

    /// Source file path of one component. Exactly one row must carry the RSN.
    pub fn lookup(&self, rsn: u64, direction: Direction) -> Result<&str> {
        let mut matches = self.rows.iter().filter(|r| r.rsn == rsn);
        let row = match (matches.next(), matches.next()) {
            (Some(row), None) => row,
            (None, _) => {
                return Err(Error::Flatfile(format!("RSN {} is not in the flatfile", rsn)));
            }
            (Some(_), Some(_)) => {
                let count = 2 + matches.count();
                return Err(Error::Flatfile(format!(
                    "RSN {} matches {} flatfile rows, expected exactly one",
                    rsn, count
                )));
            }
        };

        let path = row.source_path(direction).trim();
        if path.is_empty() {
            return Err(Error::Flatfile(format!(
                "RSN {} has no {} file in the flatfile",
                rsn, direction
            )));
        }
        Ok(path)
    }
}

struct ColumnIndex {
    rsn: usize,
    horizontal_1: usize,
    horizontal_2: usize,
    vertical: usize,
}

impl ColumnIndex {
    fn from_headers<S: AsRef<str>>(headers: &[S], schema: &FlatfileSchema) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.as_ref().trim() == name)
                .ok_or_else(|| Error::Flatfile(format!("flatfile is missing column '{}'", name)))
        };
        Ok(ColumnIndex {
            rsn: find(schema.rsn)?,
            horizontal_1: find(schema.horizontal_1)?,
            horizontal_2: find(schema.horizontal_2)?,
            vertical: find(schema.vertical)?,
        })
    }

    fn row<S: AsRef<str>>(&self, cells: &[S]) -> Option<FlatfileRow> {
        let cell = |i: usize| cells.get(i).map(|c| c.as_ref().trim().to_string()).unwrap_or_default();
        let rsn = parse_rsn(&cell(self.rsn))?;
        Some(FlatfileRow {
            rsn,
            horizontal_1: cell(self.horizontal_1),
            horizontal_2: cell(self.horizontal_2),
            vertical: cell(self.vertical),
        })
    }
}

/// Spreadsheets hand integers back as floats, so `12.0` is accepted as RSN 12.
fn parse_rsn(cell: &str) -> Option<u64> {
    if let Ok(rsn) = cell.parse::<u64>() {
        return Some(rsn);
    }
    match cell.parse::<f64>() {
        Ok(v) if v >= 0.0 && v.fract() == 0.0 => Some(v as u64),
        _ => None,
    }
}

fn load_csv(path: &Path, schema: &FlatfileSchema) -> Result<Flatfile> {
    let file = File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let index = ColumnIndex::from_headers(&headers, schema)?;

    let mut rows = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result?;
        let cells: Vec<&str> = record.iter().collect();
        match index.row(&cells) {
            Some(row) => rows.push(row),
            None => debug!("Skipping CSV row {} without a numeric RSN", line + 2),
        }
    }
    Ok(Flatfile { rows })
}

fn load_excel(path: &Path, schema: &FlatfileSchema) -> Result<Flatfile> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| Error::Flatfile(format!("could not open spreadsheet {:?}: {}", path, e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Flatfile(format!("spreadsheet {:?} has no worksheets", path)))?
        .map_err(|e| Error::Flatfile(format!("could not read first worksheet of {:?}: {}", path, e)))?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(header) => header.iter().map(cell_text).collect(),
        None => return Err(Error::Flatfile(format!("spreadsheet {:?} is empty", path))),
    };
    let index = ColumnIndex::from_headers(&headers, schema)?;

    let mut rows = Vec::new();
    for (line, row) in sheet_rows.enumerate() {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        match index.row(&cells) {
            Some(row) => rows.push(row),
            None => debug!("Skipping spreadsheet row {} without a numeric RSN", line + 2),
        }
    }
    Ok(Flatfile { rows })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_sub_flatfile(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("NGAsub_flatfile.csv");
        fs::write(
            &path,
            "NGAsubRSN,EQID,accFilePathH1,accFilePathH2,accFilePathV\n\
             1000001,3000,Chile/ev1/STA_HNE.AT2,Chile/ev1/STA_HNN.AT2,Chile/ev1/STA_HNZ.AT2\n\
             1000002,3000,Chile/ev1/STB_HNE.AT2,Chile/ev1/STB_HNN.AT2,\n\
             ,,,,\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_load_csv_skips_rows_without_rsn() {
        let dir = tempfile::tempdir().unwrap();
        let flatfile = Flatfile::load(write_sub_flatfile(dir.path()), &SUB_SCHEMA).unwrap();
        assert_eq!(flatfile.rows.len(), 2);
        assert_eq!(flatfile.rows[1].horizontal_2, "Chile/ev1/STB_HNN.AT2");
    }

    #[test]
    fn test_lookup_requires_exactly_one_row() {
        let row = |rsn| FlatfileRow {
            rsn,
            horizontal_1: "a.AT2".into(),
            horizontal_2: "b.AT2".into(),
            vertical: "c.AT2".into(),
        };
        let flatfile = Flatfile::from_rows(vec![row(1), row(2), row(2)]);

        assert_eq!(flatfile.lookup(1, Direction::Vertical).unwrap(), "c.AT2");
        assert!(matches!(flatfile.lookup(2, Direction::Vertical), Err(Error::Flatfile(_))));
        assert!(matches!(flatfile.lookup(9, Direction::Vertical), Err(Error::Flatfile(_))));
    }

    #[test]
    fn test_lookup_rejects_blank_component() {
        let dir = tempfile::tempdir().unwrap();
        let flatfile = Flatfile::load(write_sub_flatfile(dir.path()), &SUB_SCHEMA).unwrap();
        assert!(matches!(flatfile.lookup(1000002, Direction::Vertical), Err(Error::Flatfile(_))));
    }

    #[test]
    fn test_missing_column_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sub_flatfile(dir.path());
        assert!(matches!(Flatfile::load(&path, &WEST2_SCHEMA), Err(Error::Flatfile(_))));
        assert!(matches!(
            Flatfile::load(dir.path().join("absent.csv"), &SUB_SCHEMA),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_parse_rsn_accepts_spreadsheet_floats() {
        assert_eq!(parse_rsn("12"), Some(12));
        assert_eq!(parse_rsn("12.0"), Some(12));
        assert_eq!(parse_rsn("12.5"), None);
        assert_eq!(parse_rsn(""), None);
    }
}
