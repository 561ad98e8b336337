use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::portal::{self, Portal};

/// The two PEER ground-motion databases we know how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Database {
    NgaWest2,
    NgaSub,
}

impl Database {
    pub fn portal(self) -> &'static dyn Portal {
        match self {
            Database::NgaWest2 => &portal::west2::NgaWest2,
            Database::NgaSub => &portal::sub::NgaSub,
        }
    }
}

impl FromStr for Database {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "nga west2" | "nga-west2" | "west2" => Ok(Database::NgaWest2),
            "nga sub" | "nga-sub" | "sub" => Ok(Database::NgaSub),
            other => Err(Error::Configuration(format!(
                "invalid database name '{}', choose 'NGA West2' or 'NGA Sub'",
                other
            ))),
        }
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Database::NgaWest2 => f.write_str("NGA West2"),
            Database::NgaSub => f.write_str("NGA Sub"),
        }
    }
}

/// Recording component of a three-component accelerogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Horizontal1,
    Horizontal2,
    Vertical,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let token: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match token.as_str() {
            "horizontal1" | "h1" => Ok(Direction::Horizontal1),
            "horizontal2" | "h2" => Ok(Direction::Horizontal2),
            "vertical" | "v" => Ok(Direction::Vertical),
            _ => Err(Error::Validation(format!(
                "invalid direction '{}', choose 'horizontal 1', 'horizontal 2' or 'vertical'",
                s
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Horizontal1 => f.write_str("horizontal 1"),
            Direction::Horizontal2 => f.write_str("horizontal 2"),
            Direction::Vertical => f.write_str("vertical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Chrome,
    Edge,
}

impl FromStr for BrowserKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "chrome" | "chromium" => Ok(BrowserKind::Chrome),
            "edge" | "msedge" => Ok(BrowserKind::Edge),
            other => Err(Error::Configuration(format!(
                "unsupported browser '{}', choose 'chrome' or 'edge'",
                other
            ))),
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything one download run needs. Fields are private; construct through [`DownloadRequest::new`].
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    credentials: Credentials,
    database: Database,
    flatfile: PathBuf,
    record_sequence_numbers: Vec<u64>,
    directions: Vec<Direction>,
    browser: BrowserKind,
}

impl DownloadRequest {
    pub fn new(
        credentials: Credentials,
        database: &str,
        flatfile: impl Into<PathBuf>,
        record_sequence_numbers: Vec<u64>,
        directions: &[impl AsRef<str>],
        browser: &str,
    ) -> Result<Self> {
        let database = database.parse::<Database>()?;
        let browser = browser.parse::<BrowserKind>()?;
        let flatfile = flatfile.into();

        if flatfile.as_os_str().is_empty() {
            return Err(Error::Validation("flatfile path is empty".into()));
        }
        if record_sequence_numbers.is_empty() {
            return Err(Error::Validation("no record sequence numbers requested".into()));
        }
        if directions.is_empty() {
            return Err(Error::Validation("no ground motion directions requested".into()));
        }
        let directions = directions
            .iter()
            .map(|d| d.as_ref().parse::<Direction>())
            .collect::<Result<Vec<_>>>()?;

        Ok(DownloadRequest {
            credentials,
            database,
            flatfile,
            record_sequence_numbers,
            directions,
            browser,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn database(&self) -> Database {
        self.database
    }

    pub fn flatfile(&self) -> &Path {
        &self.flatfile
    }

    pub fn record_sequence_numbers(&self) -> &[u64] {
        &self.record_sequence_numbers
    }

    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    pub fn browser(&self) -> BrowserKind {
        self.browser
    }

    /// RSNs in the form the portal search boxes expect: `1,2,3`.
    pub fn rsn_query(&self) -> String {
        self.record_sequence_numbers
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}
