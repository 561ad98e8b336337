pub mod accelerogram;
pub mod archive;
pub mod browser;
pub mod download_monitor;
pub mod error;
pub mod flatfile;
pub mod logger;
pub mod pipeline;
pub mod portal;
pub mod record_locator;
pub mod request;
pub mod settings;
pub mod table;

// Exporting types for convenience
pub use accelerogram::{AccelerogramParser, AccelerogramRecord};
pub use error::{Error, Result};
pub use record_locator::RecordLocator;
pub use request::{BrowserKind, Credentials, Database, Direction, DownloadRequest};
pub use settings::Settings;
pub use table::AccelerogramTable;
