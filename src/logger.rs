use log::LevelFilter;
use env_logger::Builder;
use std::io::Write;
use chrono::Local;

/// Environment variable that overrides the default filter, e.g. `GM_LOG=gm_downloader_lib=debug`.
pub const LOG_ENV: &str = "GM_LOG";

pub fn init(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level);

    if let Ok(spec) = std::env::var(LOG_ENV) {
        builder.parse_filters(&spec);
    }

    // A second init (tests, embedding) keeps the first logger.
    if builder.try_init().is_ok() {
        log::debug!("Logger initialized at {}.", level);
    }
}
