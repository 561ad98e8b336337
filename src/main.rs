use gm_downloader_lib::{logger, pipeline};
use gm_downloader_lib::{Credentials, Database, Direction, DownloadRequest, RecordLocator, Settings};

use std::error::Error;
use std::path::PathBuf;
use clap::{Args, Parser, Subcommand};
use log::{error, info};

#[derive(Parser)]
#[command(author, version, about = "Download and tabulate PEER NGA accelerograms", long_about = None)]
struct Cli {
    /// JSON settings file; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Download target and output folder (overrides the settings file)
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in, export the records, then extract and tabulate them
    Fetch {
        #[command(flatten)]
        records: RecordArgs,
        #[arg(long)]
        email: String,
        #[arg(long, env = "GM_PASSWORD", hide_env_values = true)]
        password: String,
        /// chrome or edge
        #[arg(long, default_value = "chrome")]
        browser: String,
    },
    /// Tabulate the newest archive already in the work directory
    Extract {
        #[command(flatten)]
        records: RecordArgs,
    },
}

#[derive(Args)]
struct RecordArgs {
    /// "NGA West2" or "NGA Sub"
    #[arg(long)]
    database: String,
    #[arg(long)]
    flatfile: PathBuf,
    /// Record sequence numbers, comma separated or repeated
    #[arg(long = "rsn", value_delimiter = ',', required = true)]
    rsns: Vec<u64>,
    /// "horizontal 1", "horizontal 2" or "vertical"; may be repeated
    #[arg(long = "direction", default_value = "horizontal 1")]
    directions: Vec<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    if let Err(e) = run(cli) {
        error!("{}", e);
        return Err(e);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(dir) = cli.work_dir {
        settings = settings.with_work_dir(dir);
    }
    settings.validate()?;

    match cli.command {
        Commands::Fetch { records, email, password, browser } => {
            let request = DownloadRequest::new(
                Credentials { email, password },
                &records.database,
                records.flatfile,
                records.rsns,
                &records.directions,
                &browser,
            )?;
            let table = pipeline::fetch(&request, &settings)?;
            info!("Fetched {} records.", table.column_count());
        }
        Commands::Extract { records } => {
            let database = records.database.parse::<Database>()?;
            let directions = records
                .directions
                .iter()
                .map(|d| d.parse::<Direction>())
                .collect::<Result<Vec<_>, _>>()?;
            let names = RecordLocator::new(database).locate(&records.flatfile, &records.rsns, &directions)?;
            let table = pipeline::extract(&settings, &names)?;
            table.write_csv(&settings.output_path())?;
        }
    }
    Ok(())
}
