use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use excel_exporter::batch::BatchOrchestrator;
use excel_exporter::duplicate::XlsxDuplicator;
use excel_exporter::model::{BatchResult, Record};
use excel_exporter::store::RecordStore;
use excel_exporter::{ExportError, Result};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(error) = init_logging() {
        eprintln!("error: {error}");
        return ExitCode::FAILURE;
    }
    match run(cli) {
        Ok(status) => status,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| ExportError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Export(args) => execute_export(args),
        Command::Records { store, action } => {
            execute_records(&store, action)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn execute_export(args: ExportArgs) -> Result<ExitCode> {
    let duplicator = XlsxDuplicator::new().with_record_stamp(!args.no_stamp);
    let orchestrator = BatchOrchestrator::new(duplicator);

    let result = if args.records.is_empty() {
        let mut store = RecordStore::open(&args.store)?;
        store.seed_defaults()?;
        orchestrator.run_source(&store, &args.template, &args.output_dir)?
    } else {
        orchestrator.run(&args.records, &args.template, &args.output_dir)?
    };

    println!("{}", result.summary());
    if let Some(report) = &args.report {
        write_report(report, &result)?;
    }

    if result.has_failures() {
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn write_report(path: &Path, result: &BatchResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn execute_records(path: &Path, action: RecordsAction) -> Result<()> {
    let mut store = RecordStore::open(path)?;
    match action {
        RecordsAction::List => {
            for record in store.records() {
                println!("{}\t{}", record.id, record.name);
            }
        }
        RecordsAction::Add { name } => {
            let record = store.insert(&name)?;
            println!("{}\t{}", record.id, record.name);
        }
        RecordsAction::Seed => {
            if store.seed_defaults()? {
                println!("seeded {} default record(s)", store.records().len());
            } else {
                println!("store already holds {} record(s)", store.records().len());
            }
        }
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Duplicate a template workbook once per record."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write one copy of the template per record.
    Export(ExportArgs),
    /// Inspect or edit the persisted record store.
    Records {
        /// Record store file.
        #[arg(long, default_value = "records.json")]
        store: PathBuf,

        #[command(subcommand)]
        action: RecordsAction,
    },
}

#[derive(clap::Args)]
struct ExportArgs {
    /// Template workbook to duplicate.
    #[arg(long, default_value = "Data/input.xlsx")]
    template: PathBuf,

    /// Directory receiving the derived files. Created when missing.
    #[arg(long)]
    output_dir: PathBuf,

    /// Record store used when no --record is given.
    #[arg(long, default_value = "records.json")]
    store: PathBuf,

    /// Inline record as ID:NAME; repeat for several. Bypasses the store.
    #[arg(long = "record", value_name = "ID:NAME")]
    records: Vec<Record>,

    /// Do not append the record row to each copy.
    #[arg(long)]
    no_stamp: bool,

    /// Write the batch result as JSON to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Subcommand)]
enum RecordsAction {
    /// Print every record.
    List,
    /// Add a record with the next free id.
    Add {
        #[arg(long)]
        name: String,
    },
    /// Insert the default records into an empty store.
    Seed,
}
