use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use crediario::application::service::CrediarioService;
use crediario::config::Settings;
use crediario::domain::client::Cadence;
use crediario::domain::ids::InstallmentId;
use crediario::domain::ports::DataStoreBox;
use crediario::domain::report::Period;
use crediario::domain::route::GeoPoint;
use crediario::domain::session::Session;
use crediario::error::CrediarioError;
use crediario::infrastructure::clock::SystemClock;
use crediario::infrastructure::in_memory::InMemoryStore;
#[cfg(feature = "storage-rocksdb")]
use crediario::infrastructure::rocksdb::RocksDBStore;
use crediario::interfaces::csv::client_reader::ClientReader;
use crediario::interfaces::csv::record_writer::RecordWriter;
use crediario::telemetry;
use miette::{IntoDiagnostic, Result, miette};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Settings file layered over the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Account e-mail used to open the session
    #[arg(long, env = "CREDIARIO_EMAIL", global = true)]
    email: Option<String>,

    /// Account password used to open the session
    #[arg(long, env = "CREDIARIO_PASSWORD", global = true, hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register every client in a CSV file
    Import {
        /// Input clients CSV file
        input: PathBuf,
    },
    /// Print the installment schedule for a sale without saving anything
    Schedule {
        #[arg(long)]
        total: Decimal,
        #[arg(long)]
        cadence: Cadence,
        #[arg(long)]
        start: NaiveDate,
    },
    /// List clients in collection order
    Clients {
        #[arg(long)]
        search: Option<String>,
    },
    /// Record a full or partial payment for an installment
    Pay {
        installment: InstallmentId,
        amount: Decimal,
        /// New due date for the remainder of a partial payment
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Print today's totals and collections
    Dashboard,
    /// Flag pending installments past their due date
    Overdue,
    /// Plan a visit route around a location
    Route {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },
    /// Print the productivity report for a period
    Report {
        #[arg(long, value_enum, default_value_t = PeriodArg::Today)]
        period: PeriodArg,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum PeriodArg {
    Today,
    Week,
    Month,
}

impl From<PeriodArg> for Period {
    fn from(value: PeriodArg) -> Self {
        match value {
            PeriodArg::Today => Period::Today,
            PeriodArg::Week => Period::Week,
            PeriodArg::Month => Period::Month,
        }
    }
}

fn user_error(err: CrediarioError) -> miette::Report {
    miette!("{}", err.user_message())
}

fn open_store(db_path: Option<PathBuf>) -> Result<DataStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(db_path) => {
            let store = RocksDBStore::open(db_path).into_diagnostic()?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryStore::new()))
        }
        None => Ok(Box::new(InMemoryStore::new())),
    }
}

struct Credentials {
    email: Option<String>,
    password: Option<String>,
}

impl Credentials {
    fn sign_in(&self, service: &CrediarioService) -> Result<Session> {
        service
            .login(
                self.email.as_deref().unwrap_or_default(),
                self.password.as_deref().unwrap_or_default(),
            )
            .map_err(user_error)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).into_diagnostic()?;
    telemetry::init(&settings.log_filter);

    let store = open_store(cli.db_path)?;
    let service = CrediarioService::new(store, Arc::new(SystemClock), settings);
    let credentials = Credentials {
        email: cli.email,
        password: cli.password,
    };

    run(&service, &credentials, cli.command).await
}

async fn run(service: &CrediarioService, credentials: &Credentials, command: Command) -> Result<()> {
    let stdout = io::stdout();
    match command {
        Command::Schedule {
            total,
            cadence,
            start,
        } => {
            let plan = service
                .preview_schedule(total, cadence, start)
                .map_err(user_error)?;
            RecordWriter::new(stdout.lock())
                .write_plan(&plan)
                .into_diagnostic()?;
        }
        Command::Import { input } => {
            let session = credentials.sign_in(service)?;
            let file = File::open(input).into_diagnostic()?;
            let reader = ClientReader::new(file);
            let mut registered = Vec::new();
            for row in reader.clients() {
                match row {
                    Ok(new_client) => match service.register_client(&session, new_client).await {
                        Ok(registration) => registered.push(registration),
                        Err(e) => eprintln!("Error registering client: {}", e.user_message()),
                    },
                    Err(e) => eprintln!("Error reading client: {}", e),
                }
            }
            info!(count = registered.len(), "import finished");
            RecordWriter::new(stdout.lock())
                .write_registrations(&registered)
                .into_diagnostic()?;
        }
        Command::Clients { search } => {
            let session = credentials.sign_in(service)?;
            let summaries = service
                .list_clients(&session, search.as_deref())
                .await
                .map_err(user_error)?;
            RecordWriter::new(stdout.lock())
                .write_clients(&summaries)
                .into_diagnostic()?;
        }
        Command::Pay {
            installment,
            amount,
            due,
        } => {
            let session = credentials.sign_in(service)?;
            let receipt = service
                .record_payment(&session, installment, amount, due)
                .await
                .map_err(user_error)?;
            let reconciliation = receipt.reconciliation;
            let mut rows = vec![reconciliation.paid];
            rows.extend(reconciliation.remainder);
            RecordWriter::new(stdout.lock())
                .write_installments(&rows)
                .into_diagnostic()?;
            eprintln!("{}: {}", receipt.notice.title, receipt.notice.body);
        }
        Command::Dashboard => {
            let session = credentials.sign_in(service)?;
            let dashboard = service.dashboard(&session).await.map_err(user_error)?;
            RecordWriter::new(stdout.lock())
                .write_metrics(&dashboard.metrics)
                .into_diagnostic()?;
            if !dashboard.collections.is_empty() {
                println!();
                RecordWriter::new(stdout.lock())
                    .write_collections(&dashboard.collections)
                    .into_diagnostic()?;
            }
        }
        Command::Overdue => {
            let session = credentials.sign_in(service)?;
            let count = service.refresh_overdue(&session).await.map_err(user_error)?;
            println!("{count} installments marked overdue");
        }
        Command::Route { lat, lon } => {
            let session = credentials.sign_in(service)?;
            let origin = GeoPoint::new(lat, lon).map_err(user_error)?;
            let (plan, notice) = service
                .plan_route(&session, Some(origin))
                .await
                .map_err(user_error)?;
            RecordWriter::new(stdout.lock())
                .write_route(&plan)
                .into_diagnostic()?;
            eprintln!("{}: {}", notice.title, notice.body);
        }
        Command::Report { period } => {
            let session = credentials.sign_in(service)?;
            let report = service
                .productivity(&session, period.into())
                .await
                .map_err(user_error)?;
            RecordWriter::new(stdout.lock())
                .write_productivity(&report)
                .into_diagnostic()?;
        }
    }
    Ok(())
}
