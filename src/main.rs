use chrono::NaiveDate;
use clap::Parser;
use mallard_trends::config::Config;
use mallard_trends::report::{self, HostScope, ReportContext, ReportKind};
use mallard_trends::sink::JsonDirSink;
use mallard_trends::source::DuckDbSource;
use mallard_trends::storage;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "mallard-trends")]
#[command(about = "Monthly trend reports over Mallard event data", long_about = None)]
struct Cli {
    /// Config file (TOML)
    #[arg(long, short = 'c', conflicts_with = "domain")]
    config: Option<PathBuf>,

    /// Load conf/config.<DOMAIN>.toml
    #[arg(long, short = 'd')]
    domain: Option<String>,

    /// Hostname scope: all, portal, or a subdomain name
    #[arg(long, short = 'm', default_value = "all")]
    module: HostScope,

    /// Report to run; repeat for several. Runs every report when omitted.
    #[arg(long, short = 'r')]
    report: Vec<ReportKind>,

    /// Output directory for sheet documents
    #[arg(long, short = 'o')]
    out: Option<PathBuf>,

    /// Data directory holding the Parquet archive
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Last day covered by the reports (defaults to today)
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mallard_trends=info".into());
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config_path = cli
        .config
        .clone()
        .or_else(|| cli.domain.as_deref().map(Config::path_for_domain));
    let mut config = Config::load(config_path.as_deref());
    if let Some(out) = cli.out {
        config.out_dir = out;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    let today = cli
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let kinds = if cli.report.is_empty() {
        ReportKind::ALL.to_vec()
    } else {
        cli.report
    };

    tracing::info!(
        site_id = %config.site_id,
        scope = %cli.module,
        today = %today,
        reports = kinds.len(),
        out_dir = %config.out_dir.display(),
        "Starting Mallard Trends"
    );

    let conn = match storage::open(config.database.as_deref(), &config.archive_dir()) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open event database");
            return ExitCode::FAILURE;
        }
    };
    let source = DuckDbSource::new(conn, config.site_id.clone());
    let mut sink = match JsonDirSink::new(&config.out_dir) {
        Ok(sink) => sink,
        Err(e) => {
            tracing::error!(error = %e, "Failed to prepare output directory");
            return ExitCode::FAILURE;
        }
    };

    let ctx = ReportContext {
        config: &config,
        scope: cli.module,
        today,
        source: &source,
    };
    let mut failed = 0usize;
    for kind in kinds {
        if let Err(e) = report::run(kind, &ctx, &mut sink) {
            tracing::error!(report = %kind, error = %e, "Report failed");
            failed += 1;
        }
    }

    if failed > 0 {
        tracing::error!(failed, "Finished with failed reports");
        ExitCode::FAILURE
    } else {
        tracing::info!(written = sink.written().len(), "Finished");
        ExitCode::SUCCESS
    }
}
