//! Blastwatch CLI - submit BLAST searches and follow them to results

mod catalog_args;
mod input;
mod output;
mod settings;

use anyhow::{bail, Context, Result};
use blastwatch_core::application::{
    CatalogService, JobCoordinator, JobSubmitter, PollPolicy, SearchView, ValidatedSearch,
};
use blastwatch_core::domain::{validate_sequence, Algorithm, JobId, SearchParameters};
use blastwatch_core::port::{BlastService, InMemoryRecordStore};
use blastwatch_core::AppError;
use blastwatch_infra_http::HttpBlastService;
use catalog_args::CatalogArgs;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use settings::ClientConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const PROGRESS_TEMPLATE: &str =
    "{spinner:.cyan} [{elapsed_precise}] {bar:30.cyan/blue} {pos:>3}% {msg}";

#[derive(Parser)]
#[command(name = "blastwatch")]
#[command(about = "Submit BLAST searches and follow them to results", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: <config dir>/blastwatch/config.toml)
    #[arg(long, global = true, env = "BLASTWATCH_CONFIG")]
    config: Option<String>,

    /// Compute service URL (overrides config)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Poll interval in milliseconds (overrides config)
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,

    /// Per-request timeout in seconds (overrides config)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Poll attempts before giving up, 0 = unbounded (overrides config)
    #[arg(long, global = true)]
    max_poll_attempts: Option<u32>,
}

#[derive(Args)]
struct SearchArgs {
    /// Query sequence, `@file` (FASTA or raw) or `-` for stdin
    sequence: String,

    /// BLAST program
    #[arg(short, long, default_value = "blastp")]
    algorithm: Algorithm,

    /// E-value threshold
    #[arg(short, long)]
    evalue: Option<f64>,

    /// Substitution matrix
    #[arg(short, long)]
    matrix: Option<String>,

    #[arg(long)]
    word_size: Option<u32>,

    #[arg(long)]
    gap_open: Option<u32>,

    #[arg(long, requires = "gap_open")]
    gap_extend: Option<u32>,

    /// Maximum number of target sequences
    #[arg(long)]
    max_hits: Option<u32>,
}

impl SearchArgs {
    fn to_params(&self) -> Result<SearchParameters> {
        let sequence = input::read_sequence(&self.sequence)?;
        let mut params = SearchParameters::new(sequence, self.algorithm);
        if let Some(evalue) = self.evalue {
            params = params.with_evalue(evalue);
        }
        if let Some(matrix) = &self.matrix {
            params = params.with_matrix(matrix);
        }
        if let Some(word_size) = self.word_size {
            params = params.with_word_size(word_size);
        }
        if let (Some(open), Some(extend)) = (self.gap_open, self.gap_extend) {
            params = params.with_gap_costs(open, extend);
        }
        if let Some(max_hits) = self.max_hits {
            params = params.with_max_hits(max_hits);
        }
        Ok(params)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a search, follow it and print the hits
    Search {
        #[command(flatten)]
        search: SearchArgs,

        /// Print the result set as JSON
        #[arg(long)]
        json: bool,

        /// Hits to show in the table
        #[arg(short = 'n', long, default_value = "25")]
        limit: usize,
    },

    /// Submit a search and print its job id
    Submit {
        #[command(flatten)]
        search: SearchArgs,
    },

    /// Show the status of a job
    Status {
        job_id: JobId,

        #[arg(long)]
        json: bool,
    },

    /// Fetch the results of a completed job
    Results {
        job_id: JobId,

        #[arg(long)]
        json: bool,

        #[arg(short = 'n', long, default_value = "25")]
        limit: usize,
    },

    /// Validate a sequence locally without submitting it
    Validate {
        /// Sequence, `@file` or `-`
        sequence: String,
    },

    /// Check the compute service is up
    Health,

    /// Query a JSON record file (array of rows, or object of tables)
    Catalog {
        file: String,

        /// Table to query
        #[arg(short, long, default_value = "records")]
        table: String,

        /// Equality filter, column=value (repeatable)
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// Numeric range, column=min..max (either side optional)
        #[arg(long = "range")]
        ranges: Vec<String>,

        /// Case-insensitive pattern, column=pattern (`%` wildcard)
        #[arg(long = "like")]
        likes: Vec<String>,

        /// Array overlap, column=a,b,c
        #[arg(long = "overlaps")]
        overlaps: Vec<String>,

        /// Sort column, optionally `:desc`
        #[arg(long)]
        sort: Option<String>,

        #[arg(long, default_value = "0")]
        offset: u64,

        #[arg(long, default_value = "25")]
        limit: u64,

        #[arg(long)]
        json: bool,
    },
}

/// Logs go to stderr so stdout carries only command output
fn init_tracing() -> Result<WorkerGuard> {
    let log_format =
        std::env::var("BLASTWATCH_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("blastwatch=info"))
        .context("Failed to create env filter")?;

    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(writer))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(writer))
                .init();
        }
    }

    Ok(guard)
}

impl Cli {
    /// Config file + env, then command-line overrides
    fn client_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::load(self.config.as_deref())?;
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval_ms = ms.max(1);
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout_secs = secs.max(1);
        }
        if let Some(attempts) = self.max_poll_attempts {
            config.max_poll_attempts = attempts;
        }
        Ok(config)
    }
}

fn connect(config: &ClientConfig) -> Result<Arc<dyn BlastService>> {
    let service = HttpBlastService::builder(&config.base_url)
        .timeout(config.request_timeout())
        .build()
        .with_context(|| format!("Invalid service URL {}", config.base_url))?;
    Ok(Arc::new(service))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_tracing()?;
    let cli = Cli::parse();

    match &cli.command {
        Commands::Search {
            search,
            json,
            limit,
        } => {
            let config = cli.client_config()?;
            let params = search.to_params()?;
            run_search(connect(&config)?, config.poll_policy(), params, *json, *limit).await
        }

        Commands::Submit { search } => {
            let config = cli.client_config()?;
            let validated = ValidatedSearch::new(search.to_params()?)?;
            let handle = JobSubmitter::new(connect(&config)?)
                .submit(&validated)
                .await?;
            println!("{}", handle.id);
            Ok(())
        }

        Commands::Status { job_id, json } => {
            let config = cli.client_config()?;
            let status = connect(&config)?.status(job_id).await?.normalized();
            if *json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                output::print_status(&status);
            }
            Ok(())
        }

        Commands::Results {
            job_id,
            json,
            limit,
        } => {
            let config = cli.client_config()?;
            match connect(&config)?.results(job_id).await {
                Ok(result) if *json => {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                    Ok(())
                }
                Ok(result) => {
                    output::print_result_set(&result, *limit);
                    Ok(())
                }
                Err(AppError::NotReady(id)) => bail!("Results for job {} are not ready yet", id),
                Err(e) => Err(e.into()),
            }
        }

        Commands::Validate { sequence } => {
            let raw = input::read_sequence(sequence)?;
            let validated = validate_sequence(&raw)?;
            println!(
                "{} {} sequence, {} residues",
                "✓".green().bold(),
                validated.kind(),
                validated.len()
            );
            Ok(())
        }

        Commands::Health => {
            let config = cli.client_config()?;
            let report = connect(&config)?.health().await?;
            println!("  {} {}", "Service:".bold(), config.base_url);
            if report.is_healthy() {
                println!("  {} {}", "Status:".bold(), report.status.to_uppercase().green());
            } else {
                println!("  {} {}", "Status:".bold(), report.status.to_uppercase().red());
            }
            for (key, value) in &report.details {
                println!("  {} {}", format!("{}:", key).bold(), value);
            }
            if !report.is_healthy() {
                bail!("Service reported status '{}'", report.status);
            }
            Ok(())
        }

        Commands::Catalog {
            file,
            table,
            filters,
            ranges,
            likes,
            overlaps,
            sort,
            offset,
            limit,
            json,
        } => {
            let args = CatalogArgs {
                table: table.clone(),
                filters: filters.clone(),
                ranges: ranges.clone(),
                likes: likes.clone(),
                overlaps: overlaps.clone(),
                sort: sort.clone(),
                offset: *offset,
                limit: *limit,
            };
            run_catalog(file, &args, *json).await
        }
    }
}

async fn run_search(
    service: Arc<dyn BlastService>,
    policy: PollPolicy,
    params: SearchParameters,
    json: bool,
    limit: usize,
) -> Result<()> {
    let coordinator = JobCoordinator::new(service, policy);
    let handle = coordinator.submit(params).await?;
    info!(job_id = %handle.id, "Following job");

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template(PROGRESS_TEMPLATE).context("Invalid progress template")?,
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar.set_message(format!("job {}", handle.id));

    let mut rx = coordinator.subscribe();
    let view = loop {
        let view = rx.borrow_and_update().clone();
        render_progress(&bar, &view);
        if view.is_settled() {
            break view;
        }
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break coordinator.snapshot();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                coordinator.clear();
                bar.abandon_with_message("cancelled");
                bail!("Search cancelled; job {} keeps running on the service", handle.id);
            }
        }
    };
    bar.finish_and_clear();
    debug!(poll_count = view.poll_count, phase = %view.phase, "Search settled");

    if let Some(error) = &view.error {
        bail!("{} ({:?})", error.message, error.kind);
    }
    let Some(result) = view.result else {
        bail!("Search ended without a result");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(result.as_ref())?);
    } else {
        output::print_result_set(&result, limit);
    }
    Ok(())
}

fn render_progress(bar: &ProgressBar, view: &SearchView) {
    bar.set_position(u64::from(view.progress()));
    if let Some(status) = &view.status {
        let eta = view
            .estimated_time_remaining()
            .map(|s| format!(" ~{}s left", s))
            .unwrap_or_default();
        bar.set_message(format!(
            "job {} {}{}",
            status.job_id,
            output::state_label(status.status),
            eta
        ));
    }
    if view.is_loading_result {
        bar.set_message("fetching results");
    }
}

async fn run_catalog(file: &str, args: &CatalogArgs, json: bool) -> Result<()> {
    let path = shellexpand::tilde(file).into_owned();
    let text = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path))?;
    let data: Value =
        serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path))?;

    let store = InMemoryRecordStore::new();
    match data {
        Value::Array(rows) => store.load(args.table.clone(), rows)?,
        Value::Object(tables) => {
            for (name, rows) in tables {
                match rows {
                    Value::Array(rows) => store.load(name, rows)?,
                    _ => bail!("Table '{}' in {} is not an array of rows", name, path),
                }
            }
        }
        _ => bail!("{} must hold an array of rows or an object of tables", path),
    }

    let query = args.to_query()?;
    let page = CatalogService::new(Arc::new(store)).search(&query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        output::print_records(&page);
    }
    Ok(())
}
