use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use haul_core::{dataset::builtin_orders, next_status, OrderRecord, Status};
use haul_pipeline::{EventSink, Pipeline, PipelineConfig};
use tokio::signal;
use tracing::{info, warn};

mod console;

#[derive(Parser, Debug)]
#[command(name = "haulctl", version, about = "Haul shipment-order pipeline")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate and process orders until every one is offloaded
    Run {
        /// JSON or YAML list of {id, destination}; built-in demo set if omitted
        #[arg(long = "orders")]
        orders: Option<String>,
        #[command(flatten)]
        pacing: Pacing,
    },
    /// Print the order dataset
    Orders {
        #[arg(long = "orders")]
        orders: Option<String>,
    },
    /// Print the status that follows STATUS
    Next {
        /// Status label, e.g. "In-Transit" or "InTransit"
        status: String,
    },
    /// Print the lifecycle in order
    Statuses,
}

/// Per-flag overrides on top of `HAUL_*_MS` environment defaults.
#[derive(Args, Debug)]
struct Pacing {
    /// Pause after each dispatch (ms)
    #[arg(long = "dispatch-ms")]
    dispatch_ms: Option<u64>,
    /// Pause after each status update (ms)
    #[arg(long = "stage-ms")]
    stage_ms: Option<u64>,
    /// Longest idle wait on an empty buffer (ms)
    #[arg(long = "poll-ms")]
    poll_ms: Option<u64>,
    /// Processor head-start delay (ms)
    #[arg(long = "start-delay-ms")]
    start_delay_ms: Option<u64>,
}

impl Pacing {
    fn apply(&self, mut cfg: PipelineConfig) -> PipelineConfig {
        use std::time::Duration;
        if let Some(ms) = self.dispatch_ms { cfg.dispatch_interval = Duration::from_millis(ms); }
        if let Some(ms) = self.stage_ms { cfg.stage_interval = Duration::from_millis(ms); }
        if let Some(ms) = self.poll_ms { cfg.poll_interval = Duration::from_millis(ms); }
        if let Some(ms) = self.start_delay_ms { cfg.start_delay = Duration::from_millis(ms); }
        cfg
    }
}

fn init_tracing() {
    let env = std::env::var("HAUL_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("HAUL_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid HAUL_METRICS_ADDR; expected host:port");
        }
    }
}

/// Load records from `path` (YAML for `.yaml`/`.yml`, JSON otherwise), or the
/// built-in set. Ids must be unique.
fn load_orders(path: Option<&str>) -> Result<Vec<OrderRecord>> {
    let Some(path) = path else { return Ok(builtin_orders()) };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading orders from {}", path))?;
    let is_yaml = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
        .unwrap_or(false);
    let records: Vec<OrderRecord> = if is_yaml {
        serde_yaml::from_str(&text).with_context(|| format!("parsing YAML orders in {}", path))?
    } else {
        serde_json::from_str(&text).with_context(|| format!("parsing JSON orders in {}", path))?
    };
    let mut seen = std::collections::HashSet::new();
    for r in &records {
        if !seen.insert(r.id.as_str()) {
            bail!("duplicate order id {} in {}", r.id, path);
        }
    }
    Ok(records)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { orders, pacing } => {
            let records = load_orders(orders.as_deref())?;
            let config = pacing.apply(PipelineConfig::from_env());
            info!(orders = records.len(), ?config, "run invoked");

            let sink: Arc<dyn EventSink> = match cli.output {
                Output::Human => Arc::new(console::HumanSink),
                Output::Json => Arc::new(console::JsonLinesSink),
            };
            let pipeline = Pipeline::new(config).with_sink(sink);
            let cancel = pipeline.signal();

            if cli.output == Output::Human {
                println!("\nLOGISTICS TRACKING SYSTEM - STARTING\n");
            }
            let mut task = tokio::task::spawn_blocking(move || pipeline.run(records));
            let outcome = tokio::select! {
                res = &mut task => res.context("joining pipeline task")?,
                _ = signal::ctrl_c() => {
                    warn!("Ctrl-C received; cancelling pipeline");
                    cancel.cancel();
                    task.await.context("joining pipeline task")?
                }
            };
            let report = outcome.context("pipeline run failed")?;

            match cli.output {
                Output::Human => println!("\nAll shipments processed ({} of {}). System shutting down.", report.processed_count, report.total_orders),
                Output::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
        Commands::Orders { orders } => {
            let records = load_orders(orders.as_deref())?;
            match cli.output {
                Output::Human => {
                    println!("ID           DESTINATION");
                    for r in &records {
                        println!("{:<12} {}", r.id, r.destination);
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&records)?),
            }
        }
        Commands::Next { status } => {
            let next = next_status(&status)?;
            match cli.output {
                Output::Human => match next {
                    Some(n) => println!("{}", n),
                    None => println!("(terminal)"),
                },
                Output::Json => {
                    #[derive(serde::Serialize)]
                    struct Row<'a> { status: &'a str, next: Option<Status> }
                    println!("{}", serde_json::to_string_pretty(&Row { status: &status, next })?);
                }
            }
        }
        Commands::Statuses => match cli.output {
            Output::Human => {
                let labels: Vec<_> = Status::ALL.iter().map(|s| s.label()).collect();
                println!("{}", labels.join(" -> "));
            }
            Output::Json => println!("{}", serde_json::to_string_pretty(&Status::ALL)?),
        },
    }

    Ok(())
}
