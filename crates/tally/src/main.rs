mod output;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tally_core::agg::Aggregator;
use tally_core::config::Config;
use tally_core::model::metric::{CalcType, Metric, NewMetric};
use tally_core::model::point::MetricPoint;
use tally_core::time::{parse_duration_str, parse_time_or_relative};
use tally_store::Store;
use tracing_subscriber::EnvFilter;

use crate::output::{
    print_metrics_human, print_series_human, print_status_human, print_value_human,
};

#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Local metric point recorder and bucket aggregation utility")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[arg(long, global = true, help = "Deadline for store access (e.g. 5s)")]
    timeout: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(subcommand, about = "Manage metric definitions")]
    Metric(MetricCommands),
    #[command(about = "Record one metric point")]
    Record {
        metric_id: i64,
        #[arg(allow_hyphen_values = true)]
        value: f64,
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        counter: i64,
        #[arg(long, help = "Point time: RFC3339 or a look-back like 5m")]
        at: Option<String>,
    },
    #[command(subcommand, about = "Compute one bucket value")]
    Query(QueryCommands),
    #[command(subcommand, about = "Compute a labeled series of bucket values")]
    Series(SeriesCommands),
    Status,
    #[command(about = "Delete points older than the retention window")]
    Prune {
        #[arg(long, help = "Override the configured retention window (e.g. 30d)")]
        older_than: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum MetricCommands {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        suffix: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "sum")]
        calc_type: String,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        default_value: f64,
        #[arg(long, default_value_t = 0)]
        places: u32,
    },
    Set {
        metric_id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        suffix: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        calc_type: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        default_value: Option<f64>,
        #[arg(long)]
        places: Option<u32>,
    },
    List,
}

#[derive(Subcommand, Debug)]
enum QueryCommands {
    #[command(about = "Minute bucket at now minus offsets")]
    LastHour {
        metric_id: i64,
        #[arg(long, default_value_t = 0)]
        hours_ago: u32,
        #[arg(long, default_value_t = 0)]
        minutes_ago: u32,
    },
    #[command(about = "Hour bucket at now minus offset")]
    ByHour {
        metric_id: i64,
        #[arg(long, default_value_t = 0)]
        hours_ago: u32,
    },
    #[command(about = "Calendar day bucket at now minus offset")]
    Day {
        metric_id: i64,
        #[arg(long, default_value_t = 0)]
        days_ago: u32,
    },
}

#[derive(Subcommand, Debug)]
enum SeriesCommands {
    #[command(about = "61 minute buckets covering the last hour")]
    LastHour { metric_id: i64 },
    #[command(about = "Hour buckets covering the last N hours")]
    Hours {
        metric_id: i64,
        #[arg(long, default_value_t = 24)]
        hours: u32,
    },
    #[command(about = "Seven day buckets covering the last week")]
    Week { metric_id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Cli {
        command,
        json,
        db_path,
        timeout,
    } = Cli::parse();
    init_cli_tracing();

    let cfg = Config::load().context("load config")?;
    let db_path = db_path.unwrap_or(cfg.db_path.clone());
    let deadline = timeout.as_deref().map(parse_duration_str).transpose()?;

    let store = Store::open(&db_path)?;
    tracing::debug!(db = %db_path.display(), "store ready");

    match command {
        Commands::Metric(cmd) => run_metric(cmd, store, json, deadline).await,
        Commands::Record {
            metric_id,
            value,
            counter,
            at,
        } => run_record(store, metric_id, value, counter, at, json, deadline).await,
        Commands::Query(cmd) => run_query(cmd, store, json, deadline).await,
        Commands::Series(cmd) => run_series(cmd, store, json, deadline).await,
        Commands::Status => run_status(store, json, deadline).await,
        Commands::Prune { older_than } => {
            run_prune(store, cfg, older_than, json, deadline).await
        }
    }
}

fn init_cli_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .compact()
        .try_init();
}

async fn run_blocking<T, F>(deadline: Option<Duration>, f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> tally_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::task::spawn_blocking(f);
    let joined = match deadline {
        Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
            anyhow::anyhow!(
                "store access exceeded deadline of {}",
                humantime::format_duration(limit)
            )
        })?,
        None => task.await,
    };
    Ok(joined.context("store task failed")??)
}

async fn fetch_metric(
    store: &Store,
    metric_id: i64,
    deadline: Option<Duration>,
) -> anyhow::Result<Metric> {
    let store = store.clone();
    run_blocking(deadline, move || store.get_metric(metric_id))
        .await?
        .ok_or_else(|| anyhow::anyhow!("metric not found: {metric_id}"))
}

async fn run_metric(
    cmd: MetricCommands,
    store: Store,
    json: bool,
    deadline: Option<Duration>,
) -> anyhow::Result<()> {
    match cmd {
        MetricCommands::Add {
            name,
            suffix,
            description,
            calc_type,
            default_value,
            places,
        } => {
            let new = NewMetric {
                name,
                suffix,
                description,
                calc_type: CalcType::from_str(&calc_type)?,
                default_value,
                places,
            };
            let metric = run_blocking(deadline, move || store.insert_metric(&new)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&metric)?);
            } else {
                println!("created metric id={} name={}", metric.id, metric.name);
            }
            Ok(())
        }
        MetricCommands::Set {
            metric_id,
            name,
            suffix,
            description,
            calc_type,
            default_value,
            places,
        } => {
            let mut metric = fetch_metric(&store, metric_id, deadline).await?;
            if let Some(v) = name {
                metric.name = v;
            }
            if let Some(v) = suffix {
                metric.suffix = v;
            }
            if let Some(v) = description {
                metric.description = v;
            }
            if let Some(v) = calc_type {
                metric.calc_type = CalcType::from_str(&v)?;
            }
            if let Some(v) = default_value {
                metric.default_value = v;
            }
            if let Some(v) = places {
                metric.places = v;
            }

            let updated = metric.clone();
            run_blocking(deadline, move || store.update_metric(&updated)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&metric)?);
            } else {
                println!("updated metric id={}", metric.id);
            }
            Ok(())
        }
        MetricCommands::List => {
            let metrics = run_blocking(deadline, move || store.list_metrics()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&metrics)?);
            } else {
                print_metrics_human(&metrics);
            }
            Ok(())
        }
    }
}

async fn run_record(
    store: Store,
    metric_id: i64,
    value: f64,
    counter: i64,
    at: Option<String>,
    json: bool,
    deadline: Option<Duration>,
) -> anyhow::Result<()> {
    let metric = fetch_metric(&store, metric_id, deadline).await?;
    let created_at = match at {
        Some(raw) => parse_time_or_relative(&raw)?,
        None => chrono::Utc::now(),
    };

    let point = MetricPoint {
        metric_id: metric.id,
        value,
        counter,
        created_at,
    };
    let stored = point.clone();
    run_blocking(deadline, move || store.insert_points(&[stored])).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&point)?);
    } else {
        println!(
            "recorded metric={} value={} counter={} at={}",
            metric.id,
            point.value,
            point.counter,
            point.created_at.to_rfc3339()
        );
    }
    Ok(())
}

async fn run_query(
    cmd: QueryCommands,
    store: Store,
    json: bool,
    deadline: Option<Duration>,
) -> anyhow::Result<()> {
    let (metric_id, window) = match &cmd {
        QueryCommands::LastHour { metric_id, .. } => (*metric_id, "last-hour"),
        QueryCommands::ByHour { metric_id, .. } => (*metric_id, "by-hour"),
        QueryCommands::Day { metric_id, .. } => (*metric_id, "day"),
    };
    let metric = fetch_metric(&store, metric_id, deadline).await?;

    let queried = metric.clone();
    let value = run_blocking(deadline, move || {
        let agg = Aggregator::new(store);
        match cmd {
            QueryCommands::LastHour {
                hours_ago,
                minutes_ago,
                ..
            } => agg.points_last_hour(&queried, hours_ago, minutes_ago),
            QueryCommands::ByHour { hours_ago, .. } => agg.points_by_hour(&queried, hours_ago),
            QueryCommands::Day { days_ago, .. } => agg.points_for_day_in_week(&queried, days_ago),
        }
    })
    .await?;

    if json {
        let payload = serde_json::json!({
            "metric_id": metric.id,
            "window": window,
            "value": value,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_value_human(&metric, value);
    }
    Ok(())
}

async fn run_series(
    cmd: SeriesCommands,
    store: Store,
    json: bool,
    deadline: Option<Duration>,
) -> anyhow::Result<()> {
    let metric_id = match &cmd {
        SeriesCommands::LastHour { metric_id }
        | SeriesCommands::Week { metric_id }
        | SeriesCommands::Hours { metric_id, .. } => *metric_id,
    };
    let metric = fetch_metric(&store, metric_id, deadline).await?;

    let queried = metric.clone();
    let series = run_blocking(deadline, move || {
        let agg = Aggregator::new(store);
        match cmd {
            SeriesCommands::LastHour { .. } => agg.series_last_hour(&queried),
            SeriesCommands::Hours { hours, .. } => agg.series_last_hours(&queried, hours),
            SeriesCommands::Week { .. } => agg.series_week(&queried),
        }
    })
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
    } else {
        print_series_human(&metric, &series);
    }
    Ok(())
}

async fn run_status(store: Store, json: bool, deadline: Option<Duration>) -> anyhow::Result<()> {
    let status = run_blocking(deadline, move || store.status()).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status_human(&status);
    }
    Ok(())
}

async fn run_prune(
    store: Store,
    cfg: Config,
    older_than: Option<String>,
    json: bool,
    deadline: Option<Duration>,
) -> anyhow::Result<()> {
    let window = match older_than {
        Some(raw) => parse_duration_str(&raw)?,
        None => cfg.retention_ttl,
    };

    let deleted = run_blocking(deadline, move || store.prune_points(window)).await?;
    if json {
        let payload = serde_json::json!({ "deleted": deleted });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "pruned {deleted} points older than {}",
            humantime::format_duration(window)
        );
    }
    Ok(())
}
