//! fintech-radar: picks a fresh fintech launch from Product Hunt and posts it.
//!
//! `discover` runs once (cron friendly), `schedule` runs daily at POST_TIME,
//! `test-message` checks the Telegram channel.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fintech_radar::config::RadarConfig;
use fintech_radar::discovery::providers::{fixture::FixtureCatalog, producthunt::ProductHuntCatalog};
use fintech_radar::discovery::select::Strategy;
use fintech_radar::discovery::types::CatalogSource;
use fintech_radar::discovery::window_start;
use fintech_radar::format::MessageFormatter;
use fintech_radar::metrics::Metrics;
use fintech_radar::notify::{publisher_from_config, TelegramPublisher};
use fintech_radar::scheduler::{announce_startup, DailySchedule};
use fintech_radar::state::JsonFileStore;
use fintech_radar::{Discovery, RunParameters, RunSummary};

#[derive(Parser, Debug)]
#[command(name = "fintech-radar")]
#[command(about = "Discover fintech launches on Product Hunt and publish one to a channel")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one discovery and publish the pick(s).
    Discover(DiscoverArgs),
    /// Run discovery every day at POST_TIME (UTC) until Ctrl-C.
    Schedule,
    /// Send a test message to the Telegram channel.
    TestMessage,
}

#[derive(Args, Debug)]
struct DiscoverArgs {
    /// Selection strategy: round_robin | random
    #[arg(long)]
    strategy: Option<Strategy>,

    /// Window start (RFC 3339). Overrides --hours.
    #[arg(long)]
    since: Option<DateTime<Utc>>,

    /// Window length in hours ending now.
    #[arg(long)]
    hours: Option<i64>,

    /// Max posts to fetch from the catalog.
    #[arg(long)]
    limit: Option<usize>,

    /// Number of posts to pick.
    #[arg(long)]
    top: Option<usize>,

    /// Select and format, but publish nothing and keep state untouched.
    #[arg(long)]
    dry_run: bool,

    /// Verbose logs, scored candidate list and a metrics dump.
    #[arg(long)]
    debug: bool,

    /// Read posts from a JSON file instead of Product Hunt.
    #[arg(long, value_name = "JSON")]
    fixture: Option<PathBuf>,
}

fn init_tracing(debug: bool) {
    let default = if debug {
        "fintech_radar=debug,info"
    } else {
        "fintech_radar=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn run_parameters(cfg: &RadarConfig, args: &DiscoverArgs, now: DateTime<Utc>) -> Result<RunParameters> {
    let mut params = RunParameters::from_config(cfg, now)?;
    if let Some(h) = args.hours {
        params.since = window_start(now, h.max(1)).context("--hours")?;
    }
    if let Some(since) = args.since {
        params.since = since;
    }
    if let Some(limit) = args.limit {
        params.limit = limit.max(1);
    }
    if let Some(top) = args.top {
        params.top_n = top;
    }
    if let Some(s) = args.strategy {
        params.strategy = s;
    }
    params.dry_run = args.dry_run;
    params.debug = args.debug;
    Ok(params)
}

fn catalog_for(cfg: &RadarConfig, fixture: Option<&PathBuf>) -> Result<Box<dyn CatalogSource>> {
    match fixture {
        Some(p) => Ok(Box::new(FixtureCatalog::from_path(p)?)),
        None => {
            let token = cfg.require_producthunt_token()?;
            Ok(Box::new(ProductHuntCatalog::new(token)))
        }
    }
}

async fn discover_once(cfg: &RadarConfig, params: &RunParameters, fixture: Option<&PathBuf>) -> Result<RunSummary> {
    let whitelist = cfg.whitelist()?;
    let catalog = catalog_for(cfg, fixture)?;
    let store = JsonFileStore::new(&cfg.state_path);
    let publisher = publisher_from_config(cfg, MessageFormatter::new(whitelist.clone()));

    tracing::debug!(
        catalog = catalog.name(),
        publisher = publisher.name(),
        state = %store.path().display(),
        "run wiring"
    );
    let engine = Discovery::new(catalog.as_ref(), &store, publisher.as_ref(), &whitelist);
    let summary = engine.run(params).await.context("discovery run failed")?;
    Ok(summary)
}

fn print_summary(summary: &RunSummary) {
    if summary.selected == 0 {
        println!("No eligible fintech posts found.");
    }
    for p in &summary.picks {
        println!("{} [{}] score {:.1}: {}", p.title, p.id, p.score, p.outcome);
    }
    if let Some(e) = &summary.state_error {
        eprintln!("warning: state not saved: {e}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let debug = matches!(&cli.command, Command::Discover(a) if a.debug);
    init_tracing(debug);

    let cfg = RadarConfig::from_env().context("loading configuration")?;

    match cli.command {
        Command::Discover(args) => {
            let metrics = if args.debug { Some(Metrics::install()?) } else { None };
            let params = run_parameters(&cfg, &args, Utc::now())?;
            tracing::info!(
                since = %params.since.to_rfc3339(),
                limit = params.limit,
                top = params.top_n,
                strategy = %params.strategy,
                dry_run = params.dry_run,
                "starting discovery"
            );
            let summary = discover_once(&cfg, &params, args.fixture.as_ref()).await?;
            print_summary(&summary);
            if let Some(m) = metrics {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                println!("{}", m.render());
            }
        }
        Command::Schedule => {
            cfg.validate_for_publish()?;
            let channel = publisher_from_config(&cfg, MessageFormatter::new(cfg.whitelist()?));
            announce_startup(channel.as_ref(), cfg.post_time).await;
            tracing::info!(post_time = %cfg.post_time, "scheduler started");
            let schedule = DailySchedule::new(cfg.post_time);
            let cfg_ref = &cfg;
            schedule
                .run(
                    || async move {
                        let params = RunParameters::from_config(cfg_ref, Utc::now())?;
                        discover_once(cfg_ref, &params, None).await
                    },
                    async {
                        let _ = tokio::signal::ctrl_c().await;
                    },
                )
                .await;
        }
        Command::TestMessage => {
            let (token, chat) = cfg.require_telegram()?;
            let whitelist = cfg.whitelist()?;
            let tg = TelegramPublisher::new(token.to_string(), chat.to_string(), MessageFormatter::new(whitelist));
            tg.send_text("Fintech Radar Bot is live 🚀").await?;
            println!("Test message sent.");
        }
    }

    Ok(())
}
