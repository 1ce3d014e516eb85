// src/bin/oracle_gateway_cli.rs

use prettytable::{row, Table};
use std::sync::Arc;
use std::time::{Duration, Instant};
use structopt::StructOpt;
use tokio::time;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use oracle_gateway::config::{GatewayConfig, RateLimitConfig};
use oracle_gateway::model::{GenerateOutcome, GenerationInput};
use oracle_gateway::storage::BackingStore;
use oracle_gateway::InterpretationService;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "oracle_gateway_cli",
    about = "Replays interpretation requests against the gateway"
)]
struct Opt {
    /// Content domain of the request
    #[structopt(short, long, possible_values = &["tarot", "dream"], default_value = "tarot")]
    domain: String,

    /// Question to ask
    #[structopt(short, long, default_value = "What should I focus on this week?")]
    question: String,

    /// Spread name (tarot) or dream narrative (dream)
    #[structopt(short, long, default_value = "Three-card past/present/future")]
    spread: String,

    /// Drawn cards or dream symbols
    #[structopt(long, default_value = "")]
    cards: String,

    /// Comma-separated callers; requests rotate through them
    #[structopt(short, long, default_value = "user_1")]
    callers: String,

    /// Use the premium tier
    #[structopt(long)]
    premium: bool,

    /// Treat the caller as a guest
    #[structopt(long)]
    guest: bool,

    /// Global limit for the chosen tier
    #[structopt(short, long, default_value = "10")]
    max_requests: u64,

    /// Per-caller limit for the chosen tier
    #[structopt(long)]
    max_per_caller: Option<u64>,

    /// Window duration in seconds
    #[structopt(short, long, default_value = "3600")]
    window_seconds: u64,

    /// Simulation mode
    #[structopt(long, possible_values = &["burst", "steady"], default_value = "burst")]
    simulation: String,

    /// Number of requests to simulate
    #[structopt(short = "n", long, default_value = "5")]
    num_requests: usize,

    /// Time between requests in milliseconds (steady mode)
    #[structopt(short = "t", long, default_value = "250")]
    request_interval_ms: u64,

    /// Print the interpretation text of every generated reading
    #[structopt(long)]
    show_text: bool,

    /// Verbosity level
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,

    /// Disable logs
    #[structopt(long)]
    disable_logs: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let opt = Opt::from_args();

    let log_level = match (opt.disable_logs, opt.verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    let subscriber = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new(format!(
            "oracle_gateway_cli={},oracle_gateway={}",
            log_level, log_level
        )))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = GatewayConfig::from_env()?;
    let limits = RateLimitConfig {
        window: Duration::from_secs(opt.window_seconds),
        max_global_requests: opt.max_requests,
        max_requests_per_caller: opt.max_per_caller,
    };
    if opt.premium {
        config.tiers.premium = limits;
    } else {
        config.tiers.default = limits;
    }

    let service = Arc::new(InterpretationService::from_config(config).await?);
    info!(
        simulation = %opt.simulation,
        requests = opt.num_requests,
        "Starting gateway simulation"
    );

    run_simulation(&opt, &service).await
}

fn build_input(opt: &Opt) -> GenerationInput {
    GenerationInput {
        question: opt.question.clone(),
        card_spread_or_context: opt.spread.clone(),
        structured_card_or_context: opt.cards.clone(),
        is_guest_user: opt.guest,
        domain_id: opt.domain.clone(),
        style_id: None,
    }
}

async fn run_simulation(
    opt: &Opt,
    service: &InterpretationService<BackingStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    let input = build_input(opt);
    let callers: Vec<&str> = opt
        .callers
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    let interval = match opt.simulation.as_str() {
        "steady" => Some(Duration::from_millis(opt.request_interval_ms)),
        _ => None,
    };

    let mut results = Table::new();
    results.add_row(row!["#", "Caller", "Outcome", "Source / Reset", "Latency"]);

    let mut generated = 0;
    let mut rejected = 0;
    let start_time = Instant::now();

    for i in 0..opt.num_requests {
        let request_time = Instant::now();
        let caller = if callers.is_empty() {
            None
        } else {
            Some(callers[i % callers.len()])
        };

        let outcome = service.generate(&input, caller, opt.premium).await?;
        let latency = format!("{:?}", request_time.elapsed());
        let caller_label = caller.unwrap_or("(anonymous)");

        match &outcome {
            GenerateOutcome::Generated(output) => {
                generated += 1;
                results.add_row(row![i + 1, caller_label, "GENERATED", output.source, latency]);
                if opt.show_text {
                    println!("--- Reading {} ---\n{}\n", i + 1, output.interpretation_text);
                }
            }
            GenerateOutcome::Rejected(rejection) => {
                rejected += 1;
                warn!(request = i + 1, message = %rejection.message, "Request rejected");
                results.add_row(row![
                    i + 1,
                    caller_label,
                    "REJECTED",
                    format!("{} ms", rejection.reset_time_ms),
                    latency
                ]);
            }
        }

        if let Some(interval) = interval {
            let elapsed = request_time.elapsed();
            if elapsed < interval {
                time::sleep(interval - elapsed).await;
            }
        }
    }

    println!("\nSimulation Results:");
    results.printstd();
    println!("Total requests: {}", opt.num_requests);
    println!("Generated: {}", generated);
    println!("Rejected: {}", rejected);
    println!("Time elapsed: {:?}", start_time.elapsed());

    print_usage(service, &callers, opt.premium).await?;
    Ok(())
}

async fn print_usage(
    service: &InterpretationService<BackingStore>,
    callers: &[&str],
    is_premium: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut table = Table::new();
    table.add_row(row!["Caller", "Caller usage", "Global usage", "Reset (ms)"]);

    for caller in callers {
        let stats = service.registry().stats(Some(caller), is_premium).await?;
        let caller_usage = match (stats.caller_usage, stats.caller_limit) {
            (Some(used), Some(limit)) => format!("{}/{}", used, limit),
            (Some(used), None) => format!("{}/-", used),
            _ => "-".to_string(),
        };
        table.add_row(row![
            caller,
            caller_usage,
            format!("{}/{}", stats.global_usage, stats.global_limit),
            stats.reset_time_ms
        ]);
    }

    println!("\nUsage:");
    table.printstd();
    Ok(())
}
