// src/bin/oracle_gateway_bench.rs

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use structopt::StructOpt;
use tokio::sync::{Barrier, Semaphore};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use oracle_gateway::clock::SystemClock;
use oracle_gateway::config::{RateLimitConfig, RedisConfig, TierConfig};
use oracle_gateway::limiter::{Tier, TierRegistry};
use oracle_gateway::storage::BackingStore;

#[derive(Debug, Clone, StructOpt)]
#[structopt(
    name = "oracle_gateway_bench",
    about = "Measures admission throughput of the tiered rate limiter"
)]
struct Opt {
    /// Storage backend to use
    #[structopt(short, long, possible_values = &["memory", "redis"], default_value = "memory")]
    storage: String,

    /// Redis URL (when using Redis storage)
    #[structopt(long, default_value = "redis://localhost:6379")]
    redis_url: String,

    /// Tier to benchmark
    #[structopt(short, long, possible_values = &["default", "premium"], default_value = "default")]
    tier: String,

    /// Global limit for the tier
    #[structopt(short, long, default_value = "1000")]
    max_requests: u64,

    /// Per-caller limit for the tier
    #[structopt(long, default_value = "100")]
    max_per_caller: u64,

    /// Window duration in seconds
    #[structopt(short, long, default_value = "60")]
    window_seconds: u64,

    /// Number of concurrent callers to simulate
    #[structopt(short = "u", long, default_value = "10")]
    num_users: usize,

    /// Number of requests per caller
    #[structopt(short = "r", long, default_value = "100")]
    requests_per_user: usize,

    /// Number of iterations to run
    #[structopt(short, long, default_value = "3")]
    iterations: usize,

    /// Maximum concurrency level
    #[structopt(short = "c", long, default_value = "100")]
    concurrency: usize,

    /// Verbosity level
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,

    /// Disable logs
    #[structopt(long)]
    disable_logs: bool,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    allowed: u64,
    denied: u64,
    errors: u64,
}

impl Tally {
    fn total(&self) -> u64 {
        self.allowed + self.denied + self.errors
    }

    fn add(&mut self, other: Tally) {
        self.allowed += other.allowed;
        self.denied += other.denied;
        self.errors += other.errors;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let log_level = match (opt.disable_logs, opt.verbose) {
        (true, _) => "error",
        // Per-request admission logs would drown the benchmark output
        (false, 0) => "warn",
        (false, 1) => "info",
        _ => "debug",
    };
    let subscriber = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new(format!(
            "oracle_gateway_bench={},oracle_gateway={}",
            log_level, log_level
        )))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::SeqCst);
        })?;
    }

    let redis = match opt.storage.as_str() {
        "redis" => Some(RedisConfig {
            url: opt.redis_url.clone(),
            ..RedisConfig::default()
        }),
        _ => None,
    };
    let store = match BackingStore::connect(redis.as_ref()).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open {} storage: {}", opt.storage, e);
            return Err(e.into());
        }
    };

    let limits = RateLimitConfig {
        window: Duration::from_secs(opt.window_seconds),
        max_global_requests: opt.max_requests,
        max_requests_per_caller: Some(opt.max_per_caller),
    };
    let registry = TierRegistry::new(
        TierConfig {
            default: limits.clone(),
            premium: limits,
        },
        Arc::new(store),
        Arc::new(SystemClock),
    )?;

    let is_premium = opt.tier == "premium";
    let name = format!("{} tier ({})", opt.tier, opt.storage);
    run_benchmark(Arc::new(registry), is_premium, &name, opt, stop).await
}

async fn run_benchmark(
    registry: Arc<TierRegistry<BackingStore>>,
    is_premium: bool,
    name: &str,
    opt: Opt,
    stop: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("\nRunning benchmark: {}", name);
    println!("==================={}", "=".repeat(name.len()));

    let tier = Tier::for_caller(is_premium);
    let mut total_duration = Duration::from_secs(0);
    let mut total = Tally::default();
    let mut completed_iterations = 0u32;

    for iteration in 0..opt.iterations {
        if stop.load(Ordering::SeqCst) {
            warn!("Interrupted, skipping remaining iterations");
            break;
        }
        info!("Starting iteration {} of {}", iteration + 1, opt.iterations);

        // Fresh windows for every iteration
        let limiter = registry.limiter(tier);
        limiter.reset(None).await?;
        for user_id in 0..opt.num_users {
            limiter.reset(Some(&format!("user_{}", user_id))).await?;
        }

        let progress = ProgressBar::new((opt.num_users * opt.requests_per_user) as u64);
        progress.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )?
            .progress_chars("=> "),
        );
        progress.set_message(format!("iteration {}", iteration + 1));

        let start_time = Instant::now();
        let barrier = Arc::new(Barrier::new(opt.num_users));
        let semaphore = Arc::new(Semaphore::new(opt.concurrency.max(1)));
        let mut handles = Vec::with_capacity(opt.num_users);

        for user_id in 0..opt.num_users {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            let semaphore = Arc::clone(&semaphore);
            let stop = Arc::clone(&stop);
            let progress = progress.clone();
            let caller = format!("user_{}", user_id);
            let requests_per_user = opt.requests_per_user;

            handles.push(tokio::spawn(async move {
                barrier.wait().await;

                let mut tally = Tally::default();
                for _ in 0..requests_per_user {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    let Ok(_permit) = semaphore.acquire().await else {
                        break;
                    };

                    let decision = registry.admit(Some(&caller), is_premium).await;
                    if decision.allowed {
                        tally.allowed += 1;
                    } else {
                        tally.denied += 1;
                    }
                    progress.inc(1);
                }
                tally
            }));
        }

        let mut iteration_tally = Tally::default();
        for result in futures::future::join_all(handles).await {
            match result {
                Ok(tally) => iteration_tally.add(tally),
                Err(e) => {
                    iteration_tally.errors += 1;
                    error!("Benchmark task failed: {}", e);
                }
            }
        }
        progress.finish_with_message("done");

        let elapsed = start_time.elapsed();
        total_duration += elapsed;
        total.add(iteration_tally);
        completed_iterations += 1;

        let requests_per_second = iteration_tally.total() as f64 / elapsed.as_secs_f64();
        println!(
            "Iteration {}: {:?}, {} allowed, {} denied, {:.2} req/sec",
            iteration + 1,
            elapsed,
            iteration_tally.allowed,
            iteration_tally.denied,
            requests_per_second
        );
    }

    if completed_iterations == 0 || total.total() == 0 {
        println!("\nNo requests were made.");
        return Ok(());
    }

    let avg_duration = total_duration / completed_iterations;
    let total_requests = total.total();
    println!("\nBenchmark Results for {}:", name);
    println!("  Total Requests:     {}", total_requests);
    println!(
        "  Allowed:            {} ({:.1}%)",
        total.allowed,
        100.0 * total.allowed as f64 / total_requests as f64
    );
    println!(
        "  Denied:             {} ({:.1}%)",
        total.denied,
        100.0 * total.denied as f64 / total_requests as f64
    );
    println!("  Avg. Duration:      {:?}", avg_duration);
    println!(
        "  Avg. Throughput:    {:.2} requests/second",
        total_requests as f64 / total_duration.as_secs_f64()
    );

    Ok(())
}
