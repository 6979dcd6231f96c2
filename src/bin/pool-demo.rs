use std::process::exit;
use std::thread;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::{error, info, warn};

use workpool::{ChannelThreadPool, Result, SharedQueueThreadPool, ThreadPool};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PoolKind {
    /// Mutex and condition variable over a shared queue
    Shared,
    /// Unbounded crossbeam channel
    Channel,
}

#[derive(Parser)]
#[command(
    name = "pool-demo",
    version,
    about = "Submits sleeping tasks to a worker pool, then shuts it down"
)]
struct Cli {
    /// Number of worker threads (defaults to the number of CPUs)
    #[arg(long, value_name = "N")]
    threads: Option<u32>,

    /// Number of tasks to submit
    #[arg(long, default_value_t = 4, value_name = "N")]
    tasks: u32,

    /// Simulated work per task in milliseconds
    #[arg(long, default_value_t = 2000, value_name = "MS")]
    task_ms: u64,

    /// Pool implementation
    #[arg(long, value_enum, default_value_t = PoolKind::Shared)]
    pool: PoolKind,

    /// Skip queued tasks instead of draining them on shutdown
    #[arg(long)]
    now: bool,
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .target(env_logger::Target::Stderr)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{}", e);
        exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let threads = cli
        .threads
        .unwrap_or_else(|| u32::try_from(num_cpus::get()).unwrap_or(u32::MAX).max(1));

    info!("pool-demo {}", env!("CARGO_PKG_VERSION"));
    info!("Pool: {:?} with {} workers", cli.pool, threads);

    match cli.pool {
        PoolKind::Shared => run_with_pool(SharedQueueThreadPool::new(threads)?, &cli),
        PoolKind::Channel => run_with_pool(ChannelThreadPool::new(threads)?, &cli),
    }
}

fn run_with_pool<P: ThreadPool>(pool: P, cli: &Cli) -> Result<()> {
    let work = Duration::from_millis(cli.task_ms);

    for n in 1..=cli.tasks {
        pool.spawn(move || {
            let current = thread::current();
            let name = current.name().unwrap_or("unnamed");
            info!("Task {n} is running in thread: {name}");
            thread::sleep(work);
            info!("Task {n} finished in thread: {name}");
        })?;
    }

    if cli.now {
        let skipped = pool.shutdown_now();
        if skipped > 0 {
            warn!("Skipped {skipped} queued tasks");
        }
    } else {
        pool.shutdown();
    }

    // The process must outlive the tasks it already handed out.
    pool.join()?;
    info!("All workers exited");
    Ok(())
}
