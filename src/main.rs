use spawnpool::{register_pool, Config, Pool};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Instant,
};
use tokio::time::Duration;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let pool = Pool::new("demo", 64, Config::default());
    if let Err(e) = register_pool(pool.clone()) {
        tracing::warn!(error = %e, "demo pool not registered");
    }
    pool.set_failure_handler(|_, panic| {
        tracing::info!(panic = %panic, "task failed");
    });

    let sum = Arc::new(AtomicUsize::new(0));
    let now = Instant::now();
    for i in 0..1_000_000 {
        let sum = sum.clone();
        pool.run(move || {
            sum.fetch_add(i, Ordering::Relaxed);
        });
    }
    pool.run(|| panic!("demo panic"));
    let submitted = now.elapsed();

    if !pool.join_idle_timeout(Duration::from_secs(60)).await {
        tracing::warn!("pool did not drain in time");
    }

    let metrics = pool.metrics();
    println!("submit: {:?}, total: {:?}", submitted, now.elapsed());
    println!("sum: {}", sum.load(Ordering::Relaxed));
    println!(
        "completed: {}, panicked: {}, workers spawned: {}",
        metrics.completed, metrics.panicked, metrics.spawned_workers
    );
}
