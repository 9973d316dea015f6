//! # Example: bursts
//!
//! Drives a debounced search box, a throttled progress reporter and a bounded
//! fetch pool off one shared [`Bus`], and prints every event through [`LogWriter`].
//!
//! ## Flow
//! ```text
//! keystrokes ──► Debounced("search") ──┐
//! progress   ──► Throttled("progress") ─┼──► Bus ──► SubscriberSet::listen ──► LogWriter
//! fetches    ──► BoundedRunner("fetch") ┘
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=pacer=info cargo run --example bursts --features logging
//! ```

use std::{sync::Arc, time::Duration};

use pacer::{
    BoundedRunner, Bus, Config, Debounced, LogWriter, Subscribe, SubscriberSet, Throttled,
};
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
wait = "250ms"

[debounce]
max_wait = "1s"

[runner]
concurrency = 3
"#;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config::from_toml_str(CONFIG)?;
    let bus = Bus::new(cfg.runner.bus_capacity_clamped());

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let set = Arc::new(SubscriberSet::new(subs, bus.clone()));
    let listener = set.listen();

    // Keystrokes every 80ms: one search at the end, forced once by max_wait.
    let search = Debounced::builder(
        |query: String| {
            println!("searching for {query:?}");
            query.len()
        },
        cfg.wait,
    )
    .options(cfg.debounce)
    .bus(bus.clone())
    .name("search")
    .build()?;

    let mut query = String::new();
    for ch in "rate limiting".chars() {
        query.push(ch);
        search.call(query.clone());
        sleep(Duration::from_millis(80)).await;
    }
    sleep(cfg.wait * 2).await;

    // Progress ticks every 20ms, reported at most once per window.
    let progress = Throttled::builder(|pct: u32| println!("progress {pct}%"), cfg.wait)
        .options(cfg.throttle)
        .bus(bus.clone())
        .name("progress")
        .build()?;
    for pct in (0..=100).step_by(5) {
        progress.call(pct);
        sleep(Duration::from_millis(20)).await;
    }
    sleep(cfg.wait).await;

    // Ten fetches, three at a time; one of them fails.
    let runner = BoundedRunner::new(cfg.runner.clone())?
        .with_bus(bus.clone())
        .with_name("fetch");

    let jobs = (0..10u64).map(|id| {
        move || async move {
            sleep(Duration::from_millis(50 + id * 15)).await;
            if id == 7 {
                anyhow::bail!("fetch {id} timed out");
            }
            Ok(id)
        }
    });
    let report = runner.run_settled(jobs).await;
    println!(
        "fetched {} item(s), {} failure(s)",
        report.results.len(),
        report.failures.len()
    );
    for failure in &report.failures {
        println!("  #{}: {}", failure.index, failure.error);
    }

    // Let the subscriber drain before exiting.
    sleep(Duration::from_millis(50)).await;
    listener.abort();
    Ok(())
}
