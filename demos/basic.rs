//! # Admission policies demo
//!
//! Shows both queues side by side:
//! - EagerQueue: tasks run one by one, in submission order
//! - LazyQueue: tasks submitted while busy are skipped (or refused)
//!
//! ## Run
//! ```bash
//! cargo run --example basic
//! ```

use std::{sync::Arc, time::Duration};

use admission_queue::{
    LogWriter, Outcome, QueueBuilder, QueueConfig, QueueError, SkipPolicy, Subscribe,
};

async fn job(name: &'static str, duration_ms: u64) -> &'static str {
    println!("{:>6}[{name}] started", "");
    let start = tokio::time::Instant::now();
    tokio::time::sleep(Duration::from_millis(duration_ms)).await;
    println!("{:>6}[{name}] completed in {:?}", "", start.elapsed());
    name
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    // ============================================================
    // Demo -> EagerQueue: every task runs, strictly in order
    // ============================================================
    println!("Demo 1: EagerQueue");
    println!(" └► Submit 3 tasks with decreasing durations: they still finish in order");

    let eager = QueueBuilder::new(QueueConfig::named("eager-demo"))
        .with_subscribers(subs.clone())
        .eager();
    let completions = [("a", 600), ("b", 300), ("c", 100)]
        .map(|(name, ms)| eager.enqueue(move || job(name, ms)));
    for done in completions {
        println!(" └► result: {}", done.await?);
    }
    println!();

    // ============================================================
    // Demo -> LazyQueue: submissions while busy are skipped
    // ============================================================
    println!("Demo 2: LazyQueue (skip)");
    println!(" └► Submit a task & another while the first is running: second is skipped");

    let lazy = QueueBuilder::new(QueueConfig::named("lazy-demo"))
        .with_subscribers(subs.clone())
        .lazy();
    let first = lazy.enqueue(|| job("refresh-1", 500))?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = lazy.enqueue(|| job("refresh-2", 500))?;

    for done in [first, second] {
        match done.await? {
            Outcome::Completed(name) => println!(" └► {name} ran"),
            Outcome::NotAdmitted => println!(" └► skipped: queue was busy"),
        }
    }
    println!();

    // ============================================================
    // Demo -> LazyQueue with SkipPolicy::Error: busy submissions fail
    // ============================================================
    println!("Demo 3: LazyQueue (error on skip)");

    let strict = QueueBuilder::new(QueueConfig::named("strict-demo").with_skip(SkipPolicy::Error))
        .with_subscribers(subs)
        .lazy();
    let running = strict.enqueue(|| job("deploy-1", 300))?;
    match strict.enqueue(|| job("deploy-2", 300)) {
        Err(QueueError::BusyQueue) => println!(" └► deploy-2 refused: {}", QueueError::BusyQueue),
        Err(e) => return Err(e.into()),
        Ok(_) => println!(" └► deploy-2 unexpectedly admitted"),
    }
    running.await?;

    // Let subscriber workers flush their logs.
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("Done");
    Ok(())
}
