//! Example: running work under an ephemeral lock
//!
//! Run with: `cargo run --example scoped_lock`
//!
//! Uses the in-memory store so no server is needed. Swap in `RedisStore`
//! to coordinate across processes.

use std::time::Duration;

use ephemeral_lock::*;

struct Order {
    id: i64,
}

impl Identifiable for Order {
    fn identity_path(&self) -> IdentityPath {
        IdentityPath::root("Order", self.id)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let provider = EphemeralLockProvider::builder()
        .store(MemoryStore::new())
        .namespace("demo")
        .options(
            LockOptions::new()
                .expiry(Duration::from_secs(30))
                .max_retries(4)
                .backoff_unit(Duration::from_millis(100)),
        )
        .build()?;

    // Run a closure while holding a lock by name
    let total = provider
        .run_locked("nightly-report", || async {
            println!("Building report...");
            tokio::time::sleep(Duration::from_millis(200)).await;
            42
        })
        .await?;
    println!("Report done: {total}");

    // Lock a domain entity by its identity
    let order = Order { id: 42 };
    let lock = provider.create_lock_for(&order)?;
    println!("Created lock: {}", lock.name());

    let guard = lock.acquire().await?;
    println!("Lock acquired with token {}", guard.token());

    // A second caller gives up after its retries run out
    let impatient = lock
        .clone()
        .with_options(LockOptions::new().max_retries(2).backoff_unit(Duration::from_millis(50)));
    match impatient.acquire().await {
        Err(LockError::LockUnavailable { name, attempts }) => {
            println!("{name} still busy after {attempts} attempts")
        }
        other => println!("Unexpected outcome: {other:?}"),
    }

    guard.release().await?;
    println!("Lock released");

    Ok(())
}
