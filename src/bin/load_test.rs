//! Load Testing Tool
//!
//! Fires concurrent purchases at one product on the in-memory store and
//! checks that stock and balances stay consistent.
//!
//! Run with: cargo run --bin load_test --release -- --buyers 200 --stock 50

use std::time::Instant;

use shopfront::domain::{Amount, Category, NewProduct, Product, Role, User};
use shopfront::handlers::{PurchaseCommand, PurchaseHandler};
use shopfront::{AppError, DomainError, OperationContext, Store};

fn arg(args: &[String], name: &str, default: u32) -> u32 {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let buyers = arg(&args, "--buyers", 200);
    let stock = arg(&args, "--stock", 50);
    let price = 50_000;

    println!("Load Test - {} buyers racing for {} units", buyers, stock);

    let store = Store::in_memory();
    let product = Product::create(NewProduct {
        name: "Load Test Item".to_string(),
        description: String::new(),
        price,
        original_price: None,
        image: None,
        category: Category::Standard,
        stock,
        features: Vec::new(),
    })?;
    store.insert(&product).await?;

    let mut buyer_ids = Vec::with_capacity(buyers as usize);
    for i in 0..buyers {
        let user = User::new(
            format!("buyer{}", i),
            format!("buyer{}@load.test", i),
            String::new(),
            Role::User,
        )
        .credited(&Amount::new(price)?)?;
        store.insert(&user).await?;
        buyer_ids.push(user.id);
    }

    let start = Instant::now();
    let mut tasks = Vec::with_capacity(buyer_ids.len());
    for user_id in buyer_ids {
        let handler = PurchaseHandler::new(store.clone());
        let product_id = product.id;
        tasks.push(tokio::spawn(async move {
            handler
                .execute(
                    PurchaseCommand::new(user_id, product_id),
                    &OperationContext::new(),
                )
                .await
        }));
    }

    let (mut success, mut sold_out, mut conflicts, mut other) = (0u32, 0u32, 0u32, 0u32);
    for task in tasks {
        match task.await? {
            Ok(_) => success += 1,
            Err(AppError::Domain(DomainError::OutOfStock(_))) => sold_out += 1,
            Err(AppError::VersionConflict) => conflicts += 1,
            Err(e) => {
                eprintln!("Unexpected error: {}", e);
                other += 1;
            }
        }
    }
    let elapsed = start.elapsed();

    let remaining = store
        .get::<Product>(&product.id.to_string())
        .await?
        .map(|v| v.record.stock)
        .ok_or_else(|| anyhow::anyhow!("product vanished"))?;

    println!("\n=== Load Test Results ===");
    println!("Purchases: {}", success);
    println!("Sold out: {}", sold_out);
    println!("Gave up on conflict: {}", conflicts);
    println!("Other errors: {}", other);
    println!("Remaining stock: {}", remaining);
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!(
        "Rate: {:.0} purchases/sec",
        buyers as f64 / elapsed.as_secs_f64()
    );

    if success + remaining != stock {
        anyhow::bail!(
            "stock drifted: {} sold + {} remaining != {}",
            success,
            remaining,
            stock
        );
    }
    println!("Stock is consistent");

    Ok(())
}
