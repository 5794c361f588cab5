//! PostgreSQL storage contract tests using testcontainers.
//!
//! Run with: cargo test --test storage_postgres --features postgres-tests -- --nocapture
//!
//! Starts PostgreSQL in a container, runs the migrations and drives
//! `PgStorage` through the same contract as the in-memory store. Fixtures use
//! fresh identities and slugs, so both suites share one database.

mod storage;

use std::time::Duration;

use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    GenericImage, ImageExt,
};
use trailhead_storefront::storage::PgStorage;

async fn start_postgres() -> (testcontainers::ContainerAsync<GenericImage>, String) {
    let image = GenericImage::new("postgres", "16")
        .with_exposed_port(5432.tcp())
        .with_wait_for(WaitFor::message_on_stdout("database system is ready to accept connections"));

    let container = image
        .with_env_var("POSTGRES_USER", "storefront")
        .with_env_var("POSTGRES_PASSWORD", "storefront")
        .with_env_var("POSTGRES_DB", "storefront")
        .with_startup_timeout(Duration::from_secs(60))
        .start()
        .await
        .expect("Failed to start postgres container");

    // The ready message is printed once for the init server too.
    tokio::time::sleep(Duration::from_secs(1)).await;

    let host = container.get_host().await.expect("Failed to get container host");
    let port = container.get_host_port_ipv4(5432).await.expect("Failed to get mapped port");
    let url = format!("postgres://storefront:storefront@{host}:{port}/storefront");
    println!("PostgreSQL available at: {url}");
    (container, url)
}

async fn connect_and_migrate(url: &str) -> PgStorage {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(8)
        .connect(url)
        .await
        .expect("Failed to connect to PostgreSQL");
    sqlx::migrate!("./migrations").run(&pool).await.expect("Failed to run migrations");
    PgStorage::new(pool)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_postgres_storage() {
    println!("=== PostgreSQL storage contract ===");
    let (_container, url) = start_postgres().await;
    let store = connect_and_migrate(&url).await;

    println!("CartRepository:");
    run_cart_store_tests!(&store);

    println!("OrderRepository:");
    run_order_store_tests!(&store);

    println!("=== All PostgreSQL storage tests PASSED ===");
}
