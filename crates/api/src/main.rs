use std::sync::Arc;

use spendgate_access::AccessStore;
use spendgate_api::app::{build_app, default_menu};
use spendgate_infra::InMemoryAccessStore;
use spendgate_menu::PreferenceStore;

#[tokio::main]
async fn main() {
    spendgate_observability::init();

    let (store, preferences) = build_stores().await;
    let app = build_app(store, preferences, default_menu());

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080")
        .await
        .expect("failed to bind 0.0.0.0:8080");

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}

#[cfg(feature = "postgres")]
async fn build_stores() -> (Arc<dyn AccessStore>, Arc<dyn PreferenceStore>) {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(8)
            .connect(&url)
            .await
            .expect("failed to connect to DATABASE_URL");
        let store = Arc::new(spendgate_infra::PgAccessStore::new(pool));
        return (store.clone(), store);
    }
    tracing::warn!("DATABASE_URL not set; using in-memory store");
    in_memory_stores()
}

#[cfg(not(feature = "postgres"))]
async fn build_stores() -> (Arc<dyn AccessStore>, Arc<dyn PreferenceStore>) {
    in_memory_stores()
}

fn in_memory_stores() -> (Arc<dyn AccessStore>, Arc<dyn PreferenceStore>) {
    let store = Arc::new(InMemoryAccessStore::new());
    (store.clone(), store)
}
