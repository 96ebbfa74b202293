use drayage::config::Config;
use drayage::db::PgPool;
use drayage::engine::Engine;
use drayage::events::EventSink;
use drayage::server::serve;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env().unwrap();

    let PgPool(pool) = PgPool::new(&config.database_url, config.max_db_connections)
        .await
        .unwrap();

    let (sink, events) = EventSink::new(1024);

    // audit consumer; delivery beyond this log line is someone else's job
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::info!(event = %serde_json::to_string(&event).unwrap_or_default(), "lifecycle event");
        }
    });

    let engine = Engine::new(pool, config.bid_policy.clone(), sink)
        .await
        .unwrap();

    serve(engine, config.listen_addr).await;
}
