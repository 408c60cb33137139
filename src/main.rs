use anyhow::Context;
use tracing_subscriber::EnvFilter;
use uniform_orders::config::ShopConfig;
use uniform_orders::server::ServerBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,uniform_orders=debug")),
        )
        .init();

    let mut config = match std::env::var("SHOP_CONFIG") {
        Ok(path) => ShopConfig::from_yaml_file(&path)
            .with_context(|| format!("loading configuration from {path}"))?,
        Err(_) => ShopConfig::default(),
    };
    config.apply_env_overrides()?;
    config.validate()?;

    tracing::info!(
        backend = ?config.storage.backend,
        seed_demo = config.storage.seed_demo,
        "starting uniform-orders"
    );

    ServerBuilder::new(config).serve().await
}
