use sealdrop_core::AppConfig;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = AppConfig::from_env()?;

    // Initialize the application (database, upload store, routes)
    let (_state, router) = sealdrop_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    sealdrop_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
