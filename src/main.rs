use dotenv::dotenv;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

use pod_market_analyzer::config::AppConfig;
use pod_market_analyzer::context::AppContext;
use pod_market_analyzer::routes;
use pod_market_analyzer::BoxError;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenv().ok();
    env_logger::init();
    info!("Logger initialized. Starting the application...");

    let config = AppConfig::from_env();
    info!("Using PORT: {}", config.port);

    // Bind to 0.0.0.0 so the container port is reachable
    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    info!("Will bind to: {}", addr);

    let ctx = Arc::new(AppContext::from_config(&config)?);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("content-type")
        .allow_methods(vec!["GET", "POST", "HEAD"]);

    let api = routes::routes(ctx).with(cors);
    info!("Routes configured successfully with CORS.");

    info!("Starting server on {}", addr);
    warp::serve(api).run(addr).await;
    Ok(())
}
