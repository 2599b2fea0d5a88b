use std::error::Error;

use axum::http::HeaderValue;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod prover_client;
mod routes;
mod rpc;

use config::Config;
use prover_client::HttpProver;
use routes::AppState;
use rpc::JsonRpcLedger;

fn cors_layer(origin: &str) -> Result<CorsLayer, Box<dyn Error>> {
    let allow_origin = if origin.trim() == "*" {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::exact(HeaderValue::from_str(origin.trim())?)
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    let claim_config = config.claim_config()?;
    info!(
        contract = %config.contract_address,
        rpc_url = %config.rpc_url,
        prover_url = %config.prover_url,
        levels = claim_config.levels,
        scan = ?claim_config.scan,
        "starting will server"
    );

    let state = AppState::new(
        claim_config,
        JsonRpcLedger::new(config.rpc_url.clone(), config.contract_address),
        HttpProver::new(&config.prover_url),
    );
    let app = routes::router(state)
        .layer(cors_layer(&config.cors_origin)?)
        .layer(CatchPanicLayer::new());

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("will server listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
