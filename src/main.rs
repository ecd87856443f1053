use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tabular_session::{
    config::Args,
    server::{self, AppState},
    HttpConnector,
};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("tabular_session={},info", args.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = args.validate() {
        error!("Configuration error: {}", err);
        std::process::exit(1);
    }

    let endpoint = args.endpoint();
    match &endpoint {
        Ok(endpoint) => info!(
            host = %endpoint.host,
            database = %endpoint.database,
            encrypt = endpoint.encrypt,
            "endpoint configured"
        ),
        Err(err) => warn!(error = %err, "endpoint not usable, query requests will fail"),
    }

    let listener = match tokio::net::TcpListener::bind(args.listen).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {}: {}", args.listen, err);
            std::process::exit(1);
        }
    };
    info!("listening on {}", args.listen);

    let state = AppState::new(HttpConnector::new(), endpoint, args.query);
    if let Err(err) = server::serve(listener, state).await {
        error!("server error: {}", err);
        std::process::exit(1);
    }
}
