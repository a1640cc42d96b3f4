use clap::Parser;
use tracing::{error, info};
use tubeauth::cli::{
    Args, build_config, init_logging, load_secrets, open_database, validate_ttls,
};
use tubeauth::run_server;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    if let Err(msg) = validate_ttls(&args) {
        error!("{}", msg);
        std::process::exit(1);
    }

    let Some((access_secret, refresh_secret)) = load_secrets(&args) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap_or_else(|e| {
        error!(error = %e, "Failed to get local address");
        std::process::exit(1);
    });

    let config = build_config(&args, db.clone(), access_secret, refresh_secret);

    info!(address = %local_addr, "Listening");

    let result = run_server(config, listener).await;
    db.close().await;

    if let Err(e) = result {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
