use std::sync::Arc;

use armc_azure::ArmService;
use arm_connector::logging::init_logging;
use arm_connector::{ApiService, ConnectorConfig};

#[tokio::main]
async fn main() {
    let config = match ConnectorConfig::from_env_or_yaml() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("arm-connector: {e}");
            std::process::exit(2);
        }
    };
    init_logging(config.log_format);
    tracing::info!(
        subscription = %config.credentials.subscription_id,
        arm_base = %config.arm.arm_base,
        "starting ARM connector"
    );

    let bind = config.bind;
    let arm = match ArmService::new(config.arm, config.credentials) {
        Ok(arm) => Arc::new(arm),
        Err(e) => {
            tracing::error!(error = %e, "failed to build ARM client");
            std::process::exit(1);
        }
    };

    let api = Arc::new(ApiService::new(arm));
    if let Err(e) = api.start_server(bind, shutdown_signal()).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
    tracing::info!("ARM connector stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
