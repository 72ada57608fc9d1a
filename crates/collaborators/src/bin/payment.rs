//! Payment service entry point.

use collaborators::{PaymentConfig, payment, telemetry};

#[tokio::main]
async fn main() {
    telemetry::init_tracing();

    let config = match PaymentConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };
    tracing::info!(failure_rate = config.failure_rate, "payment service configured");

    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let app = telemetry::with_observability(
        payment::router(config),
        payment::SERVICE_NAME,
        metrics_handle,
    );
    let port = telemetry::port_from_env(payment::DEFAULT_PORT);

    if let Err(e) = telemetry::serve(app, payment::SERVICE_NAME, port).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
