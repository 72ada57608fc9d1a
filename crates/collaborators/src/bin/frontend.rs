//! Frontend gateway entry point.

use collaborators::{CartClient, frontend, telemetry};

#[tokio::main]
async fn main() {
    telemetry::init_tracing();

    let cart = CartClient::from_env().expect("failed to build cart client");

    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let app = telemetry::with_observability(
        frontend::router(cart),
        frontend::SERVICE_NAME,
        metrics_handle,
    );
    let port = telemetry::port_from_env(frontend::DEFAULT_PORT);

    if let Err(e) = telemetry::serve(app, frontend::SERVICE_NAME, port).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
