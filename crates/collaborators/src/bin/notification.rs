//! Notification service entry point.

use collaborators::{notification, telemetry};

#[tokio::main]
async fn main() {
    telemetry::init_tracing();

    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let app = telemetry::with_observability(
        notification::router(notification::DEFAULT_DELIVERY_DELAY),
        notification::SERVICE_NAME,
        metrics_handle,
    );
    let port = telemetry::port_from_env(notification::DEFAULT_PORT);

    if let Err(e) = telemetry::serve(app, notification::SERVICE_NAME, port).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
