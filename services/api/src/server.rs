use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::report_router;
use axum_prometheus::PrometheusMetricLayer;
use nutrition_priority::config::AppConfig;
use nutrition_priority::error::AppError;
use nutrition_priority::reports::PriorityReports;
use nutrition_priority::store::SqliteStore;
use nutrition_priority::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let store = SqliteStore::from_config(&config.store);
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        store,
        reports: Arc::new(PriorityReports::new(&config.schema)),
        default_limit: config.default_limit,
    };

    let app = report_router(app_state).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        database = %config.store.database_path.display(),
        "nutrition priority service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
