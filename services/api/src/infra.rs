use metrics_exporter_prometheus::PrometheusHandle;
use nutrition_priority::error::AppError;
use nutrition_priority::reports::{PriorityReports, ReportError};
use nutrition_priority::store::{SqliteSession, SqliteStore};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) store: SqliteStore,
    pub(crate) reports: Arc<PriorityReports>,
    pub(crate) default_limit: i64,
}

impl AppState {
    /// Runs `work` on the blocking pool against a fresh session. The session is
    /// dropped, closing its connection, before the result is handed back.
    pub(crate) async fn with_session<T, F>(&self, work: F) -> Result<T, AppError>
    where
        F: FnOnce(&SqliteSession, &PriorityReports) -> Result<T, ReportError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        let reports = Arc::clone(&self.reports);

        let outcome = tokio::task::spawn_blocking(move || {
            let session = store.session()?;
            work(&session, &reports)
        })
        .await
        .map_err(|err| AppError::Io(std::io::Error::other(err)))?;

        Ok(outcome?)
    }
}
