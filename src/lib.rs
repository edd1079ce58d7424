mod backend;
mod collection;
mod controller;
mod errors;
mod models;
mod notifications;
mod observable;
mod views;

pub use backend::{CatalogBackend, PageQuery, RemoteQuery};
pub use collection::{CollectionViewStore, PageInfo, SortValue};
pub use controller::{PaginatedQueryController, QueryCriteria, ResultPage};
pub use errors::{AppError, AppResult};
pub use models::*;
pub use notifications::{Notification, NotificationAggregator, NotificationKind};
pub use observable::Observable;
pub use views::{
    ActiveTab, AppContext, DirectoryViewModel, FileViewModel, SearchViewModel, TagFilter,
    TagViewModel,
};

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Routes `tracing` output to a daily-rolling JSON log under
/// `<app_data_dir>/logs`. Call once at startup; the writer guard lives for
/// the rest of the process.
pub fn init_tracing(app_data_dir: &Path) -> Result<(), String> {
    let log_dir = app_data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "client.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
