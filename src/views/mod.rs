//! View models: one per screen, orchestrating the stores and controllers
//! against the backend traits. They own no UI; they expose observables the
//! UI layer renders from.

mod app;
mod directories;
mod files;
mod search;
mod tags;

pub use app::{ActiveTab, AppContext};
pub use directories::DirectoryViewModel;
pub use files::FileViewModel;
pub use search::SearchViewModel;
pub use tags::{TagFilter, TagViewModel};

use crate::errors::AppResult;
use crate::notifications::NotificationAggregator;
use crate::observable::Observable;
use std::future::Future;

/// Shared shape of a user-triggered backend call: busy flag around the await,
/// failures logged and surfaced as an error notification, `None` on failure.
pub(crate) async fn run_notified<T, F>(
    notifications: &NotificationAggregator,
    busy: &Observable<bool>,
    action: &str,
    operation: F,
) -> Option<T>
where
    F: Future<Output = AppResult<T>>,
{
    busy.set(true);
    let outcome = operation.await;
    busy.set(false);
    match outcome {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(action, %error, "backend call failed");
            notifications.error(&format!("{action}: {error}"));
            None
        }
    }
}
