//! HTTP request handlers.

mod apps;
mod health;
mod tasks;

pub use apps::{enumerate_apps, service_status, start_app, start_app2};
pub use health::{health_check, metrics_handler};
pub use tasks::{
    enumerate_tasks, kill_task, query_task_details, query_task_summary, query_tasks, rerun_task,
};

use axum::http::{header, HeaderMap};

use appservice_core::CallerContext;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Build the caller context from request headers.
///
/// The `Authorization` value is passed through verbatim.
pub(crate) fn caller_from_headers(headers: &HeaderMap) -> CallerContext {
    let read = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    CallerContext {
        user_id: read(USER_ID_HEADER),
        token: read(header::AUTHORIZATION.as_str()),
    }
}
