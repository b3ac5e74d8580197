//! Service layer: the method surface and the components behind it.

pub mod app_service;
pub mod lifecycle;
pub mod query;

pub use app_service::AppService;
pub use lifecycle::LifecycleController;
pub use query::QueryService;
