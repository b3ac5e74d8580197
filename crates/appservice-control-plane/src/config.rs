//! Control plane configuration.

use crate::store::DEFAULT_MAX_PAGE_SIZE;

/// Control plane configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address.
    pub http_addr: String,

    /// JSON file listing the app catalog. No file means an empty catalog.
    pub catalog_path: Option<String>,

    /// Directory the process executor keeps per-task files in.
    pub work_dir: String,

    /// Upper bound on `enumerate_tasks` page sizes.
    pub max_page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: "[::1]:50052".to_string(),
            catalog_path: None,
            work_dir: "appservice-work".to_string(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}
