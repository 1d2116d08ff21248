pub mod api;
pub mod app;
pub mod config;
pub mod domain;
mod infrastructure;

pub use infrastructure::dispatcher;
pub use infrastructure::k8s;
pub use infrastructure::kube_client;
pub use infrastructure::logging;
