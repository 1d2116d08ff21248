//! HTTP API for inspecting the controller
//!
//! The routes are read-only views of the identity cache, that is, of the
//! PodInfo records this process believes it owns.
//!
//! # API Endpoints
//!
//! - `GET /healthz` - Liveness probe, answers `ok`
//! - `GET /api/v1/podinfos` - Every tracked PodInfo
//! - `GET /api/v1/podinfos/:pod_name` - The PodInfo tracked for one Pod

pub mod errors;
pub mod handlers;
pub mod server;

pub use errors::ApiError;
pub use server::ApiServer;
