//! Helpers shared by the podinfo workspace: logging setup, version reporting and
//! per-key async locking.

pub mod keyed_lock;
pub mod logging;
pub mod version;
