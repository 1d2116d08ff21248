//! Reconciliation of PodInfo records against Pods.
//!
//! The main components are:
//! - [`PodInfoReconciler`]: decides per Pod whether to create, keep or delete its PodInfo
//! - [`IdentityCache`]: remembers which PodInfo was created for which Pod
//! - [`eligibility`] and [`resources`]: pure inspection of a Pod

pub mod eligibility;
pub mod error;
pub mod identity_cache;
pub mod mock;
pub mod quantity;
pub mod reconciler;
pub mod resources;
pub mod traits;
pub mod types;

pub use error::ReconcileError;
pub use identity_cache::IdentityCache;
pub use reconciler::PodInfoReconciler;
pub use reconciler::ReconcilerSettings;
pub use traits::PodInfoStore;
pub use traits::PodSource;
pub use types::PodKey;
pub use types::ReconcileOutcome;
