//! Application module
//!
//! Wiring and lifecycle of the controller process, organized into logical
//! sub-modules.

pub mod builder;
pub mod core;
pub mod services;
pub mod tasks;

pub use builder::ApplicationBuilder;
pub use self::core::Application;
pub use services::ApplicationServices;
