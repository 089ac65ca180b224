//! # sigbridge Management
//!
//! Read-only management surface for a running bridge. It never touches the
//! executive or adapters directly: status and version come from a
//! [`StatusSource`](sigbridge_core::StatusSource), log files from a fixed
//! [`LogDirectory`].

pub mod error;
pub mod logs;
pub mod server;

pub use error::{ManagementError, ManagementResult};
pub use logs::{LogDirectory, LogFileInfo};
pub use server::{ManagementHandle, router, serve};
