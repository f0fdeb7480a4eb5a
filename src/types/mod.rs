//! Core type definitions using newtype patterns for type safety.
//!
//! Invalid ports, ranges and targets are rejected here, before any
//! connection is attempted.

mod port;
mod target;

pub use port::{Port, PortError, PortRange};
pub use target::{ScanTarget, TargetError, TargetSpec};
