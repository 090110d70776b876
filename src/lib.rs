//! GPIO status sync library.
//!
//! Polls a remote on/off status and keeps a single output pin in step with
//! it, writing the pin only when the status changes.

pub mod config;
pub mod controller;
pub mod error;
pub mod instance_lock;
pub mod output;
pub mod shutdown;
pub mod source;
pub mod status;

pub use controller::{Controller, TickOutcome};
pub use error::{Result, SyncError};
pub use status::Status;
