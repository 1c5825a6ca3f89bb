//! Service-boundary contract between modlink modules and the
//! module-host service.
//!
//! This crate defines the vocabulary both sides of the boundary speak:
//! the [`ServiceTransport`] capability with one method per remote
//! operation, the [`TransportError`] taxonomy for round trips that do
//! not complete, typed preference values, privilege codes and their
//! total decoding, and the open-mode bits for remote files. The client
//! proxy in `modlink-client` consumes these; service bridges implement
//! them.
//!
//! The `loopback` feature (on by default) ships an in-process service
//! implementation used by tests and local development.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
#[cfg(feature = "loopback")]
pub mod loopback;
pub mod prefs;
pub mod privilege;
pub mod transport;

pub use error::{FeaturedCallError, TransportError};
pub use prefs::{PrefValue, PrefsMap};
pub use privilege::{
    Privilege, WIRE_PRIVILEGE_APP, WIRE_PRIVILEGE_CONTAINER, WIRE_PRIVILEGE_EMBEDDED,
    WIRE_PRIVILEGE_ROOT,
};
pub use transport::{
    Bundle, PrefsBacking, ScopeCallback, ScopeOutcome, ServiceTransport, MODE_APPEND, MODE_CREATE,
    MODE_READ_ONLY, MODE_READ_WRITE, MODE_TRUNCATE, MODE_WRITE_ONLY,
};
