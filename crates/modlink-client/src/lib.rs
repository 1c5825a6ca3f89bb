//! Client-side proxy for the privileged module-host service.
//!
//! A loaded module talks to its host framework through one connection
//! to an out-of-process service. This crate wraps that connection in
//! [`ModuleService`]: typed metadata queries, vendor extension calls,
//! scope management, remote preference groups with cached
//! identity-stable handles, and remote file storage. The remote
//! surface itself is the [`ServiceTransport`] trait from
//! `modlink-proto`; any transport that implements it plugs in
//! unchanged, including the in-process loopback used below.
//!
//! ```
//! use std::sync::Arc;
//!
//! use modlink_client::ModuleService;
//! use modlink_proto::loopback::LoopbackService;
//!
//! let loopback = LoopbackService::new().unwrap();
//! loopback.set_preference("settings", "enabled", true);
//! let service = ModuleService::new(Arc::new(loopback));
//!
//! assert_eq!(service.framework_name().unwrap(), "loopback");
//!
//! let prefs = service
//!     .remote_preferences("settings")
//!     .unwrap()
//!     .expect("storage available");
//! assert_eq!(prefs.get_bool("enabled").unwrap(), Some(true));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod files;
pub mod prefs;
pub mod service;

pub use error::{FeaturedMethodError, RefreshError, ServiceError, StoreDeleted};
pub use files::{RemoteFileReader, RemoteFileWriter, WriteMode};
pub use prefs::RemotePreferences;
pub use service::ModuleService;

// Boundary vocabulary, re-exported so module code needs one import
// path.
pub use modlink_proto::{
    Bundle, PrefValue, PrefsMap, Privilege, ScopeCallback, ScopeOutcome, ServiceTransport,
};
