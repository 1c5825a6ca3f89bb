//! The capability through which the client proxy reaches the remote
//! module-host service.
//!
//! [`ServiceTransport`] is the complete remote surface: one method per
//! operation the service answers, every one of them a blocking round
//! trip. The client proxy owns exactly one transport for its lifetime
//! and layers caching, error folding and deletion coordination on top;
//! transports stay dumb pipes.

use std::fs::File;

use crate::error::{FeaturedCallError, TransportError};
use crate::prefs::PrefsMap;

/// Structured key/value payload for the vendor extension call.
///
/// Arguments and results of featured methods are free-form trees; the
/// framework vendor defines their shape per method name.
pub type Bundle = serde_json::Map<String, serde_json::Value>;

/// Terminal outcome of a scope request, delivered to the callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeOutcome {
    /// The package was added to the module's scope.
    Approved,
    /// The request was turned down.
    Denied {
        /// Human-readable reason for the refusal.
        reason: String,
    },
}

/// Callback consumed when a scope request completes.
///
/// Boxed `FnOnce` so delivery is structurally exactly-once: the
/// transport invokes it on a thread it owns, and a second invocation
/// cannot be expressed. The callback must not assume it runs on the
/// thread that submitted the request.
pub type ScopeCallback = Box<dyn FnOnce(ScopeOutcome) + Send + 'static>;

/// Attachment to one remote preference group.
///
/// Produced by [`ServiceTransport::attach_preferences`]. How group
/// contents move from the service to the client is the transport's
/// business; the proxy only pulls point-in-time snapshots through this
/// seam.
pub trait PrefsBacking: Send + Sync {
    /// Pull the current contents of the attached group.
    fn load(&self) -> Result<PrefsMap, TransportError>;
}

/// Open the remote file for reading.
pub const MODE_READ_ONLY: i32 = 0x1000_0000;
/// Open the remote file for writing.
pub const MODE_WRITE_ONLY: i32 = 0x2000_0000;
/// Open the remote file for both reading and writing.
pub const MODE_READ_WRITE: i32 = 0x3000_0000;
/// Create the remote file if it does not exist.
pub const MODE_CREATE: i32 = 0x0800_0000;
/// Discard existing contents on open.
pub const MODE_TRUNCATE: i32 = 0x0400_0000;
/// Position every write at the end of the file.
pub const MODE_APPEND: i32 = 0x0200_0000;

/// Blocking remote surface of the module-host service.
///
/// Implementations are shared across threads behind an `Arc`, so every
/// method takes `&self` and interior state must be synchronized.
/// Methods returning `Option` use `None` for soft absence (the
/// operation completed but the thing asked about does not exist or is
/// unavailable in this execution mode); `Err` is reserved for round
/// trips that did not complete.
pub trait ServiceTransport: Send + Sync {
    /// Version of the service API implemented by the remote side.
    fn api_version(&self) -> Result<i32, TransportError>;

    /// Human-readable name of the framework implementation.
    fn framework_name(&self) -> Result<String, TransportError>;

    /// Human-readable version of the framework implementation.
    fn framework_version(&self) -> Result<String, TransportError>;

    /// Monotonic numeric version of the framework implementation.
    fn framework_version_code(&self) -> Result<i64, TransportError>;

    /// Raw privilege code of the framework process.
    ///
    /// Returned undecoded; the client folds it through
    /// [`Privilege::from_wire`](crate::privilege::Privilege::from_wire)
    /// so unknown codes stay total.
    fn framework_privilege(&self) -> Result<i32, TransportError>;

    /// Invoke a vendor-defined extension method by name.
    ///
    /// `None` in the reply position means the method completed without
    /// producing a result payload.
    fn featured_method(
        &self,
        name: &str,
        args: Option<&Bundle>,
    ) -> Result<Option<Bundle>, FeaturedCallError>;

    /// Packages currently in this module's scope.
    fn scope(&self) -> Result<Vec<String>, TransportError>;

    /// Ask the service to add `package` to the module's scope.
    ///
    /// Returns as soon as the request is accepted for processing; the
    /// decision arrives later through `callback`, exactly once.
    fn request_scope(&self, package: &str, callback: ScopeCallback) -> Result<(), TransportError>;

    /// Ask the service to remove `package` from the module's scope.
    ///
    /// `None` means the removal happened; `Some(reason)` is a
    /// human-readable refusal. Refusals are reported in-band, not as
    /// errors.
    fn remove_scope(&self, package: &str) -> Result<Option<String>, TransportError>;

    /// Attach to the named remote preference group, creating it if
    /// absent.
    ///
    /// `None` means remote preference storage does not exist in this
    /// execution mode.
    fn attach_preferences(&self, group: &str)
        -> Result<Option<Box<dyn PrefsBacking>>, TransportError>;

    /// Delete the named remote preference group and all its contents.
    ///
    /// Deleting a group that does not exist is not an error.
    fn delete_preferences(&self, group: &str) -> Result<(), TransportError>;

    /// Open a file in the module's remote directory.
    ///
    /// `mode` is a bitwise combination of the `MODE_*` constants.
    /// `None` means the file is unavailable: it does not exist for a
    /// read-only open, or remote file storage does not exist in this
    /// execution mode.
    fn open_remote_file(&self, name: &str, mode: i32) -> Result<Option<File>, TransportError>;

    /// Delete a file in the module's remote directory.
    ///
    /// `Ok(false)` means nothing was deleted, either because the file
    /// was absent or because remote file storage does not exist in
    /// this execution mode.
    fn delete_remote_file(&self, name: &str) -> Result<bool, TransportError>;

    /// List the files in the module's remote directory.
    ///
    /// `None` means remote file storage does not exist in this
    /// execution mode.
    fn list_remote_files(&self) -> Result<Option<Vec<String>>, TransportError>;
}
