//! The client-side proxy for the module-host service.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use modlink_proto::{
    Bundle, FeaturedCallError, Privilege, ScopeCallback, ServiceTransport, MODE_READ_ONLY,
};
use tracing::{debug, warn};

use crate::error::{FeaturedMethodError, ServiceError};
use crate::files::{RemoteFileReader, RemoteFileWriter, WriteMode};
use crate::prefs::RemotePreferences;

/// Typed facade over one connection to the module-host service.
///
/// Constructed once per connection by the bootstrap path and shared
/// across the module's threads. Every operation is a blocking round
/// trip on the caller's thread; the proxy adds no queueing of its own.
///
/// The proxy keeps one cached [`RemotePreferences`] handle per group,
/// so every caller asking for the same group gets the same `Arc`.
/// Group deletion runs under the proxy-wide deletion lock: attachment
/// and snapshot refresh take it shared, deletion takes it exclusive,
/// so a deletion never interleaves with handle creation and a deleted
/// handle is never observed live again.
pub struct ModuleService {
    transport: Arc<dyn ServiceTransport>,
    stores: RwLock<HashMap<String, Arc<RemotePreferences>>>,
    deletion: Arc<RwLock<()>>,
}

impl ModuleService {
    /// Wrap a connected transport.
    #[must_use]
    pub fn new(transport: Arc<dyn ServiceTransport>) -> Self {
        Self {
            transport,
            stores: RwLock::new(HashMap::new()),
            deletion: Arc::new(RwLock::new(())),
        }
    }

    /// Version of the service API implemented by the remote side.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the round trip fails.
    pub fn api_version(&self) -> Result<i32, ServiceError> {
        Ok(self.transport.api_version()?)
    }

    /// Human-readable name of the framework implementation.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the round trip fails.
    pub fn framework_name(&self) -> Result<String, ServiceError> {
        Ok(self.transport.framework_name()?)
    }

    /// Human-readable version of the framework implementation.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the round trip fails.
    pub fn framework_version(&self) -> Result<String, ServiceError> {
        Ok(self.transport.framework_version()?)
    }

    /// Monotonic numeric version of the framework implementation.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the round trip fails.
    pub fn framework_version_code(&self) -> Result<i64, ServiceError> {
        Ok(self.transport.framework_version_code()?)
    }

    /// Execution privilege of the framework process.
    ///
    /// The raw wire code is decoded totally: a code this client does
    /// not know comes back as [`Privilege::Unknown`] rather than an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the round trip fails.
    pub fn framework_privilege(&self) -> Result<Privilege, ServiceError> {
        let code = self.transport.framework_privilege()?;
        Ok(Privilege::from_wire(code))
    }

    /// Invoke a vendor-defined extension method by name.
    ///
    /// `Ok(None)` means the method ran but produced no result payload.
    ///
    /// # Errors
    ///
    /// Returns [`FeaturedMethodError::Unsupported`] if the framework
    /// does not provide the named method, or
    /// [`FeaturedMethodError::Service`] if the round trip fails.
    pub fn featured_method(
        &self,
        name: &str,
        args: Option<&Bundle>,
    ) -> Result<Option<Bundle>, FeaturedMethodError> {
        match self.transport.featured_method(name, args) {
            Ok(reply) => Ok(reply),
            Err(FeaturedCallError::Unsupported) => Err(FeaturedMethodError::Unsupported {
                name: name.to_owned(),
            }),
            Err(FeaturedCallError::Transport(err)) => Err(FeaturedMethodError::Service(err.into())),
        }
    }

    /// Packages currently in this module's scope.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the round trip fails.
    pub fn scope(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.transport.scope()?)
    }

    /// Ask the service to add `package` to this module's scope.
    ///
    /// Returns as soon as the request is accepted; the decision
    /// arrives later through `callback`, exactly once, on a thread
    /// owned by the transport.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the request cannot be submitted.
    /// The callback is not invoked in that case.
    pub fn request_scope(
        &self,
        package: &str,
        callback: ScopeCallback,
    ) -> Result<(), ServiceError> {
        self.transport.request_scope(package, callback)?;
        debug!(package, "scope request submitted");
        Ok(())
    }

    /// Ask the service to remove `package` from this module's scope.
    ///
    /// `Ok(None)` means the package was removed. `Ok(Some(reason))`
    /// carries the service's human-readable refusal; a refusal is an
    /// in-band outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the round trip fails.
    pub fn remove_scope(&self, package: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.transport.remove_scope(package)?)
    }

    /// Handle onto the named remote preference group, creating the
    /// group on first attachment.
    ///
    /// Repeated calls for the same group return the same `Arc` for as
    /// long as the group is not deleted. `Ok(None)` means remote
    /// preference storage does not exist in this execution mode (an
    /// embedded framework); nothing is cached in that case, and
    /// nothing is cached when the attachment fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the attachment round trip fails.
    pub fn remote_preferences(
        &self,
        group: &str,
    ) -> Result<Option<Arc<RemotePreferences>>, ServiceError> {
        // Shared deletion access for the whole attach, so creation
        // never interleaves with a group deletion.
        let _shared = self.deletion.read().expect("deletion lock poisoned");

        {
            let stores = self.stores.read().expect("preference cache lock poisoned");
            if let Some(handle) = stores.get(group) {
                return Ok(Some(Arc::clone(handle)));
            }
        }

        let mut stores = self.stores.write().expect("preference cache lock poisoned");
        // Double-check: another thread may have attached while we
        // waited for the write lock.
        if let Some(handle) = stores.get(group) {
            return Ok(Some(Arc::clone(handle)));
        }

        let Some(backing) = self.transport.attach_preferences(group)? else {
            debug!(group, "remote preference storage unavailable");
            return Ok(None);
        };
        let handle = Arc::new(RemotePreferences::attach(
            group,
            backing,
            Arc::clone(&self.deletion),
        )?);
        stores.insert(group.to_owned(), Arc::clone(&handle));
        debug!(group, "attached remote preference group");
        Ok(Some(handle))
    }

    /// Delete the named remote preference group and all its contents.
    ///
    /// Runs the proxy's exclusive deletion phase: the remote delete
    /// happens first, and only after it succeeds is the cached handle
    /// evicted and flipped to deleted. A later
    /// [`remote_preferences`](Self::remote_preferences) call attaches
    /// a fresh handle. Deleting a group that was never attached, or
    /// does not exist, succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the round trip fails; the cached
    /// handle, if any, stays live in that case.
    pub fn delete_remote_preferences(&self, group: &str) -> Result<(), ServiceError> {
        let _exclusive = self.deletion.write().expect("deletion lock poisoned");
        if let Err(err) = self.transport.delete_preferences(group) {
            warn!(group, error = %err, "remote preference deletion failed");
            return Err(err.into());
        }

        let evicted = self
            .stores
            .write()
            .expect("preference cache lock poisoned")
            .remove(group);
        if let Some(handle) = evicted {
            handle.mark_deleted();
        }
        debug!(group, "deleted remote preference group");
        Ok(())
    }

    /// Open a file in the module's remote directory for reading.
    ///
    /// `Ok(None)` means the file is unavailable: it does not exist, or
    /// remote file storage does not exist in this execution mode.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the round trip fails.
    pub fn open_remote_file_input(
        &self,
        name: &str,
    ) -> Result<Option<RemoteFileReader>, ServiceError> {
        let file = self.transport.open_remote_file(name, MODE_READ_ONLY)?;
        Ok(file.map(RemoteFileReader::new))
    }

    /// Open a file in the module's remote directory for writing,
    /// creating it if absent.
    ///
    /// `Ok(None)` means remote file storage does not exist in this
    /// execution mode.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the round trip fails.
    pub fn open_remote_file_output(
        &self,
        name: &str,
        mode: WriteMode,
    ) -> Result<Option<RemoteFileWriter>, ServiceError> {
        let file = self.transport.open_remote_file(name, mode.to_wire())?;
        Ok(file.map(RemoteFileWriter::new))
    }

    /// Delete a file in the module's remote directory.
    ///
    /// `Ok(false)` means nothing was deleted, either because the file
    /// was absent or because remote file storage does not exist in
    /// this execution mode.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the round trip fails.
    pub fn delete_remote_file(&self, name: &str) -> Result<bool, ServiceError> {
        Ok(self.transport.delete_remote_file(name)?)
    }

    /// List the files in the module's remote directory.
    ///
    /// `Ok(None)` means remote file storage does not exist in this
    /// execution mode.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the round trip fails.
    pub fn list_remote_files(&self) -> Result<Option<Vec<String>>, ServiceError> {
        Ok(self.transport.list_remote_files()?)
    }
}

// =============================================================================
// Tests
// =============================================================================
