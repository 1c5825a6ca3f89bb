//! Cached handle onto one remote preference group.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard};

use modlink_proto::{PrefValue, PrefsBacking, PrefsMap};
use tracing::{debug, warn};

use crate::error::{RefreshError, ServiceError, StoreDeleted};

/// Live view of one remote preference group.
///
/// Handed out by the proxy as a shared `Arc`: all callers asking for
/// the same group in the same proxy see the same handle. Reads are
/// served from a local snapshot and never block on the service;
/// [`refresh`](Self::refresh) pulls a fresh snapshot on demand.
///
/// Deletion is terminal. Once the proxy deletes the group, the handle
/// flips to deleted and every read or refresh on it fails with
/// [`StoreDeleted`] from then on. The flip happens under the proxy's
/// exclusive deletion phase, so a read that started against a live
/// handle completes against consistent pre-deletion state.
pub struct RemotePreferences {
    group: String,
    deleted: AtomicBool,
    snapshot: RwLock<PrefsMap>,
    backing: Box<dyn PrefsBacking>,
    deletion: Arc<RwLock<()>>,
}

impl RemotePreferences {
    /// Wrap a transport attachment, pulling the initial snapshot.
    pub(crate) fn attach(
        group: &str,
        backing: Box<dyn PrefsBacking>,
        deletion: Arc<RwLock<()>>,
    ) -> Result<Self, ServiceError> {
        let initial = backing.load()?;
        Ok(Self {
            group: group.to_owned(),
            deleted: AtomicBool::new(false),
            snapshot: RwLock::new(initial),
            backing,
            deletion,
        })
    }

    /// Name of the preference group this handle is attached to.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Whether the group behind this handle has been deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }

    /// Boolean preference under `key`, if present with that type.
    ///
    /// # Errors
    ///
    /// Returns [`StoreDeleted`] once the group has been deleted.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, StoreDeleted> {
        Ok(self.live_snapshot()?.get(key).and_then(PrefValue::as_bool))
    }

    /// Integer preference under `key`, if present with that type.
    ///
    /// # Errors
    ///
    /// Returns [`StoreDeleted`] once the group has been deleted.
    pub fn get_i64(&self, key: &str) -> Result<Option<i64>, StoreDeleted> {
        Ok(self.live_snapshot()?.get(key).and_then(PrefValue::as_int))
    }

    /// Floating-point preference under `key`, if present with that
    /// type.
    ///
    /// # Errors
    ///
    /// Returns [`StoreDeleted`] once the group has been deleted.
    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, StoreDeleted> {
        Ok(self.live_snapshot()?.get(key).and_then(PrefValue::as_float))
    }

    /// String preference under `key`, if present with that type.
    ///
    /// # Errors
    ///
    /// Returns [`StoreDeleted`] once the group has been deleted.
    pub fn get_string(&self, key: &str) -> Result<Option<String>, StoreDeleted> {
        Ok(self
            .live_snapshot()?
            .get(key)
            .and_then(PrefValue::as_str)
            .map(str::to_owned))
    }

    /// String-set preference under `key`, if present with that type.
    ///
    /// # Errors
    ///
    /// Returns [`StoreDeleted`] once the group has been deleted.
    pub fn get_string_set(&self, key: &str) -> Result<Option<BTreeSet<String>>, StoreDeleted> {
        Ok(self
            .live_snapshot()?
            .get(key)
            .and_then(PrefValue::as_str_set)
            .cloned())
    }

    /// Whether any preference exists under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreDeleted`] once the group has been deleted.
    pub fn contains(&self, key: &str) -> Result<bool, StoreDeleted> {
        Ok(self.live_snapshot()?.contains_key(key))
    }

    /// All keys in the snapshot, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreDeleted`] once the group has been deleted.
    pub fn keys(&self) -> Result<Vec<String>, StoreDeleted> {
        let mut keys: Vec<String> = self.live_snapshot()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    /// Full copy of the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreDeleted`] once the group has been deleted.
    pub fn snapshot(&self) -> Result<PrefsMap, StoreDeleted> {
        Ok(self.live_snapshot()?.clone())
    }

    /// Pull the group's current remote contents into the local
    /// snapshot.
    ///
    /// Runs under shared deletion access, so a refresh never
    /// interleaves with the exclusive phase of a group deletion.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError::Deleted`] once the group has been
    /// deleted, or [`RefreshError::Service`] if the pull round trip
    /// fails. A failed pull leaves the previous snapshot in place.
    pub fn refresh(&self) -> Result<(), RefreshError> {
        let _shared = self.deletion.read().expect("deletion lock poisoned");
        self.guard_live()?;
        let fresh = match self.backing.load() {
            Ok(map) => map,
            Err(err) => {
                warn!(group = %self.group, error = %err, "preference snapshot pull failed");
                return Err(RefreshError::Service(err.into()));
            },
        };
        *self.snapshot.write().expect("snapshot lock poisoned") = fresh;
        debug!(group = %self.group, "refreshed preference snapshot");
        Ok(())
    }

    /// Flip the handle to deleted. Called by the proxy inside the
    /// exclusive deletion phase, after the remote delete succeeded.
    pub(crate) fn mark_deleted(&self) {
        self.deleted.store(true, Ordering::SeqCst);
        debug!(group = %self.group, "preference handle marked deleted");
    }

    fn guard_live(&self) -> Result<(), StoreDeleted> {
        if self.deleted.load(Ordering::SeqCst) {
            return Err(StoreDeleted {
                group: self.group.clone(),
            });
        }
        Ok(())
    }

    fn live_snapshot(&self) -> Result<RwLockReadGuard<'_, PrefsMap>, StoreDeleted> {
        self.guard_live()?;
        Ok(self.snapshot.read().expect("snapshot lock poisoned"))
    }
}

// =============================================================================
// Tests
// =============================================================================
