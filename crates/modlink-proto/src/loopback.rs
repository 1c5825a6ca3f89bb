//! In-process module-host service.
//!
//! [`LoopbackService`] implements the full [`ServiceTransport`]
//! surface against process-local state: preferences live in a table
//! behind a mutex, remote files live in a temporary directory, and
//! scope decisions are delivered from a spawned thread so callers see
//! the same asynchrony a real service exhibits. Integration tests and
//! local development run against it without a privileged host.
//!
//! Fault injection is part of the surface: [`sever`] makes every
//! subsequent call fail like a dead service, and
//! [`with_privilege_code`] accepts arbitrary codes so clients can be
//! driven through the embedded and unknown-privilege paths.
//!
//! [`sever`]: LoopbackService::sever
//! [`with_privilege_code`]: LoopbackService::with_privilege_code

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use tempfile::TempDir;

use crate::error::{FeaturedCallError, TransportError};
use crate::prefs::{PrefValue, PrefsMap};
use crate::privilege::{WIRE_PRIVILEGE_APP, WIRE_PRIVILEGE_EMBEDDED};
use crate::transport::{
    Bundle, PrefsBacking, ScopeCallback, ScopeOutcome, ServiceTransport, MODE_APPEND, MODE_CREATE,
    MODE_READ_ONLY, MODE_TRUNCATE, MODE_WRITE_ONLY,
};

/// API version reported by the loopback service.
pub const LOOPBACK_API_VERSION: i32 = 100;

type FeaturedFn = Box<dyn Fn(Option<&Bundle>) -> Option<Bundle> + Send + Sync>;

/// Process-local [`ServiceTransport`] implementation.
pub struct LoopbackService {
    framework_name: String,
    framework_version: String,
    framework_version_code: i64,
    privilege_code: i32,
    featured: HashMap<String, FeaturedFn>,
    deny_reasons: HashMap<String, String>,
    severed: Arc<AtomicBool>,
    scope: Arc<Mutex<Vec<String>>>,
    prefs: Arc<Mutex<HashMap<String, PrefsMap>>>,
    files: TempDir,
}

impl LoopbackService {
    /// Create a loopback service with default identity and an empty
    /// store.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory backing remote
    /// files cannot be created.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            framework_name: "loopback".to_owned(),
            framework_version: "0.0.0".to_owned(),
            framework_version_code: 0,
            privilege_code: WIRE_PRIVILEGE_APP,
            featured: HashMap::new(),
            deny_reasons: HashMap::new(),
            severed: Arc::new(AtomicBool::new(false)),
            scope: Arc::new(Mutex::new(Vec::new())),
            prefs: Arc::new(Mutex::new(HashMap::new())),
            files: TempDir::new()?,
        })
    }

    /// Override the framework identity reported by metadata queries.
    #[must_use]
    pub fn with_framework_info(
        mut self,
        name: impl Into<String>,
        version: impl Into<String>,
        version_code: i64,
    ) -> Self {
        self.framework_name = name.into();
        self.framework_version = version.into();
        self.framework_version_code = version_code;
        self
    }

    /// Override the raw privilege code reported to clients.
    ///
    /// Any `i32` is accepted, including codes outside the known range,
    /// so decoder totality can be exercised end to end.
    #[must_use]
    pub fn with_privilege_code(mut self, code: i32) -> Self {
        self.privilege_code = code;
        self
    }

    /// Register a featured method under `name`.
    #[must_use]
    pub fn with_featured_method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(Option<&Bundle>) -> Option<Bundle> + Send + Sync + 'static,
    {
        self.featured.insert(name.into(), Box::new(method));
        self
    }

    /// Pre-register a refusal for scope requests naming `package`.
    #[must_use]
    pub fn with_denied_package(
        mut self,
        package: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        self.deny_reasons.insert(package.into(), reason.into());
        self
    }

    /// Seed the module scope with `packages`.
    #[must_use]
    pub fn with_scope<I, S>(self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut scope = self.scope.lock().expect("scope lock poisoned");
            scope.extend(packages.into_iter().map(Into::into));
        }
        self
    }

    /// Write one preference into a group, creating the group if
    /// needed.
    ///
    /// Takes effect on attached handles at their next refresh.
    pub fn set_preference(&self, group: &str, key: &str, value: impl Into<PrefValue>) {
        let mut prefs = self.prefs.lock().expect("preference table lock poisoned");
        prefs
            .entry(group.to_owned())
            .or_default()
            .insert(key.to_owned(), value.into());
    }

    /// Whether the named preference group currently exists in the
    /// service store.
    #[must_use]
    pub fn has_preference_group(&self, group: &str) -> bool {
        self.prefs
            .lock()
            .expect("preference table lock poisoned")
            .contains_key(group)
    }

    /// Sever the connection.
    ///
    /// Every subsequent call, including snapshot pulls on already
    /// attached preference groups, fails with
    /// [`TransportError::ConnectionLost`].
    pub fn sever(&self) {
        self.severed.store(true, Ordering::SeqCst);
    }

    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.severed.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionLost);
        }
        Ok(())
    }

    const fn storage_unavailable(&self) -> bool {
        self.privilege_code == WIRE_PRIVILEGE_EMBEDDED
    }

    fn file_path(&self, name: &str) -> Result<PathBuf, TransportError> {
        // The remote directory is flat; names are not paths.
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(TransportError::fault(format!(
                "invalid remote file name: {name:?}"
            )));
        }
        Ok(self.files.path().join(name))
    }
}

impl ServiceTransport for LoopbackService {
    fn api_version(&self) -> Result<i32, TransportError> {
        self.ensure_connected()?;
        Ok(LOOPBACK_API_VERSION)
    }

    fn framework_name(&self) -> Result<String, TransportError> {
        self.ensure_connected()?;
        Ok(self.framework_name.clone())
    }

    fn framework_version(&self) -> Result<String, TransportError> {
        self.ensure_connected()?;
        Ok(self.framework_version.clone())
    }

    fn framework_version_code(&self) -> Result<i64, TransportError> {
        self.ensure_connected()?;
        Ok(self.framework_version_code)
    }

    fn framework_privilege(&self) -> Result<i32, TransportError> {
        self.ensure_connected()?;
        Ok(self.privilege_code)
    }

    fn featured_method(
        &self,
        name: &str,
        args: Option<&Bundle>,
    ) -> Result<Option<Bundle>, FeaturedCallError> {
        self.ensure_connected()?;
        match self.featured.get(name) {
            Some(method) => Ok(method(args)),
            None => Err(FeaturedCallError::Unsupported),
        }
    }

    fn scope(&self) -> Result<Vec<String>, TransportError> {
        self.ensure_connected()?;
        Ok(self.scope.lock().expect("scope lock poisoned").clone())
    }

    fn request_scope(&self, package: &str, callback: ScopeCallback) -> Result<(), TransportError> {
        self.ensure_connected()?;
        let outcome = match self.deny_reasons.get(package) {
            Some(reason) => ScopeOutcome::Denied {
                reason: reason.clone(),
            },
            None => ScopeOutcome::Approved,
        };
        let package = package.to_owned();
        let scope = Arc::clone(&self.scope);
        // Decide now, deliver later: the callback runs on a service
        // thread after the scope table reflects the outcome.
        thread::spawn(move || {
            if matches!(outcome, ScopeOutcome::Approved) {
                let mut scope = scope.lock().expect("scope lock poisoned");
                if !scope.contains(&package) {
                    scope.push(package);
                }
            }
            callback(outcome);
        });
        Ok(())
    }

    fn remove_scope(&self, package: &str) -> Result<Option<String>, TransportError> {
        self.ensure_connected()?;
        let mut scope = self.scope.lock().expect("scope lock poisoned");
        match scope.iter().position(|p| p == package) {
            Some(index) => {
                scope.remove(index);
                Ok(None)
            },
            None => Ok(Some(format!("{package} is not in the module scope"))),
        }
    }

    fn attach_preferences(
        &self,
        group: &str,
    ) -> Result<Option<Box<dyn PrefsBacking>>, TransportError> {
        self.ensure_connected()?;
        if self.storage_unavailable() {
            return Ok(None);
        }
        let mut prefs = self.prefs.lock().expect("preference table lock poisoned");
        prefs.entry(group.to_owned()).or_default();
        Ok(Some(Box::new(LoopbackBacking {
            group: group.to_owned(),
            prefs: Arc::clone(&self.prefs),
            severed: Arc::clone(&self.severed),
        })))
    }

    fn delete_preferences(&self, group: &str) -> Result<(), TransportError> {
        self.ensure_connected()?;
        let mut prefs = self.prefs.lock().expect("preference table lock poisoned");
        prefs.remove(group);
        Ok(())
    }

    fn open_remote_file(&self, name: &str, mode: i32) -> Result<Option<File>, TransportError> {
        self.ensure_connected()?;
        if self.storage_unavailable() {
            return Ok(None);
        }
        let path = self.file_path(name)?;
        let mut options = OpenOptions::new();
        options
            .read(mode & MODE_READ_ONLY != 0)
            .write(mode & MODE_WRITE_ONLY != 0)
            .create(mode & MODE_CREATE != 0)
            .truncate(mode & MODE_TRUNCATE != 0)
            .append(mode & MODE_APPEND != 0);
        match options.open(&path) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TransportError::fault(e.to_string())),
        }
    }

    fn delete_remote_file(&self, name: &str) -> Result<bool, TransportError> {
        self.ensure_connected()?;
        if self.storage_unavailable() {
            return Ok(false);
        }
        let path = self.file_path(name)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(TransportError::fault(e.to_string())),
        }
    }

    fn list_remote_files(&self) -> Result<Option<Vec<String>>, TransportError> {
        self.ensure_connected()?;
        if self.storage_unavailable() {
            return Ok(None);
        }
        let entries = std::fs::read_dir(self.files.path())
            .map_err(|e| TransportError::fault(e.to_string()))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TransportError::fault(e.to_string()))?;
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(_) => return Err(TransportError::fault("remote file name is not UTF-8")),
            }
        }
        names.sort();
        Ok(Some(names))
    }
}

struct LoopbackBacking {
    group: String,
    prefs: Arc<Mutex<HashMap<String, PrefsMap>>>,
    severed: Arc<AtomicBool>,
}

impl PrefsBacking for LoopbackBacking {
    fn load(&self) -> Result<PrefsMap, TransportError> {
        if self.severed.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionLost);
        }
        let prefs = self.prefs.lock().expect("preference table lock poisoned");
        Ok(prefs.get(&self.group).cloned().unwrap_or_default())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::transport::MODE_READ_WRITE;

    #[test]
    fn test_metadata_defaults() {
        let svc = LoopbackService::new().unwrap();
        assert_eq!(svc.api_version().unwrap(), LOOPBACK_API_VERSION);
        assert_eq!(svc.framework_name().unwrap(), "loopback");
        assert_eq!(svc.framework_version().unwrap(), "0.0.0");
        assert_eq!(svc.framework_version_code().unwrap(), 0);
        assert_eq!(svc.framework_privilege().unwrap(), WIRE_PRIVILEGE_APP);
    }

    #[test]
    fn test_framework_info_override() {
        let svc = LoopbackService::new()
            .unwrap()
            .with_framework_info("TestFramework", "9.9.9", 909);
        assert_eq!(svc.framework_name().unwrap(), "TestFramework");
        assert_eq!(svc.framework_version().unwrap(), "9.9.9");
        assert_eq!(svc.framework_version_code().unwrap(), 909);
    }

    #[test]
    fn test_severed_connection_fails_calls() {
        let svc = LoopbackService::new().unwrap();
        svc.sever();
        assert!(matches!(
            svc.api_version(),
            Err(TransportError::ConnectionLost)
        ));
        assert!(matches!(svc.scope(), Err(TransportError::ConnectionLost)));
        assert!(matches!(
            svc.attach_preferences("cfg"),
            Err(TransportError::ConnectionLost)
        ));
    }

    #[test]
    fn test_severed_connection_fails_attached_backing() {
        let svc = LoopbackService::new().unwrap();
        let backing = svc.attach_preferences("cfg").unwrap().unwrap();
        assert!(backing.load().is_ok());
        svc.sever();
        assert!(matches!(
            backing.load(),
            Err(TransportError::ConnectionLost)
        ));
    }

    #[test]
    fn test_embedded_reports_storage_absent() {
        let svc = LoopbackService::new()
            .unwrap()
            .with_privilege_code(WIRE_PRIVILEGE_EMBEDDED);
        assert!(svc.attach_preferences("cfg").unwrap().is_none());
        assert!(svc
            .open_remote_file("log.txt", MODE_READ_ONLY)
            .unwrap()
            .is_none());
        assert!(!svc.delete_remote_file("log.txt").unwrap());
        assert!(svc.list_remote_files().unwrap().is_none());
    }

    #[test]
    fn test_featured_method_registry() {
        let svc = LoopbackService::new()
            .unwrap()
            .with_featured_method("echo", |args| args.cloned());
        let mut args = Bundle::new();
        args.insert("k".to_owned(), serde_json::json!(1));

        let reply = svc.featured_method("echo", Some(&args)).unwrap();
        assert_eq!(reply, Some(args));
        assert!(svc.featured_method("echo", None).unwrap().is_none());
        assert!(matches!(
            svc.featured_method("missing", None),
            Err(FeaturedCallError::Unsupported)
        ));
    }

    #[test]
    fn test_attach_creates_group_and_loads_writes() {
        let svc = LoopbackService::new().unwrap();
        assert!(!svc.has_preference_group("cfg"));
        let backing = svc.attach_preferences("cfg").unwrap().unwrap();
        assert!(svc.has_preference_group("cfg"));

        svc.set_preference("cfg", "enabled", true);
        let map = backing.load().unwrap();
        assert_eq!(map.get("enabled"), Some(&PrefValue::Bool(true)));
    }

    #[test]
    fn test_delete_preferences_drops_group() {
        let svc = LoopbackService::new().unwrap();
        svc.set_preference("cfg", "k", 1i64);
        svc.delete_preferences("cfg").unwrap();
        assert!(!svc.has_preference_group("cfg"));
        // Idempotent on a missing group.
        svc.delete_preferences("cfg").unwrap();
    }

    #[test]
    fn test_file_create_write_then_read() {
        let svc = LoopbackService::new().unwrap();
        let mode = MODE_WRITE_ONLY | MODE_CREATE | MODE_TRUNCATE;
        let mut file = svc.open_remote_file("data.bin", mode).unwrap().unwrap();
        file.write_all(b"payload").unwrap();
        drop(file);

        let mut file = svc
            .open_remote_file("data.bin", MODE_READ_ONLY)
            .unwrap()
            .unwrap();
        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "payload");
    }

    #[test]
    fn test_read_only_open_of_missing_file_is_absent() {
        let svc = LoopbackService::new().unwrap();
        assert!(svc
            .open_remote_file("missing.txt", MODE_READ_ONLY)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_append_mode_preserves_existing_contents() {
        let svc = LoopbackService::new().unwrap();
        let truncate = MODE_WRITE_ONLY | MODE_CREATE | MODE_TRUNCATE;
        let append = MODE_WRITE_ONLY | MODE_CREATE | MODE_APPEND;

        let mut file = svc.open_remote_file("log", truncate).unwrap().unwrap();
        file.write_all(b"one").unwrap();
        drop(file);
        let mut file = svc.open_remote_file("log", append).unwrap().unwrap();
        file.write_all(b"two").unwrap();
        drop(file);

        let mut file = svc.open_remote_file("log", MODE_READ_ONLY).unwrap().unwrap();
        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "onetwo");
    }

    #[test]
    fn test_read_write_mode_sets_both_flags() {
        let svc = LoopbackService::new().unwrap();
        let mode = MODE_READ_WRITE | MODE_CREATE;
        let mut file = svc.open_remote_file("rw", mode).unwrap().unwrap();
        file.write_all(b"x").unwrap();
        drop(file);
        assert_eq!(svc.list_remote_files().unwrap().unwrap(), vec!["rw"]);
    }

    #[test]
    fn test_file_names_are_flat() {
        let svc = LoopbackService::new().unwrap();
        assert!(svc.open_remote_file("../escape", MODE_READ_ONLY).is_err());
        assert!(svc.delete_remote_file("a/b").is_err());
    }

    #[test]
    fn test_list_remote_files_sorted() {
        let svc = LoopbackService::new().unwrap();
        let mode = MODE_WRITE_ONLY | MODE_CREATE;
        for name in ["zeta", "alpha", "mid"] {
            svc.open_remote_file(name, mode).unwrap().unwrap();
        }
        assert_eq!(
            svc.list_remote_files().unwrap().unwrap(),
            vec!["alpha", "mid", "zeta"]
        );
    }

    #[test]
    fn test_delete_remote_file_reports_presence() {
        let svc = LoopbackService::new().unwrap();
        svc.open_remote_file("f", MODE_WRITE_ONLY | MODE_CREATE)
            .unwrap()
            .unwrap();
        assert!(svc.delete_remote_file("f").unwrap());
        assert!(!svc.delete_remote_file("f").unwrap());
    }

    #[test]
    fn test_scope_request_approval_updates_scope() {
        let svc = LoopbackService::new().unwrap();
        let (tx, rx) = mpsc::channel();
        svc.request_scope(
            "com.example.app",
            Box::new(move |outcome| {
                tx.send(outcome).unwrap();
            }),
        )
        .unwrap();

        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome, ScopeOutcome::Approved);
        assert_eq!(svc.scope().unwrap(), vec!["com.example.app"]);
    }

    #[test]
    fn test_scope_request_denial_carries_reason() {
        let svc = LoopbackService::new()
            .unwrap()
            .with_denied_package("com.blocked", "blocked by policy");
        let (tx, rx) = mpsc::channel();
        svc.request_scope(
            "com.blocked",
            Box::new(move |outcome| {
                tx.send(outcome).unwrap();
            }),
        )
        .unwrap();

        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            outcome,
            ScopeOutcome::Denied {
                reason: "blocked by policy".to_owned()
            }
        );
        assert!(svc.scope().unwrap().is_empty());
    }

    #[test]
    fn test_remove_scope_reports_missing_package() {
        let svc = LoopbackService::new()
            .unwrap()
            .with_scope(["com.example.app"]);
        assert_eq!(svc.remove_scope("com.example.app").unwrap(), None);
        let refusal = svc.remove_scope("com.example.app").unwrap();
        assert!(refusal.is_some());
        assert!(svc.scope().unwrap().is_empty());
    }
}
