use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::document::{content_hash, Document, DEFAULT_INDENT};
use crate::error::{Result, StoreError};
use crate::key::normalize_key;
use crate::locks::LockRegistry;
use crate::namespace::{Identity, Namespace};
use crate::observer::{Diagnostic, Observer};

/// Default root directory, relative to the working directory.
pub const DEFAULT_ROOT: &str = "./Database";

/// Summary of one namespace file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamespaceMeta {
    pub hash: String,
    pub modified_at: Option<DateTime<Utc>>,
    pub keys_count: u64,
}

/// JSON documents under a root directory: one global, one per identity.
///
/// The directory tree is created lazily by whichever operation touches it
/// first. Every read-modify-write on a namespace file runs under that file's
/// lock, and [`Store::clear_all`] waits for all in-flight operations.
///
/// The plain operations never fail loudly: errors are logged, passed to the
/// [`Observer`] if one is set, and turned into `false` or the default value.
/// The `try_` variants return the [`StoreError`] instead.
pub struct Store {
    root: PathBuf,
    indent: usize,
    observer: Option<Arc<dyn Observer>>,
    locks: LockRegistry,
    // Shared by ordinary operations, exclusive for clear_all.
    lifecycle: RwLock<()>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("root", &self.root)
            .field("indent", &self.indent)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_parts(root.into(), DEFAULT_INDENT, None)
    }

    pub(crate) fn with_parts(
        root: PathBuf,
        indent: usize,
        observer: Option<Arc<dyn Observer>>,
    ) -> Self {
        Self {
            root,
            indent,
            observer,
            locks: LockRegistry::new(),
            lifecycle: RwLock::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document backing a namespace.
    pub fn namespace_path(&self, namespace: &Namespace) -> PathBuf {
        namespace.path_in(&self.root)
    }

    // ── initialization ──────────────────────────────────────

    pub async fn ensure_initialized(&self) -> bool {
        self.swallow("ensure_initialized", self.try_ensure_initialized().await)
            .is_some()
    }

    /// Creates the root directory and the global document if missing.
    pub async fn try_ensure_initialized(&self) -> Result<()> {
        let _life = self.lifecycle.read().await;
        self.init_unlocked().await
    }

    async fn init_unlocked(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StoreError::io(&self.root, e))?;
        let global = self.namespace_path(&Namespace::Global);
        let _guard = self.locks.lock(&global).await;
        if self.create_if_absent(&global).await? {
            tracing::debug!(root = %self.root.display(), "initialized store");
        }
        Ok(())
    }

    // ── existence ───────────────────────────────────────────

    /// An absent or empty identity names the global namespace, which exists
    /// as soon as the store is initialized.
    ///
    /// Only this check reads `Some("")` as global. [`Store::get`],
    /// [`Store::set`], [`Store::meta`] and [`Store::try_identity_exists`]
    /// reject an empty identity as [`StoreError::InvalidIdentity`]; pass
    /// `None` to address the global namespace there.
    pub async fn identity_exists(&self, identity: Option<&str>) -> bool {
        let result = match identity {
            None | Some("") => self.try_ensure_initialized().await.map(|_| true),
            Some(id) => self.try_identity_exists(id).await,
        };
        self.swallow("identity_exists", result).unwrap_or(false)
    }

    pub async fn try_identity_exists(&self, identity: &str) -> Result<bool> {
        let identity = Identity::new(identity)?;
        let _life = self.lifecycle.read().await;
        self.init_unlocked().await?;
        file_exists(&self.namespace_path(&Namespace::Private(identity))).await
    }

    // ── identity creation ───────────────────────────────────

    /// True only when a new, empty document was created. An identity that
    /// already has one is left untouched and yields false.
    pub async fn create_identity(&self, identity: &str) -> bool {
        self.swallow("create_identity", self.try_create_identity(identity).await)
            .unwrap_or(false)
    }

    pub async fn try_create_identity(&self, identity: &str) -> Result<bool> {
        let identity = Identity::new(identity)?;
        let _life = self.lifecycle.read().await;
        self.init_unlocked().await?;
        let path = self.namespace_path(&Namespace::Private(identity.clone()));
        let _guard = self.locks.lock(&path).await;
        let created = self.create_if_absent(&path).await?;
        if created {
            tracing::debug!(%identity, "created identity");
        }
        Ok(created)
    }

    // ── set ─────────────────────────────────────────────────

    /// Stores `value` under the normalized `key`. `None` targets the global
    /// namespace; a private namespace is created on first write.
    pub async fn set(&self, identity: Option<&str>, key: &str, value: Value, pretty: bool) -> bool {
        self.swallow("set", self.try_set(identity, key, value, pretty).await)
            .is_some()
    }

    pub async fn try_set(
        &self,
        identity: Option<&str>,
        key: &str,
        value: Value,
        pretty: bool,
    ) -> Result<()> {
        let namespace = Namespace::resolve(identity)?;
        let key = normalize_key(key);
        let _life = self.lifecycle.read().await;
        self.init_unlocked().await?;

        let path = self.namespace_path(&namespace);
        let _guard = self.locks.lock(&path).await;
        if let Namespace::Private(identity) = &namespace {
            if self.create_if_absent(&path).await? {
                tracing::debug!(%identity, "created identity on first write");
            }
        }

        let mut document = match read_document(&path).await {
            Ok(Some(document)) => document,
            Ok(None) => Document::new(),
            Err(err @ StoreError::Corrupt { .. }) => {
                self.report("set", &err);
                Document::new()
            }
            Err(err) => return Err(err),
        };
        document.insert(key, value);
        self.write_document(&path, &document, pretty).await
    }

    // ── get ─────────────────────────────────────────────────

    /// Value stored under the normalized `key`, or `default` when the
    /// namespace or key is missing or the document cannot be read.
    pub async fn get(&self, identity: Option<&str>, key: &str, default: Value) -> Value {
        match self.swallow("get", self.try_get(identity, key).await) {
            Some(Some(value)) => value,
            _ => default,
        }
    }

    /// `Ok(None)` for a missing key or a private namespace that was never
    /// created. Looking up a missing private namespace creates nothing.
    pub async fn try_get(&self, identity: Option<&str>, key: &str) -> Result<Option<Value>> {
        let namespace = Namespace::resolve(identity)?;
        let key = normalize_key(key);
        let _life = self.lifecycle.read().await;
        self.init_unlocked().await?;

        let path = self.namespace_path(&namespace);
        if namespace.identity().is_some() && !file_exists(&path).await? {
            return Ok(None);
        }
        let _guard = self.locks.lock(&path).await;
        let document = read_document(&path).await?;
        Ok(document.and_then(|doc| doc.get(&key).cloned()))
    }

    // ── reset ───────────────────────────────────────────────

    /// Removes the whole root tree and recreates the empty layout.
    pub async fn clear_all(&self) -> bool {
        self.swallow("clear_all", self.try_clear_all().await).is_some()
    }

    pub async fn try_clear_all(&self) -> Result<()> {
        let _life = self.lifecycle.write().await;
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&self.root, e)),
        }
        self.locks.prune();
        tracing::debug!(root = %self.root.display(), "cleared store");
        self.init_unlocked().await
    }

    // ── metadata & enumeration ──────────────────────────────

    /// Hash, key count and modification time of a namespace document.
    /// `None` if it does not exist or cannot be decoded.
    pub async fn meta(&self, identity: Option<&str>) -> Option<NamespaceMeta> {
        self.swallow("meta", self.try_meta(identity).await).flatten()
    }

    pub async fn try_meta(&self, identity: Option<&str>) -> Result<Option<NamespaceMeta>> {
        let namespace = Namespace::resolve(identity)?;
        let _life = self.lifecycle.read().await;
        self.init_unlocked().await?;

        let path = self.namespace_path(&namespace);
        if namespace.identity().is_some() && !file_exists(&path).await? {
            return Ok(None);
        }
        let _guard = self.locks.lock(&path).await;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        let document = Document::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: path.clone(),
            source,
        })?;
        let modified_at = fs::metadata(&path)
            .await
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        Ok(Some(NamespaceMeta {
            hash: content_hash(&bytes),
            modified_at,
            keys_count: document.len() as u64,
        }))
    }

    /// Identities that have a private document, sorted.
    pub async fn list_identities(&self) -> Vec<String> {
        self.swallow("list_identities", self.try_list_identities().await)
            .map(|ids| ids.into_iter().map(|id| id.to_string()).collect())
            .unwrap_or_default()
    }

    pub async fn try_list_identities(&self) -> Result<Vec<Identity>> {
        let _life = self.lifecycle.read().await;
        self.init_unlocked().await?;

        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| StoreError::io(&self.root, e))?;
        let mut identities = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.root, e))?
        {
            if let Some(identity) = entry.file_name().to_str().and_then(Identity::from_file_name) {
                identities.push(identity);
            }
        }
        identities.sort();
        Ok(identities)
    }

    // ── internals ───────────────────────────────────────────

    /// Writes an empty document unless the file exists. Callers hold the
    /// path lock.
    async fn create_if_absent(&self, path: &Path) -> Result<bool> {
        if file_exists(path).await? {
            return Ok(false);
        }
        self.write_document(path, &Document::new(), false).await?;
        Ok(true)
    }

    /// Full rewrite through a temporary sibling and a rename.
    async fn write_document(&self, path: &Path, document: &Document, pretty: bool) -> Result<()> {
        let bytes = document.to_vec(pretty.then_some(self.indent))?;
        let tmp = temp_path(path);

        let written = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(&bytes).await?;
            file.sync_all().await
        }
        .await;
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::io(&tmp, e));
        }

        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::io(path, e));
        }
        Ok(())
    }

    fn swallow<T>(&self, operation: &'static str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.report(operation, &err);
                None
            }
        }
    }

    fn report(&self, operation: &'static str, err: &StoreError) {
        let diagnostic = match err {
            StoreError::InvalidIdentity { identity, .. } => {
                tracing::warn!(operation, "{}", err);
                Diagnostic::InvalidIdentity {
                    identity: identity.clone(),
                }
            }
            StoreError::Corrupt { path, source } => {
                tracing::warn!(operation, "{}, treating as empty document", err);
                Diagnostic::CorruptDocument {
                    path: path.clone(),
                    message: source.to_string(),
                }
            }
            StoreError::Io { path, source } => {
                tracing::warn!(operation, "{}", err);
                Diagnostic::IoFailure {
                    operation,
                    path: path.clone(),
                    message: source.to_string(),
                }
            }
            StoreError::Serialize(source) => {
                tracing::warn!(operation, "{}", err);
                Diagnostic::IoFailure {
                    operation,
                    path: self.root.clone(),
                    message: source.to_string(),
                }
            }
        };
        if let Some(observer) = &self.observer {
            observer.on_diagnostic(&diagnostic);
        }
    }
}

async fn file_exists(path: &Path) -> Result<bool> {
    match fs::metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// `Ok(None)` when the file does not exist.
async fn read_document(path: &Path) -> Result<Option<Document>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    Document::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}
