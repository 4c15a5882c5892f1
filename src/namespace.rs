use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{Result, StoreError};

/// File name of the global namespace document.
pub const GLOBAL_FILE: &str = "allData.json";

const PRIVATE_PREFIX: &str = "user-";
const DOCUMENT_SUFFIX: &str = ".json";

/// Bytes escaped in private file names: everything but `[a-z0-9._-]`.
/// Upper case is escaped too, so `Bob` and `bob` stay distinct on
/// case-insensitive filesystems.
const FILE_NAME_ESCAPES: &AsciiSet = &file_name_escapes();

const fn file_name_escapes() -> AsciiSet {
    let mut set = NON_ALPHANUMERIC.remove(b'.').remove(b'-').remove(b'_');
    let mut c = b'A';
    while c <= b'Z' {
        set = set.add(c);
        c += 1;
    }
    set
}

/// Caller supplied token selecting a private namespace.
///
/// Identities end up inside a file name, so anything that could escape the
/// store root is rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    pub fn new(identity: impl Into<String>) -> Result<Self> {
        let identity = identity.into();
        let reason = if identity.is_empty() {
            Some("identity is empty")
        } else if identity == "." || identity == ".." {
            Some("identity is a relative path component")
        } else if identity.contains(['/', '\\']) {
            Some("identity contains a path separator")
        } else if identity.contains('\0') {
            Some("identity contains a NUL byte")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(StoreError::InvalidIdentity { identity, reason }),
            None => Ok(Identity(identity)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn file_name(&self) -> String {
        format!(
            "{}{}{}",
            PRIVATE_PREFIX,
            utf8_percent_encode(&self.0, FILE_NAME_ESCAPES),
            DOCUMENT_SUFFIX
        )
    }

    /// Recovers the identity from a private document file name. Names that
    /// are not the exact encoding of some identity yield `None`.
    pub(crate) fn from_file_name(name: &str) -> Option<Self> {
        let encoded = name
            .strip_prefix(PRIVATE_PREFIX)?
            .strip_suffix(DOCUMENT_SUFFIX)?;
        let decoded = percent_decode_str(encoded).decode_utf8().ok()?;
        let identity = Identity::new(decoded.into_owned()).ok()?;
        (identity.file_name() == name).then_some(identity)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Identity {
    type Error = StoreError;

    fn try_from(value: &str) -> Result<Self> {
        Identity::new(value)
    }
}

impl TryFrom<String> for Identity {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self> {
        Identity::new(value)
    }
}

/// Which kind of namespace a request addresses, as spelled by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Private,
}

impl FromStr for Scope {
    type Err = String;

    /// Drops everything but ASCII letters and compares case-insensitively,
    /// so `" Private!"` parses as [`Scope::Private`].
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let cleaned: String = s
            .chars()
            .filter(char::is_ascii_alphabetic)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match cleaned.as_str() {
            "global" => Ok(Scope::Global),
            "private" => Ok(Scope::Private),
            _ => Err(format!("unknown scope '{}', expected global or private", s)),
        }
    }
}

/// A single JSON document on disk: the shared one or one per identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Namespace {
    Global,
    Private(Identity),
}

impl Namespace {
    /// `None` selects the global namespace. `Some("")` is an invalid
    /// identity, not an alias for global.
    pub fn resolve(identity: Option<&str>) -> Result<Self> {
        match identity {
            None => Ok(Namespace::Global),
            Some(id) => Identity::new(id).map(Namespace::Private),
        }
    }

    /// Combines an explicit scope with an optional identity. The identity is
    /// ignored for the global scope and required for the private one.
    pub fn from_scope(scope: Scope, identity: Option<&str>) -> Result<Self> {
        match scope {
            Scope::Global => Ok(Namespace::Global),
            Scope::Private => Identity::new(identity.unwrap_or_default()).map(Namespace::Private),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Namespace::Global => None,
            Namespace::Private(id) => Some(id),
        }
    }

    pub fn file_name(&self) -> String {
        match self {
            Namespace::Global => GLOBAL_FILE.to_string(),
            Namespace::Private(id) => id.file_name(),
        }
    }

    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(self.file_name())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Global => f.write_str("global"),
            Namespace::Private(id) => write!(f, "private:{}", id),
        }
    }
}
