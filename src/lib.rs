//! Embedded key-value store persisting JSON documents on disk.
//!
//! Values live in one shared (global) namespace or in per-identity private
//! namespaces, each a single human-readable JSON file under a root
//! directory:
//!
//! ```text
//! <root>/
//!   allData.json       [{"theme":"dark"}]
//!   user-<identity>.json
//! ```

pub mod builder;
pub mod document;
pub mod error;
pub mod key;
pub mod locks;
pub mod namespace;
pub mod observer;
pub mod store;

pub use document::Document;
pub use error::StoreError;
pub use namespace::{Identity, Namespace, Scope};
pub use observer::{Diagnostic, Observer};
pub use store::{NamespaceMeta, Store};

/// Returns a builder for configuring a [`Store`].
///
/// # Examples
/// ```no_run
/// # async fn demo() {
/// use serde_json::json;
///
/// let store = jsonbase_lib::open().root("./Database").build();
/// store.set(None, "Theme", json!("dark"), false).await;
/// assert_eq!(store.get(None, "theme", json!(null)).await, json!("dark"));
///
/// store.set(Some("u1"), "score", json!(42), true).await;
/// assert!(store.identity_exists(Some("u1")).await);
/// # }
/// ```
pub fn open() -> builder::StoreBuilder {
    builder::create_builder()
}
