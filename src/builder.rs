use std::path::PathBuf;
use std::sync::Arc;

use crate::document::DEFAULT_INDENT;
use crate::observer::Observer;
use crate::store::{Store, DEFAULT_ROOT};

pub struct StoreBuilder {
    root: PathBuf,
    indent: usize,
    observer: Option<Arc<dyn Observer>>,
}

pub fn create_builder() -> StoreBuilder {
    StoreBuilder {
        root: DEFAULT_ROOT.into(),
        indent: DEFAULT_INDENT,
        observer: None,
    }
}

impl StoreBuilder {
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = path.into();
        self
    }

    /// Indent width used when a write asks for pretty output.
    pub fn indent(mut self, width: usize) -> Self {
        self.indent = width;
        self
    }

    /// Receive a [`Diagnostic`](crate::Diagnostic) for every failure the
    /// store swallows.
    pub fn observer(mut self, observer: impl Observer + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// No I/O happens here; the directory tree is created on first use.
    pub fn build(self) -> Store {
        Store::with_parts(self.root, self.indent, self.observer)
    }
}
