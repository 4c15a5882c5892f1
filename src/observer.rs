use std::path::PathBuf;

/// A failure the store recovered from instead of reporting to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A stored document did not decode and was treated as empty.
    CorruptDocument { path: PathBuf, message: String },
    /// A filesystem step failed and the operation returned its failure value.
    IoFailure {
        operation: &'static str,
        path: PathBuf,
        message: String,
    },
    /// An identity was refused before any path was derived from it.
    InvalidIdentity { identity: String },
}

/// Receives [`Diagnostic`]s. Closures taking `&Diagnostic` implement it.
pub trait Observer: Send + Sync {
    fn on_diagnostic(&self, diagnostic: &Diagnostic);
}

impl<F> Observer for F
where
    F: Fn(&Diagnostic) + Send + Sync,
{
    fn on_diagnostic(&self, diagnostic: &Diagnostic) {
        self(diagnostic)
    }
}
