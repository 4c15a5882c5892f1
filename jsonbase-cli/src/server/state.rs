use jsonbase_lib::Store;

/// Shared application state for the HTTP server.
pub struct AppState {
    pub store: Store,
    /// Formatting used by PUT requests without a `pretty` query parameter.
    pub pretty_default: bool,
}

impl AppState {
    pub fn new(store: Store, pretty_default: bool) -> Self {
        Self {
            store,
            pretty_default,
        }
    }
}
