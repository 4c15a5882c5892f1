use std::env;

use serde::Deserialize;

/// Top-level jsonbase.toml configuration
#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct JsonbaseConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct StoreConfig {
    #[serde(default = "default_root")]
    pub root: String,
    /// Pretty-print documents on writes that don't say otherwise
    #[serde(default)]
    pub pretty: bool,
    #[serde(default = "default_indent")]
    pub indent: usize,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_hostname")]
    pub hostname: String,
}

// ── Default value functions ──────────────────────────

fn default_root() -> String {
    jsonbase_lib::store::DEFAULT_ROOT.to_string()
}

fn default_indent() -> usize {
    jsonbase_lib::document::DEFAULT_INDENT
}

fn default_port() -> u16 {
    8080
}

fn default_hostname() -> String {
    "127.0.0.1".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            pretty: false,
            indent: default_indent(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            hostname: default_hostname(),
        }
    }
}

impl JsonbaseConfig {
    /// Load configuration from a TOML file, falling back to defaults if the file
    /// doesn't exist or cannot be parsed.
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("failed to parse {}: {}", path, e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // JSONBASE_ROOT
        if let Some(val) = var("JSONBASE_ROOT") {
            if !val.trim().is_empty() {
                self.store.root = val;
            }
        }

        // JSONBASE_PRETTY
        if let Some(val) = var("JSONBASE_PRETTY") {
            match val.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.store.pretty = true,
                "0" | "false" | "no" => self.store.pretty = false,
                other => tracing::warn!("unknown JSONBASE_PRETTY value: {}", other),
            }
        }

        // JSONBASE_PORT
        if let Some(val) = var("JSONBASE_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(e) => tracing::warn!("invalid JSONBASE_PORT, ignoring: {}", e),
            }
        }

        // JSONBASE_HOSTNAME
        if let Some(val) = var("JSONBASE_HOSTNAME") {
            self.server.hostname = val;
        }
    }

    pub fn build_store(&self) -> jsonbase_lib::Store {
        jsonbase_lib::open()
            .root(&self.store.root)
            .indent(self.store.indent)
            .build()
    }
}
