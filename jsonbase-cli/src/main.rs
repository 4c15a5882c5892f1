mod config;
mod server;
mod value;

use std::process;

use clap::{Parser, Subcommand};
use jsonbase_lib::{Identity, Namespace, Scope, Store};
use tracing_subscriber::EnvFilter;

use crate::config::JsonbaseConfig;
use crate::value::{display_value, parse_value};

#[derive(Parser, Debug)]
#[command(name = "jsonbase")]
#[command(version)]
#[command(about = "JSON key-value storage with global and per-user namespaces", long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short = 'c', long = "config", default_value = "jsonbase.toml", global = true)]
    config: String,

    /// Root directory of the store (overrides config and JSONBASE_ROOT)
    #[arg(short = 'r', long = "root", global = true)]
    root: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the root directory and the global document
    Init,
    /// Print the value stored under a key
    Get {
        key: String,

        /// Read from this user's private namespace
        #[arg(short = 'u', long = "user")]
        user: Option<String>,

        /// Namespace scope: global or private
        #[arg(short = 's', long = "scope")]
        scope: Option<String>,

        /// Value printed when the key is missing (JSON or plain text)
        #[arg(short = 'd', long = "default")]
        default: Option<String>,
    },
    /// Store a value under a key
    Set {
        key: String,

        /// JSON value; anything that is not valid JSON is stored as a string
        value: String,

        /// Write to this user's private namespace
        #[arg(short = 'u', long = "user")]
        user: Option<String>,

        /// Namespace scope: global or private
        #[arg(short = 's', long = "scope")]
        scope: Option<String>,

        /// Indent the document on disk
        #[arg(short = 'p', long = "pretty")]
        pretty: bool,
    },
    /// Check whether a user has a private namespace
    Exists { user: String },
    /// Create an empty private namespace for a user
    Create { user: String },
    /// Delete every stored document and start over
    Clear {
        /// Confirm the deletion
        #[arg(long = "yes")]
        yes: bool,
    },
    /// Show hash, key count and modification time of a namespace
    Info {
        #[arg(short = 'u', long = "user")]
        user: Option<String>,
    },
    /// List users that have a private namespace
    Users,
    /// Serve the store over HTTP
    Serve {
        /// Port to listen on
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,

        /// Address to bind to
        #[arg(long = "hostname")]
        hostname: Option<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("JSONBASE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("{}", msg);
    process::exit(1);
}

/// Picks the namespace from `--scope` and `--user`. Without a scope, a user
/// selects the private namespace and no user selects the global one.
fn resolve_namespace(scope: Option<&str>, user: Option<&str>) -> Result<Namespace, String> {
    let namespace = match scope {
        Some(raw) => Namespace::from_scope(raw.parse::<Scope>()?, user),
        None => Namespace::resolve(user),
    };
    namespace.map_err(|e| e.to_string())
}

fn identity_of(namespace: &Namespace) -> Option<&str> {
    namespace.identity().map(Identity::as_str)
}

async fn run_init(store: &Store) {
    match store.try_ensure_initialized().await {
        Ok(()) => println!("Initialized {}", store.root().display()),
        Err(e) => fail(e),
    }
}

async fn run_get(
    store: &Store,
    key: &str,
    user: Option<&str>,
    scope: Option<&str>,
    default: Option<&str>,
) {
    let namespace = resolve_namespace(scope, user).unwrap_or_else(|e| fail(e));
    match store.try_get(identity_of(&namespace), key).await {
        Ok(Some(value)) => println!("{}", display_value(&value)),
        Ok(None) => match default {
            Some(default) => println!("{}", display_value(&parse_value(default))),
            None => fail(format!("{} not found in {}", key, namespace)),
        },
        Err(e) => {
            // Unreadable documents count as missing keys.
            tracing::warn!("{}", e);
            match default {
                Some(default) => println!("{}", display_value(&parse_value(default))),
                None => fail(e),
            }
        }
    }
}

async fn run_set(
    store: &Store,
    key: &str,
    value: &str,
    user: Option<&str>,
    scope: Option<&str>,
    pretty: bool,
) {
    let namespace = resolve_namespace(scope, user).unwrap_or_else(|e| fail(e));
    match store
        .try_set(identity_of(&namespace), key, parse_value(value), pretty)
        .await
    {
        Ok(()) => println!("✓ {} set in {}", jsonbase_lib::key::normalize_key(key), namespace),
        Err(e) => fail(e),
    }
}

async fn run_exists(store: &Store, user: &str) {
    match store.try_identity_exists(user).await {
        Ok(true) => println!("{} exists", user),
        Ok(false) => fail(format!("{} does not exist", user)),
        Err(e) => fail(e),
    }
}

async fn run_create(store: &Store, user: &str) {
    match store.try_create_identity(user).await {
        Ok(true) => println!("✓ Created {}", user),
        Ok(false) => println!("{} already exists", user),
        Err(e) => fail(e),
    }
}

async fn run_clear(store: &Store, yes: bool) {
    if !yes {
        fail(format!(
            "Refusing to delete {} without --yes",
            store.root().display()
        ));
    }
    match store.try_clear_all().await {
        Ok(()) => println!("✓ Cleared {}", store.root().display()),
        Err(e) => fail(e),
    }
}

async fn run_info(store: &Store, user: Option<&str>) {
    match store.try_meta(user).await {
        Ok(Some(meta)) => {
            println!("hash:     {}", meta.hash);
            println!("keys:     {}", meta.keys_count);
            match meta.modified_at {
                Some(ts) => println!("modified: {}", ts.to_rfc3339()),
                None => println!("modified: unknown"),
            }
        }
        Ok(None) => fail(format!("{} does not exist", user.unwrap_or("global"))),
        Err(e) => fail(e),
    }
}

async fn run_users(store: &Store) {
    match store.try_list_identities().await {
        Ok(ids) => {
            for id in ids {
                println!("{}", id);
            }
        }
        Err(e) => fail(e),
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Args::parse();

    let mut config = JsonbaseConfig::load(&cli.config);
    config.apply_env_overrides();
    if let Some(root) = cli.root {
        config.store.root = root;
    }
    let store = config.build_store();

    match cli.cmd {
        Command::Init => run_init(&store).await,
        Command::Get {
            key,
            user,
            scope,
            default,
        } => {
            run_get(
                &store,
                &key,
                user.as_deref(),
                scope.as_deref(),
                default.as_deref(),
            )
            .await
        }
        Command::Set {
            key,
            value,
            user,
            scope,
            pretty,
        } => {
            run_set(
                &store,
                &key,
                &value,
                user.as_deref(),
                scope.as_deref(),
                pretty || config.store.pretty,
            )
            .await
        }
        Command::Exists { user } => run_exists(&store, &user).await,
        Command::Create { user } => run_create(&store, &user).await,
        Command::Clear { yes } => run_clear(&store, yes).await,
        Command::Info { user } => run_info(&store, user.as_deref()).await,
        Command::Users => run_users(&store).await,
        Command::Serve { port, hostname } => server::run_serve(config, port, hostname).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_namespace_defaults() {
        assert_eq!(resolve_namespace(None, None).unwrap(), Namespace::Global);
        assert_eq!(
            identity_of(&resolve_namespace(None, Some("bob")).unwrap()),
            Some("bob")
        );
    }

    #[test]
    fn test_resolve_namespace_with_scope() {
        assert_eq!(
            resolve_namespace(Some("GLOBAL"), Some("bob")).unwrap(),
            Namespace::Global
        );
        assert_eq!(
            identity_of(&resolve_namespace(Some("private"), Some("bob")).unwrap()),
            Some("bob")
        );
        assert!(resolve_namespace(Some("private"), None).is_err());
        assert!(resolve_namespace(Some("public"), Some("bob")).is_err());
        assert!(resolve_namespace(None, Some("../etc")).is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "jb", "--root", "/tmp/db", "set", "Theme", "dark", "--user", "u1", "--pretty",
        ])
        .unwrap();
        assert_eq!(args.root.as_deref(), Some("/tmp/db"));
        match args.cmd {
            Command::Set {
                key,
                value,
                user,
                pretty,
                ..
            } => {
                assert_eq!(key, "Theme");
                assert_eq!(value, "dark");
                assert_eq!(user.as_deref(), Some("u1"));
                assert!(pretty);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
