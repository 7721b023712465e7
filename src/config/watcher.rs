//! Configuration file watcher for hot reload.
//!
//! # Data Flow
//! ```text
//! notify event naming the file (watcher thread)
//!     → change signal over an mpsc channel
//!     → reload task: load_config (parse & validate)
//!     → CatalogClient::apply_config
//! ```
//!
//! The parent directory is watched rather than the file, so saves that
//! rename a fresh file into place are still followed. A file that fails to
//! load is logged and skipped; the client keeps the settings it has.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ClientConfig;
use crate::http::CatalogClient;

/// Applies every valid edit of a configuration file to a running client.
///
/// Dropping the watcher closes the change channel, which ends the reload task.
pub struct ConfigWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    /// Start following `path` on behalf of `client`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(path: &Path, client: Arc<CatalogClient>) -> Result<Self, notify::Error> {
        let path = path.to_path_buf();
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path.file_name().map(OsStr::to_os_string);
        let (changes_tx, changes_rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if names_file(&event, file_name.as_deref()) => {
                    let _ = changes_tx.send(());
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tokio::spawn(reload_loop(path.clone(), client, changes_rx));

        tracing::info!(path = ?path, "Config watcher started");
        Ok(Self {
            path,
            _watcher: watcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for ConfigWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigWatcher").field("path", &self.path).finish()
    }
}

fn names_file(event: &Event, file_name: Option<&OsStr>) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event.paths.iter().any(|p| p.file_name() == file_name)
}

async fn reload_loop(
    path: PathBuf,
    client: Arc<CatalogClient>,
    mut changes: mpsc::UnboundedReceiver<()>,
) {
    let mut applied: Option<ClientConfig> = None;

    while changes.recv().await.is_some() {
        // One save usually raises several events.
        while changes.try_recv().is_ok() {}

        match load_config(&path) {
            Ok(config) if applied.as_ref() == Some(&config) => {}
            Ok(config) => {
                tracing::info!(path = ?path, "Client config changed, applying");
                client.apply_config(&config);
                applied = Some(config);
            }
            Err(e) => {
                tracing::error!(
                    path = ?path,
                    error = %e,
                    "Failed to reload client config, keeping current settings"
                );
            }
        }
    }

    tracing::debug!(path = ?path, "Config watcher stopped");
}
