//! Game settings file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::store::ConfigHandle;

/// A watcher that reloads the shared game settings when the file changes.
pub struct ConfigWatcher {
    path: PathBuf,
    handle: ConfigHandle,
    update_tx: mpsc::UnboundedSender<()>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver notified after each successful reload.
    pub fn new(path: &Path, handle: ConfigHandle) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                handle,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The parent directory is watched so the file may be created later.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let handle = self.handle.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = event.paths.iter().any(|p| p == &path);
                    if relevant && (event.kind.is_modify() || event.kind.is_create()) {
                        tracing::info!("Game settings change detected, reloading...");
                        match handle.reload() {
                            Ok(()) => {
                                let _ = tx.send(());
                            }
                            Err(e) => {
                                tracing::error!("Failed to reload game settings: {}. Keeping current settings.", e);
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(notify::Error::io)?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Game settings watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::store::{keys, ConfigStore, StorePaths};
    use std::fs;

    #[tokio::test]
    async fn test_reload_on_external_edit() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StorePaths {
            active: dir.path().join("Saved/PalWorldSettings.ini"),
            template: dir.path().join("Default.ini"),
            header: "/Script/Pal.PalGameWorldSettings".to_string(),
            option_key: "OptionSettings".to_string(),
        };
        fs::write(&paths.template, "[H]\nOptionSettings=(PublicPort=8211)\n").unwrap();

        let handle = ConfigHandle::load(paths.clone()).unwrap();
        let (watcher, mut reloads) = ConfigWatcher::new(&paths.active, handle.clone());
        let _guard = watcher.run().unwrap();

        let mut external = ConfigStore::load(paths).unwrap();
        external.set(keys::PUBLIC_PORT, "int", "9100").unwrap();

        // A create event may land before the content does; wait for the final value.
        let observed = tokio::time::timeout(Duration::from_secs(10), async {
            while reloads.recv().await.is_some() {
                if handle.snapshot().get_int(keys::PUBLIC_PORT) == Some(9100) {
                    return true;
                }
            }
            false
        })
        .await;
        assert!(matches!(observed, Ok(true)));
    }
}
