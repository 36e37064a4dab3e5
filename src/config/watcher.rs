//! Configuration file watcher for hot reload.
//!
//! File-system events are noisy (editors often emit several
//! write/create events for a single save). Raw events are funnelled
//! into a debounce task that collapses any burst within 200 ms into a
//! single reload attempt, per spec. The reload result is published on
//! a `watch` channel, whose "latest value wins" semantics give us
//! "a pending update replaces an older pending update" for free.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::config::loader::load_config;
use crate::config::schema::ProxyConfig;

const DEBOUNCE: Duration = Duration::from_millis(200);

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: watch::Sender<Option<ProxyConfig>>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    /// The receiver's initial value is `None`; callers should only
    /// act on subsequent changes (`changed().await`).
    pub fn new(path: &Path) -> (Self, watch::Receiver<Option<ProxyConfig>>) {
        let (update_tx, update_rx) = watch::channel(None);

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. Spawns the debounce task on the
    /// current Tokio runtime and returns the underlying OS watcher,
    /// which must be kept alive for the duration of watching.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<()>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        let _ = raw_tx.send(());
                    }
                }
                Err(e) => tracing::error!("config watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?self.path, "config watcher started");

        let path = self.path.clone();
        let update_tx = self.update_tx.clone();
        tokio::spawn(async move {
            'outer: loop {
                if raw_rx.recv().await.is_none() {
                    break;
                }

                // Collapse a burst of events into one reload.
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep(DEBOUNCE) => break,
                        maybe = raw_rx.recv() => {
                            if maybe.is_none() {
                                break 'outer;
                            }
                        }
                    }
                }

                tracing::info!("config file change detected, reloading");
                match load_config(&path) {
                    Ok(new_config) => {
                        if update_tx.send(Some(new_config)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            "failed to reload config: {}. keeping current configuration",
                            e
                        );
                    }
                }
            }
        });

        Ok(watcher)
    }
}
