use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;
use eyre::{Result, WrapErr, eyre};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::{
    config::{loader::load_config, models::ServerConfig},
    ports::config_provider::ConfigProvider,
};

/// Loads the gateway config from one file and signals when it changes.
///
/// notify watches the directory holding the file, because editors often save
/// by writing a temporary file and renaming it over the original.
pub struct FileConfigProvider {
    path: PathBuf,
    // Notifications stop once this is dropped.
    _watcher: RecommendedWatcher,
    changes: Mutex<Option<mpsc::Receiver<()>>>,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(OsStr::to_owned)
            .ok_or_else(|| eyre!("Config path '{}' does not name a file", path.display()))?;

        let (tx, rx) = mpsc::channel(1);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if touches_config(&event, &file_name) => {
                tracing::debug!(kind = ?event.kind, "Config file changed");
                // Full means a reload is already queued.
                let _ = tx.try_send(());
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Config file watch error"),
        })
        .wrap_err("Failed to create config file watcher")?;

        let dir = watch_dir(&path);
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .wrap_err_with(|| format!("Failed to watch config directory {}", dir.display()))?;
        tracing::debug!(path = %path.display(), "Watching config file");

        Ok(Self {
            path,
            _watcher: watcher,
            changes: Mutex::new(Some(rx)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Directory to watch for `path`; a bare file name lives in the working directory.
fn watch_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Whether `event` writes, creates or removes the file called `file_name`.
fn touches_config(event: &Event, file_name: &OsString) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    ) && event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn load_config(&self) -> Result<ServerConfig> {
        let path = self
            .path
            .to_str()
            .ok_or_else(|| eyre!("Config path '{}' is not UTF-8", self.path.display()))?;
        load_config(path).await
    }

    fn watch(&self) -> Option<mpsc::Receiver<()>> {
        match self.changes.lock() {
            Ok(mut changes) => changes.take(),
            Err(e) => {
                tracing::error!("Config watch receiver lock poisoned: {}", e);
                None
            }
        }
    }
}
