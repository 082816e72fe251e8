//! The one piece of client state that outlives a session: the display name
//! last typed into the comment form.

use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use tokio::{
    select,
    sync::mpsc,
    task::JoinHandle,
    time::sleep,
};
use tracing::{debug, warn};

pub const DISPLAY_NAME_KEY: &str = "commentName";
pub const NAME_WRITE_DEBOUNCE: Duration = Duration::from_millis(500);

/// JSON object of string preferences on disk.
#[derive(Debug, Clone)]
pub struct PreferenceFile {
    path: PathBuf,
}

impl PreferenceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `None` when nothing has been stored yet.
    pub async fn display_name(&self) -> Result<Option<String>> {
        Ok(self.read_all().await?.remove(DISPLAY_NAME_KEY))
    }

    pub async fn store_display_name(&self, name: &str) -> Result<()> {
        let mut values = self.read_all().await?;
        values.insert(DISPLAY_NAME_KEY.to_string(), name.to_string());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let encoded = serde_json::to_vec_pretty(&values)?;
        tokio::fs::write(&self.path, encoded)
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        debug!(path = %self.path.display(), "display name stored");
        Ok(())
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("failed to parse {}", self.path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to read {}", self.path.display()))
            }
        }
    }
}

/// Background writer that persists the latest display name once edits pause.
pub struct DisplayNameWriter {
    updates: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

impl DisplayNameWriter {
    pub fn spawn(file: PreferenceFile, delay: Duration) -> Self {
        let (updates, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_writer(file, delay, rx));
        Self { updates, task }
    }

    /// Records an edit. Only the last value within `delay` reaches disk.
    pub fn update(&self, name: impl Into<String>) {
        if self.updates.send(name.into()).is_err() {
            warn!("display name writer has stopped");
        }
    }

    /// Writes any pending value immediately and stops the writer.
    pub async fn flush(self) {
        drop(self.updates);
        if let Err(err) = self.task.await {
            warn!(error = %err, "display name writer ended abnormally");
        }
    }
}

async fn run_writer(file: PreferenceFile, delay: Duration, mut rx: mpsc::UnboundedReceiver<String>) {
    let mut pending: Option<String> = None;
    loop {
        let Some(name) = pending.take() else {
            match rx.recv().await {
                Some(name) => pending = Some(name),
                None => break,
            }
            continue;
        };

        select! {
            next = rx.recv() => match next {
                Some(newer) => pending = Some(newer),
                None => {
                    persist(&file, &name).await;
                    break;
                }
            },
            _ = sleep(delay) => persist(&file, &name).await,
        }
    }
}

async fn persist(file: &PreferenceFile, name: &str) {
    if let Err(err) = file.store_display_name(name).await {
        warn!(error = ?err, "failed to store display name");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_means_no_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = PreferenceFile::new(dir.path().join("prefs.json"));
        assert_eq!(file.display_name().await.expect("read"), None);
    }

    #[tokio::test]
    async fn stores_under_the_display_name_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = PreferenceFile::new(dir.path().join("nested").join("prefs.json"));

        file.store_display_name("Alice").await.expect("store");

        assert_eq!(file.display_name().await.expect("read").as_deref(), Some("Alice"));
        let raw = std::fs::read_to_string(file.path()).expect("raw file");
        let parsed: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(parsed, serde_json::json!({"commentName": "Alice"}));
    }

    #[tokio::test]
    async fn writer_keeps_only_the_last_edit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = PreferenceFile::new(dir.path().join("prefs.json"));
        let writer = DisplayNameWriter::spawn(file.clone(), Duration::from_millis(50));

        for partial in ["A", "Al", "Ali", "Alic", "Alice"] {
            writer.update(partial);
        }
        sleep(Duration::from_millis(200)).await;
        assert_eq!(file.display_name().await.expect("read").as_deref(), Some("Alice"));

        writer.update("Bob");
        writer.flush().await;
        assert_eq!(file.display_name().await.expect("read").as_deref(), Some("Bob"));
    }
}
