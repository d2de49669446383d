//! Append-only trace log stored as JSON lines

use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::warn;

use crate::trace::TraceEnvelope;
use crate::{Error, Result};

pub(crate) struct TraceLog {
    path: PathBuf,
    envelopes: RwLock<Vec<TraceEnvelope>>,
}

impl TraceLog {
    pub async fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        if fs::metadata(&path).await.is_err() {
            fs::File::create(&path).await?;
        }

        let envelopes = Self::load(&path).await?;
        Ok(Self {
            path,
            envelopes: RwLock::new(envelopes),
        })
    }

    async fn load(path: &Path) -> Result<Vec<TraceEnvelope>> {
        let file = fs::File::open(path).await?;
        let mut lines = BufReader::new(file).lines();
        let mut envelopes = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<TraceEnvelope>(&line) {
                Ok(envelope) => envelopes.push(envelope),
                Err(err) => warn!(
                    "Ignoring malformed trace record in {}: {}",
                    path.display(),
                    err
                ),
            }
        }

        Ok(envelopes)
    }

    pub async fn append(&self, envelope: TraceEnvelope) -> Result<()> {
        let encoded = serde_json::to_string(&envelope)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to open trace log: {}", e)))?;

        file.write_all(encoded.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;

        self.envelopes.write().await.push(envelope);
        Ok(())
    }

    pub async fn latest_for_run(&self, run_id: &str) -> Option<TraceEnvelope> {
        let envelopes = self.envelopes.read().await;
        envelopes
            .iter()
            .rev()
            .find(|e| e.active && e.run_id() == run_id)
            .cloned()
    }

    pub async fn recent(&self, limit: usize) -> Vec<TraceEnvelope> {
        let envelopes = self.envelopes.read().await;
        envelopes.iter().rev().take(limit).cloned().collect()
    }
}
