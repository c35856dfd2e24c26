//! JSON session snapshots on disk.
//!
//! The core hands over plain values; this host decides where they live. A
//! missing or unreadable file means a fresh session, never a failed start.

use anyhow::{Context, Result};
use kinema_core::SessionSnapshot;
use kinema_reasoning::AgentSnapshot;
use std::path::{Path, PathBuf};
use tokio::sync::watch;

pub fn load(path: &Path) -> Option<SessionSnapshot> {
    if !path.exists() {
        tracing::info!("No session snapshot at {}, starting fresh", path.display());
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read session snapshot {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            tracing::warn!(
                "Session snapshot {} is unreadable ({}), starting fresh",
                path.display(),
                e
            );
            None
        }
    }
}

/// Write via a temporary sibling and rename, so a crash never leaves half a file.
pub fn save(path: &Path, snapshot: &SessionSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot).context("Failed to serialize session")?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move snapshot into {}", path.display()))?;
    Ok(())
}

/// Save whenever at least `every` ticks have passed since the last save.
/// Returns when the loop drops its snapshot channel.
pub async fn autosave(mut rx: watch::Receiver<AgentSnapshot>, path: PathBuf, every: u64) {
    if every == 0 {
        return;
    }
    let mut last_saved = rx.borrow().tick;
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        if snapshot.tick < last_saved + every {
            continue;
        }
        match save(&path, &snapshot.to_session()) {
            Ok(()) => {
                tracing::debug!("Session saved at tick {}", snapshot.tick);
                last_saved = snapshot.tick;
            }
            Err(e) => tracing::warn!("Autosave failed: {:#}", e),
        }
    }
}
