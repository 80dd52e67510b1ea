// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The single persisted player preference: the last volume level.

use serde_json::Value;
use tokio::{sync::watch, task::JoinHandle};

use crate::{err::Result, kv::KVStore};

/// Key under which the volume preference lives.
pub const VOLUME_KEY: &str = "player_volume";

/// Typed access to the volume preference.
#[derive(Clone)]
pub struct PreferenceStore {
    kv: KVStore,
}

impl PreferenceStore {
    pub const fn new(kv: KVStore) -> Self { Self { kv } }

    /// Read the stored volume without range checking.
    ///
    /// Numbers and numeric strings are accepted. Anything else, including a
    /// value that fails to decode, is reported as absent so the caller falls
    /// back to its default.
    pub async fn load_volume(&self) -> Option<f64> {
        let value = match self.kv.get::<Value>(VOLUME_KEY).await {
            Ok(value) => value?,
            Err(e) => {
                tracing::warn!(error = ?e, "stored volume preference is unreadable");
                return None;
            }
        };

        let level = match &value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        if level.is_none() {
            tracing::warn!(%value, "stored volume preference is not a number");
        }
        level
    }

    pub async fn save_volume(&self, level: f64) -> Result<()> {
        self.kv.set(VOLUME_KEY, &level).await
    }

    pub async fn clear_volume(&self) -> Result<()> { self.kv.remove(VOLUME_KEY).await }

    /// Spawn a background task that persists every level sent through the
    /// returned writer. Only the latest pending level is written. The task
    /// flushes the last value and exits once every writer is dropped.
    pub fn spawn_writer(&self) -> (PreferenceWriter, JoinHandle<()>) {
        let (tx, mut rx) = watch::channel(None::<f64>);
        let store = self.clone();
        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let level = *rx.borrow_and_update();
                if let Some(level) = level {
                    if let Err(e) = store.save_volume(level).await {
                        tracing::error!(error = ?e, level, "failed to persist volume preference");
                    }
                }
            }
            tracing::debug!("volume preference writer stopped");
        });
        (PreferenceWriter { tx }, task)
    }
}

/// Synchronous handle for queueing volume writes from the UI thread.
#[derive(Clone, Debug)]
pub struct PreferenceWriter {
    tx: watch::Sender<Option<f64>>,
}

impl PreferenceWriter {
    /// Queue `level` for persistence, superseding any unwritten level.
    pub fn save_volume(&self, level: f64) { self.tx.send_replace(Some(level)); }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{config::DatabaseConfig, db::DBStore};

    async fn open(tempdir: &TempDir) -> DBStore {
        let config = DatabaseConfig::builder()
            .db_path(tempdir.path().join("prefs.db"))
            .build();
        DBStore::new(&config).await.unwrap()
    }

    #[tokio::test]
    async fn missing_volume_is_none() {
        let tempdir = TempDir::new().unwrap();
        let prefs = open(&tempdir).await.preferences();
        assert_eq!(prefs.load_volume().await, None);
    }

    #[tokio::test]
    async fn volume_round_trips_without_range_check() {
        let tempdir = TempDir::new().unwrap();
        let prefs = open(&tempdir).await.preferences();

        prefs.save_volume(5.0).await.unwrap();
        assert_eq!(prefs.load_volume().await, Some(5.0));

        prefs.clear_volume().await.unwrap();
        assert_eq!(prefs.load_volume().await, None);
    }

    #[tokio::test]
    async fn numeric_string_is_accepted_and_garbage_is_not() {
        let tempdir = TempDir::new().unwrap();
        let db = open(&tempdir).await;
        let prefs = db.preferences();

        db.kv_store().set(VOLUME_KEY, "0.4").await.unwrap();
        assert_eq!(prefs.load_volume().await, Some(0.4));

        db.kv_store().set(VOLUME_KEY, "loud").await.unwrap();
        assert_eq!(prefs.load_volume().await, None);

        db.kv_store().set_raw(VOLUME_KEY, "{broken").await.unwrap();
        assert_eq!(prefs.load_volume().await, None);
    }

    #[tokio::test]
    async fn writer_flushes_latest_level_on_drop() {
        let tempdir = TempDir::new().unwrap();
        let prefs = open(&tempdir).await.preferences();

        let (writer, task) = prefs.spawn_writer();
        writer.save_volume(0.2);
        writer.save_volume(0.6);
        drop(writer);
        task.await.unwrap();

        assert_eq!(prefs.load_volume().await, Some(0.6));
    }
}
