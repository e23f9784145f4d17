// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Track file storage with atomic replacement.
//!
//! A replacement is written to `<file>.tmp` and renamed over the original,
//! so readers only ever see a complete old or new file. The temp file
//! doubles as a lock: only the writer that creates it may rename it.

use crate::error::TrackError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Suffix of the in-progress replacement file.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Polls of an existing temp file before it is treated as stale.
pub const DEFAULT_WAIT_ATTEMPTS: u32 = 20;

/// Delay between polls of an existing temp file.
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(1);

/// Attempts to create the temp file before giving up.
pub const DEFAULT_CLAIM_ATTEMPTS: u32 = 3;

/// Directory of track files.
#[derive(Debug, Clone)]
pub struct TrackFiles {
    dir: PathBuf,
    wait_attempts: u32,
    wait_interval: Duration,
    claim_attempts: u32,
}

impl TrackFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            wait_attempts: DEFAULT_WAIT_ATTEMPTS,
            wait_interval: DEFAULT_WAIT_INTERVAL,
            claim_attempts: DEFAULT_CLAIM_ATTEMPTS,
        }
    }

    /// Override how long a writer waits on an existing temp file.
    pub fn with_wait(mut self, attempts: u32, interval: Duration) -> Self {
        self.wait_attempts = attempts;
        self.wait_interval = interval;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Create the storage directory if needed.
    pub async fn ensure_dir(&self) -> Result<(), TrackError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| TrackError::io(&self.dir, e))
    }

    pub async fn exists(&self, filename: &str) -> bool {
        fs::try_exists(self.path_for(filename))
            .await
            .unwrap_or(false)
    }

    /// Read a whole track file.
    pub async fn read(&self, filename: &str) -> Result<Vec<u8>, TrackError> {
        let path = self.path_for(filename);
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(TrackError::Missing(path)),
            Err(e) => Err(TrackError::io(path, e)),
        }
    }

    /// Remove a track file. Missing files are not an error.
    pub async fn remove(&self, filename: &str) -> Result<(), TrackError> {
        let path = self.path_for(filename);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TrackError::io(path, e)),
        }
    }

    /// Atomically replace (or create) a track file with `bytes`.
    pub async fn replace(&self, filename: &str, bytes: &[u8]) -> Result<(), TrackError> {
        let path = self.path_for(filename);
        let tmp = temp_path(&path);

        for attempt in 1..=self.claim_attempts {
            self.wait_for_temp(&tmp).await?;

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&tmp)
                .await
            {
                Ok(file) => return write_and_swap(file, &tmp, &path, bytes).await,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(
                        path = %tmp.display(),
                        attempt,
                        "Temp file claimed by another writer"
                    );
                }
                Err(e) => return Err(TrackError::io(tmp, e)),
            }
        }

        tracing::warn!(
            path = %tmp.display(),
            attempts = self.claim_attempts,
            "Gave up claiming temp file"
        );
        Err(TrackError::Contention {
            path: tmp,
            attempts: self.claim_attempts,
        })
    }

    /// Wait for another writer's temp file to go away, clearing it if it
    /// outlives the wait.
    async fn wait_for_temp(&self, tmp: &Path) -> Result<(), TrackError> {
        for _ in 0..self.wait_attempts {
            if !fs::try_exists(tmp).await.unwrap_or(false) {
                return Ok(());
            }
            tokio::time::sleep(self.wait_interval).await;
        }

        if !fs::try_exists(tmp).await.unwrap_or(false) {
            return Ok(());
        }

        tracing::warn!(
            path = %tmp.display(),
            waited_ms = (self.wait_interval * self.wait_attempts).as_millis() as u64,
            "Clearing stale temp file"
        );
        match fs::remove_file(tmp).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TrackError::io(tmp, e)),
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

async fn write_and_swap(
    mut file: fs::File,
    tmp: &Path,
    path: &Path,
    bytes: &[u8],
) -> Result<(), TrackError> {
    let result: std::io::Result<()> = async {
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(tmp, path).await
    }
    .await;

    if let Err(e) = result {
        if let Err(cleanup) = fs::remove_file(tmp).await {
            if cleanup.kind() != ErrorKind::NotFound {
                tracing::warn!(path = %tmp.display(), error = %cleanup, "Failed to remove temp file");
            }
        }
        return Err(TrackError::io(path, e));
    }
    Ok(())
}
