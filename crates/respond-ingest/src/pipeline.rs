//! Upload runner: one run at a time, progress kept in shared stats.

use crate::error::IngestError;
use crate::normalize::{normalize_record, parse_upload};
use respond_store::ActionStore;
use respond_types::{Action, AdminStatus, UploadPhase, UploadStats};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Rows per upsert call; keeps each write under the hosted table's request cap.
pub const BATCH_SIZE: usize = 500;

/// Largest accepted upload, checked before parsing.
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Drives uploads and purges against the injected store.
///
/// Stats are readable at any time through [`IngestPipeline::stats`]; runs are serialized so
/// the counters always describe a single upload.
pub struct IngestPipeline {
    store: Arc<dyn ActionStore>,
    stats: Arc<RwLock<UploadStats>>,
    run_lock: Mutex<()>,
}

impl IngestPipeline {
    pub fn new(store: Arc<dyn ActionStore>) -> Self {
        Self {
            store,
            stats: Arc::new(RwLock::new(UploadStats::default())),
            run_lock: Mutex::new(()),
        }
    }

    pub async fn stats(&self) -> UploadStats {
        self.stats.read().await.clone()
    }

    /// Exact row count, or `None` when the store cannot report it.
    pub async fn db_count(&self) -> Option<usize> {
        match self.store.count().await {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::warn!(error = %e, "row count unavailable");
                None
            }
        }
    }

    pub async fn admin_status(&self) -> AdminStatus {
        AdminStatus {
            stats: self.stats().await,
            db_count: self.db_count().await,
        }
    }

    async fn publish(&self, stats: &UploadStats) {
        *self.stats.write().await = stats.clone();
    }

    /// Name and size checks, in that order, before any byte is parsed.
    pub fn check_upload(filename: &str, size: usize) -> Result<(), IngestError> {
        if size > MAX_FILE_SIZE {
            return Err(IngestError::TooLarge { size });
        }
        if !filename.ends_with(".json") {
            return Err(IngestError::WrongExtension);
        }
        Ok(())
    }

    /// Run one upload to completion and return the terminal stats.
    pub async fn ingest(&self, filename: &str, body: &[u8]) -> UploadStats {
        self.ingest_with_progress(filename, body, |_| {}).await
    }

    /// As [`IngestPipeline::ingest`], calling `on_batch` after every batch.
    pub async fn ingest_with_progress<F>(
        &self,
        filename: &str,
        body: &[u8],
        mut on_batch: F,
    ) -> UploadStats
    where
        F: FnMut(&UploadStats) + Send,
    {
        let _guard = self.run_lock.lock().await;
        let run_id = Uuid::new_v4();

        if let Err(e) = Self::check_upload(filename, body.len()) {
            return self.reject(filename, e).await;
        }

        let mut stats = UploadStats {
            phase: UploadPhase::Parsing,
            message: "Reading and parsing JSON...".to_string(),
            ..UploadStats::default()
        };
        self.publish(&stats).await;

        let items = match parse_upload(body) {
            Ok(items) => items,
            Err(e) => return self.reject(filename, e).await,
        };

        let total = items.len();
        stats.total = total;
        stats.phase = UploadPhase::Uploading;
        stats.message = format!("Uploading {} actions in batches of {}...", total, BATCH_SIZE);
        self.publish(&stats).await;
        tracing::info!(run_id = %run_id, filename, total, "upload started");

        let batches = total.div_ceil(BATCH_SIZE);
        for (i, chunk) in items.chunks(BATCH_SIZE).enumerate() {
            match self.write_batch(i * BATCH_SIZE, chunk).await {
                Ok(written) => stats.upserted += written,
                Err(reason) => {
                    tracing::warn!(run_id = %run_id, batch = i + 1, size = chunk.len(), %reason, "batch failed");
                    stats.errors += chunk.len();
                }
            }
            stats.processed = ((i + 1) * BATCH_SIZE).min(total);
            stats.message = format!("Processing batch {} of {}...", i + 1, batches);
            self.publish(&stats).await;
            on_batch(&stats);
        }

        stats.processed = total;
        stats.phase = UploadPhase::Done;
        stats.message = format!(
            "Upload complete. {} actions upserted, {} errors.",
            stats.upserted, stats.errors
        );
        self.publish(&stats).await;
        tracing::info!(
            run_id = %run_id,
            filename,
            upserted = stats.upserted,
            errors = stats.errors,
            "upload finished"
        );
        stats
    }

    /// Normalize and upsert one batch. Rows the store confirms, or the batch length when it
    /// reports no count.
    async fn write_batch(&self, offset: usize, chunk: &[Value]) -> Result<usize, String> {
        let rows: Vec<Action> = chunk
            .iter()
            .enumerate()
            .map(|(j, item)| normalize_record(offset + j, item))
            .collect::<Result<_, _>>()
            .map_err(|e| e.to_string())?;
        let confirmed = self.store.upsert(&rows).await.map_err(|e| e.to_string())?;
        Ok(confirmed.unwrap_or(rows.len()))
    }

    async fn reject(&self, filename: &str, e: IngestError) -> UploadStats {
        tracing::warn!(filename, error = %e, "upload rejected");
        let stats = UploadStats::failed(e.to_string());
        self.publish(&stats).await;
        stats
    }

    /// Delete every row. Does nothing unless `confirmed`; on success counters reset to zero.
    pub async fn purge(&self, confirmed: bool) -> UploadStats {
        if !confirmed {
            tracing::info!("purge not confirmed; nothing deleted");
            return self.stats().await;
        }
        let _guard = self.run_lock.lock().await;

        let mut stats = self.stats().await;
        stats.phase = UploadPhase::Uploading;
        stats.message = "Purging all records...".to_string();
        self.publish(&stats).await;

        let stats = match self.store.delete_all().await {
            Ok(()) => {
                tracing::info!("all records purged");
                UploadStats {
                    phase: UploadPhase::Done,
                    message: "All records purged.".to_string(),
                    ..UploadStats::default()
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "purge failed");
                UploadStats {
                    phase: UploadPhase::Error,
                    message: format!("Purge failed: {}", e.message()),
                    ..stats
                }
            }
        };
        self.publish(&stats).await;
        stats
    }
}
