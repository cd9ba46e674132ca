//! Startup snapshot loading.
//!
//! # Responsibility
//! - Fetch the full note list once and seed the engine with it.
//!
//! # Invariants
//! - A loader is consumed by `load_into`, so it runs at most once.
//! - On failure the engine collection is left exactly as it was.
//! - No retry; failures are returned to the caller.

use crate::backend::{NoteBackend, TransportError, TransportResult};
use crate::engine::reconciler::ReconciliationEngine;
use crate::engine::sink::IntentSink;
use crate::model::note::Note;
use log::{error, info};
use std::sync::Arc;
use std::time::Instant;

/// One-shot snapshot fetcher.
pub struct SnapshotLoader {
    backend: Arc<dyn NoteBackend>,
}

impl SnapshotLoader {
    pub fn new(backend: Arc<dyn NoteBackend>) -> Self {
        Self { backend }
    }

    /// Fetches every note from the backend.
    ///
    /// # Side effects
    /// - Emits `snapshot_fetch` logging events with duration and status.
    pub async fn fetch_all(&self) -> TransportResult<Vec<Note>> {
        let started_at = Instant::now();
        info!("event=snapshot_fetch module=snapshot status=start");
        match self.backend.fetch_all().await {
            Ok(notes) => {
                info!(
                    "event=snapshot_fetch module=snapshot status=ok duration_ms={} notes={}",
                    started_at.elapsed().as_millis(),
                    notes.len()
                );
                Ok(notes)
            }
            Err(err) => {
                error!(
                    "event=snapshot_fetch module=snapshot status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Fetches the snapshot and replaces the engine collection with it.
    ///
    /// Returns the number of notes applied.
    ///
    /// # Errors
    /// - Returns the transport error when the fetch fails.
    /// - Returns `TransportError::InvalidNote` when the snapshot carries a
    ///   blank id.
    pub async fn load_into<S: IntentSink>(
        self,
        engine: &mut ReconciliationEngine<S>,
    ) -> TransportResult<usize> {
        let notes = self.fetch_all().await?;
        engine.on_snapshot(notes).map_err(TransportError::from)?;
        Ok(engine.notes().len())
    }
}
