//! In-process reference backend.
//!
//! # Responsibility
//! - Store notes in memory and assign UUIDv4 ids on create.
//! - Publish confirmed mutations on three independent broadcast channels.
//! - Pass list responses, change events and intents through the wire codec
//!   so callers see the same decoding as with a remote backend.
//! - Allow failure injection so callers can exercise error paths.
//!
//! # Invariants
//! - Every mutation that succeeds publishes exactly one change event.
//! - Failed mutations publish nothing.

use crate::backend::wire::{
    decode_intent, decode_note_event, decode_note_page, encode_intent, encode_note_event,
    encode_note_page,
};
use crate::backend::{ChangeKind, NoteBackend, TransportError, TransportResult};
use crate::model::intent::{CreateNoteInput, DeleteNoteInput, Intent, UpdateNoteInput};
use crate::model::note::Note;
use async_trait::async_trait;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use uuid::Uuid;

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Memory-backed `NoteBackend` with broadcast change channels.
pub struct InMemoryBackend {
    notes: Mutex<Vec<Note>>,
    create_tx: broadcast::Sender<Note>,
    update_tx: broadcast::Sender<Note>,
    delete_tx: broadcast::Sender<Note>,
    fail_fetch: AtomicBool,
    fail_mutations: AtomicBool,
    fail_subscriptions: AtomicBool,
}

impl InMemoryBackend {
    /// Creates an empty backend whose channels buffer `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (create_tx, _) = broadcast::channel(capacity);
        let (update_tx, _) = broadcast::channel(capacity);
        let (delete_tx, _) = broadcast::channel(capacity);
        Self {
            notes: Mutex::new(Vec::new()),
            create_tx,
            update_tx,
            delete_tx,
            fail_fetch: AtomicBool::new(false),
            fail_mutations: AtomicBool::new(false),
            fail_subscriptions: AtomicBool::new(false),
        }
    }

    /// Creates a backend pre-seeded with `notes`. Seeding publishes nothing.
    pub fn with_notes(capacity: usize, notes: Vec<Note>) -> Self {
        let backend = Self::new(capacity);
        *backend.lock_notes() = notes;
        backend
    }

    /// Makes `fetch_all` fail until reset.
    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Makes every create/update/delete fail until reset.
    pub fn set_fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    /// Makes `subscribe` fail until reset.
    pub fn set_fail_subscriptions(&self, fail: bool) {
        self.fail_subscriptions.store(fail, Ordering::SeqCst);
    }

    /// Returns the stored notes in insertion order.
    pub fn notes(&self) -> Vec<Note> {
        self.lock_notes().clone()
    }

    /// Number of live receivers on one change channel.
    pub fn subscriber_count(&self, kind: ChangeKind) -> usize {
        self.sender(kind).receiver_count()
    }

    fn sender(&self, kind: ChangeKind) -> &broadcast::Sender<Note> {
        match kind {
            ChangeKind::Create => &self.create_tx,
            ChangeKind::Update => &self.update_tx,
            ChangeKind::Delete => &self.delete_tx,
        }
    }

    fn publish(&self, kind: ChangeKind, note: &Note) -> TransportResult<()> {
        let event = decode_note_event(&encode_note_event(note)?)?;
        // Send only fails when nobody listens.
        let receivers = self.sender(kind).send(event).unwrap_or(0);
        debug!(
            "event=change_published module=backend channel={} receivers={}",
            kind.as_str(),
            receivers
        );
        Ok(())
    }

    fn lock_notes(&self) -> MutexGuard<'_, Vec<Note>> {
        self.notes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_mutations(&self, operation: &'static str) -> TransportResult<()> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable(format!(
                "{operation} failed: injected failure"
            )));
        }
        Ok(())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[async_trait]
impl NoteBackend for InMemoryBackend {
    async fn fetch_all(&self) -> TransportResult<Vec<Note>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable(
                "list failed: injected failure".to_string(),
            ));
        }
        // Round-trip through the wire codec like a remote list response.
        let payload = encode_note_page(&self.notes())?;
        decode_note_page(&payload)
    }

    async fn create_note(&self, input: CreateNoteInput) -> TransportResult<()> {
        self.check_mutations("create")?;
        let note = Note::new(Uuid::new_v4().to_string(), input.text);
        self.lock_notes().push(note.clone());
        self.publish(ChangeKind::Create, &note)
    }

    async fn update_note(&self, input: UpdateNoteInput) -> TransportResult<()> {
        self.check_mutations("update")?;
        let updated = {
            let mut notes = self.lock_notes();
            let Some(existing) = notes.iter_mut().find(|note| note.id == input.id) else {
                return Err(TransportError::Rejected {
                    operation: "update",
                    message: format!("note not found: {}", input.id),
                });
            };
            existing.text = input.text;
            existing.clone()
        };
        self.publish(ChangeKind::Update, &updated)
    }

    async fn delete_note(&self, input: DeleteNoteInput) -> TransportResult<()> {
        self.check_mutations("delete")?;
        let removed = {
            let mut notes = self.lock_notes();
            let Some(index) = notes.iter().position(|note| note.id == input.id) else {
                return Err(TransportError::Rejected {
                    operation: "delete",
                    message: format!("note not found: {}", input.id),
                });
            };
            notes.remove(index)
        };
        self.publish(ChangeKind::Delete, &removed)
    }

    async fn execute(&self, intent: Intent) -> TransportResult<()> {
        // Decode the request body the way a remote endpoint would.
        match decode_intent(&encode_intent(&intent)?)? {
            Intent::Create(input) => self.create_note(input).await,
            Intent::Update(input) => self.update_note(input).await,
            Intent::Delete(input) => self.delete_note(input).await,
        }
    }

    fn subscribe(&self, kind: ChangeKind) -> TransportResult<broadcast::Receiver<Note>> {
        if self.fail_subscriptions.load(Ordering::SeqCst) {
            return Err(TransportError::Subscription(
                kind,
                "injected failure".to_string(),
            ));
        }
        Ok(self.sender(kind).subscribe())
    }
}
