use async_trait::async_trait;
use notetaker_core::{
    ChangeKind, CreateNoteInput, DeleteNoteInput, EngineView, InMemoryBackend, IntentKind, Note,
    NoteBackend, SessionError, SnapshotStatus, SyncSession, TransportError, TransportResult,
    UpdateNoteInput,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

const WAIT: Duration = Duration::from_secs(5);

async fn start(backend: &Arc<InMemoryBackend>) -> SyncSession {
    let shared: Arc<dyn NoteBackend> = backend.clone();
    SyncSession::start(shared, 64).await.unwrap()
}

async fn wait_for(
    views: &mut watch::Receiver<EngineView>,
    predicate: impl FnMut(&EngineView) -> bool,
) -> EngineView {
    tokio::time::timeout(WAIT, views.wait_for(predicate))
        .await
        .expect("view condition should be reached in time")
        .expect("session should still publish views")
        .clone()
}

fn texts(view: &EngineView) -> Vec<&str> {
    view.notes.iter().map(|note| note.text.as_str()).collect()
}

#[tokio::test]
async fn start_loads_snapshot() {
    let backend = Arc::new(InMemoryBackend::with_notes(
        16,
        vec![Note::new("1", "hello"), Note::new("2", "world")],
    ));
    let session = start(&backend).await;

    assert_eq!(
        session.snapshot_status(),
        &SnapshotStatus::Loaded { notes: 2 }
    );
    assert_eq!(texts(&session.view()), vec!["hello", "world"]);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn snapshot_failure_is_reported_and_leaves_collection_empty() {
    let backend = Arc::new(InMemoryBackend::with_notes(16, vec![Note::new("1", "x")]));
    backend.set_fail_fetch(true);

    let session = start(&backend).await;

    assert!(matches!(
        session.snapshot_status(),
        SnapshotStatus::Failed(TransportError::Unavailable(_))
    ));
    assert!(session.view().notes.is_empty());

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn subscription_failure_aborts_start() {
    let backend = Arc::new(InMemoryBackend::default());
    backend.set_fail_subscriptions(true);
    let shared: Arc<dyn NoteBackend> = backend.clone();

    let result = SyncSession::start(shared, 8).await;

    assert!(matches!(result, Err(SessionError::Subscribe(_))));
    for kind in ChangeKind::ALL {
        assert_eq!(backend.subscriber_count(kind), 0);
    }
}

#[tokio::test]
async fn create_round_trip_appends_note_from_event() {
    let backend = Arc::new(InMemoryBackend::default());
    let session = start(&backend).await;
    let handle = session.handle();
    let mut views = session.subscribe_view();

    handle.set_draft_text("buy milk").await.unwrap();
    handle.submit().await.unwrap();

    let view = wait_for(&mut views, |view| view.notes.len() == 1).await;
    assert_eq!(texts(&view), vec!["buy milk"]);
    assert_eq!(view.composer.draft_text, "");
    assert_eq!(backend.notes(), view.notes);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn edit_round_trip_clears_composer_after_update_event() {
    let backend = Arc::new(InMemoryBackend::with_notes(16, vec![Note::new("1", "hello")]));
    let session = start(&backend).await;
    let handle = session.handle();
    let mut views = session.subscribe_view();

    handle.select_for_edit("1", "hello world").await.unwrap();
    handle.submit().await.unwrap();

    let view = wait_for(&mut views, |view| {
        texts(view) == vec!["hello world"] && view.composer.target_id.is_none()
    })
    .await;
    assert_eq!(view.composer.draft_text, "");
    assert!(view.status.pending_update.is_none());

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn delete_removes_note_only_after_event() {
    let backend = Arc::new(InMemoryBackend::with_notes(
        16,
        vec![Note::new("1", "keep"), Note::new("2", "drop")],
    ));
    let session = start(&backend).await;
    let handle = session.handle();
    let mut views = session.subscribe_view();

    handle.delete("2").await.unwrap();

    let view = wait_for(&mut views, |view| view.notes.len() == 1).await;
    assert_eq!(texts(&view), vec!["keep"]);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn remote_edit_from_another_client_is_applied() {
    let backend = Arc::new(InMemoryBackend::with_notes(16, vec![Note::new("1", "v1")]));
    let session = start(&backend).await;
    let mut views = session.subscribe_view();

    backend
        .update_note(UpdateNoteInput {
            id: "1".to_string(),
            text: "v2".to_string(),
        })
        .await
        .unwrap();

    let view = wait_for(&mut views, |view| texts(view) == vec!["v2"]).await;
    assert_eq!(view.notes.len(), 1);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn failed_intent_is_surfaced_in_view() {
    let backend = Arc::new(InMemoryBackend::with_notes(16, vec![Note::new("1", "x")]));
    let session = start(&backend).await;
    let handle = session.handle();
    let mut views = session.subscribe_view();
    backend.set_fail_mutations(true);

    handle.select_for_edit("1", "y").await.unwrap();
    handle.submit().await.unwrap();

    let view = wait_for(&mut views, |view| view.status.last_failure.is_some()).await;
    let failure = view.status.last_failure.clone().unwrap();
    assert_eq!(failure.kind, IntentKind::Update);
    assert_eq!(failure.note_id.as_deref(), Some("1"));
    // The composer keeps the edit so the user can retry.
    assert_eq!(view.composer.draft_text, "y");
    assert_eq!(view.composer.target_id.as_deref(), Some("1"));
    assert_eq!(texts(&view), vec!["x"]);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn shutdown_releases_subscriptions_and_rejects_commands() {
    let backend = Arc::new(InMemoryBackend::with_notes(16, vec![Note::new("1", "x")]));
    let session = start(&backend).await;
    let handle = session.handle();
    for kind in ChangeKind::ALL {
        assert_eq!(backend.subscriber_count(kind), 1);
    }

    let final_view = session.shutdown().await.unwrap();

    assert_eq!(texts(&final_view), vec!["x"]);
    for kind in ChangeKind::ALL {
        assert_eq!(backend.subscriber_count(kind), 0);
    }
    assert_eq!(
        handle.set_draft_text("late").await,
        Err(SessionError::Closed)
    );
}

/// Backend whose list query races with a create and a delete from another
/// client. The events are published while the fetch is still in flight.
struct RacingBackend {
    inner: InMemoryBackend,
    /// Whether the list response is taken before the racing changes land.
    stale_snapshot: bool,
}

impl RacingBackend {
    fn new(stale_snapshot: bool) -> Self {
        Self {
            inner: InMemoryBackend::with_notes(
                16,
                vec![Note::new("keep", "stays"), Note::new("gone", "removed")],
            ),
            stale_snapshot,
        }
    }

    async fn race_changes(&self) {
        self.inner
            .create_note(CreateNoteInput {
                text: "fresh".to_string(),
            })
            .await
            .unwrap();
        self.inner
            .delete_note(DeleteNoteInput {
                id: "gone".to_string(),
            })
            .await
            .unwrap();
        // Let the forwarders move the events into the intake queue.
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl NoteBackend for RacingBackend {
    async fn fetch_all(&self) -> TransportResult<Vec<Note>> {
        if self.stale_snapshot {
            let snapshot = self.inner.fetch_all().await;
            self.race_changes().await;
            snapshot
        } else {
            self.race_changes().await;
            self.inner.fetch_all().await
        }
    }

    async fn create_note(&self, input: CreateNoteInput) -> TransportResult<()> {
        self.inner.create_note(input).await
    }

    async fn update_note(&self, input: UpdateNoteInput) -> TransportResult<()> {
        self.inner.update_note(input).await
    }

    async fn delete_note(&self, input: DeleteNoteInput) -> TransportResult<()> {
        self.inner.delete_note(input).await
    }

    fn subscribe(&self, kind: ChangeKind) -> TransportResult<broadcast::Receiver<Note>> {
        self.inner.subscribe(kind)
    }
}

async fn run_racing_session(stale_snapshot: bool) -> EngineView {
    let backend: Arc<dyn NoteBackend> = Arc::new(RacingBackend::new(stale_snapshot));
    let session = SyncSession::start(backend, 64).await.unwrap();
    assert!(matches!(
        session.snapshot_status(),
        SnapshotStatus::Loaded { .. }
    ));
    // Messages queued ahead of shutdown are applied before the final view.
    session.shutdown().await.unwrap()
}

#[tokio::test]
async fn events_during_stale_snapshot_are_replayed_after_it() {
    let view = run_racing_session(true).await;

    assert_eq!(texts(&view), vec!["stays", "fresh"]);
}

#[tokio::test]
async fn events_already_in_snapshot_do_not_duplicate_notes() {
    let view = run_racing_session(false).await;

    assert_eq!(texts(&view), vec!["stays", "fresh"]);
    assert_eq!(view.notes.iter().filter(|note| note.text == "fresh").count(), 1);
    assert!(view.notes.iter().all(|note| note.id != "gone"));
}
