//! Single-writer sync session.
//!
//! # Responsibility
//! - Forward the three remote change channels and local user commands into
//!   one ordered intake queue.
//! - Own the `ReconciliationEngine` on one task and drain the queue in order.
//! - Dispatch outbound intents to the backend without blocking the engine.
//! - Publish an `EngineView` after every processed message.
//!
//! # Invariants
//! - Only the reconciler task mutates engine state.
//! - Remote events received before the snapshot completes are buffered and
//!   applied after it; upsert semantics make the replay converge.
//! - `shutdown` releases all three subscriptions before returning.

use crate::backend::{ChangeKind, NoteBackend, TransportError, TransportResult};
use crate::engine::reconciler::{EngineView, ReconciliationEngine};
use crate::engine::sink::{IntentFailure, IntentSink};
use crate::model::intent::Intent;
use crate::model::note::{Note, NoteId};
use crate::snapshot::SnapshotLoader;
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

pub type SessionResult<T> = Result<T, SessionError>;

/// Sync session failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A change subscription could not be opened.
    Subscribe(TransportError),
    /// The session has shut down and accepts no more messages.
    Closed,
    /// The reconciler task ended abnormally.
    Reconciler(String),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Subscribe(err) => write!(f, "failed to subscribe: {err}"),
            Self::Closed => write!(f, "sync session is closed"),
            Self::Reconciler(message) => write!(f, "reconciler task failed: {message}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Subscribe(err) => Some(err),
            _ => None,
        }
    }
}

/// Local user action routed through the intake queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    SetDraftText(String),
    SelectForEdit { id: NoteId, text: String },
    Submit,
    Delete(NoteId),
}

/// One message on the intake queue.
#[derive(Debug, Clone)]
enum SyncMessage {
    Remote(ChangeKind, Note),
    Command(UserCommand),
    IntentFailed(IntentFailure),
    Shutdown,
}

/// Result of the startup snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotStatus {
    Loaded { notes: usize },
    Failed(TransportError),
}

/// Intent sink that hands intents to the dispatcher task.
pub struct ChannelIntentSink {
    tx: mpsc::UnboundedSender<Intent>,
}

impl IntentSink for ChannelIntentSink {
    fn emit(&mut self, intent: Intent) -> TransportResult<()> {
        self.tx
            .send(intent)
            .map_err(|_| TransportError::Unavailable("intent dispatcher stopped".to_string()))
    }
}

/// Cloneable handle for submitting user commands.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    intake: mpsc::Sender<SyncMessage>,
}

impl SessionHandle {
    pub async fn send(&self, command: UserCommand) -> SessionResult<()> {
        self.intake
            .send(SyncMessage::Command(command))
            .await
            .map_err(|_| SessionError::Closed)
    }

    pub async fn set_draft_text(&self, text: impl Into<String>) -> SessionResult<()> {
        self.send(UserCommand::SetDraftText(text.into())).await
    }

    pub async fn select_for_edit(
        &self,
        id: impl Into<NoteId>,
        text: impl Into<String>,
    ) -> SessionResult<()> {
        self.send(UserCommand::SelectForEdit {
            id: id.into(),
            text: text.into(),
        })
        .await
    }

    pub async fn submit(&self) -> SessionResult<()> {
        self.send(UserCommand::Submit).await
    }

    pub async fn delete(&self, id: impl Into<NoteId>) -> SessionResult<()> {
        self.send(UserCommand::Delete(id.into())).await
    }
}

/// Running sync session.
pub struct SyncSession {
    handle: SessionHandle,
    views: watch::Receiver<EngineView>,
    snapshot: SnapshotStatus,
    forwarders: Vec<JoinHandle<()>>,
    reconciler: JoinHandle<EngineView>,
    dispatcher: JoinHandle<()>,
}

impl SyncSession {
    /// Subscribes to all change channels, loads the snapshot and starts the
    /// reconciler.
    ///
    /// A failed snapshot does not abort startup; it is reported through
    /// `snapshot_status` and the collection starts empty.
    ///
    /// # Errors
    /// - `SessionError::Subscribe` when any change channel cannot be opened;
    ///   subscriptions opened so far are released.
    pub async fn start(
        backend: Arc<dyn NoteBackend>,
        intake_capacity: usize,
    ) -> SessionResult<Self> {
        let mut receivers = Vec::with_capacity(ChangeKind::ALL.len());
        for kind in ChangeKind::ALL {
            match backend.subscribe(kind) {
                Ok(rx) => receivers.push((kind, rx)),
                Err(err) => {
                    error!(
                        "event=session_start module=session status=error channel={} error={}",
                        kind.as_str(),
                        err
                    );
                    return Err(SessionError::Subscribe(err));
                }
            }
        }

        let (intake_tx, mut intake_rx) = mpsc::channel(intake_capacity.max(1));
        let forwarders = receivers
            .into_iter()
            .map(|(kind, rx)| tokio::spawn(forward_changes(kind, rx, intake_tx.clone())))
            .collect::<Vec<_>>();

        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(dispatch_intents(
            Arc::clone(&backend),
            intent_rx,
            intake_tx.clone(),
        ));

        let mut engine = ReconciliationEngine::new(ChannelIntentSink { tx: intent_tx });
        let snapshot = match SnapshotLoader::new(backend).load_into(&mut engine).await {
            Ok(notes) => SnapshotStatus::Loaded { notes },
            Err(err) => SnapshotStatus::Failed(err),
        };

        let (view_tx, views) = watch::channel(engine.view());
        let reconciler = tokio::spawn(async move {
            while let Some(message) = intake_rx.recv().await {
                if !apply_message(&mut engine, message) {
                    break;
                }
                view_tx.send_replace(engine.view());
            }
            info!("event=session_stop module=session status=ok");
            engine.view()
        });

        info!(
            "event=session_start module=session status=ok snapshot={}",
            match &snapshot {
                SnapshotStatus::Loaded { .. } => "loaded",
                SnapshotStatus::Failed(_) => "failed",
            }
        );

        Ok(Self {
            handle: SessionHandle { intake: intake_tx },
            views,
            snapshot,
            forwarders,
            reconciler,
            dispatcher,
        })
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn snapshot_status(&self) -> &SnapshotStatus {
        &self.snapshot
    }

    /// Latest published view.
    pub fn view(&self) -> EngineView {
        self.views.borrow().clone()
    }

    /// Receiver notified after every processed message.
    pub fn subscribe_view(&self) -> watch::Receiver<EngineView> {
        self.views.clone()
    }

    /// Releases subscriptions, stops all tasks and returns the final view.
    ///
    /// Messages sent through outstanding handles afterwards fail with
    /// `SessionError::Closed`.
    pub async fn shutdown(self) -> SessionResult<EngineView> {
        for forwarder in &self.forwarders {
            forwarder.abort();
        }
        for forwarder in self.forwarders {
            // Awaiting guarantees the receiver has been dropped.
            let _ = forwarder.await;
        }

        // Queued messages ahead of the shutdown marker are still applied.
        self.handle
            .intake
            .send(SyncMessage::Shutdown)
            .await
            .map_err(|_| SessionError::Closed)?;
        let view = self
            .reconciler
            .await
            .map_err(|err| SessionError::Reconciler(err.to_string()))?;

        self.dispatcher.abort();
        let _ = self.dispatcher.await;
        Ok(view)
    }
}

/// Applies one intake message; returns `false` on shutdown.
fn apply_message<S: IntentSink>(
    engine: &mut ReconciliationEngine<S>,
    message: SyncMessage,
) -> bool {
    match message {
        SyncMessage::Remote(kind, note) => {
            let result = match kind {
                ChangeKind::Create => engine.on_remote_create(note).map(|_| ()),
                ChangeKind::Update => engine.on_remote_update(note).map(|_| ()),
                ChangeKind::Delete => {
                    engine.on_remote_delete(&note);
                    Ok(())
                }
            };
            if let Err(err) = result {
                warn!(
                    "event=remote_event_dropped module=session channel={} error={}",
                    kind.as_str(),
                    err
                );
            }
        }
        SyncMessage::Command(command) => match command {
            UserCommand::SetDraftText(text) => engine.set_draft_text(text),
            UserCommand::SelectForEdit { id, text } => engine.select_for_edit(id, text),
            UserCommand::Submit => {
                engine.submit_intent();
            }
            UserCommand::Delete(id) => {
                engine.delete_intent(id);
            }
        },
        SyncMessage::IntentFailed(failure) => engine.on_intent_failed(failure),
        SyncMessage::Shutdown => return false,
    }
    true
}

async fn forward_changes(
    kind: ChangeKind,
    mut rx: broadcast::Receiver<Note>,
    intake: mpsc::Sender<SyncMessage>,
) {
    loop {
        match rx.recv().await {
            Ok(note) => {
                if intake.send(SyncMessage::Remote(kind, note)).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(
                    "event=change_lagged module=session channel={} skipped={}",
                    kind.as_str(),
                    skipped
                );
            }
            Err(RecvError::Closed) => {
                info!(
                    "event=change_closed module=session channel={}",
                    kind.as_str()
                );
                break;
            }
        }
    }
}

async fn dispatch_intents(
    backend: Arc<dyn NoteBackend>,
    mut intents: mpsc::UnboundedReceiver<Intent>,
    intake: mpsc::Sender<SyncMessage>,
) {
    while let Some(intent) = intents.recv().await {
        let kind = intent.kind();
        match backend.execute(intent.clone()).await {
            Ok(()) => debug!(
                "event=intent_dispatched module=session status=ok kind={}",
                kind.as_str()
            ),
            Err(err) => {
                warn!(
                    "event=intent_dispatched module=session status=error kind={} error={}",
                    kind.as_str(),
                    err
                );
                let failure = IntentFailure::new(&intent, &err);
                if intake.send(SyncMessage::IntentFailed(failure)).await.is_err() {
                    break;
                }
            }
        }
    }
}
