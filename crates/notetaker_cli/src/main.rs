//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `notetaker_core` linkage and logging bootstrap.
//! - Drive one short sync session against the in-memory backend and print
//!   the resulting collection.

use notetaker_core::backend::wire::encode_note_page;
use notetaker_core::{
    init_logging, CoreConfig, EngineView, InMemoryBackend, Note, NoteBackend, SyncSession,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> ExitCode {
    println!("notetaker_core ping={}", notetaker_core::ping());
    println!("notetaker_core version={}", notetaker_core::core_version());

    let (config, rejections) = CoreConfig::resolve_env();
    match init_logging(&config.log_level, &config.log_dir) {
        Ok(()) => rejections.iter().for_each(|rejection| rejection.log()),
        Err(err) => {
            eprintln!("logging disabled: {err}");
            for rejection in &rejections {
                eprintln!("{rejection}");
            }
        }
    }

    match run_demo(&config).await {
        Ok(view) => match encode_note_page(&view.notes) {
            Ok(json) => {
                println!("notes={json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("failed to encode notes: {err}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            eprintln!("demo session failed: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run_demo(config: &CoreConfig) -> Result<EngineView, Box<dyn std::error::Error>> {
    let backend: Arc<dyn NoteBackend> = Arc::new(InMemoryBackend::with_notes(
        config.channel_capacity,
        vec![Note::new("welcome", "hello")],
    ));
    let session = SyncSession::start(backend, config.channel_capacity).await?;
    let handle = session.handle();
    let mut views = session.subscribe_view();

    handle.select_for_edit("welcome", "hello world").await?;
    handle.submit().await?;
    // The composer keeps its edit target until the update event arrives.
    settle(&mut views, |view| {
        view.composer.target_id.is_none()
            && view.notes.iter().any(|note| note.text == "hello world")
    })
    .await;

    handle.set_draft_text("second note").await?;
    handle.submit().await?;
    settle(&mut views, |view| view.notes.len() == 2).await;

    Ok(session.shutdown().await?)
}

async fn settle(
    views: &mut watch::Receiver<EngineView>,
    predicate: impl FnMut(&EngineView) -> bool,
) {
    let reached = tokio::time::timeout(SETTLE_TIMEOUT, views.wait_for(predicate))
        .await
        .map(|result| result.is_ok())
        .unwrap_or(false);
    if !reached {
        log::warn!("event=demo_settle module=cli status=timeout");
    }
}
