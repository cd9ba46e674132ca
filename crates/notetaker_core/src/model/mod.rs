//! Client-side domain model for synced notes.
//!
//! # Responsibility
//! - Define the note record shared by snapshot, events and intents.
//! - Define outbound intents and the local composer (draft editing) state.
//!
//! # Invariants
//! - Every note is identified by a backend-assigned, non-blank `NoteId`.
//! - Composer state is process-local and never persisted.

pub mod composer;
pub mod intent;
pub mod note;
