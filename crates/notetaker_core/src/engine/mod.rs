//! Client-side reconciliation engine.
//!
//! # Responsibility
//! - Own the note collection and composer state as the single writer.
//! - Merge snapshot and remote create/update/delete events.
//! - Translate composer actions into outbound intents.
//!
//! # Invariants
//! - Create and update events upsert by id, so their arrival order does not
//!   change the final collection.
//! - Deletes of unknown ids are no-ops.
//! - Intents never mutate the collection locally; only events do.

pub mod reconciler;
pub mod sink;
