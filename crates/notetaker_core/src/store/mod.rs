//! Explicitly owned in-memory note store.
//!
//! # Responsibility
//! - Hold the client's note collection behind a small upsert/remove API.
//! - Keep rendering layers read-only; only the engine holds `&mut`.
//!
//! # Invariants
//! - At most one note per id at any time.

pub mod collection;
