//! JSON wire shapes exchanged with the managed backend.
//!
//! # Responsibility
//! - Decode the list envelope `{ "items": [{id, text}, ...] }`.
//! - Decode change-event payloads `{id, text}`.
//! - Encode intents as `{ "op": ..., "input": {...} }` request bodies.
//!
//! # Invariants
//! - Decoded notes are validated; one invalid item fails the whole payload.
//! - The legacy `note` field name is accepted for `text`.

use crate::backend::TransportResult;
use crate::model::intent::Intent;
use crate::model::note::Note;
use serde::{Deserialize, Serialize};

/// List query response envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePage {
    #[serde(default)]
    pub items: Vec<Note>,
}

/// Decodes a list response into validated notes.
pub fn decode_note_page(payload: &str) -> TransportResult<Vec<Note>> {
    let page: NotePage = serde_json::from_str(payload)?;
    for note in &page.items {
        note.validate()?;
    }
    Ok(page.items)
}

/// Decodes one change-event payload into a validated note.
pub fn decode_note_event(payload: &str) -> TransportResult<Note> {
    let note: Note = serde_json::from_str(payload)?;
    note.validate()?;
    Ok(note)
}

/// Encodes one change-event payload.
pub fn encode_note_event(note: &Note) -> TransportResult<String> {
    Ok(serde_json::to_string(note)?)
}

/// Encodes a list response envelope.
pub fn encode_note_page(notes: &[Note]) -> TransportResult<String> {
    let page = NotePage {
        items: notes.to_vec(),
    };
    Ok(serde_json::to_string(&page)?)
}

/// Encodes one intent as a mutation request body.
pub fn encode_intent(intent: &Intent) -> TransportResult<String> {
    Ok(serde_json::to_string(intent)?)
}

/// Decodes a mutation request body.
pub fn decode_intent(payload: &str) -> TransportResult<Intent> {
    Ok(serde_json::from_str(payload)?)
}

#[cfg(test)]
mod tests {
    use super::{decode_note_event, decode_note_page, encode_intent};
    use crate::backend::TransportError;
    use crate::model::intent::Intent;
    use crate::model::note::NoteValidationError;
    use serde_json::json;

    #[test]
    fn missing_items_decodes_as_empty_page() {
        let notes = decode_note_page("{}").expect("empty envelope should decode");
        assert!(notes.is_empty());
    }

    #[test]
    fn event_with_blank_id_is_rejected() {
        let err = decode_note_event(r#"{"id":" ","text":"x"}"#)
            .expect_err("blank id must be rejected");
        assert_eq!(err, TransportError::InvalidNote(NoteValidationError::BlankId));
    }

    #[test]
    fn malformed_payload_maps_to_decode_error() {
        let err = decode_note_event("not json").expect_err("garbage must fail");
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[test]
    fn update_intent_encodes_tagged_input() {
        let body = encode_intent(&Intent::update("1", "hello")).expect("encode");
        let value: serde_json::Value = serde_json::from_str(&body).expect("valid json");
        assert_eq!(
            value,
            json!({"op": "update", "input": {"id": "1", "text": "hello"}})
        );
    }
}
