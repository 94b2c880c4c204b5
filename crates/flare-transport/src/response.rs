//! Decoding of ingestion acknowledgements.

use serde::Deserialize;
use serde_json::Value;

use crate::fault::SendFault;

/// Acknowledgement returned by the ingestion endpoint.
#[derive(Debug, Deserialize)]
struct Acknowledgement {
    #[serde(default)]
    id: Option<String>,
}

/// Extracts the event id from a response body.
///
/// A body with no content (empty, or only whitespace, which cannot hold a
/// JSON value) is a valid outcome and yields `Ok(None)`. Any other body must
/// be a JSON object whose `id` is a non-empty string; anything else is a
/// protocol fault.
///
/// # Errors
///
/// Returns `SendFault::Protocol` if the body is not JSON, is not an object,
/// lacks `id`, or carries an `id` that is not a non-empty string.
pub fn decode_event_id(body: &str) -> Result<Option<String>, SendFault> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| SendFault::protocol(format!("unparseable acknowledgement: {e}")))?;
    if !value.is_object() {
        return Err(SendFault::protocol("acknowledgement is not a JSON object"));
    }

    let ack = Acknowledgement::deserialize(value)
        .map_err(|e| SendFault::protocol(format!("invalid acknowledgement: {e}")))?;

    match ack.id {
        Some(id) if !id.is_empty() => Ok(Some(id)),
        Some(_) => Err(SendFault::protocol("acknowledgement has an empty id")),
        None => Err(SendFault::protocol("acknowledgement has no id")),
    }
}
