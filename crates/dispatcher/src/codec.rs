//! Message codec - ChangeRecord to OutboundMessage

use serde_json::{Map, Value};

use contracts::{ChangeRecord, MutationKind, OutboundMessage, RoutedEntity};

use crate::error::DispatcherError;

/// Encode a change record
///
/// Returns `Ok(None)` for unchanged/detached records. Every call yields a
/// message with a fresh id.
///
/// # Errors
/// Serialization failure of the entity (a programming error, not transient)
pub fn encode<E: RoutedEntity>(
    record: &ChangeRecord<E>,
) -> Result<Option<OutboundMessage>, DispatcherError> {
    let Some(kind) = record.mutation_kind() else {
        return Ok(None);
    };

    let label = record.entity.routing_label();
    let payload = encode_payload(kind, &record.entity)
        .map_err(|e| DispatcherError::encode(&label, e))?;

    Ok(Some(OutboundMessage::new(label, payload)))
}

/// Encode a batch, skipping filtered records
///
/// Fails as a whole on the first unencodable record.
pub fn encode_all<E, I>(records: I) -> Result<Vec<OutboundMessage>, DispatcherError>
where
    E: RoutedEntity,
    I: IntoIterator<Item = ChangeRecord<E>>,
{
    records
        .into_iter()
        .filter_map(|record| encode(&record).transpose())
        .collect()
}

/// `{"state": <kind>, "<PAYLOAD_FIELD>": <entity>}` as UTF-8 JSON
fn encode_payload<E: RoutedEntity>(
    kind: MutationKind,
    entity: &E,
) -> Result<Vec<u8>, serde_json::Error> {
    let mut body = Map::new();
    body.insert("state".to_string(), serde_json::to_value(kind)?);
    body.insert(E::PAYLOAD_FIELD.to_string(), serde_json::to_value(entity)?);
    serde_json::to_vec(&Value::Object(body))
}
