//! QR payload for gear labels

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const QR_PAYLOAD_TYPE: &str = "windsurf-gear";
const DATA_URI_PREFIX: &str = "data:application/json;base64,";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QrPayload<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    id: Uuid,
    name: &'a str,
    brand: Option<&'a str>,
    serial_number: Option<&'a str>,
}

/// Encode the identifying fields of an item as a `data:` URI that label
/// printers and scanner apps decode.
pub fn encode_payload(id: Uuid, name: &str, brand: Option<&str>, serial_number: Option<&str>) -> AppResult<String> {
    let payload = QrPayload {
        kind: QR_PAYLOAD_TYPE,
        id,
        name,
        brand,
        serial_number,
    };
    let json = serde_json::to_vec(&payload)
        .map_err(|e| AppError::Internal(format!("Failed to encode QR payload: {}", e)))?;
    Ok(format!("{}{}", DATA_URI_PREFIX, STANDARD.encode(json)))
}

/// Decode a payload produced by [`encode_payload`]
pub fn decode_payload(uri: &str) -> Option<serde_json::Value> {
    let encoded = uri.strip_prefix(DATA_URI_PREFIX)?;
    let bytes = STANDARD.decode(encoded).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_item_identity() {
        let id = Uuid::new_v4();
        let uri = encode_payload(id, "Freeride 6.5", Some("Severne"), None).unwrap();
        assert!(uri.starts_with("data:application/json;base64,"));

        let value = decode_payload(&uri).unwrap();
        assert_eq!(value["type"], "windsurf-gear");
        assert_eq!(value["id"], id.to_string());
        assert_eq!(value["name"], "Freeride 6.5");
        assert_eq!(value["brand"], "Severne");
        assert!(value["serialNumber"].is_null());
    }
}
