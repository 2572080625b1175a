//! Projection of raw API records onto the fields a report asked for.

use serde_json::Value;
use tracing::debug;

use crate::contract::{ArtworkRecord, RawRecord};

/// Projects each record onto `fields`, keeping the requested order.
///
/// A field the API left out of a record becomes `null`.
pub fn shape(records: &[RawRecord], fields: &[String]) -> Vec<ArtworkRecord> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            fields
                .iter()
                .map(|field| {
                    let value = record.get(field).cloned().unwrap_or_else(|| {
                        debug!(record = index, field = %field, "Field missing from record, using null");
                        Value::Null
                    });
                    (field.clone(), value)
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keys_follow_requested_order_not_source_order() {
        let raw = vec![record(json!({
            "title": "Guernica study",
            "_score": 12.5,
            "id": 7,
            "artist_title": "Someone"
        }))];
        let shaped = shape(&raw, &fields(&["id", "title", "artist_title"]));
        let keys: Vec<&String> = shaped[0].keys().collect();
        assert_eq!(keys, vec!["id", "title", "artist_title"]);
        assert_eq!(shaped[0]["id"], json!(7));
    }

    #[test]
    fn missing_fields_become_null() {
        let raw = vec![record(json!({ "id": 1 })), record(json!({ "id": 2, "title": "B" }))];
        let shaped = shape(&raw, &fields(&["id", "title"]));
        assert_eq!(shaped[0]["title"], Value::Null);
        assert_eq!(shaped[1]["title"], json!("B"));
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(shape(&[], &fields(&["id"])).is_empty());
    }
}
