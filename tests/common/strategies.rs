//! Proptest strategies for routing keys and request bodies.

use proptest::prelude::*;
use proptest::strategy::Just;

/// Entities the consumer serves
pub fn known_entity_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("paciente"), Just("medico"), Just("cuidador")]
}

/// CRUD actions bound for every entity
pub fn crud_action_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("create"),
        Just("update"),
        Just("delete"),
        Just("getById"),
        Just("getAll"),
    ]
}

/// Lowercase words that are not entity names
pub fn unknown_entity_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,12}".prop_filter("not a known entity", |s| {
        !matches!(s.as_str(), "paciente" | "medico" | "cuidador" | "usuario")
    })
}

/// Arbitrary dot-separated keys, including empty segments
pub fn arbitrary_routing_key_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-zA-Z0-9]{0,10}", 0..7).prop_map(|segments| segments.join("."))
}

/// Bodies that are not a JSON object
pub fn non_object_body_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        Just(b"".to_vec()),
        Just(b"[]".to_vec()),
        Just(b"null".to_vec()),
        Just(b"42".to_vec()),
        Just(b"\"text\"".to_vec()),
        Just(b"{\"Data\":".to_vec()),
        prop::collection::vec(any::<u8>(), 1..64)
            .prop_filter("not a JSON object", |bytes| {
                !matches!(
                    serde_json::from_slice::<serde_json::Value>(bytes),
                    Ok(serde_json::Value::Object(_))
                )
            }),
    ]
}
