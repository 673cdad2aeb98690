//! Property-based test generators using proptest.
//!
//! Records are arbitrary JSON trees. Floats are limited to exact quarters so
//! they survive a JSON text round trip unchanged.

use chatlog_storage::Record;
use proptest::prelude::*;
use serde_json::{Map, Number};

/// Strategy for JSON leaf values.
pub fn leaf_strategy() -> impl Strategy<Value = Record> {
    prop_oneof![
        Just(Record::Null),
        any::<bool>().prop_map(Record::Bool),
        any::<i64>().prop_map(|n| Record::Number(n.into())),
        any::<u64>().prop_map(|n| Record::Number(n.into())),
        (-1_000_000i32..1_000_000, 1u32..4).prop_map(|(whole, quarters)| {
            let value = f64::from(whole) + f64::from(quarters) / 4.0;
            Number::from_f64(value).map_or(Record::Null, Record::Number)
        }),
        any::<String>().prop_map(Record::String),
    ]
}

/// Strategy for one record: a JSON tree up to a few levels deep.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    leaf_strategy().prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Record::Array),
            prop::collection::btree_map("[a-zA-Z_]{1,12}", inner, 0..8)
                .prop_map(|entries| Record::Object(entries.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Strategy for a record sequence.
pub fn records_strategy() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(record_strategy(), 0..32)
}

/// Strategy for chat-message-shaped records.
pub fn message_strategy() -> impl Strategy<Value = Record> {
    (
        any::<u32>(),
        prop_oneof![Just("say"), Just("ask")],
        "\\PC{0,200}",
        any::<bool>(),
    )
        .prop_map(|(ts, kind, text, partial)| {
            serde_json::json!({
                "ts": ts,
                "type": kind,
                "text": text,
                "partial": partial,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatlog_storage::codec;

    proptest! {
        #[test]
        fn generated_records_survive_json(records in records_strategy()) {
            let text = codec::serialize(&records).unwrap();
            prop_assert_eq!(codec::parse(&text).unwrap(), records);
        }

        #[test]
        fn messages_are_objects(message in message_strategy()) {
            prop_assert!(message.is_object());
            prop_assert!(message["text"].is_string());
        }
    }
}
