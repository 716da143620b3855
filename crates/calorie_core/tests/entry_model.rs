use calorie_core::{DietLevel, Entry, EntryValidationError};
use serde_json::json;
use uuid::Uuid;

#[test]
fn entry_serializes_with_normalized_level() {
    let entry = Entry::new(512.5, 1_700_000_000_123, DietLevel::new(" Bulk ").unwrap()).unwrap();
    let value = serde_json::to_value(&entry).unwrap();

    assert_eq!(value["diet_level"], json!("bulk"));
    assert_eq!(value["calories"], json!(512.5));
    assert_eq!(value["timestamp_ms"], json!(1_700_000_000_123_i64));

    let decoded: Entry = serde_json::from_value(value).unwrap();
    assert_eq!(decoded, entry);
}

#[test]
fn deserialize_rejects_invalid_entries() {
    let id = Uuid::new_v4();
    let invalid = [
        json!({"id": id, "calories": 0.0, "timestamp_ms": 1, "diet_level": "cut"}),
        json!({"id": id, "calories": -12.0, "timestamp_ms": 1, "diet_level": "cut"}),
        json!({"id": id, "calories": 100.0, "timestamp_ms": 1, "diet_level": "   "}),
        json!({"id": Uuid::nil(), "calories": 100.0, "timestamp_ms": 1, "diet_level": "cut"}),
    ];

    for value in invalid {
        assert!(
            serde_json::from_value::<Entry>(value.clone()).is_err(),
            "accepted {value}"
        );
    }
}

#[test]
fn constructors_reject_invalid_values() {
    assert_eq!(
        Entry::new(f64::NAN, 1, DietLevel::cut()).unwrap_err(),
        EntryValidationError::NonFiniteCalories
    );
    assert_eq!(
        Entry::with_id(Uuid::nil(), 100.0, 1, DietLevel::cut()).unwrap_err(),
        EntryValidationError::NilId
    );
    assert_eq!(
        DietLevel::new("").unwrap_err(),
        EntryValidationError::BlankDietLevel
    );
}

#[test]
fn ids_are_unique_per_entry() {
    let a = Entry::new(100.0, 1, DietLevel::cut()).unwrap();
    let b = Entry::new(100.0, 1, DietLevel::cut()).unwrap();
    assert_ne!(a.id, b.id);
}
