//! Attribute bags and the type fixups applied on their way to and from storage.
//!
//! Two conventions hold for every backend:
//! - fields whose name ends in `_at` carry dates in one canonical textual form,
//! - booleans are stored as the integers `0` / `1`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Value};

/// Field name → value mapping for one entity.
pub type Attributes = Map<String, Value>;

/// Suffix marking a field as a timestamp.
pub const TIMESTAMP_SUFFIX: &str = "_at";

/// Whether `field` follows the timestamp naming convention.
pub fn is_timestamp_field(field: &str) -> bool {
    field.ends_with(TIMESTAMP_SUFFIX)
}

/// Render an instant in the canonical date representation.
pub fn canonical_date(instant: DateTime<Utc>) -> Value {
    Value::String(instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Parse any accepted date input into an instant.
///
/// Accepts RFC 3339 strings, `YYYY-MM-DD HH:MM:SS[.fff]` (read as UTC),
/// bare `YYYY-MM-DD` dates and integer epoch milliseconds.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_date_str(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Coerce every non-null timestamp field into the canonical date form.
///
/// Values that cannot be read as a date are left as they are so schema
/// validation can reject them with a precise message.
pub fn fix_dates(attrs: &mut Attributes) {
    for (key, value) in attrs.iter_mut() {
        if !is_timestamp_field(key) || value.is_null() {
            continue;
        }
        if let Some(instant) = parse_date(value) {
            *value = canonical_date(instant);
        }
    }
}

/// Convert booleans to `0` / `1`.
pub fn fix_bools(attrs: &mut Attributes) {
    for value in attrs.values_mut() {
        if let Value::Bool(b) = value {
            *value = Value::from(i64::from(*b));
        }
    }
}

/// Both fixups, dates first.
pub fn format(attrs: &mut Attributes) {
    fix_dates(attrs);
    fix_bools(attrs);
}

/// Read a stored boolean, accepting the integer encoding.
pub fn decode_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn booleans_become_integers() {
        let mut a = attrs(json!({ "featured": true, "page": false, "title": "x" }));
        fix_bools(&mut a);
        assert_eq!(a["featured"], json!(1));
        assert_eq!(a["page"], json!(0));
        assert_eq!(a["title"], json!("x"));
    }

    #[test]
    fn timestamp_fields_are_canonicalized() {
        let mut a = attrs(json!({
            "published_at": "2013-06-12 10:30:00",
            "created_at": "2013-06-12T12:30:00+02:00",
            "updated_at": 1371033000000i64,
            "expires_at": "2013-06-12",
        }));
        fix_dates(&mut a);
        assert_eq!(a["published_at"], json!("2013-06-12T10:30:00.000Z"));
        assert_eq!(a["created_at"], json!("2013-06-12T10:30:00.000Z"));
        assert_eq!(a["updated_at"], json!("2013-06-12T10:30:00.000Z"));
        assert_eq!(a["expires_at"], json!("2013-06-12T00:00:00.000Z"));
    }

    #[test]
    fn null_and_non_timestamp_fields_are_untouched() {
        let mut a = attrs(json!({ "published_at": null, "title": "2013-06-12" }));
        fix_dates(&mut a);
        assert_eq!(a["published_at"], Value::Null);
        assert_eq!(a["title"], json!("2013-06-12"));
    }

    #[test]
    fn unparseable_dates_are_left_for_validation() {
        let mut a = attrs(json!({ "published_at": "yesterday-ish" }));
        fix_dates(&mut a);
        assert_eq!(a["published_at"], json!("yesterday-ish"));
    }

    #[test]
    fn decode_bool_reads_integer_encoding() {
        assert_eq!(decode_bool(&json!(1)), Some(true));
        assert_eq!(decode_bool(&json!(0)), Some(false));
        assert_eq!(decode_bool(&json!(true)), Some(true));
        assert_eq!(decode_bool(&json!(2)), None);
        assert_eq!(decode_bool(&json!("1")), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: every boolean is stored as exactly 0 or 1 and decodes back to itself.
        #[test]
        fn booleans_round_trip_through_storage_encoding(flags in prop::collection::vec(any::<bool>(), 1..8)) {
            let mut a = Attributes::new();
            for (i, flag) in flags.iter().enumerate() {
                a.insert(format!("flag_{i}"), Value::Bool(*flag));
            }
            fix_bools(&mut a);
            for (i, flag) in flags.iter().enumerate() {
                let stored = &a[&format!("flag_{i}")];
                prop_assert!(stored == &json!(0) || stored == &json!(1));
                prop_assert_eq!(decode_bool(stored), Some(*flag));
            }
        }

        /// Property: canonical dates parse back to the same instant (millisecond precision).
        #[test]
        fn canonical_dates_parse_back(ms in 0i64..4_102_444_800_000i64) {
            let mut a = Attributes::new();
            a.insert("published_at".into(), Value::from(ms));
            fix_dates(&mut a);
            let parsed = parse_date(&a["published_at"]).unwrap();
            prop_assert_eq!(parsed.timestamp_millis(), ms);
        }
    }
}
