use serde_json::Value;

/// Parse a numeric field that may arrive as a JSON number or a numeric string.
///
/// Returns `None` for null, missing, non-numeric or non-finite values.
pub fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    };

    parsed.filter(|v| v.is_finite())
}

/// Parse a speed value. Negative speeds are treated as absent.
pub fn parse_speed(value: &Value) -> Option<f64> {
    parse_number(value).filter(|v| *v >= 0.0)
}

/// Parse a heading and normalise it into `[0, 360)`.
pub fn parse_heading(value: &Value) -> Option<f64> {
    parse_number(value).map(|v| v.rem_euclid(360.0))
}

/// Whether a coordinate pair can be placed on a map.
///
/// Both values must be present, finite, and inside the WGS84 ranges.
pub fn is_mappable(lat: Option<f64>, lng: Option<f64>) -> bool {
    match (lat, lng) {
        (Some(lat), Some(lng)) => {
            lat.is_finite()
                && lng.is_finite()
                && (-90.0..=90.0).contains(&lat)
                && (-180.0..=180.0).contains(&lng)
        }
        _ => false,
    }
}

/// Read the first non-null field among `keys`.
pub(crate) fn first_present<'a>(
    record: &'a serde_json::Map<String, Value>,
    keys: &[&str],
) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
}

#[cfg(test)]
mod validation_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_number_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_number(&json!(10.5)), Some(10.5));
        assert_eq!(parse_number(&json!(-3)), Some(-3.0));
        assert_eq!(parse_number(&json!("20.1")), Some(20.1));
        assert_eq!(parse_number(&json!("  7.25 ")), Some(7.25));
    }

    #[test]
    fn test_parse_number_rejects_non_numeric() {
        assert_eq!(parse_number(&json!(null)), None);
        assert_eq!(parse_number(&json!("")), None);
        assert_eq!(parse_number(&json!("north")), None);
        assert_eq!(parse_number(&json!("10.5abc")), None);
        assert_eq!(parse_number(&json!(true)), None);
        assert_eq!(parse_number(&json!([1.0])), None);
        assert_eq!(parse_number(&json!({"lat": 1.0})), None);
    }

    #[test]
    fn test_parse_number_rejects_non_finite_strings() {
        assert_eq!(parse_number(&json!("NaN")), None);
        assert_eq!(parse_number(&json!("inf")), None);
        assert_eq!(parse_number(&json!("-infinity")), None);
    }

    #[test]
    fn test_speed_and_heading() {
        assert_eq!(parse_speed(&json!(12.4)), Some(12.4));
        assert_eq!(parse_speed(&json!(-1)), None);
        assert_eq!(parse_heading(&json!(370)), Some(10.0));
        assert_eq!(parse_heading(&json!(-90)), Some(270.0));
        assert_eq!(parse_heading(&json!("360")), Some(0.0));
    }

    #[test]
    fn test_is_mappable() {
        assert!(is_mappable(Some(10.5), Some(20.1)));
        assert!(is_mappable(Some(-90.0), Some(180.0)));
        assert!(!is_mappable(None, Some(20.1)));
        assert!(!is_mappable(Some(10.5), None));
        assert!(!is_mappable(Some(91.0), Some(0.0)));
        assert!(!is_mappable(Some(0.0), Some(-180.5)));
        assert!(!is_mappable(Some(f64::NAN), Some(0.0)));
    }
}
