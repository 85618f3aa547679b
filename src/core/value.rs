//! Resolving placeholder identifiers against the JSON payload and turning
//! the result into cell values

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::excel::CellValue;

/// Where identifiers are looked up: the payload root, and inside a row group
/// the current list element first
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    root: &'a Value,
    element: Option<(&'a str, &'a Value)>,
}

impl<'a> Scope<'a> {
    pub fn root(root: &'a Value) -> Self {
        Self {
            root,
            element: None,
        }
    }

    /// Scope for one element of the group field `group`
    pub fn element(root: &'a Value, group: &'a str, element: &'a Value) -> Self {
        Self {
            root,
            element: Some((group, element)),
        }
    }

    pub fn resolve(&self, identifier: &str) -> Option<&'a Value> {
        if let Some((group, element)) = self.element {
            if identifier == "." {
                return Some(element);
            }
            let local = identifier
                .strip_prefix(group)
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(identifier);
            if let Some(found) = lookup(element, local) {
                return Some(found);
            }
        }
        lookup(self.root, identifier)
    }
}

/// Look up a dotted path. A key equal to the whole remaining path wins over
/// splitting it; numeric segments index into lists.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(found) = child(value, path) {
        return Some(found);
    }
    let (head, rest) = path.split_once('.')?;
    lookup(child(value, head)?, rest)
}

fn child<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Native cell value for a whole-cell placeholder; `None` for objects and
/// lists, which cannot be written into one cell
pub fn to_cell_value(value: &Value, as_text: bool, date1904: bool) -> Option<CellValue> {
    if as_text {
        return display(value).map(|text| match value {
            Value::Null => CellValue::Empty,
            _ => CellValue::Text(text),
        });
    }
    match value {
        Value::Null => Some(CellValue::Empty),
        Value::Bool(b) => Some(CellValue::Bool(*b)),
        Value::Number(n) => n.as_f64().map(CellValue::Number),
        Value::String(s) => Some(match date_serial(s, date1904) {
            Some(serial) => CellValue::Number(serial),
            None => CellValue::Text(s.clone()),
        }),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Text form used when a value is interpolated into longer cell text
pub fn display(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(true) => Some("TRUE".to_string()),
        Value::Bool(false) => Some("FALSE".to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Serial day number for an ISO-8601 date or date-time string.
///
/// Offsets are not converted; the wall-clock time as written is kept.
pub fn date_serial(text: &str, date1904: bool) -> Option<f64> {
    let bytes = text.as_bytes();
    if bytes.len() < 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }

    let moment: NaiveDateTime = if bytes.len() == 10 {
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?
    } else if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        dt.naive_local()
    } else {
        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()?
    };

    let epoch = if date1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    }
    .and_hms_opt(0, 0, 0)?;

    let millis = (moment - epoch).num_milliseconds();
    if millis < 0 {
        return None;
    }
    Some(millis as f64 / 86_400_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_dotted_paths() {
        let data = json!({
            "client": {"name": "Acme", "contacts": [{"email": "a@acme.test"}]},
            "AB/CR Amount": 12,
            "a.b": "literal"
        });
        assert_eq!(lookup(&data, "client.name"), Some(&json!("Acme")));
        assert_eq!(lookup(&data, "client.contacts.0.email"), Some(&json!("a@acme.test")));
        assert_eq!(lookup(&data, "AB/CR Amount"), Some(&json!(12)));
        assert_eq!(lookup(&data, "a.b"), Some(&json!("literal")));
        assert_eq!(lookup(&data, "client.missing"), None);
        assert_eq!(lookup(&data, "client.contacts.3"), None);
    }

    #[test]
    fn test_element_scope_prefers_element() {
        let data = json!({"name": "root", "currency": "EUR", "items": []});
        let item = json!({"name": "Widget", "qty": 2});
        let scope = Scope::element(&data, "items", &item);
        assert_eq!(scope.resolve("name"), Some(&json!("Widget")));
        assert_eq!(scope.resolve("items.qty"), Some(&json!(2)));
        assert_eq!(scope.resolve("currency"), Some(&json!("EUR")));
        assert_eq!(scope.resolve("."), Some(&item));
        assert_eq!(Scope::root(&data).resolve("."), None);
    }

    #[test]
    fn test_to_cell_value_native_types() {
        assert_eq!(to_cell_value(&json!(1500.5), false, false), Some(CellValue::Number(1500.5)));
        assert_eq!(to_cell_value(&json!(true), false, false), Some(CellValue::Bool(true)));
        assert_eq!(to_cell_value(&json!("Acme"), false, false), Some(CellValue::Text("Acme".into())));
        assert_eq!(to_cell_value(&json!(null), false, false), Some(CellValue::Empty));
        assert_eq!(to_cell_value(&json!([1, 2]), false, false), None);
    }

    #[test]
    fn test_text_fields_stay_text() {
        assert_eq!(to_cell_value(&json!(42), true, false), Some(CellValue::Text("42".into())));
        assert_eq!(
            to_cell_value(&json!("2024-01-15"), true, false),
            Some(CellValue::Text("2024-01-15".into()))
        );
    }

    #[test]
    fn test_date_serials() {
        assert_eq!(date_serial("2024-01-15", false), Some(45306.0));
        assert_eq!(date_serial("1900-03-01", false), Some(61.0));
        assert_eq!(date_serial("2024-01-15T12:00:00", false), Some(45306.5));
        assert_eq!(date_serial("2024-01-15T18:00:00Z", false), Some(45306.75));
        assert_eq!(date_serial("2024-01-15", true), Some(43844.0));
        assert_eq!(date_serial("15/01/2024", false), None);
        assert_eq!(date_serial("2024-13-01", false), None);
        assert_eq!(date_serial("ACME-2024-01", false), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(display(&json!(3)), Some("3".into()));
        assert_eq!(display(&json!(2.5)), Some("2.5".into()));
        assert_eq!(display(&json!(false)), Some("FALSE".into()));
        assert_eq!(display(&json!({"a": 1})), None);
    }
}
