//! Cell text from a column descriptor and a row.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use upkeep_fields::{lookup_path, ColumnDescriptor, ColumnKind, Record};

pub const ONLINE_LABEL: &str = "Online";
pub const OFFLINE_LABEL: &str = "Offline";

/// Display text for one cell.
pub fn render_cell(column: &ColumnDescriptor, row: &Record) -> String {
    let value = lookup_path(row, &column.key).unwrap_or(&Value::Null);
    match &column.kind {
        ColumnKind::Custom(renderer) => renderer.render(value, row),
        ColumnKind::Object => match value {
            Value::Object(nested) => nested
                .get("name")
                .filter(|v| !is_empty_text(v))
                .or_else(|| nested.get("id"))
                .filter(|v| !is_empty_text(v))
                .map(stringify)
                .unwrap_or_default(),
            other => stringify(other),
        },
        ColumnKind::Boolean => {
            if truthy(value) {
                ONLINE_LABEL.to_string()
            } else {
                OFFLINE_LABEL.to_string()
            }
        }
        ColumnKind::Date => match value {
            Value::String(raw) => format_date(raw).unwrap_or_else(|| raw.clone()),
            other => stringify(other),
        },
        ColumnKind::Text | ColumnKind::Number => stringify(value),
    }
}

/// Strings unquoted, null empty, everything else as JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn is_empty_text(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Truthiness for status labels: `true`, non-zero numbers, `"true"`/`"1"`.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1"),
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

/// `YYYY-MM-DD` from an RFC 3339 timestamp, a naive timestamp or a date.
fn format_date(raw: &str) -> Option<String> {
    let date = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// Numeric sort key for `Number` columns; numeric strings count.
pub(crate) fn numeric(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use upkeep_fields::CellRenderer;

    fn row(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn column(kind: ColumnKind) -> ColumnDescriptor {
        ColumnDescriptor::new("v", "V", kind)
    }

    #[test]
    fn boolean_renders_online_offline() {
        let col = column(ColumnKind::Boolean);
        assert_eq!(render_cell(&col, &row(json!({"v": true}))), "Online");
        assert_eq!(render_cell(&col, &row(json!({"v": false}))), "Offline");
        assert_eq!(render_cell(&col, &row(json!({}))), "Offline");
        assert_eq!(render_cell(&col, &row(json!({"v": null}))), "Offline");
        assert_eq!(render_cell(&col, &row(json!({"v": 0}))), "Offline");
        assert_eq!(render_cell(&col, &row(json!({"v": ""}))), "Offline");
        assert_eq!(render_cell(&col, &row(json!({"v": 1}))), "Online");
        assert_eq!(render_cell(&col, &row(json!({"v": "true"}))), "Online");
    }

    #[test]
    fn object_prefers_name_then_id() {
        let col = column(ColumnKind::Object);
        assert_eq!(
            render_cell(&col, &row(json!({"v": {"id": 3, "name": "Plant 2"}}))),
            "Plant 2"
        );
        assert_eq!(render_cell(&col, &row(json!({"v": {"id": 3}}))), "3");
        assert_eq!(
            render_cell(&col, &row(json!({"v": {"id": 3, "name": ""}}))),
            "3"
        );
        assert_eq!(render_cell(&col, &row(json!({"v": {"code": "x"}}))), "");
        assert_eq!(render_cell(&col, &row(json!({"v": null}))), "");
    }

    #[test]
    fn dates_are_trimmed_to_day() {
        let col = column(ColumnKind::Date);
        assert_eq!(
            render_cell(&col, &row(json!({"v": "2024-03-05T14:22:01Z"}))),
            "2024-03-05"
        );
        assert_eq!(
            render_cell(&col, &row(json!({"v": "2024-03-05T14:22:01.123"}))),
            "2024-03-05"
        );
        assert_eq!(render_cell(&col, &row(json!({"v": "2024-03-05"}))), "2024-03-05");
        assert_eq!(render_cell(&col, &row(json!({"v": "soon"}))), "soon");
    }

    #[test]
    fn custom_renderer_sees_whole_row() {
        let col = column(ColumnKind::Custom(CellRenderer::new(|value, row| {
            format!("{} {}", stringify(value), stringify(&row["unit"]))
        })));
        assert_eq!(
            render_cell(&col, &row(json!({"v": 12, "unit": "pcs"}))),
            "12 pcs"
        );
    }

    #[test]
    fn nested_keys_and_plain_values() {
        let col = ColumnDescriptor::new("location.site", "Site", ColumnKind::Text);
        assert_eq!(
            render_cell(&col, &row(json!({"location": {"site": "North"}}))),
            "North"
        );
        assert_eq!(stringify(&json!(2.5)), "2.5");
        assert_eq!(stringify(&json!([1, 2])), "[1,2]");
    }
}
