//! Flattening of collection responses into table rows and CSV output.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::ExportError;

pub type Row = Map<String, Value>;

/// Renders a JSON value as a table cell: strings unquoted, null empty.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Joins a list value with `sep`; non-list values render as a single cell.
pub fn join_list(value: &Value, sep: &str) -> String {
    match value {
        Value::Array(items) => items.iter().map(cell_text).collect::<Vec<_>>().join(sep),
        other => cell_text(other),
    }
}

/// Records of a collection response: `data.<key>`, or the body itself when
/// it is already an array. `None` when the shape is not recognised.
pub fn collection<'a>(response: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    if let Some(items) = response.as_array() {
        return Some(items);
    }
    response.get("data").and_then(|d| d.get(key)).and_then(Value::as_array)
}

/// One row per record object; list-valued fields become `", "`-joined text.
pub fn collection_rows(response: &Value, key: &str) -> Option<Vec<Row>> {
    collection(response, key).map(|items| flatten_rows(items))
}

fn flatten_rows(items: &[Value]) -> Vec<Row> {
    items
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| {
                    let v = if v.is_array() { Value::String(join_list(v, ", ")) } else { v.clone() };
                    (k.clone(), v)
                })
                .collect::<Row>()
        })
        .collect()
}

/// Alert rows with `alert_reasons` and `enrollments` flattened. Only
/// `data.alerts` is accepted; any other shape yields an empty table.
pub fn alerts_to_rows(response: &Value) -> Vec<Row> {
    match response.get("data").and_then(|d| d.get("alerts")).and_then(Value::as_array) {
        Some(alerts) => flatten_rows(alerts),
        None => {
            warn!("Invalid or empty response data.");
            Vec::new()
        }
    }
}

/// Column names in first-seen order across all rows.
pub fn columns(rows: &[Row]) -> Vec<String> {
    let mut cols: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !cols.iter().any(|c| c == key) {
                cols.push(key.clone());
            }
        }
    }
    cols
}

/// Writes rows as CSV with a header line; missing cells are empty.
/// Returns the number of data rows written.
pub fn write_csv(rows: &[Row], path: &Path) -> Result<usize, ExportError> {
    let write_err = |message: String| ExportError::Write { path: path.to_path_buf(), message };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
    }
    let cols = columns(rows);
    let mut wtr = csv::Writer::from_path(path).map_err(|e| write_err(e.to_string()))?;
    wtr.write_record(&cols).map_err(|e| write_err(e.to_string()))?;
    for row in rows {
        let record = cols.iter().map(|c| row.get(c).map(cell_text).unwrap_or_default());
        wtr.write_record(record).map_err(|e| write_err(e.to_string()))?;
    }
    wtr.flush().map_err(|e| write_err(e.to_string()))?;
    info!(path = %path.display(), rows = rows.len(), "wrote CSV");
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn alerts_join_list_fields() {
        let resp = json!({"data": {"alerts": [
            {"id": 1, "alert_reasons": ["Attendance", "Grades"], "enrollments": [101, 102]},
            {"id": 2, "alert_reasons": [], "enrollments": [7]}
        ]}});
        let rows = alerts_to_rows(&resp);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["alert_reasons"], json!("Attendance, Grades"));
        assert_eq!(rows[0]["enrollments"], json!("101, 102"));
        assert_eq!(rows[1]["alert_reasons"], json!(""));
        assert_eq!(rows[1]["id"], json!(2));
    }

    #[test]
    fn invalid_alert_response_is_empty_table() {
        assert!(alerts_to_rows(&json!({"data": {}})).is_empty());
        assert!(alerts_to_rows(&json!(null)).is_empty());
        assert!(alerts_to_rows(&json!({"alerts": []})).is_empty());
        assert!(alerts_to_rows(&json!([{"id": 1}, {"id": 2}])).is_empty());
    }

    #[test]
    fn columns_keep_response_key_order() {
        let resp = json!({"data": {"alerts": [
            {"id": 1, "comments": "c", "group": "g", "issued_for": 5},
            {"id": 2, "alert_reasons": ["Grades"]}
        ]}});
        let rows = alerts_to_rows(&resp);
        assert_eq!(columns(&rows), vec!["id", "comments", "group", "issued_for", "alert_reasons"]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.csv");
        write_csv(&rows, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next(), Some("id,comments,group,issued_for,alert_reasons"));
    }

    #[test]
    fn top_level_array_is_a_collection() {
        let rows = collection_rows(&json!([{"a": 1}, "skip", {"b": null}]), "x").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(columns(&rows), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn csv_has_header_and_blank_missing_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("alerts.csv");
        let rows = collection_rows(&json!([{"a": "x,y", "b": true}, {"a": "z"}]), "x").unwrap();
        assert_eq!(write_csv(&rows, &path).unwrap(), 2);
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["a,b", "\"x,y\",true", "z,"]);
    }
}
