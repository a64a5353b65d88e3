//! Request Translator
//!
//! Pure functions from a [`ResolvedAction`] to the one [`UpstreamRequest`] it
//! stands for. Path parameters are percent-encoded individually, once.
//! Authorization is attached later by the router.

use serde_json::{Map, Value};

use super::resolve::{ResolvedAction, ACTION_PARAM, OVERRIDE_PARAM, ROUTING_KEYS};
use crate::google::UpstreamRequest;
use http::Method;

pub const DEFAULT_VALUE_RENDER_OPTION: &str = "UNFORMATTED_VALUE";
pub const DEFAULT_VALUE_INPUT_OPTION: &str = "USER_ENTERED";
pub const DEFAULT_INSERT_DATA_OPTION: &str = "INSERT_ROWS";

/// Read options `values.get` takes from a POSTed body.
const READ_OPTIONS: &[&str] = &["majorDimension", "valueRenderOption", "dateTimeRenderOption"];

/// Write options `values.update` moves from the body into the query.
const UPDATE_OPTIONS: &[&str] = &[
    "valueInputOption",
    "includeValuesInResponse",
    "responseValueRenderOption",
    "responseDateTimeRenderOption",
];

/// Write options `values.append` moves from the body into the query.
const APPEND_OPTIONS: &[&str] = &[
    "valueInputOption",
    "insertDataOption",
    "includeValuesInResponse",
    "responseValueRenderOption",
    "responseDateTimeRenderOption",
];

// ── Helpers ─────────────────────────────────────────────────────────────────

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// `<base>/spreadsheets/<id>`
fn spreadsheet_url(base: &str, action: &ResolvedAction) -> String {
    format!(
        "{}/spreadsheets/{}",
        base.trim_end_matches('/'),
        encode(&action.param("spreadsheetId").unwrap_or_default())
    )
}

/// `<base>/spreadsheets/<id>/values/<range>`
fn range_url(base: &str, action: &ResolvedAction) -> String {
    format!(
        "{}/values/{}",
        spreadsheet_url(base, action),
        encode(&action.param("range").unwrap_or_default())
    )
}

/// Ordered query builder.
#[derive(Default)]
struct Query(Vec<(String, String)>);

impl Query {
    fn has(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    fn push(&mut self, key: &str, value: impl Into<String>) {
        self.0.push((key.to_string(), value.into()));
    }

    fn push_param(&mut self, action: &ResolvedAction, key: &str) {
        if !self.has(key) {
            if let Some(value) = action.param(key) {
                self.push(key, value);
            }
        }
    }

    fn push_default(&mut self, key: &str, default: &str) {
        if !self.has(key) {
            self.push(key, default);
        }
    }

    /// Caller query minus routing keys and `exclude`.
    fn passthrough(action: &ResolvedAction, exclude: &[&str]) -> Self {
        Query(
            action
                .query()
                .iter()
                .filter(|(k, _)| !ROUTING_KEYS.contains(&k.as_str()) && !exclude.contains(&k.as_str()))
                .cloned()
                .collect(),
        )
    }

    fn append_to(self, url: String) -> String {
        if self.0.is_empty() {
            return url;
        }
        let qs = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter())
            .finish();
        format!("{}?{}", url, qs)
    }
}

/// Caller body minus routing keys and `moved`.
fn forwarded_body(action: &ResolvedAction, moved: &[&str]) -> Map<String, Value> {
    action
        .body()
        .map(|body| {
            body.iter()
                .filter(|(k, _)| !ROUTING_KEYS.contains(&k.as_str()) && !moved.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default()
}

/// Body field that may also have been supplied in the query string.
fn ensure_field(body: &mut Map<String, Value>, action: &ResolvedAction, key: &str) {
    if !body.contains_key(key) {
        if let Some(value) = action.param(key) {
            body.insert(key.to_string(), Value::String(value));
        }
    }
}

fn ensure_default(body: &mut Map<String, Value>, action: &ResolvedAction, key: &str, default: &str) {
    ensure_field(body, action, key);
    if !body.contains_key(key) {
        body.insert(key.to_string(), Value::String(default.to_string()));
    }
}

fn post_json(url: String, body: Map<String, Value>) -> UpstreamRequest {
    UpstreamRequest::new(Method::POST, url).json(Value::Object(body))
}

// ── values ──────────────────────────────────────────────────────────────────

pub fn values_get(action: &ResolvedAction, base: &str) -> UpstreamRequest {
    let mut query = Query::passthrough(action, &[]);
    for key in READ_OPTIONS {
        query.push_param(action, key);
    }
    query.push_default("valueRenderOption", DEFAULT_VALUE_RENDER_OPTION);
    UpstreamRequest::new(Method::GET, query.append_to(range_url(base, action)))
}

fn write_query(action: &ResolvedAction, options: &[&str]) -> Query {
    let mut query = Query::default();
    for key in options {
        query.push_param(action, key);
    }
    query.push_default("valueInputOption", DEFAULT_VALUE_INPUT_OPTION);
    query
}

pub fn values_update(action: &ResolvedAction, base: &str) -> UpstreamRequest {
    let query = write_query(action, UPDATE_OPTIONS);
    let body = forwarded_body(action, UPDATE_OPTIONS);
    UpstreamRequest::new(Method::PUT, query.append_to(range_url(base, action)))
        .json(Value::Object(body))
}

pub fn values_append(action: &ResolvedAction, base: &str) -> UpstreamRequest {
    let mut query = write_query(action, APPEND_OPTIONS);
    query.push_default("insertDataOption", DEFAULT_INSERT_DATA_OPTION);
    let body = forwarded_body(action, APPEND_OPTIONS);
    post_json(
        query.append_to(format!("{}:append", range_url(base, action))),
        body,
    )
}

pub fn values_clear(action: &ResolvedAction, base: &str) -> UpstreamRequest {
    post_json(format!("{}:clear", range_url(base, action)), Map::new())
}

pub fn values_batch_get(action: &ResolvedAction, base: &str) -> UpstreamRequest {
    let mut query = Query::default();
    for range in action.param_list("ranges") {
        query.push("ranges", range);
    }
    query.0.extend(Query::passthrough(action, &["ranges"]).0);
    query.push_default("valueRenderOption", DEFAULT_VALUE_RENDER_OPTION);
    let url = format!("{}/values:batchGet", spreadsheet_url(base, action));
    UpstreamRequest::new(Method::GET, query.append_to(url))
}

pub fn values_batch_update(action: &ResolvedAction, base: &str) -> UpstreamRequest {
    let mut body = forwarded_body(action, &[]);
    ensure_default(&mut body, action, "valueInputOption", DEFAULT_VALUE_INPUT_OPTION);
    post_json(format!("{}/values:batchUpdate", spreadsheet_url(base, action)), body)
}

pub fn values_batch_clear(action: &ResolvedAction, base: &str) -> UpstreamRequest {
    let mut body = forwarded_body(action, &[]);
    if !body.contains_key("ranges") {
        let ranges = action.param_list("ranges").into_iter().map(Value::String).collect();
        body.insert("ranges".to_string(), Value::Array(ranges));
    }
    post_json(format!("{}/values:batchClear", spreadsheet_url(base, action)), body)
}

pub fn values_batch_get_by_data_filter(action: &ResolvedAction, base: &str) -> UpstreamRequest {
    let mut body = forwarded_body(action, &[]);
    ensure_default(&mut body, action, "valueRenderOption", DEFAULT_VALUE_RENDER_OPTION);
    post_json(
        format!("{}/values:batchGetByDataFilter", spreadsheet_url(base, action)),
        body,
    )
}

pub fn values_batch_update_by_data_filter(action: &ResolvedAction, base: &str) -> UpstreamRequest {
    let mut body = forwarded_body(action, &[]);
    ensure_default(&mut body, action, "valueInputOption", DEFAULT_VALUE_INPUT_OPTION);
    post_json(
        format!("{}/values:batchUpdateByDataFilter", spreadsheet_url(base, action)),
        body,
    )
}

pub fn values_batch_clear_by_data_filter(action: &ResolvedAction, base: &str) -> UpstreamRequest {
    post_json(
        format!("{}/values:batchClearByDataFilter", spreadsheet_url(base, action)),
        forwarded_body(action, &[]),
    )
}

// ── spreadsheets ────────────────────────────────────────────────────────────

pub fn spreadsheets_get(action: &ResolvedAction, base: &str) -> UpstreamRequest {
    let query = Query::passthrough(action, &[]);
    UpstreamRequest::new(Method::GET, query.append_to(spreadsheet_url(base, action)))
}

pub fn spreadsheets_create(action: &ResolvedAction, base: &str) -> UpstreamRequest {
    let body: Map<String, Value> = action
        .body()
        .map(|b| {
            b.iter()
                .filter(|(k, _)| k.as_str() != ACTION_PARAM && k.as_str() != OVERRIDE_PARAM)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default();
    post_json(format!("{}/spreadsheets", base.trim_end_matches('/')), body)
}

pub fn spreadsheets_batch_update(action: &ResolvedAction, base: &str) -> UpstreamRequest {
    post_json(
        format!("{}:batchUpdate", spreadsheet_url(base, action)),
        forwarded_body(action, &[]),
    )
}

pub fn spreadsheets_get_by_data_filter(action: &ResolvedAction, base: &str) -> UpstreamRequest {
    post_json(
        format!("{}:getByDataFilter", spreadsheet_url(base, action)),
        forwarded_body(action, &[]),
    )
}

pub fn sheets_copy_to(action: &ResolvedAction, base: &str) -> UpstreamRequest {
    let mut body = forwarded_body(action, &[]);
    ensure_field(&mut body, action, "destinationSpreadsheetId");
    post_json(
        format!(
            "{}/sheets/{}:copyTo",
            spreadsheet_url(base, action),
            encode(&action.param("sheetId").unwrap_or_default())
        ),
        body,
    )
}

pub fn developer_metadata_get(action: &ResolvedAction, base: &str) -> UpstreamRequest {
    let url = format!(
        "{}/developerMetadata/{}",
        spreadsheet_url(base, action),
        encode(&action.param("metadataId").unwrap_or_default())
    );
    UpstreamRequest::new(Method::GET, Query::passthrough(action, &[]).append_to(url))
}

pub fn developer_metadata_search(action: &ResolvedAction, base: &str) -> UpstreamRequest {
    post_json(
        format!("{}/developerMetadata:search", spreadsheet_url(base, action)),
        forwarded_body(action, &[]),
    )
}

#[cfg(test)]
mod tests {
    use super::super::action::{lookup, Family};
    use super::*;
    use crate::google::UpstreamBody;
    use serde_json::json;

    const BASE: &str = "https://sheets.googleapis.com/v4";

    fn resolved(family: Family, name: &str, query: &[(&str, &str)], body: Option<Value>) -> ResolvedAction {
        let spec = lookup(family, name).unwrap();
        let query = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let body = body.and_then(|b| b.as_object().cloned());
        ResolvedAction::new(spec, query, body).unwrap()
    }

    fn translate(action: &ResolvedAction) -> UpstreamRequest {
        (action.spec().build)(action, BASE)
    }

    fn json_body(req: &UpstreamRequest) -> &Value {
        match &req.body {
            Some(UpstreamBody::Json(v)) => v,
            other => panic!("expected JSON body, got {:?}", other),
        }
    }

    #[test]
    fn test_values_get_defaults() {
        let action = resolved(
            Family::Values,
            "get",
            &[("spreadsheetId", "S"), ("range", "A1:B2")],
            None,
        );
        let req = translate(&action);
        assert_eq!(req.method, Method::GET);
        assert_eq!(
            req.url,
            format!("{}/spreadsheets/S/values/A1%3AB2?valueRenderOption=UNFORMATTED_VALUE", BASE)
        );
        assert!(req.body.is_none());
    }

    #[test]
    fn test_range_encoded_exactly_once() {
        let action = resolved(
            Family::Values,
            "get",
            &[("spreadsheetId", "S"), ("range", "Sheet 1!A1:B2")],
            None,
        );
        let req = translate(&action);
        assert!(req.url.contains("/values/Sheet%201%21A1%3AB2?"));
        assert!(!req.url.contains("%25"));
    }

    #[test]
    fn test_values_get_passthrough_and_explicit_render() {
        let action = resolved(
            Family::Values,
            "get",
            &[
                ("spreadsheetId", "S"),
                ("range", "A1"),
                ("action", "get"),
                ("valueRenderOption", "FORMATTED_VALUE"),
                ("majorDimension", "COLUMNS"),
            ],
            None,
        );
        let req = translate(&action);
        let query = req.url.split_once('?').unwrap().1;
        assert_eq!(query, "valueRenderOption=FORMATTED_VALUE&majorDimension=COLUMNS");
    }

    #[test]
    fn test_values_get_from_body() {
        let action = resolved(
            Family::Values,
            "get",
            &[],
            Some(json!({"spreadsheetId": "S", "range": "A1", "majorDimension": "ROWS"})),
        );
        let req = translate(&action);
        assert_eq!(req.method, Method::GET);
        assert!(req.url.ends_with("/values/A1?majorDimension=ROWS&valueRenderOption=UNFORMATTED_VALUE"));
        assert!(req.body.is_none());
    }

    #[test]
    fn test_values_update() {
        let action = resolved(
            Family::Values,
            "update",
            &[],
            Some(json!({
                "spreadsheetId": "S",
                "range": "Sheet1!A1",
                "values": [[1, 2]],
                "includeValuesInResponse": true
            })),
        );
        let req = translate(&action);
        assert_eq!(req.method, Method::PUT);
        assert_eq!(
            req.url,
            format!(
                "{}/spreadsheets/S/values/Sheet1%21A1?includeValuesInResponse=true&valueInputOption=USER_ENTERED",
                BASE
            )
        );
        assert_eq!(json_body(&req), &json!({"values": [[1, 2]]}));
    }

    #[test]
    fn test_values_append_defaults() {
        let action = resolved(
            Family::Values,
            "append",
            &[],
            Some(json!({
                "spreadsheetId": "S",
                "range": "A1",
                "values": [["x"]],
                "valueInputOption": "RAW"
            })),
        );
        let req = translate(&action);
        assert_eq!(req.method, Method::POST);
        assert_eq!(
            req.url,
            format!(
                "{}/spreadsheets/S/values/A1:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
                BASE
            )
        );
        assert_eq!(json_body(&req), &json!({"values": [["x"]]}));
    }

    #[test]
    fn test_values_clear_sends_empty_object() {
        let action = resolved(
            Family::Values,
            "clear",
            &[("spreadsheetId", "S"), ("range", "A1:Z")],
            None,
        );
        let req = translate(&action);
        assert!(req.url.ends_with("/values/A1%3AZ:clear"));
        assert_eq!(json_body(&req), &json!({}));
    }

    #[test]
    fn test_values_batch_get() {
        let action = resolved(
            Family::Values,
            "batchGet",
            &[
                ("spreadsheetId", "S"),
                ("ranges", "A1:B2"),
                ("ranges", "Sheet 2!C3"),
                ("majorDimension", "ROWS"),
            ],
            None,
        );
        let req = translate(&action);
        assert_eq!(req.method, Method::GET);
        assert_eq!(
            req.url,
            format!(
                "{}/spreadsheets/S/values:batchGet?ranges=A1%3AB2&ranges=Sheet+2%21C3&majorDimension=ROWS&valueRenderOption=UNFORMATTED_VALUE",
                BASE
            )
        );
    }

    #[test]
    fn test_values_batch_update_default_input_option() {
        let action = resolved(
            Family::Values,
            "batchUpdate",
            &[],
            Some(json!({"spreadsheetId": "S", "data": [{"range": "A1", "values": [[1]]}]})),
        );
        let req = translate(&action);
        assert!(req.url.ends_with("/spreadsheets/S/values:batchUpdate"));
        assert_eq!(
            json_body(&req),
            &json!({"data": [{"range": "A1", "values": [[1]]}], "valueInputOption": "USER_ENTERED"})
        );
    }

    #[test]
    fn test_values_batch_clear_ranges_from_query() {
        let action = resolved(
            Family::Values,
            "batchClear",
            &[("spreadsheetId", "S"), ("ranges", "A1"), ("ranges", "B2")],
            None,
        );
        let req = translate(&action);
        assert_eq!(json_body(&req), &json!({"ranges": ["A1", "B2"]}));
    }

    #[test]
    fn test_batch_get_by_data_filter_render_default() {
        let action = resolved(
            Family::Values,
            "batchGetByDataFilter",
            &[],
            Some(json!({"spreadsheetId": "S", "dataFilters": [{"a1Range": "A1"}]})),
        );
        let req = translate(&action);
        assert!(req.url.ends_with("/values:batchGetByDataFilter"));
        assert_eq!(json_body(&req)["valueRenderOption"], "UNFORMATTED_VALUE");
    }

    #[test]
    fn test_spreadsheets_get_passthrough() {
        let action = resolved(
            Family::Spreadsheets,
            "get",
            &[("spreadsheetId", "S/1"), ("includeGridData", "true")],
            None,
        );
        let req = translate(&action);
        assert_eq!(
            req.url,
            format!("{}/spreadsheets/S%2F1?includeGridData=true", BASE)
        );
    }

    #[test]
    fn test_spreadsheets_create_forwards_resource() {
        let resource = json!({"properties": {"title": "Budget"}, "sheets": [{"properties": {"title": "Q1"}}]});
        let mut with_marker = resource.clone();
        with_marker["action"] = json!("create");
        let action = resolved(Family::Spreadsheets, "create", &[], Some(with_marker));
        let req = translate(&action);
        assert_eq!(req.url, format!("{}/spreadsheets", BASE));
        assert_eq!(json_body(&req), &resource);
    }

    #[test]
    fn test_copy_to() {
        let action = resolved(
            Family::Spreadsheets,
            "copyTo",
            &[],
            Some(json!({"spreadsheetId": "S", "sheetId": 42, "destinationSpreadsheetId": "D"})),
        );
        let req = translate(&action);
        assert_eq!(req.url, format!("{}/spreadsheets/S/sheets/42:copyTo", BASE));
        assert_eq!(json_body(&req), &json!({"destinationSpreadsheetId": "D"}));
    }

    #[test]
    fn test_developer_metadata() {
        let get = resolved(
            Family::Spreadsheets,
            "developerMetadata/get",
            &[("spreadsheetId", "S"), ("metadataId", "7")],
            None,
        );
        assert_eq!(
            translate(&get).url,
            format!("{}/spreadsheets/S/developerMetadata/7", BASE)
        );

        let search = resolved(
            Family::Spreadsheets,
            "developerMetadata/search",
            &[],
            Some(json!({"spreadsheetId": "S", "dataFilters": []})),
        );
        let req = translate(&search);
        assert_eq!(req.url, format!("{}/spreadsheets/S/developerMetadata:search", BASE));
        assert_eq!(json_body(&req), &json!({"dataFilters": []}));
    }

    #[test]
    fn test_spreadsheets_batch_update() {
        let action = resolved(
            Family::Spreadsheets,
            "batchUpdate",
            &[],
            Some(json!({"spreadsheetId": "S", "requests": [{"addSheet": {}}]})),
        );
        let req = translate(&action);
        assert_eq!(req.url, format!("{}/spreadsheets/S:batchUpdate", BASE));
        assert_eq!(json_body(&req), &json!({"requests": [{"addSheet": {}}]}));
    }

    #[test]
    fn test_translation_is_deterministic() {
        let action = resolved(
            Family::Values,
            "get",
            &[("spreadsheetId", "S"), ("range", "A1")],
            None,
        );
        assert_eq!(translate(&action), translate(&action));
    }
}
