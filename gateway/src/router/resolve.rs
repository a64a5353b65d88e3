//! Action Resolver
//!
//! Maps method + path + query onto a catalogue entry and validates that every
//! required parameter is present before anything leaves the process.

use serde_json::{Map, Value};
use tracing::debug;

use super::action::{self, ActionSpec, BodyUse, Family};
use crate::common::{GatewayError, GatewayResult};
use crate::proxy::protocol::IncomingRequest;

/// Internal override, consulted before `action`.
pub const OVERRIDE_PARAM: &str = "__action";
pub const ACTION_PARAM: &str = "action";

/// Keys that steer routing. They are never forwarded in a body or passed
/// through in a query string.
pub const ROUTING_KEYS: &[&str] = &[
    OVERRIDE_PARAM,
    ACTION_PARAM,
    "spreadsheetId",
    "range",
    "sheetId",
    "metadataId",
];

/// Pick the catalogue entry for a request.
///
/// Precedence: `__action`, then `action`, then the path after the family
/// segment (joined, then its last segment), then the implicit `get` for a GET
/// carrying the identifying parameters.
pub fn resolve_spec(family: Family, req: &IncomingRequest) -> GatewayResult<&'static ActionSpec> {
    let explicit = [OVERRIDE_PARAM, ACTION_PARAM]
        .iter()
        .filter_map(|key| req.query_value(key))
        .find(|v| !v.trim().is_empty());

    if let Some(name) = explicit {
        debug!(%family, name, "Resolving explicit action");
        return action::lookup(family, name)
            .ok_or_else(|| GatewayError::UnknownAction(format!("{}.{}", family, name)));
    }

    let tail = req.path_tail(family.as_str());
    if !tail.is_empty() {
        let joined = tail.join("/");
        debug!(%family, path = %joined, "Resolving action from path");
        return action::lookup(family, &joined)
            .or_else(|| tail.last().and_then(|last| action::lookup(family, last)))
            .ok_or_else(|| GatewayError::UnknownAction(format!("{}/{}", family, joined)));
    }

    let has = |name: &str| req.query_value(name).is_some_and(|v| !v.is_empty());
    let implicit_get = req.method == http::Method::GET
        && has("spreadsheetId")
        && (family == Family::Spreadsheets || has("range"));

    if implicit_get {
        debug!(%family, "No action given, defaulting to get");
        return action::lookup(family, "get")
            .ok_or_else(|| GatewayError::UnknownAction(format!("{}.get", family)));
    }

    Err(GatewayError::UnknownAction(format!(
        "{}: no action specified",
        family
    )))
}

/// Resolve and validate a request into a [`ResolvedAction`].
///
/// Order of rejection: unknown action, method, body, missing parameters.
pub fn resolve(family: Family, req: &IncomingRequest) -> GatewayResult<ResolvedAction> {
    let spec = resolve_spec(family, req)?;

    if !spec.allows(&req.method) {
        return Err(GatewayError::method_not_allowed(&req.method, spec.qualified()));
    }

    let body = if req.method == http::Method::GET || req.method == http::Method::HEAD {
        None
    } else {
        req.json_object()?
    };

    ResolvedAction::new(spec, req.query.clone(), body)
}

/// A catalogue entry plus the parameters it was called with.
///
/// Construction fails unless every required parameter is present, so holding
/// one means the translator has what it needs.
#[derive(Debug, Clone)]
pub struct ResolvedAction {
    spec: &'static ActionSpec,
    query: Vec<(String, String)>,
    body: Option<Map<String, Value>>,
}

impl ResolvedAction {
    pub fn new(
        spec: &'static ActionSpec,
        query: Vec<(String, String)>,
        body: Option<Map<String, Value>>,
    ) -> GatewayResult<Self> {
        if spec.body == BodyUse::Whole && body.is_none() {
            return Err(GatewayError::invalid_params(format!(
                "{} requires a JSON body",
                spec.qualified()
            )));
        }

        let resolved = Self { spec, query, body };
        let missing: Vec<&str> = spec
            .required
            .iter()
            .copied()
            .filter(|name| !resolved.has(name))
            .collect();

        if !missing.is_empty() {
            debug!(action = %spec.qualified(), ?missing, "Rejecting request with missing parameters");
            return Err(GatewayError::missing_params(&missing));
        }

        Ok(resolved)
    }

    pub fn spec(&self) -> &'static ActionSpec {
        self.spec
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&Map<String, Value>> {
        self.body.as_ref()
    }

    /// Scalar parameter: query string first, then a top-level body field.
    pub fn param(&self, name: &str) -> Option<String> {
        if let Some((_, v)) = self.query.iter().find(|(k, v)| k == name && !v.is_empty()) {
            return Some(v.clone());
        }

        match self.body.as_ref()?.get(name)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Repeated parameter: every query occurrence, else a body array.
    pub fn param_list(&self, name: &str) -> Vec<String> {
        let from_query: Vec<String> = self
            .query
            .iter()
            .filter(|(k, v)| k == name && !v.is_empty())
            .map(|(_, v)| v.clone())
            .collect();
        if !from_query.is_empty() {
            return from_query;
        }

        match self.body.as_ref().and_then(|b| b.get(name)) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Present as a non-empty scalar or any non-null body value.
    pub fn has(&self, name: &str) -> bool {
        self.param(name).is_some()
            || self
                .body
                .as_ref()
                .and_then(|b| b.get(name))
                .is_some_and(|v| !v.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::action::Action;
    use bytes::Bytes;
    use http::{HeaderMap, Method};

    fn request(method: Method, uri: &str, body: &'static str) -> IncomingRequest {
        IncomingRequest::new(
            method,
            &uri.parse().unwrap(),
            HeaderMap::new(),
            Bytes::from_static(body.as_bytes()),
        )
    }

    fn resolved_name(family: Family, method: Method, uri: &str) -> GatewayResult<Action> {
        resolve_spec(family, &request(method, uri, "")).map(|s| s.action)
    }

    #[test]
    fn test_override_beats_action_and_path() {
        let action = resolved_name(
            Family::Values,
            Method::POST,
            "/api/values/append?action=update&__action=clear",
        )
        .unwrap();
        assert_eq!(action, Action::ValuesClear);
    }

    #[test]
    fn test_action_param_beats_path() {
        let action =
            resolved_name(Family::Values, Method::POST, "/values/append?action=update").unwrap();
        assert_eq!(action, Action::ValuesUpdate);
    }

    #[test]
    fn test_path_routing() {
        assert_eq!(
            resolved_name(Family::Values, Method::GET, "/api/values/batchGet").unwrap(),
            Action::ValuesBatchGet
        );
        assert_eq!(
            resolved_name(Family::Spreadsheets, Method::GET, "/spreadsheets/developerMetadata/get")
                .unwrap(),
            Action::DeveloperMetadataGet
        );
        assert_eq!(
            resolved_name(Family::Spreadsheets, Method::POST, "/api/spreadsheets/sheets/copyTo")
                .unwrap(),
            Action::SheetsCopyTo
        );
    }

    #[test]
    fn test_implicit_get() {
        assert_eq!(
            resolved_name(Family::Values, Method::GET, "/values?spreadsheetId=S&range=A1:B2")
                .unwrap(),
            Action::ValuesGet
        );
        assert_eq!(
            resolved_name(Family::Spreadsheets, Method::GET, "/spreadsheets?spreadsheetId=S")
                .unwrap(),
            Action::SpreadsheetsGet
        );
    }

    #[test]
    fn test_implicit_get_needs_range_for_values() {
        let err = resolved_name(Family::Values, Method::GET, "/values?spreadsheetId=S").unwrap_err();
        assert!(matches!(err, GatewayError::UnknownAction(_)));
    }

    #[test]
    fn test_implicit_get_only_for_get() {
        let err = resolved_name(Family::Values, Method::POST, "/values?spreadsheetId=S&range=A1")
            .unwrap_err();
        assert!(matches!(err, GatewayError::UnknownAction(_)));
    }

    #[test]
    fn test_unknown_action() {
        let err = resolved_name(Family::Values, Method::GET, "/values?action=drop").unwrap_err();
        assert_eq!(err.to_envelope().status, 404);
        let err = resolved_name(Family::Values, Method::GET, "/values/nope").unwrap_err();
        assert_eq!(err.to_envelope().code, "UNKNOWN_ACTION");
    }

    #[test]
    fn test_method_not_allowed() {
        let err = resolve(Family::Values, &request(Method::GET, "/values/append", "")).unwrap_err();
        let env = err.to_envelope();
        assert_eq!(env.status, 405);
        assert_eq!(env.code, "METHOD_NOT_ALLOWED");
    }

    #[test]
    fn test_missing_params_listed() {
        let err = resolve(
            Family::Values,
            &request(Method::POST, "/values/append", r#"{"spreadsheetId":"S"}"#),
        )
        .unwrap_err();
        let env = err.to_envelope();
        assert_eq!(env.status, 400);
        assert!(env.message.contains("range"));
        assert!(env.message.contains("values"));
    }

    #[test]
    fn test_bad_json_before_params() {
        let err = resolve(Family::Values, &request(Method::POST, "/values/append", "{"))
            .unwrap_err();
        assert_eq!(err.to_envelope().code, "BAD_JSON");
    }

    #[test]
    fn test_create_requires_body() {
        let err = resolve(
            Family::Spreadsheets,
            &request(Method::POST, "/spreadsheets/create", ""),
        )
        .unwrap_err();
        assert_eq!(err.to_envelope().code, "INVALID_PARAMS");
    }

    #[test]
    fn test_params_query_first_then_body() {
        let resolved = resolve(
            Family::Values,
            &request(
                Method::POST,
                "/values/append?range=Q",
                r#"{"spreadsheetId":"S","range":"B","values":[[1]]}"#,
            ),
        )
        .unwrap();
        assert_eq!(resolved.param("range").as_deref(), Some("Q"));
        assert_eq!(resolved.param("spreadsheetId").as_deref(), Some("S"));
    }

    #[test]
    fn test_numeric_sheet_id_from_body() {
        let resolved = resolve(
            Family::Spreadsheets,
            &request(
                Method::POST,
                "/spreadsheets/copyTo",
                r#"{"spreadsheetId":"S","sheetId":0,"destinationSpreadsheetId":"D"}"#,
            ),
        )
        .unwrap();
        assert_eq!(resolved.param("sheetId").as_deref(), Some("0"));
    }

    #[test]
    fn test_param_list_sources() {
        let resolved = resolve(
            Family::Values,
            &request(Method::GET, "/values/batchGet?spreadsheetId=S&ranges=A&ranges=B", ""),
        )
        .unwrap();
        assert_eq!(resolved.param_list("ranges"), vec!["A", "B"]);

        let resolved = resolve(
            Family::Values,
            &request(
                Method::POST,
                "/values/batchClear",
                r#"{"spreadsheetId":"S","ranges":["A","B"]}"#,
            ),
        )
        .unwrap();
        assert_eq!(resolved.param_list("ranges"), vec!["A", "B"]);
    }
}
