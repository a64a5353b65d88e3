//! Generic Sheets forwarder
//!
//! `POST /proxy` with `{endpoint, method, ...rest}` sends `rest` to
//! `<sheets_base_url>/<endpoint>`. Off unless `gateway.raw_endpoint` is set.

use http::Method;
use serde_json::Value;
use tracing::info;

use super::SheetsRouter;
use crate::common::{GatewayError, GatewayResult};
use crate::google::{normalize, Relayed, UpstreamRequest};
use crate::proxy::protocol::IncomingRequest;

const FORWARDABLE: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE"];

/// Reject absolute URLs, scheme-relative paths and traversal.
fn validate_endpoint(endpoint: &str) -> GatewayResult<&str> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(GatewayError::missing_params(&["endpoint"]));
    }
    if endpoint.contains("://") || endpoint.starts_with("//") || endpoint.contains("..") {
        return Err(GatewayError::invalid_params(
            "endpoint must be a relative Sheets API path",
        ));
    }
    Ok(endpoint.trim_start_matches('/'))
}

fn parse_method(value: Option<&Value>) -> GatewayResult<Method> {
    let name = match value {
        None | Some(Value::Null) => return Ok(Method::POST),
        Some(Value::String(s)) => s.to_ascii_uppercase(),
        Some(_) => return Err(GatewayError::invalid_params("method must be a string")),
    };

    if !FORWARDABLE.contains(&name.as_str()) {
        return Err(GatewayError::invalid_params(format!(
            "Unsupported method: {}",
            name
        )));
    }
    Method::from_bytes(name.as_bytes())
        .map_err(|e| GatewayError::invalid_params(format!("Invalid method: {}", e)))
}

impl SheetsRouter {
    pub async fn forward(&self, req: &IncomingRequest) -> GatewayResult<Relayed> {
        if !self.raw_endpoint {
            return Err(GatewayError::UnknownAction("proxy".to_string()));
        }

        let caller = self.credentials.check_caller(&req.headers)?;

        if req.method != Method::POST {
            return Err(GatewayError::method_not_allowed(&req.method, "proxy"));
        }

        let mut body = req
            .json_object()?
            .ok_or_else(|| GatewayError::missing_params(&["endpoint"]))?;

        let endpoint = match body.remove("endpoint") {
            Some(Value::String(s)) => s,
            _ => return Err(GatewayError::missing_params(&["endpoint"])),
        };
        let endpoint = validate_endpoint(&endpoint)?;
        let method = parse_method(body.remove("method").as_ref())?;

        let authorization = self.credentials.authorization(caller).await?;

        let url = format!("{}/{}", self.sheets_base_url, endpoint);
        let mut request = UpstreamRequest::new(method.clone(), url).authorization(authorization);
        if method != Method::GET {
            request = request.json(Value::Object(body));
        }

        info!(%method, endpoint, "Forwarding raw Sheets request");
        let response = self.upstream.send(request).await?;
        normalize(response)
    }
}
