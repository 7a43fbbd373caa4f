//! Uniform response envelope: `{code, message, data, extra?}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};

use iplimit_core::error::{ClientCode, IpLimitError};

use crate::engine::{Committed, PropagationWarning};

pub const OK_CODE: &str = "OK";

#[derive(Debug, Serialize)]
pub struct ResultBody<T: Serialize> {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl<T: Serialize> ResultBody<T> {
    pub fn success(data: T) -> Self {
        Self { code: OK_CODE, message: "success".into(), data: Some(data), extra: Map::new() }
    }

    pub fn put_extra(mut self, key: &str, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => {
                self.extra.insert(key.to_string(), v);
            }
            Err(e) => tracing::warn!(key, error = %e, "extra field dropped from response"),
        }
        self
    }

    /// Success body that carries a propagation warning when there is one.
    pub fn committed(c: Committed<T>) -> Self {
        let mut body = Self::success(c.value);
        if let Some(w) = c.warning {
            body.extra.insert("propagationWarning".into(), warning_value(w));
        }
        body
    }
}

fn warning_value(w: PropagationWarning) -> Value {
    let mut m = Map::new();
    m.insert("seq".into(), Value::from(w.seq));
    m.insert("change".into(), Value::from(w.change.as_str()));
    m.insert("policyId".into(), w.policy_id.map_or(Value::Null, |p| Value::from(p.get())));
    m.insert("message".into(), Value::from(w.message));
    Value::Object(m)
}

impl<T: Serialize> IntoResponse for ResultBody<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Error half of the envelope.
#[derive(Debug)]
pub struct ApiError(pub IpLimitError);

impl From<IpLimitError> for ApiError {
    fn from(e: IpLimitError) -> Self {
        ApiError(e)
    }
}

pub fn status_of(code: ClientCode) -> StatusCode {
    match code {
        ClientCode::ValidationFailed | ClientCode::BadRequest | ClientCode::UnsupportedVersion => {
            StatusCode::BAD_REQUEST
        }
        ClientCode::NotFound => StatusCode::NOT_FOUND,
        ClientCode::Conflict => StatusCode::CONFLICT,
        ClientCode::StorageError | ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.client_code();
        let status = status_of(code);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "admin request failed");
        }
        let body: ResultBody<()> = ResultBody {
            code: code.as_str(),
            message: self.0.to_string(),
            data: None,
            extra: Map::new(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<ResultBody<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(status_of(ClientCode::ValidationFailed), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ClientCode::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(ClientCode::Conflict), StatusCode::CONFLICT);
        assert_eq!(status_of(ClientCode::StorageError), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn warning_lands_in_extra() {
        let body = ResultBody::committed(Committed {
            value: 7u64,
            warning: Some(PropagationWarning {
                seq: 3,
                change: iplimit_core::protocol::ChangeKind::ApisBound,
                policy_id: None,
                message: "gateway down".into(),
            }),
        });
        let v = serde_json::to_value(&body).unwrap_or_default();
        assert_eq!(v["data"], 7);
        assert_eq!(v["extra"]["propagationWarning"]["message"], "gateway down");
        assert_eq!(v["extra"]["propagationWarning"]["change"], "apis_bound");
        assert_eq!(v["extra"]["propagationWarning"]["seq"], 3);
        assert!(v["extra"]["propagationWarning"]["policyId"].is_null());
    }

    #[test]
    fn warning_value_matches_serde_shape() {
        let w = PropagationWarning {
            seq: 9,
            change: iplimit_core::protocol::ChangeKind::PolicyUpdated,
            policy_id: Some(iplimit_core::model::PolicyId(4)),
            message: "timed out".into(),
        };
        let derived = serde_json::to_value(&w).unwrap_or_default();
        assert_eq!(warning_value(w), derived);
    }

    #[test]
    fn unserializable_extra_is_skipped() {
        let mut bad = std::collections::HashMap::new();
        bad.insert((1u8, 2u8), 3u8);
        let body = ResultBody::success(1u8).put_extra("bad", bad).put_extra("ok", true);
        assert!(!body.extra.contains_key("bad"));
        assert_eq!(body.extra.get("ok"), Some(&Value::Bool(true)));
    }
}
