use serde::{Deserialize, Serialize};

/// The success half of the response envelope: `{success: true, data}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// The failure half: `{success: false, error: {code, message, details?}}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ApiErrorBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_details(code, message, None)
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            success: false,
            error: ApiErrorBody {
                code: code.into(),
                message: message.into(),
                details,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

impl HealthResponse {
    pub fn healthy(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            status: "healthy".into(),
            service: service.into(),
            version: version.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let json = serde_json::to_value(ApiResponse::ok(42)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 42);
    }

    #[test]
    fn error_envelope_shape() {
        let json = serde_json::to_value(ApiErrorResponse::new("E2004", "event is full")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "E2004");
        assert_eq!(json["error"]["message"], "event is full");
        assert!(json["error"].get("details").is_none());
    }
}
