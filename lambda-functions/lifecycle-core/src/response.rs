use serde::{Deserialize, Serialize};

/// `{ statusCode, body }` envelope returned by the start and stop functions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Response<B> {
    pub status_code: u16,
    pub body: B,
}

impl<B> Response<B> {
    pub fn ok(body: B) -> Self {
        Self {
            status_code: 200,
            body,
        }
    }

    pub fn with_status(status_code: u16, body: B) -> Self {
        Self { status_code, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Result of a best-effort step. None of these stop the surrounding handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed(String),
    /// Nothing to do.
    Skipped(String),
    Warning(String),
}

impl StepOutcome {
    pub fn message(&self) -> &str {
        match self {
            Self::Completed(msg) | Self::Skipped(msg) | Self::Warning(msg) => msg,
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning(_))
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            Self::Warning(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<String, String> {
        match self {
            Self::Completed(msg) | Self::Skipped(msg) => Ok(msg),
            Self::Warning(msg) => Err(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_serialization() {
        let response = Response::ok(ErrorBody::new("boom"));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({"statusCode": 200, "body": {"error": "boom"}}));
    }

    #[test]
    fn test_is_success() {
        assert!(Response::ok(()).is_success());
        assert!(!Response::with_status(500, ()).is_success());
    }

    #[test]
    fn test_step_outcome_accessors() {
        let warning = StepOutcome::Warning("throttled".to_string());
        assert!(warning.is_warning());
        assert_eq!(warning.warning(), Some("throttled"));

        let skipped = StepOutcome::Skipped("nothing there".to_string());
        assert!(!skipped.is_warning());
        assert_eq!(skipped.warning(), None);
        assert_eq!(skipped.message(), "nothing there");
        assert_eq!(skipped.into_result(), Ok("nothing there".to_string()));
    }
}
