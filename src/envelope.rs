//! Uniform result envelope returned by every public agent operation.
//!
//! Nothing escapes the façade as a panic or error value; callers always get
//! `{status, payload, error}` with the original failure message preserved.

use serde::Serialize;

use crate::error::AgentFault;

/// Error codes carried in the envelope.
pub mod codes {
    pub const NOT_INITIALIZED: i32 = 1;
    pub const NO_NOTIFICATIONS: i32 = 2;
    pub const DUPLICATE_SUMMARY: i32 = 3;
    /// Catch-all for unclassified failures.
    pub const GENERIC: i32 = 123;
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgentError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResult<T> {
    pub status: bool,
    pub payload: Option<T>,
    pub error: Option<AgentError>,
}

impl<T> AgentResult<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            status: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn failure(err: anyhow::Error) -> Self {
        let code = match err.downcast_ref::<AgentFault>() {
            Some(AgentFault::NotInitialized) => codes::NOT_INITIALIZED,
            Some(AgentFault::NoNotifications) => codes::NO_NOTIFICATIONS,
            Some(AgentFault::DuplicateSummary(_)) => codes::DUPLICATE_SUMMARY,
            None => codes::GENERIC,
        };
        Self {
            status: false,
            payload: None,
            error: Some(AgentError {
                code,
                message: format!("{err:#}"),
            }),
        }
    }

    pub(crate) fn from_result(result: anyhow::Result<T>) -> Self {
        match result {
            Ok(payload) => Self::ok(payload),
            Err(err) => Self::failure(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn typed_faults_map_to_dedicated_codes() {
        let res = AgentResult::<()>::failure(AgentFault::NotInitialized.into());
        assert!(!res.status);
        assert_eq!(res.error.as_ref().unwrap().code, codes::NOT_INITIALIZED);

        let res = AgentResult::<()>::failure(AgentFault::DuplicateSummary("abc".into()).into());
        assert_eq!(res.error.as_ref().unwrap().code, codes::DUPLICATE_SUMMARY);
    }

    #[test]
    fn unclassified_failures_keep_their_message() {
        let res = AgentResult::<()>::failure(anyhow!("engine exploded"));
        let error = res.error.unwrap();
        assert_eq!(error.code, codes::GENERIC);
        assert_eq!(error.message, "engine exploded");
    }

    #[test]
    fn envelope_serializes_camel_case() {
        let json = serde_json::to_value(AgentResult::ok(42)).unwrap();
        assert_eq!(json["status"], true);
        assert_eq!(json["payload"], 42);
        assert!(json["error"].is_null());
    }
}
