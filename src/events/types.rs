//! Event payloads and classification.

use serde::{Deserialize, Serialize};

use crate::reconcile::Transition;

/// What the event source hands to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSignal {
    /// Subscription established.
    Opened,
    /// One raw JSON payload.
    Message(String),
    /// Transport-level failure.
    Error(String),
    /// Subscription ended.
    Closed,
}

/// A decoded lifecycle event. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawEvent {
    #[serde(rename = "type", default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub resource_uri: Option<String>,
}

impl RawEvent {
    pub fn decode(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// Map `(type, action, state)` to a transition. Anything unlisted is a no-op.
    ///
    /// | type      | action | state      | transition |
    /// |-----------|--------|------------|------------|
    /// | container | update | Running    | Add        |
    /// | container | update | Stopped    | Remove     |
    /// | container | delete | Terminated | Remove     |
    pub fn classify(&self) -> Option<Transition> {
        match (
            self.resource_type.as_deref(),
            self.action.as_deref(),
            self.state.as_deref(),
        ) {
            (Some("container"), Some("update"), Some("Running")) => Some(Transition::Add),
            (Some("container"), Some("update"), Some("Stopped")) => Some(Transition::Remove),
            (Some("container"), Some("delete"), Some("Terminated")) => Some(Transition::Remove),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(resource_type: &str, action: &str, state: &str) -> RawEvent {
        RawEvent {
            resource_type: Some(resource_type.into()),
            action: Some(action.into()),
            state: Some(state.into()),
            resource_uri: Some("/api/app/v1/container/abc/".into()),
        }
    }

    #[test]
    fn test_classification_table() {
        assert_eq!(event("container", "update", "Running").classify(), Some(Transition::Add));
        assert_eq!(event("container", "update", "Stopped").classify(), Some(Transition::Remove));
        assert_eq!(event("container", "delete", "Terminated").classify(), Some(Transition::Remove));
    }

    #[test]
    fn test_everything_else_ignored() {
        assert_eq!(event("container", "update", "Starting").classify(), None);
        assert_eq!(event("container", "delete", "Stopped").classify(), None);
        assert_eq!(event("container", "create", "Running").classify(), None);
        assert_eq!(event("service", "update", "Running").classify(), None);
        assert_eq!(event("container", "update", "running").classify(), None);
        assert_eq!(RawEvent::default().classify(), None);
    }

    #[test]
    fn test_decode_stream_payload() {
        let payload = r#"{
            "type": "container",
            "action": "update",
            "state": "Running",
            "resource_uri": "/api/app/v1/container/8a3b/",
            "parents": ["/api/app/v1/service/11aa/"],
            "datetime": "Thu, 07 Jan 2016 10:11:12 +0000"
        }"#;

        let event = RawEvent::decode(payload).unwrap();
        assert_eq!(event.classify(), Some(Transition::Add));
        assert_eq!(event.resource_uri.as_deref(), Some("/api/app/v1/container/8a3b/"));
    }

    #[test]
    fn test_decode_partial_and_malformed() {
        let event = RawEvent::decode(r#"{"type": "container", "action": "update"}"#).unwrap();
        assert_eq!(event.state, None);
        assert_eq!(event.classify(), None);

        assert!(RawEvent::decode("not json").is_err());
        assert!(RawEvent::decode(r#"["container"]"#).is_err());
    }
}
