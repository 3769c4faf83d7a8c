use serde::{Deserialize, Serialize};

/// Event emitted while a pipeline executes.
///
/// This is the canonical unit the engine produces and the transport carries.
/// The wire shape is exactly `{"type": ..., "message": ...}`; consumers must
/// ignore unknown extra fields.
///
/// Ordering contract for one execution: zero or more `status`/`context`
/// events, then zero or more `token` events in generation order, then exactly
/// one terminal `output` or `error`, then exactly one `done`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Progress or diagnostic note (path chosen, model pull, retrieval issues)
    Status { message: String },

    /// A retrieved context snippet forwarded to the client
    Context { message: String },

    /// One generation increment, in backend emission order
    Token { message: String },

    /// Terminal: the full accumulated generation output
    Output { message: String },

    /// Terminal: the execution failed; message explains why
    Error { message: String },

    /// Stream closer, always the last event of an execution
    Done { message: String },
}

impl StreamEvent {
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status { message: message.into() }
    }

    pub fn context(message: impl Into<String>) -> Self {
        Self::Context { message: message.into() }
    }

    pub fn token(message: impl Into<String>) -> Self {
        Self::Token { message: message.into() }
    }

    pub fn output(message: impl Into<String>) -> Self {
        Self::Output { message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }

    pub fn done(message: impl Into<String>) -> Self {
        Self::Done { message: message.into() }
    }

    /// Terminal events settle the outcome of an execution; only `done` may
    /// follow them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Output { .. } | Self::Error { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Status { message }
            | Self::Context { message }
            | Self::Token { message }
            | Self::Output { message }
            | Self::Error { message }
            | Self::Done { message } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = StreamEvent::token("Hel");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"token","message":"Hel"}"#);
    }

    #[test]
    fn deserializes_known_kinds() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"error","message":"backend gone"}"#).unwrap();
        assert_eq!(event, StreamEvent::error("backend gone"));
        assert!(event.is_terminal());
    }

    #[test]
    fn ignores_unknown_extra_fields() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"done","message":"ok","elapsed_ms":12}"#).unwrap();
        assert_eq!(event, StreamEvent::done("ok"));
    }

    #[test]
    fn rejects_record_without_message() {
        let result = serde_json::from_str::<StreamEvent>(r#"{"type":"token"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_kind() {
        let result = serde_json::from_str::<StreamEvent>(r#"{"type":"metrics","message":"x"}"#);
        assert!(result.is_err());
    }
}
