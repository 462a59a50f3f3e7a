#![allow(clippy::unwrap_used, clippy::expect_used)]

use mindful_core::*;

// ---------------------------------------------------------------------------
// 1. Turn serialization shape
// ---------------------------------------------------------------------------

#[test]
fn turn_serializes_role_and_content() {
    let turn = Turn::user("I'm having trouble sleeping. Any tips?");

    let json = serde_json::to_value(&turn).unwrap();
    assert_eq!(json["role"], "user");
    assert_eq!(json["content"], "I'm having trouble sleeping. Any tips?");
    assert!(json["created_at"].is_string());

    let back: Turn = serde_json::from_value(json).unwrap();
    assert_eq!(back, turn);
}

// ---------------------------------------------------------------------------
// 2. Error display and classification
// ---------------------------------------------------------------------------

#[test]
fn error_messages_carry_context() {
    let err = MindfulError::Transport("Rate limit reached for model".to_string());
    assert_eq!(err.to_string(), "Transport error: Rate limit reached for model");
    assert_eq!(err.kind(), ErrorKind::Transport);

    let err = MindfulError::Config("GROQ_API_KEY not set".to_string());
    assert!(err.to_string().starts_with("Config error"));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn json_and_io_errors_convert() {
    let json_err = serde_json::from_str::<Turn>("not json").unwrap_err();
    let err: MindfulError = json_err.into();
    assert!(matches!(err, MindfulError::Json(_)));
    assert_eq!(err.kind(), ErrorKind::Internal);

    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let err: MindfulError = io_err.into();
    assert!(matches!(err, MindfulError::Io(_)));
}

#[test]
fn error_kind_serializes_lowercase() {
    assert_eq!(
        serde_json::to_string(&ErrorKind::Configuration).unwrap(),
        "\"configuration\""
    );
    assert_eq!(
        serde_json::to_string(&ErrorKind::Transport).unwrap(),
        "\"transport\""
    );
}
