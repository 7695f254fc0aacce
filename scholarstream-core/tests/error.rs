use scholarstream_core::{AuthError, ClientError, RoleError};

#[test]
fn only_network_errors_are_retryable() {
    assert!(ClientError::network("connection reset").is_retryable());
    assert!(ClientError::Network {
        message: "deadline".into(),
        timeout: true
    }
    .is_retryable());
    assert!(!ClientError::api(400, "bad input").is_retryable());
    assert!(!ClientError::Auth(AuthError::InvalidCredentials).is_retryable());
    assert!(!ClientError::Role(RoleError::Missing).is_retryable());
    assert!(!ClientError::Decode("x".into()).is_retryable());
}

#[test]
fn status_is_only_reported_for_api_errors() {
    assert_eq!(ClientError::api(404, "gone").status(), Some(404));
    assert_eq!(ClientError::network("down").status(), None);
}

#[test]
fn display_messages() {
    assert_eq!(
        ClientError::api(403, "forbidden access").to_string(),
        "API error (403): forbidden access"
    );
    assert_eq!(
        ClientError::from(AuthError::EmailInUse).to_string(),
        "Email already in use"
    );
    assert_eq!(
        ClientError::from(RoleError::Unknown("owner".into())).to_string(),
        "Unknown role: owner"
    );
}

#[test]
fn user_messages_prefer_server_text() {
    assert_eq!(
        ClientError::api(409, "Already applied").user_message(),
        "Already applied"
    );
    assert_eq!(ClientError::api(500, "").user_message(), "Request failed (500)");
    assert_eq!(
        ClientError::Role(RoleError::Missing).user_message(),
        "Access is Forbidden."
    );
}

#[test]
fn json_errors_become_decode_errors() {
    let err: ClientError = serde_json::from_str::<u32>("\"nope\"").unwrap_err().into();
    assert!(matches!(err, ClientError::Decode(_)));
}
