/// Errors reported by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthError {
    /// Registration was rejected because the email already has an account.
    EmailInUse,

    /// Registration was rejected by the provider's password policy.
    WeakPassword,

    /// Email/password sign-in failed.
    InvalidCredentials,

    /// The user closed or cancelled the federated sign-in flow.
    FederatedCancelled,

    /// The federated sign-in flow failed for another reason.
    FederatedFailed(String),

    /// An operation that needs a signed-in identity was called without one.
    NoActiveIdentity,

    /// Any other provider-side failure.
    Provider(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::EmailInUse => write!(f, "Email already in use"),
            AuthError::WeakPassword => write!(f, "Password is too weak"),
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::FederatedCancelled => write!(f, "Federated sign-in was cancelled"),
            AuthError::FederatedFailed(msg) => write!(f, "Federated sign-in failed: {msg}"),
            AuthError::NoActiveIdentity => write!(f, "No signed-in identity"),
            AuthError::Provider(msg) => write!(f, "Identity provider error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Errors from role resolution. Any of these means "deny".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoleError {
    /// The role lookup request itself failed.
    Lookup(String),

    /// The API answered but carried no role for this identity.
    Missing,

    /// The API answered with a role name this client does not know.
    Unknown(String),
}

impl std::fmt::Display for RoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoleError::Lookup(msg) => write!(f, "Role lookup failed: {msg}"),
            RoleError::Missing => write!(f, "No role on record"),
            RoleError::Unknown(role) => write!(f, "Unknown role: {role}"),
        }
    }
}

impl std::error::Error for RoleError {}

/// The error returned by every suspension point of the client.
///
/// Cloneable so a single fetch outcome can be handed to every caller that
/// shares it.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientError {
    /// Transport-level failure (connect, reset, timeout). Retryable.
    Network { message: String, timeout: bool },

    /// The server rejected the request.
    Api { status: u16, message: String },

    /// Identity provider rejection.
    Auth(AuthError),

    /// Role lookup failed.
    Role(RoleError),

    /// The response did not match the expected record shape.
    Decode(String),

    /// The fetch ended without producing a result.
    Cancelled,
}

impl ClientError {
    pub fn network(message: impl Into<String>) -> Self {
        ClientError::Network {
            message: message.into(),
            timeout: false,
        }
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        ClientError::Api {
            status,
            message: message.into(),
        }
    }

    /// Only transport failures are worth retrying with the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Network { .. })
    }

    /// HTTP status for server rejections.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short text suitable for an inline error or a toast.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Network { timeout: true, .. } => {
                "The server took too long to respond. Please try again.".into()
            }
            ClientError::Network { .. } => {
                "Could not reach the server. Check your connection and try again.".into()
            }
            ClientError::Api { message, .. } if !message.is_empty() => message.clone(),
            ClientError::Api { status, .. } => format!("Request failed ({status})"),
            ClientError::Auth(err) => err.to_string(),
            ClientError::Role(_) => "Access is Forbidden.".into(),
            ClientError::Decode(_) => "Received an unexpected response from the server.".into(),
            ClientError::Cancelled => "The request was cancelled.".into(),
        }
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Network { message, timeout: true } => {
                write!(f, "Network timeout: {message}")
            }
            ClientError::Network { message, .. } => write!(f, "Network error: {message}"),
            ClientError::Api { status, message } => write!(f, "API error ({status}): {message}"),
            ClientError::Auth(err) => write!(f, "{err}"),
            ClientError::Role(err) => write!(f, "{err}"),
            ClientError::Decode(msg) => write!(f, "Decode error: {msg}"),
            ClientError::Cancelled => write!(f, "Request cancelled"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<AuthError> for ClientError {
    fn from(err: AuthError) -> Self {
        ClientError::Auth(err)
    }
}

impl From<RoleError> for ClientError {
    fn from(err: RoleError) -> Self {
        ClientError::Role(err)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}
