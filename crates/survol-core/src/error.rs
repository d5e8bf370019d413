//! Error taxonomy shared by enumerators, builders and transports

/// Errors raised anywhere between request parsing and response rendering.
///
/// `UnsupportedOnPlatform` and `ResourceVanished` are recovered locally
/// (property omitted, instance skipped) and never reach a client.
#[derive(Debug, thiserror::Error)]
pub enum SurvolError {
    #[error("Unknown entity class: {0}")]
    UnknownEntityClass(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Property {property} of {class} is not available on this platform")]
    UnsupportedOnPlatform { class: String, property: String },

    #[error("{class} instance {identifier} vanished during enumeration")]
    ResourceVanished { class: String, identifier: String },

    #[error("Serialization failure: {0}")]
    SerializationFailure(String),

    #[error("Enumeration of {class} failed: {message}")]
    Enumeration { class: String, message: String },

    #[error("Transport startup failure: {0}")]
    TransportStartupFailure(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    /// The listener or a worker failed while serving, after startup.
    #[error("Server error: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, SurvolError>;

impl SurvolError {
    /// HTTP status a transport answers with when this error ends a request.
    pub fn status_code(&self) -> u16 {
        match self {
            SurvolError::UnknownEntityClass(_) | SurvolError::NotFound(_) => 404,
            SurvolError::BadRequest(_) => 400,
            SurvolError::Gateway(_) => 502,
            SurvolError::UnsupportedOnPlatform { .. }
            | SurvolError::ResourceVanished { .. }
            | SurvolError::SerializationFailure(_)
            | SurvolError::Enumeration { .. }
            | SurvolError::TransportStartupFailure(_)
            | SurvolError::Server(_) => 500,
        }
    }

    /// True for the errors an enumeration recovers from without failing the request.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SurvolError::UnsupportedOnPlatform { .. } | SurvolError::ResourceVanished { .. }
        )
    }

    pub fn enumeration(class: &str, message: impl std::fmt::Display) -> Self {
        SurvolError::Enumeration {
            class: class.to_string(),
            message: message.to_string(),
        }
    }
}
