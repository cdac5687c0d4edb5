use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::borrow::Cow;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Bad Request: {0}")]
    BadRequest(Cow<'static, str>),
    #[error("Not Found: {0}")]
    NotFound(Cow<'static, str>),
    #[error("Conflict: {0}")]
    Conflict(Cow<'static, str>),
    #[error("Upstream Error: {0}")]
    Upstream(Cow<'static, str>),
    #[error("Internal Server Error")]
    InternalServer,
}

#[derive(serde::Serialize)]
pub struct ErrorBody {
    pub error: Cow<'static, str>,
    pub message: Cow<'static, str>,
}

impl Error {
    pub fn bad_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(msg.into())
    }

    fn label(&self) -> &'static str {
        match self {
            Error::BadRequest(_) => "Bad Request",
            Error::NotFound(_) => "Not Found",
            Error::Conflict(_) => "Conflict",
            Error::Upstream(_) => "Upstream request failed",
            Error::InternalServer => "Internal Server Error",
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match *self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Upstream(_) | Error::InternalServer => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            // Has Message
            Error::NotFound(msg)
            | Error::Conflict(msg)
            | Error::BadRequest(msg)
            | Error::Upstream(msg) => msg.clone(),
            // No Message
            Error::InternalServer => "Internal Server Error".into(),
        };

        let body = ErrorBody { error: self.label().into(), message };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SystemError {
    // reqwest errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    // serde errors
    #[error("JSON Serialization/Deserialization Error: {0}")]
    JsonError(#[from] serde_json::Error),
    // base64 errors
    #[error("Base64 Decode Error: {0}")]
    Base64Error(#[from] base64::DecodeError),
    // Custom Errors
    #[error("Bad Request: {0}")]
    BadRequest(Cow<'static, str>),
    #[error("Not Found: {0}")]
    NotFound(Cow<'static, str>),
    #[error("Conflict: {0}")]
    Conflict(Cow<'static, str>),
    #[error("Upstream Error: {0}")]
    Upstream(Cow<'static, str>),
    #[error("Stale revision: {0}")]
    StaleRevision(Cow<'static, str>),
    #[error("Failed to generate a unique short code after {0} attempts")]
    CodeGenerationExhausted(usize),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(Cow<'static, str>),
}

impl From<SystemError> for Error {
    fn from(value: SystemError) -> Self {
        match value {
            SystemError::BadRequest(msg) => Error::BadRequest(msg),
            SystemError::NotFound(msg) => Error::NotFound(msg),
            SystemError::Conflict(msg) => Error::Conflict(msg),
            SystemError::Upstream(msg) => {
                log::error!("Upstream Error: {}", msg);
                Error::Upstream(msg)
            }
            SystemError::HttpClient(err) => {
                log::error!("Upstream HTTP Error: {:?}", err);
                Error::Upstream(err.to_string().into())
            }
            SystemError::StaleRevision(msg) => {
                log::error!("Unresolved revision conflict: {}", msg);
                Error::Upstream(msg)
            }
            _ => {
                log::error!("Internal Server Error: {:?}", value);
                Error::InternalServer
            }
        }
    }
}

impl SystemError {
    pub fn bad_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn upstream(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn invalid_config(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
