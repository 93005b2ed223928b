use actix_web::{http::StatusCode, HttpResponse};
use serde::Serialize;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Invalid service account {identity}: {message}"))]
    InvalidIdentity { identity: String, message: String },

    #[snafu(display("Invalid parameter: {message}"))]
    InvalidParameter { message: String },

    #[snafu(display("Missing parameter: {message}"))]
    MissingParameter { message: String },

    #[snafu(display("Resource not found: {resource}"))]
    NotFound { resource: String },

    #[snafu(display("{service} returned {status}: {message}"))]
    Upstream {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[snafu(display("Error sending request to {service}"))]
    Http {
        service: &'static str,
        #[snafu(source)]
        source: reqwest::Error,
    },

    #[snafu(display("Secret {secret} has no enabled latest version"))]
    NoLatestVersion { secret: String },

    #[snafu(display("Malformed credential: {message}"))]
    MalformedCredential { message: String },

    #[snafu(display("Internal server error"))]
    InternalServerError {
        #[snafu(source(false))]
        source: Option<eyre::Report>,
    },
}

impl From<eyre::Report> for Error {
    fn from(e: eyre::Report) -> Self {
        Self::InternalServerError { source: Some(e) }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedCredential {
            message: e.to_string(),
        }
    }
}

impl Error {
    pub fn internal(e: impl Into<eyre::Report>) -> Self {
        Self::InternalServerError {
            source: Some(e.into()),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn invalid_identity(identity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidIdentity {
            identity: identity.into(),
            message: message.into(),
        }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    pub fn missing_parameter(message: impl Into<String>) -> Self {
        Self::MissingParameter {
            message: message.into(),
        }
    }

    pub fn malformed_credential(message: impl Into<String>) -> Self {
        Self::MalformedCredential {
            message: message.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl actix_web::ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingParameter { .. } | Self::InvalidParameter { .. } => {
                StatusCode::BAD_REQUEST
            }

            // Anything raised while rotating is reported as a server error,
            // including malformed identities inside an otherwise valid request.
            Self::InvalidIdentity { .. }
            | Self::NotFound { .. }
            | Self::Upstream { .. }
            | Self::Http { .. }
            | Self::NoLatestVersion { .. }
            | Self::MalformedCredential { .. }
            | Self::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
