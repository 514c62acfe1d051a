use core::convert::Infallible;

use campus_events_client::ApiError;
use campus_events_config::ConfigError;
use http::StatusCode;
use tracing::{error, warn};

#[derive(thiserror::Error, Debug)]
pub enum FrontendError {
    #[error("IO error: {0}")]
    File(#[from] std::io::Error),
    #[error("webserver error: {0}")]
    Hyper(#[from] hyper::Error),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("http error: {0}")]
    Http(#[from] http::Error),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("template error: {0}")]
    Template(String),
    #[error("render error: {0}")]
    Render(#[from] Box<handlebars::RenderError>),
    #[error("Invalid form data: {0}")]
    Form(#[from] serde_urlencoded::de::Error),
    #[error("Failed to read request body: {0}")]
    Body(String),
    #[error("Your session expired, please submit the form again.")]
    WrongCsrfToken,
    #[error("Invalid {name}: {value:?}")]
    InvalidParameter { name: &'static str, value: String },
    #[error("Page not found")]
    NotFound,
    #[error("Method Not Allowed")]
    MethodNotAllowed,
}

impl From<Infallible> for FrontendError {
    fn from(value: Infallible) -> Self {
        match value {}
    }
}

impl From<handlebars::RenderError> for FrontendError {
    fn from(value: handlebars::RenderError) -> Self {
        Self::Render(Box::new(value))
    }
}

impl FrontendError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Api(ApiError::NotFound { .. }) | Self::NotFound => StatusCode::NOT_FOUND,
            Self::Api(ApiError::TimedOut(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Api(_) => StatusCode::BAD_GATEWAY,
            Self::Form(_) | Self::Body(_) | Self::InvalidParameter { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::WrongCsrfToken => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::File(_)
            | Self::Hyper(_)
            | Self::Config(_)
            | Self::Http(_)
            | Self::Template(_)
            | Self::Render(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text shown on the error page. Internal failures are not leaked.
    #[must_use]
    pub fn message(&self) -> String {
        if self.status() == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal Server Error".to_owned()
        } else {
            self.to_string()
        }
    }

    pub fn log(&self) {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), "request failed: {self}");
        } else {
            warn!(status = status.as_u16(), "request rejected: {self}");
        }
    }
}
