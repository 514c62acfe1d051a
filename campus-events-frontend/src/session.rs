use cookie::{Cookie, SameSite};
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderValue, Request};
use rand::{thread_rng, Rng as _};
use tracing::{debug, error};

use crate::error::FrontendError;

const COOKIE_NAME_SESSION: &str = "campus_events_session";
const TOKEN_LENGTH: usize = 30;

/// Browser session. The random token keys the server side [`crate::state::AppState`]
/// and doubles as CSRF token that every form post has to echo back.
#[derive(Clone, Debug)]
#[must_use]
pub struct Session {
    // bool is true when the cookie still has to be sent
    token: (String, bool),
}

impl Session {
    pub fn new<T>(request: &Request<T>) -> Self {
        let token = request
            .headers()
            .get_all(COOKIE)
            .into_iter()
            .filter_map(|value| value.to_str().ok())
            .map(std::borrow::ToOwned::to_owned)
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == COOKIE_NAME_SESSION)
            .map(|cookie| cookie.value().to_owned())
            .filter(|value| {
                value.len() == TOKEN_LENGTH && value.chars().all(|c| c.is_ascii_alphanumeric())
            });
        token.map_or_else(
            || {
                debug!("starting a new session");
                Self::fresh()
            },
            |token| Self {
                token: (token, false),
            },
        )
    }

    fn fresh() -> Self {
        Self {
            token: (
                thread_rng()
                    .sample_iter(&rand::distributions::Alphanumeric)
                    .take(TOKEN_LENGTH)
                    .map(char::from)
                    .collect(),
                true,
            ),
        }
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token.0
    }

    /// Form posts of a session that was just created can not carry the right token.
    pub fn verify(&self, submitted: &str) -> Result<(), FrontendError> {
        if self.token.1 || submitted != self.token.0 {
            return Err(FrontendError::WrongCsrfToken);
        }
        Ok(())
    }
}

pub trait ResponseSessionExt {
    #[must_use]
    fn with_session(self, session: &Session) -> Self;
}

impl ResponseSessionExt for http::response::Builder {
    fn with_session(self, session: &Session) -> Self {
        let (value, true) = &session.token else {
            return self;
        };
        let cookie = Cookie::build((COOKIE_NAME_SESSION, value.as_str()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .build();
        match HeaderValue::try_from(cookie.to_string()) {
            Ok(header) => self.header(SET_COOKIE, header),
            Err(err) => {
                error!("failed to encode session cookie: {err}");
                self
            }
        }
    }
}
