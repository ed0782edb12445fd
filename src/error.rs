use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use log::{error, warn};
use mongodb::error::Error as DbError;
use rocket::{http::Status, response::Responder, Request};
use thiserror::Error;

use crate::logging::RequestId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("{0}: {1}")]
    Status(Status, String),
}

impl Error {
    /// A `404 Not Found` for the described resource.
    pub fn not_found(what: String) -> Self {
        Self::Status(Status::NotFound, format!("{what} not found"))
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Status(Status::Unauthorized, msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Status(Status::Forbidden, msg.into())
    }

    /// The HTTP status this error maps to.
    pub fn status(&self) -> Status {
        match self {
            Self::Status(status, _) => *status,
            Self::Db(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                // Our own key or signer is broken.
                JwtErrorKind::InvalidKeyFormat
                | JwtErrorKind::InvalidRsaKey(_)
                | JwtErrorKind::InvalidEcdsaKey
                | JwtErrorKind::RsaFailedSigning
                | JwtErrorKind::Crypto(_) => Status::InternalServerError,
                // Anything wrong with the presented token.
                _ => Status::Unauthorized,
            },
            Self::Argon2(_) => Status::InternalServerError,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        let id = RequestId::of(req);
        match self {
            // Client-facing failures carry their message.
            Self::Status(status, msg) => {
                warn!("req{id} {}: {msg}", req.uri());
                (status, msg).respond_to(req)
            }
            err => {
                if status.code >= 500 {
                    error!("req{id} {}: {err}", req.uri());
                } else {
                    warn!("req{id} {}: {err}", req.uri());
                }
                Err(status)
            }
        }
    }
}
