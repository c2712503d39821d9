use std::fmt::Display;

use argon2::Error as Argon2Error;
use mongodb::{bson::ser::Error as BsonError, error::Error as DbError};
use rocket::{
    http::Status,
    tokio::task::JoinError,
    response::{self, Responder},
    serde::json::Json,
    Catcher, Request,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Bson(#[from] BsonError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error(transparent)]
    Task(#[from] JoinError),
    #[error("Store did not answer within {0} seconds")]
    Timeout(u64),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    /// Malformed or missing input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Status(Status::Unauthorized, message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Status(Status::Forbidden, message.into())
    }

    pub fn not_found(what: impl Display) -> Self {
        Self::Status(Status::NotFound, format!("{what} not found"))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Status(Status::Conflict, message.into())
    }

    /// The HTTP status this error maps to.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Bson(_) | Self::Argon2(_) | Self::Task(_) => {
                Status::InternalServerError
            }
            Self::Timeout(_) => Status::ServiceUnavailable,
            Self::Status(status, _) => *status,
        }
    }
}

/// The JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        // Store and hashing failures are logged in full but never shown to the caller.
        let message = match self {
            Self::Status(_, message) => message,
            Self::Timeout(_) => {
                warn!("{self}");
                "store unavailable".to_string()
            }
            other => {
                error!("{other}");
                "internal error".to_string()
            }
        };
        (status, Json(ErrorBody::new(message))).respond_to(req)
    }
}

pub fn catchers() -> Vec<Catcher> {
    catchers![bad_request, unprocessable, not_found, too_many_requests, default_catcher]
}

#[catch(400)]
fn bad_request() -> Json<ErrorBody> {
    Json(ErrorBody::new("invalid request"))
}

/// Rocket answers 422 for well-formed JSON of the wrong shape; treat it like any other bad input.
#[catch(422)]
fn unprocessable() -> (Status, Json<ErrorBody>) {
    (Status::BadRequest, Json(ErrorBody::new("invalid request")))
}

#[catch(404)]
fn not_found() -> Json<ErrorBody> {
    Json(ErrorBody::new("not found"))
}

#[catch(429)]
fn too_many_requests() -> Json<ErrorBody> {
    Json(ErrorBody::new("too many requests"))
}

#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> (Status, Json<ErrorBody>) {
    let reason = status.reason().unwrap_or("request failed").to_lowercase();
    (status, Json(ErrorBody::new(reason)))
}
