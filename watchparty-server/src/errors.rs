use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use watchparty_collab::{DatabaseError, PartyError};

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound {
                resource: _,
                identifier: _,
            } => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.as_status_code(), self.to_string()).into_response()
    }
}

impl From<PartyError> for ServerError {
    fn from(value: PartyError) -> Self {
        match value {
            PartyError::InvalidName
            | PartyError::InvalidVideoUrl
            | PartyError::PartyInactive
            | PartyError::CannotTargetSelf
            | PartyError::EmptyMessage
            | PartyError::EmptyReaction
            | PartyError::MessageTooLong => Self::BadRequest(value.to_string()),
            PartyError::NotAMember | PartyError::AdminRequired | PartyError::PrivateParty => {
                Self::Forbidden(value.to_string())
            }
            PartyError::AlreadyMember | PartyError::RequestAlreadyResolved => {
                Self::Conflict(value.to_string())
            }
            PartyError::RequestNotFound => Self::NotFound {
                resource: "join request",
                identifier: "id",
            },
            PartyError::Database(e) => e.into(),
        }
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            DatabaseError::Conflict {
                resource: _,
                field: _,
                value: _,
            } => Self::Conflict(value.to_string()),
            e => Self::Unknown(e.to_string()),
        }
    }
}
