use mongodb::error::{Error as DBError, ErrorKind as DBErrorKind, WriteFailure};
use openssl::error::ErrorStack;
use reqwest::StatusCode;

const DUPLICATE_KEY: i32 = 11000;
const NAMESPACE_EXISTS: i32 = 48;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Duplicate(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidKey(String),
    #[error("{0}")]
    ServerError(String),
    #[error("{message}")]
    Unknown { status: u16, message: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    #[error("io error :: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error :: {0}")]
    DbError(DBError),
    #[error("http error :: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("crypto error :: {0}")]
    CryptoError(#[from] ErrorStack),
    #[error("malformed payload :: {0}")]
    Encoding(String),
    #[error("json error :: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error :: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn encoding(msg: impl ToString) -> Self {
        Self::Encoding(msg.to_string())
    }

    /// Folds driver failures that have a server-side meaning into the shared taxonomy.
    pub fn from_db(e: DBError) -> Self {
        match e.kind.as_ref() {
            DBErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY => {
                Error::Duplicate(write.message.clone())
            }
            DBErrorKind::Command(command)
                if command.code == DUPLICATE_KEY || command.code == NAMESPACE_EXISTS =>
            {
                Error::Duplicate(command.message.clone())
            }
            DBErrorKind::Authentication { message, .. } => Error::InvalidKey(message.clone()),
            _ => Error::DbError(e),
        }
    }

    /// Status code that produced this error, for errors raised from a server response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::BadRequest(_) => Some(400),
            Error::InvalidKey(_) => Some(401),
            Error::NotFound(_) => Some(404),
            Error::ServerError(_) => Some(500),
            Error::Unknown { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<DBError> for Error {
    fn from(e: DBError) -> Self {
        Error::from_db(e)
    }
}

// Status code table for AsterDB server replies
pub fn error_for_status(status: StatusCode) -> Option<Error> {
    let error = match status.as_u16() {
        200 => return None,
        400 => Error::BadRequest("Bad Request.".to_string()),
        401 => Error::InvalidKey("The private key is invalid.".to_string()),
        404 => Error::NotFound("The query returned no results.".to_string()),
        500 => Error::ServerError("The server encountered an error.".to_string()),
        code => Error::Unknown {
            status: code,
            message: format!("The server encountered an unknown error: HTTP {}", code),
        },
    };
    tracing::warn!(status = status.as_u16(), "server rejected request: {}", error);
    Some(error)
}
