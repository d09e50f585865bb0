pub mod password;
pub mod token;

pub use password::*;
pub use token::*;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Stored password hash is malformed")]
    MalformedHash,

    #[error("Token is malformed or its signature does not match")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}
