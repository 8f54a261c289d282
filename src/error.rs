use thiserror::Error;

pub use color_eyre::eyre::eyre;

use crate::protocol::response::ErrPayload;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // ─── Server Error ────────────────────────────────────────────────────
    #[error("Server Error: {0}")]
    ServerError(#[from] ErrPayload),
    // ─── Frame Error ─────────────────────────────────────────────────────
    #[error("unexpected end of packet")]
    UnexpectedEof,
    #[error("malformed frame: {0}")]
    MalformedFrame(&'static str),
    // ─── Incorrect Usage ─────────────────────────────────────────────────
    #[error("Bad usage error: {0}")]
    BadUsageError(String),
    // ─── Library Error ───────────────────────────────────────────────────
    #[error("A bug in mysql-wire: {0}")]
    LibraryBug(#[from] color_eyre::Report),
}

impl From<core::convert::Infallible> for Error {
    fn from(err: core::convert::Infallible) -> Self {
        match err {}
    }
}

impl Error {
    pub fn from_debug(err: impl std::fmt::Debug) -> Self {
        Self::LibraryBug(color_eyre::eyre::eyre!(format!("{:#?}", err)))
    }
}

impl<Src, Dst: ?Sized> From<zerocopy::CastError<Src, Dst>> for Error {
    fn from(err: zerocopy::CastError<Src, Dst>) -> Self {
        Self::LibraryBug(color_eyre::eyre::eyre!("{:#?}", err))
    }
}
