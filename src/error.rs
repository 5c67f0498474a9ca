use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid beat time {beat}:{num}/{den}: denominator must be positive")]
    BadDenominator { beat: i32, num: i32, den: i32 },

    #[error("Track {0} not found")]
    TrackNotFound(usize),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
