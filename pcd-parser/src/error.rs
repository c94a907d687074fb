use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Las(#[from] las::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed extra bytes: {0}")]
    ExtraBytes(String),

    #[error("{value} on axis {axis} does not fit the file's scale and offset")]
    CoordinateOutOfRange { axis: usize, value: f64 },
}
