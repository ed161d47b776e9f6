// Error taxonomy shared by the fractal modules

pub type Result<T> = std::result::Result<T, FractalError>;

#[derive(thiserror::Error, Debug)]
pub enum FractalError {
    /// Complex division where the divisor has zero magnitude.
    #[error("division by zero")]
    DivisionByZero,

    /// A precondition of an operation was violated.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The job file contained an unusable value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("couldn't write image: {0}")]
    Image(#[from] image::ImageError),

    #[error("couldn't parse input: {0}")]
    Json(#[from] json::Error),
}

impl FractalError {
    pub fn invalid_argument(msg : impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn invalid_config(msg : impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
