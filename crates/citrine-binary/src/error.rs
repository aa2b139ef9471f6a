use thiserror::Error;

#[derive(Error, Debug)]
pub enum BinaryError {
    #[error("Buffer ended unexpectedly: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type BinaryResult<T> = std::result::Result<T, BinaryError>;
