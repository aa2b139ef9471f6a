use std::io;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Failed to bind sender socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read input stream: {0}")]
    Input(io::Error),
    #[error("Failed to encode outgoing datagram: {0}")]
    Codec(#[from] citrine_binary::BinaryError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type TransferResult<T> = std::result::Result<T, TransferError>;
