use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the client.
///
/// `Transport` carries the provider's message verbatim; nothing is retried
/// internally, every failure propagates to the immediate caller. `Encode`
/// errors are raised before any network call is made, `Decode` errors after
/// the call succeeded but the returned bytes did not match the expected
/// output shape.
#[derive(Error, Debug)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("abi error: {0}")]
    Abi(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}
