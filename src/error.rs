use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("peer {peer} answered with status {status}")]
    PeerStatus {
        peer: String,
        status: reqwest::StatusCode,
    },

    #[error("could not determine self address: {0}")]
    AddressDiscovery(String),
}
