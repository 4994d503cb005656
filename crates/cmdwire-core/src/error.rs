use thiserror::Error;

use crate::codec::{CodecError, VarintError};

/// DispatchError は registry / codec / router の全エラー
///
/// Handler 自身が返すエラーはここに含めない（Router がそのまま返す）。
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("ID/Name mismatch for handler: {name} (id={id})")]
    IdentityConflict { name: String, id: u64 },

    #[error("cannot change the assigned ID for handler: {name} (assigned={assigned}, requested={requested})")]
    ImmutableId {
        name: String,
        assigned: u64,
        requested: u64,
    },

    #[error("cannot alter the request type for handler: {name}")]
    ImmutableType { name: String },

    #[error("invalid request type '{request_type}' for handler: {name}")]
    UnknownType { name: String, request_type: String },

    #[error("offset mismatch: persisted={persisted}, requested={requested}")]
    OffsetMismatch { persisted: u64, requested: u64 },

    #[error("id space exhausted: no free ID after the highest assigned one")]
    IdSpaceExhausted,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[from] VarintError),

    #[error("Handler not found for ID:{0}")]
    UnknownId(u64),

    #[error("Handler not found for ID:{0}")]
    HandlerNotFound(u64),

    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    #[error("payload does not match command {name}: {source}")]
    Payload {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl DispatchError {
    /// 「その ID の handler が無い」系か（UnknownId / HandlerNotFound）
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownId(_) | Self::HandlerNotFound(_))
    }
}
