//! TypeResolver port - request type 名から TypeHandle への解決
//!
//! # 学習ポイント
//! - Object-safe trait (`dyn RequestType`)
//! - `Arc::ptr_eq` による参照同一性での比較

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::codec::CodecError;

/// RequestType は 1 つの request body の encode/decode ロジック
pub trait RequestType: Send + Sync {
    /// 完全修飾名（例: `@example/request1`）
    fn name(&self) -> &str;

    /// `value` を `buf` の末尾に追記
    fn encode(&self, value: &Value, buf: &mut Vec<u8>) -> Result<(), CodecError>;

    /// body 全体を decode（余りがあればエラー）
    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError>;
}

/// TypeHandle は resolver が返す不透明なハンドル
///
/// 等価性は参照同一性。同じ定義を指す handle 同士だけが等しい。
#[derive(Clone)]
pub struct TypeHandle(Arc<dyn RequestType>);

impl TypeHandle {
    pub fn new(request_type: Arc<dyn RequestType>) -> Self {
        Self(request_type)
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn encode(&self, value: &Value, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        self.0.encode(value, buf)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        self.0.decode(bytes)
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TypeHandle {}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeHandle").field(&self.name()).finish()
    }
}

/// TypeResolver は型名から TypeHandle を返す外部コラボレータ
///
/// # Thread Safety
/// - `Send + Sync` を要求（Registry は `Arc<dyn TypeResolver>` で保持する）
pub trait TypeResolver: Send + Sync {
    fn resolve(&self, type_name: &str) -> Option<TypeHandle>;
}
