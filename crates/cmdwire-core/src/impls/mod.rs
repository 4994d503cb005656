//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **CompactSchema**: フラットな struct だけを扱う最小の TypeResolver
//!
//! 本番の request type システムは埋め込み側が `TypeResolver` を実装して渡す。

pub mod compact;

pub use self::compact::{CompactSchema, FieldKind, StructDef};
