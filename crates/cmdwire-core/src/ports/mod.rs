//! Ports - 抽象化レイヤー
//!
//! request body の型システムは外部コラボレータとして扱い、
//! core は `TypeResolver` / `TypeHandle` 越しにしか触らない。
//!
//! # 実装
//! - 開発・テスト用: `impls::compact::CompactSchema`

pub mod resolver;

pub use self::resolver::{RequestType, TypeHandle, TypeResolver};
