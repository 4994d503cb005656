//! cmdwire-core
//!
//! 名前付きコマンドを安定した数値 id に割り当て、
//! `[varint id][body]` のバイナリ envelope で dispatch するためのライブラリ。
//!
//! # モジュール構成
//! - **domain**: HandlerRecord, LiveHandler, Snapshot, RegistryOptions
//! - **ports**: TypeResolver / TypeHandle（request body の型システムとの境界）
//! - **codec**: varint と envelope ヘッダ
//! - **app**: Registry, CommandTable, Router, store
//! - **typed**: Command trait, Handler trait, CommandHandler（type erasure）
//! - **impls**: CompactSchema（開発・テスト用の TypeResolver）
//!
//! # 流れ
//! 1. ビルド時: `Registry` にコマンドを登録し、`store::save` で snapshot を保存
//! 2. 起動時: snapshot から `CommandTable` を作り、`Router` に handler を登録
//! 3. 実行時: `Router::dispatch(bytes, ctx)`

pub mod app;
pub mod codec;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod typed;

pub use app::{CommandTable, Namespace, Registry, Router, store};
pub use codec::Envelope;
pub use domain::{CommandSpec, HandlerRecord, LiveHandler, RegistryOptions, Snapshot};
pub use error::DispatchError;
pub use ports::{RequestType, TypeHandle, TypeResolver};
pub use typed::{Command, CommandHandler, Handler};
