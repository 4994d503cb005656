//! Typed - handler の定義
//!
//! # 二層構造
//! - **表層（Typed）**: `Command` trait, `Handler<T, C>` trait - 型安全
//! - **内部（Dyn）**: `CommandHandler<C>` trait - object-safe, type erasure
//!
//! Router は内部の `CommandHandler` だけを知っている。

pub mod command;
pub mod handler;

pub use self::command::Command;
pub use self::handler::{CommandHandler, Handler, SyncHandler, TypedHandler};
