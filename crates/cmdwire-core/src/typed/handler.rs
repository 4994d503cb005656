//! Handler trait - コマンドを実行する handler の定義
//!
//! # 学習ポイント
//! - Object-safe trait (CommandHandler)
//! - クロージャへの blanket impl（`Fn(Value, C) -> Future`）
//! - Type erasure パターン (TypedHandler<T, H> → CommandHandler)

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde_json::Value;

use super::command::Command;
use crate::error::DispatchError;

/// CommandHandler は Router に格納される object-safe な handler
///
/// decode 済みの request と呼び出し側の context を受け取る。
/// 同期 handler も「すぐ完了する future」として同じ経路を通る。
#[async_trait]
pub trait CommandHandler<C, E = DispatchError>: Send + Sync
where
    C: Send + 'static,
    E: Send + 'static,
{
    async fn handle(&self, request: Value, ctx: C) -> Result<Value, E>;
}

/// `|request, ctx| async move { ... }` をそのまま handler として使える
#[async_trait]
impl<C, E, F, Fut> CommandHandler<C, E> for F
where
    C: Send + 'static,
    E: Send + 'static,
    F: Fn(Value, C) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, E>> + Send + 'static,
{
    async fn handle(&self, request: Value, ctx: C) -> Result<Value, E> {
        (self)(request, ctx).await
    }
}

/// 同期クロージャ用のラッパー
pub struct SyncHandler<F>(F);

impl<F> SyncHandler<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<C, E, F> CommandHandler<C, E> for SyncHandler<F>
where
    C: Send + 'static,
    E: Send + 'static,
    F: Fn(Value, C) -> Result<Value, E> + Send + Sync,
{
    async fn handle(&self, request: Value, ctx: C) -> Result<Value, E> {
        (self.0)(request, ctx)
    }
}

/// Handler は型付きコマンド T を実行する
///
/// # 使用例
/// ```ignore
/// struct Command1Handler;
///
/// #[async_trait]
/// impl Handler<Command1, Session> for Command1Handler {
///     async fn handle(&self, command: Command1, ctx: Session) -> Result<Value, DispatchError> {
///         Ok(json!({ "success": true }))
///     }
/// }
/// ```
///
/// # ジェネリクスによる型安全性
/// - `Handler<Command1, _>` は `Command1` しか受け取れない
/// - fqName は `Command1::NAME` から決まるので typo できない
#[async_trait]
pub trait Handler<T, C, E = DispatchError>: Send + Sync
where
    T: Command,
    C: Send + 'static,
    E: Send + 'static,
{
    async fn handle(&self, command: T, ctx: C) -> Result<Value, E>;
}

pub struct TypedHandler<T, H> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T, H> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T, H, C, E> CommandHandler<C, E> for TypedHandler<T, H>
where
    T: Command,
    H: Handler<T, C, E>,
    C: Send + 'static,
    E: From<DispatchError> + Send + 'static,
{
    async fn handle(&self, request: Value, ctx: C) -> Result<Value, E> {
        let command: T =
            serde_json::from_value(request).map_err(|source| DispatchError::Payload {
                name: T::NAME.to_string(),
                source,
            })?;
        self.handler.handle(command, ctx).await
    }
}
