//! Router - envelope を handler に振り分ける
//!
//! # 学習ポイント
//! - `HashMap<String, Arc<dyn CommandHandler<C, E>>>` での type erasure
//! - エラー型をジェネリックにして、handler のエラーを包まずにそのまま返す
//!   （decode / lookup の失敗だけ `E: From<DispatchError>` で変換）
//!
//! # 並行性
//! - 起動時に `add` で組み立て（`&mut self`）
//! - 以降は `dispatch(&self)` だけなのでロック不要

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace, warn};

use super::table::CommandTable;
use crate::codec::Envelope;
use crate::error::DispatchError;
use crate::typed::{Command, CommandHandler, Handler, SyncHandler, TypedHandler};

/// Router は fqName ごとに handler を 1 つだけ持つ
///
/// # 使用例
/// ```ignore
/// let mut router: Router<Session> = Router::new(table.clone());
/// router.add("@example/command1", |request, ctx| async move {
///     Ok(json!({ "success": true }))
/// });
///
/// let bytes = table.encode("@example/command1", &json!({ "field1": 42, "field2": "hello" }))?;
/// router.dispatch(&bytes, session).await?;
/// ```
pub struct Router<C, E = DispatchError>
where
    C: Send + 'static,
    E: Send + 'static,
{
    table: Arc<CommandTable>,
    handlers: HashMap<String, Arc<dyn CommandHandler<C, E>>>,
}

impl<C, E> Router<C, E>
where
    C: Send + 'static,
    E: From<DispatchError> + Send + 'static,
{
    pub fn new(table: Arc<CommandTable>) -> Self {
        Self {
            table,
            handlers: HashMap::new(),
        }
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    /// async クロージャを登録
    ///
    /// 同じ名前に二度登録すると後勝ち（エラーにはしない）。
    pub fn add<F, Fut>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(Value, C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
    {
        self.add_handler(name, handler)
    }

    /// 同期クロージャを登録
    pub fn add_sync<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(Value, C) -> Result<Value, E> + Send + Sync + 'static,
    {
        self.add_handler(name, SyncHandler::new(handler))
    }

    /// 型付き handler を `T::NAME` に登録
    pub fn route<T, H>(&mut self, handler: H) -> &mut Self
    where
        T: Command,
        H: Handler<T, C, E> + 'static,
    {
        self.add_handler(T::NAME, TypedHandler::<T, H>::new(handler))
    }

    pub fn add_handler<H>(&mut self, name: impl Into<String>, handler: H) -> &mut Self
    where
        H: CommandHandler<C, E> + 'static,
    {
        let name = name.into();
        if self.table.get(&name).is_none() {
            warn!(name = %name, "binding a handler for a command that is not in the table");
        }
        if self.handlers.insert(name.clone(), Arc::new(handler)).is_some() {
            debug!(name = %name, "handler replaced");
        }
        self
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// envelope を decode して handler を実行
    ///
    /// decode エラーはそのまま返す。handler のエラーも包まずに返す。
    pub async fn dispatch(&self, bytes: &[u8], ctx: C) -> Result<Value, E> {
        let envelope = self.table.decode(bytes)?;
        self.dispatch_envelope(envelope, ctx).await
    }

    /// decode 済みの envelope を実行
    pub async fn dispatch_envelope(&self, envelope: Envelope, ctx: C) -> Result<Value, E> {
        self.dispatch_value(envelope.id, envelope.value, ctx).await
    }

    /// `(id, value)` を実行（decode を別の場所で済ませたとき用）
    pub async fn dispatch_value(&self, id: u64, value: Value, ctx: C) -> Result<Value, E> {
        let handler = self.lookup(id)?;
        trace!(id, "dispatching");
        handler.handle(value, ctx).await
    }

    fn lookup(&self, id: u64) -> Result<&Arc<dyn CommandHandler<C, E>>, DispatchError> {
        let command = self
            .table
            .get_by_id(id)
            .ok_or(DispatchError::HandlerNotFound(id))?;
        self.handlers
            .get(command.name())
            .ok_or(DispatchError::HandlerNotFound(id))
    }
}
