//! CommandTable - コンパイル済みの id / name テーブル
//!
//! # 設計
//! - LiveHandler は `Vec` に一箇所だけ所有させる（登録順）
//! - `by_name` / `by_id` は Vec の index を持つだけ
//! - Registry がビルド時に組み立て、Router は `Arc<CommandTable>` で読むだけ
//!
//! `encode` / `decode` はこのテーブルに束縛された「自由関数」の役割を持つ。

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::registry::Registry;
use crate::codec::{Envelope, decode_header, encode_header};
use crate::domain::{LiveHandler, RegistryOptions, Snapshot};
use crate::error::DispatchError;
use crate::ports::TypeResolver;
use crate::typed::Command;

#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    handlers: Vec<LiveHandler>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<u64, usize>,
}

impl CommandTable {
    /// 永続化済み snapshot から直接テーブルを作る（サービス起動時用）
    pub fn from_snapshot(
        snapshot: Snapshot,
        resolver: Arc<dyn TypeResolver>,
    ) -> Result<Self, DispatchError> {
        let registry = Registry::hydrate(snapshot, RegistryOptions::default(), resolver)?;
        Ok(registry.compile())
    }

    pub fn get(&self, name: &str) -> Option<&LiveHandler> {
        self.by_name.get(name).map(|&i| &self.handlers[i])
    }

    pub fn get_by_id(&self, id: u64) -> Option<&LiveHandler> {
        self.by_id.get(&id).map(|&i| &self.handlers[i])
    }

    pub fn contains_id(&self, id: u64) -> bool {
        self.by_id.contains_key(&id)
    }

    /// 登録順のイテレータ
    pub fn iter(&self) -> impl Iterator<Item = &LiveHandler> {
        self.handlers.iter()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// `varint(id) ++ body` を返す
    pub fn encode(&self, name: &str, value: &Value) -> Result<Vec<u8>, DispatchError> {
        let handler = self
            .get(name)
            .ok_or_else(|| DispatchError::UnknownCommand(name.to_string()))?;

        let mut buf = Vec::new();
        encode_header(handler.id(), &mut buf);
        handler.handle().encode(value, &mut buf)?;
        Ok(buf)
    }

    /// 型付きコマンドを `T::NAME` で encode
    pub fn encode_command<T: Command>(&self, command: &T) -> Result<Vec<u8>, DispatchError> {
        let value = serde_json::to_value(command).map_err(|source| DispatchError::Payload {
            name: T::NAME.to_string(),
            source,
        })?;
        self.encode(T::NAME, &value)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Envelope, DispatchError> {
        let (id, body) = decode_header(bytes)?;
        let handler = self.get_by_id(id).ok_or(DispatchError::UnknownId(id))?;
        let value = handler.handle().decode(body)?;
        Ok(Envelope {
            id,
            name: handler.name().to_string(),
            value,
        })
    }

    // ────────────────────────────────────────────────────────────────────────
    // Registry からの書き込み（検証は Registry 側で済ませてある前提）
    // ────────────────────────────────────────────────────────────────────────

    pub(crate) fn position_by_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn position_by_id(&self, id: u64) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub(crate) fn at(&self, position: usize) -> &LiveHandler {
        &self.handlers[position]
    }

    pub(crate) fn at_mut(&mut self, position: usize) -> &mut LiveHandler {
        &mut self.handlers[position]
    }

    /// 新しい名前を末尾に追加
    pub(crate) fn push(&mut self, handler: LiveHandler) {
        let position = self.handlers.len();
        self.by_name.insert(handler.name().to_string(), position);
        self.by_id.insert(handler.id(), position);
        self.handlers.push(handler);
    }
}
