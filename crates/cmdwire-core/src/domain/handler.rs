//! HandlerRecord / LiveHandler - コマンド定義
//!
//! # 二層構造
//! - **HandlerRecord**: 永続化される形（id, name, requestType, version）
//! - **LiveHandler**: HandlerRecord + 解決済み TypeHandle（メモリ上のみ）

use serde::{Deserialize, Serialize};

use crate::ports::TypeHandle;

/// `@<namespace>/<name>` を組み立てる
pub fn qualify(namespace: &str, name: &str) -> String {
    format!("@{namespace}/{name}")
}

/// 永続化されるコマンド定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerRecord {
    pub id: u64,
    pub name: String,
    #[serde(rename = "requestType")]
    pub request_type: String,
    /// このコマンドが初めて登録された registry version
    pub version: u64,
}

/// 解決済みの TypeHandle を持つコマンド定義
///
/// TypeHandle は serialize しない。ロード時に resolver で再解決する。
#[derive(Debug, Clone)]
pub struct LiveHandler {
    record: HandlerRecord,
    handle: TypeHandle,
}

impl LiveHandler {
    pub(crate) fn new(record: HandlerRecord, handle: TypeHandle) -> Self {
        Self { record, handle }
    }

    pub fn id(&self) -> u64 {
        self.record.id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn request_type(&self) -> &str {
        &self.record.request_type
    }

    pub fn version(&self) -> u64 {
        self.record.version
    }

    pub fn handle(&self) -> &TypeHandle {
        &self.handle
    }

    pub fn record(&self) -> &HandlerRecord {
        &self.record
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.record.version = version;
    }
}

/// register() に渡すコマンドの記述
///
/// # 使用例
/// ```ignore
/// registry.register("@example/command1", CommandSpec::new("@example/request1"))?;
/// registry.register("@example/command2", CommandSpec::new("@example/request1").with_id(7))?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub request_type: String,
    /// 固定したい id（省略時は自動採番）
    pub id: Option<u64>,
    /// 固定したい introduced version（省略時は現在の registry version）
    pub version: Option<u64>,
}

impl CommandSpec {
    pub fn new(request_type: impl Into<String>) -> Self {
        Self {
            request_type: request_type.into(),
            id: None,
            version: None,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }
}

impl From<&HandlerRecord> for CommandSpec {
    /// 永続化済みの定義を replay するときは id と version を固定する
    fn from(record: &HandlerRecord) -> Self {
        Self::new(record.request_type.clone())
            .with_id(record.id)
            .with_version(record.version)
    }
}
