//! RegistryOptions - registry の設定

use serde::{Deserialize, Serialize};

/// Registry の構築オプション
///
/// 埋め込み側のアプリが自前の設定ファイルから読めるよう Deserialize できる。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryOptions {
    /// 新規 registry の最初の id。既存 registry と違う値を渡すとエラー
    #[serde(default)]
    pub offset: Option<u64>,
}

impl RegistryOptions {
    pub fn with_offset(offset: u64) -> Self {
        Self {
            offset: Some(offset),
        }
    }
}
