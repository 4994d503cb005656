//! Snapshot - registry の永続化形式
//!
//! ```json
//! { "version": 1, "offset": 0, "handlers": [ { "id": 0, "name": "@ns/cmd", "requestType": "@ns/req", "version": 1 } ] }
//! ```
//!
//! `handlers` の順序は登録順で、意味を持つ（追記のみ）。

use serde::{Deserialize, Serialize};

use super::handler::HandlerRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u64,
    #[serde(default)]
    pub offset: u64,
    /// 古い形式の `schema` キーも読める
    #[serde(alias = "schema")]
    pub handlers: Vec<HandlerRecord>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
