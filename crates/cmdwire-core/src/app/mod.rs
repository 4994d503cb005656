//! App - registry とランタイム
//!
//! # 主要コンポーネント
//! - **Registry**: ビルド時のコマンド登録、id / version の採番
//! - **CommandTable**: コンパイル済みの読み取り専用テーブル（encode / decode）
//! - **Router**: envelope を handler に振り分ける
//! - **store**: `dispatch.json` の読み書き

pub mod registry;
pub mod router;
pub mod store;
pub mod table;

pub use self::registry::{Namespace, Registry};
pub use self::router::Router;
pub use self::table::CommandTable;
