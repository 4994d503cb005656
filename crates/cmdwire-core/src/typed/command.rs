//! Command trait - 型付きコマンドの定義
//!
//! # 学習ポイント
//! - Associated Constants (`const NAME`)
//! - Trait bounds の組み合わせ (Serialize + DeserializeOwned + Send + Sync + 'static)

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Command は完全修飾名と request の型を対応付ける
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Command1 {
///     field1: u64,
///     field2: String,
/// }
///
/// impl Command for Command1 {
///     const NAME: &'static str = "@example/command1";
/// }
/// ```
///
/// # Trait Bounds
/// - `Serialize`: encode_command() で Value に変換するため
/// - `DeserializeOwned`: decode 済みの Value から復元するため
/// - `Send + Sync + 'static`: Router に格納した handler から使うため
pub trait Command: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Registry に登録した fqName（`@namespace/name`）
    const NAME: &'static str;
}
