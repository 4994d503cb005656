//! Store - registry の読み書き（`<dir>/dispatch.json`）

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use super::registry::Registry;
use crate::domain::{RegistryOptions, Snapshot};
use crate::error::DispatchError;
use crate::ports::TypeResolver;

pub const SNAPSHOT_FILE_NAME: &str = "dispatch.json";

pub fn snapshot_path(dir: &Path) -> PathBuf {
    dir.join(SNAPSHOT_FILE_NAME)
}

/// snapshot を読む。ファイルが無ければ None
pub fn load_snapshot(dir: &Path) -> Result<Option<Snapshot>, DispatchError> {
    let path = snapshot_path(dir);
    let json = match fs::read_to_string(&path) {
        Ok(json) => json,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let snapshot = Snapshot::from_json(&json)?;
    info!(path = %path.display(), version = snapshot.version, "snapshot loaded");
    Ok(Some(snapshot))
}

/// `dir` に snapshot があれば復元、無ければ新しい registry を作る
///
/// どちらの場合も resolver は設定済み。offset が食い違えば `OffsetMismatch`。
pub fn open(
    dir: &Path,
    options: RegistryOptions,
    resolver: Arc<dyn TypeResolver>,
) -> Result<Registry, DispatchError> {
    match load_snapshot(dir)? {
        Some(snapshot) => Registry::hydrate(snapshot, options, resolver),
        None => {
            let mut registry = Registry::new(options);
            registry.attach_resolver(resolver)?;
            Ok(registry)
        }
    }
}

/// registry の snapshot を pretty JSON で書き出す
pub fn save(dir: &Path, registry: &Registry) -> Result<PathBuf, DispatchError> {
    fs::create_dir_all(dir)?;
    let path = snapshot_path(dir);
    let snapshot = registry.to_snapshot();
    fs::write(&path, snapshot.to_json_pretty()?)?;
    info!(path = %path.display(), version = snapshot.version, "snapshot written");
    Ok(path)
}
