//! Registry - コマンドの登録と id / version の採番
//!
//! # 学習ポイント
//! - 検証と書き込みの分離（失敗した register はテーブルを一切変更しない）
//! - snapshot の replay（`initializing = true`）と新規登録で同じアルゴリズムを使う
//! - rebuild は作業コピーに対して実行し、成功したときだけ commit する
//!
//! # 不変条件
//! - offset は最初の構築時に固定
//! - id と name はそれぞれ一意、一度決まった id / request type は変わらない
//! - 1 回の rebuild で新しい名前が 1 つ以上増えたら version は +1（それ以上は増えない）
//! - 自動採番の id は単調増加で再利用しない

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use super::table::CommandTable;
use crate::domain::{CommandSpec, HandlerRecord, LiveHandler, RegistryOptions, Snapshot, qualify};
use crate::error::DispatchError;
use crate::ports::TypeResolver;

/// Registry はビルド時にコマンドを登録し、snapshot と CommandTable を生成する
///
/// # 使用例
/// ```ignore
/// let mut registry = Registry::new(RegistryOptions::default());
/// registry.attach_resolver(schema)?;
///
/// let mut ns = registry.namespace("example");
/// ns.register("command1", CommandSpec::new("@example/request1"))?;
///
/// let snapshot = registry.to_snapshot();
/// let table = registry.compile();
/// ```
#[derive(Clone)]
pub struct Registry {
    version: u64,
    offset: u64,
    next_id: u64,
    changed: bool,
    table: CommandTable,
    resolver: Option<Arc<dyn TypeResolver>>,
}

impl Registry {
    /// 空の registry を作成（resolver は未設定）
    pub fn new(options: RegistryOptions) -> Self {
        let offset = options.offset.unwrap_or(0);
        Self {
            version: 0,
            offset,
            next_id: offset,
            changed: false,
            table: CommandTable::default(),
            resolver: None,
        }
    }

    /// 永続化済みの snapshot から registry を復元
    ///
    /// 記録済みのコマンドは id / version を固定したまま replay するので、
    /// version も採番カーソルも変化しない。
    pub fn hydrate(
        snapshot: Snapshot,
        options: RegistryOptions,
        resolver: Arc<dyn TypeResolver>,
    ) -> Result<Self, DispatchError> {
        check_offset(snapshot.offset, options.offset)?;

        let mut registry = Self::new(RegistryOptions::with_offset(snapshot.offset));
        registry.attach_resolver(resolver)?;
        registry.version = snapshot.version;

        for record in &snapshot.handlers {
            registry.register_inner(&record.name, CommandSpec::from(record), true)?;
        }

        info!(
            version = registry.version,
            offset = registry.offset,
            handlers = registry.len(),
            "registry hydrated"
        );
        Ok(registry)
    }

    /// TypeResolver を設定（二度目はエラー）
    pub fn attach_resolver(
        &mut self,
        resolver: Arc<dyn TypeResolver>,
    ) -> Result<(), DispatchError> {
        if self.resolver.is_some() {
            return Err(DispatchError::Configuration(
                "a type resolver is already attached".into(),
            ));
        }
        self.resolver = Some(resolver);
        Ok(())
    }

    /// Namespace ハンドルを返す
    pub fn namespace(&mut self, name: impl Into<String>) -> Namespace<'_> {
        Namespace {
            registry: self,
            name: name.into(),
        }
    }

    /// コマンドを登録し、割り当てた id を返す
    pub fn register(&mut self, fq_name: &str, spec: CommandSpec) -> Result<u64, DispatchError> {
        self.register_inner(fq_name, spec, false)
    }

    /// 1 回分の rebuild pass を実行
    ///
    /// - offset が違えば何も変更せずに `OffsetMismatch`
    /// - pass が失敗したら registry は元のまま
    /// - 成功したら新しい snapshot を返す
    pub fn rebuild<F>(&mut self, options: RegistryOptions, pass: F) -> Result<Snapshot, DispatchError>
    where
        F: FnOnce(&mut Registry) -> Result<(), DispatchError>,
    {
        check_offset(self.offset, options.offset)?;

        let mut working = self.clone();
        working.changed = false;
        pass(&mut working)?;

        *self = working;
        Ok(self.to_snapshot())
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            version: self.version,
            offset: self.offset,
            handlers: self.table.iter().map(|h| h.record().clone()).collect(),
        }
    }

    /// Router 用の読み取り専用テーブルを生成
    pub fn compile(&self) -> CommandTable {
        self.table.clone()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// 登録順
    pub fn handlers(&self) -> impl Iterator<Item = &LiveHandler> {
        self.table.iter()
    }

    pub fn get(&self, name: &str) -> Option<&LiveHandler> {
        self.table.get(name)
    }

    pub fn get_by_id(&self, id: u64) -> Option<&LiveHandler> {
        self.table.get_by_id(id)
    }

    fn register_inner(
        &mut self,
        fq_name: &str,
        spec: CommandSpec,
        initializing: bool,
    ) -> Result<u64, DispatchError> {
        // ── 検証（ここまでは一切書き込まない） ──────────────────────────
        let resolver = self.resolver.as_ref().ok_or_else(|| {
            DispatchError::Configuration(
                "a type resolver must be attached before registering handlers".into(),
            )
        })?;

        let by_name = self.table.position_by_name(fq_name);
        let by_id = spec.id.and_then(|id| self.table.position_by_id(id));

        if let (Some(id), Some(owner)) = (spec.id, by_id) {
            if by_name != Some(owner) {
                return Err(DispatchError::IdentityConflict {
                    name: fq_name.to_string(),
                    id,
                });
            }
        }

        if let (Some(position), Some(requested)) = (by_name, spec.id) {
            let assigned = self.table.at(position).id();
            if assigned != requested {
                return Err(DispatchError::ImmutableId {
                    name: fq_name.to_string(),
                    assigned,
                    requested,
                });
            }
        }

        let handle = resolver
            .resolve(&spec.request_type)
            .ok_or_else(|| DispatchError::UnknownType {
                name: fq_name.to_string(),
                request_type: spec.request_type.clone(),
            })?;

        if let Some(position) = by_name {
            if self.table.at(position).handle() != &handle {
                return Err(DispatchError::ImmutableType {
                    name: fq_name.to_string(),
                });
            }
        }

        // ── 書き込み ───────────────────────────────────────────────
        if let Some(position) = by_name {
            let existing = self.table.at_mut(position);
            if let Some(version) = spec.version {
                existing.set_version(version);
            }
            return Ok(existing.id());
        }

        // 採番の失敗もここまでに確定させる（version は動かさない）
        let id = match spec.id {
            Some(id) => id,
            None => self.next_free_id()?,
        };

        if !initializing && !self.changed {
            self.changed = true;
            self.version += 1;
            info!(version = self.version, "registry version bumped");
        }

        // 固定 id・採番どちらでも、その後ろから採番を続ける。
        // u64::MAX を使い切った後は次の next_free_id がエラーになる
        self.next_id = self.next_id.max(id.saturating_add(1));

        let record = HandlerRecord {
            id,
            name: fq_name.to_string(),
            request_type: spec.request_type,
            version: spec.version.unwrap_or(self.version),
        };
        debug!(id, name = %record.name, request_type = %record.request_type, "handler registered");

        self.table.push(LiveHandler::new(record, handle));
        Ok(id)
    }

    /// `next_id` 以降で未使用の最小 id（カーソルは動かさない）
    fn next_free_id(&self) -> Result<u64, DispatchError> {
        let mut id = self.next_id;
        while self.table.contains_id(id) {
            id = id.checked_add(1).ok_or(DispatchError::IdSpaceExhausted)?;
        }
        Ok(id)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("version", &self.version)
            .field("offset", &self.offset)
            .field("next_id", &self.next_id)
            .field("handlers", &self.table.len())
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

fn check_offset(persisted: u64, requested: Option<u64>) -> Result<(), DispatchError> {
    match requested {
        Some(requested) if requested != persisted => {
            Err(DispatchError::OffsetMismatch { persisted, requested })
        }
        _ => Ok(()),
    }
}

/// Namespace は `@<namespace>/<name>` を組み立てて登録するだけのハンドル
pub struct Namespace<'a> {
    registry: &'a mut Registry,
    name: String,
}

impl Namespace<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register(&mut self, name: &str, spec: CommandSpec) -> Result<u64, DispatchError> {
        let fq_name = qualify(&self.name, name);
        self.registry.register(&fq_name, spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::compact::{CompactSchema, FieldKind, StructDef};
    use rstest::rstest;

    fn schema() -> Arc<CompactSchema> {
        let mut schema = CompactSchema::new();
        {
            let mut ns = schema.namespace("test");
            ns.register(
                StructDef::new("request")
                    .field("id", FieldKind::Uint)
                    .field("str", FieldKind::String),
            )
            .unwrap();
            ns.register(StructDef::new("other").field("flag", FieldKind::Bool))
                .unwrap();
        }
        Arc::new(schema)
    }

    fn registry_with(offset: Option<u64>, schema: &Arc<CompactSchema>) -> Registry {
        let mut registry = Registry::new(RegistryOptions { offset });
        registry.attach_resolver(schema.clone()).unwrap();
        registry
    }

    fn ids(registry: &Registry) -> Vec<u64> {
        registry.handlers().map(|h| h.id()).collect()
    }

    #[test]
    fn register_without_resolver_is_configuration_error() {
        let mut registry = Registry::new(RegistryOptions::default());
        let err = registry
            .register("@test/a", CommandSpec::new("@test/request"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Configuration(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn attaching_resolver_twice_fails() {
        let schema = schema();
        let mut registry = registry_with(None, &schema);
        let err = registry.attach_resolver(schema).unwrap_err();
        assert!(matches!(err, DispatchError::Configuration(_)));
    }

    #[rstest]
    #[case(None, [0, 1])]
    #[case(Some(0), [0, 1])]
    #[case(Some(10), [10, 11])]
    fn ids_start_at_offset(#[case] offset: Option<u64>, #[case] expected: [u64; 2]) {
        let schema = schema();
        let mut registry = registry_with(offset, &schema);
        let mut ns = registry.namespace("test");
        ns.register("test-request-1", CommandSpec::new("@test/request"))
            .unwrap();
        ns.register("test-request-2", CommandSpec::new("@test/request"))
            .unwrap();

        assert_eq!(ids(&registry), expected);
        assert_eq!(registry.version(), 1);
    }

    #[test]
    fn version_bumps_once_per_pass() {
        let schema = schema();
        let mut registry = registry_with(None, &schema);

        registry
            .rebuild(RegistryOptions::default(), |r| {
                r.register("@test/a", CommandSpec::new("@test/request"))?;
                r.register("@test/b", CommandSpec::new("@test/request"))?;
                r.register("@test/c", CommandSpec::new("@test/other"))?;
                Ok(())
            })
            .unwrap();
        assert_eq!(registry.version(), 1);

        // 既存の名前だけなら version は変わらない
        registry
            .rebuild(RegistryOptions::default(), |r| {
                r.register("@test/a", CommandSpec::new("@test/request"))?;
                Ok(())
            })
            .unwrap();
        assert_eq!(registry.version(), 1);

        registry
            .rebuild(RegistryOptions::default(), |r| {
                r.register("@test/a", CommandSpec::new("@test/request"))?;
                r.register("@test/d", CommandSpec::new("@test/request"))?;
                r.register("@test/e", CommandSpec::new("@test/request"))?;
                Ok(())
            })
            .unwrap();
        assert_eq!(registry.version(), 2);

        let versions: Vec<_> = registry
            .handlers()
            .map(|h| (h.name().to_string(), h.version()))
            .collect();
        assert_eq!(
            versions,
            [
                ("@test/a".to_string(), 1),
                ("@test/b".to_string(), 1),
                ("@test/c".to_string(), 1),
                ("@test/d".to_string(), 2),
                ("@test/e".to_string(), 2),
            ]
        );
    }

    #[test]
    fn interleaved_namespaces_across_two_passes() {
        let schema = schema();
        let options = RegistryOptions::with_offset(2);
        let mut registry = registry_with(Some(2), &schema);

        registry
            .rebuild(options, |r| {
                r.namespace("test1")
                    .register("a", CommandSpec::new("@test/request"))?;
                r.namespace("test2")
                    .register("b", CommandSpec::new("@test/request"))?;
                Ok(())
            })
            .unwrap();
        assert_eq!(registry.version(), 1);

        // 永続化 → 復元 → 追加
        let snapshot = registry.to_snapshot();
        let mut registry = Registry::hydrate(snapshot, options, schema).unwrap();
        assert_eq!(registry.version(), 1);

        registry
            .rebuild(options, |r| {
                r.namespace("test1")
                    .register("a", CommandSpec::new("@test/request"))?;
                r.namespace("test2")
                    .register("b", CommandSpec::new("@test/request"))?;
                r.namespace("test1")
                    .register("c", CommandSpec::new("@test/request"))?;
                Ok(())
            })
            .unwrap();

        let entries: Vec<_> = registry
            .handlers()
            .map(|h| (h.id(), h.name().to_string(), h.version()))
            .collect();
        assert_eq!(
            entries,
            [
                (2, "@test1/a".to_string(), 1),
                (3, "@test2/b".to_string(), 1),
                (4, "@test1/c".to_string(), 2),
            ]
        );
        assert_eq!(registry.version(), 2);
    }

    #[test]
    fn offset_change_fails_and_leaves_registry_untouched() {
        let schema = schema();
        let mut registry = registry_with(Some(2), &schema);
        registry
            .rebuild(RegistryOptions::with_offset(2), |r| {
                r.register("@test/a", CommandSpec::new("@test/request"))?;
                Ok(())
            })
            .unwrap();
        let before = registry.to_snapshot();

        let err = registry
            .rebuild(RegistryOptions::with_offset(4), |r| {
                r.register("@test/b", CommandSpec::new("@test/request"))?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::OffsetMismatch {
                persisted: 2,
                requested: 4
            }
        ));
        assert_eq!(registry.to_snapshot(), before);
        assert_eq!(registry.offset(), 2);

        let err = Registry::hydrate(before, RegistryOptions::with_offset(4), schema).unwrap_err();
        assert!(matches!(err, DispatchError::OffsetMismatch { .. }));
    }

    #[test]
    fn failed_pass_is_not_committed() {
        let schema = schema();
        let mut registry = registry_with(None, &schema);
        registry
            .register("@test/a", CommandSpec::new("@test/request"))
            .unwrap();
        let before = registry.to_snapshot();

        let err = registry
            .rebuild(RegistryOptions::default(), |r| {
                r.register("@test/b", CommandSpec::new("@test/request"))?;
                r.register("@test/c", CommandSpec::new("@test/missing"))?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnknownType { .. }));
        assert_eq!(registry.to_snapshot(), before);
        assert!(registry.get("@test/b").is_none());
    }

    #[test]
    fn changing_request_type_fails() {
        let schema = schema();
        let mut registry = registry_with(None, &schema);
        registry
            .register("@test/a", CommandSpec::new("@test/request"))
            .unwrap();

        let err = registry
            .register("@test/a", CommandSpec::new("@test/other"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::ImmutableType { .. }));
        assert_eq!(registry.get("@test/a").unwrap().request_type(), "@test/request");
    }

    #[test]
    fn changing_assigned_id_fails() {
        let schema = schema();
        let mut registry = registry_with(None, &schema);
        registry
            .register("@test/a", CommandSpec::new("@test/request"))
            .unwrap();

        let err = registry
            .register("@test/a", CommandSpec::new("@test/request").with_id(5))
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::ImmutableId {
                assigned: 0,
                requested: 5,
                ..
            }
        ));

        // 同じ id を明示するのは問題ない
        let id = registry
            .register("@test/a", CommandSpec::new("@test/request").with_id(0))
            .unwrap();
        assert_eq!(id, 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn id_owned_by_another_name_is_identity_conflict() {
        let schema = schema();
        let mut registry = registry_with(None, &schema);
        registry
            .register("@test/a", CommandSpec::new("@test/request"))
            .unwrap();
        registry
            .register("@test/b", CommandSpec::new("@test/request"))
            .unwrap();

        // 既存の名前 + 他人の id
        let err = registry
            .register("@test/a", CommandSpec::new("@test/request").with_id(1))
            .unwrap_err();
        assert!(matches!(err, DispatchError::IdentityConflict { id: 1, .. }));

        // 新しい名前 + 他人の id
        let err = registry
            .register("@test/c", CommandSpec::new("@test/request").with_id(0))
            .unwrap_err();
        assert!(matches!(err, DispatchError::IdentityConflict { id: 0, .. }));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn pinned_ids_are_never_reused_by_allocation() {
        let schema = schema();
        let mut registry = registry_with(None, &schema);
        registry
            .register("@test/pinned", CommandSpec::new("@test/request").with_id(1))
            .unwrap();
        registry
            .register("@test/a", CommandSpec::new("@test/request"))
            .unwrap();
        registry
            .register("@test/b", CommandSpec::new("@test/request"))
            .unwrap();

        let mut all = ids(&registry);
        assert_eq!(all, [1, 2, 3]);
        all.dedup();
        assert_eq!(all.len(), registry.len());
    }

    #[test]
    fn exhausted_id_space_is_an_error() {
        let schema = schema();
        let mut registry = registry_with(None, &schema);
        registry
            .register("@test/max", CommandSpec::new("@test/request").with_id(u64::MAX))
            .unwrap();
        let version = registry.version();

        let err = registry
            .register("@test/next", CommandSpec::new("@test/request"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::IdSpaceExhausted));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.version(), version);

        // 固定 id なら空いている所に入れられる
        let id = registry
            .register("@test/low", CommandSpec::new("@test/request").with_id(3))
            .unwrap();
        assert_eq!(id, 3);
    }

    #[test]
    fn explicit_version_is_recorded() {
        let schema = schema();
        let mut registry = registry_with(None, &schema);
        registry
            .register("@test/a", CommandSpec::new("@test/request").with_version(7))
            .unwrap();
        assert_eq!(registry.get("@test/a").unwrap().version(), 7);
        assert_eq!(registry.version(), 1);
    }

    #[test]
    fn hydrate_reproduces_the_table() {
        let schema = schema();
        let mut registry = registry_with(Some(3), &schema);
        registry
            .register("@test/a", CommandSpec::new("@test/request"))
            .unwrap();
        registry
            .register("@test/b", CommandSpec::new("@test/other"))
            .unwrap();
        let snapshot = registry.to_snapshot();

        let restored = Registry::hydrate(snapshot.clone(), RegistryOptions::default(), schema).unwrap();
        assert_eq!(restored.to_snapshot(), snapshot);
        assert_eq!(restored.get_by_id(4).unwrap().name(), "@test/b");
    }

    #[test]
    fn superset_rebuilds_keep_ids_and_versions() {
        let schema = schema();
        let names = ["a", "b", "c", "d", "e", "f"];
        let mut snapshot: Option<Snapshot> = None;
        let mut seen: Vec<HandlerRecord> = Vec::new();

        for upto in 1..=names.len() {
            let mut registry = match snapshot.take() {
                Some(s) => Registry::hydrate(s, RegistryOptions::default(), schema.clone()).unwrap(),
                None => registry_with(None, &schema),
            };
            let next = registry
                .rebuild(RegistryOptions::default(), |r| {
                    let mut ns = r.namespace("test");
                    for name in &names[..upto] {
                        ns.register(name, CommandSpec::new("@test/request"))?;
                    }
                    Ok(())
                })
                .unwrap();

            assert_eq!(&next.handlers[..seen.len()], &seen[..]);
            assert_eq!(next.version, upto as u64);
            seen = next.handlers.clone();
            snapshot = Some(next);
        }
    }
}
