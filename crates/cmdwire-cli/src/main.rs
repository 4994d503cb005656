use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cmdwire_core::impls::{CompactSchema, FieldKind, StructDef};
use cmdwire_core::{Command, CommandSpec, DispatchError, Handler, RegistryOptions, Router, store};

#[derive(Parser, Debug)]
#[command(name = "cmdwire", version, about = "Build a dispatch registry and route a few messages")]
struct Cli {
    /// Directory holding dispatch.json
    #[arg(long, env = "CMDWIRE_DIR", default_value = "./spec/dispatch")]
    dir: PathBuf,

    /// First id of a fresh registry (must match an existing one)
    #[arg(long, env = "CMDWIRE_OFFSET")]
    offset: Option<u64>,
}

/// handler に渡す context
#[derive(Debug, Clone)]
struct Session {
    user: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Command3 {
    field1: String,
    field2: u64,
}

impl Command for Command3 {
    const NAME: &'static str = "@example/command3";
}

struct Command3Handler;

#[async_trait]
impl Handler<Command3, Session> for Command3Handler {
    async fn handle(&self, command: Command3, ctx: Session) -> Result<Value, DispatchError> {
        info!(user = %ctx.user, field1 = %command.field1, field2 = command.field2, "command3 executed");
        Ok(json!({ "success": true }))
    }
}

fn schema() -> Result<CompactSchema> {
    let mut schema = CompactSchema::new();
    let mut ns = schema.namespace("example");
    ns.register(
        StructDef::new("request1")
            .field("field1", FieldKind::Uint)
            .field("field2", FieldKind::String),
    )?;
    ns.register(
        StructDef::new("request2")
            .field("field1", FieldKind::String)
            .field("field2", FieldKind::Uint),
    )?;
    Ok(schema)
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();
    let options = RegistryOptions { offset: cli.offset };

    // (A) registry を開いてコマンドを登録
    let mut registry = store::open(&cli.dir, options, Arc::new(schema()?))
        .with_context(|| format!("opening registry in {}", cli.dir.display()))?;
    registry.rebuild(options, |r| {
        let mut ns = r.namespace("example");
        ns.register("command1", CommandSpec::new("@example/request1"))?;
        ns.register("command2", CommandSpec::new("@example/request1"))?;
        ns.register("command3", CommandSpec::new("@example/request2"))?;
        Ok(())
    })?;

    // (B) dispatch.json に書き出す
    let path = store::save(&cli.dir, &registry)?;
    info!(path = %path.display(), version = registry.version(), "registry saved");

    // (C) Router を組み立てる
    let table = Arc::new(registry.compile());
    let mut router: Router<Session> = Router::new(table.clone());
    router.add("@example/command1", |data, ctx: Session| async move {
        info!(user = %ctx.user, %data, "command1 executed");
        Ok(json!({ "success": true }))
    });
    router.add_sync("@example/command2", |data, ctx: Session| {
        info!(user = %ctx.user, %data, "command2 executed");
        Ok(json!({ "success": true }))
    });
    router.route::<Command3, _>(Command3Handler);

    // (D) encode → dispatch
    let session = Session {
        user: "exampleUser".into(),
    };
    let message1 = table.encode("@example/command1", &json!({ "field1": 42, "field2": "hello" }))?;
    let reply = router.dispatch(&message1, session.clone()).await?;
    info!(%reply, "command1 reply");

    let message2 = table.encode_command(&Command3 {
        field1: "world".into(),
        field2: 99,
    })?;
    let reply = router.dispatch(&message2, session).await?;
    info!(%reply, "command3 reply");

    Ok(())
}
