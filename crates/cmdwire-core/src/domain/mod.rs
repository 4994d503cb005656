//! Domain model (handler records, snapshots, options).

pub mod handler;
pub mod options;
pub mod snapshot;

pub use self::handler::{CommandSpec, HandlerRecord, LiveHandler, qualify};
pub use self::options::RegistryOptions;
pub use self::snapshot::Snapshot;
