//! Shared test support: scratch environments plus the reference output
//! of the schema compiler for the four test schemas. Each schema module
//! is what the compiler emits for its declaration: field constants,
//! extractor functions, the `TableDef`, a typed view, a patch struct,
//! and the operation wrappers.
#![allow(dead_code)]

pub mod person;
pub mod user;

use stratadb::{Environment, TableDef};
use tempfile::TempDir;

/// Opens a fresh environment in a scratch directory. The directory is
/// removed when the returned guard drops.
pub fn open_env(tables: &[&TableDef]) -> (TempDir, Environment) {
    let dir = tempfile::tempdir().expect("failed to create scratch directory");
    let env = Environment::open(dir.path(), tables).expect("failed to open environment");
    (dir, env)
}
