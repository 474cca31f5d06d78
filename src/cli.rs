//! Command dispatch for fixture-generating binaries.
//!
//! Applications own the binary and its flags; this module only recognizes the
//! subcommand and runs the generator.

use std::path::PathBuf;

use crate::entities::HookError;
use crate::errors::{ProxyError, ProxyResult};
use crate::fixtures::{self, FixturesRepository};
use crate::value::Value;

pub const GENERATE_FIXTURES: &str = "generate-fixtures";

/// What `generate-fixtures` writes, and where.
pub struct CliOptions<'a, P> {
    pub file_path: PathBuf,
    pub producer: P,
    pub repository: &'a dyn FixturesRepository,
}

/// Run the subcommand named by the first of `args` (program name excluded).
pub fn run<I, S, P>(args: I, options: CliOptions<'_, P>) -> ProxyResult<()>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    P: FnOnce() -> Result<Value, HookError>,
{
    let command: Option<String> = args.into_iter().next().map(Into::into);
    match command.as_deref() {
        Some(GENERATE_FIXTURES) => {
            fixtures::generate(&options.file_path, options.producer, options.repository)?;
            Ok(())
        }
        other => Err(ProxyError::UnknownCommand {
            command: other.unwrap_or("<none>").to_string(),
        }),
    }
}
