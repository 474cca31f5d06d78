use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use proxy_snapshots::cli::{self, CliOptions};
use proxy_snapshots::{FixturesFile, HookError, ProxyConfig, ProxyResult, Value};
use proxy_snapshots_counter::fixtures::{build_fixtures, FIXTURES_FILE};
use proxy_snapshots_counter::get_app_repositories;
use proxy_snapshots_counter::testing::configured_serializer;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "PROXY_SNAPSHOTS_LOG";

fn run() -> ProxyResult<()> {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let config = ProxyConfig::from_project_root(&root)?;
    let repository = FixturesFile::new(Arc::new(configured_serializer(&config)), config);
    cli::run(
        std::env::args().skip(1),
        CliOptions {
            file_path: root.join(FIXTURES_FILE),
            producer: || -> Result<Value, HookError> {
                Ok(build_fixtures(&get_app_repositories())?)
            },
            repository: &repository,
        },
    )
}

fn main() -> ExitCode {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
        tracing::debug!("tracing initialized");
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
