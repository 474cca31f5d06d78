//! Fixture files: a value produced by the application, serialized as a
//! source module that tests can load back.
//!
//! ```text
//! import { modules as _modules } from "./testing";
//!
//! const fixtures = { counter: { id1: _modules.Counter.create({ id: "1", value: 0 }) } };
//!
//! export default fixtures;
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ProxyConfig;
use crate::entities::HookError;
use crate::errors::{ProxyError, ProxyResult};
use crate::formatter::format_source;
use crate::serializer::Serializer;
use crate::source::SourceModule;
use crate::store::{import_specifier, quoted};
use crate::value::Value;

/// Somewhere fixtures can be written to.
pub trait FixturesRepository {
    fn save(&self, file_path: &Path, fixtures: &Value) -> ProxyResult<()>;
}

/// Writes fixtures as formatted source files.
#[derive(Debug, Clone)]
pub struct FixturesFile {
    serializer: Arc<Serializer>,
    config: ProxyConfig,
}

impl FixturesFile {
    pub fn new(serializer: Arc<Serializer>, config: ProxyConfig) -> Self {
        Self { serializer, config }
    }

    /// Source text for a fixtures file at `file_path`.
    pub fn render(&self, file_path: &Path, fixtures: &Value) -> ProxyResult<String> {
        let root = self.config.project_root()?;
        let dir = file_path.parent().unwrap_or_else(|| Path::new("."));
        let modules = self.serializer.modules_import();
        let source = format!(
            "import {{ {} as {} }} from {};\n\nconst fixtures = {};\n\nexport default fixtures;\n",
            modules.name,
            self.serializer.modules_ref(),
            quoted(&import_specifier(&root, dir, &modules.path)),
            self.serializer.serialize(fixtures)?,
        );
        format_source(&source, &self.config.format)
    }
}

impl FixturesRepository for FixturesFile {
    fn save(&self, file_path: &Path, fixtures: &Value) -> ProxyResult<()> {
        let contents = self.render(file_path, fixtures)?;
        let path = if file_path.is_absolute() {
            file_path.to_path_buf()
        } else {
            self.config.project_root()?.join(file_path)
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ProxyError::io(parent, e))?;
        }
        fs::write(&path, contents).map_err(|e| ProxyError::io(&path, e))?;
        info!(path = %path.display(), "wrote fixtures");
        Ok(())
    }
}

/// Run `producer` and save its value to `file_path`.
pub fn generate<P>(
    file_path: &Path,
    producer: P,
    repository: &dyn FixturesRepository,
) -> ProxyResult<Value>
where
    P: FnOnce() -> Result<Value, HookError>,
{
    debug!(path = %file_path.display(), "producing fixtures");
    let fixtures = producer().map_err(|e| ProxyError::Producer {
        message: e.to_string(),
    })?;
    repository.save(file_path, &fixtures)?;
    Ok(fixtures)
}

/// Read a fixtures file back into the value it was generated from.
pub fn load_fixtures(path: &Path, serializer: &Serializer) -> ProxyResult<Value> {
    SourceModule::read(path)?.default_value(serializer)
}
