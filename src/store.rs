//! Snapshot files on disk.
//!
//! Each `(test, proxied type)` pair owns one generated source file under a
//! snapshots directory beside the test file. [`SnapshotStore::get`] loads it
//! back into a [`Snapshot`], deleting files that no longer load, and
//! [`SnapshotStore::render_expectation`] produces the text the file should
//! contain after a test run.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error};

use crate::accessor;
use crate::config::ProxyConfig;
use crate::entities::{Call, CurrentTest, Snapshot, SymbolImport};
use crate::errors::{ProxyError, ProxyResult};
use crate::formatter::format_source;
use crate::serializer::Serializer;
use crate::source::SourceModule;
use crate::value::Value;

static TEST_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\.(test|spec))?\.(rs|tsx?)$").expect("valid suffix regex"));
static SOURCE_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(rs|tsx?)$").expect("valid extension regex"));
static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[/?<>\\:*|"\x00-\x1f\x80-\x9f]"#).expect("valid unsafe-character regex")
});
static RESERVED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(con|prn|aux|nul|com[0-9]|lpt[0-9])(\..*)?$").expect("valid reserved regex")
});
static TRAILING_DOTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[. ]+$").expect("valid trailing regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

const MAX_FILE_NAME: usize = 255;

/// Rendered contents for one snapshot file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    pub path: PathBuf,
    pub contents: String,
}

/// Loads and renders snapshot files.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    serializer: Arc<Serializer>,
    config: ProxyConfig,
}

impl SnapshotStore {
    pub fn new(serializer: Arc<Serializer>, config: ProxyConfig) -> Self {
        Self { serializer, config }
    }

    pub fn serializer(&self) -> &Arc<Serializer> {
        &self.serializer
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Path of the snapshot file for `test` proxying `type_tag`.
    pub fn snapshot_path(&self, test: &CurrentTest, type_tag: &SymbolImport) -> ProxyResult<PathBuf> {
        let test_path = self.resolve(&test.path)?;
        let file_name = test_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base = TEST_SUFFIX.replace(&file_name, "");
        let name = [&*base, type_tag.name.as_str(), test.name.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("-");
        let file_name = sanitize_file_name(&format!("{}.{}", name, self.config.extension));
        let dir = test_path.parent().unwrap_or_else(|| Path::new("."));
        Ok(dir.join(&self.config.snapshots_dir).join(file_name))
    }

    /// Load the recorded snapshot, if any.
    ///
    /// A file that exists but fails to parse or evaluate is logged, deleted
    /// and reported as absent.
    pub fn get(&self, test: &CurrentTest, type_tag: &SymbolImport) -> ProxyResult<Option<Snapshot>> {
        let path = self.snapshot_path(test, type_tag)?;
        if !path.exists() {
            debug!(path = %path.display(), "no snapshot recorded");
            return Ok(None);
        }

        match SourceModule::read(&path).and_then(|module| module.snapshot(&self.serializer)) {
            Ok(snapshot) => {
                debug!(path = %path.display(), calls = snapshot.len(), "loaded snapshot");
                Ok(Some(snapshot))
            }
            Err(e) => {
                let corrupt = ProxyError::CorruptSnapshot {
                    path: path.clone(),
                    message: e.to_string(),
                };
                error!("{}; deleting it", corrupt);
                fs::remove_file(&path).map_err(|e| ProxyError::io(&path, e))?;
                Ok(None)
            }
        }
    }

    /// Render the snapshot file text for the calls made in this run.
    pub fn render_expectation(
        &self,
        test: &CurrentTest,
        type_tag: &SymbolImport,
        loaded: Option<&Snapshot>,
        actual: &[Call],
    ) -> ProxyResult<Expectation> {
        let path = self.snapshot_path(test, type_tag)?;
        let used = loaded.map_or(false, |s| !s.is_empty()) || !actual.is_empty();

        let source = if used {
            let snapshot_dir = path.parent().unwrap_or_else(|| Path::new("."));
            let modules = self.serializer.modules_import();
            let entries = actual
                .iter()
                .map(|call| self.render_call(call, &type_tag.name))
                .collect::<ProxyResult<Vec<_>>>()?;
            format!(
                "import {{ {} }} from {};\nimport {{ {} as {} }} from {};\n\n\
                 export default function get() {{ return [{}]; }}\n",
                type_tag.name,
                quoted(&self.import_path(snapshot_dir, &type_tag.path)?),
                modules.name,
                self.serializer.modules_ref(),
                quoted(&self.import_path(snapshot_dir, &modules.path)?),
                entries.join(", "),
            )
        } else {
            "export default function get() { return []; }\n".to_string()
        };

        Ok(Expectation {
            contents: format_source(&source, &self.config.format)?,
            path,
        })
    }

    fn render_call(&self, call: &Call, type_name: &str) -> ProxyResult<String> {
        let args = self.serializer.serialize(&Value::Array(call.args.clone()))?;
        let returns = match &call.returns {
            Some(value) => self.serializer.serialize(value)?,
            None => "undefined".to_string(),
        };
        Ok(format!(
            "{{type: \"call\", fn: {}, args: {}, returns: {}}}",
            accessor::encode(&call.path, Some(type_name)),
            args,
            returns
        ))
    }

    /// Import specifier for `target` as seen from `from_dir`.
    pub fn import_path(&self, from_dir: &Path, target: &Path) -> ProxyResult<String> {
        Ok(import_specifier(&self.config.project_root()?, from_dir, target))
    }

    fn resolve(&self, path: &Path) -> ProxyResult<PathBuf> {
        Ok(resolve_path(&self.config.project_root()?, path))
    }
}

/// Import specifier for `target` as seen from `from_dir`, both resolved
/// against `root`: relative, `/`-separated, extension stripped, and starting
/// with `.`.
pub(crate) fn import_specifier(root: &Path, from_dir: &Path, target: &Path) -> String {
    let relative = relative_path(&resolve_path(root, from_dir), &resolve_path(root, target));
    let relative = relative.to_string_lossy().replace('\\', "/");
    let relative = SOURCE_EXTENSION.replace(&relative, "").into_owned();
    if relative.starts_with('.') {
        relative
    } else {
        format!("./{}", relative)
    }
}

fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&root.join(path))
    }
}

pub(crate) fn quoted(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("{:?}", s))
}

/// Make a file name safe on common filesystems, collapsing whitespace to `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(name, "");
    let cleaned = if cleaned == "." || cleaned == ".." || RESERVED_NAME.is_match(&cleaned) {
        String::new()
    } else {
        TRAILING_DOTS.replace(&cleaned, "").into_owned()
    };
    let mut cleaned = WHITESPACE.replace_all(&cleaned, "_").into_owned();
    if cleaned.len() > MAX_FILE_NAME {
        let mut end = MAX_FILE_NAME;
        while !cleaned.is_char_boundary(end) {
            end -= 1;
        }
        cleaned.truncate(end);
    }
    cleaned
}

/// Lexically resolve `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn relative_path(from_dir: &Path, target: &Path) -> PathBuf {
    let from: Vec<_> = from_dir.components().collect();
    let to: Vec<_> = target.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    for component in &to[common..] {
        out.push(component.as_os_str());
    }
    out
}
