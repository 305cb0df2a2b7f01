//! Deploy config record handling for uplift.
//!
//! The config lives in `deploy.config.js` as a plain key/value record
//! wrapped in a CommonJS export:
//!
//! ```text
//! module.exports = {
//!   "name": "wheel",
//!   "appVersion": "v1"
//! }
//! ```
//!
//! The record is the single source of truth for "what was last
//! published". Reads go through the typed [`TemplateConfig`]; the
//! version write-back operates on the raw key/value map instead, so
//! fields this tool knows nothing about survive a rewrite byte-for-byte
//! (values and ordering both). Writes are atomic: temp file in the same
//! directory, then rename.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "deploy.config.js";

/// The template's deploy configuration, typed view.
///
/// `miscVersion` and `wizardVersion` are presence-as-flag: having the
/// key at all enables that artifact family.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
    /// Template identifier; every destination path depends on it.
    #[serde(default)]
    pub name: String,
    /// Logical server label for the loader snippet; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// Last-published primary version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    /// Whether the primary bundle ships a stylesheet companion.
    #[serde(default)]
    pub css: bool,
    /// Presence enables the misc bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub misc_version: Option<String>,
    /// Presence enables the wizard bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wizard_version: Option<String>,
    /// `"vite"` selects the single-file bundle output; anything else
    /// selects the default app bundle. Embedded verbatim in the snippet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_version: Option<String>,
    /// Version of the shared script-loader bootstrap referenced by URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_loader_version: Option<String>,
    /// Verbatim fragment spliced before the inline loader script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_scripts: Option<String>,
    /// Verbatim callback body spliced into the loader's assets-loaded hook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_campaign_loaded: Option<String>,
    /// Everything this tool does not interpret, preserved on rewrite.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TemplateConfig {
    /// Server label, falling back to the template name.
    pub fn server_name(&self) -> &str {
        self.server.as_deref().unwrap_or(&self.name)
    }

    pub fn has_misc(&self) -> bool {
        self.misc_version.is_some()
    }

    pub fn has_wizard(&self) -> bool {
        self.wizard_version.is_some()
    }

    /// Whether the primary build is the single-file vite bundle.
    pub fn is_vite(&self) -> bool {
        self.script_version.as_deref() == Some("vite")
    }
}

/// Strip the `module.exports =` wrapper and parse the JSON record.
pub fn parse_module_exports(content: &str) -> Result<Map<String, Value>> {
    let rest = content
        .trim()
        .strip_prefix("module.exports")
        .context("config does not start with `module.exports`")?;
    let rest = rest
        .trim_start()
        .strip_prefix('=')
        .context("config is missing `=` after `module.exports`")?;
    let json = rest.trim().trim_end_matches(';').trim();

    let value: Value = serde_json::from_str(json).context("config record is not valid JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("config record must be an object, got {other}"),
    }
}

/// Render the record back into its CommonJS wrapper.
pub fn render_module_exports(record: &Map<String, Value>) -> String {
    let json = serde_json::to_string_pretty(&Value::Object(record.clone()))
        .unwrap_or_else(|_| "{}".to_string());
    format!("module.exports = {json}")
}

/// Load the raw key/value record from a config file.
pub fn load_raw(path: &Path) -> Result<Map<String, Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_module_exports(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

/// Load the typed config from a config file.
pub fn load_config(path: &Path) -> Result<TemplateConfig> {
    let raw = load_raw(path)?;
    serde_json::from_value(Value::Object(raw))
        .with_context(|| format!("unexpected config shape in {}", path.display()))
}

/// Atomically rewrite the config file with the given record.
///
/// A crash mid-write must never leave a corrupt or half-written record,
/// so the new content goes to a temp file in the same directory first.
pub fn save_raw(path: &Path, record: &Map<String, Value>) -> Result<()> {
    let tmp = path.with_extension("js.tmp");
    {
        let mut f = fs::File::create(&tmp)
            .with_context(|| format!("failed to create tmp file {}", tmp.display()))?;
        f.write_all(render_module_exports(record).as_bytes())
            .with_context(|| format!("failed to write tmp file {}", tmp.display()))?;
    }
    fs::rename(&tmp, path).with_context(|| {
        format!(
            "failed to rename tmp file {} to {}",
            tmp.display(),
            path.display()
        )
    })?;
    Ok(())
}

/// Write the just-published version back into the config record.
///
/// Sets `appVersion`, and updates `wizardVersion`/`miscVersion` only when
/// those keys are already present. Every other field passes through
/// untouched, in its original position.
pub fn persist_versions(path: &Path, version: &str) -> Result<()> {
    let mut record = load_raw(path)?;

    record.insert("appVersion".to_string(), Value::String(version.to_string()));
    for key in ["wizardVersion", "miscVersion"] {
        if record.contains_key(key) {
            record.insert(key.to_string(), Value::String(version.to_string()));
        }
    }

    save_raw(path, &record)
}
