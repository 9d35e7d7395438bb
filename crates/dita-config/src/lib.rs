//! `dita.toml` loading for the DITA converter.
//!
//! A run is configured from, in increasing precedence: built-in defaults,
//! the `dita.toml` given explicitly or found in the working directory or
//! one of its parents, and [`CliSettings`] from the command line.
//!
//! ```toml
//! [convert]
//! map = "docs/index.ditamap"
//! output_dir = "${DITA_OUT:-output}"
//! delivery_target = "KB"
//! resolution_policy = "omit"
//! max_reuse_depth = 16
//!
//! [rules]
//! skip = ["draft-comment"]
//! unwrap = ["tgroup"]
//! rename = { keystroke = { name = "b", class = "key" } }
//! ```
//!
//! The string settings `convert.map`, `convert.output_dir` and
//! `convert.delivery_target` accept `${VAR}` (error when unset) and
//! `${VAR:-default}`. Relative paths are resolved against the directory of
//! the config file.

mod expand;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dita_renderer::{
    AudienceFilter, ConversionOptions, DEFAULT_DELIVERY_TARGET, DEFAULT_MAX_REUSE_DEPTH,
    ResolutionPolicy, Rule, Rules,
};
use serde::Deserialize;

/// Command-line overrides; `None` keeps the configured value.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override root map path.
    pub map: Option<PathBuf>,
    /// Override output directory.
    pub output_dir: Option<PathBuf>,
    /// Override delivery target token.
    pub delivery_target: Option<String>,
}

/// File name looked up during discovery.
pub const CONFIG_FILENAME: &str = "dita.toml";

const DEFAULT_MAP: &str = "index.ditamap";
const DEFAULT_OUTPUT_DIR: &str = "output";

/// Settings for one conversion run.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Conversion settings (paths are relative strings from TOML).
    #[serde(default)]
    convert: ConvertConfigRaw,
    /// Overlay on the built-in rule table.
    pub rules: RulesConfig,

    /// Resolved conversion configuration (set after loading).
    #[serde(skip)]
    pub convert_resolved: ConvertConfig,
    /// File the settings were read from, if any.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Resolution policy as written in TOML.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PolicySetting {
    /// Record a diagnostic and drop the element.
    #[default]
    Omit,
    /// Fail the topic.
    Abort,
}

impl From<PolicySetting> for ResolutionPolicy {
    fn from(setting: PolicySetting) -> Self {
        match setting {
            PolicySetting::Omit => Self::Omit,
            PolicySetting::Abort => Self::Abort,
        }
    }
}

/// Raw conversion configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConvertConfigRaw {
    map: Option<String>,
    output_dir: Option<String>,
    delivery_target: Option<String>,
    resolution_policy: Option<PolicySetting>,
    max_reuse_depth: Option<usize>,
}

/// Resolved conversion configuration with absolute paths.
#[derive(Debug)]
pub struct ConvertConfig {
    /// Root map file.
    pub map: PathBuf,
    /// Directory receiving the generated HTML.
    pub output_dir: PathBuf,
    /// Token accepted in `deliveryTarget` attributes.
    pub delivery_target: String,
    /// Handling of unresolvable content reuse.
    pub resolution_policy: PolicySetting,
    /// Maximum nesting of content reuse.
    pub max_reuse_depth: usize,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            map: PathBuf::from(DEFAULT_MAP),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            delivery_target: DEFAULT_DELIVERY_TARGET.to_owned(),
            resolution_policy: PolicySetting::default(),
            max_reuse_depth: DEFAULT_MAX_REUSE_DEPTH,
        }
    }
}

/// Rename target for one tag.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RenameRule {
    /// New element name.
    pub name: String,
    /// Class set on the renamed element.
    #[serde(default)]
    pub class: Option<String>,
}

/// Rule overrides applied on top of the built-in catalog.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Tags dropped with their subtree.
    pub skip: Vec<String>,
    /// Tags dropped while keeping their children.
    pub unwrap: Vec<String>,
    /// Tags emitted under a different name.
    pub rename: BTreeMap<String, RenameRule>,
}

impl RulesConfig {
    /// Built-in rules with this overlay applied.
    ///
    /// Overrides replace whatever the catalog had for the same tag.
    #[must_use]
    pub fn build(&self) -> Rules {
        let mut rules = Rules::default_dita();
        for tag in &self.skip {
            rules.table.insert(tag.as_str(), Rule::Skip);
        }
        for tag in &self.unwrap {
            rules.table.insert(tag.as_str(), Rule::Unwrap);
        }
        for (tag, rename) in &self.rename {
            rules.table.insert(
                tag.as_str(),
                Rule::Rename {
                    name: rename.name.clone(),
                    class: rename.class.clone().filter(|class| !class.is_empty()),
                },
            );
        }
        rules
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for tag in self.skip.iter().chain(&self.unwrap).chain(self.rename.keys()) {
            require_non_empty(tag, "rules")?;
        }
        for (tag, rename) in &self.rename {
            require_non_empty(&rename.name, &format!("rules.rename.{tag}.name"))?;
        }
        if let Some(tag) = self.skip.iter().find(|tag| self.unwrap.contains(tag)) {
            return Err(ConfigError::Validation(format!(
                "tag {tag} is listed in both rules.skip and rules.unwrap"
            )));
        }
        Ok(())
    }
}

/// Failure to produce a usable configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The explicitly requested config file does not exist.
    #[error("config file {} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid dita.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range or inconsistent with another.
    #[error("invalid setting: {0}")]
    Validation(String),
    /// A `${VAR}` reference without default names an unset variable.
    #[error("cannot expand {field}: {message}")]
    EnvVar {
        /// Setting being expanded, e.g. `convert.output_dir`.
        field: String,
        /// What is missing.
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Read settings from `config_path`, or from a discovered `dita.toml`,
    /// or fall back to defaults rooted at the working directory. CLI
    /// overrides are applied last and the result is validated again.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails
    /// or a CLI override is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_from(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(map) = &settings.map {
            self.convert_resolved.map.clone_from(map);
        }
        if let Some(output_dir) = &settings.output_dir {
            self.convert_resolved.output_dir.clone_from(output_dir);
        }
        if let Some(delivery_target) = &settings.delivery_target {
            self.convert_resolved.delivery_target.clone_from(delivery_target);
        }
    }

    /// Options shared by every topic conversion of a run.
    #[must_use]
    pub fn conversion_options(&self) -> ConversionOptions {
        let convert = &self.convert_resolved;
        ConversionOptions::default()
            .with_audience(AudienceFilter::new(convert.delivery_target.as_str()))
            .with_resolution_policy(convert.resolution_policy.into())
            .with_max_reuse_depth(convert.max_reuse_depth)
    }

    /// Nearest `dita.toml` at or above `start`.
    fn discover_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Defaults with paths under `base`.
    fn default_with_base(base: &Path) -> Self {
        Self {
            convert: ConvertConfigRaw::default(),
            rules: RulesConfig::default(),
            convert_resolved: ConvertConfig {
                map: base.join(DEFAULT_MAP),
                output_dir: base.join(DEFAULT_OUTPUT_DIR),
                ..ConvertConfig::default()
            },
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // ${VAR} may expand to a relative path
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Check value ranges and rule consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_convert()?;
        self.rules.validate()?;
        Ok(())
    }

    fn validate_convert(&self) -> Result<(), ConfigError> {
        let convert = &self.convert_resolved;
        require_non_empty(&convert.delivery_target, "convert.delivery_target")?;
        if convert.delivery_target.contains(char::is_whitespace) {
            return Err(ConfigError::Validation(
                "convert.delivery_target must be a single token".to_owned(),
            ));
        }
        if convert.max_reuse_depth == 0 {
            return Err(ConfigError::Validation(
                "convert.max_reuse_depth must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        let convert = &mut self.convert;
        if let Some(ref map) = convert.map {
            convert.map = Some(expand::expand_env(map, "convert.map")?);
        }
        if let Some(ref output_dir) = convert.output_dir {
            convert.output_dir = Some(expand::expand_env(output_dir, "convert.output_dir")?);
        }
        if let Some(ref target) = convert.delivery_target {
            convert.delivery_target =
                Some(expand::expand_env(target, "convert.delivery_target")?);
        }
        Ok(())
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));
        let raw = &self.convert;

        self.convert_resolved = ConvertConfig {
            map: resolve(raw.map.as_deref(), DEFAULT_MAP),
            output_dir: resolve(raw.output_dir.as_deref(), DEFAULT_OUTPUT_DIR),
            delivery_target: raw
                .delivery_target
                .clone()
                .unwrap_or_else(|| DEFAULT_DELIVERY_TARGET.to_owned()),
            resolution_policy: raw.resolution_policy.unwrap_or_default(),
            max_reuse_depth: raw.max_reuse_depth.unwrap_or(DEFAULT_MAX_REUSE_DEPTH),
        };
    }
}
