// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Loading of the `Packaging.toml` build configuration.

use kbundle_core::bundle::{PackDirType, PackagingRule, PackagingRuleSet};
use kbundle_core::ConfigError;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// The conventional configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "Packaging.toml";

/// Represents the structure of the `Packaging.toml` file.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PackagingConfig {
    /// Version prefix; the build appends `.{unix timestamp}`.
    #[serde(default = "default_base_version")]
    pub base_version: String,
    /// Root directory of the logical asset namespace.
    #[serde(default = "default_assets_root")]
    pub assets_root: PathBuf,
    /// Directory the bundles and the manifest are committed to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// The packaging rules, in declaration order.
    #[serde(default)]
    pub rules: Vec<PackagingRule>,
}

fn default_base_version() -> String {
    "1.0".to_string()
}

fn default_assets_root() -> PathBuf {
    PathBuf::from("resources/assets")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".dist/bundles")
}

impl Default for PackagingConfig {
    /// Provides a default configuration if `Packaging.toml` is not found.
    ///
    /// Every top-level directory conventionally found under `resources/assets`
    /// is packed as a single bundle.
    fn default() -> Self {
        Self {
            base_version: default_base_version(),
            assets_root: default_assets_root(),
            output_dir: default_output_dir(),
            rules: ["Textures", "Models", "Shaders", "Audio", "UI"]
                .into_iter()
                .map(|dir| PackagingRule::new(dir, PackDirType::Single))
                .collect(),
        }
    }
}

impl PackagingConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            what: DEFAULT_CONFIG_FILE.to_string(),
            message: e.to_string(),
        })
    }

    /// Reads the configuration at `path`, falling back to the default when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => {
                log::info!("Loading packaging configuration from '{}'", path.display());
                Self::from_toml_str(&text).map_err(|e| match e {
                    ConfigError::Parse { message, .. } => ConfigError::Parse {
                        what: path.display().to_string(),
                        message,
                    },
                    other => other,
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!(
                    "'{}' not found, using the default packaging configuration",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Parse {
                what: path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Validates the rules and turns them into a rule set.
    pub fn rule_set(&self) -> Result<PackagingRuleSet, ConfigError> {
        if self.base_version.trim().is_empty() {
            return Err(ConfigError::Parse {
                what: DEFAULT_CONFIG_FILE.to_string(),
                message: "base_version must not be empty".to_string(),
            });
        }
        PackagingRuleSet::new(self.rules.clone())
    }

    /// Resolves `assets_root` and `output_dir` against `base` when they are relative.
    pub fn rooted_at(mut self, base: &Path) -> Self {
        if self.assets_root.is_relative() {
            self.assets_root = base.join(&self.assets_root);
        }
        if self.output_dir.is_relative() {
            self.output_dir = base.join(&self.output_dir);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbundle_core::bundle::Compression;

    #[test]
    fn parses_rules_with_defaults() {
        let config = PackagingConfig::from_toml_str(
            r#"
            base_version = "2.0"
            output_dir = "out"

            [[rules]]
            source_path = "UI"
            pack_dir_type = "single"

            [[rules]]
            source_path = "Font"
            pack_dir_type = "file"
            compression = "none"
            content_addressed = true
            "#,
        )
        .unwrap();

        assert_eq!(config.base_version, "2.0");
        assert_eq!(config.assets_root, PathBuf::from("resources/assets"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.rules[0].compression, Compression::Fast);
        assert_eq!(config.rules[1].pack_dir_type, PackDirType::File);
        assert!(config.rules[1].content_addressed);

        let rules = config.rule_set().unwrap();
        assert_eq!(rules.bundle_for("UI/a.png").unwrap(), "UI");
    }

    #[test]
    fn unknown_pack_type_is_a_parse_error() {
        let err = PackagingConfig::from_toml_str(
            "[[rules]]\nsource_path = \"UI\"\npack_dir_type = \"folder\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn duplicate_rules_fail_validation() {
        let config = PackagingConfig::from_toml_str(
            "[[rules]]\nsource_path = \"UI\"\npack_dir_type = \"single\"\n\
             [[rules]]\nsource_path = \"UI\"\npack_dir_type = \"file\"\n",
        )
        .unwrap();
        assert_eq!(
            config.rule_set().unwrap_err(),
            ConfigError::DuplicateRule("UI".to_string())
        );
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = PackagingConfig::load(&dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config, PackagingConfig::default());
        assert!(config.rule_set().is_ok());
    }

    #[test]
    fn relative_directories_are_rooted() {
        let config = PackagingConfig::default().rooted_at(Path::new("/project"));
        assert_eq!(config.output_dir, PathBuf::from("/project/.dist/bundles"));
    }
}
