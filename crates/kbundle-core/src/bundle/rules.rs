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

//! Declarative packaging rules and the rule-ownership lookup shared by the
//! build pipeline and the runtime resolver.

use super::naming;
use crate::error::{ConfigError, NamingError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// How the files under a rule's source directory are split into bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackDirType {
    /// Every file under the directory goes into one bundle named after the directory.
    Single,
    /// Every file becomes its own bundle, named `{source_path}_{file_stem}`.
    File,
    /// Every immediate subdirectory becomes one bundle, named `{source_path}_{subdir}`.
    SubSingle,
}

/// Compression applied to the entries of a compiled bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    /// Entries are stored as-is.
    None,
    /// Fast block compression.
    #[default]
    Fast,
    /// Best available ratio.
    Max,
}

/// A single packaging rule: how one source directory is bundled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingRule {
    /// The directory the rule covers, as a forward-slash path relative to the assets root.
    pub source_path: String,
    /// How files under `source_path` are split into bundles.
    pub pack_dir_type: PackDirType,
    /// Compression used when compiling the rule's bundles.
    #[serde(default)]
    pub compression: Compression,
    /// Whether bundle names are replaced by a hash of themselves.
    #[serde(default)]
    pub content_addressed: bool,
}

impl PackagingRule {
    /// Creates a rule with the default compression and plain (non content-addressed) names.
    pub fn new(source_path: impl Into<String>, pack_dir_type: PackDirType) -> Self {
        Self {
            source_path: source_path.into(),
            pack_dir_type,
            compression: Compression::default(),
            content_addressed: false,
        }
    }

    /// Sets the compression level.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Enables or disables content-addressed naming.
    pub fn content_addressed(mut self, enabled: bool) -> Self {
        self.content_addressed = enabled;
        self
    }

    /// Returns the part of `logical_path` below this rule's directory, if the
    /// rule covers it. Matching happens on whole path components, so `UI`
    /// covers `UI/a.png` but not `UIKit/a.png`.
    pub fn relative_path<'a>(&self, logical_path: &'a str) -> Option<&'a str> {
        logical_path
            .strip_prefix(self.source_path.as_str())?
            .strip_prefix('/')
            .filter(|rest| !rest.is_empty())
    }

    /// Derives the bundle name for a path already known to be under this rule.
    fn bundle_for_relative(&self, logical_path: &str, relative: &str) -> Result<String, NamingError> {
        let logical_name = match self.pack_dir_type {
            PackDirType::Single => self.source_path.clone(),
            PackDirType::File => format!("{}_{}", self.source_path, file_stem(relative)),
            PackDirType::SubSingle => match relative.split_once('/') {
                Some((subdir, _)) => format!("{}_{}", self.source_path, subdir),
                None => {
                    return Err(NamingError::LooseFile {
                        path: logical_path.to_string(),
                        source_path: self.source_path.clone(),
                    })
                }
            },
        };
        Ok(naming::bundle_name(&logical_name, self.content_addressed))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let reason = if self.source_path.is_empty() {
            Some("source path is empty")
        } else if self.source_path.starts_with('/') || self.source_path.ends_with('/') {
            Some("source path must be relative and must not end with '/'")
        } else if self.source_path.contains('\\') {
            Some("source path must use forward slashes")
        } else if self
            .source_path
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..")
        {
            Some("source path contains an empty, '.' or '..' component")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ConfigError::InvalidRule {
                source_path: self.source_path.clone(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// The file name of `relative` without its final extension.
fn file_stem(relative: &str) -> &str {
    Path::new(relative)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(relative)
}

/// The full set of packaging rules for a project.
///
/// Loaded once and shared read-only by the build pipeline and, through the
/// manifest snapshot, by the runtime resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingRuleSet {
    /// The rules, in declaration order.
    pub rules: Vec<PackagingRule>,
}

impl PackagingRuleSet {
    /// Builds and validates a rule set.
    pub fn new(rules: Vec<PackagingRule>) -> Result<Self, ConfigError> {
        let set = Self { rules };
        set.validate()?;
        Ok(set)
    }

    /// Checks every rule and rejects duplicate source paths.
    ///
    /// With duplicates rejected, two rules can only tie on prefix length when
    /// they are the same rule, so the longest-prefix lookup is unambiguous.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            rule.validate()?;
            if !seen.insert(rule.source_path.as_str()) {
                return Err(ConfigError::DuplicateRule(rule.source_path.clone()));
            }
        }
        Ok(())
    }

    /// Iterates over the rules in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &PackagingRule> {
        self.rules.iter()
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Finds the rule owning `logical_path`: the one whose source path is the
    /// longest component-wise prefix of it.
    pub fn owning_rule(&self, logical_path: &str) -> Result<&PackagingRule, NamingError> {
        let mut best: Option<&PackagingRule> = None;
        let mut tied = false;

        for rule in &self.rules {
            if rule.relative_path(logical_path).is_none() {
                continue;
            }
            match best {
                Some(current) if rule.source_path.len() < current.source_path.len() => {}
                Some(current) if rule.source_path.len() == current.source_path.len() => {
                    tied = true;
                }
                _ => {
                    best = Some(rule);
                    tied = false;
                }
            }
        }

        match best {
            Some(rule) if tied => Err(NamingError::AmbiguousRule {
                path: logical_path.to_string(),
                source_path: rule.source_path.clone(),
            }),
            Some(rule) => Ok(rule),
            None => Err(NamingError::NoMatchingRule {
                path: logical_path.to_string(),
            }),
        }
    }

    /// Maps a logical asset path to the name of the bundle that contains it.
    ///
    /// The build-time grouper and the runtime resolver both go through this
    /// function; a bundle name produced here at build time is exactly the one
    /// the runtime will ask for.
    pub fn bundle_for(&self, logical_path: &str) -> Result<String, NamingError> {
        let rule = self.owning_rule(logical_path)?;
        let relative = rule
            .relative_path(logical_path)
            .ok_or_else(|| NamingError::NoMatchingRule {
                path: logical_path.to_string(),
            })?;
        rule.bundle_for_relative(logical_path, relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> PackagingRuleSet {
        PackagingRuleSet::new(vec![
            PackagingRule::new("UI", PackDirType::Single),
            PackagingRule::new("UI/Icons", PackDirType::File),
            PackagingRule::new("Font", PackDirType::File),
            PackagingRule::new("Levels", PackDirType::SubSingle),
        ])
        .unwrap()
    }

    #[test]
    fn single_rule_names_bundle_after_directory() {
        assert_eq!(rules().bundle_for("UI/a.png").unwrap(), "UI");
        assert_eq!(rules().bundle_for("UI/panels/b.png").unwrap(), "UI");
    }

    #[test]
    fn file_rule_names_bundle_after_file_stem() {
        assert_eq!(rules().bundle_for("Font/f1.ttf").unwrap(), "Font_f1");
        assert_eq!(rules().bundle_for("Font/nested/f2.ttf").unwrap(), "Font_f2");
    }

    #[test]
    fn sub_single_rule_names_bundle_after_first_subdirectory() {
        assert_eq!(
            rules().bundle_for("Levels/forest/trees/oak.mesh").unwrap(),
            "Levels_forest"
        );
        assert!(matches!(
            rules().bundle_for("Levels/readme.txt"),
            Err(NamingError::LooseFile { .. })
        ));
    }

    #[test]
    fn most_specific_rule_wins() {
        assert_eq!(rules().bundle_for("UI/Icons/gear.png").unwrap(), "UI_Icons_gear");
    }

    #[test]
    fn prefix_matching_respects_component_boundaries() {
        assert!(matches!(
            rules().bundle_for("UIKit/a.png"),
            Err(NamingError::NoMatchingRule { .. })
        ));
        assert!(rules().bundle_for("UI").is_err());
    }

    #[test]
    fn duplicate_source_paths_are_rejected() {
        let result = PackagingRuleSet::new(vec![
            PackagingRule::new("UI", PackDirType::Single),
            PackagingRule::new("UI", PackDirType::File),
        ]);
        assert_eq!(result, Err(ConfigError::DuplicateRule("UI".to_string())));
    }

    #[test]
    fn malformed_source_paths_are_rejected() {
        for bad in ["", "/abs", "trailing/", "a//b", "a/../b", "win\\path"] {
            let result = PackagingRuleSet::new(vec![PackagingRule::new(bad, PackDirType::Single)]);
            assert!(
                matches!(result, Err(ConfigError::InvalidRule { .. })),
                "'{bad}' should be rejected"
            );
        }
    }

    #[test]
    fn ambiguous_match_is_flagged_when_validation_was_skipped() {
        let set = PackagingRuleSet {
            rules: vec![
                PackagingRule::new("UI", PackDirType::Single),
                PackagingRule::new("UI", PackDirType::File),
            ],
        };
        assert!(matches!(
            set.bundle_for("UI/a.png"),
            Err(NamingError::AmbiguousRule { .. })
        ));
    }

    #[test]
    fn rule_set_parses_from_json_with_defaults() {
        let json = r#"{"rules":[{"source_path":"Audio","pack_dir_type":"sub_single"}]}"#;
        let set: PackagingRuleSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.rules[0].pack_dir_type, PackDirType::SubSingle);
        assert_eq!(set.rules[0].compression, Compression::Fast);
        assert!(!set.rules[0].content_addressed);
    }
}
