//! Configuration management for `logmask-core`.
//!
//! This module defines the masking rule records and the ordered rule-set
//! configuration. It handles YAML (de)serialization, loading of the embedded
//! default rules and of user rule files, order-preserving merges, and validation.
//!
//! A masking rule list is order sensitive: rules are
//! evaluated top to bottom within their phase, so every operation here keeps the
//! relative position of rules stable.
//!
//! License: MIT OR Apache-2.0

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum allowed length for a regex pattern string.
pub const MAX_PATTERN_LENGTH: usize = 500;

/// The point in the masking pipeline at which a rule runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RulePhase {
    /// Runs before `=`, `|` and `:` are split apart (URLs, timestamps).
    Pre,
    /// Runs after separator normalization.
    #[default]
    Post,
}

impl RulePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RulePhase::Pre => "pre",
            RulePhase::Post => "post",
        }
    }
}

/// A single masking rule as written in a rule file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(default)]
pub struct MaskingRule {
    /// Unique identifier for the rule (e.g., "ip").
    pub name: String,
    /// Human-readable description of what the rule targets.
    pub description: Option<String>,
    /// The regex pattern string.
    pub pattern: Option<String>,
    /// Bare placeholder name; matches are replaced with `<mask_with>`.
    pub mask_with: String,
    pub phase: RulePhase,
    /// If true, a match must be flanked by non-alphanumeric characters or the
    /// edges of the line.
    pub bounded: bool,
    /// If true, the rule is disabled unless explicitly enabled.
    pub opt_in: bool,
    /// Explicit override for enabling/disabling the rule.
    pub enabled: Option<bool>,
}

impl Default for MaskingRule {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            pattern: None,
            mask_with: String::new(),
            phase: RulePhase::Post,
            bounded: false,
            opt_in: false,
            enabled: None,
        }
    }
}

impl MaskingRule {
    /// The placeholder written into masked text, e.g. `<IP>`.
    pub fn wrapped_tag(&self) -> String {
        wrap_tag(&self.mask_with)
    }
}

/// Wraps a bare placeholder name in angle brackets.
pub fn wrap_tag(mask_with: &str) -> String {
    format!("<{}>", mask_with)
}

/// Returns the reason a placeholder name is unusable, if any.
///
/// Tags must survive bracket-aware sub-splitting and whitespace tokenization
/// unchanged, and `*` is reserved for the miner's wildcard.
pub fn invalid_tag_reason(mask_with: &str) -> Option<&'static str> {
    if mask_with.is_empty() {
        Some("is empty")
    } else if mask_with == "*" {
        Some("is reserved for the template wildcard")
    } else if mask_with.contains(['<', '>']) {
        Some("contains angle brackets")
    } else if mask_with.chars().any(char::is_whitespace) {
        Some("contains whitespace")
    } else {
        None
    }
}

/// The ordered list of masking rules for both phases.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq, Eq, Hash)]
pub struct RuleSetConfig {
    pub rules: Vec<MaskingRule>,
}

impl RuleSetConfig {
    /// Loads masking rules from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading masking rules from: {}", path.display());
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule file {}", path.display()))?;
        let config: RuleSetConfig = serde_yml::from_str(&text)
            .with_context(|| format!("Failed to parse rule file {}", path.display()))?;

        validate_rules(&config.rules)?;
        info!("Loaded {} rules from file {}.", config.rules.len(), path.display());

        Ok(config)
    }

    /// Loads the built-in masking rules from the embedded configuration.
    pub fn load_default_rules() -> Result<Self> {
        debug!("Loading default rules from embedded string...");
        let default_yaml = include_str!("../config/default_rules.yaml");
        let config: RuleSetConfig = serde_yml::from_str(default_yaml)
            .context("Failed to parse default rules")?;

        validate_rules(&config.rules).context("Embedded default rules are invalid")?;
        debug!("Loaded {} default rules.", config.rules.len());
        Ok(config)
    }

    /// Rules of one phase, in evaluation order.
    pub fn rules_for_phase(&self, phase: RulePhase) -> impl Iterator<Item = &MaskingRule> {
        self.rules.iter().filter(move |r| r.phase == phase)
    }

    /// Filters active rules based on enable/disable lists.
    ///
    /// Opt-in rules stay only when named in `enable_rules`; anything named in
    /// `disable_rules` is removed. Surviving rules keep their order.
    pub fn set_active_rules(&mut self, enable_rules: &[String], disable_rules: &[String]) {
        let enable_set: HashSet<&str> = enable_rules.iter().map(String::as_str).collect();
        let disable_set: HashSet<&str> = disable_rules.iter().map(String::as_str).collect();

        debug!("Initial rules count before filtering: {}", self.rules.len());

        let all_rule_names: HashSet<&str> = self.rules.iter().map(|r| r.name.as_str()).collect();

        for rule_name in enable_set.difference(&all_rule_names) {
            warn!("Rule '{}' in `enable_rules` list does not exist.", rule_name);
        }

        for rule_name in disable_set.difference(&all_rule_names) {
            warn!("Rule '{}' in `disable_rules` list does not exist.", rule_name);
        }

        self.rules.retain(|rule| {
            let rule_name_str = rule.name.as_str();
            !disable_set.contains(rule_name_str)
                && (!rule.opt_in || enable_set.contains(rule_name_str))
        });

        debug!("Final active rules count after filtering: {}", self.rules.len());
    }
}

/// Merges user-defined rules into the defaults without disturbing rule order.
///
/// A user rule whose name already exists replaces the default in place. New user
/// rules are inserted after the last rule of their phase, so a new `pre` rule
/// still runs before every `post` rule.
pub fn merge_rules(default_config: RuleSetConfig, user_config: Option<RuleSetConfig>) -> RuleSetConfig {
    debug!("merge_rules called. Initial default rules count: {}", default_config.rules.len());

    let mut final_rules = default_config.rules;

    if let Some(user_cfg) = user_config {
        debug!("User config provided. Merging {} user rules.", user_cfg.rules.len());
        for user_rule in user_cfg.rules {
            if let Some(existing) = final_rules.iter_mut().find(|r| r.name == user_rule.name) {
                if existing.phase != user_rule.phase {
                    warn!(
                        "User rule '{}' moves from phase '{}' to '{}'; it keeps its original position.",
                        user_rule.name,
                        existing.phase.as_str(),
                        user_rule.phase.as_str()
                    );
                }
                *existing = user_rule;
                continue;
            }

            let insert_at = final_rules
                .iter()
                .rposition(|r| r.phase == user_rule.phase)
                .map(|idx| idx + 1)
                .unwrap_or(match user_rule.phase {
                    RulePhase::Pre => 0,
                    RulePhase::Post => final_rules.len(),
                });
            final_rules.insert(insert_at, user_rule);
        }
    }

    debug!("Final total rules after merge: {}", final_rules.len());
    RuleSetConfig { rules: final_rules }
}

/// Validates rule integrity (names, tags, pattern presence and compilation).
pub fn validate_rules(rules: &[MaskingRule]) -> Result<()> {
    let mut rule_names = HashSet::new();
    let mut errors = Vec::new();

    for rule in rules {
        if rule.name.is_empty() {
            errors.push("A rule has an empty `name` field.".to_string());
        } else if !rule_names.insert(rule.name.clone()) {
            errors.push(format!("Duplicate rule name found: '{}'.", rule.name));
        }

        if let Some(reason) = invalid_tag_reason(&rule.mask_with) {
            errors.push(format!("Rule '{}': `mask_with` {}.", rule.name, reason));
        }

        let pattern = match &rule.pattern {
            Some(p) => p,
            None => {
                errors.push(format!("Rule '{}' is missing the `pattern` field.", rule.name));
                continue;
            }
        };

        if pattern.is_empty() {
            errors.push(format!("Rule '{}' has an empty `pattern` field.", rule.name));
            continue;
        }

        if pattern.len() > MAX_PATTERN_LENGTH {
            errors.push(format!(
                "Rule '{}': pattern length ({}) exceeds maximum allowed ({}).",
                rule.name,
                pattern.len(),
                MAX_PATTERN_LENGTH
            ));
            continue;
        }

        if let Err(e) = Regex::new(pattern) {
            errors.push(format!("Rule '{}' has an invalid regex pattern: {}", rule.name, e));
        }
    }

    if !errors.is_empty() {
        let full_error_message = format!("Rule validation failed:\n{}", errors.join("\n"));
        Err(anyhow!(full_error_message))
    } else {
        Ok(())
    }
}

/// Locations searched for a named rule file, most specific first.
pub fn rule_set_candidate_paths(name: &str) -> Vec<PathBuf> {
    let base_dirs = vec![
        dirs::home_dir().map(|p| p.join(".logmask").join("rules")),
        dirs::config_dir().map(|p| p.join("logmask").join("rules")),
        Some(PathBuf::from("/etc/logmask/rules")),
        Some(PathBuf::from("./config")),
    ];

    base_dirs
        .into_iter()
        .flatten()
        .map(|dir| dir.join(format!("{}.yaml", name)))
        .collect()
}

/// Loads a rule file given either a path or a name resolved through
/// [`rule_set_candidate_paths`].
pub fn load_rules_by_name(name_or_path: &str) -> Result<RuleSetConfig> {
    debug!("Attempting to load rule set from: '{}'", name_or_path);

    let path_to_load = {
        let path = Path::new(name_or_path);
        if path.is_file() {
            Some(path.to_path_buf())
        } else {
            rule_set_candidate_paths(name_or_path)
                .into_iter()
                .find(|p| p.is_file())
        }
    }
    .with_context(|| {
        format!(
            "Rule set '{}' not found. It is not a valid file path, and was not found in expected locations.",
            name_or_path
        )
    })?;

    RuleSetConfig::load_from_file(path_to_load)
}
