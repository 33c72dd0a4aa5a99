use glob::{MatchOptions, Pattern};
use log::{debug, info};
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::config::{load_config, AuthMode, ConfigSource, ExporterConfig};
use crate::error::{ExporterError, Result};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Connection credentials for one appliance
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    pub auth_mode: AuthMode,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("auth_mode", &self.auth_mode)
            .finish()
    }
}

/// An explicit, compiled target match rule
#[derive(Debug, Clone)]
pub struct TargetRule {
    pattern: String,
    glob: Pattern,
    credentials: Credentials,
}

impl TargetRule {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn matches(&self, target: &str) -> bool {
        self.pattern.eq_ignore_ascii_case(target) || self.glob.matches_with(target, MATCH_OPTIONS)
    }
}

/// A validated credentials configuration, immutable once built
#[derive(Debug, Clone, Default)]
pub struct CredentialConfig {
    rules: Vec<TargetRule>,
    default: Option<Credentials>,
}

impl CredentialConfig {
    /// Validate a parsed document. Any invalid entry rejects the whole document.
    pub fn compile(document: ExporterConfig) -> Result<Self> {
        let mut rules = Vec::with_capacity(document.targets.len());
        let mut default = None;

        for (index, entry) in document.targets.into_iter().enumerate() {
            if entry.user.trim().is_empty() {
                return Err(ExporterError::Config(format!(
                    "target entry {} has an empty user",
                    index
                )));
            }

            let credentials = Credentials {
                user: entry.user,
                password: entry.password,
                auth_mode: entry.auth_mode,
            };

            let pattern = entry.pattern.trim().to_string();
            if pattern.is_empty() {
                if default.is_some() {
                    return Err(ExporterError::Config(
                        "more than one default target entry".to_string(),
                    ));
                }
                default = Some(credentials);
                continue;
            }

            let glob = Pattern::new(&pattern).map_err(|e| {
                ExporterError::Config(format!("invalid target pattern '{}': {}", pattern, e))
            })?;

            rules.push(TargetRule {
                pattern,
                glob,
                credentials,
            });
        }

        Ok(Self { rules, default })
    }

    /// First matching explicit rule in declaration order, then the default
    pub fn lookup(&self, target: &str) -> Option<&Credentials> {
        self.rules
            .iter()
            .find(|rule| rule.matches(target))
            .map(TargetRule::credentials)
            .or(self.default.as_ref())
    }

    pub fn rules(&self) -> &[TargetRule] {
        &self.rules
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// Hot-reloadable holder of the active credentials configuration
pub struct CredentialStore {
    active: RwLock<Arc<CredentialConfig>>,
}

impl CredentialStore {
    /// Create a store with no rules
    pub fn new() -> Self {
        Self::with_config(CredentialConfig::default())
    }

    pub fn with_config(config: CredentialConfig) -> Self {
        Self {
            active: RwLock::new(Arc::new(config)),
        }
    }

    /// The configuration active right now
    pub fn snapshot(&self) -> Result<Arc<CredentialConfig>> {
        let active = self
            .active
            .read()
            .map_err(|_| ExporterError::Other("Lock poisoned".to_string()))?;
        Ok(Arc::clone(&active))
    }

    pub fn resolve(&self, target: &str) -> Result<Credentials> {
        let snapshot = self.snapshot()?;
        snapshot
            .lookup(target)
            .cloned()
            .ok_or_else(|| ExporterError::NoCredentials(target.to_string()))
    }

    /// Validate and publish a parsed document
    pub fn apply(&self, document: ExporterConfig) -> Result<()> {
        let compiled = Arc::new(CredentialConfig::compile(document)?);
        let mut active = self
            .active
            .write()
            .map_err(|_| ExporterError::Other("Lock poisoned".to_string()))?;
        *active = compiled;
        Ok(())
    }

    /// Parse `source` and swap it in; on any error the active configuration is kept
    pub fn reload(&self, source: &ConfigSource) -> Result<()> {
        debug!("Reloading credentials from {}", source.describe());
        let document = load_config(source)?;
        self.apply(document)?;

        let snapshot = self.snapshot()?;
        info!(
            "Loaded {} target rule(s){} from {}",
            snapshot.rules().len(),
            if snapshot.has_default() { " and a default" } else { "" },
            source.describe()
        );
        debug!(
            "Target patterns in match order: {}",
            snapshot.rules().iter().map(TargetRule::pattern).collect::<Vec<_>>().join(", ")
        );
        Ok(())
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}
