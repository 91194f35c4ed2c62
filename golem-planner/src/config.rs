//! Planner configuration.
//!
//! Loaded once at startup (TOML file or literal) and treated as immutable for
//! the remainder of the process lifetime. Credentials can come from the file
//! or from the conventional per-provider environment variable.

use std::path::Path;

use serde::Deserialize;

use crate::error::{PlannerError, PlannerResult};
use crate::provider::ProviderKind;

/// Per-provider settings. Unset fields fall back to the provider's built-in
/// defaults at client construction time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

/// Process-wide planner configuration.
///
/// ```toml
/// provider = "anthropic"
///
/// [anthropic]
/// api_key = "sk-..."
/// model = "claude-sonnet-4-20250514"
/// max_tokens = 1024
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Which backend interprets commands. Groq doubles as the fallback
    /// target when another provider is selected and fails.
    pub provider: ProviderKind,
    pub groq: ProviderConfig,
    pub openai: ProviderConfig,
    pub gemini: ProviderConfig,
    pub anthropic: ProviderConfig,
}

impl PlannerConfig {
    pub fn from_toml_str(text: &str) -> PlannerResult<Self> {
        toml::from_str(text).map_err(|e| PlannerError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> PlannerResult<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            PlannerError::Config(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn provider_config(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::Groq => &self.groq,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::Anthropic => &self.anthropic,
        }
    }

    /// Configured key if present, otherwise the provider's environment
    /// variable. Empty strings count as absent.
    pub fn resolve_api_key(&self, kind: ProviderKind) -> Option<String> {
        let configured = self
            .provider_config(kind)
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty());
        match configured {
            Some(key) => Some(key.to_string()),
            None => std::env::var(kind.env_key())
                .ok()
                .filter(|k| !k.is_empty()),
        }
    }
}

/// Tests that set or remove provider key variables serialize through this
/// lock; the process environment is shared across the parallel test runner.
#[cfg(test)]
pub(crate) mod test_env {
    use once_cell::sync::Lazy;
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    pub fn lock() -> MutexGuard<'static, ()> {
        match ENV_LOCK.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_select_groq() {
        let config = PlannerConfig::default();
        assert_eq!(config.provider, ProviderKind::Groq);
        assert!(config.groq.api_key.is_none());
    }

    #[test]
    fn parses_partial_toml() {
        let config = PlannerConfig::from_toml_str(
            r#"
            provider = "anthropic"

            [anthropic]
            api_key = "sk-test"
            max_tokens = 512
            "#,
        )
        .unwrap();

        assert_eq!(config.provider, ProviderKind::Anthropic);
        assert_eq!(config.anthropic.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.anthropic.max_tokens, Some(512));
        // untouched sections keep their defaults
        assert!(config.openai.api_key.is_none());
    }

    #[test]
    fn rejects_unknown_provider() {
        let err = PlannerConfig::from_toml_str("provider = \"bard\"").unwrap_err();
        assert!(matches!(err, PlannerError::Config(_)));
    }

    #[test]
    fn empty_api_key_counts_as_absent() {
        let _env = test_env::lock();
        let config = PlannerConfig::from_toml_str(
            r#"
            [gemini]
            api_key = ""
            "#,
        )
        .unwrap();
        std::env::remove_var("GEMINI_API_KEY");
        assert_eq!(config.resolve_api_key(ProviderKind::Gemini), None);
    }
}
