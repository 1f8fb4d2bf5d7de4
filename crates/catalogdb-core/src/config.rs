//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! `APP_EMBED__TIMEOUT_MS=100` overrides `embed.timeout_ms`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> { Self::load_from(Path::new("config.toml")) }

    /// Load with an explicit base file; the env overlay lives next to it.
    pub fn load_from(base: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(base));
        let overlay = match env_name.as_str() {
            "dev" | "development" => Some("dev"),
            "prod" | "production" => Some("prod"),
            "test" | "testing" => Some("test"),
            _ => None,
        };
        if let Some(suffix) = overlay {
            figment = figment.merge(Toml::file(base.with_extension(format!("{suffix}.toml"))));
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract::<Settings>()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedProviderKind {
    Hashed,
    Clip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub catalog_path: String,
    pub lancedb_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { catalog_path: "data/catalog.json".into(), lancedb_dir: "data/lancedb".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSettings {
    pub table: String,
}

impl Default for VectorSettings {
    fn default() -> Self { Self { table: "products".into() } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedSettings {
    pub provider: EmbedProviderKind,
    pub model_dir: Option<String>,
    pub dim: usize,
    pub timeout_ms: u64,
}

impl Default for EmbedSettings {
    fn default() -> Self { Self { provider: EmbedProviderKind::Hashed, model_dir: None, dim: 512, timeout_ms: 5_000 } }
}

impl EmbedSettings {
    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub related_items: usize,
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self { Self { related_items: 4, default_limit: 20, max_limit: 100 } }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// 0 disables the category-embedding cache.
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub fetch_timeout_ms: u64,
}

impl Default for ImageSettings {
    fn default() -> Self { Self { fetch_timeout_ms: 5_000 } }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub vector: VectorSettings,
    pub embed: EmbedSettings,
    pub search: SearchSettings,
    pub classifier: ClassifierSettings,
    pub images: ImageSettings,
}

impl Settings {
    pub fn validate(&self) -> crate::Result<()> {
        let invalid = |msg: &str| Err(crate::Error::InvalidConfig(msg.to_string()));
        if self.embed.dim == 0 { return invalid("embed.dim must be positive"); }
        if self.embed.timeout_ms == 0 { return invalid("embed.timeout_ms must be positive"); }
        if self.search.max_limit == 0 { return invalid("search.max_limit must be positive"); }
        if self.search.default_limit == 0 || self.search.default_limit > self.search.max_limit {
            return invalid("search.default_limit must be within 1..=search.max_limit");
        }
        if self.embed.provider == EmbedProviderKind::Clip && self.embed.model_dir.is_none() {
            return invalid("embed.model_dir is required for the clip provider");
        }
        Ok(())
    }

    /// Relative data paths resolve against `base`, usually the config file's directory.
    pub fn catalog_path(&self, base: &Path) -> PathBuf { resolve_with_base(base, &self.data.catalog_path) }
    pub fn lancedb_dir(&self, base: &Path) -> PathBuf { resolve_with_base(base, &self.data.lancedb_dir) }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.search.related_items, 4);
        assert_eq!(settings.embed.provider, EmbedProviderKind::Hashed);
    }

    #[test]
    fn clip_requires_model_dir() {
        let mut settings = Settings::default();
        settings.embed.provider = EmbedProviderKind::Clip;
        assert!(matches!(settings.validate(), Err(crate::Error::InvalidConfig(_))));
    }

    #[test]
    fn resolve_relative_against_base() {
        let base = Path::new("/srv/shop");
        assert_eq!(resolve_with_base(base, "data/catalog.json"), PathBuf::from("/srv/shop/data/catalog.json"));
        assert_eq!(resolve_with_base(base, "/abs/x"), PathBuf::from("/abs/x"));
    }
}
