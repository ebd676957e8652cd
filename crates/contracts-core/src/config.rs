//! Settings loader and path helpers.
//!
//! Uses Figment to merge defaults + `config.toml` + `config.<env>.toml` + the
//! plain variables from `.env`/environment + `APP_*` overrides.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::loader::PdfLoader;

/// Unprefixed environment variables understood by [`Settings::load`].
pub const ENV_KEYS: &[&str] = &[
    "PDF_PATH",
    "PERSIST_DIR",
    "MODEL_NAME",
    "CHUNK_SIZE",
    "CHUNK_OVERLAP",
    "COLLECTION_NAME",
    "GROQ_API_KEY",
    "GROQ_MODEL_NAME",
    "PDF_LOADER",
    "TOP_K",
];

/// The subset of [`ENV_KEYS`] taken verbatim, so `COLLECTION_NAME=2024` stays a string.
const TEXT_KEYS: &[&str] = &[
    "PDF_PATH",
    "PERSIST_DIR",
    "MODEL_NAME",
    "COLLECTION_NAME",
    "GROQ_API_KEY",
    "GROQ_MODEL_NAME",
    "PDF_LOADER",
];

/// Process-wide settings, loaded once at startup and passed explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pdf_path: Option<PathBuf>,
    pub persist_dir: PathBuf,
    pub model_name: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub collection_name: Option<String>,
    #[serde(skip_serializing)]
    pub groq_api_key: Option<String>,
    pub groq_model_name: String,
    pub groq_base_url: String,
    pub pdf_loader: String,
    pub top_k: usize,
    #[serde(deserialize_with = "flag")]
    pub use_fake_embeddings: bool,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pdf_path: None,
            persist_dir: PathBuf::from("vector_db"),
            model_name: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            chunk_size: 1024,
            chunk_overlap: 100,
            collection_name: None,
            groq_api_key: None,
            groq_model_name: "llama-3.1-8b-instant".to_string(),
            groq_base_url: "https://api.groq.com/openai/v1".to_string(),
            pdf_loader: PdfLoader::Lopdf.name().to_string(),
            top_k: 5,
            use_fake_embeddings: false,
            server: ServerSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8501 }
    }
}

impl Settings {
    /// Load `.env`, then merge defaults, `config.toml`, `config.<RUST_ENV>.toml`,
    /// the plain variables in [`ENV_KEYS`] and `APP_*` variables.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        let text: BTreeMap<String, String> =
            Env::raw().only(TEXT_KEYS).iter().map(|(key, value)| (key.as_str().to_string(), value)).collect();
        figment
            .merge(Env::raw().only(ENV_KEYS).ignore(TEXT_KEYS))
            .merge(Serialized::defaults(text))
            .merge(Env::prefixed("APP_").split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let mut settings: Settings = figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.persist_dir = expand_path(settings.persist_dir.to_string_lossy());
        settings.pdf_path = settings.pdf_path.filter(|p| !p.as_os_str().is_empty()).map(|p| expand_path(p.to_string_lossy()));
        settings.collection_name = non_blank(settings.collection_name);
        settings.groq_api_key = non_blank(settings.groq_api_key);
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::InvalidConfig("TOP_K must be greater than zero".to_string()));
        }
        if self.model_name.trim().is_empty() {
            return Err(Error::MissingSetting("MODEL_NAME"));
        }
        Ok(())
    }

    pub fn loader(&self) -> Result<PdfLoader> {
        self.pdf_loader.parse()
    }

    pub fn require_pdf_path(&self) -> Result<&Path> {
        self.pdf_path.as_deref().ok_or(Error::MissingSetting("PDF_PATH"))
    }

    pub fn require_groq_api_key(&self) -> Result<&str> {
        self.groq_api_key.as_deref().ok_or(Error::MissingSetting("GROQ_API_KEY"))
    }

    /// `COLLECTION_NAME` when set, otherwise the sanitised file stem of `pdf`.
    pub fn collection_for(&self, pdf: &Path) -> String {
        match &self.collection_name {
            Some(name) => sanitize_collection_name(name),
            None => {
                let stem = pdf.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
                sanitize_collection_name(&stem)
            }
        }
    }

    /// Collection used by query commands when none is given explicitly.
    pub fn default_collection(&self) -> Option<String> {
        self.collection_name
            .as_deref()
            .map(sanitize_collection_name)
            .or_else(|| self.pdf_path.as_deref().map(|p| self.collection_for(p)))
    }
}

/// Restrict a collection name to `[A-Za-z0-9_.-]`, which every store backend accepts.
pub fn sanitize_collection_name(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "documents".to_string() } else { cleaned }
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

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Accepts `true`/`false`, `1`/`0`, and `yes`/`no`, since env values arrive in all three shapes.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
        Flag::Text(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_apply_without_environment() {
        Jail::expect_with(|_jail| {
            let settings = Settings::from_figment(Settings::figment()).map_err(|e| e.to_string())?;
            assert_eq!(settings.chunk_size, 1024);
            assert_eq!(settings.chunk_overlap, 100);
            assert_eq!(settings.top_k, 5);
            assert_eq!(settings.model_name, "sentence-transformers/all-MiniLM-L6-v2");
            assert!(settings.groq_api_key.is_none());
            assert!(!settings.use_fake_embeddings);
            Ok(())
        });
    }

    #[test]
    fn plain_and_prefixed_variables_override_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("CHUNK_SIZE", "500");
            jail.set_env("CHUNK_OVERLAP", "50");
            jail.set_env("TOP_K", "3");
            jail.set_env("GROQ_API_KEY", "gsk_test");
            jail.set_env("PDF_PATH", "contracts/Construction_Agreement.pdf");
            jail.set_env("APP_USE_FAKE_EMBEDDINGS", "1");
            jail.set_env("APP_SERVER__PORT", "9000");
            let settings = Settings::from_figment(Settings::figment()).map_err(|e| e.to_string())?;
            assert_eq!(settings.chunk_size, 500);
            assert_eq!(settings.chunk_overlap, 50);
            assert_eq!(settings.top_k, 3);
            assert_eq!(settings.groq_api_key.as_deref(), Some("gsk_test"));
            assert!(settings.use_fake_embeddings);
            assert_eq!(settings.server.port, 9000);
            assert_eq!(settings.default_collection().as_deref(), Some("Construction_Agreement"));
            Ok(())
        });
    }

    #[test]
    fn numeric_looking_text_values_stay_strings() {
        Jail::expect_with(|jail| {
            jail.set_env("COLLECTION_NAME", "2024");
            jail.set_env("PERSIST_DIR", "123");
            jail.set_env("GROQ_API_KEY", "0042");
            jail.set_env("TOP_K", "4");
            let settings = Settings::from_figment(Settings::figment()).map_err(|e| e.to_string())?;
            assert_eq!(settings.collection_name.as_deref(), Some("2024"));
            assert_eq!(settings.default_collection().as_deref(), Some("2024"));
            assert_eq!(settings.persist_dir, PathBuf::from("123"));
            assert_eq!(settings.groq_api_key.as_deref(), Some("0042"));
            assert_eq!(settings.top_k, 4);
            Ok(())
        });
    }

    #[test]
    fn toml_file_is_merged_below_environment() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "top_k = 7\npersist_dir = \"store\"\n")?;
            jail.set_env("TOP_K", "2");
            let settings = Settings::from_figment(Settings::figment()).map_err(|e| e.to_string())?;
            assert_eq!(settings.top_k, 2);
            assert_eq!(settings.persist_dir, PathBuf::from("store"));
            Ok(())
        });
    }

    #[test]
    fn invalid_number_names_the_variable() {
        Jail::expect_with(|jail| {
            jail.set_env("CHUNK_SIZE", "lots");
            let err = Settings::from_figment(Settings::figment()).expect_err("invalid CHUNK_SIZE");
            assert!(matches!(err, Error::InvalidConfig(_)));
            assert!(err.to_string().to_lowercase().contains("chunk_size"), "{err}");
            Ok(())
        });
    }

    #[test]
    fn zero_top_k_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("TOP_K", "0");
            let err = Settings::from_figment(Settings::figment()).expect_err("TOP_K=0");
            assert!(err.to_string().contains("TOP_K"));
            Ok(())
        });
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        Jail::expect_with(|jail| {
            jail.set_env("GROQ_API_KEY", "  ");
            let settings = Settings::from_figment(Settings::figment()).map_err(|e| e.to_string())?;
            let err = settings.require_groq_api_key().expect_err("blank key");
            assert!(matches!(err, Error::MissingSetting("GROQ_API_KEY")));
            Ok(())
        });
    }

    #[test]
    fn collection_names_are_sanitised() {
        let settings = Settings::default();
        assert_eq!(settings.collection_for(Path::new("/data/Construction Contract (v2).pdf")), "Construction_Contract__v2_");
        assert_eq!(settings.collection_for(Path::new("sample.pdf")), "sample");
        let named = Settings { collection_name: Some("Sample".into()), ..Settings::default() };
        assert_eq!(named.collection_for(Path::new("other.pdf")), "Sample");
        assert_eq!(sanitize_collection_name("   "), "documents");
    }
}
