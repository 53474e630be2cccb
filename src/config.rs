use crate::storage::{BackendLocal, StorageManager};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default semantic model: multilingual paraphrase MiniLM (Ukrainian + Latin)
const DEFAULT_SEMANTIC_MODEL: &str = crate::semantic::DEFAULT_MODEL;
/// Default model download timeout in seconds
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
/// Default OCR binary and language pack
const DEFAULT_OCR_COMMAND: &str = "tesseract";
const DEFAULT_OCR_LANGUAGES: &str = "ukr+eng";

/// Configuration for the embedding side of search
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SemanticConfig {
    /// Enable or disable semantic search
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Model name for embeddings
    #[serde(default = "default_semantic_model")]
    pub model: String,

    /// Timeout for model download in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: DEFAULT_SEMANTIC_MODEL.to_string(),
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

/// Configuration for screenshot text extraction
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// OCR binary to invoke
    #[serde(default = "default_ocr_command")]
    pub command: String,

    /// Language packs passed to the engine, e.g. "ukr+eng"
    #[serde(default = "default_ocr_languages")]
    pub languages: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: DEFAULT_OCR_COMMAND.to_string(),
            languages: DEFAULT_OCR_LANGUAGES.to_string(),
        }
    }
}

/// Curator credentials. With an empty password hash the CLI runs in open
/// single-user mode; the daemon then refuses mutating requests.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password_salt: String,
    #[serde(default)]
    pub password_hash: String,

    /// Bearer token accepted by the daemon for mutating requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

impl AuthConfig {
    pub fn has_password(&self) -> bool {
        !self.password_hash.is_empty() && !self.password_salt.is_empty()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub semantic_search: SemanticConfig,
    #[serde(default)]
    pub ocr: OcrConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_semantic_model() -> String {
    DEFAULT_SEMANTIC_MODEL.to_string()
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_ocr_command() -> String {
    DEFAULT_OCR_COMMAND.to_string()
}

fn default_ocr_languages() -> String {
    DEFAULT_OCR_LANGUAGES.to_string()
}

/// Data directory: $DOVIDKA_BASE_PATH, or ~/.local/share/dovidka.
pub fn base_path() -> PathBuf {
    if let Ok(path) = std::env::var("DOVIDKA_BASE_PATH") {
        return PathBuf::from(path);
    }

    homedir::my_home()
        .expect("couldnt find home dir")
        .expect("couldnt find home dir")
        .join(".local/share/dovidka")
}

impl Config {
    fn validate(&self) {
        if self.semantic_search.download_timeout_secs == 0 {
            panic!("semantic_search.download_timeout_secs must be greater than 0");
        }

        if self.ocr.enabled {
            if self.ocr.command.trim().is_empty() {
                panic!("ocr.command must not be empty while ocr is enabled");
            }
            if self.ocr.languages.trim().is_empty() {
                panic!("ocr.languages must not be empty while ocr is enabled");
            }
        }

        if self.auth.password_hash.is_empty() != self.auth.password_salt.is_empty() {
            panic!("auth.password_hash and auth.password_salt must be set together");
        }
    }

    pub fn load() -> Self {
        Self::load_with(&base_path())
    }

    pub fn load_with(base_path: &Path) -> Self {
        let store = BackendLocal::new(base_path).expect("couldnt create data directory");

        // create new if does not exist
        if !store.exists("config.yaml") {
            if let Err(err) = store.write(
                "config.yaml",
                serde_yml::to_string(&Self::default()).unwrap().as_bytes(),
            ) {
                log::error!("couldnt write default config: {err}");
            }
        }

        let config_str = String::from_utf8(store.read("config.yaml").expect("couldnt read config"))
            .expect("config file is not valid utf8");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path.to_path_buf();

        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).unwrap() {
            config.save();
        }

        config
    }

    pub fn save(&self) {
        let store = BackendLocal::new(&self.base_path).expect("couldnt create data directory");

        let config_str = serde_yml::to_string(&self).unwrap();
        if let Err(err) = store.write("config.yaml", config_str.as_bytes()) {
            log::error!("couldnt save config: {err}");
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.base_path.join("uploads")
    }
}
