use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use platewise_core::gemini::DEFAULT_MODEL;
use platewise_core::identity::AllowList;
use std::path::{Path, PathBuf};

const ALLOWED_EMAILS_ENV: &str = "PLATEWISE_ALLOWED_EMAILS";
const ALLOWED_EMAILS_FILE: &str = "allowed_emails";
const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
const GEMINI_MODEL_ENV: &str = "PLATEWISE_GEMINI_MODEL";

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub allow_list: AllowList,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "platewise").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("platewise.db");
        let allow_list = load_allow_list(std::env::var(ALLOWED_EMAILS_ENV).ok(), &data_dir)?;

        Ok(Config {
            db_path,
            allow_list,
            gemini_api_key: non_empty_env(GEMINI_API_KEY_ENV),
            gemini_model: non_empty_env(GEMINI_MODEL_ENV)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            data_dir,
        })
    }

    pub fn require_api_key(&self) -> Result<&str> {
        match self.gemini_api_key.as_deref() {
            Some(key) => Ok(key),
            None => bail!("{GEMINI_API_KEY_ENV} is not set. Get a key from Google AI Studio and export it"),
        }
    }

    pub fn allowed_emails_path(&self) -> PathBuf {
        self.data_dir.join(ALLOWED_EMAILS_FILE)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The environment variable wins over the file in the data directory.
fn load_allow_list(from_env: Option<String>, data_dir: &Path) -> Result<AllowList> {
    if let Some(list) = from_env.filter(|v| !v.trim().is_empty()) {
        return Ok(AllowList::parse(&list));
    }
    let path = data_dir.join(ALLOWED_EMAILS_FILE);
    if !path.exists() {
        return Ok(AllowList::default());
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(AllowList::parse(&text))
}
