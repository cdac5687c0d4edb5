use std::str::FromStr;

use crate::api::error::SystemError;

/// Where uploaded bytes are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostBackend {
    Quax,
    Github,
}

/// Where upload records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBackend {
    Memory,
    Github,
}

impl FromStr for HostBackend {
    type Err = SystemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quax" | "qu.ax" => Ok(HostBackend::Quax),
            "github" => Ok(HostBackend::Github),
            other => Err(SystemError::invalid_config(format!(
                "IMAGE_HOST must be 'quax' or 'github', got '{other}'"
            ))),
        }
    }
}

impl FromStr for IndexBackend {
    type Err = SystemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(IndexBackend::Memory),
            "github" => Ok(IndexBackend::Github),
            other => Err(SystemError::invalid_config(format!(
                "IMAGE_INDEX must be 'memory' or 'github', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GithubEnv {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub api_url: String,
    pub raw_url: String,
    pub index_path: String,
}

#[derive(Debug, Clone)]
pub struct Env {
    pub ip: String,
    pub port: u16,
    pub website_base_url: String,
    pub cors_origin: Option<String>,
    pub image_host: HostBackend,
    pub image_index: IndexBackend,
    pub quax_upload_url: String,
    pub quax_referer: String,
    /// Present only when a github backend is selected.
    pub github: Option<GithubEnv>,
}

impl Env {
    pub fn load() -> Result<Self, SystemError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, SystemError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| {
            lookup(key).filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string())
        };

        let ip = var_or("IP", "127.0.0.1");
        let port = var_or("PORT", "3000")
            .parse::<u16>()
            .map_err(|_| SystemError::invalid_config("PORT must be a valid u16 integer"))?;

        let website_base_url = var_or("WEBSITE_BASE_URL", "http://localhost:3000");
        let cors_origin = lookup("CORS_ORIGIN").filter(|v| !v.trim().is_empty());

        let image_host = var_or("IMAGE_HOST", "quax").parse::<HostBackend>()?;
        let image_index = var_or("IMAGE_INDEX", "memory").parse::<IndexBackend>()?;

        let quax_upload_url = var_or("QUAX_UPLOAD_URL", "https://qu.ax/upload.php");
        let quax_referer = var_or("QUAX_REFERER", "https://qu.ax/");

        let github = if image_host == HostBackend::Github || image_index == IndexBackend::Github {
            let required = |key: &str| {
                lookup(key).filter(|v| !v.trim().is_empty()).ok_or_else(|| {
                    SystemError::invalid_config(format!(
                        "{key} must be set when a github backend is selected"
                    ))
                })
            };
            Some(GithubEnv {
                token: required("GITHUB_TOKEN")?,
                owner: required("GITHUB_OWNER")?,
                repo: required("GITHUB_REPO")?,
                branch: var_or("GITHUB_BRANCH", "main"),
                api_url: var_or("GITHUB_API_URL", "https://api.github.com"),
                raw_url: var_or("GITHUB_RAW_URL", "https://raw.githubusercontent.com"),
                index_path: var_or("GITHUB_INDEX_PATH", "gallery-index.json"),
            })
        } else {
            None
        };

        Ok(Env {
            ip,
            port,
            website_base_url,
            cors_origin,
            image_host,
            image_index,
            quax_upload_url,
            quax_referer,
            github,
        })
    }
}
