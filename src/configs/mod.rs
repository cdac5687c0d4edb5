use std::{sync::Arc, time::Duration};

use crate::{
    api::error,
    constants::{Env, HostBackend, IndexBackend},
    modules::{
        image::{
            repository::ImageRepository, repository_github::ImageRepositoryGithub,
            repository_memory::ImageRepositoryMemory,
        },
        upstream::{ContentsClient, GithubHost, ImageHost, QuaxHost},
    },
};

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

pub fn http_client() -> Result<reqwest::Client, error::SystemError> {
    let client = reqwest::Client::builder().timeout(UPSTREAM_TIMEOUT).build()?;
    Ok(client)
}

/// Host and index selected by the environment.
pub struct Backends {
    pub host: Arc<dyn ImageHost + Send + Sync>,
    pub repo: Arc<dyn ImageRepository + Send + Sync>,
}

pub fn build_backends(env: &Env, http: reqwest::Client) -> Result<Backends, error::SystemError> {
    // Both github backends share one contents client.
    let contents =
        env.github.as_ref().map(|github| Arc::new(ContentsClient::new(http.clone(), github)));
    let require_contents = || {
        contents
            .clone()
            .ok_or_else(|| error::SystemError::invalid_config("GitHub settings are missing"))
    };

    let host: Arc<dyn ImageHost + Send + Sync> = match env.image_host {
        HostBackend::Quax => Arc::new(QuaxHost::new(
            http,
            env.quax_upload_url.clone(),
            env.quax_referer.clone(),
        )),
        HostBackend::Github => Arc::new(GithubHost::new(require_contents()?)),
    };

    let repo: Arc<dyn ImageRepository + Send + Sync> = match (env.image_index, &env.github) {
        (IndexBackend::Memory, _) => Arc::new(ImageRepositoryMemory::new()),
        (IndexBackend::Github, Some(github)) => {
            Arc::new(ImageRepositoryGithub::new(require_contents()?, github.index_path.clone()))
        }
        (IndexBackend::Github, None) => {
            return Err(error::SystemError::invalid_config("GitHub settings are missing"))
        }
    };

    log::info!("Using {} host with {} index", host.name(), repo.name());
    Ok(Backends { host, repo })
}
