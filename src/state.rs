use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::{self, Repository};
use crate::mail::{LogMailer, Mailer};
use crate::storage::{LocalUploadStore, UploadStore};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub config: Arc<AppConfig>,
    pub uploads: Arc<dyn UploadStore>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let repo = db::connect(&config).await?;
        repo.migrate().await?;

        let uploads =
            Arc::new(LocalUploadStore::new(config.upload_dir())?) as Arc<dyn UploadStore>;
        let mailer = Arc::new(LogMailer::new(&config.mail)) as Arc<dyn Mailer>;

        Ok(Self::from_parts(repo, config, uploads, mailer))
    }

    pub fn from_parts(
        repo: Arc<dyn Repository>,
        config: Arc<AppConfig>,
        uploads: Arc<dyn UploadStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            repo,
            config,
            uploads,
            mailer,
        }
    }
}
