use std::sync::Arc;

use domains::{DomainResult, ServiceStatus, StatusRepository};
use tracing::{instrument, warn};

pub struct StatusService {
    repo: Arc<dyn StatusRepository>,
}

impl StatusService {
    pub fn new(repo: Arc<dyn StatusRepository>) -> Self {
        Self { repo }
    }

    pub async fn status(&self) -> DomainResult<ServiceStatus> {
        self.repo.status().await
    }

    /// Drops every user, forum, thread, post and vote.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> DomainResult<()> {
        warn!("clearing all forum data");
        self.repo.clear().await
    }
}
