//! Public profile pages.

use crate::entities::Profile;
use crate::repositories::Repositories;
use crate::services::Identity;
use crate::types::{AuthError, AuthResult};
use crate::urls;

#[derive(Clone)]
pub struct ProfileService {
    repositories: Repositories,
}

impl ProfileService {
    pub fn new(repositories: Repositories) -> Self {
        Self { repositories }
    }

    /// URL of the caller's own profile page.
    pub fn index(&self, identity: &Identity) -> AuthResult<String> {
        identity
            .id()
            .map(urls::profile)
            .ok_or_else(|| AuthError::Forbidden("Login required".into()))
    }

    pub async fn show(&self, id: i64) -> AuthResult<Profile> {
        self.repositories
            .finder
            .find_profile_by_id(id)
            .await?
            .ok_or_else(|| AuthError::NotFound("Page not found".into()))
    }
}
