//! Users loaded into the in-memory directory at startup.

use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use usergate_auth::hash_password;
use usergate_users::{
    Finder, MemoryDirectory, NewUser, Profile, ProfileData, ProfileForm, User, UserStore,
};

#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub username: String,
    pub email: String,
    /// Plain text; hashed before it is stored.
    pub password: Option<String>,
    #[serde(default = "default_confirmed")]
    pub confirmed: bool,
    #[serde(default)]
    pub blocked: bool,
    pub profile: Option<ProfileData>,
}

fn default_confirmed() -> bool {
    true
}

pub fn load_seed(path: &Path) -> Result<SeedFile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid seed file {}", path.display()))
}

/// Inserts every seeded user, stopping at the first one that is rejected.
pub async fn apply_seed(directory: &MemoryDirectory, seed: SeedFile) -> Result<Vec<User>> {
    let mut inserted = Vec::with_capacity(seed.users.len());

    for entry in seed.users {
        let mut new_user = NewUser::new(&entry.username, &entry.email);
        if let Some(password) = &entry.password {
            let hash = hash_password(password)
                .map_err(|err| anyhow!("failed to hash password of {}: {err}", entry.username))?;
            new_user = new_user.with_password_hash(hash);
        }
        if !entry.confirmed {
            new_user = new_user.unconfirmed();
        }
        if entry.blocked {
            new_user = new_user.blocked();
        }

        let user = directory
            .insert_user(new_user)
            .await
            .with_context(|| format!("failed to seed user {}", entry.username))?;

        if let Some(data) = &entry.profile {
            let profile = directory
                .find_profile_by_id(user.id)
                .await?
                .unwrap_or_else(|| Profile::for_user(user.id));
            let mut form = ProfileForm::new(profile);
            if form.load(data) && !form.validate() {
                let message = form
                    .errors
                    .to_list()
                    .into_iter()
                    .map(|error| format!("{}: {}", error.field, error.message))
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(anyhow!("invalid profile for {}: {message}", entry.username));
            }
            directory.save_profile(&form.profile).await?;
        }

        inserted.push(user);
    }

    Ok(inserted)
}
