//! Paths of the user REST surface, used for redirects.

pub const BASE: &str = "/api/user";
pub const NETWORKS: &str = "/api/user/settings/networks";
pub const ACCOUNT_SETTINGS: &str = "/api/user/settings/account";
pub const PROFILE_SETTINGS: &str = "/api/user/settings/profile";

pub fn profile(user_id: i64) -> String {
    format!("{BASE}/profile/{user_id}")
}
