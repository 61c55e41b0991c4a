use std::path::Path;

use jobwatch_api::{AdminCredentials, ApiConfig};
use jobwatch_stream::HttpSourceConfig;

/// Loads `.env` from the crate directory (development) and the working
/// directory. Missing files are fine.
pub fn init_env() {
    let _ = dotenvy::from_path(Path::new(
        format!("{}/.env", env!("CARGO_MANIFEST_DIR")).as_str(),
    ));
    dotenvy::dotenv().ok();
}

/// Connection settings resolved from flags and environment.
#[derive(Clone, Debug)]
pub struct ClientSettings {
    pub base_url: String,
}

impl ClientSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn api(&self) -> ApiConfig {
        ApiConfig::new(self.base_url.clone())
    }

    pub fn stream(&self) -> HttpSourceConfig {
        HttpSourceConfig::new(self.base_url.clone())
    }
}

/// Builds an admin session from flag/env values; `None` when either part is
/// missing.
pub fn admin_session(user: Option<String>, password: Option<String>) -> Option<AdminCredentials> {
    let user = user.filter(|u| !u.trim().is_empty())?;
    let password = password.filter(|p| !p.is_empty())?;
    Some(AdminCredentials::new(user.trim(), password))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_session_needs_both_parts() {
        assert!(admin_session(Some("admin".into()), None).is_none());
        assert!(admin_session(Some("  ".into()), Some("pw".into())).is_none());
        let session = admin_session(Some(" admin ".into()), Some("pw".into())).expect("session");
        assert_eq!(session.username, "admin");
    }

    #[test]
    fn settings_share_one_base_url() {
        let settings = ClientSettings::new("http://backend.test");
        assert_eq!(settings.api().base_url, "http://backend.test");
        assert_eq!(settings.stream().base_url, "http://backend.test");
    }
}
