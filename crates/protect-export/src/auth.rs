//! Session authentication against the appliance's login endpoint.

use tracing::{debug, info};

use crate::client::{CookieJar, HttpClient};
use crate::config::ExportConfig;
use crate::error::ExportError;

/// Login credentials for the appliance, supplied once per job.
#[derive(Clone)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep the password out of logs and error output.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Exchange credentials for a fresh session cookie jar.
///
/// Appliance sessions expire over multi-hour export jobs, so this is called
/// before every chunk download rather than once per job; a login round-trip
/// is negligible next to a chunk transfer.
pub async fn authenticate(
    client: &HttpClient,
    config: &ExportConfig,
    credential: &Credential,
) -> Result<CookieJar, ExportError> {
    let url = config.login_url();
    debug!(url = %url, username = %credential.username, "logging in");

    let form = [
        ("username", credential.username.as_str()),
        ("password", credential.password.as_str()),
    ];
    let (_, cookies) = client
        .post_form(&url, &CookieJar::new(), &form)
        .await
        .map_err(|e| ExportError::Authentication {
            url: url.to_string(),
            source: Box::new(e),
        })?;

    info!(url = %url, cookies = cookies.len(), "authenticated");
    Ok(cookies)
}
