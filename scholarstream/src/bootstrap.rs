use std::fmt;
use std::path::Path;

use scholarstream_core::config::DefaultSecretResolver;
use scholarstream_core::{init_tracing, ClientError, ClientSettings, ConfigError, ScholarConfig};
use scholarstream_security::{IdentityProvider, SessionStore};
use scholarstream_views::AppContext;
use tracing::info;

#[derive(Debug)]
pub enum BootstrapError {
    Config(ConfigError),
    Client(ClientError),
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::Config(err) => write!(f, "Configuration error: {err}"),
            BootstrapError::Client(err) => write!(f, "Client setup failed: {err}"),
        }
    }
}

impl std::error::Error for BootstrapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BootstrapError::Config(err) => Some(err),
            BootstrapError::Client(err) => Some(err),
        }
    }
}

impl From<ConfigError> for BootstrapError {
    fn from(err: ConfigError) -> Self {
        BootstrapError::Config(err)
    }
}

impl From<ClientError> for BootstrapError {
    fn from(err: ClientError) -> Self {
        BootstrapError::Client(err)
    }
}

/// Load configuration for `profile` from the working directory, install
/// logging, start the session store on `provider` and build the context.
///
/// Must be called within a Tokio runtime.
pub fn bootstrap<P: IdentityProvider>(profile: &str, provider: P) -> Result<AppContext, BootstrapError> {
    bootstrap_from(Path::new("."), profile, provider)
}

/// [`bootstrap`] reading configuration files from `dir`.
pub fn bootstrap_from<P: IdentityProvider>(
    dir: &Path,
    profile: &str,
    provider: P,
) -> Result<AppContext, BootstrapError> {
    init_tracing();
    let config = ScholarConfig::load_from(dir, profile, &DefaultSecretResolver)?;
    let settings = ClientSettings::from_config(&config)?;
    info!(
        profile = config.profile(),
        api = %settings.api.base_url,
        "Starting ScholarStream client"
    );
    let session = SessionStore::start(provider);
    Ok(AppContext::new(settings, session)?)
}
