use std::time::Duration;

use url::Url;

use super::{ConfigError, ScholarConfig};

pub const DEFAULT_API_URL: &str = "http://localhost:3001/";

const MEDIA_UPLOAD_HOST: &str = "https://api.cloudinary.com/v1_1";

/// Typed client settings read from a [`ScholarConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub api: ApiSettings,
    pub media: MediaSettings,
    pub cache: CacheSettings,
}

/// Which REST API instance to call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiSettings {
    /// Base address; always ends with `/` so relative paths join under it.
    pub base_url: Url,
    /// Per-request timeout. `None` leaves the transport default in place.
    pub timeout: Option<Duration>,
}

/// Which media-host account receives uploads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaSettings {
    pub cloud_name: Option<String>,
    pub upload_preset: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSettings {
    /// Upper bound on how long a successful entry stays fresh.
    /// `None` keeps entries fresh until they are invalidated.
    pub ttl: Option<Duration>,
}

impl ClientSettings {
    /// Settings pointing at `base_url` with everything else defaulted.
    pub fn for_base_url(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api: ApiSettings {
                base_url: parse_base_url("scholarstream.api.url", base_url)?,
                timeout: None,
            },
            media: MediaSettings::default(),
            cache: CacheSettings::default(),
        })
    }

    pub fn from_config(config: &ScholarConfig) -> Result<Self, ConfigError> {
        let raw_url: String = config
            .get_opt("scholarstream.api.url")?
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let base_url = parse_base_url("scholarstream.api.url", &raw_url)?;

        let timeout = config
            .get_opt::<u64>("scholarstream.api.timeout")?
            .map(Duration::from_secs);

        let media = MediaSettings {
            cloud_name: non_empty(config.get_opt("scholarstream.media.cloud")?),
            upload_preset: non_empty(config.get_opt("scholarstream.media.preset")?),
        };

        let cache = CacheSettings {
            ttl: config
                .get_opt::<u64>("scholarstream.cache.ttl")?
                .map(Duration::from_secs),
        };

        Ok(Self {
            api: ApiSettings { base_url, timeout },
            media,
            cache,
        })
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api: ApiSettings {
                base_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
                timeout: None,
            },
            media: MediaSettings::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl MediaSettings {
    pub fn is_configured(&self) -> bool {
        self.cloud_name.is_some() && self.upload_preset.is_some()
    }

    /// Upload endpoint for the configured account.
    pub fn upload_endpoint(&self) -> Option<String> {
        if !self.is_configured() {
            return None;
        }
        self.cloud_name
            .as_deref()
            .map(|cloud| format!("{MEDIA_UPLOAD_HOST}/{cloud}/image/upload"))
    }
}

/// A hosted image URL handed back by the media upload widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedImage(Url);

impl HostedImage {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
            key: "image".into(),
            message: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(Self(url)),
            other => Err(ConfigError::Invalid {
                key: "image".into(),
                message: format!("unsupported scheme '{other}'"),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn into_string(self) -> String {
        self.0.into()
    }
}

fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    let url = Url::parse(&normalized).map_err(|e| ConfigError::Invalid {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Invalid {
            key: key.to_string(),
            message: format!("unsupported scheme '{other}'"),
        }),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
