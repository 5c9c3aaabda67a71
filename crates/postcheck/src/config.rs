//! Configuration for postcheck sessions.
//!
//! Every field has a default, so an empty TOML file (or none at all) is a
//! valid configuration. The two service profiles are the only parts that
//! must be filled in before talking to the external service.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use postcheck_core::{BatchSampler, DEFAULT_BATCH_SIZE};
use postcheck_oracle::ServiceProfile;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{PostcheckError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostcheckConfig {
    pub paths: PathsConfig,
    pub session: SessionConfig,
    /// Address -> postcode lookup service.
    #[serde(deserialize_with = "lookup_profile")]
    pub lookup: ServiceProfile,
    /// Postcode -> post office address service.
    #[serde(deserialize_with = "post_office_profile")]
    pub post_office: ServiceProfile,
}

impl Default for PostcheckConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            session: SessionConfig::default(),
            lookup: ServiceProfile::address_lookup(""),
            post_office: ServiceProfile::post_office_finder(""),
        }
    }
}

/// Profile keys given in a configuration file. Keys left out keep the
/// value of the service's preset; header and cookie tables are merged into it.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileOverrides {
    endpoint: Option<String>,
    headers: Option<BTreeMap<String, String>>,
    cookies: Option<BTreeMap<String, String>>,
    timeout_secs: Option<u64>,
    body_template: Option<String>,
    result_pointer: Option<String>,
}

impl ProfileOverrides {
    fn apply(self, mut base: ServiceProfile) -> ServiceProfile {
        if let Some(endpoint) = self.endpoint {
            base.endpoint = endpoint;
        }
        base.headers.extend(self.headers.unwrap_or_default());
        base.cookies.extend(self.cookies.unwrap_or_default());
        if let Some(timeout_secs) = self.timeout_secs {
            base.timeout_secs = timeout_secs;
        }
        if let Some(body_template) = self.body_template {
            base.body_template = body_template;
        }
        if let Some(result_pointer) = self.result_pointer {
            base.result_pointer = result_pointer;
        }
        base
    }
}

fn lookup_profile<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<ServiceProfile, D::Error> {
    Ok(ProfileOverrides::deserialize(d)?.apply(ServiceProfile::address_lookup("")))
}

fn post_office_profile<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<ServiceProfile, D::Error> {
    Ok(ProfileOverrides::deserialize(d)?.apply(ServiceProfile::post_office_finder("")))
}

/// Where every input and output lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Primary verification cache.
    pub cache: PathBuf,
    /// Reverse verification cache.
    pub hopeless_cache: PathBuf,
    /// Classification report.
    pub summary: PathBuf,
    /// Compiled list of confirmed postcodes.
    pub reference_list: PathBuf,
    /// SQLite address directory.
    pub directory: PathBuf,
    /// Secondary registry: one postcode per line.
    pub registry: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache: "cache.csv".into(),
            hopeless_cache: "hopeless_cache.csv".into(),
            summary: "summary.csv".into(),
            reference_list: "reference_list.csv".into(),
            directory: "fias.db".into(),
            registry: "registry.csv".into(),
        }
    }
}

/// Knobs of the verification loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Maximum oracle calls per postcode per session.
    pub batch_size: usize,
    /// Pause between consecutive oracle calls.
    pub request_delay_ms: u64,
    /// Fixed sampling seed. Random when absent.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            request_delay_ms: 0,
            seed: None,
        }
    }
}

impl SessionConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn sampler(&self) -> Result<BatchSampler> {
        Ok(BatchSampler::new(self.batch_size)?)
    }
}

impl PostcheckConfig {
    /// Load and validate a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PostcheckError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
            .map_err(|e| PostcheckError::Config(format!("{}: {e}", path.display())))
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| PostcheckError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.session.batch_size == 0 {
            return Err(PostcheckError::Config(
                "session.batch_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = PostcheckConfig::from_toml("").unwrap();
        assert_eq!(config, PostcheckConfig::default());
        assert_eq!(config.session.batch_size, 500);
        assert_eq!(config.paths.cache, PathBuf::from("cache.csv"));
        assert_eq!(config.post_office.result_pointer, "/address/fullAddress");
    }

    #[test]
    fn test_partial_document() {
        let config = PostcheckConfig::from_toml(
            r#"
            [paths]
            cache = "/var/lib/postcheck/cache.csv"

            [session]
            batch_size = 50
            request_delay_ms = 250

            [lookup]
            endpoint = "https://lookup.example/by-address"

            [lookup.cookies]
            JSESSIONID = "abc"

            [post_office]
            endpoint = "https://offices.example/find"
            timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.paths.cache, PathBuf::from("/var/lib/postcheck/cache.csv"));
        assert_eq!(config.paths.summary, PathBuf::from("summary.csv"));
        assert_eq!(config.session.batch_size, 50);
        assert_eq!(config.session.request_delay(), Duration::from_millis(250));
        assert_eq!(config.lookup.cookies["JSESSIONID"], "abc");
        assert_eq!(config.lookup.result_pointer, "/postalCode");
        assert!(config.lookup.headers.contains_key("Accept"));

        assert_eq!(config.post_office.endpoint, "https://offices.example/find");
        assert_eq!(config.post_office.result_pointer, "/address/fullAddress");
        assert_eq!(config.post_office.timeout_secs, 5);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let err = PostcheckConfig::from_toml("[session]\nbatch_size = 0\n").unwrap_err();
        assert!(matches!(err, PostcheckError::Config(_)));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(PostcheckConfig::from_toml("[session]\nbatchsize = 10\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            PostcheckConfig::load(dir.path().join("absent.toml")),
            Err(PostcheckError::Config(_))
        ));
    }
}
