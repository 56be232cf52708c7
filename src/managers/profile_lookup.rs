//! Minecraft profile lookups by username

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{BotError, Result};

/// Resolves a Minecraft username to the player's profile
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn lookup(&self, username: &str) -> Result<MinecraftProfile>;
}

/// Profile body returned by the lookup endpoint
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MinecraftProfile {
    /// Undashed UUID, e.g. `069a79f444e94726a5befca90e38aaf5`
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl MinecraftProfile {
    pub fn uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.id).ok()
    }
}

/// Map a lookup response to a profile.
///
/// `204` and `404` mean the username does not exist; any other non-success
/// status is an upstream failure.
fn interpret_response(username: &str, status: u16, body: &str) -> Result<MinecraftProfile> {
    match status {
        200 => {
            let profile: MinecraftProfile =
                serde_json::from_str(body).map_err(|e| BotError::UpstreamFailure {
                    message: format!("Unexpected profile response: {}", e),
                })?;
            if profile.uuid().is_none() {
                return Err(BotError::UpstreamFailure {
                    message: format!("Profile id '{}' is not a UUID", profile.id),
                });
            }
            Ok(profile)
        }
        204 | 404 => Err(BotError::ProfileNotFound {
            username: username.to_string(),
        }),
        other => Err(BotError::UpstreamFailure {
            message: format!("Profile lookup returned status {}", other),
        }),
    }
}

/// HTTP client for the Mojang profile API
pub struct MojangProfileClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl MojangProfileClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    fn profile_url(&self, username: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(username.trim()))
    }
}

#[async_trait]
impl ProfileLookup for MojangProfileClient {
    async fn lookup(&self, username: &str) -> Result<MinecraftProfile> {
        let url = self.profile_url(username);
        debug!("Fetching profile for username: {}", username);

        let response = self.http_client.get(&url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        match interpret_response(username, status, &body) {
            Ok(profile) => {
                info!("Found profile {} for {}", profile.id, username);
                Ok(profile)
            }
            Err(e) => {
                warn!("Profile lookup for {} failed: {}", username, e);
                Err(e)
            }
        }
    }
}

/// Shared profile lookup type
pub type SharedProfileLookup = Arc<dyn ProfileLookup>;

pub fn create_shared_profile_lookup(base_url: &str) -> SharedProfileLookup {
    Arc::new(MojangProfileClient::new(base_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_profile() {
        let body = r#"{"id":"069a79f444e94726a5befca90e38aaf5","name":"Notch"}"#;
        let profile = interpret_response("Notch", 200, body).unwrap();

        assert_eq!(profile.name, "Notch");
        assert_eq!(
            profile.uuid().unwrap().to_string(),
            "069a79f4-44e9-4726-a5be-fca90e38aaf5"
        );
    }

    #[test]
    fn test_missing_profile() {
        assert!(matches!(
            interpret_response("nobody", 204, ""),
            Err(BotError::ProfileNotFound { .. })
        ));
        assert!(matches!(
            interpret_response("nobody", 404, "{}"),
            Err(BotError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn test_upstream_failures() {
        assert!(matches!(
            interpret_response("Notch", 429, ""),
            Err(BotError::UpstreamFailure { .. })
        ));
        assert!(matches!(
            interpret_response("Notch", 200, "not json"),
            Err(BotError::UpstreamFailure { .. })
        ));
        assert!(matches!(
            interpret_response("Notch", 200, r#"{"id":"xyz"}"#),
            Err(BotError::UpstreamFailure { .. })
        ));
    }

    #[test]
    fn test_profile_url_is_encoded() {
        let client = MojangProfileClient::new("https://example.test/profiles/");
        assert_eq!(
            client.profile_url("a b"),
            "https://example.test/profiles/a%20b"
        );
    }
}
