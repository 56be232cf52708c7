use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::TestType;

/// Persisted cooldowns and open tickets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketState {
    /// Schema version
    pub version: u32,

    /// Last update timestamp
    pub last_updated: DateTime<Utc>,

    /// Requester Discord ID -> cooldown expiry
    #[serde(default)]
    pub cooldowns: HashMap<String, DateTime<Utc>>,

    /// Ticket channel ID -> ticket
    #[serde(default)]
    pub tickets: HashMap<String, TicketRecord>,
}

impl Default for TicketState {
    fn default() -> Self {
        Self {
            version: 1,
            last_updated: Utc::now(),
            cooldowns: HashMap::new(),
            tickets: HashMap::new(),
        }
    }
}

impl TicketState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file, or create new if not exists
    pub async fn load(path: &str) -> crate::error::Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| crate::error::BotError::ConfigParse {
                    path: path.to_string(),
                    source: e,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(crate::error::BotError::StateLoad {
                path: path.to_string(),
                source: e,
            }),
        }
    }

    /// Save to a JSON file atomically
    pub async fn save(&self, path: &str) -> crate::error::Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        let temp_path = format!("{}.tmp", path);
        tokio::fs::write(&temp_path, &content).await.map_err(|e| {
            crate::error::BotError::StateSave {
                path: path.to_string(),
                source: e,
            }
        })?;

        tokio::fs::rename(&temp_path, path).await.map_err(|e| {
            crate::error::BotError::StateSave {
                path: path.to_string(),
                source: e,
            }
        })?;

        Ok(())
    }

    /// Cooldown expiry for a requester, whether or not it has passed
    pub fn cooldown_expiry(&self, requester_id: &str) -> Option<DateTime<Utc>> {
        self.cooldowns.get(requester_id).copied()
    }

    pub fn set_cooldown(&mut self, requester_id: &str, expiry: DateTime<Utc>) {
        self.cooldowns.insert(requester_id.to_string(), expiry);
        self.last_updated = Utc::now();
    }

    pub fn remove_cooldown(&mut self, requester_id: &str) -> bool {
        let removed = self.cooldowns.remove(requester_id).is_some();
        if removed {
            self.last_updated = Utc::now();
        }
        removed
    }

    /// Drop every cooldown that has run out, returning how many were removed
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.cooldowns.len();
        self.cooldowns.retain(|_, expiry| *expiry > now);
        let purged = before - self.cooldowns.len();
        if purged > 0 {
            self.last_updated = Utc::now();
        }
        purged
    }

    pub fn insert_ticket(&mut self, ticket: TicketRecord) {
        self.tickets.insert(ticket.channel_id.clone(), ticket);
        self.last_updated = Utc::now();
    }

    pub fn get_ticket(&self, channel_id: &str) -> Option<&TicketRecord> {
        self.tickets.get(channel_id)
    }

    pub fn get_ticket_mut(&mut self, channel_id: &str) -> Option<&mut TicketRecord> {
        self.tickets.get_mut(channel_id)
    }

    pub fn remove_ticket(&mut self, channel_id: &str) -> Option<TicketRecord> {
        let removed = self.tickets.remove(channel_id);
        if removed.is_some() {
            self.last_updated = Utc::now();
        }
        removed
    }
}

/// An applicant's testing ticket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TicketRecord {
    /// Applicant Discord ID (snowflake as string)
    pub requester_id: String,

    /// Ticket channel ID (snowflake as string)
    pub channel_id: String,

    pub minecraft_username: String,

    pub test_type: TestType,

    pub created_at: DateTime<Utc>,

    pub status: TicketStatus,
}

impl TicketRecord {
    pub fn new(
        requester_id: String,
        channel_id: String,
        minecraft_username: String,
        test_type: TestType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            requester_id,
            channel_id,
            minecraft_username,
            test_type,
            created_at,
            status: TicketStatus::Open,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    ResultsRecorded,
}

/// Channel name for a ticket: `ticket-{requester}-{ign}`, lowercased with spaces replaced
pub fn ticket_channel_name(requester_id: &str, minecraft_username: &str) -> String {
    format!("ticket-{}-{}", requester_id, minecraft_username.trim())
        .to_lowercase()
        .replace(' ', "-")
}

/// Shared ticket state type
pub type SharedTicketState = Arc<tokio::sync::RwLock<TicketState>>;

pub fn create_shared_ticket_state(state: TicketState) -> SharedTicketState {
    Arc::new(tokio::sync::RwLock::new(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ticket(requester: &str, channel: &str) -> TicketRecord {
        TicketRecord::new(
            requester.to_string(),
            channel.to_string(),
            "Steve".to_string(),
            TestType::Evaluation,
            Utc::now(),
        )
    }

    #[test]
    fn test_channel_name() {
        assert_eq!(
            ticket_channel_name("123", "Cool Player"),
            "ticket-123-cool-player"
        );
        assert_eq!(ticket_channel_name("9", "Notch"), "ticket-9-notch");
    }

    #[test]
    fn test_purge_expired() {
        let now = Utc::now();
        let mut state = TicketState::new();
        state.set_cooldown("1", now - Duration::minutes(1));
        state.set_cooldown("2", now);
        state.set_cooldown("3", now + Duration::hours(2));

        assert_eq!(state.purge_expired(now), 2);
        assert!(state.cooldown_expiry("3").is_some());
        assert_eq!(state.purge_expired(now), 0);
    }

    #[test]
    fn test_ticket_operations() {
        let mut state = TicketState::new();
        state.insert_ticket(ticket("1", "100"));
        state.insert_ticket(ticket("2", "102"));

        assert_eq!(state.tickets.len(), 2);
        assert_eq!(state.get_ticket("102").unwrap().requester_id, "2");

        state.get_ticket_mut("100").unwrap().status = TicketStatus::ResultsRecorded;
        assert_eq!(
            state.get_ticket("100").unwrap().status,
            TicketStatus::ResultsRecorded
        );

        assert!(state.remove_ticket("100").is_some());
        assert!(state.remove_ticket("100").is_none());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.json");
        let path = path.to_str().unwrap();

        let expiry = Utc::now() + Duration::hours(24);
        let mut state = TicketState::new();
        state.set_cooldown("42", expiry);
        state.insert_ticket(ticket("42", "777"));
        state.save(path).await.unwrap();

        let loaded = TicketState::load(path).await.unwrap();
        assert_eq!(loaded.cooldown_expiry("42"), Some(expiry));
        assert_eq!(loaded.get_ticket("777"), state.get_ticket("777"));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let state = TicketState::load(path.to_str().unwrap()).await.unwrap();
        assert!(state.cooldowns.is_empty());
        assert!(state.tickets.is_empty());
    }
}
