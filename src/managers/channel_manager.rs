use poise::serenity_prelude::{
    self as serenity, ChannelId, GuildChannel, GuildId, Http, Mentionable, PermissionOverwrite,
    PermissionOverwriteType, Permissions, RoleId, UserId,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::ticket_manager::SharedTicketTracker;
use crate::config::BotConfig;
use crate::error::{BotError, Result};
use crate::models::TestingApplication;
use crate::state::ticket_channel_name;

/// Overwrites for a private ticket: hidden from @everyone, open to the bot,
/// the applicant and staff
pub fn ticket_overwrites(
    everyone_role: RoleId,
    bot_id: UserId,
    applicant_id: UserId,
    staff_role: RoleId,
) -> Vec<PermissionOverwrite> {
    let read_write = Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES;

    vec![
        PermissionOverwrite {
            allow: Permissions::empty(),
            deny: Permissions::VIEW_CHANNEL,
            kind: PermissionOverwriteType::Role(everyone_role),
        },
        PermissionOverwrite {
            allow: read_write,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Member(bot_id),
        },
        PermissionOverwrite {
            allow: read_write,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Member(applicant_id),
        },
        PermissionOverwrite {
            allow: read_write,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Role(staff_role),
        },
    ]
}

/// Deleting a channel that is already gone is not worth surfacing
fn is_unknown_channel(e: &serenity::Error) -> bool {
    let err_str = e.to_string();
    err_str.contains("Unknown Channel") || err_str.contains("10003")
}

/// Creates and tears down ticket channels
pub struct ChannelManager {
    config: Arc<BotConfig>,
}

impl ChannelManager {
    pub fn new(config: Arc<BotConfig>) -> Self {
        Self { config }
    }

    /// Create the private channel for an application.
    ///
    /// Fails without side effects when the category or staff role is missing.
    pub async fn create_ticket_channel(
        &self,
        http: &Http,
        guild_id: GuildId,
        applicant_id: UserId,
        application: &TestingApplication,
    ) -> Result<GuildChannel> {
        let category_id = self.config.category_for(application.test_type);
        let channels = guild_id.channels(http).await?;
        if !channels.contains_key(&category_id) {
            return Err(BotError::ChannelNotFound {
                name: format!("{} category ({})", application.test_type.display_name(), category_id),
            });
        }

        let staff_role = self.config.staff_role_id;
        let roles = guild_id.roles(http).await?;
        if !roles.contains_key(&staff_role) {
            return Err(BotError::RoleNotFound {
                name: format!("staff ({})", staff_role),
            });
        }

        let bot_id = http.get_current_user().await?.id;
        let overwrites =
            ticket_overwrites(guild_id.everyone_role(), bot_id, applicant_id, staff_role);

        let name = ticket_channel_name(&applicant_id.to_string(), &application.minecraft_username);
        let channel = guild_id
            .create_channel(
                http,
                serenity::CreateChannel::new(&name)
                    .kind(serenity::ChannelType::Text)
                    .category(category_id)
                    .topic(format!("Tier Testing Ticket for {}", applicant_id.mention()))
                    .permissions(overwrites),
            )
            .await?;

        info!("Created ticket channel '{}' ({})", name, channel.id);
        Ok(channel)
    }

    /// Delete a ticket channel, treating an already-deleted channel as done
    pub async fn delete_ticket_channel(http: &Http, channel_id: ChannelId) {
        match channel_id.delete(http).await {
            Ok(_) => info!("Deleted ticket channel {}", channel_id),
            Err(e) if is_unknown_channel(&e) => {
                warn!("Channel {} not found for deletion", channel_id)
            }
            Err(e) => error!("Error deleting channel {}: {}", channel_id, e),
        }
    }

    /// After `delay`, run `delete` for the channel and forget its ticket.
    ///
    /// Returns immediately; the handle is only needed by callers that want to
    /// wait for the close.
    pub fn schedule_close<F, Fut>(
        tracker: SharedTicketTracker,
        channel_id: ChannelId,
        delay: Duration,
        delete: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(ChannelId) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        debug!("Closing ticket {} in {:?}", channel_id, delay);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            delete(channel_id).await;
            tracker.close_ticket(channel_id).await;
        })
    }
}

/// Shared channel manager type
pub type SharedChannelManager = Arc<ChannelManager>;

pub fn create_shared_channel_manager(config: Arc<BotConfig>) -> SharedChannelManager {
    Arc::new(ChannelManager::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::create_shared_ticket_tracker;
    use crate::models::TestType;
    use crate::state::{create_shared_ticket_state, TicketState};

    #[test]
    fn test_ticket_overwrites() {
        let overwrites = ticket_overwrites(
            RoleId::new(1),
            UserId::new(2),
            UserId::new(3),
            RoleId::new(4),
        );

        assert_eq!(overwrites.len(), 4);

        let everyone = &overwrites[0];
        assert_eq!(everyone.kind, PermissionOverwriteType::Role(RoleId::new(1)));
        assert!(everyone.deny.contains(Permissions::VIEW_CHANNEL));
        assert!(everyone.allow.is_empty());

        for overwrite in &overwrites[1..] {
            assert!(overwrite.allow.contains(Permissions::VIEW_CHANNEL));
            assert!(overwrite.allow.contains(Permissions::SEND_MESSAGES));
        }
        assert_eq!(
            overwrites[2].kind,
            PermissionOverwriteType::Member(UserId::new(3))
        );
    }

    #[tokio::test]
    async fn test_scheduled_close_deletes_then_forgets_ticket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.json");
        let tracker = create_shared_ticket_tracker(
            create_shared_ticket_state(TicketState::new()),
            path.to_str().unwrap(),
            chrono::Duration::hours(24),
        );
        let channel = ChannelId::new(600);
        let now = chrono::Utc::now();

        tracker
            .request_ticket(UserId::new(60), now)
            .await
            .unwrap()
            .commit(channel, "Steve", TestType::Evaluation, now)
            .await;
        tracker.mark_results_recorded(channel).await.unwrap();

        let deleted = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let log = deleted.clone();
        let handle = ChannelManager::schedule_close(
            tracker.clone(),
            channel,
            Duration::from_millis(50),
            move |id| async move { log.lock().await.push(id) },
        );

        // Nothing happens before the delay
        assert_eq!(tracker.open_ticket_count().await, 1);
        assert!(deleted.lock().await.is_empty());

        handle.await.unwrap();
        assert_eq!(*deleted.lock().await, vec![channel]);
        assert_eq!(tracker.open_ticket_count().await, 0);
    }
}
