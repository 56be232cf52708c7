use poise::serenity_prelude::ChannelId;
use tracing::info;

use crate::managers::SharedTicketTracker;

/// Forget the ticket of a channel deleted outside the results flow.
///
/// Returns whether the channel was a ticket.
pub async fn handle_channel_delete(tracker: &SharedTicketTracker, channel_id: ChannelId) -> bool {
    match tracker.close_ticket(channel_id).await {
        Some(ticket) => {
            info!(
                "Ticket channel {} for {} was deleted, dropping its record",
                channel_id, ticket.minecraft_username
            );
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::create_shared_ticket_tracker;
    use crate::models::TestType;
    use crate::state::{create_shared_ticket_state, TicketState};
    use chrono::Utc;
    use poise::serenity_prelude::UserId;

    #[tokio::test]
    async fn test_deleted_ticket_channel_is_forgotten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.json");
        let tracker = create_shared_ticket_tracker(
            create_shared_ticket_state(TicketState::new()),
            path.to_str().unwrap(),
            chrono::Duration::hours(24),
        );
        let now = Utc::now();
        let user = UserId::new(70);

        tracker
            .request_ticket(user, now)
            .await
            .unwrap()
            .commit(ChannelId::new(700), "Steve", TestType::Evaluation, now)
            .await;

        assert!(!handle_channel_delete(&tracker, ChannelId::new(999)).await);
        assert_eq!(tracker.open_ticket_count().await, 1);

        assert!(handle_channel_delete(&tracker, ChannelId::new(700)).await);
        assert_eq!(tracker.open_ticket_count().await, 0);

        // The cooldown outlives the channel
        assert!(tracker.check_cooldown(user, now).await.is_some());

        let saved = TicketState::load(path.to_str().unwrap()).await.unwrap();
        assert!(saved.tickets.is_empty());
    }
}
