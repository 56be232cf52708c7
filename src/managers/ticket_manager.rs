use chrono::{DateTime, Utc};
use dashmap::DashMap;
use poise::serenity_prelude::{ChannelId, UserId};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::error::{BotError, Result};
use crate::models::{CooldownRemaining, TestType};
use crate::state::{SharedTicketState, TicketRecord, TicketState, TicketStatus};

/// Tracks per-requester ticket cooldowns and the lifecycle of open tickets
pub struct TicketTracker {
    /// Cooldowns and ticket records
    state: SharedTicketState,

    /// Where the state is persisted after every change
    state_path: String,

    /// How long a requester waits between tickets
    cooldown: chrono::Duration,

    /// Serialises check-then-set per requester
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl TicketTracker {
    pub fn new(state: SharedTicketState, state_path: &str, cooldown: chrono::Duration) -> Self {
        Self {
            state,
            state_path: state_path.to_string(),
            cooldown,
            locks: DashMap::new(),
        }
    }

    /// Reserve the right to open a ticket.
    ///
    /// Holds the requester's lock until the reservation is committed or
    /// dropped, so a second submission from the same user waits and then
    /// sees the fresh cooldown. Dropping without committing leaves no
    /// cooldown behind.
    pub async fn request_ticket(
        &self,
        requester_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<TicketReservation<'_>> {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        let lock = self
            .locks
            .entry(requester_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;

        if let Some(remaining) = self.active_cooldown(requester_id, now).await {
            debug!(
                "Ticket request from {} rejected, {} remaining",
                requester_id, remaining
            );
            return Err(BotError::RateLimited { remaining });
        }

        Ok(TicketReservation {
            tracker: self,
            requester_id,
            _guard: guard,
        })
    }

    /// Remaining cooldown for a requester, clearing it if it has run out
    pub async fn check_cooldown(
        &self,
        requester_id: UserId,
        now: DateTime<Utc>,
    ) -> Option<CooldownRemaining> {
        let key = requester_id.to_string();
        let expired = {
            let mut state = self.state.write().await;
            match state.cooldown_expiry(&key) {
                None => return None,
                Some(expiry) if expiry > now => {
                    return Some(CooldownRemaining::from_duration(expiry - now));
                }
                Some(_) => state.remove_cooldown(&key),
            }
        };

        if expired {
            debug!("Cleared expired cooldown for {}", requester_id);
            self.persist().await;
        }
        None
    }

    async fn active_cooldown(
        &self,
        requester_id: UserId,
        now: DateTime<Utc>,
    ) -> Option<CooldownRemaining> {
        let state = self.state.read().await;
        state
            .cooldown_expiry(&requester_id.to_string())
            .filter(|expiry| *expiry > now)
            .map(|expiry| CooldownRemaining::from_duration(expiry - now))
    }

    /// The channel's ticket, if it is still waiting for results
    pub async fn open_ticket_for_channel(&self, channel_id: ChannelId) -> Option<TicketRecord> {
        let state = self.state.read().await;
        state
            .get_ticket(&channel_id.to_string())
            .filter(|ticket| ticket.status == TicketStatus::Open)
            .cloned()
    }

    /// Mark an open ticket's results as recorded.
    ///
    /// A ticket only takes results once; afterwards it is no longer a ticket
    /// as far as `/results` is concerned.
    pub async fn mark_results_recorded(&self, channel_id: ChannelId) -> Result<TicketRecord> {
        let ticket = {
            let mut state = self.state.write().await;
            let ticket = state
                .get_ticket_mut(&channel_id.to_string())
                .filter(|ticket| ticket.status == TicketStatus::Open)
                .ok_or(BotError::NotATicket)?;
            ticket.status = TicketStatus::ResultsRecorded;
            ticket.clone()
        };

        self.persist().await;
        Ok(ticket)
    }

    /// Forget a ticket once its channel is being deleted
    pub async fn close_ticket(&self, channel_id: ChannelId) -> Option<TicketRecord> {
        let removed = {
            let mut state = self.state.write().await;
            state.remove_ticket(&channel_id.to_string())
        };

        if removed.is_some() {
            info!("Closed ticket in channel {}", channel_id);
            self.persist().await;
        }
        removed
    }

    /// Drop cooldowns that ran out while the bot was offline
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let purged = {
            let mut state = self.state.write().await;
            state.purge_expired(now)
        };

        if purged > 0 {
            info!("Purged {} expired cooldown(s)", purged);
            self.persist().await;
        }
        purged
    }

    pub async fn open_ticket_count(&self) -> usize {
        self.state.read().await.tickets.len()
    }

    /// Persistence failures are logged; the in-memory state stays authoritative
    async fn persist(&self) {
        let state: tokio::sync::RwLockReadGuard<'_, TicketState> = self.state.read().await;
        if let Err(e) = state.save(&self.state_path).await {
            warn!("Failed to persist ticket state: {}", e);
        }
    }
}

/// Exclusive, uncommitted right to open one ticket
pub struct TicketReservation<'a> {
    tracker: &'a TicketTracker,
    requester_id: UserId,
    _guard: OwnedMutexGuard<()>,
}

impl TicketReservation<'_> {
    pub fn requester_id(&self) -> UserId {
        self.requester_id
    }

    /// Record the created ticket and start the requester's cooldown
    pub async fn commit(
        self,
        channel_id: ChannelId,
        minecraft_username: &str,
        test_type: TestType,
        now: DateTime<Utc>,
    ) -> TicketRecord {
        let ticket = TicketRecord::new(
            self.requester_id.to_string(),
            channel_id.to_string(),
            minecraft_username.to_string(),
            test_type,
            now,
        );

        {
            let mut state = self.tracker.state.write().await;
            state.set_cooldown(&ticket.requester_id, now + self.tracker.cooldown);
            state.insert_ticket(ticket.clone());
        }

        info!(
            "Opened ticket {} for {} ({})",
            channel_id, self.requester_id, minecraft_username
        );
        self.tracker.persist().await;
        ticket
    }
}

/// Shared ticket tracker type
pub type SharedTicketTracker = Arc<TicketTracker>;

pub fn create_shared_ticket_tracker(
    state: SharedTicketState,
    state_path: &str,
    cooldown: chrono::Duration,
) -> SharedTicketTracker {
    Arc::new(TicketTracker::new(state, state_path, cooldown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_shared_ticket_state;
    use chrono::{Duration, TimeZone};

    fn tracker(dir: &tempfile::TempDir) -> TicketTracker {
        let path = dir.path().join("tickets.json");
        TicketTracker::new(
            create_shared_ticket_state(TicketState::new()),
            path.to_str().unwrap(),
            Duration::hours(24),
        )
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_first_request_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir);

        let reservation = tracker.request_ticket(UserId::new(1), t0()).await.unwrap();
        assert_eq!(reservation.requester_id(), UserId::new(1));
    }

    #[tokio::test]
    async fn test_cooldown_after_commit() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir);
        let user = UserId::new(1);

        let reservation = tracker.request_ticket(user, t0()).await.unwrap();
        reservation
            .commit(ChannelId::new(500), "Steve", TestType::Evaluation, t0())
            .await;

        let err = tracker
            .request_ticket(user, t0() + Duration::hours(1))
            .await
            .err()
            .unwrap();
        match err {
            BotError::RateLimited { remaining } => assert_eq!(remaining.to_string(), "23h 0m"),
            other => panic!("expected RateLimited, got {:?}", other),
        }

        let err = tracker
            .request_ticket(user, t0() + Duration::hours(1) + Duration::seconds(1))
            .await
            .err()
            .unwrap();
        assert!(
            matches!(err, BotError::RateLimited { remaining } if remaining.to_string() == "22h 59m")
        );

        // Other requesters are unaffected
        assert!(tracker
            .request_ticket(UserId::new(2), t0() + Duration::hours(1))
            .await
            .is_ok());

        // The cooldown ends exactly at expiry
        assert!(tracker
            .request_ticket(user, t0() + Duration::hours(24))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_uncommitted_reservation_leaves_no_cooldown() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir);
        let user = UserId::new(7);

        let reservation = tracker.request_ticket(user, t0()).await.unwrap();
        drop(reservation);

        assert!(tracker.request_ticket(user, t0()).await.is_ok());
        assert_eq!(tracker.check_cooldown(user, t0()).await, None);
    }

    #[tokio::test]
    async fn test_check_cooldown_clears_expired_entry() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir);
        let user = UserId::new(3);

        tracker
            .request_ticket(user, t0())
            .await
            .unwrap()
            .commit(ChannelId::new(9), "Alex", TestType::Ht3Plus, t0())
            .await;

        let remaining = tracker
            .check_cooldown(user, t0() + Duration::minutes(90))
            .await
            .unwrap();
        assert_eq!(remaining, CooldownRemaining { hours: 22, minutes: 30 });

        let later = t0() + Duration::hours(25);
        assert_eq!(tracker.check_cooldown(user, later).await, None);
        assert!(tracker.state.read().await.cooldowns.is_empty());
        assert_eq!(tracker.check_cooldown(user, later).await, None);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_request_is_rate_limited() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = Arc::new(tracker(&dir));
        let user = UserId::new(11);

        let first = tracker.request_ticket(user, t0()).await.unwrap();

        let other = tracker.clone();
        let second =
            tokio::spawn(async move { other.request_ticket(user, t0()).await.map(|_| ()) });
        tokio::task::yield_now().await;

        first
            .commit(ChannelId::new(20), "Steve", TestType::Evaluation, t0())
            .await;

        let result = second.await.unwrap();
        assert!(matches!(result, Err(BotError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn test_ticket_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir);
        let channel = ChannelId::new(300);

        tracker
            .request_ticket(UserId::new(5), t0())
            .await
            .unwrap()
            .commit(channel, "Steve", TestType::Evaluation, t0())
            .await;

        let ticket = tracker.open_ticket_for_channel(channel).await.unwrap();
        assert_eq!(ticket.requester_id, "5");
        assert_eq!(ticket.status, TicketStatus::Open);

        let ticket = tracker.mark_results_recorded(channel).await.unwrap();
        assert_eq!(ticket.status, TicketStatus::ResultsRecorded);

        assert!(tracker.close_ticket(channel).await.is_some());
        assert!(tracker.open_ticket_for_channel(channel).await.is_none());
        assert!(matches!(
            tracker.mark_results_recorded(channel).await,
            Err(BotError::NotATicket)
        ));
    }

    #[tokio::test]
    async fn test_results_are_recorded_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir);
        let channel = ChannelId::new(301);

        tracker
            .request_ticket(UserId::new(6), t0())
            .await
            .unwrap()
            .commit(channel, "Alex", TestType::Ht3Plus, t0())
            .await;

        assert!(tracker.mark_results_recorded(channel).await.is_ok());

        // Still awaiting its delayed close, but no longer accepting results
        assert!(tracker.open_ticket_for_channel(channel).await.is_none());
        assert!(matches!(
            tracker.mark_results_recorded(channel).await,
            Err(BotError::NotATicket)
        ));
        assert_eq!(tracker.open_ticket_count().await, 1);
    }

    #[tokio::test]
    async fn test_state_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.json");
        let path = path.to_str().unwrap().to_string();
        let user = UserId::new(8);

        {
            let tracker = tracker(&dir);
            tracker
                .request_ticket(user, t0())
                .await
                .unwrap()
                .commit(ChannelId::new(81), "Steve", TestType::Evaluation, t0())
                .await;
        }

        let state = TicketState::load(&path).await.unwrap();
        let reloaded = TicketTracker::new(create_shared_ticket_state(state), &path, Duration::hours(24));

        assert!(matches!(
            reloaded.request_ticket(user, t0() + Duration::hours(2)).await,
            Err(BotError::RateLimited { .. })
        ));
        assert_eq!(reloaded.open_ticket_count().await, 1);
        assert_eq!(reloaded.purge_expired(t0() + Duration::hours(30)).await, 1);
    }
}
