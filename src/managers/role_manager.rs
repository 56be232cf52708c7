use poise::serenity_prelude::{self as serenity, GuildId, Http, RoleId, UserId};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::TierRolesConfig;
use crate::error::{BotError, Result};
use crate::models::TierRank;

/// Role edits needed to move a member onto a tier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierRoleChanges {
    pub remove: Vec<RoleId>,
    pub add: Option<RoleId>,
}

impl TierRoleChanges {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.add.is_none()
    }
}

/// Work out which tier roles to drop and which to grant so that the member
/// ends up holding only `target`'s role (or none, for Unranked)
pub fn plan_tier_change(
    current_roles: &[RoleId],
    target: TierRank,
    tier_roles: &TierRolesConfig,
) -> TierRoleChanges {
    let target_role = tier_roles.role_for(target);

    let remove = tier_roles
        .all_roles()
        .map(|(_, role_id)| role_id)
        .filter(|role_id| Some(*role_id) != target_role && current_roles.contains(role_id))
        .collect();

    let add = target_role.filter(|role_id| !current_roles.contains(role_id));

    TierRoleChanges { remove, add }
}

/// Warning for a rank whose role is unconfigured or gone from the guild.
/// Unranked never has a role, so it never warns.
pub fn missing_target_role_warning<F>(
    target: TierRank,
    tier_roles: &TierRolesConfig,
    role_exists: F,
) -> Option<String>
where
    F: Fn(&RoleId) -> bool,
{
    if !target.has_role() {
        return None;
    }
    match tier_roles.role_for(target) {
        Some(role_id) if role_exists(&role_id) => None,
        _ => Some("Could not find the new rank role!".to_string()),
    }
}

/// Handle a role operation error and return a user-friendly message
fn format_role_error(role_id: RoleId, e: &serenity::Error) -> String {
    let err_str = e.to_string();
    if err_str.contains("Missing Permissions") || err_str.contains("50013") {
        let msg = format!(
            "Role {}: hierarchy issue - move the bot's role above it in server settings",
            role_id
        );
        error!("{}", msg);
        msg
    } else {
        error!("Failed to update role {}: {}", role_id, e);
        format!("Role {}: {}", role_id, e)
    }
}

/// Assigns tier roles to tested players
pub struct RoleManager {
    tier_roles: TierRolesConfig,
}

impl RoleManager {
    pub fn new(tier_roles: TierRolesConfig) -> Self {
        Self { tier_roles }
    }

    pub fn tier_roles(&self) -> &TierRolesConfig {
        &self.tier_roles
    }

    /// Move a member onto `target`, removing every other tier role.
    ///
    /// Individual role failures come back as warnings so the results flow
    /// can carry on; only failing to fetch the member is an error.
    pub async fn reassign_tier(
        &self,
        http: &Http,
        guild_id: GuildId,
        user_id: UserId,
        target: TierRank,
    ) -> Result<Vec<String>> {
        let member = guild_id
            .member(http, user_id)
            .await
            .map_err(|_| BotError::UserNotFound {
                user_id: user_id.to_string(),
            })?;

        let mut warnings = Vec::new();
        let guild_roles = guild_id.roles(http).await?;

        if let Some(warning) =
            missing_target_role_warning(target, &self.tier_roles, |id| guild_roles.contains_key(id))
        {
            warn!("No role found for rank '{}'", target);
            warnings.push(warning);
        }

        let mut changes = plan_tier_change(&member.roles, target, &self.tier_roles);
        changes.add = changes.add.filter(|role_id| guild_roles.contains_key(role_id));

        if changes.is_empty() {
            info!("User {} already holds exactly the '{}' tier", user_id, target);
            return Ok(warnings);
        }

        for role_id in &changes.remove {
            match member.remove_role(http, *role_id).await {
                Ok(()) => info!("Removed tier role {} from user {}", role_id, user_id),
                Err(e) => warnings.push(format_role_error(*role_id, &e)),
            }
        }

        if let Some(role_id) = changes.add {
            match member.add_role(http, role_id).await {
                Ok(()) => info!("Assigned '{}' role {} to user {}", target, role_id, user_id),
                Err(e) => warnings.push(format_role_error(role_id, &e)),
            }
        }

        Ok(warnings)
    }
}

/// Shared role manager type
pub type SharedRoleManager = Arc<RoleManager>;

pub fn create_shared_role_manager(tier_roles: TierRolesConfig) -> SharedRoleManager {
    Arc::new(RoleManager::new(tier_roles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn tiers() -> TierRolesConfig {
        let mut roles = BTreeMap::new();
        roles.insert(TierRank::LowTier1, RoleId::new(11));
        roles.insert(TierRank::HighTier1, RoleId::new(12));
        roles.insert(TierRank::HighTier2, RoleId::new(22));
        roles.insert(TierRank::HighTier5, RoleId::new(52));
        TierRolesConfig::new(roles)
    }

    fn apply(current: &mut Vec<RoleId>, changes: &TierRoleChanges) {
        current.retain(|r| !changes.remove.contains(r));
        if let Some(role) = changes.add {
            current.push(role);
        }
    }

    #[test]
    fn test_plan_replaces_old_tiers() {
        let current = vec![RoleId::new(999), RoleId::new(11), RoleId::new(52)];
        let changes = plan_tier_change(&current, TierRank::HighTier2, &tiers());

        assert_eq!(changes.remove, vec![RoleId::new(11), RoleId::new(52)]);
        assert_eq!(changes.add, Some(RoleId::new(22)));
    }

    #[test]
    fn test_reassignment_is_idempotent() {
        let tiers = tiers();
        let mut roles = vec![RoleId::new(999), RoleId::new(12)];

        for _ in 0..2 {
            let changes = plan_tier_change(&roles, TierRank::HighTier2, &tiers);
            apply(&mut roles, &changes);
        }

        let tier_count = roles
            .iter()
            .filter(|r| tiers.all_roles().any(|(_, id)| id == **r))
            .count();
        assert_eq!(tier_count, 1);
        assert!(roles.contains(&RoleId::new(22)));
        assert!(roles.contains(&RoleId::new(999)));
        assert!(plan_tier_change(&roles, TierRank::HighTier2, &tiers).is_empty());
    }

    #[test]
    fn test_unranked_removes_all_tiers() {
        let current = vec![RoleId::new(12), RoleId::new(22)];
        let changes = plan_tier_change(&current, TierRank::Unranked, &tiers());

        assert_eq!(changes.remove, vec![RoleId::new(12), RoleId::new(22)]);
        assert_eq!(changes.add, None);
    }

    #[test]
    fn test_unconfigured_target_only_removes() {
        let current = vec![RoleId::new(11)];
        let changes = plan_tier_change(&current, TierRank::LowTier3, &tiers());

        assert_eq!(changes.remove, vec![RoleId::new(11)]);
        assert_eq!(changes.add, None);
    }

    #[test]
    fn test_missing_target_role_warning() {
        let tiers = tiers();
        let in_guild = |id: &RoleId| *id != RoleId::new(52);

        assert_eq!(missing_target_role_warning(TierRank::HighTier2, &tiers, in_guild), None);
        assert_eq!(missing_target_role_warning(TierRank::Unranked, &tiers, in_guild), None);

        // Configured but deleted from the guild
        assert_eq!(
            missing_target_role_warning(TierRank::HighTier5, &tiers, in_guild).as_deref(),
            Some("Could not find the new rank role!")
        );
        // Never configured
        assert!(missing_target_role_warning(TierRank::LowTier3, &tiers, in_guild).is_some());

        // The warning does not stop old tiers from being removed
        let changes = plan_tier_change(&[RoleId::new(11)], TierRank::LowTier3, &tiers);
        assert_eq!(changes.remove, vec![RoleId::new(11)]);
    }
}
