use poise::serenity_prelude::{GuildId, Http, Permissions, RoleId};
use tracing::{error, info, warn};

use crate::config::TierRolesConfig;

/// A single permission with its status
#[derive(Debug, Clone)]
pub struct PermissionStatus {
    pub name: &'static str,
    pub description: &'static str,
    pub has_permission: bool,
}

/// All required permissions for the bot
pub fn get_required_permissions() -> Vec<(&'static str, &'static str, Permissions)> {
    vec![
        ("VIEW_CHANNEL", "See ticket categories and channels", Permissions::VIEW_CHANNEL),
        ("SEND_MESSAGES", "Post applications and results", Permissions::SEND_MESSAGES),
        ("EMBED_LINKS", "Send rich embeds in messages", Permissions::EMBED_LINKS),
        ("ADD_REACTIONS", "React to results posts", Permissions::ADD_REACTIONS),
        ("MANAGE_ROLES", "Assign tier roles to tested players", Permissions::MANAGE_ROLES),
        ("MANAGE_CHANNELS", "Create and delete ticket channels", Permissions::MANAGE_CHANNELS),
    ]
}

/// Result of a permission check for a single guild
#[derive(Debug)]
pub struct GuildPermissionCheck {
    pub guild_id: GuildId,
    pub guild_name: String,
    pub permission_statuses: Vec<PermissionStatus>,
    pub has_all_permissions: bool,
    pub bot_role_position: Option<u16>,
    pub bot_role_name: Option<String>,
    /// Tier roles at or above the bot's highest role, which it cannot assign
    pub tier_roles_above_bot: Vec<(String, u16)>,
    /// Configured tier roles that don't exist in the guild
    pub missing_tier_roles: Vec<RoleId>,
}

impl GuildPermissionCheck {
    pub fn all_ok(&self) -> bool {
        self.has_all_permissions
            && self.bot_role_position.is_some()
            && self.tier_roles_above_bot.is_empty()
            && self.missing_tier_roles.is_empty()
    }
}

/// Tier roles the bot cannot manage, highest first
pub fn find_roles_above(
    bot_position: u16,
    tier_roles: &[(String, u16)],
) -> Vec<(String, u16)> {
    let mut above: Vec<(String, u16)> = tier_roles
        .iter()
        .filter(|(_, pos)| *pos >= bot_position)
        .cloned()
        .collect();
    above.sort_by(|a, b| b.1.cmp(&a.1));
    above
}

/// Check bot permissions for a specific guild
pub async fn check_guild_permissions(
    http: &Http,
    guild_id: GuildId,
    tier_roles: &TierRolesConfig,
) -> Result<GuildPermissionCheck, String> {
    let guild = guild_id
        .to_partial_guild(http)
        .await
        .map_err(|e| format!("Failed to fetch guild {}: {}", guild_id, e))?;

    let bot_user = http
        .get_current_user()
        .await
        .map_err(|e| format!("Failed to get bot user: {}", e))?;

    let bot_member = guild
        .member(http, bot_user.id)
        .await
        .map_err(|e| format!("Failed to get bot member in guild {}: {}", guild_id, e))?;

    #[allow(deprecated)]
    let bot_permissions = guild.member_permissions(&bot_member);

    let permission_statuses: Vec<PermissionStatus> = get_required_permissions()
        .into_iter()
        .map(|(name, description, permission)| PermissionStatus {
            name,
            description,
            has_permission: bot_permissions.contains(permission),
        })
        .collect();
    let has_all_permissions = permission_statuses.iter().all(|s| s.has_permission);

    let bot_top_role = bot_member
        .roles
        .iter()
        .filter_map(|role_id| guild.roles.get(role_id))
        .max_by_key(|role| role.position);
    let bot_role_position = bot_top_role.map(|r| r.position);
    let bot_role_name = bot_top_role.map(|r| r.name.clone());

    let mut present = Vec::new();
    let mut missing_tier_roles = Vec::new();
    for (_, role_id) in tier_roles.all_roles() {
        match guild.roles.get(&role_id) {
            Some(role) => present.push((role.name.clone(), role.position)),
            None => missing_tier_roles.push(role_id),
        }
    }

    let tier_roles_above_bot = match bot_role_position {
        Some(pos) => find_roles_above(pos, &present),
        None => present,
    };

    Ok(GuildPermissionCheck {
        guild_id,
        guild_name: guild.name.clone(),
        permission_statuses,
        has_all_permissions,
        bot_role_position,
        bot_role_name,
        tier_roles_above_bot,
        missing_tier_roles,
    })
}

/// Log permission check results with appropriate log levels
pub fn log_permission_check(check: &GuildPermissionCheck) {
    info!("Permission check for '{}' (ID: {})", check.guild_name, check.guild_id);

    match &check.bot_role_name {
        Some(role_name) => info!(
            "  Bot's highest role: '{}' (position {})",
            role_name,
            check.bot_role_position.unwrap_or(0)
        ),
        None => warn!("  Bot has no roles assigned!"),
    }

    for status in &check.permission_statuses {
        if status.has_permission {
            info!("  [YES] {:<16} - {}", status.name, status.description);
        } else {
            error!("  [NO]  {:<16} - {}", status.name, status.description);
        }
    }

    for (role_name, pos) in &check.tier_roles_above_bot {
        error!(
            "  Tier role '{}' (position {}) is not below the bot's role and cannot be assigned",
            role_name, pos
        );
    }

    for role_id in &check.missing_tier_roles {
        warn!("  Tier role {} is configured but does not exist", role_id);
    }

    if check.all_ok() {
        info!("  Status: ALL CHECKS PASSED");
    } else {
        error!("  Status: ISSUES DETECTED - tickets or role updates may fail");
    }
}

/// Run the permission check for every guild at startup
pub async fn run_startup_permission_check(
    http: &Http,
    guild_ids: &[GuildId],
    tier_roles: &TierRolesConfig,
) {
    for guild_id in guild_ids {
        match check_guild_permissions(http, *guild_id, tier_roles).await {
            Ok(check) => log_permission_check(&check),
            Err(e) => error!("Failed to check permissions for guild {}: {}", guild_id, e),
        }
    }
}
