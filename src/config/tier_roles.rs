use poise::serenity_prelude::RoleId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::BotError;
use crate::models::TierRank;

/// Raw file layout of data/tier_roles.json
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TierRolesFile {
    /// Rank display name -> Discord role ID
    roles: HashMap<String, u64>,
}

/// Mapping from tier rank to the Discord role that represents it
/// Loaded from data/tier_roles.json
#[derive(Debug, Clone, Default)]
pub struct TierRolesConfig {
    roles: BTreeMap<TierRank, RoleId>,
}

impl TierRolesConfig {
    pub fn new(roles: BTreeMap<TierRank, RoleId>) -> Self {
        Self { roles }
    }

    /// Load from a JSON file
    pub fn load_from_file(path: &str) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BotError::ConfigLoad {
            path: path.to_string(),
            source: e,
        })?;

        let file: TierRolesFile =
            serde_json::from_str(&content).map_err(|e| BotError::ConfigParse {
                path: path.to_string(),
                source: e,
            })?;

        Self::from_names(file.roles)
    }

    /// Only ranks from the fixed list are accepted, and Unranked never has a role
    fn from_names(named: HashMap<String, u64>) -> crate::error::Result<Self> {
        let mut roles = BTreeMap::new();

        for (name, id) in named {
            let rank: TierRank = name
                .parse()
                .map_err(|message| BotError::ConfigValidation { message })?;

            if !rank.has_role() {
                return Err(BotError::ConfigValidation {
                    message: format!("'{}' cannot be mapped to a role", rank),
                });
            }
            if id == 0 {
                return Err(BotError::ConfigValidation {
                    message: format!("Role ID for '{}' must be non-zero", rank),
                });
            }

            roles.insert(rank, RoleId::new(id));
        }

        Ok(Self { roles })
    }

    pub fn role_for(&self, rank: TierRank) -> Option<RoleId> {
        self.roles.get(&rank).copied()
    }

    /// Every configured tier role, lowest rank first
    pub fn all_roles(&self) -> impl Iterator<Item = (TierRank, RoleId)> + '_ {
        self.roles.iter().map(|(rank, id)| (*rank, *id))
    }

    /// Ranks that can be awarded but have no role configured
    pub fn missing_ranks(&self) -> Vec<TierRank> {
        TierRank::ALL
            .iter()
            .filter(|rank| rank.has_role() && !self.roles.contains_key(rank))
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}
