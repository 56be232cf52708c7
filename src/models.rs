// src/models.rs
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Skill tiers a tester can award, in the order they are offered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, poise::ChoiceParameter)]
pub enum TierRank {
    #[name = "Unranked"]
    Unranked,
    #[name = "Low Tier 1"]
    LowTier1,
    #[name = "High Tier 1"]
    HighTier1,
    #[name = "Low Tier 2"]
    LowTier2,
    #[name = "High Tier 2"]
    HighTier2,
    #[name = "Low Tier 3"]
    LowTier3,
    #[name = "High Tier 3"]
    HighTier3,
    #[name = "Low Tier 4"]
    LowTier4,
    #[name = "High Tier 4"]
    HighTier4,
    #[name = "Low Tier 5"]
    LowTier5,
    #[name = "High Tier 5"]
    HighTier5,
}

impl TierRank {
    pub const ALL: [TierRank; 11] = [
        TierRank::Unranked,
        TierRank::LowTier1,
        TierRank::HighTier1,
        TierRank::LowTier2,
        TierRank::HighTier2,
        TierRank::LowTier3,
        TierRank::HighTier3,
        TierRank::LowTier4,
        TierRank::HighTier4,
        TierRank::LowTier5,
        TierRank::HighTier5,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TierRank::Unranked => "Unranked",
            TierRank::LowTier1 => "Low Tier 1",
            TierRank::HighTier1 => "High Tier 1",
            TierRank::LowTier2 => "Low Tier 2",
            TierRank::HighTier2 => "High Tier 2",
            TierRank::LowTier3 => "Low Tier 3",
            TierRank::HighTier3 => "High Tier 3",
            TierRank::LowTier4 => "Low Tier 4",
            TierRank::HighTier4 => "High Tier 4",
            TierRank::LowTier5 => "Low Tier 5",
            TierRank::HighTier5 => "High Tier 5",
        }
    }

    /// Unranked players carry no tier role
    pub fn has_role(&self) -> bool {
        *self != TierRank::Unranked
    }
}

impl fmt::Display for TierRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TierRank {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        TierRank::ALL
            .iter()
            .find(|rank| rank.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("Unknown tier rank '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum Region {
    #[name = "NA"]
    Na,
    #[name = "EU"]
    Eu,
    #[name = "AS"]
    As,
    #[name = "ME"]
    Me,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Na => "NA",
            Region::Eu => "EU",
            Region::As => "AS",
            Region::Me => "ME",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which queue an applicant is testing in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Evaluation,
    #[serde(rename = "ht3plus")]
    Ht3Plus,
}

impl TestType {
    pub fn id(&self) -> &'static str {
        match self {
            TestType::Evaluation => "evaluation",
            TestType::Ht3Plus => "ht3plus",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "evaluation" => Some(TestType::Evaluation),
            "ht3plus" => Some(TestType::Ht3Plus),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TestType::Evaluation => "Evaluation",
            TestType::Ht3Plus => "HT3+ Testing",
        }
    }

    /// HT3+ applicants state the tier they are going for, everyone else their current one
    pub fn tier_label(&self) -> &'static str {
        match self {
            TestType::Evaluation => "Current Tier",
            TestType::Ht3Plus => "Goal Tier",
        }
    }
}

/// Modal input ids for the application form
pub const FIELD_USERNAME: &str = "ign";
pub const FIELD_SERVER: &str = "server";
pub const FIELD_REGION: &str = "region";
pub const FIELD_TIER: &str = "tier";

/// A submitted testing application
#[derive(Debug, Clone, PartialEq)]
pub struct TestingApplication {
    pub test_type: TestType,
    pub minecraft_username: String,
    pub preferred_server: String,
    pub region: String,
    /// Current tier, or goal tier for HT3+
    pub tier: String,
}

impl TestingApplication {
    /// Build from modal input values keyed by input id
    pub fn from_fields(
        test_type: TestType,
        fields: &HashMap<String, String>,
    ) -> crate::error::Result<Self> {
        let field = |id: &str| -> crate::error::Result<String> {
            fields
                .get(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| crate::error::BotError::Internal {
                    message: format!("Application form is missing '{}'", id),
                })
        };

        Ok(Self {
            test_type,
            minecraft_username: field(FIELD_USERNAME)?,
            preferred_server: field(FIELD_SERVER)?,
            region: field(FIELD_REGION)?,
            tier: field(FIELD_TIER)?,
        })
    }
}

/// Time left on a cooldown, floored to whole hours and minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownRemaining {
    pub hours: u64,
    pub minutes: u64,
}

impl CooldownRemaining {
    pub fn from_seconds(seconds: u64) -> Self {
        Self {
            hours: seconds / 3600,
            minutes: (seconds % 3600) / 60,
        }
    }

    pub fn from_duration(duration: chrono::Duration) -> Self {
        Self::from_seconds(duration.num_seconds().max(0) as u64)
    }
}

impl fmt::Display for CooldownRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m", self.hours, self.minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_parse() {
        assert_eq!("High Tier 2".parse::<TierRank>(), Ok(TierRank::HighTier2));
        assert_eq!("low tier 5".parse::<TierRank>(), Ok(TierRank::LowTier5));
        assert_eq!(" Unranked ".parse::<TierRank>(), Ok(TierRank::Unranked));
        assert!("Tier 6".parse::<TierRank>().is_err());
    }

    #[test]
    fn test_rank_order() {
        assert_eq!(TierRank::ALL.len(), 11);
        assert!(TierRank::ALL.windows(2).all(|w| w[0] < w[1]));
        assert!(!TierRank::Unranked.has_role());
        assert!(TierRank::HighTier5.has_role());
    }

    #[test]
    fn test_test_type_ids() {
        for test_type in [TestType::Evaluation, TestType::Ht3Plus] {
            assert_eq!(TestType::from_id(test_type.id()), Some(test_type));
        }
        assert_eq!(TestType::from_id("unknown"), None);
        assert_eq!(TestType::Ht3Plus.tier_label(), "Goal Tier");
    }

    #[test]
    fn test_application_from_fields() {
        let mut fields = HashMap::new();
        fields.insert(FIELD_USERNAME.to_string(), " Steve ".to_string());
        fields.insert(FIELD_SERVER.to_string(), "hypixel.net".to_string());
        fields.insert(FIELD_REGION.to_string(), "EU".to_string());
        fields.insert(FIELD_TIER.to_string(), "HT3".to_string());

        let application = TestingApplication::from_fields(TestType::Ht3Plus, &fields).unwrap();
        assert_eq!(application.minecraft_username, "Steve");
        assert_eq!(application.tier, "HT3");

        fields.insert(FIELD_REGION.to_string(), "   ".to_string());
        assert!(TestingApplication::from_fields(TestType::Evaluation, &fields).is_err());
    }

    #[test]
    fn test_cooldown_remaining_floors() {
        assert_eq!(CooldownRemaining::from_seconds(82_800).to_string(), "23h 0m");
        assert_eq!(CooldownRemaining::from_seconds(82_799).to_string(), "22h 59m");
        assert_eq!(CooldownRemaining::from_seconds(59).to_string(), "0h 0m");
        assert_eq!(
            CooldownRemaining::from_duration(chrono::Duration::seconds(-5)).to_string(),
            "0h 0m"
        );
    }
}
