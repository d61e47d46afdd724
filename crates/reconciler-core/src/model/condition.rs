//! Named tri-state status flags on the aggregate
//!
//! There is exactly one condition per [`ConditionType`]. They are stored in
//! a fixed array indexed by the type, so lookups never search and every
//! type is always present.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    Valid,
    Executable,
    EcosystemHealthy,
    SelfUpgradeCompleted,
    ConfigApplied,
    Completed,
}

impl ConditionType {
    pub const COUNT: usize = 6;

    pub const ALL: [ConditionType; Self::COUNT] = [
        ConditionType::Valid,
        ConditionType::Executable,
        ConditionType::EcosystemHealthy,
        ConditionType::SelfUpgradeCompleted,
        ConditionType::ConfigApplied,
        ConditionType::Completed,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::Valid => "Valid",
            ConditionType::Executable => "Executable",
            ConditionType::EcosystemHealthy => "EcosystemHealthy",
            ConditionType::SelfUpgradeCompleted => "SelfUpgradeCompleted",
            ConditionType::ConfigApplied => "ConfigApplied",
            ConditionType::Completed => "Completed",
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

impl Condition {
    fn unknown(condition_type: ConditionType) -> Self {
        Self {
            condition_type,
            status: ConditionStatus::Unknown,
            reason: String::new(),
            message: String::new(),
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// One condition per type, all starting as `Unknown`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Condition>", into = "Vec<Condition>")]
pub struct Conditions([Condition; ConditionType::COUNT]);

impl Default for Conditions {
    fn default() -> Self {
        Self(ConditionType::ALL.map(Condition::unknown))
    }
}

impl Conditions {
    pub fn get(&self, condition_type: ConditionType) -> &Condition {
        &self.0[condition_type.index()]
    }

    /// Set a condition; returns whether anything changed
    pub fn set(
        &mut self,
        condition_type: ConditionType,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> bool {
        let next = Condition {
            condition_type,
            status,
            reason: reason.into(),
            message: message.into(),
        };
        let slot = &mut self.0[condition_type.index()];
        if *slot == next {
            return false;
        }
        *slot = next;
        true
    }

    pub fn is_true(&self, condition_type: ConditionType) -> bool {
        self.get(condition_type).is_true()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }
}

impl TryFrom<Vec<Condition>> for Conditions {
    type Error = String;

    fn try_from(list: Vec<Condition>) -> Result<Self, Self::Error> {
        let mut conditions = Conditions::default();
        let mut seen = [false; ConditionType::COUNT];
        for condition in list {
            let index = condition.condition_type.index();
            if seen[index] {
                return Err(format!(
                    "duplicate condition type {}",
                    condition.condition_type
                ));
            }
            seen[index] = true;
            conditions.0[index] = condition;
        }
        Ok(conditions)
    }
}

impl From<Conditions> for Vec<Condition> {
    fn from(conditions: Conditions) -> Self {
        conditions.0.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_conditions_start_unknown() {
        let conditions = Conditions::default();
        for condition_type in ConditionType::ALL {
            let condition = conditions.get(condition_type);
            assert_eq!(condition.condition_type, condition_type);
            assert_eq!(condition.status, ConditionStatus::Unknown);
        }
    }

    #[test]
    fn test_set_reports_change() {
        let mut conditions = Conditions::default();
        assert!(conditions.set(ConditionType::Valid, ConditionStatus::True, "Valid", ""));
        assert!(!conditions.set(ConditionType::Valid, ConditionStatus::True, "Valid", ""));
        assert!(conditions.is_true(ConditionType::Valid));
        assert!(!conditions.is_true(ConditionType::Completed));
    }

    #[test]
    fn test_serde_round_trip_as_list() {
        let mut conditions = Conditions::default();
        conditions.set(
            ConditionType::EcosystemHealthy,
            ConditionStatus::False,
            "Unhealthy",
            "cas",
        );
        let json = serde_json::to_value(&conditions).unwrap();
        assert_eq!(json.as_array().unwrap().len(), ConditionType::COUNT);
        let back: Conditions = serde_json::from_value(json).unwrap();
        assert_eq!(back, conditions);
    }

    #[test]
    fn test_duplicate_types_rejected() {
        let list = vec![
            Condition::unknown(ConditionType::Valid),
            Condition::unknown(ConditionType::Valid),
        ];
        assert!(Conditions::try_from(list).is_err());
    }
}
