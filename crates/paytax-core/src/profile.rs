use serde::{Deserialize, Serialize};

use crate::error::Violation;

/// Age at which the senior-citizen bracket starts.
pub const SENIOR_AGE: u32 = 60;
/// Age at which the super-senior bracket starts.
pub const SUPER_SENIOR_AGE: u32 = 80;

const MAX_PLAUSIBLE_AGE: u32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBracket {
    Normal,
    Senior,
    SuperSenior,
}

impl AgeBracket {
    pub fn from_age(age: u32) -> Self {
        if age >= SUPER_SENIOR_AGE {
            AgeBracket::SuperSenior
        } else if age >= SENIOR_AGE {
            AgeBracket::Senior
        } else {
            AgeBracket::Normal
        }
    }

    pub fn is_senior_or_above(&self) -> bool {
        !matches!(self, AgeBracket::Normal)
    }
}

/// Demographic flags that gate age- and employer-specific exemptions.
///
/// Age is the actual age at computation time; it is never pro-rated for
/// partial-year employment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxpayerProfile {
    pub age: u32,
    #[serde(default)]
    pub is_senior: bool,
    #[serde(default)]
    pub is_super_senior: bool,
    #[serde(default)]
    pub is_government_employee: bool,
}

impl TaxpayerProfile {
    pub fn new(age: u32) -> Self {
        Self {
            age,
            ..Default::default()
        }
    }

    /// The higher of the bracket implied by age and the one implied by flags.
    pub fn age_bracket(&self) -> AgeBracket {
        let flagged = if self.is_super_senior {
            AgeBracket::SuperSenior
        } else if self.is_senior {
            AgeBracket::Senior
        } else {
            AgeBracket::Normal
        };
        flagged.max(AgeBracket::from_age(self.age))
    }

    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        if self.age > MAX_PLAUSIBLE_AGE {
            violations.push(Violation::new(
                "profile.age",
                format!("age {} exceeds {}", self.age, MAX_PLAUSIBLE_AGE),
            ));
        }
        violations
    }
}
