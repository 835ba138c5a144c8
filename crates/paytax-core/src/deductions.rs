use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{PayrollTaxError, Violation};
use crate::profile::AgeBracket;
use crate::regime::RegimeRules;
use crate::types::{Money, Rate};

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Chapter VI-A deduction sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeductionCode {
    /// Life insurance, PPF, ELSS, principal repayment, tuition fees.
    #[serde(rename = "80C")]
    Section80C,
    /// Pension fund contributions.
    #[serde(rename = "80CCC")]
    Section80CCC,
    /// Employee NPS contribution.
    #[serde(rename = "80CCD(1)")]
    Section80CCD1,
    /// Additional NPS contribution.
    #[serde(rename = "80CCD(1B)")]
    Section80CCD1B,
    /// Employer NPS contribution.
    #[serde(rename = "80CCD(2)")]
    Section80CCD2,
    /// Agnipath scheme contribution.
    #[serde(rename = "80CCH")]
    Section80CCH,
    /// Health insurance premiums.
    #[serde(rename = "80D")]
    Section80D,
    /// Maintenance of a disabled dependant.
    #[serde(rename = "80DD")]
    Section80DD,
    /// Education loan interest.
    #[serde(rename = "80E")]
    Section80E,
    /// Affordable housing loan interest.
    #[serde(rename = "80EEA")]
    Section80EEA,
    /// Donations.
    #[serde(rename = "80G")]
    Section80G,
    /// Rent paid without HRA.
    #[serde(rename = "80GG")]
    Section80GG,
    /// Savings account interest.
    #[serde(rename = "80TTA")]
    Section80TTA,
    /// Deposit interest for senior citizens.
    #[serde(rename = "80TTB")]
    Section80TTB,
    /// Taxpayer with a disability.
    #[serde(rename = "80U")]
    Section80U,
}

impl DeductionCode {
    pub const ALL: [DeductionCode; 15] = [
        DeductionCode::Section80C,
        DeductionCode::Section80CCC,
        DeductionCode::Section80CCD1,
        DeductionCode::Section80CCD1B,
        DeductionCode::Section80CCD2,
        DeductionCode::Section80CCH,
        DeductionCode::Section80D,
        DeductionCode::Section80DD,
        DeductionCode::Section80E,
        DeductionCode::Section80EEA,
        DeductionCode::Section80G,
        DeductionCode::Section80GG,
        DeductionCode::Section80TTA,
        DeductionCode::Section80TTB,
        DeductionCode::Section80U,
    ];

    pub fn section(&self) -> &'static str {
        match self {
            DeductionCode::Section80C => "80C",
            DeductionCode::Section80CCC => "80CCC",
            DeductionCode::Section80CCD1 => "80CCD(1)",
            DeductionCode::Section80CCD1B => "80CCD(1B)",
            DeductionCode::Section80CCD2 => "80CCD(2)",
            DeductionCode::Section80CCH => "80CCH",
            DeductionCode::Section80D => "80D",
            DeductionCode::Section80DD => "80DD",
            DeductionCode::Section80E => "80E",
            DeductionCode::Section80EEA => "80EEA",
            DeductionCode::Section80G => "80G",
            DeductionCode::Section80GG => "80GG",
            DeductionCode::Section80TTA => "80TTA",
            DeductionCode::Section80TTB => "80TTB",
            DeductionCode::Section80U => "80U",
        }
    }
}

impl fmt::Display for DeductionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

impl FromStr for DeductionCode {
    type Err = PayrollTaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        let wanted = wanted.trim_start_matches("SECTION").trim();
        DeductionCode::ALL
            .iter()
            .copied()
            .find(|c| c.section() == wanted)
            .ok_or_else(|| {
                PayrollTaxError::invalid("deduction_code", format!("unknown section '{}'", s))
            })
    }
}

/// Statutory ceiling of a deduction under one regime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeductionCap {
    Fixed {
        amount: Money,
    },
    Uncapped,
    /// A zero entry means the deduction is unavailable for that bracket.
    ByAge {
        normal: Money,
        senior: Money,
        super_senior: Money,
    },
    /// A share of basic salary plus dearness allowance.
    ShareOfSalary {
        rate: Rate,
    },
}

impl DeductionCap {
    /// Resolved ceiling; `None` means uncapped.
    pub fn limit(&self, bracket: AgeBracket, salary_basis: Money) -> Option<Money> {
        match self {
            DeductionCap::Fixed { amount } => Some(*amount),
            DeductionCap::Uncapped => None,
            DeductionCap::ByAge {
                normal,
                senior,
                super_senior,
            } => Some(match bracket {
                AgeBracket::Normal => *normal,
                AgeBracket::Senior => *senior,
                AgeBracket::SuperSenior => *super_senior,
            }),
            DeductionCap::ShareOfSalary { rate } => {
                Some(salary_basis.non_negative().mul_rate(*rate).round_paise())
            }
        }
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        match self {
            DeductionCap::Fixed { amount } => !amount.is_negative(),
            DeductionCap::Uncapped => true,
            DeductionCap::ByAge {
                normal,
                senior,
                super_senior,
            } => !(normal.is_negative() || senior.is_negative() || super_senior.is_negative()),
            DeductionCap::ShareOfSalary { rate } => {
                !rate.is_sign_negative() && *rate <= rust_decimal::Decimal::ONE
            }
        }
    }
}

/// A deduction a regime accepts, with its ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionRule {
    pub code: DeductionCode,
    pub cap: DeductionCap,
}

/// A combined ceiling shared by several sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionGroup {
    pub name: String,
    pub codes: Vec<DeductionCode>,
    pub limit: Money,
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

/// Claimed deductions keyed by section. Regime-neutral: the same claims are
/// filtered separately for each regime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxDeductions {
    claims: BTreeMap<DeductionCode, Money>,
}

impl TaxDeductions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style claim; a repeated code replaces the earlier amount.
    pub fn with(mut self, code: DeductionCode, amount: Money) -> Self {
        self.claims.insert(code, amount);
        self
    }

    pub fn claim(&self, code: DeductionCode) -> Money {
        self.claims.get(&code).copied().unwrap_or(Money::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeductionCode, Money)> + '_ {
        self.claims.iter().map(|(c, m)| (*c, *m))
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub fn total_claimed(&self) -> Money {
        self.claims.values().sum()
    }

    pub fn validate(&self) -> Vec<Violation> {
        self.claims
            .iter()
            .filter(|(_, amount)| amount.is_negative())
            .map(|(code, amount)| {
                Violation::new(
                    format!("deductions.{}", code),
                    format!("claimed amount {} must not be negative", amount),
                )
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDeduction {
    pub code: DeductionCode,
    pub claimed: Money,
    pub allowed: Money,
    pub accepted_by_regime: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionOutcome {
    pub applied: Vec<AppliedDeduction>,
    pub total_allowed: Money,
    pub warnings: Vec<String>,
}

/// Filter and cap claims against one regime's table.
///
/// A claim over its ceiling is clamped with a warning, never rejected.
///
/// Unsupported sections contribute zero, claims above a ceiling are reduced
/// to it, combined group limits are applied in section order, and the total
/// never exceeds gross total income. Every adjustment is reported as a
/// warning rather than an error.
pub fn apply_deductions(
    claims: &TaxDeductions,
    rules: &RegimeRules,
    bracket: AgeBracket,
    salary_basis: Money,
    gross_total_income: Money,
) -> DeductionOutcome {
    let mut warnings = Vec::new();
    let mut applied: Vec<AppliedDeduction> = Vec::new();

    for (code, claimed) in claims.iter() {
        if claimed.is_zero() {
            continue;
        }
        let Some(cap) = rules.deduction_cap(code) else {
            warnings.push(format!(
                "Deduction {} is not accepted under the {} regime; claim of {} ignored",
                code, rules.regime, claimed
            ));
            applied.push(AppliedDeduction {
                code,
                claimed,
                allowed: Money::ZERO,
                accepted_by_regime: false,
            });
            continue;
        };

        let allowed = match cap.limit(bracket, salary_basis) {
            Some(limit) if claimed > limit => {
                warnings.push(format!(
                    "Deduction {} claim of {} exceeds the ceiling of {}; capped",
                    code, claimed, limit
                ));
                limit
            }
            _ => claimed,
        };
        applied.push(AppliedDeduction {
            code,
            claimed,
            allowed,
            accepted_by_regime: true,
        });
    }

    for group in &rules.deduction_groups {
        let mut remaining = group.limit;
        for entry in applied
            .iter_mut()
            .filter(|a| a.accepted_by_regime && group.codes.contains(&a.code))
        {
            if entry.allowed > remaining {
                warnings.push(format!(
                    "Deduction {} reduced from {} to {} by the combined {} limit of {}",
                    entry.code, entry.allowed, remaining, group.name, group.limit
                ));
                entry.allowed = remaining;
            }
            remaining -= entry.allowed;
        }
    }

    let mut total_allowed: Money = applied.iter().map(|a| a.allowed).sum();
    let ceiling = gross_total_income.non_negative();
    if total_allowed > ceiling {
        warnings.push(format!(
            "Total deductions of {} limited to gross total income of {}",
            total_allowed, ceiling
        ));
        total_allowed = ceiling;
    }

    for w in &warnings {
        tracing::warn!(regime = %rules.regime, "{}", w);
    }

    DeductionOutcome {
        applied,
        total_allowed,
        warnings,
    }
}
