//! Income heads. Each head applies its own regime- and age-aware exemptions
//! and reports its contribution to gross total income through
//! [`TaxableIncomeSource`]; the calculation engine sees nothing else.

pub mod capital_gains;
pub mod house_property;
pub mod other;
pub mod perquisites;
pub mod retirement;
pub mod salary;

use serde::{Deserialize, Serialize};

use crate::error::Violation;
use crate::profile::TaxpayerProfile;
use crate::regime::RegimeRules;
use crate::types::Money;

pub use capital_gains::{AssetDisposal, CapitalGains, CostInflationIndex};
pub use house_property::{HouseProperties, HouseProperty, PropertyUse};
pub use other::OtherIncome;
pub use perquisites::Perquisites;
pub use retirement::{CommutedPension, Gratuity, LeaveEncashment, RetirementBenefits};
pub use salary::SalaryIncome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeHead {
    Salary,
    Perquisites,
    HouseProperty,
    CapitalGains,
    RetirementBenefits,
    OtherSources,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exemption {
    pub name: String,
    pub amount: Money,
}

/// One head's gross, exemptions and taxable contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadComputation {
    pub head: IncomeHead,
    pub gross: Money,
    pub exemptions: Vec<Exemption>,
    /// May be negative for a house-property loss allowed as set-off.
    pub taxable: Money,
    pub carried_forward_loss: Money,
}

impl HeadComputation {
    pub(crate) fn start(head: IncomeHead, gross: Money) -> Self {
        Self {
            head,
            gross,
            exemptions: Vec::new(),
            taxable: gross,
            carried_forward_loss: Money::ZERO,
        }
    }

    /// Record a positive exemption and reduce the taxable figure by it.
    pub(crate) fn exempt(&mut self, name: &str, amount: Money) {
        if amount.is_positive() {
            self.exemptions.push(Exemption {
                name: name.to_string(),
                amount,
            });
            self.taxable -= amount;
        }
    }

    pub(crate) fn clamp_non_negative(mut self) -> Self {
        self.taxable = self.taxable.non_negative();
        self
    }

    pub fn total_exempt(&self) -> Money {
        self.exemptions.iter().map(|e| e.amount).sum()
    }
}

/// Capability shared by every income head.
pub trait TaxableIncomeSource {
    fn head(&self) -> IncomeHead;

    /// Apply the head's exemptions under `rules` for `profile`.
    fn compute(&self, rules: &RegimeRules, profile: &TaxpayerProfile) -> HeadComputation;

    fn taxable_amount(&self, rules: &RegimeRules, profile: &TaxpayerProfile) -> Money {
        self.compute(rules, profile).taxable
    }

    /// Input defects; empty when the head is well formed.
    fn validate(&self) -> Vec<Violation>;

    /// Basic pay plus dearness allowance, the base for salary-linked caps.
    fn salary_basis(&self) -> Money {
        Money::ZERO
    }
}

/// All income heads of one computation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomeAggregates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<SalaryIncome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perquisites: Option<Perquisites>,
    #[serde(skip_serializing_if = "HouseProperties::is_empty")]
    pub house_property: HouseProperties,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capital_gains: Option<CapitalGains>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retirement_benefits: Option<RetirementBenefits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_income: Option<OtherIncome>,
}

impl IncomeAggregates {
    /// The heads present, in a fixed order.
    pub fn sources(&self) -> Vec<&dyn TaxableIncomeSource> {
        let mut sources: Vec<&dyn TaxableIncomeSource> = Vec::new();
        if let Some(s) = &self.salary {
            sources.push(s);
        }
        if let Some(p) = &self.perquisites {
            sources.push(p);
        }
        if !self.house_property.is_empty() {
            sources.push(&self.house_property);
        }
        if let Some(c) = &self.capital_gains {
            sources.push(c);
        }
        if let Some(r) = &self.retirement_benefits {
            sources.push(r);
        }
        if let Some(o) = &self.other_income {
            sources.push(o);
        }
        sources
    }
}

pub(crate) fn require_non_negative(field: &str, amount: Money, out: &mut Vec<Violation>) {
    if amount.is_negative() {
        out.push(Violation::new(
            field,
            format!("{} must not be negative", amount),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_only_lists_present_heads() {
        let mut income = IncomeAggregates::default();
        assert!(income.sources().is_empty());

        income.salary = Some(SalaryIncome {
            basic: Money::from_rupees(600_000),
            ..Default::default()
        });
        income.other_income = Some(OtherIncome::default());
        let heads: Vec<IncomeHead> = income.sources().iter().map(|s| s.head()).collect();
        assert_eq!(heads, vec![IncomeHead::Salary, IncomeHead::OtherSources]);
    }

    #[test]
    fn test_exempt_ignores_zero_amounts() {
        let mut hc = HeadComputation::start(IncomeHead::Salary, Money::from_rupees(100));
        hc.exempt("nothing", Money::ZERO);
        hc.exempt("something", Money::from_rupees(30));
        assert_eq!(hc.exemptions.len(), 1);
        assert_eq!(hc.taxable, Money::from_rupees(70));
        assert_eq!(hc.total_exempt(), Money::from_rupees(30));
    }

    #[test]
    fn test_aggregates_deserialise_from_partial_json() {
        let json = r#"{"salary": {"basic": "900000"}, "other_income": {"deposit_interest": 12000}}"#;
        let income: IncomeAggregates = serde_json::from_str(json).unwrap();
        assert_eq!(income.sources().len(), 2);
        assert!(income.house_property.is_empty());
    }
}
