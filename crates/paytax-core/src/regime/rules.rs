use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::deductions::{DeductionCap, DeductionCode, DeductionGroup, DeductionRule};
use crate::error::PayrollTaxError;
use crate::profile::AgeBracket;
use crate::regime::TaxYear;
use crate::types::{Money, Rate};
use crate::PayrollTaxResult;

/// The two mutually exclusive statutory computation frameworks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRegime {
    /// Exemption-rich regime with age-adjusted slabs.
    #[serde(alias = "old")]
    Legacy,
    /// Lower-rate regime with few deductions.
    #[serde(alias = "new")]
    Simplified,
}

impl TaxRegime {
    pub const ALL: [TaxRegime; 2] = [TaxRegime::Legacy, TaxRegime::Simplified];

    pub fn code(&self) -> &'static str {
        match self {
            TaxRegime::Legacy => "legacy",
            TaxRegime::Simplified => "simplified",
        }
    }
}

impl fmt::Display for TaxRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TaxRegime {
    type Err = PayrollTaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" | "old" => Ok(TaxRegime::Legacy),
            "simplified" | "new" => Ok(TaxRegime::Simplified),
            other => Err(PayrollTaxError::invalid(
                "regime",
                format!("unsupported regime code '{}'", other),
            )),
        }
    }
}

/// One progressive band. `upper` of `None` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slab {
    pub lower: Money,
    pub upper: Option<Money>,
    pub rate: Rate,
}

/// Slab schedules by age bracket. Brackets without their own schedule use
/// `normal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlabTable {
    pub normal: Vec<Slab>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub senior: Option<Vec<Slab>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_senior: Option<Vec<Slab>>,
}

impl SlabTable {
    pub fn for_bracket(&self, bracket: AgeBracket) -> &[Slab] {
        let specific = match bracket {
            AgeBracket::Normal => None,
            AgeBracket::Senior => self.senior.as_ref(),
            AgeBracket::SuperSenior => self.super_senior.as_ref().or(self.senior.as_ref()),
        };
        specific.unwrap_or(&self.normal)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rebate {
    /// Rebate applies when taxable income is at or below this amount.
    pub threshold: Money,
    pub cap: Money,
    /// Above the threshold, tax never exceeds the income beyond it.
    #[serde(default)]
    pub marginal_relief: bool,
}

/// Surcharge applies at `rate` once taxable income exceeds `threshold`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurchargeTier {
    pub threshold: Money,
    pub rate: Rate,
}

/// Regime-specific exemption ceilings. A zero ceiling disallows the item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExemptionLimits {
    pub hra_exemption: bool,
    pub lta_exemption: bool,
    pub professional_tax_cap: Money,
    pub self_occupied_interest_cap: Money,
    pub house_property_loss_setoff_cap: Money,
    pub meal_voucher_cap: Money,
    pub gift_exemption: Money,
    pub ltcg_equity_exemption: Money,
    pub gratuity_cap: Money,
    pub leave_encashment_cap: Money,
    pub vrs_compensation_cap: Money,
    pub family_pension_cap: Money,
}

impl ExemptionLimits {
    fn amounts(&self) -> [(&'static str, Money); 10] {
        [
            ("professional_tax_cap", self.professional_tax_cap),
            ("self_occupied_interest_cap", self.self_occupied_interest_cap),
            ("house_property_loss_setoff_cap", self.house_property_loss_setoff_cap),
            ("meal_voucher_cap", self.meal_voucher_cap),
            ("gift_exemption", self.gift_exemption),
            ("ltcg_equity_exemption", self.ltcg_equity_exemption),
            ("gratuity_cap", self.gratuity_cap),
            ("leave_encashment_cap", self.leave_encashment_cap),
            ("vrs_compensation_cap", self.vrs_compensation_cap),
            ("family_pension_cap", self.family_pension_cap),
        ]
    }
}

/// Declarative rule table for one regime over an effective window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeRules {
    pub id: String,
    pub regime: TaxRegime,
    pub effective_from: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_to: Option<NaiveDate>,
    pub slabs: SlabTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rebate: Option<Rebate>,
    #[serde(default)]
    pub surcharge: Vec<SurchargeTier>,
    /// Optional on the wire so a missing rate is reported, never defaulted.
    #[serde(default)]
    pub cess_rate: Option<Rate>,
    pub standard_deduction: Money,
    pub exemptions: ExemptionLimits,
    #[serde(default)]
    pub deductions: Vec<DeductionRule>,
    #[serde(default)]
    pub deduction_groups: Vec<DeductionGroup>,
}

impl RegimeRules {
    pub fn deduction_cap(&self, code: DeductionCode) -> Option<&DeductionCap> {
        self.deductions
            .iter()
            .find(|r| r.code == code)
            .map(|r| &r.cap)
    }

    pub fn accepts(&self, code: DeductionCode) -> bool {
        self.deduction_cap(code).is_some()
    }

    pub fn slabs_for(&self, bracket: AgeBracket) -> &[Slab] {
        self.slabs.for_bracket(bracket)
    }

    /// The cess rate, which `validate` guarantees is present.
    pub fn cess(&self) -> PayrollTaxResult<Rate> {
        self.cess_rate.ok_or_else(|| {
            PayrollTaxError::Configuration(format!("{}: cess rate is missing", self.id))
        })
    }

    /// Whether the window covers the whole of `tax_year`.
    pub fn covers(&self, tax_year: &TaxYear) -> bool {
        self.effective_from <= tax_year.start()
            && self.effective_to.map_or(true, |to| to >= tax_year.end())
    }

    /// Structural checks; any failure is a fatal configuration defect.
    pub fn validate(&self) -> PayrollTaxResult<()> {
        let mut problems: Vec<String> = Vec::new();

        if let Some(to) = self.effective_to {
            if to < self.effective_from {
                problems.push(format!(
                    "effective_to {} precedes effective_from {}",
                    to, self.effective_from
                ));
            }
        }

        validate_slabs("slabs.normal", &self.slabs.normal, &mut problems);
        if let Some(senior) = &self.slabs.senior {
            validate_slabs("slabs.senior", senior, &mut problems);
        }
        if let Some(super_senior) = &self.slabs.super_senior {
            validate_slabs("slabs.super_senior", super_senior, &mut problems);
        }

        if let Some(rebate) = &self.rebate {
            if rebate.threshold.is_negative() || rebate.cap.is_negative() {
                problems.push("rebate threshold and cap must not be negative".into());
            }
        }

        let mut previous: Option<&SurchargeTier> = None;
        for (i, tier) in self.surcharge.iter().enumerate() {
            if !is_rate(tier.rate) || tier.rate.is_zero() {
                problems.push(format!("surcharge[{}] rate {} outside (0, 1]", i, tier.rate));
            }
            if let Some(prev) = previous {
                if tier.threshold <= prev.threshold {
                    problems.push(format!(
                        "surcharge[{}] threshold {} does not exceed the previous tier",
                        i, tier.threshold
                    ));
                }
                if tier.rate < prev.rate {
                    problems.push(format!("surcharge[{}] rate decreases", i));
                }
            }
            previous = Some(tier);
        }

        match self.cess_rate {
            None => problems.push("cess rate is missing".into()),
            Some(rate) if !is_rate(rate) => {
                problems.push(format!("cess rate {} outside [0, 1]", rate))
            }
            _ => {}
        }

        if self.standard_deduction.is_negative() {
            problems.push("standard deduction must not be negative".into());
        }
        for (name, amount) in self.exemptions.amounts() {
            if amount.is_negative() {
                problems.push(format!("exemptions.{} must not be negative", name));
            }
        }

        let mut seen = HashSet::new();
        for rule in &self.deductions {
            if !seen.insert(rule.code) {
                problems.push(format!("deduction {} listed twice", rule.code));
            }
            if !rule.cap.is_well_formed() {
                problems.push(format!("deduction {} has a malformed cap", rule.code));
            }
        }
        for group in &self.deduction_groups {
            if group.limit.is_negative() {
                problems.push(format!("deduction group {} limit is negative", group.name));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(PayrollTaxError::Configuration(format!(
                "{}: {}",
                self.id,
                problems.join("; ")
            )))
        }
    }
}

fn is_rate(rate: Decimal) -> bool {
    !rate.is_sign_negative() && rate <= Decimal::ONE
}

fn validate_slabs(name: &str, slabs: &[Slab], problems: &mut Vec<String>) {
    if slabs.is_empty() {
        problems.push(format!("{} is empty", name));
        return;
    }
    if !slabs[0].lower.is_zero() {
        problems.push(format!("{} must start at zero", name));
    }
    for (i, slab) in slabs.iter().enumerate() {
        if !is_rate(slab.rate) {
            problems.push(format!("{}[{}] rate {} outside [0, 1]", name, i, slab.rate));
        }
        let is_last = i + 1 == slabs.len();
        match slab.upper {
            Some(upper) if upper <= slab.lower => {
                problems.push(format!("{}[{}] upper bound does not exceed lower bound", name, i))
            }
            Some(_) if is_last => problems.push(format!("{} top band must be unbounded", name)),
            None if !is_last => problems.push(format!("{}[{}] is unbounded but not last", name, i)),
            _ => {}
        }
        if i > 0 && slabs[i - 1].upper != Some(slab.lower) {
            problems.push(format!("{}[{}] is not contiguous with the previous band", name, i));
        }
    }
}
