use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Violation;
use crate::income::{require_non_negative, HeadComputation, IncomeHead, TaxableIncomeSource};
use crate::profile::TaxpayerProfile;
use crate::regime::RegimeRules;
use crate::types::Money;

/// Cost inflation index values for the years of acquisition and sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostInflationIndex {
    pub acquisition: u32,
    pub sale: u32,
}

impl CostInflationIndex {
    /// Scale a historical cost to sale-year terms, rounded to paise.
    pub fn index(&self, cost: Money) -> Money {
        if self.acquisition == 0 {
            return cost;
        }
        let factor = Decimal::from(self.sale) / Decimal::from(self.acquisition);
        cost.mul_rate(factor).round_paise()
    }
}

/// A long-term disposal of a non-equity asset (property, gold, debt funds).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetDisposal {
    pub description: String,
    pub sale_consideration: Money,
    pub transfer_expenses: Money,
    pub cost_of_acquisition: Money,
    pub cost_of_improvement: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexation: Option<CostInflationIndex>,
}

impl AssetDisposal {
    pub fn unindexed_gain(&self) -> Money {
        self.sale_consideration
            - self.transfer_expenses
            - self.cost_of_acquisition
            - self.cost_of_improvement
    }

    /// Reduction in gain from indexing the costs.
    pub fn indexation_benefit(&self) -> Money {
        match &self.indexation {
            Some(cii) => {
                let costs = self.cost_of_acquisition + self.cost_of_improvement;
                cii.index(self.cost_of_acquisition) + cii.index(self.cost_of_improvement) - costs
            }
            None => Money::ZERO,
        }
    }
}

/// Realised capital gains for the year. Losses arise only from disposals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapitalGains {
    pub short_term_equity: Money,
    pub short_term_other: Money,
    pub long_term_equity: Money,
    pub long_term_disposals: Vec<AssetDisposal>,
}

impl TaxableIncomeSource for CapitalGains {
    fn head(&self) -> IncomeHead {
        IncomeHead::CapitalGains
    }

    fn compute(&self, rules: &RegimeRules, _profile: &TaxpayerProfile) -> HeadComputation {
        let short_term = self.short_term_equity + self.short_term_other;
        let unindexed: Money = self
            .long_term_disposals
            .iter()
            .map(AssetDisposal::unindexed_gain)
            .sum();
        let indexation: Money = self
            .long_term_disposals
            .iter()
            .map(AssetDisposal::indexation_benefit)
            .sum();

        let mut hc = HeadComputation::start(
            IncomeHead::CapitalGains,
            short_term + self.long_term_equity + unindexed,
        );
        let equity_exemption = self
            .long_term_equity
            .min(rules.exemptions.ltcg_equity_exemption);
        hc.exempt("long-term equity gains exemption", equity_exemption);
        hc.exempt("cost indexation", indexation);

        // Long-term losses only offset long-term gains.
        let long_term = self.long_term_equity - equity_exemption + unindexed - indexation;
        if long_term.is_negative() {
            hc.carried_forward_loss = -long_term;
            hc.taxable = short_term;
        }
        hc.clamp_non_negative()
    }

    fn validate(&self) -> Vec<Violation> {
        let mut v = Vec::new();
        require_non_negative("capital_gains.short_term_equity", self.short_term_equity, &mut v);
        require_non_negative("capital_gains.short_term_other", self.short_term_other, &mut v);
        require_non_negative("capital_gains.long_term_equity", self.long_term_equity, &mut v);
        for (i, d) in self.long_term_disposals.iter().enumerate() {
            let field = |name: &str| format!("capital_gains.long_term_disposals[{}].{}", i, name);
            require_non_negative(&field("sale_consideration"), d.sale_consideration, &mut v);
            require_non_negative(&field("transfer_expenses"), d.transfer_expenses, &mut v);
            require_non_negative(&field("cost_of_acquisition"), d.cost_of_acquisition, &mut v);
            require_non_negative(&field("cost_of_improvement"), d.cost_of_improvement, &mut v);
            if let Some(cii) = &d.indexation {
                if cii.acquisition == 0 || cii.sale < cii.acquisition {
                    v.push(Violation::new(
                        field("indexation"),
                        format!(
                            "index {} -> {} must be positive and non-decreasing",
                            cii.acquisition, cii.sale
                        ),
                    ));
                }
            }
        }
        v
    }
}
