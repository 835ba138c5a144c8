use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::Violation;
use crate::income::{require_non_negative, HeadComputation, IncomeHead, TaxableIncomeSource};
use crate::profile::TaxpayerProfile;
use crate::regime::RegimeRules;
use crate::types::Money;

/// Interest, dividends and family pension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtherIncome {
    pub savings_interest: Money,
    pub deposit_interest: Money,
    pub dividends: Money,
    pub family_pension: Money,
    pub other: Money,
}

impl OtherIncome {
    pub fn gross(&self) -> Money {
        self.savings_interest + self.deposit_interest + self.dividends + self.family_pension + self.other
    }

    /// A third of family pension, up to the regime's ceiling.
    pub fn family_pension_deduction(&self, rules: &RegimeRules) -> Money {
        Money::new(self.family_pension.amount() / dec!(3))
            .round_paise()
            .min(rules.exemptions.family_pension_cap)
    }
}

impl TaxableIncomeSource for OtherIncome {
    fn head(&self) -> IncomeHead {
        IncomeHead::OtherSources
    }

    fn compute(&self, rules: &RegimeRules, _profile: &TaxpayerProfile) -> HeadComputation {
        let mut hc = HeadComputation::start(IncomeHead::OtherSources, self.gross());
        hc.exempt("family pension deduction", self.family_pension_deduction(rules));
        hc.clamp_non_negative()
    }

    fn validate(&self) -> Vec<Violation> {
        let mut v = Vec::new();
        for (field, amount) in [
            ("other_income.savings_interest", self.savings_interest),
            ("other_income.deposit_interest", self.deposit_interest),
            ("other_income.dividends", self.dividends),
            ("other_income.family_pension", self.family_pension),
            ("other_income.other", self.other),
        ] {
            require_non_negative(field, amount, &mut v);
        }
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regime::{RegimeCatalog, RegimeConfigProvider, TaxRegime, TaxYear};

    fn rules(regime: TaxRegime) -> RegimeRules {
        RegimeCatalog::builtin()
            .unwrap()
            .rules_for(&TaxYear::starting(2024).unwrap(), regime)
            .unwrap()
            .clone()
    }

    #[test]
    fn test_family_pension_ceiling_differs_by_regime() {
        let income = OtherIncome {
            family_pension: Money::from_rupees(120_000),
            deposit_interest: Money::from_rupees(20_000),
            ..Default::default()
        };
        let profile = TaxpayerProfile::new(70);
        assert_eq!(
            income.taxable_amount(&rules(TaxRegime::Legacy), &profile),
            Money::from_rupees(125_000)
        );
        assert_eq!(
            income.taxable_amount(&rules(TaxRegime::Simplified), &profile),
            Money::from_rupees(115_000)
        );
    }

    #[test]
    fn test_small_family_pension_takes_a_third() {
        let income = OtherIncome {
            family_pension: Money::from_rupees(30_000),
            ..Default::default()
        };
        assert_eq!(
            income.family_pension_deduction(&rules(TaxRegime::Legacy)),
            Money::from_rupees(10_000)
        );
    }

    #[test]
    fn test_negative_dividend_is_a_violation() {
        let income = OtherIncome {
            dividends: Money::from_rupees(-5),
            ..Default::default()
        };
        assert_eq!(income.validate()[0].field, "other_income.dividends");
    }
}
