use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::Violation;
use crate::income::{require_non_negative, HeadComputation, IncomeHead, TaxableIncomeSource};
use crate::profile::TaxpayerProfile;
use crate::regime::RegimeRules;
use crate::types::{Money, Rate};

/// Flat repairs allowance on the net annual value of a let-out property.
const LET_OUT_STANDARD_DEDUCTION: Rate = dec!(0.30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyUse {
    SelfOccupied,
    LetOut,
    DeemedLetOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseProperty {
    pub usage: PropertyUse,
    /// Gross annual value; actual or deemed rent.
    #[serde(default)]
    pub annual_rent: Money,
    #[serde(default)]
    pub municipal_taxes: Money,
    #[serde(default)]
    pub home_loan_interest: Money,
}

/// Every property of the taxpayer. Interest caps and loss set-off limits
/// apply to the whole collection, so it is one income source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HouseProperties {
    pub properties: Vec<HouseProperty>,
}

impl HouseProperties {
    pub fn new(properties: Vec<HouseProperty>) -> Self {
        Self { properties }
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl TaxableIncomeSource for HouseProperties {
    fn head(&self) -> IncomeHead {
        IncomeHead::HouseProperty
    }

    fn compute(&self, rules: &RegimeRules, _profile: &TaxpayerProfile) -> HeadComputation {
        let limits = &rules.exemptions;
        let rented = || {
            self.properties
                .iter()
                .filter(|p| p.usage != PropertyUse::SelfOccupied)
        };

        let gross: Money = rented().map(|p| p.annual_rent).sum();
        let mut hc = HeadComputation::start(IncomeHead::HouseProperty, gross);

        let municipal: Money = rented()
            .map(|p| p.municipal_taxes.min(p.annual_rent))
            .sum();
        hc.exempt("municipal taxes", municipal);

        let net_annual_value = gross - municipal;
        hc.exempt(
            "standard deduction on let-out property",
            net_annual_value.mul_rate(LET_OUT_STANDARD_DEDUCTION),
        );

        let let_out_interest: Money = rented().map(|p| p.home_loan_interest).sum();
        hc.exempt("interest on let-out property loans", let_out_interest);

        let self_occupied_interest: Money = self
            .properties
            .iter()
            .filter(|p| p.usage == PropertyUse::SelfOccupied)
            .map(|p| p.home_loan_interest)
            .sum();
        hc.exempt(
            "interest on self-occupied property loans",
            self_occupied_interest.min(limits.self_occupied_interest_cap),
        );

        let setoff_cap = limits.house_property_loss_setoff_cap;
        if hc.taxable < -setoff_cap {
            hc.carried_forward_loss = -(hc.taxable + setoff_cap);
            hc.taxable = if setoff_cap.is_zero() {
                Money::ZERO
            } else {
                -setoff_cap
            };
        }
        hc
    }

    fn validate(&self) -> Vec<Violation> {
        let mut v = Vec::new();
        for (i, p) in self.properties.iter().enumerate() {
            require_non_negative(&format!("house_property[{}].annual_rent", i), p.annual_rent, &mut v);
            require_non_negative(
                &format!("house_property[{}].municipal_taxes", i),
                p.municipal_taxes,
                &mut v,
            );
            require_non_negative(
                &format!("house_property[{}].home_loan_interest", i),
                p.home_loan_interest,
                &mut v,
            );
            if p.usage == PropertyUse::SelfOccupied && p.annual_rent.is_positive() {
                v.push(Violation::new(
                    format!("house_property[{}].annual_rent", i),
                    "a self-occupied property has no annual value",
                ));
            }
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

    fn self_occupied(interest: i64) -> HouseProperty {
        HouseProperty {
            usage: PropertyUse::SelfOccupied,
            annual_rent: Money::ZERO,
            municipal_taxes: Money::ZERO,
            home_loan_interest: Money::from_rupees(interest),
        }
    }

    #[test]
    fn test_self_occupied_interest_capped_under_legacy() {
        let hp = HouseProperties::new(vec![self_occupied(350_000)]);
        let hc = hp.compute(&rules(TaxRegime::Legacy), &TaxpayerProfile::new(40));
        assert_eq!(hc.taxable, Money::from_rupees(-200_000));
        assert_eq!(hc.carried_forward_loss, Money::ZERO);
    }

    #[test]
    fn test_self_occupied_interest_disallowed_under_simplified() {
        let hp = HouseProperties::new(vec![self_occupied(350_000)]);
        let hc = hp.compute(&rules(TaxRegime::Simplified), &TaxpayerProfile::new(40));
        assert_eq!(hc.taxable, Money::ZERO);
    }

    #[test]
    fn test_let_out_income_after_municipal_tax_and_thirty_percent() {
        let hp = HouseProperties::new(vec![HouseProperty {
            usage: PropertyUse::LetOut,
            annual_rent: Money::from_rupees(360_000),
            municipal_taxes: Money::from_rupees(10_000),
            home_loan_interest: Money::from_rupees(50_000),
        }]);
        let hc = hp.compute(&rules(TaxRegime::Simplified), &TaxpayerProfile::new(40));
        // NAV 350,000; 30% = 105,000; interest 50,000 => 195,000
        assert_eq!(hc.taxable, Money::from_rupees(195_000));
    }

    #[test]
    fn test_let_out_loss_set_off_limited_per_regime() {
        let hp = HouseProperties::new(vec![HouseProperty {
            usage: PropertyUse::LetOut,
            annual_rent: Money::from_rupees(100_000),
            municipal_taxes: Money::ZERO,
            home_loan_interest: Money::from_rupees(400_000),
        }]);
        let profile = TaxpayerProfile::new(40);
        // 100,000 - 30,000 - 400,000 = -330,000
        let legacy = hp.compute(&rules(TaxRegime::Legacy), &profile);
        assert_eq!(legacy.taxable, Money::from_rupees(-200_000));
        assert_eq!(legacy.carried_forward_loss, Money::from_rupees(130_000));

        let simplified = hp.compute(&rules(TaxRegime::Simplified), &profile);
        assert_eq!(simplified.taxable, Money::ZERO);
        assert_eq!(simplified.carried_forward_loss, Money::from_rupees(330_000));
    }

    #[test]
    fn test_rent_on_self_occupied_is_a_violation() {
        let mut p = self_occupied(0);
        p.annual_rent = Money::from_rupees(1);
        assert_eq!(HouseProperties::new(vec![p]).validate().len(), 1);
    }
}
