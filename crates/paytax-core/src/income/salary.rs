use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::Violation;
use crate::income::{require_non_negative, HeadComputation, IncomeHead, TaxableIncomeSource};
use crate::profile::TaxpayerProfile;
use crate::regime::RegimeRules;
use crate::types::{Money, Rate};

const HRA_RENT_FLOOR: Rate = dec!(0.10);
const HRA_METRO_SHARE: Rate = dec!(0.50);
const HRA_NON_METRO_SHARE: Rate = dec!(0.40);

/// Annual salary components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalaryIncome {
    pub basic: Money,
    pub dearness_allowance: Money,
    pub hra_received: Money,
    pub rent_paid: Money,
    pub metro_city: bool,
    pub special_allowance: Money,
    pub bonus: Money,
    pub other_allowances: Money,
    pub lta_received: Money,
    pub lta_exempt_claimed: Money,
    pub professional_tax: Money,
}

impl SalaryIncome {
    pub fn gross(&self) -> Money {
        self.basic
            + self.dearness_allowance
            + self.hra_received
            + self.special_allowance
            + self.bonus
            + self.other_allowances
            + self.lta_received
    }

    /// Least of HRA received, rent over 10% of basis, and 50%/40% of basis.
    pub fn hra_exemption(&self) -> Money {
        if self.hra_received.is_zero() || self.rent_paid.is_zero() {
            return Money::ZERO;
        }
        let basis = self.salary_basis();
        let rent_excess = self.rent_paid - basis.mul_rate(HRA_RENT_FLOOR);
        let share = if self.metro_city {
            HRA_METRO_SHARE
        } else {
            HRA_NON_METRO_SHARE
        };
        self.hra_received
            .min(rent_excess)
            .min(basis.mul_rate(share))
            .non_negative()
    }
}

impl TaxableIncomeSource for SalaryIncome {
    fn head(&self) -> IncomeHead {
        IncomeHead::Salary
    }

    fn compute(&self, rules: &RegimeRules, _profile: &TaxpayerProfile) -> HeadComputation {
        let limits = &rules.exemptions;
        let mut hc = HeadComputation::start(IncomeHead::Salary, self.gross());

        if limits.hra_exemption {
            hc.exempt("house rent allowance", self.hra_exemption());
        }
        if limits.lta_exemption {
            hc.exempt(
                "leave travel allowance",
                self.lta_exempt_claimed.min(self.lta_received),
            );
        }

        let standard = rules.standard_deduction.min(hc.taxable.non_negative());
        hc.exempt("standard deduction", standard);
        hc.exempt(
            "professional tax",
            self.professional_tax.min(limits.professional_tax_cap),
        );

        hc.clamp_non_negative()
    }

    fn validate(&self) -> Vec<Violation> {
        let mut v = Vec::new();
        for (field, amount) in [
            ("salary.basic", self.basic),
            ("salary.dearness_allowance", self.dearness_allowance),
            ("salary.hra_received", self.hra_received),
            ("salary.rent_paid", self.rent_paid),
            ("salary.special_allowance", self.special_allowance),
            ("salary.bonus", self.bonus),
            ("salary.other_allowances", self.other_allowances),
            ("salary.lta_received", self.lta_received),
            ("salary.lta_exempt_claimed", self.lta_exempt_claimed),
            ("salary.professional_tax", self.professional_tax),
        ] {
            require_non_negative(field, amount, &mut v);
        }
        if self.lta_exempt_claimed > self.lta_received {
            v.push(Violation::new(
                "salary.lta_exempt_claimed",
                "exempt LTA cannot exceed LTA received",
            ));
        }
        v
    }

    fn salary_basis(&self) -> Money {
        self.basic + self.dearness_allowance
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

    fn sample() -> SalaryIncome {
        SalaryIncome {
            basic: Money::from_rupees(600_000),
            hra_received: Money::from_rupees(240_000),
            rent_paid: Money::from_rupees(300_000),
            metro_city: true,
            special_allowance: Money::from_rupees(160_000),
            professional_tax: Money::from_rupees(2_400),
            ..Default::default()
        }
    }

    #[test]
    fn test_hra_exemption_is_least_of_three() {
        // HRA 240,000; rent - 10% basic = 240,000; 50% basic = 300,000.
        assert_eq!(sample().hra_exemption(), Money::from_rupees(240_000));

        let mut s = sample();
        s.rent_paid = Money::from_rupees(150_000);
        // 150,000 - 60,000 = 90,000
        assert_eq!(s.hra_exemption(), Money::from_rupees(90_000));
    }

    #[test]
    fn test_legacy_applies_hra_standard_and_professional_tax() {
        let hc = sample().compute(&rules(TaxRegime::Legacy), &TaxpayerProfile::new(35));
        assert_eq!(hc.gross, Money::from_rupees(1_000_000));
        // 1,000,000 - 240,000 - 50,000 - 2,400
        assert_eq!(hc.taxable, Money::from_rupees(707_600));
    }

    #[test]
    fn test_simplified_only_allows_standard_deduction() {
        let hc = sample().compute(&rules(TaxRegime::Simplified), &TaxpayerProfile::new(35));
        assert_eq!(hc.taxable, Money::from_rupees(925_000));
        assert_eq!(hc.exemptions.len(), 1);
    }

    #[test]
    fn test_standard_deduction_bounded_by_salary() {
        let s = SalaryIncome {
            basic: Money::from_rupees(30_000),
            ..Default::default()
        };
        let hc = s.compute(&rules(TaxRegime::Simplified), &TaxpayerProfile::new(25));
        assert_eq!(hc.taxable, Money::ZERO);
        assert_eq!(hc.total_exempt(), Money::from_rupees(30_000));
    }

    #[test]
    fn test_validation_flags_negative_and_excess_lta() {
        let s = SalaryIncome {
            basic: Money::from_rupees(-1),
            lta_exempt_claimed: Money::from_rupees(10),
            ..Default::default()
        };
        let v = s.validate();
        assert_eq!(v.len(), 2);
    }
}
