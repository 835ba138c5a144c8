use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::Violation;
use crate::income::{require_non_negative, HeadComputation, IncomeHead, TaxableIncomeSource};
use crate::profile::TaxpayerProfile;
use crate::regime::RegimeRules;
use crate::types::Money;

/// Months of average salary that bound the leave encashment exemption.
const LEAVE_ENCASHMENT_MONTHS: u32 = 10;
const DAYS_PER_LEAVE_MONTH: Decimal = dec!(30);
/// Commuted pension is exempt up to a third of the full value when gratuity
/// is also received, otherwise up to a half.
const COMMUTED_DIVISOR_WITH_GRATUITY: Decimal = dec!(3);
const COMMUTED_DIVISOR_WITHOUT_GRATUITY: Decimal = dec!(2);
const GRATUITY_DAYS_PER_YEAR: Decimal = dec!(15);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gratuity {
    pub received: Money,
    /// Basic plus DA for the last month (Act-covered) or the ten-month
    /// average (otherwise).
    pub monthly_salary: Money,
    pub years_of_service: u32,
    pub covered_by_act: bool,
}

impl Gratuity {
    /// The service-linked formula amount before the statutory ceiling.
    pub fn formula_amount(&self) -> Money {
        let working_days = if self.covered_by_act { dec!(26) } else { dec!(30) };
        let years = Decimal::from(self.years_of_service);
        Money::new(self.monthly_salary.amount() * GRATUITY_DAYS_PER_YEAR * years / working_days)
            .round_paise()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaveEncashment {
    pub received: Money,
    pub average_monthly_salary: Money,
    pub unavailed_leave_days: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommutedPension {
    pub received: Money,
    /// Value had the whole pension been commuted.
    pub full_commutation_value: Money,
    pub receives_gratuity: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetirementBenefits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gratuity: Option<Gratuity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leave_encashment: Option<LeaveEncashment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commuted_pension: Option<CommutedPension>,
    pub uncommuted_pension: Money,
    pub vrs_compensation: Money,
}

impl RetirementBenefits {
    pub fn gross(&self) -> Money {
        self.gratuity.as_ref().map_or(Money::ZERO, |g| g.received)
            + self.leave_encashment.as_ref().map_or(Money::ZERO, |l| l.received)
            + self.commuted_pension.as_ref().map_or(Money::ZERO, |c| c.received)
            + self.uncommuted_pension
            + self.vrs_compensation
    }
}

impl TaxableIncomeSource for RetirementBenefits {
    fn head(&self) -> IncomeHead {
        IncomeHead::RetirementBenefits
    }

    fn compute(&self, rules: &RegimeRules, profile: &TaxpayerProfile) -> HeadComputation {
        let limits = &rules.exemptions;
        let government = profile.is_government_employee;
        let mut hc = HeadComputation::start(IncomeHead::RetirementBenefits, self.gross());

        if let Some(g) = &self.gratuity {
            let exempt = if government {
                g.received
            } else {
                g.received.min(g.formula_amount()).min(limits.gratuity_cap)
            };
            hc.exempt("gratuity", exempt);
        }

        if let Some(l) = &self.leave_encashment {
            let exempt = if government {
                l.received
            } else {
                let by_months = l
                    .average_monthly_salary
                    .mul_rate(Decimal::from(LEAVE_ENCASHMENT_MONTHS));
                let by_leave = Money::new(
                    l.average_monthly_salary.amount() * l.unavailed_leave_days / DAYS_PER_LEAVE_MONTH,
                )
                .round_paise();
                l.received
                    .min(by_months)
                    .min(by_leave)
                    .min(limits.leave_encashment_cap)
            };
            hc.exempt("leave encashment", exempt);
        }

        if let Some(c) = &self.commuted_pension {
            let exempt = if government {
                c.received
            } else {
                let divisor = if c.receives_gratuity {
                    COMMUTED_DIVISOR_WITH_GRATUITY
                } else {
                    COMMUTED_DIVISOR_WITHOUT_GRATUITY
                };
                let limit = Money::new(c.full_commutation_value.amount() / divisor).round_paise();
                c.received.min(limit)
            };
            hc.exempt("commuted pension", exempt);
        }

        hc.exempt(
            "voluntary retirement compensation",
            self.vrs_compensation.min(limits.vrs_compensation_cap),
        );

        hc.clamp_non_negative()
    }

    fn validate(&self) -> Vec<Violation> {
        let mut v = Vec::new();
        if let Some(g) = &self.gratuity {
            require_non_negative("retirement.gratuity.received", g.received, &mut v);
            require_non_negative("retirement.gratuity.monthly_salary", g.monthly_salary, &mut v);
        }
        if let Some(l) = &self.leave_encashment {
            require_non_negative("retirement.leave_encashment.received", l.received, &mut v);
            require_non_negative(
                "retirement.leave_encashment.average_monthly_salary",
                l.average_monthly_salary,
                &mut v,
            );
            if l.unavailed_leave_days.is_sign_negative() {
                v.push(Violation::new(
                    "retirement.leave_encashment.unavailed_leave_days",
                    "must not be negative",
                ));
            }
        }
        if let Some(c) = &self.commuted_pension {
            require_non_negative("retirement.commuted_pension.received", c.received, &mut v);
            if c.received > c.full_commutation_value {
                v.push(Violation::new(
                    "retirement.commuted_pension.received",
                    "cannot exceed the full commutation value",
                ));
            }
        }
        require_non_negative("retirement.uncommuted_pension", self.uncommuted_pension, &mut v);
        require_non_negative("retirement.vrs_compensation", self.vrs_compensation, &mut v);
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regime::{RegimeCatalog, RegimeConfigProvider, TaxRegime, TaxYear};

    fn rules() -> RegimeRules {
        RegimeCatalog::builtin()
            .unwrap()
            .rules_for(&TaxYear::starting(2024).unwrap(), TaxRegime::Simplified)
            .unwrap()
            .clone()
    }

    fn gratuity_only(received: i64) -> RetirementBenefits {
        RetirementBenefits {
            gratuity: Some(Gratuity {
                received: Money::from_rupees(received),
                monthly_salary: Money::from_rupees(52_000),
                years_of_service: 20,
                covered_by_act: true,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_gratuity_formula_for_act_covered_employee() {
        // 15/26 * 52,000 * 20 = 600,000
        let benefits = gratuity_only(800_000);
        let profile = TaxpayerProfile::new(60);
        assert_eq!(benefits.taxable_amount(&rules(), &profile), Money::from_rupees(200_000));
    }

    #[test]
    fn test_gratuity_fully_exempt_for_government_employee() {
        let benefits = gratuity_only(800_000);
        let profile = TaxpayerProfile {
            age: 60,
            is_government_employee: true,
            ..Default::default()
        };
        assert_eq!(benefits.taxable_amount(&rules(), &profile), Money::ZERO);
    }

    #[test]
    fn test_leave_encashment_bounded_by_unavailed_days() {
        let benefits = RetirementBenefits {
            leave_encashment: Some(LeaveEncashment {
                received: Money::from_rupees(500_000),
                average_monthly_salary: Money::from_rupees(60_000),
                unavailed_leave_days: dec!(150),
            }),
            ..Default::default()
        };
        // 150 days = 5 months => 300,000 exempt
        let hc = benefits.compute(&rules(), &TaxpayerProfile::new(58));
        assert_eq!(hc.taxable, Money::from_rupees(200_000));
    }

    #[test]
    fn test_commuted_pension_third_exempt_with_gratuity() {
        let benefits = RetirementBenefits {
            commuted_pension: Some(CommutedPension {
                received: Money::from_rupees(400_000),
                full_commutation_value: Money::from_rupees(900_000),
                receives_gratuity: true,
            }),
            uncommuted_pension: Money::from_rupees(120_000),
            ..Default::default()
        };
        let hc = benefits.compute(&rules(), &TaxpayerProfile::new(62));
        // 400,000 - 300,000 + 120,000
        assert_eq!(hc.taxable, Money::from_rupees(220_000));
    }

    #[test]
    fn test_vrs_compensation_capped() {
        let benefits = RetirementBenefits {
            vrs_compensation: Money::from_rupees(700_000),
            ..Default::default()
        };
        assert_eq!(
            benefits.taxable_amount(&rules(), &TaxpayerProfile::new(55)),
            Money::from_rupees(200_000)
        );
    }
}
