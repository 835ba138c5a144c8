use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

use crate::error::{PayrollTaxError, Violation};
use crate::income::{require_non_negative, Perquisites, SalaryIncome};
use crate::types::Money;
use crate::PayrollTaxResult;

// ---------------------------------------------------------------------------
// Salary structure
// ---------------------------------------------------------------------------

/// Monthly pay components. Summed over months it becomes an annual figure
/// with the same shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonthlyPay {
    pub basic: Money,
    pub dearness_allowance: Money,
    pub hra: Money,
    pub special_allowance: Money,
    pub other_allowances: Money,
    /// Taxable value of non-cash benefits for the month.
    pub perquisites: Money,
    pub rent_paid: Money,
    pub professional_tax: Money,
    pub provident_fund: Money,
}

impl MonthlyPay {
    /// Cash salary before any deduction.
    pub fn gross(&self) -> Money {
        self.basic + self.dearness_allowance + self.hra + self.special_allowance + self.other_allowances
    }

    /// Cash salary scaled by `factor`, to paise. Perquisites, rent and
    /// payroll deductions are unaffected.
    pub fn scale_earnings(&self, factor: Decimal) -> MonthlyPay {
        let scale = |m: Money| m.mul_rate(factor).round_paise();
        MonthlyPay {
            basic: scale(self.basic),
            dearness_allowance: scale(self.dearness_allowance),
            hra: scale(self.hra),
            special_allowance: scale(self.special_allowance),
            other_allowances: scale(self.other_allowances),
            ..self.clone()
        }
    }

    /// The same pay for `months` months.
    pub fn repeated(&self, months: u32) -> MonthlyPay {
        let n = Decimal::from(months);
        MonthlyPay {
            basic: self.basic.mul_rate(n),
            dearness_allowance: self.dearness_allowance.mul_rate(n),
            hra: self.hra.mul_rate(n),
            special_allowance: self.special_allowance.mul_rate(n),
            other_allowances: self.other_allowances.mul_rate(n),
            perquisites: self.perquisites.mul_rate(n),
            rent_paid: self.rent_paid.mul_rate(n),
            professional_tax: self.professional_tax.mul_rate(n),
            provident_fund: self.provident_fund.mul_rate(n),
        }
    }

    /// Annual salary head for a year's worth of summed pay.
    pub fn to_salary_income(&self, metro_city: bool) -> SalaryIncome {
        SalaryIncome {
            basic: self.basic,
            dearness_allowance: self.dearness_allowance,
            hra_received: self.hra,
            rent_paid: self.rent_paid,
            metro_city,
            special_allowance: self.special_allowance,
            other_allowances: self.other_allowances,
            professional_tax: self.professional_tax,
            ..Default::default()
        }
    }

    pub fn to_perquisites(&self) -> Perquisites {
        Perquisites {
            other: self.perquisites,
            ..Default::default()
        }
    }

    pub fn validate(&self, prefix: &str) -> Vec<Violation> {
        let mut v = Vec::new();
        for (field, amount) in [
            ("basic", self.basic),
            ("dearness_allowance", self.dearness_allowance),
            ("hra", self.hra),
            ("special_allowance", self.special_allowance),
            ("other_allowances", self.other_allowances),
            ("perquisites", self.perquisites),
            ("rent_paid", self.rent_paid),
            ("professional_tax", self.professional_tax),
            ("provident_fund", self.provident_fund),
        ] {
            require_non_negative(&format!("{}.{}", prefix, field), amount, &mut v);
        }
        v
    }
}

impl Add for MonthlyPay {
    type Output = MonthlyPay;
    fn add(self, rhs: MonthlyPay) -> MonthlyPay {
        MonthlyPay {
            basic: self.basic + rhs.basic,
            dearness_allowance: self.dearness_allowance + rhs.dearness_allowance,
            hra: self.hra + rhs.hra,
            special_allowance: self.special_allowance + rhs.special_allowance,
            other_allowances: self.other_allowances + rhs.other_allowances,
            perquisites: self.perquisites + rhs.perquisites,
            rent_paid: self.rent_paid + rhs.rent_paid,
            professional_tax: self.professional_tax + rhs.professional_tax,
            provident_fund: self.provident_fund + rhs.provident_fund,
        }
    }
}

/// New pay from the month containing `effective_from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRevision {
    pub effective_from: NaiveDate,
    pub pay: MonthlyPay,
}

/// Employment within the tax year: joining date, opening pay and any
/// revisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentPeriod {
    pub joining_date: NaiveDate,
    pub pay: MonthlyPay,
    #[serde(default)]
    pub revisions: Vec<SalaryRevision>,
}

impl EmploymentPeriod {
    /// Pay in force for the month starting `month_start`.
    pub fn pay_for(&self, month_start: NaiveDate) -> &MonthlyPay {
        self.revisions
            .iter()
            .filter(|r| first_of_month(r.effective_from) <= month_start)
            .max_by_key(|r| r.effective_from)
            .map_or(&self.pay, |r| &r.pay)
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day0(0).unwrap_or(date)
}

// ---------------------------------------------------------------------------
// Monthly record and status machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayrollStatus {
    Pending,
    Computed,
    Approved,
    Disbursed,
}

impl PayrollStatus {
    pub fn can_transition_to(&self, to: PayrollStatus) -> bool {
        use PayrollStatus::*;
        matches!(
            (self, to),
            (Pending, Computed) | (Computed, Pending) | (Computed, Approved) | (Approved, Disbursed)
        )
    }

    /// Approved and disbursed records are corrected only by a new revision.
    pub fn is_final(&self) -> bool {
        matches!(self, PayrollStatus::Approved | PayrollStatus::Disbursed)
    }
}

impl fmt::Display for PayrollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PayrollStatus::Pending => "pending",
            PayrollStatus::Computed => "computed",
            PayrollStatus::Approved => "approved",
            PayrollStatus::Disbursed => "disbursed",
        };
        f.write_str(s)
    }
}

/// One employee-month of payroll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySalary {
    pub employee_id: String,
    pub year: i32,
    pub month: u32,
    /// Starts at 1; each correction of a final record adds one.
    pub revision: u32,
    pub status: PayrollStatus,
    /// Cash salary for the month after joining pro-ration, before LWP.
    pub gross_salary: Money,
    pub perquisites: Money,
    pub lwp_factor: Decimal,
    pub earned_salary: Money,
    /// Professional tax and provident fund.
    pub payroll_deductions: Money,
    pub tax_withheld: Money,
    pub net_pay: Money,
}

impl MonthlySalary {
    /// A copy in status `to`. The record itself never changes.
    pub fn transition(&self, to: PayrollStatus) -> PayrollTaxResult<MonthlySalary> {
        if !self.status.can_transition_to(to) {
            return Err(PayrollTaxError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        Ok(MonthlySalary {
            status: to,
            ..self.clone()
        })
    }

    /// Start a correction of a final record: same month, next revision,
    /// back to pending.
    pub fn new_revision(&self) -> PayrollTaxResult<MonthlySalary> {
        if !self.status.is_final() {
            return Err(PayrollTaxError::InvalidTransition {
                from: self.status.to_string(),
                to: "revision".into(),
            });
        }
        Ok(MonthlySalary {
            revision: self.revision + 1,
            status: PayrollStatus::Pending,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pay(basic: i64) -> MonthlyPay {
        MonthlyPay {
            basic: Money::from_rupees(basic),
            hra: Money::from_rupees(basic / 2),
            professional_tax: Money::from_rupees(200),
            ..Default::default()
        }
    }

    fn record(status: PayrollStatus) -> MonthlySalary {
        MonthlySalary {
            employee_id: "E-7".into(),
            year: 2024,
            month: 4,
            revision: 1,
            status,
            gross_salary: Money::from_rupees(100_000),
            perquisites: Money::ZERO,
            lwp_factor: dec!(1),
            earned_salary: Money::from_rupees(100_000),
            payroll_deductions: Money::from_rupees(200),
            tax_withheld: Money::from_rupees(9_000),
            net_pay: Money::from_rupees(90_800),
        }
    }

    #[test]
    fn test_scale_earnings_keeps_deductions() {
        let scaled = pay(60_000).scale_earnings(dec!(0.5));
        assert_eq!(scaled.basic, Money::from_rupees(30_000));
        assert_eq!(scaled.hra, Money::from_rupees(15_000));
        assert_eq!(scaled.professional_tax, Money::from_rupees(200));
    }

    #[test]
    fn test_repeated_and_add_agree() {
        let p = pay(50_000);
        assert_eq!(p.clone() + p.clone() + p.clone(), p.repeated(3));
    }

    #[test]
    fn test_revision_applies_from_containing_month() {
        let period = EmploymentPeriod {
            joining_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            pay: pay(50_000),
            revisions: vec![SalaryRevision {
                effective_from: NaiveDate::from_ymd_opt(2024, 9, 15).unwrap(),
                pay: pay(60_000),
            }],
        };
        let aug = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        let sep = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        assert_eq!(period.pay_for(aug).basic, Money::from_rupees(50_000));
        assert_eq!(period.pay_for(sep).basic, Money::from_rupees(60_000));
    }

    #[test]
    fn test_status_machine() {
        let computed = record(PayrollStatus::Pending)
            .transition(PayrollStatus::Computed)
            .unwrap();
        assert_eq!(computed.status, PayrollStatus::Computed);
        assert!(computed.transition(PayrollStatus::Pending).is_ok());

        let approved = computed.transition(PayrollStatus::Approved).unwrap();
        let err = approved.transition(PayrollStatus::Pending).unwrap_err();
        assert!(matches!(err, PayrollTaxError::InvalidTransition { .. }));
        assert!(approved.transition(PayrollStatus::Disbursed).is_ok());
    }

    #[test]
    fn test_final_record_corrected_by_new_revision() {
        let disbursed = record(PayrollStatus::Disbursed);
        let correction = disbursed.new_revision().unwrap();
        assert_eq!(correction.revision, 2);
        assert_eq!(correction.status, PayrollStatus::Pending);
        assert_eq!(disbursed.status, PayrollStatus::Disbursed);

        assert!(record(PayrollStatus::Computed).new_revision().is_err());
    }
}
