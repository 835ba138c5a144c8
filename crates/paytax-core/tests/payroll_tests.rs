#![cfg(feature = "payroll")]

use chrono::NaiveDate;
use paytax_core::deductions::{DeductionCode, TaxDeductions};
use paytax_core::income::{IncomeAggregates, OtherIncome, SalaryIncome};
use paytax_core::payroll::{
    build_withholding_schedule, EmploymentPeriod, LwpDetails, MonthlyPay, PayrollStatus,
    SalaryRevision, WithholdingRequest,
};
use paytax_core::profile::TaxpayerProfile;
use paytax_core::regime::{RegimeCatalog, RegimeConfigProvider, TaxRegime, TaxYear};
use paytax_core::tax::calculate_tax;
use paytax_core::Money;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn structured_pay() -> MonthlyPay {
    MonthlyPay {
        basic: Money::from_rupees(80_000),
        dearness_allowance: Money::from_rupees(8_000),
        hra: Money::from_rupees(35_000),
        special_allowance: Money::from_rupees(27_000),
        rent_paid: Money::from_rupees(30_000),
        professional_tax: Money::from_rupees(200),
        provident_fund: Money::from_rupees(9_600),
        ..Default::default()
    }
}

fn request(regime: TaxRegime) -> WithholdingRequest {
    WithholdingRequest {
        employee_id: "E-3100".into(),
        tax_year: TaxYear::starting(2024).unwrap(),
        regime,
        profile: TaxpayerProfile::new(41),
        employment: EmploymentPeriod {
            joining_date: date(2021, 7, 1),
            pay: structured_pay(),
            revisions: vec![],
        },
        metro_city: true,
        lwp: vec![],
        deductions: TaxDeductions::new().with(DeductionCode::Section80C, Money::from_rupees(150_000)),
        other_income: IncomeAggregates {
            other_income: Some(OtherIncome {
                deposit_interest: Money::from_rupees(25_000),
                ..Default::default()
            }),
            ..Default::default()
        },
    }
}

/// The annual liability computed directly from a year's summed pay.
fn direct_liability(req: &WithholdingRequest, annual: &MonthlyPay) -> Money {
    let catalog = RegimeCatalog::builtin().unwrap();
    let rules = catalog.rules_for(&req.tax_year, req.regime).unwrap();
    let salary: SalaryIncome = annual.to_salary_income(req.metro_city);
    let other = req.other_income.other_income.clone().unwrap_or_default();
    calculate_tax(&[&salary, &other], &req.deductions, rules, &req.profile)
        .unwrap()
        .result
        .total_tax_liability
}

// ===========================================================================
// Reconciliation
// ===========================================================================

#[test]
fn test_full_year_reconciles_to_annual_liability() {
    for regime in TaxRegime::ALL {
        let req = request(regime);
        let out = build_withholding_schedule(&req, &RegimeCatalog::builtin().unwrap()).unwrap();
        let s = out.result;
        let expected = direct_liability(&req, &structured_pay().repeated(12));

        assert_eq!(s.annual_liability, expected);
        let total: Money = s.months.iter().map(|m| m.tax_withheld).sum();
        assert_eq!(total, expected);
        assert_eq!(s.months.len(), 12);
        // Non-final months never differ by more than a rupee of rounding.
        let first = s.months[0].tax_withheld;
        for m in &s.months[..11] {
            assert!((m.tax_withheld - first).abs() <= Money::from_rupees(1));
        }
    }
}

#[test]
fn test_schedule_is_deterministic() {
    let req = request(TaxRegime::Legacy);
    let catalog = RegimeCatalog::builtin().unwrap();
    let a = build_withholding_schedule(&req, &catalog).unwrap();
    let b = build_withholding_schedule(&req, &catalog).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_net_pay_accounts_for_every_deduction() {
    let req = request(TaxRegime::Legacy);
    let s = build_withholding_schedule(&req, &RegimeCatalog::builtin().unwrap())
        .unwrap()
        .result;
    for m in &s.months {
        assert_eq!(m.status, PayrollStatus::Computed);
        assert_eq!(m.payroll_deductions, Money::from_rupees(9_800));
        assert_eq!(m.net_pay, m.earned_salary - m.payroll_deductions - m.tax_withheld);
    }
}

// ===========================================================================
// Partial years
// ===========================================================================

#[test]
fn test_joiner_in_month_seven_uses_six_months_of_salary() {
    let req = WithholdingRequest {
        employee_id: "E-3200".into(),
        tax_year: TaxYear::starting(2024).unwrap(),
        regime: TaxRegime::Legacy,
        profile: TaxpayerProfile::new(29),
        employment: EmploymentPeriod {
            joining_date: date(2024, 10, 1),
            pay: MonthlyPay {
                basic: Money::from_rupees(100_000),
                ..Default::default()
            },
            revisions: vec![],
        },
        metro_city: false,
        lwp: vec![],
        deductions: TaxDeductions::new(),
        other_income: IncomeAggregates::default(),
    };
    let s = build_withholding_schedule(&req, &RegimeCatalog::builtin().unwrap())
        .unwrap()
        .result;
    assert_eq!(s.annual_salary_income, Money::from_rupees(600_000));
    assert_ne!(s.annual_salary_income, Money::from_rupees(1_200_000));
    assert_eq!((s.months[0].year, s.months[0].month), (2024, 10));
}

#[test]
fn test_revision_and_lwp_together_reconcile() {
    let mut req = request(TaxRegime::Simplified);
    let raised = MonthlyPay {
        basic: Money::from_rupees(95_000),
        special_allowance: Money::from_rupees(32_000),
        ..structured_pay()
    };
    req.employment.revisions.push(SalaryRevision {
        effective_from: date(2024, 8, 1),
        pay: raised.clone(),
    });
    req.lwp.push(LwpDetails::new(dec!(10), dec!(31), 12, 2024));

    let out = build_withholding_schedule(&req, &RegimeCatalog::builtin().unwrap()).unwrap();
    let s = out.result;

    // April to July at the old pay, December short by 10 of 31 days
    let december = raised.scale_earnings(req.lwp[0].lwp_factor());
    let actual = structured_pay().repeated(4) + raised.repeated(7) + december;
    assert_eq!(s.annual_liability, direct_liability(&req, &actual));

    let total: Money = s.months.iter().map(|m| m.tax_withheld).sum();
    assert_eq!(total, s.annual_liability);
    assert_eq!(s.recomputations, 3);
}

// ===========================================================================
// Status machine
// ===========================================================================

#[test]
fn test_computed_month_walks_to_disbursed_then_revises() {
    let s = build_withholding_schedule(&request(TaxRegime::Legacy), &RegimeCatalog::builtin().unwrap())
        .unwrap()
        .result;
    let april = &s.months[0];
    let disbursed = april
        .transition(PayrollStatus::Approved)
        .and_then(|m| m.transition(PayrollStatus::Disbursed))
        .unwrap();
    assert!(disbursed.transition(PayrollStatus::Computed).is_err());

    let correction = disbursed.new_revision().unwrap();
    assert_eq!(correction.revision, 2);
    assert_eq!(correction.tax_withheld, april.tax_withheld);
}
