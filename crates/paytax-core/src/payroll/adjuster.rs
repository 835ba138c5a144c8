use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::deductions::TaxDeductions;
use crate::error::{PayrollTaxError, Violation};
use crate::income::IncomeAggregates;
use crate::payroll::lwp::LwpDetails;
use crate::payroll::monthly::{EmploymentPeriod, MonthlyPay, MonthlySalary, PayrollStatus};
use crate::profile::TaxpayerProfile;
use crate::regime::tax_year::{days_in_month, month_start};
use crate::regime::{RegimeConfigProvider, RegimeRules, TaxRegime, TaxYear};
use crate::tax::calculation::evaluate;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::PayrollTaxResult;

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithholdingRequest {
    pub employee_id: String,
    pub tax_year: TaxYear,
    pub regime: TaxRegime,
    pub profile: TaxpayerProfile,
    pub employment: EmploymentPeriod,
    #[serde(default)]
    pub metro_city: bool,
    /// Attendance feed, at most one entry per month.
    #[serde(default)]
    pub lwp: Vec<LwpDetails>,
    #[serde(default)]
    pub deductions: TaxDeductions,
    /// Non-salary heads, taken as known for the whole year. Salary and
    /// perquisites come from the employment period.
    #[serde(default)]
    pub other_income: IncomeAggregates,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithholdingSchedule {
    pub employee_id: String,
    pub tax_year: TaxYear,
    pub regime: TaxRegime,
    pub months: Vec<MonthlySalary>,
    /// Salary plus perquisites actually earned over the year.
    pub annual_salary_income: Money,
    /// Liability on the final projection, which is the actual year.
    pub annual_liability: Money,
    pub total_withheld: Money,
    /// Times the annual liability had to be recomputed.
    pub recomputations: u32,
}

/// State threaded through the months, left to right.
#[derive(Debug, Default)]
struct Accumulator {
    earned_to_date: MonthlyPay,
    withheld_to_date: Money,
    projected_income: Option<MonthlyPay>,
    liability: Money,
    recomputations: u32,
    months: Vec<MonthlySalary>,
    warnings: Vec<String>,
}

impl Accumulator {
    fn warn(&mut self, message: String) {
        if !self.warnings.contains(&message) {
            warn!("{}", message);
            self.warnings.push(message);
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Spread the annual liability over the employed months of the year.
///
/// Each month adds its actual earnings (after joining pro-ration and LWP)
/// to the running total and projects the rest of the year at the pay then
/// in force. The liability is recomputed only when that projection moves.
/// Every month but the last withholds the outstanding liability divided by
/// the months left, rounded half-up and never negative; the last month
/// withholds the exact remainder so the year reconciles to the rupee.
pub fn build_withholding_schedule(
    request: &WithholdingRequest,
    provider: &dyn RegimeConfigProvider,
) -> PayrollTaxResult<ComputationOutput<WithholdingSchedule>> {
    let violations = validate_request(request);
    if !violations.is_empty() {
        return Err(PayrollTaxError::Validation(violations));
    }
    let rules = provider.rules_for(&request.tax_year, request.regime)?;

    let start = request.employment.joining_date.max(request.tax_year.start());
    let first_month = (start.year(), start.month());
    let employed: Vec<(i32, u32)> = request
        .tax_year
        .months()
        .into_iter()
        .filter(|&ym| ym >= first_month)
        .collect();

    let mut acc = Accumulator::default();

    let mut lwp_by_month: BTreeMap<(i32, u32), &LwpDetails> = BTreeMap::new();
    for entry in &request.lwp {
        let key = (entry.year, entry.month);
        if employed.contains(&key) {
            lwp_by_month.insert(key, entry);
        } else {
            acc.warn(format!(
                "LWP for {}-{:02} falls outside employment in {}; ignored",
                entry.year,
                entry.month,
                request.tax_year.label()
            ));
        }
    }

    let total_months = employed.len();
    let acc = employed
        .iter()
        .enumerate()
        .try_fold(acc, |acc, (index, &(year, month))| {
            let ctx = MonthContext {
                request,
                rules,
                start,
                lwp: lwp_by_month.get(&(year, month)).copied(),
                remaining_after: (total_months - index - 1) as u32,
            };
            step(acc, &ctx, year, month)
        })?;

    let annual = acc.earned_to_date.gross() + acc.earned_to_date.perquisites;
    let assumptions = json!({
        "tax_year": request.tax_year.label(),
        "regime": request.regime,
        "rules_id": rules.id,
        "joining_date": request.employment.joining_date,
        "employed_months": total_months,
        "projection": "earned to date plus current pay for the remaining months",
        "rounding": "monthly withholding rounded half-up; final month takes the remainder",
    });

    Ok(with_metadata(
        "Running reconciliation of annual liability across payroll months",
        &assumptions,
        acc.warnings,
        Some(rules.id.as_str()),
        WithholdingSchedule {
            employee_id: request.employee_id.clone(),
            tax_year: request.tax_year,
            regime: request.regime,
            months: acc.months,
            annual_salary_income: annual,
            annual_liability: acc.liability,
            total_withheld: acc.withheld_to_date,
            recomputations: acc.recomputations,
        },
    ))
}

// ---------------------------------------------------------------------------
// Fold step
// ---------------------------------------------------------------------------

struct MonthContext<'a> {
    request: &'a WithholdingRequest,
    rules: &'a RegimeRules,
    start: NaiveDate,
    lwp: Option<&'a LwpDetails>,
    remaining_after: u32,
}

fn step(
    mut acc: Accumulator,
    ctx: &MonthContext<'_>,
    year: i32,
    month: u32,
) -> PayrollTaxResult<Accumulator> {
    let request = ctx.request;
    let first_day = month_start(year, month)?;
    let pay = request.employment.pay_for(first_day);

    let join_factor = if (ctx.start.year(), ctx.start.month()) == (year, month) && ctx.start.day() > 1 {
        let days = days_in_month(year, month)?;
        Decimal::from(days - ctx.start.day() + 1) / Decimal::from(days)
    } else {
        Decimal::ONE
    };

    let lwp_factor = match ctx.lwp {
        Some(details) => {
            if details.exceeds_working_days() {
                acc.warn(format!(
                    "LWP of {} days in {}-{:02} exceeds {} working days; treated as a full month",
                    details.lwp_days, year, month, details.total_working_days
                ));
            }
            details.lwp_factor()
        }
        None => Decimal::ONE,
    };

    let prorated = pay.scale_earnings(join_factor);
    let earned = MonthlyPay {
        perquisites: pay.perquisites.mul_rate(join_factor).round_paise(),
        ..prorated.scale_earnings(lwp_factor)
    };
    acc.earned_to_date = acc.earned_to_date.clone() + earned.clone();

    let projection = acc.earned_to_date.clone() + pay.repeated(ctx.remaining_after);
    if acc.projected_income.as_ref() != Some(&projection) {
        let (liability, warnings) = project_liability(request, ctx.rules, &projection)?;
        debug!(
            year,
            month,
            projected = %(projection.gross() + projection.perquisites),
            %liability,
            "annual liability recomputed"
        );
        for w in warnings {
            acc.warn(w);
        }
        acc.liability = liability;
        acc.projected_income = Some(projection);
        acc.recomputations += 1;
    }

    let earned_salary = earned.gross();
    let payroll_deductions = (pay.professional_tax + pay.provident_fund).min(earned_salary);
    let disbursable = earned_salary - payroll_deductions;

    // Non-final months withhold no more than the month pays out; the
    // shortfall stays outstanding and is spread over the months left.
    let outstanding = acc.liability - acc.withheld_to_date;
    let tax_withheld = if ctx.remaining_after == 0 {
        if outstanding.is_negative() {
            acc.warn(format!(
                "Final month reconciliation is {}: {} was withheld over a liability of {}",
                outstanding,
                acc.withheld_to_date,
                acc.liability
            ));
        } else if outstanding > disbursable {
            acc.warn(format!(
                "Final month withholding of {} exceeds the {} payable in {}-{:02}",
                outstanding, disbursable, year, month
            ));
        }
        outstanding
    } else {
        let share = outstanding
            .divide_by(ctx.remaining_after + 1)
            .round_half_up()
            .non_negative();
        if share > disbursable {
            debug!(year, month, %share, %disbursable, "withholding capped at month's pay");
        }
        share.min(disbursable)
    };
    acc.withheld_to_date += tax_withheld;

    acc.months.push(MonthlySalary {
        employee_id: request.employee_id.clone(),
        year,
        month,
        revision: 1,
        status: PayrollStatus::Computed,
        gross_salary: prorated.gross(),
        perquisites: earned.perquisites,
        lwp_factor,
        earned_salary,
        payroll_deductions,
        tax_withheld,
        net_pay: earned_salary - payroll_deductions - tax_withheld,
    });
    Ok(acc)
}

/// Annual liability if the year's salary were `projection`.
fn project_liability(
    request: &WithholdingRequest,
    rules: &RegimeRules,
    projection: &MonthlyPay,
) -> PayrollTaxResult<(Money, Vec<String>)> {
    let income = IncomeAggregates {
        salary: Some(projection.to_salary_income(request.metro_city)),
        perquisites: projection
            .perquisites
            .is_positive()
            .then(|| projection.to_perquisites()),
        ..request.other_income.clone()
    };
    let evaluation = evaluate(
        &income.sources(),
        &request.deductions,
        rules,
        &request.profile,
        Money::ZERO,
    )?;
    Ok((evaluation.result.total_tax_liability, evaluation.warnings))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_request(request: &WithholdingRequest) -> Vec<Violation> {
    let mut v = request.profile.validate();
    let tax_year = &request.tax_year;
    let employment = &request.employment;

    if request.employee_id.trim().is_empty() {
        v.push(Violation::new("employee_id", "must not be empty"));
    }
    if employment.joining_date > tax_year.end() {
        v.push(Violation::new(
            "employment.joining_date",
            format!("{} is after the end of {}", employment.joining_date, tax_year.label()),
        ));
    }
    v.extend(employment.pay.validate("employment.pay"));
    for (i, revision) in employment.revisions.iter().enumerate() {
        let prefix = format!("employment.revisions[{}]", i);
        if revision.effective_from < employment.joining_date
            || !tax_year.contains(revision.effective_from)
        {
            v.push(Violation::new(
                format!("{}.effective_from", prefix),
                format!(
                    "{} must fall between joining and the end of {}",
                    revision.effective_from,
                    tax_year.label()
                ),
            ));
        }
        v.extend(revision.pay.validate(&format!("{}.pay", prefix)));
    }

    let mut seen = Vec::new();
    for (i, entry) in request.lwp.iter().enumerate() {
        v.extend(entry.validate(i));
        let key = (entry.year, entry.month);
        if seen.contains(&key) {
            v.push(Violation::new(
                format!("lwp[{}]", i),
                format!("duplicate entry for {}-{:02}", entry.year, entry.month),
            ));
        }
        seen.push(key);
    }

    if request.other_income.salary.is_some() {
        v.push(Violation::new(
            "other_income.salary",
            "salary comes from the employment period",
        ));
    }
    if request.other_income.perquisites.is_some() {
        v.push(Violation::new(
            "other_income.perquisites",
            "perquisites come from the employment period",
        ));
    }
    for source in request.other_income.sources() {
        v.extend(source.validate());
    }
    v.extend(request.deductions.validate());
    v
}
