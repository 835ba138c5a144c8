use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::deductions::TaxDeductions;
use crate::error::PayrollTaxError;
use crate::income::TaxableIncomeSource;
use crate::profile::TaxpayerProfile;
use crate::record::TaxationRecord;
use crate::regime::{RegimeConfigProvider, TaxRegime, TaxYear};
use crate::tax::calculation::{evaluate, TaxCalculationResult};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::PayrollTaxResult;

const BREAK_EVEN_MAX_ITERATIONS: u32 = 100;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeComparisonResult {
    pub legacy: TaxCalculationResult,
    pub simplified: TaxCalculationResult,
    /// Strictly cheaper regime; ties go to the simplified regime.
    pub recommended_regime: TaxRegime,
    pub savings: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakEvenResult {
    pub legacy_liability: Money,
    pub simplified_liability: Money,
    /// Extra legacy deductions, in whole rupees, at which the legacy
    /// liability stops exceeding the simplified one.
    pub additional_deductions_needed: Money,
    pub legacy_liability_at_break_even: Money,
    pub iterations: u32,
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Run the same income and claims through both regimes for `tax_year`.
///
/// Claims are filtered separately by each regime, so one `TaxDeductions`
/// serves both runs. Warnings from each run are prefixed with its regime.
pub fn compare_regimes(
    sources: &[&dyn TaxableIncomeSource],
    deductions: &TaxDeductions,
    profile: &TaxpayerProfile,
    tax_year: &TaxYear,
    provider: &dyn RegimeConfigProvider,
) -> PayrollTaxResult<ComputationOutput<RegimeComparisonResult>> {
    let legacy_rules = provider.rules_for(tax_year, TaxRegime::Legacy)?;
    let simplified_rules = provider.rules_for(tax_year, TaxRegime::Simplified)?;

    let legacy = evaluate(sources, deductions, legacy_rules, profile, Money::ZERO)?;
    let simplified = evaluate(sources, deductions, simplified_rules, profile, Money::ZERO)?;

    let legacy_tax = legacy.result.total_tax_liability;
    let simplified_tax = simplified.result.total_tax_liability;
    let recommended_regime = if legacy_tax < simplified_tax {
        TaxRegime::Legacy
    } else {
        TaxRegime::Simplified
    };
    let savings = (legacy_tax - simplified_tax).abs();
    debug!(%legacy_tax, %simplified_tax, %recommended_regime, "regimes compared");

    let warnings = tagged(TaxRegime::Legacy, legacy.warnings)
        .chain(tagged(TaxRegime::Simplified, simplified.warnings))
        .collect();
    let rules_id = format!("{}+{}", legacy_rules.id, simplified_rules.id);
    let assumptions = json!({
        "tax_year": tax_year.label(),
        "legacy_rules": legacy_rules.id,
        "simplified_rules": simplified_rules.id,
        "tie_break": "simplified",
    });

    Ok(with_metadata(
        "Same income and claims computed under both regimes; lower total liability recommended",
        &assumptions,
        warnings,
        Some(rules_id.as_str()),
        RegimeComparisonResult {
            legacy: legacy.result,
            simplified: simplified.result,
            recommended_regime,
            savings,
        },
    ))
}

/// [`compare_regimes`] over a record. The record's own regime is ignored.
pub fn compare_record(
    record: &TaxationRecord,
    provider: &dyn RegimeConfigProvider,
) -> PayrollTaxResult<ComputationOutput<RegimeComparisonResult>> {
    record.ensure_valid()?;
    compare_regimes(
        &record.income.sources(),
        &record.deductions,
        &record.profile,
        &record.tax_year,
        provider,
    )
}

fn tagged(regime: TaxRegime, warnings: Vec<String>) -> impl Iterator<Item = String> {
    warnings.into_iter().map(move |w| format!("[{}] {}", regime, w))
}

// ---------------------------------------------------------------------------
// Break-even
// ---------------------------------------------------------------------------

/// Smallest additional legacy deduction at which the legacy regime is no
/// more expensive than the simplified one, found by bisection over whole
/// rupees.
///
/// Zero when the legacy regime is already no worse. Legacy liability never
/// rises as deductions grow, and is zero once deductions absorb the whole
/// income, which brackets the search.
pub fn break_even_deductions(
    sources: &[&dyn TaxableIncomeSource],
    deductions: &TaxDeductions,
    profile: &TaxpayerProfile,
    tax_year: &TaxYear,
    provider: &dyn RegimeConfigProvider,
) -> PayrollTaxResult<ComputationOutput<BreakEvenResult>> {
    let legacy_rules = provider.rules_for(tax_year, TaxRegime::Legacy)?;
    let simplified_rules = provider.rules_for(tax_year, TaxRegime::Simplified)?;

    let simplified = evaluate(sources, deductions, simplified_rules, profile, Money::ZERO)?;
    let target = simplified.result.total_tax_liability;
    let base = evaluate(sources, deductions, legacy_rules, profile, Money::ZERO)?;
    let legacy_liability = base.result.total_tax_liability;

    let legacy_at = |extra: Money| -> PayrollTaxResult<Money> {
        Ok(evaluate(sources, deductions, legacy_rules, profile, extra)?
            .result
            .total_tax_liability)
    };

    let (needed, at_needed, iterations) = if legacy_liability <= target {
        (Money::ZERO, legacy_liability, 0)
    } else {
        let upper = Money::new(base.result.taxable_income.amount().ceil());
        bisect(upper, target, &legacy_at)?
    };

    let assumptions = json!({
        "tax_year": tax_year.label(),
        "legacy_rules": legacy_rules.id,
        "simplified_rules": simplified_rules.id,
        "granularity": "whole rupees",
    });

    Ok(with_metadata(
        "Bisection on additional legacy-regime deductions against the simplified-regime liability",
        &assumptions,
        tagged(TaxRegime::Legacy, base.warnings).collect(),
        Some(legacy_rules.id.as_str()),
        BreakEvenResult {
            legacy_liability,
            simplified_liability: target,
            additional_deductions_needed: needed,
            legacy_liability_at_break_even: at_needed,
            iterations,
        },
    ))
}

/// [`break_even_deductions`] over a record.
pub fn break_even_record(
    record: &TaxationRecord,
    provider: &dyn RegimeConfigProvider,
) -> PayrollTaxResult<ComputationOutput<BreakEvenResult>> {
    record.ensure_valid()?;
    break_even_deductions(
        &record.income.sources(),
        &record.deductions,
        &record.profile,
        &record.tax_year,
        provider,
    )
}

/// Narrow `(lo, hi]` until `hi` is the first whole rupee at which the
/// liability is at most `target`.
fn bisect(
    upper: Money,
    target: Money,
    liability_at: &dyn Fn(Money) -> PayrollTaxResult<Money>,
) -> PayrollTaxResult<(Money, Money, u32)> {
    let mut lo = Money::ZERO;
    let mut hi = upper;
    let mut at_hi = liability_at(hi)?;
    if at_hi > target {
        return Err(PayrollTaxError::ConvergenceFailure {
            function: "break_even_deductions".into(),
            iterations: 0,
            last_delta: (at_hi - target).amount(),
        });
    }

    let one = Money::from_rupees(1);
    let mut iterations = 0;
    while hi - lo > one {
        if iterations >= BREAK_EVEN_MAX_ITERATIONS {
            return Err(PayrollTaxError::ConvergenceFailure {
                function: "break_even_deductions".into(),
                iterations,
                last_delta: (hi - lo).amount(),
            });
        }
        iterations += 1;
        let mid = Money::new(((lo + hi).amount() / Decimal::TWO).floor());
        let at_mid = liability_at(mid)?;
        if at_mid <= target {
            hi = mid;
            at_hi = at_mid;
        } else {
            lo = mid;
        }
    }
    Ok((hi, at_hi, iterations))
}
