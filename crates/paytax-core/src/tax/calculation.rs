use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::deductions::{apply_deductions, AppliedDeduction, TaxDeductions};
use crate::error::PayrollTaxError;
use crate::income::{HeadComputation, TaxableIncomeSource};
use crate::profile::{AgeBracket, TaxpayerProfile};
use crate::regime::{RegimeRules, TaxRegime};
use crate::tax::slabs::{surcharge, tax_after_rebate, SlabTax};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::PayrollTaxResult;

const METHODOLOGY: &str =
    "Progressive slab tax on taxable income, rebate, surcharge with marginal relief, health and education cess";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Immutable snapshot of one regime's computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCalculationResult {
    pub regime: TaxRegime,
    pub rules_id: String,
    pub age_bracket: AgeBracket,
    pub gross_total_income: Money,
    pub total_deductions: Money,
    pub taxable_income: Money,
    pub tax_before_rebate: Money,
    pub rebate: Money,
    pub rebate_marginal_relief: Money,
    pub tax_after_rebate: Money,
    pub surcharge_rate: Rate,
    pub surcharge: Money,
    pub surcharge_relief: Money,
    pub cess: Money,
    pub total_tax_liability: Money,
    /// Liability over gross total income, 4 dp; zero without income.
    pub effective_rate: Rate,
    /// Losses that could not be set off this year.
    pub carried_forward_loss: Money,
    pub heads: Vec<HeadComputation>,
    pub deductions: Vec<AppliedDeduction>,
    pub slabs: Vec<SlabTax>,
}

/// Result plus the reconciliation warnings raised on the way.
pub(crate) struct Evaluation {
    pub result: TaxCalculationResult,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute the annual liability under one regime.
///
/// Every input is validated first; any defect aborts with the full list of
/// violations and nothing is computed. Deductions the regime does not accept
/// or claims above a ceiling are reduced and reported as warnings.
pub fn calculate_tax(
    sources: &[&dyn TaxableIncomeSource],
    deductions: &TaxDeductions,
    rules: &RegimeRules,
    profile: &TaxpayerProfile,
) -> PayrollTaxResult<ComputationOutput<TaxCalculationResult>> {
    let evaluation = evaluate(sources, deductions, rules, profile, Money::ZERO)?;
    let result = evaluation.result;

    let assumptions = json!({
        "regime": result.regime,
        "rules_id": result.rules_id,
        "age_bracket": result.age_bracket,
        "income_heads": result.heads.iter().map(|h| h.head).collect::<Vec<_>>(),
        "deductions_claimed": deductions.total_claimed(),
        "rounding": "liability rounded half-up to whole rupees",
    });

    Ok(with_metadata(
        METHODOLOGY,
        &assumptions,
        evaluation.warnings,
        Some(rules.id.as_str()),
        result,
    ))
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Shared by every public operation. `extra_deduction` is an uncapped
/// amount on top of the allowed deductions, used by the break-even search.
pub(crate) fn evaluate(
    sources: &[&dyn TaxableIncomeSource],
    deductions: &TaxDeductions,
    rules: &RegimeRules,
    profile: &TaxpayerProfile,
    extra_deduction: Money,
) -> PayrollTaxResult<Evaluation> {
    let mut violations = profile.validate();
    for source in sources {
        violations.extend(source.validate());
    }
    violations.extend(deductions.validate());
    if !violations.is_empty() {
        return Err(PayrollTaxError::Validation(violations));
    }
    rules.validate()?;
    let cess_rate = rules.cess()?;

    let bracket = profile.age_bracket();

    // Step 1: income heads
    let heads: Vec<HeadComputation> = sources.iter().map(|s| s.compute(rules, profile)).collect();
    let gross_total_income = heads
        .iter()
        .map(|h| h.taxable)
        .sum::<Money>()
        .non_negative();
    let carried_forward_loss: Money = heads.iter().map(|h| h.carried_forward_loss).sum();
    let salary_basis: Money = sources.iter().map(|s| s.salary_basis()).sum();

    // Step 2: deductions
    let outcome = apply_deductions(deductions, rules, bracket, salary_basis, gross_total_income);
    let total_deductions = (outcome.total_allowed + extra_deduction).min(gross_total_income);

    // Step 3: taxable income
    let taxable_income = (gross_total_income - total_deductions).non_negative();
    debug!(
        regime = %rules.regime,
        %gross_total_income,
        %total_deductions,
        %taxable_income,
        "taxable income determined"
    );

    // Steps 4 and 5: slabs and rebate
    let slabs = rules.slabs_for(bracket);
    let rebate = rules.rebate.as_ref();
    let step = tax_after_rebate(taxable_income, slabs, rebate, cess_rate)?;

    // Step 6: surcharge
    let surcharge_step = surcharge(
        taxable_income,
        step.tax_after_rebate,
        &rules.surcharge,
        cess_rate,
        |income| Ok(tax_after_rebate(income, slabs, rebate, cess_rate)?.tax_after_rebate),
    )?;

    // Steps 7 and 8: cess and liability
    let taxed = step.tax_after_rebate + surcharge_step.surcharge;
    let cess = taxed.mul_rate(cess_rate);
    let total_tax_liability = (taxed + cess).round_half_up();
    let effective_rate = total_tax_liability
        .ratio_to(gross_total_income)
        .round_dp(4);

    debug!(
        regime = %rules.regime,
        tax_before_rebate = %step.tax_before_rebate,
        rebate = %step.rebate,
        surcharge = %surcharge_step.surcharge,
        %cess,
        %total_tax_liability,
        "liability computed"
    );

    Ok(Evaluation {
        result: TaxCalculationResult {
            regime: rules.regime,
            rules_id: rules.id.clone(),
            age_bracket: bracket,
            gross_total_income,
            total_deductions,
            taxable_income,
            tax_before_rebate: step.tax_before_rebate,
            rebate: step.rebate,
            rebate_marginal_relief: step.marginal_relief,
            tax_after_rebate: step.tax_after_rebate,
            surcharge_rate: surcharge_step.rate,
            surcharge: surcharge_step.surcharge,
            surcharge_relief: surcharge_step.relief,
            cess,
            total_tax_liability,
            effective_rate,
            carried_forward_loss,
            heads,
            deductions: outcome.applied,
            slabs: step.bands,
        },
        warnings: outcome.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deductions::DeductionCode;
    use crate::income::{HouseProperties, HouseProperty, OtherIncome, PropertyUse, SalaryIncome};
    use crate::regime::{RegimeCatalog, RegimeConfigProvider, TaxYear};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn rules(year: i32, regime: TaxRegime) -> RegimeRules {
        RegimeCatalog::builtin()
            .unwrap()
            .rules_for(&TaxYear::starting(year).unwrap(), regime)
            .unwrap()
            .clone()
    }

    /// Other income has no standard deduction, so it feeds taxable income as-is.
    fn flat_income(amount: i64) -> OtherIncome {
        OtherIncome {
            other: Money::from_rupees(amount),
            ..Default::default()
        }
    }

    fn liability(amount: i64, r: &RegimeRules) -> Money {
        let income = flat_income(amount);
        calculate_tax(&[&income], &TaxDeductions::new(), r, &TaxpayerProfile::new(35))
            .unwrap()
            .result
            .total_tax_liability
    }

    #[test]
    fn test_ten_lakh_under_legacy() {
        let income = flat_income(1_000_000);
        let out = calculate_tax(
            &[&income],
            &TaxDeductions::new(),
            &rules(2024, TaxRegime::Legacy),
            &TaxpayerProfile::new(35),
        )
        .unwrap();
        let r = out.result;
        assert_eq!(r.taxable_income, Money::from_rupees(1_000_000));
        assert_eq!(r.tax_before_rebate, Money::from_rupees(112_500));
        assert_eq!(r.rebate, Money::ZERO);
        assert_eq!(r.surcharge, Money::ZERO);
        assert_eq!(r.cess, Money::from_rupees(4_500));
        assert_eq!(r.total_tax_liability, Money::from_rupees(117_000));
        assert_eq!(r.effective_rate, dec!(0.117));
        assert_eq!(out.metadata.rules_id.as_deref(), Some("IN-2024-25-legacy"));
    }

    #[test]
    fn test_senior_slabs_raise_exemption_threshold() {
        let income = flat_income(1_000_000);
        let r = rules(2024, TaxRegime::Legacy);
        let senior = calculate_tax(&[&income], &TaxDeductions::new(), &r, &TaxpayerProfile::new(65))
            .unwrap()
            .result;
        // 5% of 200,000 + 20% of 500,000 = 110,000 + 4% cess
        assert_eq!(senior.total_tax_liability, Money::from_rupees(114_400));
        assert_eq!(senior.age_bracket, AgeBracket::Senior);
    }

    #[test]
    fn test_rebate_boundary_never_costs_more_than_income_delta() {
        for (year, regime, threshold) in [
            (2023, TaxRegime::Legacy, 500_000),
            (2024, TaxRegime::Legacy, 500_000),
            (2023, TaxRegime::Simplified, 700_000),
            (2024, TaxRegime::Simplified, 700_000),
            (2025, TaxRegime::Simplified, 1_200_000),
        ] {
            let r = rules(year, regime);
            assert_eq!(liability(threshold, &r), Money::ZERO, "{} {}", year, regime);
            for delta in [1, 100, 1_000] {
                let above = liability(threshold + delta, &r);
                assert!(
                    above <= Money::from_rupees(delta),
                    "{} {} at threshold + {}: {}",
                    year,
                    regime,
                    delta,
                    above
                );
            }
        }
    }

    #[test]
    fn test_legacy_rebate_relief_one_rupee_over() {
        let r = rules(2024, TaxRegime::Legacy);
        let income = flat_income(500_001);
        let out = calculate_tax(&[&income], &TaxDeductions::new(), &r, &TaxpayerProfile::new(35)).unwrap();
        assert_eq!(out.result.tax_before_rebate, Money::new(dec!(12500.20)));
        assert_eq!(out.result.tax_after_rebate, Money::new(dec!(0.96)));
        assert_eq!(out.result.total_tax_liability, Money::from_rupees(1));
    }

    #[test]
    fn test_simplified_rebate_marginal_relief() {
        let r = rules(2024, TaxRegime::Simplified);
        assert_eq!(liability(700_000, &r), Money::ZERO);
        // Liability including cess is capped at the 1,000 of excess income.
        assert_eq!(liability(701_000, &r), Money::from_rupees(1_000));
    }

    #[test]
    fn test_liability_is_monotone_in_income() {
        let r = rules(2024, TaxRegime::Simplified);
        let mut previous = Money::ZERO;
        for amount in (650_000..=760_000).step_by(5_000) {
            let current = liability(amount, &r);
            assert!(current >= previous, "liability fell at {}", amount);
            previous = current;
        }
    }

    #[test]
    fn test_surcharge_applies_above_fifty_lakh() {
        let r = rules(2024, TaxRegime::Legacy);
        let income = flat_income(6_000_000);
        let out = calculate_tax(&[&income], &TaxDeductions::new(), &r, &TaxpayerProfile::new(45)).unwrap();
        // 1,612,500 tax, 10% surcharge, 4% cess
        assert_eq!(out.result.surcharge, Money::from_rupees(161_250));
        assert_eq!(out.result.total_tax_liability, Money::from_rupees(1_844_700));
    }

    #[test]
    fn test_surcharge_marginal_relief_just_above_threshold() {
        let r = rules(2024, TaxRegime::Legacy);
        let income = flat_income(5_000_100);
        let out = calculate_tax(&[&income], &TaxDeductions::new(), &r, &TaxpayerProfile::new(45)).unwrap();
        // 100 / 1.04 of headroom less 30 of extra slab tax
        assert_eq!(out.result.surcharge, Money::new(dec!(66.15)));
        assert!(out.result.surcharge_relief.is_positive());
        assert_eq!(out.result.total_tax_liability, Money::from_rupees(1_365_100));
    }

    #[test]
    fn test_unsupported_deduction_warns_under_simplified() {
        let salary = SalaryIncome {
            basic: Money::from_rupees(1_200_000),
            ..Default::default()
        };
        let deductions = TaxDeductions::new().with(DeductionCode::Section80C, Money::from_rupees(150_000));
        let out = calculate_tax(
            &[&salary],
            &deductions,
            &rules(2024, TaxRegime::Simplified),
            &TaxpayerProfile::new(30),
        )
        .unwrap();
        assert_eq!(out.result.total_deductions, Money::ZERO);
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("80C"));
    }

    #[test]
    fn test_negative_input_rejected_with_all_violations() {
        let salary = SalaryIncome {
            basic: Money::from_rupees(-1),
            ..Default::default()
        };
        let deductions = TaxDeductions::new().with(DeductionCode::Section80D, Money::from_rupees(-5));
        let err = calculate_tax(
            &[&salary],
            &deductions,
            &rules(2024, TaxRegime::Legacy),
            &TaxpayerProfile::new(30),
        )
        .unwrap_err();
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_house_property_loss_offsets_salary() {
        let salary = SalaryIncome {
            basic: Money::from_rupees(1_050_000),
            ..Default::default()
        };
        let home = HouseProperties::new(vec![HouseProperty {
            usage: PropertyUse::SelfOccupied,
            annual_rent: Money::ZERO,
            municipal_taxes: Money::ZERO,
            home_loan_interest: Money::from_rupees(250_000),
        }]);
        let r = rules(2024, TaxRegime::Legacy);
        let out = calculate_tax(&[&salary, &home], &TaxDeductions::new(), &r, &TaxpayerProfile::new(40))
            .unwrap();
        // 1,050,000 - 50,000 - 200,000
        assert_eq!(out.result.gross_total_income, Money::from_rupees(800_000));
    }

    #[test]
    fn test_zero_income_has_zero_rate() {
        let out = calculate_tax(
            &[],
            &TaxDeductions::new(),
            &rules(2024, TaxRegime::Simplified),
            &TaxpayerProfile::new(30),
        )
        .unwrap();
        assert_eq!(out.result.total_tax_liability, Money::ZERO);
        assert_eq!(out.result.effective_rate, dec!(0));
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let income = flat_income(2_345_678);
        let r = rules(2025, TaxRegime::Simplified);
        let a = calculate_tax(&[&income], &TaxDeductions::new(), &r, &TaxpayerProfile::new(50)).unwrap();
        let b = calculate_tax(&[&income], &TaxDeductions::new(), &r, &TaxpayerProfile::new(50)).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
