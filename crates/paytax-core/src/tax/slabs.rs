use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::PayrollTaxError;
use crate::regime::{Rebate, Slab, SurchargeTier};
use crate::types::{Money, Rate};
use crate::PayrollTaxResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Tax charged on one slab band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlabTax {
    pub lower: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper: Option<Money>,
    pub rate: Rate,
    pub taxable_portion: Money,
    pub tax: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebateStep {
    pub tax_before_rebate: Money,
    pub rebate: Money,
    pub marginal_relief: Money,
    pub tax_after_rebate: Money,
    pub bands: Vec<SlabTax>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurchargeStep {
    pub rate: Rate,
    pub surcharge: Money,
    pub relief: Money,
}

// ---------------------------------------------------------------------------
// Slabs
// ---------------------------------------------------------------------------

/// Progressive tax on `taxable` across `slabs`, unrounded.
///
/// Bands at or above the income are skipped. A band whose portion comes out
/// negative can only arise from a malformed table and aborts the calculation.
pub fn slab_tax(taxable: Money, slabs: &[Slab]) -> PayrollTaxResult<(Money, Vec<SlabTax>)> {
    let mut total = Money::ZERO;
    let mut bands = Vec::new();

    for slab in slabs {
        if taxable <= slab.lower {
            continue;
        }
        let top = match slab.upper {
            Some(upper) => taxable.min(upper),
            None => taxable,
        };
        let portion = top - slab.lower;
        if portion.is_negative() {
            return Err(PayrollTaxError::Configuration(format!(
                "slab {}..{:?} yields a negative portion for income {}",
                slab.lower, slab.upper, taxable
            )));
        }
        let tax = portion.mul_rate(slab.rate);
        total += tax;
        bands.push(SlabTax {
            lower: slab.lower,
            upper: slab.upper,
            rate: slab.rate,
            taxable_portion: portion,
            tax,
        });
    }

    Ok((total, bands))
}

// ---------------------------------------------------------------------------
// Rebate
// ---------------------------------------------------------------------------

/// Largest pre-cess tax whose liability, once cess is added, stays within
/// `excess`. Truncated to paise so rounding the liability cannot overshoot.
fn relief_headroom(excess: Money, cess_rate: Rate) -> Money {
    Money::new(
        (excess.amount() / (Decimal::ONE + cess_rate))
            .round_dp_with_strategy(2, RoundingStrategy::ToZero),
    )
}

/// Slab tax followed by the rebate, with marginal relief above the threshold
/// when the table enables it.
///
/// Relief is measured against the liability including cess, so income just
/// over the threshold never costs more in tax than it adds.
pub fn tax_after_rebate(
    taxable: Money,
    slabs: &[Slab],
    rebate: Option<&Rebate>,
    cess_rate: Rate,
) -> PayrollTaxResult<RebateStep> {
    let (tax_before_rebate, bands) = slab_tax(taxable, slabs)?;
    let mut step = RebateStep {
        tax_before_rebate,
        rebate: Money::ZERO,
        marginal_relief: Money::ZERO,
        tax_after_rebate: tax_before_rebate,
        bands,
    };

    let Some(rebate) = rebate else {
        return Ok(step);
    };

    if taxable <= rebate.threshold {
        step.rebate = tax_before_rebate.min(rebate.cap);
    } else if rebate.marginal_relief {
        let headroom = relief_headroom(taxable - rebate.threshold, cess_rate);
        if tax_before_rebate > headroom {
            step.marginal_relief = tax_before_rebate - headroom;
        }
    }
    step.tax_after_rebate = (tax_before_rebate - step.rebate - step.marginal_relief).non_negative();
    Ok(step)
}

// ---------------------------------------------------------------------------
// Surcharge
// ---------------------------------------------------------------------------

/// Surcharge on `tax` for income `taxable`, limited so that tax plus
/// surcharge, cess included, never rises by more than the income above the
/// crossed threshold.
///
/// `tiers` must be sorted by threshold. `tax_at` gives the tax after rebate
/// for an arbitrary income, used to price the threshold itself.
pub fn surcharge(
    taxable: Money,
    tax: Money,
    tiers: &[SurchargeTier],
    cess_rate: Rate,
    tax_at: impl Fn(Money) -> PayrollTaxResult<Money>,
) -> PayrollTaxResult<SurchargeStep> {
    let crossed = tiers.iter().rposition(|t| taxable > t.threshold);
    let Some(index) = crossed else {
        return Ok(SurchargeStep {
            rate: Decimal::ZERO,
            surcharge: Money::ZERO,
            relief: Money::ZERO,
        });
    };

    let tier = &tiers[index];
    let previous_rate = if index == 0 {
        Decimal::ZERO
    } else {
        tiers[index - 1].rate
    };

    let unrestricted = tax.mul_rate(tier.rate);
    let at_threshold = tax_at(tier.threshold)?.mul_rate(Decimal::ONE + previous_rate);
    let headroom = relief_headroom(taxable - tier.threshold, cess_rate);
    let ceiling = (at_threshold + headroom - tax).non_negative();
    let surcharge = unrestricted.min(ceiling);

    Ok(SurchargeStep {
        rate: tier.rate,
        surcharge,
        relief: unrestricted - surcharge,
    })
}
