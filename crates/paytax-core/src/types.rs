use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// ISO code of the only currency this system computes in.
pub const CURRENCY_CODE: &str = "INR";

/// A rupee amount. Wraps Decimal to prevent accidental f64 usage.
///
/// Arithmetic keeps full decimal precision; rounding only happens through
/// the explicit `round_*` methods. External representations always carry
/// at least two decimal places.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    pub fn from_rupees(rupees: i64) -> Self {
        Money(Decimal::from(rupees))
    }

    pub const fn amount(&self) -> Decimal {
        self.0
    }

    pub const fn currency(&self) -> &'static str {
        CURRENCY_CODE
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Clamp to zero from below.
    pub fn non_negative(self) -> Self {
        self.max(Money::ZERO)
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    /// Multiply by a rate or any other dimensionless scalar.
    pub fn mul_rate(self, rate: Rate) -> Self {
        Money(self.0 * rate)
    }

    /// `self / other` as a dimensionless ratio; zero when `other` is zero.
    pub fn ratio_to(self, other: Money) -> Decimal {
        if other.is_zero() {
            Decimal::ZERO
        } else {
            self.0 / other.0
        }
    }

    /// Split evenly into `parts`; zero parts yields zero.
    pub fn divide_by(self, parts: u32) -> Self {
        if parts == 0 {
            Money::ZERO
        } else {
            Money(self.0 / Decimal::from(parts))
        }
    }

    /// Round to whole rupees, half away from zero (half-up for positive sums).
    pub fn round_half_up(self) -> Self {
        Money(
            self.0
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Round to paise, half away from zero.
    pub fn round_paise(self) -> Self {
        Money(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    fn display_amount(&self) -> Decimal {
        let mut d = self.0.normalize();
        if d.scale() < 2 {
            d.rescale(2);
        }
        d
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_amount())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display_amount().to_string())
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;
    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;
    fn mul(self, rhs: Decimal) -> Money {
        Money(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation. Deliberately free of timing data so that
/// identical inputs serialise identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub precision: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_id: Option<String>,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    rules_id: Option<&str>,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            precision: "rust_decimal_128bit".to_string(),
            rules_id: rules_id.map(str::to_string),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_serialises_with_two_decimal_places() {
        let json = serde_json::to_string(&Money::from_rupees(117_000)).unwrap();
        assert_eq!(json, "\"117000.00\"");

        let precise = Money::new(dec!(12.3456));
        assert_eq!(serde_json::to_string(&precise).unwrap(), "\"12.3456\"");
    }

    #[test]
    fn test_money_deserialises_from_string_and_number() {
        let a: Money = serde_json::from_str("\"2500.50\"").unwrap();
        let b: Money = serde_json::from_str("2500").unwrap();
        assert_eq!(a, Money::new(dec!(2500.50)));
        assert_eq!(b, Money::from_rupees(2500));
    }

    #[test]
    fn test_round_half_up_at_midpoint() {
        assert_eq!(
            Money::new(dec!(2.5)).round_half_up(),
            Money::from_rupees(3)
        );
        assert_eq!(
            Money::new(dec!(2.49)).round_half_up(),
            Money::from_rupees(2)
        );
    }

    #[test]
    fn test_arithmetic_keeps_precision() {
        let third = Money::from_rupees(100).divide_by(3);
        let total = third + third + third;
        // No truncation: three thirds differ from 100 only past the 20th place.
        assert!((total - Money::from_rupees(100)).abs() < Money::new(dec!(0.0000000001)));
        assert_eq!(Money::from_rupees(10).mul_rate(dec!(0.05)), Money::new(dec!(0.5)));
    }

    #[test]
    fn test_sign_helpers() {
        assert!(Money::from_rupees(-1).is_negative());
        assert!(!Money::ZERO.is_negative());
        assert!(!Money::ZERO.is_positive());
        assert_eq!(Money::from_rupees(-5).non_negative(), Money::ZERO);
    }
}
