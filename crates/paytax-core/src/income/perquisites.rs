use serde::{Deserialize, Serialize};

use crate::error::Violation;
use crate::income::{require_non_negative, HeadComputation, IncomeHead, TaxableIncomeSource};
use crate::profile::TaxpayerProfile;
use crate::regime::RegimeRules;
use crate::types::Money;

/// Annual taxable value of non-cash benefits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Perquisites {
    pub accommodation: Money,
    pub motor_car: Money,
    pub esop: Money,
    pub concessional_loan: Money,
    pub meal_vouchers: Money,
    pub gifts: Money,
    pub other: Money,
}

impl Perquisites {
    pub fn gross(&self) -> Money {
        self.accommodation
            + self.motor_car
            + self.esop
            + self.concessional_loan
            + self.meal_vouchers
            + self.gifts
            + self.other
    }
}

impl TaxableIncomeSource for Perquisites {
    fn head(&self) -> IncomeHead {
        IncomeHead::Perquisites
    }

    fn compute(&self, rules: &RegimeRules, _profile: &TaxpayerProfile) -> HeadComputation {
        let limits = &rules.exemptions;
        let mut hc = HeadComputation::start(IncomeHead::Perquisites, self.gross());
        hc.exempt("meal vouchers", self.meal_vouchers.min(limits.meal_voucher_cap));
        // Gifts are exempt only while the year's total stays within the limit.
        if self.gifts <= limits.gift_exemption {
            hc.exempt("gifts", self.gifts);
        }
        hc.clamp_non_negative()
    }

    fn validate(&self) -> Vec<Violation> {
        let mut v = Vec::new();
        for (field, amount) in [
            ("perquisites.accommodation", self.accommodation),
            ("perquisites.motor_car", self.motor_car),
            ("perquisites.esop", self.esop),
            ("perquisites.concessional_loan", self.concessional_loan),
            ("perquisites.meal_vouchers", self.meal_vouchers),
            ("perquisites.gifts", self.gifts),
            ("perquisites.other", self.other),
        ] {
            require_non_negative(field, amount, &mut v);
        }
        v
    }
}
