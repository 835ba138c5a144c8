use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Violation;

/// Leave-without-pay days for one employee-month, from attendance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LwpDetails {
    pub lwp_days: Decimal,
    pub total_working_days: Decimal,
    pub month: u32,
    pub year: i32,
}

impl LwpDetails {
    pub fn new(lwp_days: Decimal, total_working_days: Decimal, month: u32, year: i32) -> Self {
        Self {
            lwp_days,
            total_working_days,
            month,
            year,
        }
    }

    /// Share of the month's salary that is paid: `1 - lwp / working days`.
    ///
    /// 1 when there are no working days, 0 once LWP covers every working day.
    pub fn lwp_factor(&self) -> Decimal {
        if self.total_working_days <= Decimal::ZERO || self.lwp_days <= Decimal::ZERO {
            return Decimal::ONE;
        }
        if self.lwp_days >= self.total_working_days {
            return Decimal::ZERO;
        }
        Decimal::ONE - self.lwp_days / self.total_working_days
    }

    /// LWP beyond the working days; reported, then treated as a full month.
    pub fn exceeds_working_days(&self) -> bool {
        self.total_working_days > Decimal::ZERO && self.lwp_days > self.total_working_days
    }

    pub fn validate(&self, index: usize) -> Vec<Violation> {
        let mut v = Vec::new();
        let field = |name: &str| format!("lwp[{}].{}", index, name);
        if self.lwp_days < Decimal::ZERO {
            v.push(Violation::new(field("lwp_days"), "must not be negative"));
        }
        if self.total_working_days < Decimal::ZERO {
            v.push(Violation::new(field("total_working_days"), "must not be negative"));
        }
        if !(1..=12).contains(&self.month) {
            v.push(Violation::new(
                field("month"),
                format!("{} is not a calendar month", self.month),
            ));
        }
        v
    }
}
