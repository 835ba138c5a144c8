pub mod deductions;
pub mod error;
pub mod income;
pub mod profile;
pub mod record;
pub mod regime;
pub mod tax;
pub mod types;

#[cfg(feature = "payroll")]
pub mod payroll;

pub use error::PayrollTaxError;
pub use types::*;

/// Standard result type for all paytax operations
pub type PayrollTaxResult<T> = Result<T, PayrollTaxError>;
