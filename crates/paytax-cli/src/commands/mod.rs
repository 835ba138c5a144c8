pub mod payroll;
pub mod regimes;
pub mod tax;
