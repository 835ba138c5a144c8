//! Monthly payroll: LWP factors, the employee-month record and its status
//! machine, and the withholding schedule that reconciles monthly tax to the
//! annual liability.

pub mod adjuster;
pub mod lwp;
pub mod monthly;

pub use adjuster::{build_withholding_schedule, WithholdingRequest, WithholdingSchedule};
pub use lwp::LwpDetails;
pub use monthly::{EmploymentPeriod, MonthlyPay, MonthlySalary, PayrollStatus, SalaryRevision};
