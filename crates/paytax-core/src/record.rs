use serde::{Deserialize, Serialize};

use crate::deductions::TaxDeductions;
use crate::error::{PayrollTaxError, Violation};
use crate::income::IncomeAggregates;
use crate::profile::TaxpayerProfile;
use crate::regime::{RegimeConfigProvider, TaxRegime, TaxYear};
use crate::tax::{calculate_tax, TaxCalculationResult};
use crate::types::ComputationOutput;
use crate::PayrollTaxResult;

/// One employee's tax inputs for one year, as loaded by the caller.
/// Computations only read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxationRecord {
    pub tax_year: TaxYear,
    pub employee_id: String,
    pub regime: TaxRegime,
    #[serde(default)]
    pub income: IncomeAggregates,
    #[serde(default)]
    pub deductions: TaxDeductions,
    pub profile: TaxpayerProfile,
}

impl TaxationRecord {
    pub fn validate(&self) -> Vec<Violation> {
        let mut v = Vec::new();
        if self.employee_id.trim().is_empty() {
            v.push(Violation::new("employee_id", "must not be empty"));
        }
        v
    }

    pub(crate) fn ensure_valid(&self) -> PayrollTaxResult<()> {
        let violations = self.validate();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(PayrollTaxError::Validation(violations))
        }
    }
}

/// Calculate the record's liability under its own regime, with the rule
/// table resolved for its tax year.
pub fn calculate_record(
    record: &TaxationRecord,
    provider: &dyn RegimeConfigProvider,
) -> PayrollTaxResult<ComputationOutput<TaxCalculationResult>> {
    record.ensure_valid()?;
    let rules = provider.rules_for(&record.tax_year, record.regime)?;
    calculate_tax(
        &record.income.sources(),
        &record.deductions,
        rules,
        &record.profile,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::income::SalaryIncome;
    use crate::regime::RegimeCatalog;
    use crate::types::Money;

    fn record_json() -> &'static str {
        r#"{
            "tax_year": "2024-25",
            "employee_id": "E-1001",
            "regime": "legacy",
            "income": {
                "salary": {"basic": "900000", "special_allowance": "150000"}
            },
            "deductions": {"80C": "150000"},
            "profile": {"age": 35}
        }"#
    }

    #[test]
    fn test_record_deserialises_and_calculates() {
        let record: TaxationRecord = serde_json::from_str(record_json()).unwrap();
        let catalog = RegimeCatalog::builtin().unwrap();
        let out = calculate_record(&record, &catalog).unwrap();
        // 1,050,000 - 50,000 - 150,000 = 850,000
        assert_eq!(out.result.taxable_income, Money::from_rupees(850_000));
        assert_eq!(out.result.regime, TaxRegime::Legacy);
    }

    #[test]
    fn test_blank_employee_rejected() {
        let record = TaxationRecord {
            tax_year: TaxYear::starting(2024).unwrap(),
            employee_id: "  ".into(),
            regime: TaxRegime::Simplified,
            income: IncomeAggregates {
                salary: Some(SalaryIncome::default()),
                ..Default::default()
            },
            deductions: TaxDeductions::new(),
            profile: TaxpayerProfile::new(30),
        };
        let err = calculate_record(&record, &RegimeCatalog::builtin().unwrap()).unwrap_err();
        assert_eq!(err.violations()[0].field, "employee_id");
    }

    #[test]
    fn test_year_without_rules_is_configuration_error() {
        let mut record: TaxationRecord = serde_json::from_str(record_json()).unwrap();
        record.tax_year = TaxYear::starting(2010).unwrap();
        let err = calculate_record(&record, &RegimeCatalog::builtin().unwrap()).unwrap_err();
        assert!(matches!(err, PayrollTaxError::Configuration(_)));
    }
}
