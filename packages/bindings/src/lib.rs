use std::sync::OnceLock;

use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Serialize;

use paytax_core::payroll::WithholdingRequest;
use paytax_core::record::TaxationRecord;
use paytax_core::regime::RegimeCatalog;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Built-in tables, parsed once per process.
fn builtin_catalog() -> NapiResult<&'static RegimeCatalog> {
    static CATALOG: OnceLock<Result<RegimeCatalog, String>> = OnceLock::new();
    CATALOG
        .get_or_init(|| RegimeCatalog::builtin().map_err(|e| e.to_string()))
        .as_ref()
        .map_err(to_napi_error)
}

/// Built-in tables, with `regimes_json` merged over them by id when given.
fn catalog(regimes_json: Option<String>) -> NapiResult<RegimeCatalog> {
    let builtin = builtin_catalog()?.clone();
    match regimes_json {
        Some(json) => {
            let overrides = RegimeCatalog::from_json_str(&json).map_err(to_napi_error)?;
            builtin.with_overrides(overrides).map_err(to_napi_error)
        }
        None => Ok(builtin),
    }
}

fn to_json<T: Serialize>(output: &T) -> NapiResult<String> {
    serde_json::to_string(output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Annual liability
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_tax(record_json: String, regimes_json: Option<String>) -> NapiResult<String> {
    let record: TaxationRecord = serde_json::from_str(&record_json).map_err(to_napi_error)?;
    let output = paytax_core::record::calculate_record(&record, &catalog(regimes_json)?)
        .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn compare_regimes(record_json: String, regimes_json: Option<String>) -> NapiResult<String> {
    let record: TaxationRecord = serde_json::from_str(&record_json).map_err(to_napi_error)?;
    let output = paytax_core::tax::compare_record(&record, &catalog(regimes_json)?)
        .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn break_even_deductions(record_json: String, regimes_json: Option<String>) -> NapiResult<String> {
    let record: TaxationRecord = serde_json::from_str(&record_json).map_err(to_napi_error)?;
    let output = paytax_core::tax::break_even_record(&record, &catalog(regimes_json)?)
        .map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Payroll
// ---------------------------------------------------------------------------

#[napi]
pub fn build_withholding_schedule(request_json: String, regimes_json: Option<String>) -> NapiResult<String> {
    let request: WithholdingRequest = serde_json::from_str(&request_json).map_err(to_napi_error)?;
    let output = paytax_core::payroll::build_withholding_schedule(&request, &catalog(regimes_json)?)
        .map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// The built-in regime tables as `{"tables": [...]}`.
#[napi]
pub fn builtin_regimes() -> NapiResult<String> {
    to_json(builtin_catalog()?)
}
