//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::{FinancialYear, VoucherType};

#[test]
fn test_core_error_validation() {
    let error = CoreError::validation("Invalid input");

    match error {
        CoreError::Validation(msg) => assert_eq!(msg, "Invalid input"),
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_core_error_not_found() {
    let error = CoreError::not_found("Unit not found");

    match error {
        CoreError::NotFound(msg) => assert_eq!(msg, "Unit not found"),
        _ => panic!("Expected NotFound error"),
    }
}

#[test]
fn test_invalid_financial_year_keeps_input() {
    let error = "FY24-25x".parse::<FinancialYear>().unwrap_err();

    assert_eq!(error, CoreError::InvalidFinancialYear("FY24-25x".to_string()));
    assert!(error.to_string().contains("FY24-25x"));
}

#[test]
fn test_unknown_voucher_type_display() {
    let error = "JV".parse::<VoucherType>().unwrap_err();
    let display = format!("{}", error);

    assert!(display.contains("Unknown voucher type"));
    assert!(display.contains("JV"));
}

#[test]
fn test_core_error_configuration() {
    let error = CoreError::Configuration("Missing config".to_string());

    match error {
        CoreError::Configuration(msg) => assert_eq!(msg, "Missing config"),
        _ => panic!("Expected Configuration error"),
    }
}
