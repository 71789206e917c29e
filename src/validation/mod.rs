/// Request payload validation
///
/// Payloads derive `validator::Validate`; failures are flattened into a
/// single `BankError::Validation` listing every offending field.
use crate::error::{BankError, BankResult};
use validator::{Validate, ValidationErrors};

/// Validate a request payload
pub fn validate_request<T: Validate>(request: &T) -> BankResult<()> {
    request.validate().map_err(validation_errors_to_bank_error)
}

/// Convert validator errors to BankError
pub fn validation_errors_to_bank_error(errors: ValidationErrors) -> BankError {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => format!("{}: {}", field, message),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect();
    messages.sort();

    BankError::Validation(format!("Request validation failed:\n  - {}", messages.join("\n  - ")))
}

/// Reject PUT bodies that leave out required fields
pub fn require_fields(missing: Vec<&'static str>) -> BankResult<()> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(BankError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct SampleRequest {
        #[validate(length(min = 3, max = 150))]
        username: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn test_valid_request_passes() {
        let sample = SampleRequest {
            username: "teller".to_string(),
            email: "teller@bank.test".to_string(),
        };
        assert!(validate_request(&sample).is_ok());
    }

    #[test]
    fn test_every_bad_field_is_reported() {
        let sample = SampleRequest {
            username: "ab".to_string(),
            email: "not-an-email".to_string(),
        };

        match validate_request(&sample).unwrap_err() {
            BankError::Validation(msg) => {
                assert!(msg.contains("username: length"));
                assert!(msg.contains("email: email"));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_require_fields() {
        assert!(require_fields(vec![]).is_ok());
        let err = require_fields(vec!["email", "address"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Missing required fields: email, address"
        );
    }
}
