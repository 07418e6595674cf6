// Validation utilities module
// Custom validator rules shared by the request DTOs

use validator::ValidationError;

/// Rejects values that are empty or consist only of whitespace
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("must_not_be_blank"))
    } else {
        Ok(())
    }
}
