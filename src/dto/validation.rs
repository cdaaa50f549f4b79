//! Validation helpers for DTOs.

use validator::ValidationError;

/// Minimum number of options a question must offer.
pub const MIN_QUESTION_OPTIONS: usize = 2;

/// Validates that a question prompt is non-blank.
pub fn validate_prompt(prompt: &str) -> Result<(), ValidationError> {
    if prompt.trim().is_empty() {
        let mut err = ValidationError::new("prompt_blank");
        err.message = Some("Question prompt must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Validates the option set of a question together with its correct index.
pub fn validate_options(options: &[String], correct_option: usize) -> Result<(), ValidationError> {
    if options.len() < MIN_QUESTION_OPTIONS {
        let mut err = ValidationError::new("too_few_options");
        err.message = Some(
            format!(
                "A question needs at least {} options (got {})",
                MIN_QUESTION_OPTIONS,
                options.len()
            )
            .into(),
        );
        return Err(err);
    }

    if options.iter().any(|option| option.trim().is_empty()) {
        let mut err = ValidationError::new("blank_option");
        err.message = Some("Question options must not be blank".into());
        return Err(err);
    }

    if correct_option >= options.len() {
        let mut err = ValidationError::new("correct_option_out_of_range");
        err.message = Some(
            format!(
                "Correct option index {} is out of range for {} options",
                correct_option,
                options.len()
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}
