//! Conversion of `validator` derive failures into [`CoreError`].

use validator::ValidationErrors;

use crate::error::CoreError;

/// Flatten field errors into `"field: message; field: message"`, sorted by
/// field name so the output is stable.
pub fn describe(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{field}: {message}")
            })
        })
        .collect();
    parts.sort();
    parts.join("; ")
}

impl From<ValidationErrors> for CoreError {
    fn from(errors: ValidationErrors) -> Self {
        CoreError::Validation(describe(&errors))
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use validator::ValidationError;

    use super::*;

    #[test]
    fn messages_are_sorted_and_joined() {
        let mut errors = ValidationErrors::new();
        errors.add(
            "photos",
            ValidationError::new("length").with_message(Cow::from("at most 3 photos")),
        );
        errors.add("description", ValidationError::new("length"));

        assert_eq!(describe(&errors), "description: length; photos: at most 3 photos");
    }

    #[test]
    fn converts_into_validation_error() {
        let mut errors = ValidationErrors::new();
        errors.add("urgency", ValidationError::new("invalid"));
        let core: CoreError = errors.into();
        assert!(matches!(core, CoreError::Validation(msg) if msg == "urgency: invalid"));
    }
}
