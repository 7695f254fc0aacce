use std::fmt;

use scholarstream_core::config::HostedImage;
use scholarstream_core::ClientError;

/// A field-level validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Outcome of a failed form submission. The form input is never consumed,
/// so the page can show the error next to what the user typed.
#[derive(Debug, Clone, PartialEq)]
pub enum FormError {
    /// Rejected before anything was sent.
    Invalid(Vec<FieldError>),
    Client(ClientError),
}

impl FormError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        FormError::Invalid(vec![FieldError::new(field, message)])
    }

    pub fn fields(&self) -> &[FieldError] {
        match self {
            FormError::Invalid(errors) => errors,
            FormError::Client(_) => &[],
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            FormError::Invalid(errors) => errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "Invalid input".into()),
            FormError::Client(err) => err.user_message(),
        }
    }
}

impl From<ClientError> for FormError {
    fn from(err: ClientError) -> Self {
        FormError::Client(err)
    }
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormError::Invalid(errors) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
                write!(f, "Invalid input: {}", fields.join(", "))
            }
            FormError::Client(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for FormError {}

/// Collects field errors and turns them into a result.
#[derive(Default)]
pub(crate) struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    pub(crate) fn required(&mut self, field: &'static str, value: &str, label: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.push(FieldError::new(field, format!("{label} is required")));
        }
        self
    }

    pub(crate) fn check(&mut self, ok: bool, field: &'static str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    /// Validate an optional hosted image URL, returning its normalized form.
    pub(crate) fn image(&mut self, field: &'static str, value: Option<&str>) -> Option<String> {
        let raw = value.map(str::trim).filter(|v| !v.is_empty())?;
        match HostedImage::parse(raw) {
            Ok(image) => Some(image.into_string()),
            Err(err) => {
                self.errors.push(FieldError::new(field, err.to_string()));
                None
            }
        }
    }

    pub(crate) fn finish(&mut self) -> Result<(), FormError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(FormError::Invalid(std::mem::take(&mut self.errors)))
        }
    }
}

/// Rating and comment typed into the review form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewDraft {
    pub rating: u8,
    pub comment: String,
}

impl ReviewDraft {
    pub fn new(rating: u8, comment: impl Into<String>) -> Self {
        Self {
            rating,
            comment: comment.into(),
        }
    }

    pub fn validate(&self) -> Result<(), FormError> {
        Checks::default()
            .check((1..=5).contains(&self.rating), "ratingPoint", "Choose a rating from 1 to 5")
            .required("reviewComment", &self.comment, "A comment")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_draft_rules() {
        assert!(ReviewDraft::new(5, "Great").validate().is_ok());

        let err = ReviewDraft::new(0, "  ").validate().unwrap_err();
        let fields: Vec<&str> = err.fields().iter().map(|e| e.field).collect();
        assert_eq!(fields, ["ratingPoint", "reviewComment"]);
        assert_eq!(err.user_message(), "Choose a rating from 1 to 5");

        assert!(ReviewDraft::new(6, "Too generous").validate().is_err());
    }
}
