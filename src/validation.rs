//! Request-body validation and input sanitization.
//!
//! Request DTOs implement [`Validate`]; handlers call it before any business
//! logic runs so that every field problem is reported in one 400 response.
use crate::error::{AppError, FieldError};

pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

#[derive(Debug, Default)]
pub struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.errors.push(FieldError::new(field, message));
        self
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.fail(field, message);
        }
        self
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(!value.trim().is_empty(), field, "is required")
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        let ok = value.chars().count() <= max;
        if !ok {
            self.fail(field, format!("must be at most {max} characters"));
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(is_email(value), field, "must be a valid email address")
    }

    pub fn phone(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(is_phone(value), field, "must be a valid phone number")
    }

    pub fn non_negative(&mut self, field: &str, value: i64) -> &mut Self {
        self.check(value >= 0, field, "must not be negative")
    }

    pub fn finish(&mut self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

pub fn is_email(value: &str) -> bool {
    let value = value.trim();
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.contains(char::is_whitespace)
        && !domain.contains('@')
}

pub fn is_phone(value: &str) -> bool {
    let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
    (7..=15).contains(&digits)
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
}

/// Trims, drops control characters and angle brackets from free text.
pub fn clean_text(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| !c.is_control() || *c == '\n')
        .filter(|c| !matches!(c, '<' | '>'))
        .collect()
}

pub fn clean_opt(value: Option<&str>) -> Option<String> {
    value.map(clean_text).filter(|v| !v.is_empty())
}

pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut dash = false;
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            dash = false;
        } else if !dash && !slug.is_empty() {
            slug.push('-');
            dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("item");
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_every_field_error() {
        let err = Checks::new()
            .required("name", "  ")
            .email("email", "nope")
            .non_negative("price", -1)
            .finish()
            .unwrap_err();
        match err {
            AppError::Validation(errors) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, ["name", "email", "price"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Paneer Tikka (Large)"), "paneer-tikka-large");
        assert_eq!(slugify("  --  "), "item");
    }

    #[test]
    fn cleans_markup() {
        assert_eq!(clean_text("  <b>Hot</b> dal\u{7} "), "bHot/b dal");
    }

    #[test]
    fn email_and_phone_shapes() {
        assert!(is_email("a@b.co"));
        assert!(!is_email("a@b"));
        assert!(!is_email("a b@c.com"));
        assert!(is_phone("+91 98765-43210"));
        assert!(!is_phone("12ab"));
    }
}
