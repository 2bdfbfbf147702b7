//! Field-level validation
//!
//! Documents validate explicitly by collecting [`Violation`]s into a
//! [`ValidationErrors`] list rather than failing on the first problem.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Kind of field violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// Required value is empty
    Missing,
    /// Value does not have the required shape
    Malformed,
    /// Value must be unique but is repeated
    Duplicate,
    /// Value refers to something that does not exist
    UnknownReference,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Missing => "missing",
            Self::Malformed => "malformed",
            Self::Duplicate => "duplicate",
            Self::UnknownReference => "unknown reference",
        };
        f.write_str(s)
    }
}

/// One invalid field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path of the field
    pub field: String,
    /// Violation kind
    pub kind: ViolationKind,
    /// Human readable detail
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.field, self.kind, self.message)
    }
}

/// Non-empty list of violations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<Violation>,
}

impl ValidationErrors {
    /// Create empty collector
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation
    pub fn push(&mut self, field: impl Into<String>, kind: ViolationKind, message: impl Into<String>) {
        self.violations.push(Violation {
            field: field.into(),
            kind,
            message: message.into(),
        });
    }

    /// Recorded violations
    #[inline]
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Check if nothing was recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Find the first violation on a field
    #[must_use]
    pub fn on_field(&self, field: &str) -> Option<&Violation> {
        self.violations.iter().find(|v| v.field == field)
    }

    /// Convert to a result
    ///
    /// # Errors
    /// Returns `self` if any violation was recorded
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Require a non-blank string
    pub fn require_non_empty(&mut self, field: impl Into<String>, value: &str) -> bool {
        if value.trim().is_empty() {
            self.push(field, ViolationKind::Missing, "must not be empty");
            false
        } else {
            true
        }
    }

    /// Require a DNS-1123 label
    pub fn require_dns_label(&mut self, field: impl Into<String>, value: &str) {
        let field = field.into();
        if self.require_non_empty(field.clone(), value) && !is_dns_label(value) {
            self.push(
                field,
                ViolationKind::Malformed,
                format!("'{value}' is not a valid DNS-1123 label"),
            );
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.violations.len())?;
        for violation in &self.violations {
            write!(f, "; {violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

fn dns_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap_or_else(|e| unreachable!("{e}"))
    })
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap_or_else(|e| unreachable!("{e}"))
    })
}

/// Check a Kubernetes DNS-1123 label (namespaces, release names)
#[must_use]
pub fn is_dns_label(value: &str) -> bool {
    value.len() <= 63 && dns_label_regex().is_match(value)
}

/// Check a plausible email address
#[must_use]
pub fn is_email(value: &str) -> bool {
    email_regex().is_match(value)
}
