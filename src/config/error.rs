//! Resolution errors.
//!
//! A failed resolution yields a single [`ConfigError`] carrying every
//! [`Violation`] found, so an operator can fix a misprovisioned device in one
//! pass instead of iterating fix-and-retry.

use std::fmt;

use super::keys;

/// Category of a configuration violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ViolationKind {
    /// Value has the wrong type and cannot be coerced.
    TypeMismatch,
    /// Value has the right type but is outside its allowed range or format.
    OutOfRange,
    /// A required key is absent.
    MissingRequired,
    /// Two flags that exclude each other are both set (or neither is).
    MutuallyExclusiveFlags,
    /// Two logical pins share one physical pin.
    PinCollision,
    /// A flag is set but the field it depends on is absent or empty.
    DependentFieldMissing,
}

impl ViolationKind {
    /// Short machine-friendly name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeMismatch => "type_mismatch",
            Self::OutOfRange => "out_of_range",
            Self::MissingRequired => "missing_required",
            Self::MutuallyExclusiveFlags => "mutually_exclusive_flags",
            Self::PinCollision => "pin_collision",
            Self::DependentFieldMissing => "dependent_field_missing",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single problem found in a raw configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Key the problem is reported against.
    pub key: String,
    /// Problem category.
    pub kind: ViolationKind,
    /// Human-readable explanation.
    pub reason: String,
    /// Offending value as text, if there was one. Redacted for secrets.
    pub value: Option<String>,
}

impl Violation {
    /// Create a violation, redacting `value` when `key` holds a credential.
    pub fn new(
        key: impl Into<String>,
        kind: ViolationKind,
        reason: impl Into<String>,
        value: Option<String>,
    ) -> Self {
        let key = key.into();
        let value = if keys::is_secret(&key) {
            value.map(|_| "****".to_string())
        } else {
            value
        };
        Self {
            key,
            kind,
            reason: reason.into(),
            value,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.key, self.kind, self.reason)?;
        if let Some(value) = &self.value {
            write!(f, " (got {})", value)?;
        }
        Ok(())
    }
}

/// Aggregated resolution failure.
///
/// Never empty: a `ConfigError` is only built when at least one violation
/// was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    violations: Vec<Violation>,
}

impl ConfigError {
    /// Wrap a list of violations. Returns `None` if the list is empty.
    pub fn from_violations(violations: Vec<Violation>) -> Option<Self> {
        if violations.is_empty() {
            None
        } else {
            Some(Self { violations })
        }
    }

    /// Error holding exactly one violation.
    pub fn single(violation: Violation) -> Self {
        Self {
            violations: vec![violation],
        }
    }

    /// All violations, in the order they were found.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Check whether a violation of `kind` was reported against `key`.
    pub fn has(&self, kind: ViolationKind, key: &str) -> bool {
        self.violations
            .iter()
            .any(|v| v.kind == kind && v.key == key)
    }

    /// All violations reported against `key`.
    pub fn for_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations.iter().filter(move |v| v.key == key)
    }

    /// Consume the error and return the violations.
    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    /// Log every violation at error level.
    pub fn log(&self) {
        log::error!("Configuration rejected with {} violation(s):", self.len());
        for violation in &self.violations {
            log::error!("  {}", violation);
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "configuration rejected ({} violation{})",
            self.violations.len(),
            if self.violations.len() == 1 { "" } else { "s" }
        )?;
        for violation in &self.violations {
            write!(f, "\n  - {}", violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigError {}
