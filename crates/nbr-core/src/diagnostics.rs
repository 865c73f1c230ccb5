//! Diagnostics collection for validation reporting.
//!
//! Validation never stops at the first offense: issues are collected per
//! entity so a caller sees every problem in one pass.

use crate::Mrid;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level of a diagnostic issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single diagnostic issue tied to an optional model entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Issue category (e.g. "terminals", "references")
    pub category: String,
    pub message: String,
    /// Mrid of the offending entity, when one exists
    pub entity: Option<Mrid>,
}

impl DiagnosticIssue {
    pub fn new(severity: Severity, category: impl Into<String>, message: impl Into<String>) -> Self {
        DiagnosticIssue {
            severity,
            category: category.into(),
            message: message.into(),
            entity: None,
        }
    }

    pub fn with_entity(mut self, entity: impl Into<Mrid>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.category, self.message)?;
        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        Ok(())
    }
}

/// Container collecting diagnostic issues during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    pub fn add_error(&mut self, category: impl Into<String>, message: impl Into<String>) {
        self.add(DiagnosticIssue::new(Severity::Error, category, message));
    }

    /// Records an error against a specific entity.
    pub fn add_error_for(
        &mut self,
        category: impl Into<String>,
        entity: impl Into<Mrid>,
        message: impl Into<String>,
    ) {
        self.add(DiagnosticIssue::new(Severity::Error, category, message).with_entity(entity));
    }

    pub fn add_warning(&mut self, category: impl Into<String>, message: impl Into<String>) {
        self.add(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Absorbs all issues from another collection.
    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    /// One line per issue, errors first.
    pub fn summary(&self) -> String {
        let mut lines: Vec<String> = self.errors().map(|i| i.to_string()).collect();
        lines.extend(self.warnings().map(|i| i.to_string()));
        lines.extend(
            self.issues
                .iter()
                .filter(|i| i.severity == Severity::Info)
                .map(|i| i.to_string()),
        );
        lines.join("\n")
    }
}
