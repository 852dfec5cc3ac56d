//! Academic calendar types
//!
//! Invoices are keyed by (student, term, session). Terms are the three
//! fixed school terms; a session is an academic year written as two
//! consecutive calendar years, e.g. "2025/2026".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the three school terms in an academic session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    First,
    Second,
    Third,
}

impl Term {
    /// Returns the canonical lowercase name used in storage and URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            Term::First => "first",
            Term::Second => "second",
            Term::Third => "third",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error parsing a term name
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown term: {0}")]
pub struct TermParseError(pub String);

impl FromStr for Term {
    type Err = TermParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" | "1" => Ok(Term::First),
            "second" | "2" => Ok(Term::Second),
            "third" | "3" => Ok(Term::Third),
            other => Err(TermParseError(other.to_string())),
        }
    }
}

/// Error parsing an academic session string
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionParseError {
    #[error("Session must be formatted as YYYY/YYYY, got '{0}'")]
    Format(String),

    #[error("Session years must be consecutive, got {0}/{1}")]
    NonConsecutive(u16, u16),
}

/// An academic session such as "2025/2026"
///
/// The two years must be consecutive; the canonical string form is the
/// storage representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AcademicSession {
    start_year: u16,
}

impl AcademicSession {
    /// Creates a session beginning in the given calendar year
    pub fn starting(start_year: u16) -> Self {
        Self { start_year }
    }

    /// Returns the first calendar year of the session
    pub fn start_year(&self) -> u16 {
        self.start_year
    }

    /// Returns the second calendar year of the session
    pub fn end_year(&self) -> u16 {
        self.start_year + 1
    }
}

impl fmt::Display for AcademicSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start_year, self.end_year())
    }
}

impl FromStr for AcademicSession {
    type Err = SessionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('/')
            .ok_or_else(|| SessionParseError::Format(s.to_string()))?;

        let start: u16 = start
            .parse()
            .map_err(|_| SessionParseError::Format(s.to_string()))?;
        let end: u16 = end
            .parse()
            .map_err(|_| SessionParseError::Format(s.to_string()))?;

        if end != start + 1 {
            return Err(SessionParseError::NonConsecutive(start, end));
        }

        Ok(Self { start_year: start })
    }
}

impl TryFrom<String> for AcademicSession {
    type Error = SessionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AcademicSession> for String {
    fn from(session: AcademicSession) -> Self {
        session.to_string()
    }
}
