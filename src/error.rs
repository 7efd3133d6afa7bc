// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt::Display;
use std::fmt::Formatter;

/// A generic error report: a message describing what went wrong.
#[derive(Debug)]
pub struct ErrorReport {
    message: String,
}

impl ErrorReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for ErrorReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "error: {}", self.message)
    }
}

impl std::error::Error for ErrorReport {}

pub type Fallible<T> = Result<T, ErrorReport>;

/// Construct a failed `Fallible` from a message.
pub fn fail<T>(message: impl Into<String>) -> Fallible<T> {
    Err(ErrorReport::new(message))
}

impl From<rusqlite::Error> for ErrorReport {
    fn from(err: rusqlite::Error) -> Self {
        ErrorReport::new(err.to_string())
    }
}

impl From<std::io::Error> for ErrorReport {
    fn from(err: std::io::Error) -> Self {
        ErrorReport::new(err.to_string())
    }
}

#[cfg(test)]
impl From<reqwest::Error> for ErrorReport {
    fn from(err: reqwest::Error) -> Self {
        ErrorReport::new(err.to_string())
    }
}

/// The error taxonomy of the session and timer operations. The HTTP layer
/// maps each variant to a status code; `Internal` is logged and surfaced as
/// a generic message only.
#[derive(Debug)]
pub enum ServiceError {
    /// Malformed input: bad mode, out-of-range rating, invalid duration.
    Validation(String),
    /// A referenced question, question set, or session does not exist.
    NotFound(String),
    /// The operation requires an active study session.
    NoActiveSession,
    /// The operation requires an active timer session.
    NoActiveTimer,
    /// Missing or invalid token, or the resource belongs to another user.
    Unauthorized,
    /// Persistence or other unexpected failure.
    Internal(ErrorReport),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Validation(msg) => write!(f, "validation error: {msg}"),
            ServiceError::NotFound(msg) => write!(f, "not found: {msg}"),
            ServiceError::NoActiveSession => write!(f, "no active study session"),
            ServiceError::NoActiveTimer => write!(f, "no active timer session"),
            ServiceError::Unauthorized => write!(f, "unauthorized"),
            ServiceError::Internal(report) => write!(f, "{report}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<ErrorReport> for ServiceError {
    fn from(report: ErrorReport) -> Self {
        ServiceError::Internal(report)
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(err: rusqlite::Error) -> Self {
        ServiceError::Internal(ErrorReport::from(err))
    }
}
