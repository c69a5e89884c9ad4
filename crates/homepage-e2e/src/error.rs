//! Scenario failures and captured page errors.

use crate::selector::SelectorError;
use std::fmt;

/// Something a page reported while a scenario was watching it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedError {
    /// A console `error` message
    Console(String),
    /// A response with a 4xx/5xx status
    Network { status: u16, url: String },
}

impl CapturedError {
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

impl fmt::Display for CapturedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Console(message) => write!(f, "console: {message}"),
            Self::Network { status, url } => write!(f, "network: {status} {url}"),
        }
    }
}

/// Why a scenario failed
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// An expected structural element is absent or not visible.
    #[error("{selector} is not visible on {route}")]
    Missing { route: String, selector: String },

    /// Placeholder text from the template is still rendered.
    #[error("{selector} on {route} still contains {needle:?}")]
    Leak {
        route: String,
        selector: String,
        needle: String,
    },

    /// A navigation entry has the wrong href or label.
    #[error("navigation on {route}: {detail}")]
    Navigation { route: String, detail: String },

    /// Console or network errors were recorded after an interaction.
    #[error("{} error(s) after {action}: {}", .errors.len(), join(.errors))]
    RuntimeErrors {
        action: String,
        errors: Vec<CapturedError>,
    },

    /// A route answered with a status other than the expected one.
    #[error("{route} returned {actual}, expected {expected}")]
    Routing {
        route: String,
        expected: u16,
        actual: u16,
    },

    /// The page text does not match what the scenario expects.
    #[error("{route}: {detail}")]
    Content { route: String, detail: String },

    /// The request never produced a response.
    #[error("GET {url} failed: {message}")]
    Http { url: String, message: String },

    /// The browser could not be started or driven.
    #[error("browser: {message}")]
    Browser { message: String },

    #[error(transparent)]
    Selector(#[from] SelectorError),
}

fn join(errors: &[CapturedError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T, E = ScenarioError> = std::result::Result<T, E>;
