//! Pixel events
//!
//! An [`Event`] is a plain value: a pixel name, a parameter map, an optional
//! associated error, and a kind that drives wire-name generation. Call sites
//! build one per firing; nothing here is persistent or global.

use std::collections::HashMap;
use std::error::Error;

use serde::{Deserialize, Serialize};

use crate::wire::params;

/// Boxed error carried alongside an event and through completion callbacks.
pub type PixelError = Box<dyn Error + Send + Sync + 'static>;

/// Event class, used when deriving the wire-level pixel name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Regular product pixel; gets the platform's canonical prefix.
    Standard,
    /// Diagnostic pixel; gets the platform's debug prefix.
    Debug,
    /// The name is transmitted exactly as given, no prefixing.
    NonStandard,
}

/// A single analytics event, ready to be fired as a pixel.
#[derive(Debug)]
pub struct Event {
    pub name: String,
    pub parameters: HashMap<String, String>,
    pub error: Option<PixelError>,
    pub kind: EventKind,
}

impl Event {
    /// Create a standard event with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: HashMap::new(),
            error: None,
            kind: EventKind::Standard,
        }
    }

    /// Create a debug (diagnostic) event.
    pub fn debug(name: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Debug,
            ..Self::new(name)
        }
    }

    /// Create a non-standard event whose name goes on the wire verbatim.
    pub fn non_standard(name: impl Into<String>) -> Self {
        Self {
            kind: EventKind::NonStandard,
            ..Self::new(name)
        }
    }

    /// Add a single parameter.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Merge a parameter map into the event, replacing existing keys.
    pub fn with_parameters(mut self, parameters: HashMap<String, String>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    /// Attach an error; its derived parameters are appended at fire time.
    pub fn with_error(mut self, error: impl Into<PixelError>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Derive wire parameters from an error: its display form plus the joined
/// source chain when one exists.
pub fn error_parameters(error: &(dyn Error + 'static)) -> HashMap<String, String> {
    let mut parameters = HashMap::new();
    parameters.insert(params::ERROR.to_string(), error.to_string());

    let mut chain = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    if !chain.is_empty() {
        parameters.insert(params::ERROR_CHAIN.to_string(), chain.join(" <- "));
    }

    parameters
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Outer(Inner);

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "request failed")
        }
    }

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "connection reset")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    impl Error for Inner {}

    #[test]
    fn builders_accumulate_parameters() {
        let event = Event::new("app_launch")
            .with_parameter("channel", "stable")
            .with_parameter("locale", "en-US");

        assert_eq!(event.kind, EventKind::Standard);
        assert_eq!(event.parameters.len(), 2);
        assert_eq!(event.parameters["channel"], "stable");
    }

    #[test]
    fn debug_and_non_standard_set_kind() {
        assert_eq!(Event::debug("crash").kind, EventKind::Debug);
        assert_eq!(Event::non_standard("epbf").kind, EventKind::NonStandard);
    }

    #[test]
    fn error_parameters_include_source_chain() {
        let parameters = error_parameters(&Outer(Inner));
        assert_eq!(parameters[params::ERROR], "request failed");
        assert_eq!(parameters[params::ERROR_CHAIN], "connection reset");
    }

    #[test]
    fn error_parameters_without_source_omit_chain() {
        let parameters = error_parameters(&Inner);
        assert_eq!(parameters[params::ERROR], "connection reset");
        assert!(!parameters.contains_key(params::ERROR_CHAIN));
    }
}
