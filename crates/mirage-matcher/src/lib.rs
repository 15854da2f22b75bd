//! Request-matching engine for HTTP service virtualization.
//!
//! Stub mappings declare a [`RequestPattern`]; each one is compiled once into
//! a [`CompiledRequestPattern`] and evaluated against inbound requests through
//! the [`RequestView`] trait. XML bodies are compared after stripping the
//! volatile elements listed in the [`ExclusionRules`].
//!
//! # Example
//!
//! ```no_run
//! use mirage_matcher::{LoggedRequest, MatcherConfig, RequestMethod, RequestPattern, ValuePattern};
//!
//! let context = MatcherConfig::default().match_context();
//!
//! let pattern = RequestPattern::for_url(RequestMethod::Post, "/ws/orders")
//!     .with_body(ValuePattern::equal_to("<op><arg0><id>7</id></arg0></op>"));
//! let compiled = pattern.compile(&context)?;
//!
//! let request = LoggedRequest::new(RequestMethod::Post, "/ws/orders")
//!     .with_body("<op><arg0><id>7</id><dateAndTime>now</dateAndTime></arg0></op>");
//! assert!(compiled.is_matched_by(&request));
//! # Ok::<(), mirage_matcher::PatternError>(())
//! ```

pub mod config;
pub mod error;
pub mod exclusion;
pub mod logging;
pub mod predicate;
pub mod request;
pub mod xml;

pub use config::MatcherConfig;
pub use error::{ConfigError, ExclusionError, NormalizeError, PatternError};
pub use exclusion::ExclusionRules;
pub use predicate::{
    CompiledRequestPattern, CompiledValuePattern, MalformedBodyPolicy, MatchContext,
    RequestPattern, ValuePattern,
};
pub use request::{LoggedRequest, MultiValue, RequestMethod, RequestView};
pub use xml::{pretty_xml, BodyNormalizer};
