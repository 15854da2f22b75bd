//! WireMock-style request patterns and their compiled matchers.
//!
//! Configuration types deserialize from stub mapping JSON and are compiled
//! once into `Compiled*` counterparts that hold pre-built regexes and a
//! shared body normalizer.
//!
//! # Module Structure
//!
//! - `value_pattern` - Single-value comparisons (equalTo, contains, matches, ...)
//! - `url_matcher` - The four URL selectors
//! - `field_matcher` - Named patterns for headers and query parameters
//! - `body_matcher` - XML-normalized body comparison and malformed-body policy
//! - `request_pattern` - The aggregate pattern and its match pipeline

mod body_matcher;
mod field_matcher;
mod request_pattern;
mod url_matcher;
mod value_pattern;

pub use body_matcher::{CompiledBodyMatcher, MalformedBodyPolicy};
pub use field_matcher::CompiledFieldPattern;
pub use request_pattern::{CompiledRequestPattern, MatchContext, RequestPattern};
pub use url_matcher::CompiledUrlMatcher;
pub use value_pattern::{CompiledValuePattern, ValuePattern};
