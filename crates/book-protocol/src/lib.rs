//! book-protocol
//!
//! The line-oriented text format for driving the order book:
//! add / modify / cancel event lines plus the terminal result line
//! carrying the expected book counts. Parsing is strict: unknown
//! prefixes, unknown sides or types, negative numbers and a misplaced or
//! missing result line are all errors.

pub mod text_codec;

pub use text_codec::{Event, ExpectedCounts, ParseError};
