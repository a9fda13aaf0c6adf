//! YAML parsing with source positions.

pub mod yaml;

pub use yaml::{Document, NodeKind, ParseError, Position, ScalarValue, YamlNode, parse};
