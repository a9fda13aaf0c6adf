//! Positioned YAML model.
//!
//! Builds a tree of [`YamlNode`]s from `yaml-rust2` parser events. Every node
//! carries the 1-based line/column of its first character. A resolved alias
//! sits at the alias site; the nodes inside it keep their anchored positions.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use yaml_rust2::Yaml;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, ScanError, TScalarStyle};

/// Error type for parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("{file_path}: YAML syntax error at line {line}, column {column}: {message}")]
    Syntax {
        file_path: String,
        line: u32,
        column: u32,
        message: String,
    },
}

impl ParseError {
    fn from_scan(file_path: &str, err: &ScanError) -> Self {
        let position = Position::from_marker(err.marker());
        Self::Syntax {
            file_path: file_path.to_string(),
            line: position.line,
            column: position.column,
            message: err.info().to_string(),
        }
    }

    /// Location and scanner message, without the file path.
    pub fn describe(&self) -> String {
        match self {
            Self::Syntax {
                line,
                column,
                message,
                ..
            } => format!("line {line}, column {column}: {message}"),
        }
    }

    /// The file the error was raised for.
    pub fn file_path(&self) -> &str {
        match self {
            Self::Syntax { file_path, .. } => file_path,
        }
    }
}

/// Position in the source file (both components 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    /// Top of the file, the fallback when nothing better is known.
    pub const START: Position = Position { line: 1, column: 1 };

    pub fn new(line: u32, column: u32) -> Self {
        Self {
            line: line.max(1),
            column: column.max(1),
        }
    }

    fn from_marker(mark: &Marker) -> Self {
        // yaml-rust2 marks: line is 1-based, col is 0-based
        Self::new(mark.line() as u32, mark.col() as u32 + 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A resolved scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// The shape of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Mapping {
        entries: Vec<(YamlNode, YamlNode)>,
        flow: bool,
    },
    Sequence {
        items: Vec<YamlNode>,
        flow: bool,
    },
    Scalar {
        value: ScalarValue,
        /// Scalar text as written, after unquoting.
        raw: String,
        quoted: bool,
    },
}

/// A YAML node with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct YamlNode {
    pub kind: NodeKind,
    pub position: Position,
    /// Closing position, recorded for collections only.
    pub end: Option<Position>,
}

impl YamlNode {
    pub fn scalar(value: ScalarValue, raw: impl Into<String>, position: Position) -> Self {
        Self {
            kind: NodeKind::Scalar {
                value,
                raw: raw.into(),
                quoted: false,
            },
            position,
            end: None,
        }
    }

    pub fn null(position: Position) -> Self {
        Self::scalar(ScalarValue::Null, "", position)
    }

    pub fn as_mapping(&self) -> Option<&[(YamlNode, YamlNode)]> {
        match &self.kind {
            NodeKind::Mapping { entries, .. } => Some(entries),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[YamlNode]> {
        match &self.kind {
            NodeKind::Sequence { items, .. } => Some(items),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match &self.kind {
            NodeKind::Scalar { value, .. } => Some(value),
            _ => None,
        }
    }

    /// String value of a scalar that resolved to a string.
    pub fn as_str(&self) -> Option<&str> {
        match self.as_scalar() {
            Some(ScalarValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Boolean value of a scalar typed as a boolean. The string `"true"` is not one.
    pub fn as_bool(&self) -> Option<bool> {
        match self.as_scalar() {
            Some(ScalarValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Raw text of a scalar (quoted scalars without their quotes).
    pub fn raw(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Scalar { raw, .. } => Some(raw),
            _ => None,
        }
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.kind, NodeKind::Mapping { .. })
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, NodeKind::Sequence { .. })
    }

    pub fn is_null(&self) -> bool {
        matches!(self.as_scalar(), Some(ScalarValue::Null))
    }

    /// Whether the collection is written in flow style (`{...}` / `[...]`).
    pub fn is_flow(&self) -> bool {
        match &self.kind {
            NodeKind::Mapping { flow, .. } | NodeKind::Sequence { flow, .. } => *flow,
            NodeKind::Scalar { .. } => false,
        }
    }

    /// Whether the node carries no meaningful value: null, `false`, zero,
    /// an empty string or an empty collection.
    pub fn is_blank(&self) -> bool {
        match &self.kind {
            NodeKind::Mapping { entries, .. } => entries.is_empty(),
            NodeKind::Sequence { items, .. } => items.is_empty(),
            NodeKind::Scalar { value, .. } => match value {
                ScalarValue::Null => true,
                ScalarValue::Bool(b) => !b,
                ScalarValue::Int(i) => *i == 0,
                ScalarValue::Float(f) => *f == 0.0,
                ScalarValue::String(s) => s.is_empty(),
            },
        }
    }

    /// Look up a mapping entry by key, returning the key and value nodes.
    ///
    /// The first occurrence of a duplicated key wins. Keys pulled in through a
    /// merge key (`<<: *base`) are consulted only when the key is not present
    /// directly.
    pub fn entry(&self, key: &str) -> Option<(&YamlNode, &YamlNode)> {
        let entries = self.as_mapping()?;

        if let Some((k, v)) = entries.iter().find(|(k, _)| k.is_key(key)) {
            return Some((k, v));
        }

        entries
            .iter()
            .filter(|(k, _)| k.is_merge_key())
            .find_map(|(_, merged)| match &merged.kind {
                NodeKind::Mapping { .. } => merged.entry(key),
                NodeKind::Sequence { items, .. } => items.iter().find_map(|m| m.entry(key)),
                NodeKind::Scalar { .. } => None,
            })
    }

    /// Look up a mapping value by key.
    pub fn get(&self, key: &str) -> Option<&YamlNode> {
        self.entry(key).map(|(_, v)| v)
    }

    /// Follow a chain of mapping keys.
    pub fn get_path(&self, path: &[&str]) -> Option<&YamlNode> {
        path.iter().try_fold(self, |node, key| node.get(key))
    }

    fn is_key(&self, key: &str) -> bool {
        match &self.kind {
            NodeKind::Scalar { raw, .. } => raw == key,
            _ => false,
        }
    }

    fn is_merge_key(&self) -> bool {
        matches!(&self.kind, NodeKind::Scalar { raw, quoted: false, .. } if raw == "<<")
    }

    /// Convert to a `serde_json::Value`, dropping positions.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match &self.kind {
            NodeKind::Mapping { entries, .. } => {
                let mut map = serde_json::Map::new();
                for (k, v) in entries {
                    let key = match &k.kind {
                        NodeKind::Scalar { raw, .. } => raw.clone(),
                        _ => k.to_json().to_string(),
                    };
                    map.entry(key).or_insert_with(|| v.to_json());
                }
                Value::Object(map)
            }
            NodeKind::Sequence { items, .. } => {
                Value::Array(items.iter().map(YamlNode::to_json).collect())
            }
            NodeKind::Scalar { value, .. } => match value {
                ScalarValue::Null => Value::Null,
                ScalarValue::Bool(b) => Value::Bool(*b),
                ScalarValue::Int(i) => Value::from(*i),
                ScalarValue::Float(f) => serde_json::Number::from_f64(*f)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                ScalarValue::String(s) => Value::String(s.clone()),
            },
        }
    }

    /// Move the node to an alias site. Descendants keep the positions of the
    /// anchored nodes they were copied from.
    fn relocate(&mut self, position: Position) {
        self.position = position;
        self.end = self.end.map(|_| position);
    }
}

/// One parsed YAML document.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_path: String,
    /// Zero-based index of the document within its file.
    pub index: usize,
    pub root: YamlNode,
}

/// Parse a (possibly multi-document) YAML stream.
pub fn parse(file_path: &str, text: &str) -> Result<Vec<Document>, ParseError> {
    let mut builder = TreeBuilder::new(text);
    let mut parser = Parser::new_from_str(text);
    parser
        .load(&mut builder, true)
        .map_err(|e| ParseError::from_scan(file_path, &e))?;

    Ok(builder
        .roots
        .into_iter()
        .enumerate()
        .map(|(index, root)| Document {
            file_path: file_path.to_string(),
            index,
            root,
        })
        .collect())
}

enum Frame {
    Mapping {
        start: Position,
        anchor: usize,
        flow: bool,
        entries: Vec<(YamlNode, YamlNode)>,
        pending_key: Option<YamlNode>,
    },
    Sequence {
        start: Position,
        anchor: usize,
        flow: bool,
        items: Vec<YamlNode>,
    },
}

struct TreeBuilder<'a> {
    lines: Vec<&'a str>,
    stack: Vec<Frame>,
    anchors: HashMap<usize, YamlNode>,
    current: Option<YamlNode>,
    roots: Vec<YamlNode>,
}

impl<'a> TreeBuilder<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
            stack: Vec::new(),
            anchors: HashMap::new(),
            current: None,
            roots: Vec::new(),
        }
    }

    /// Whether the character at `position` opens a flow collection.
    fn opens_flow(&self, position: Position, open: char) -> bool {
        self.lines
            .get(position.line as usize - 1)
            .and_then(|line| line.chars().nth(position.column as usize - 1))
            .is_some_and(|c| c == open)
    }

    fn complete(&mut self, node: YamlNode, anchor: usize) {
        if anchor > 0 {
            self.anchors.insert(anchor, node.clone());
        }

        match self.stack.last_mut() {
            None => self.current = Some(node),
            Some(Frame::Sequence { items, .. }) => items.push(node),
            Some(Frame::Mapping {
                entries,
                pending_key,
                ..
            }) => match pending_key.take() {
                None => *pending_key = Some(node),
                Some(key) => entries.push((key, node)),
            },
        }
    }

    fn alias(&self, id: usize, position: Position) -> YamlNode {
        match self.anchors.get(&id) {
            Some(target) => {
                let mut node = target.clone();
                node.relocate(position);
                node
            }
            None => YamlNode::null(position),
        }
    }
}

impl MarkedEventReceiver for TreeBuilder<'_> {
    fn on_event(&mut self, event: Event, mark: Marker) {
        let position = Position::from_marker(&mark);

        match event {
            Event::Scalar(value, style, anchor, ..) => {
                let node = scalar_node(value, style, position);
                self.complete(node, anchor);
            }
            Event::SequenceStart(anchor, ..) => {
                let flow = self.opens_flow(position, '[');
                self.stack.push(Frame::Sequence {
                    start: position,
                    anchor,
                    flow,
                    items: Vec::new(),
                });
            }
            Event::MappingStart(anchor, ..) => {
                let flow = self.opens_flow(position, '{');
                self.stack.push(Frame::Mapping {
                    start: position,
                    anchor,
                    flow,
                    entries: Vec::new(),
                    pending_key: None,
                });
            }
            Event::SequenceEnd | Event::MappingEnd => {
                let (node, anchor) = match self.stack.pop() {
                    Some(Frame::Sequence {
                        start,
                        anchor,
                        flow,
                        items,
                    }) => (
                        YamlNode {
                            kind: NodeKind::Sequence { items, flow },
                            position: start,
                            end: Some(position),
                        },
                        anchor,
                    ),
                    Some(Frame::Mapping {
                        start,
                        anchor,
                        flow,
                        entries,
                        ..
                    }) => (
                        YamlNode {
                            kind: NodeKind::Mapping { entries, flow },
                            position: start,
                            end: Some(position),
                        },
                        anchor,
                    ),
                    None => return,
                };
                self.complete(node, anchor);
            }
            Event::Alias(id) => {
                let node = self.alias(id, position);
                self.complete(node, 0);
            }
            Event::DocumentEnd => {
                let root = self
                    .current
                    .take()
                    .unwrap_or_else(|| YamlNode::null(Position::START));
                self.roots.push(root);
                self.stack.clear();
                self.anchors.clear();
            }
            _ => {}
        }
    }
}

fn scalar_node(value: String, style: TScalarStyle, position: Position) -> YamlNode {
    let quoted = !matches!(style, TScalarStyle::Plain);
    let resolved = if quoted {
        ScalarValue::String(value.clone())
    } else {
        resolve_plain(&value)
    };

    YamlNode {
        kind: NodeKind::Scalar {
            value: resolved,
            raw: value,
            quoted,
        },
        position,
        end: None,
    }
}

/// Resolve a plain scalar with the YAML 1.2 core schema.
fn resolve_plain(raw: &str) -> ScalarValue {
    match raw {
        "" | "~" | "null" | "Null" | "NULL" => return ScalarValue::Null,
        "true" | "True" | "TRUE" => return ScalarValue::Bool(true),
        "false" | "False" | "FALSE" => return ScalarValue::Bool(false),
        _ => {}
    }

    match Yaml::from_str(raw) {
        Yaml::Integer(i) => ScalarValue::Int(i),
        Yaml::Real(ref r) => r
            .parse::<f64>()
            .map(ScalarValue::Float)
            .unwrap_or_else(|_| float_special(raw)),
        _ => ScalarValue::String(raw.to_string()),
    }
}

fn float_special(raw: &str) -> ScalarValue {
    match raw {
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => ScalarValue::Float(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => ScalarValue::Float(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => ScalarValue::Float(f64::NAN),
        _ => ScalarValue::String(raw.to_string()),
    }
}
