//! Document content tree
//!
//! Documents store their body as a JSON tree of nodes. Every node has a `type`
//! discriminator; containers carry an optional `content` array of children and
//! text leaves carry a `text` field. Mentions are inline leaves with
//! `attrs.id` / `attrs.label`.
//!
//! ```json
//! {"type":"doc","content":[{"type":"paragraph","content":[{"type":"text","text":"Hi "}]}]}
//! ```
//!
//! Plain-text positions used by [`ContentNode::insert_mention`] count characters
//! over the concatenation of all text leaves, the same string that
//! [`ContentNode::plain_text`] returns.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::shared::error::SharedError;

/// Node `type` of a text leaf
pub const TEXT_NODE: &str = "text";
/// Node `type` of an inline user reference
pub const MENTION_NODE: &str = "mention";

/// Serialized body of a freshly created document
pub const EMPTY_DOCUMENT: &str = r#"{"type":"doc","content":[{"type":"paragraph"}]}"#;

/// One node of the rich-text tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum ContentNode {
    /// Text leaf, with formatting marks kept opaque
    Text { text: String, marks: Vec<Value> },
    /// Inline reference to a user
    Mention { id: String, label: String },
    /// Any other node: doc, paragraph, heading, list, ...
    Container {
        kind: String,
        attrs: Option<Map<String, Value>>,
        children: Vec<ContentNode>,
    },
}

/// Character and word counts of a document's plain text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentStats {
    pub characters: usize,
    pub words: usize,
}

impl ContentStats {
    pub fn of(text: &str) -> Self {
        Self {
            characters: text.chars().count(),
            words: text.split_whitespace().count(),
        }
    }
}

impl ContentNode {
    /// A document holding one empty paragraph
    pub fn empty_document() -> Self {
        Self::container("doc", vec![Self::container("paragraph", Vec::new())])
    }

    /// Build a document with one paragraph per line of `text`
    pub fn from_plain_text(text: &str) -> Self {
        let paragraphs = text
            .lines()
            .map(|line| {
                let children = if line.is_empty() {
                    Vec::new()
                } else {
                    vec![Self::text(line)]
                };
                Self::container("paragraph", children)
            })
            .collect::<Vec<_>>();

        if paragraphs.is_empty() {
            Self::empty_document()
        } else {
            Self::container("doc", paragraphs)
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    pub fn container(kind: impl Into<String>, children: Vec<ContentNode>) -> Self {
        Self::Container {
            kind: kind.into(),
            attrs: None,
            children,
        }
    }

    /// Parse the serialized form stored in `documents.content`
    pub fn parse(raw: &str) -> Result<Self, SharedError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, SharedError> {
        let object = value
            .as_object()
            .ok_or_else(|| SharedError::content("node is not a JSON object"))?;
        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| SharedError::content("node has no type"))?;

        match kind {
            TEXT_NODE => {
                let text = object
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let marks = object
                    .get("marks")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                Ok(Self::Text { text, marks })
            }
            MENTION_NODE => {
                let attrs = object.get("attrs");
                let id = attrs
                    .and_then(|a| a.get("id"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| SharedError::content("mention has no id"))?
                    .to_string();
                let label = attrs
                    .and_then(|a| a.get("label"))
                    .and_then(Value::as_str)
                    .unwrap_or(&id)
                    .to_string();
                Ok(Self::Mention { id, label })
            }
            _ => {
                let children = match object.get("content") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::Array(items)) => items
                        .iter()
                        .map(Self::from_value)
                        .collect::<Result<Vec<_>, _>>()?,
                    Some(_) => return Err(SharedError::content("content is not an array")),
                };
                let attrs = object.get("attrs").and_then(Value::as_object).cloned();
                Ok(Self::Container {
                    kind: kind.to_string(),
                    attrs,
                    children,
                })
            }
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Text { text, marks } => {
                let mut node = json!({ "type": TEXT_NODE, "text": text });
                if !marks.is_empty() {
                    node["marks"] = Value::Array(marks.clone());
                }
                node
            }
            Self::Mention { id, label } => json!({
                "type": MENTION_NODE,
                "attrs": { "id": id, "label": label },
            }),
            Self::Container {
                kind,
                attrs,
                children,
            } => {
                let mut node = Map::new();
                node.insert("type".to_string(), Value::String(kind.clone()));
                if let Some(attrs) = attrs {
                    node.insert("attrs".to_string(), Value::Object(attrs.clone()));
                }
                if !children.is_empty() {
                    node.insert(
                        "content".to_string(),
                        Value::Array(children.iter().map(Self::to_value).collect()),
                    );
                }
                Value::Object(node)
            }
        }
    }

    /// Serialized form for `documents.content`
    pub fn to_json_string(&self) -> String {
        self.to_value().to_string()
    }

    /// Concatenation of every text leaf, in document order
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text { text, .. } => out.push_str(text),
            Self::Mention { .. } => {}
            Self::Container { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// `(id, label)` of every mention in document order
    pub fn mentions(&self) -> Vec<(&str, &str)> {
        let mut found = Vec::new();
        self.collect_mentions(&mut found);
        found
    }

    fn collect_mentions<'a>(&'a self, out: &mut Vec<(&'a str, &'a str)>) {
        match self {
            Self::Mention { id, label } => out.push((id, label)),
            Self::Text { .. } => {}
            Self::Container { children, .. } => {
                for child in children {
                    child.collect_mentions(out);
                }
            }
        }
    }

    /// Replace the plain-text characters in `range` (the typed `@query`) with an
    /// inline mention followed by a space.
    ///
    /// The range may run across several adjacent text leaves of one block, as
    /// when part of the query carries a mark; it must not cross into another
    /// block.
    pub fn insert_mention(
        &mut self,
        range: Range<usize>,
        id: impl Into<String>,
        label: impl Into<String>,
    ) -> Result<(), SharedError> {
        if range.start >= range.end {
            return Err(SharedError::content(format!(
                "range {}..{} is empty",
                range.start, range.end
            )));
        }

        let mention = Self::Mention {
            id: id.into(),
            label: label.into(),
        };
        let mut offset = 0;
        let outcome = match self {
            Self::Container { children, .. } => {
                splice_mention(children, &mut offset, &range, &mention)
            }
            _ => Splice::NotFound,
        };

        match outcome {
            Splice::Done => Ok(()),
            Splice::NotFound | Splice::CrossesBlock => Err(SharedError::content(format!(
                "range {}..{} does not fall inside one block of text",
                range.start, range.end
            ))),
        }
    }

    /// Whether [`insert_mention`](Self::insert_mention) would accept `range`
    pub fn accepts_mention_at(&self, range: &Range<usize>) -> bool {
        self.clone()
            .insert_mention(range.clone(), String::new(), String::new())
            .is_ok()
    }
}

enum Splice {
    Done,
    NotFound,
    /// The range starts in this block but ends past its last text leaf
    CrossesBlock,
}

fn splice_mention(
    children: &mut Vec<ContentNode>,
    offset: &mut usize,
    range: &Range<usize>,
    mention: &ContentNode,
) -> Splice {
    let mut i = 0;
    while i < children.len() {
        if let ContentNode::Text { text, .. } = &children[i] {
            let start = *offset;
            let len = text.chars().count();
            if range.start >= start && range.start < start + len {
                return splice_run(children, i, start, range, mention);
            }
            *offset += len;
        } else if let ContentNode::Container { children: inner, .. } = &mut children[i] {
            match splice_mention(inner, offset, range, mention) {
                Splice::NotFound => {}
                found => return found,
            }
        }
        i += 1;
    }
    Splice::NotFound
}

/// Splice `mention` over the inline siblings from `first` (which starts at
/// plain-text offset `start`) up to the leaf where `range` ends
fn splice_run(
    children: &mut Vec<ContentNode>,
    first: usize,
    start: usize,
    range: &Range<usize>,
    mention: &ContentNode,
) -> Splice {
    let mut end = start;
    let mut last = None;
    for (j, node) in children.iter().enumerate().skip(first) {
        match node {
            ContentNode::Text { text, .. } => {
                let len = text.chars().count();
                end += len;
                if range.end <= end {
                    last = Some((j, end - len));
                    break;
                }
            }
            ContentNode::Mention { .. } => {}
            ContentNode::Container { .. } => break,
        }
    }
    let Some((last, last_start)) = last else {
        return Splice::CrossesBlock;
    };

    let (
        ContentNode::Text {
            text: head,
            marks: head_marks,
        },
        ContentNode::Text {
            text: tail,
            marks: tail_marks,
        },
    ) = (&children[first], &children[last])
    else {
        return Splice::NotFound;
    };

    let before: String = head.chars().take(range.start - start).collect();
    let after: String = tail.chars().skip(range.end - last_start).collect();
    let after = if after.starts_with(' ') {
        after
    } else {
        format!(" {after}")
    };

    let mut nodes = Vec::with_capacity(3);
    if !before.is_empty() {
        nodes.push(ContentNode::Text {
            text: before,
            marks: head_marks.clone(),
        });
    }
    nodes.push(mention.clone());
    nodes.push(ContentNode::Text {
        text: after,
        marks: tail_marks.clone(),
    });

    children.splice(first..=last, nodes);
    Splice::Done
}

impl TryFrom<Value> for ContentNode {
    type Error = SharedError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

impl From<ContentNode> for Value {
    fn from(node: ContentNode) -> Self {
        node.to_value()
    }
}

/// Plain text of a serialized document.
///
/// Never fails: content that is not a valid tree is returned as-is.
pub fn extract_plain_text(raw: &str) -> String {
    match ContentNode::parse(raw) {
        Ok(node) => node.plain_text(),
        Err(_) => raw.to_string(),
    }
}

/// Card preview: the first `max_chars` characters of the plain text, with an
/// ellipsis when something was cut off.
pub fn preview(raw: &str, max_chars: usize) -> String {
    let text = extract_plain_text(raw);
    if text.chars().count() <= max_chars {
        return text;
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}
