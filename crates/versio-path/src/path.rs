//! Property paths.
//!
//! A [`PropertyPath`] addresses one value inside a document: the root
//! followed by named properties and sequence indexes. Paths are totally
//! ordered, so a flattened document sorts every container right before its
//! children.
//!
//! The text form is `name.other[0]`. Names that are not plain identifiers
//! are quoted: `["first name"]`, `["$ref"]`.

use std::fmt::{self, Write as _};
use std::iter::Peekable;
use std::str::{CharIndices, FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PathError, PathResult};

/// One step of a [`PropertyPath`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathElement {
    /// Named property of an associative value.
    Property(String),
    /// Position in a sequence.
    Index(usize),
}

/// Location of a value in a document, starting from the root.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyPath {
    elements: Vec<PathElement>,
}

impl PropertyPath {
    /// The root path, addressing the document itself.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// Number of elements below the root.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    /// Child path naming property `name`.
    pub fn property(&self, name: impl Into<String>) -> Self {
        self.child(PathElement::Property(name.into()))
    }

    /// Child path at sequence position `index`.
    pub fn index(&self, index: usize) -> Self {
        self.child(PathElement::Index(index))
    }

    pub fn child(&self, element: PathElement) -> Self {
        let mut elements = Vec::with_capacity(self.elements.len() + 1);
        elements.extend_from_slice(&self.elements);
        elements.push(element);
        Self { elements }
    }

    /// The enclosing path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.elements.split_last()?;
        Some(Self {
            elements: init.to_vec(),
        })
    }

    /// Returns `true` if `prefix` is this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &PropertyPath) -> bool {
        self.elements.starts_with(&prefix.elements)
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_identifier_start) && chars.all(is_identifier_part)
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            match element {
                PathElement::Property(name) if is_identifier(name) => {
                    if i > 0 {
                        f.write_char('.')?;
                    }
                    f.write_str(name)?;
                }
                PathElement::Property(name) => {
                    f.write_str("[\"")?;
                    for c in name.chars() {
                        if c == '"' || c == '\\' {
                            f.write_char('\\')?;
                        }
                        f.write_char(c)?;
                    }
                    f.write_str("\"]")?;
                }
                PathElement::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyPath({self})")
    }
}

impl FromStr for PropertyPath {
    type Err = PathError;

    fn from_str(input: &str) -> PathResult<Self> {
        Parser {
            input,
            chars: input.char_indices().peekable(),
        }
        .path()
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl Parser<'_> {
    fn path(mut self) -> PathResult<PropertyPath> {
        let mut elements = Vec::new();
        if self.peek().is_some_and(is_identifier_start) {
            elements.push(PathElement::Property(self.identifier()));
        }

        while let Some((offset, c)) = self.chars.next() {
            match c {
                '.' if !elements.is_empty() => {
                    if !self.peek().is_some_and(is_identifier_start) {
                        return Err(self.error(offset + 1, "expected property name"));
                    }
                    elements.push(PathElement::Property(self.identifier()));
                }
                '[' => {
                    let element = match self.peek() {
                        Some('"') => {
                            self.chars.next();
                            PathElement::Property(self.quoted()?)
                        }
                        Some(c) if c.is_ascii_digit() => PathElement::Index(self.index()?),
                        _ => return Err(self.error(offset + 1, "expected index or quoted name")),
                    };
                    self.close()?;
                    elements.push(element);
                }
                _ => return Err(self.error(offset, "unexpected character")),
            }
        }
        Ok(PropertyPath { elements })
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.input.len(), |&(offset, _)| offset)
    }

    fn identifier(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek().filter(|c| is_identifier_part(*c)) {
            name.push(c);
            self.chars.next();
        }
        name
    }

    fn index(&mut self) -> PathResult<usize> {
        let start = self.offset();
        let mut digits = String::new();
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            digits.push(c);
            self.chars.next();
        }
        digits
            .parse()
            .map_err(|_| self.error(start, "index out of range"))
    }

    fn quoted(&mut self) -> PathResult<String> {
        let mut name = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                '"' => return Ok(name),
                '\\' => match self.chars.next() {
                    Some((_, escaped)) => name.push(escaped),
                    None => break,
                },
                _ => name.push(c),
            }
        }
        Err(self.error(self.input.len(), "unterminated quoted name"))
    }

    fn close(&mut self) -> PathResult<()> {
        match self.chars.next() {
            Some((_, ']')) => Ok(()),
            Some((offset, _)) => Err(self.error(offset, "expected ']'")),
            None => Err(self.error(self.input.len(), "expected ']'")),
        }
    }

    fn error(&self, offset: usize, reason: &'static str) -> PathError {
        PathError::Parse {
            input: self.input.to_string(),
            offset,
            reason,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde
// ---------------------------------------------------------------------------

impl Serialize for PropertyPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PropertyPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parse(s: &str) -> PropertyPath {
        s.parse().unwrap()
    }

    #[test]
    fn root_is_empty_string() {
        assert_eq!(PropertyPath::root().to_string(), "");
        assert_eq!(parse(""), PropertyPath::root());
        assert!(PropertyPath::root().parent().is_none());
    }

    #[test]
    fn display_uses_dots_and_brackets() {
        let path = PropertyPath::root().property("children").index(0).property("name");
        assert_eq!(path.to_string(), "children[0].name");
    }

    #[test]
    fn display_quotes_non_identifiers() {
        let path = PropertyPath::root()
            .property("first name")
            .property("$ref")
            .property("say \"hi\"");
        assert_eq!(path.to_string(), r#"["first name"]["$ref"]["say \"hi\""]"#);
        assert_eq!(parse(&path.to_string()), path);
    }

    #[test]
    fn parses_mixed_elements() {
        let path = parse(r#"list[0]["key"].value_2"#);
        assert_eq!(
            path.elements(),
            &[
                PathElement::Property("list".into()),
                PathElement::Index(0),
                PathElement::Property("key".into()),
                PathElement::Property("value_2".into()),
            ]
        );
    }

    #[test]
    fn rejects_malformed_paths() {
        for input in ["a.", "a..b", ".a", "a[", "a[x]", "a[0", r#"a["x"#, "a b", "[-1]"] {
            let err = input.parse::<PropertyPath>().unwrap_err();
            assert!(matches!(err, PathError::Parse { .. }), "{input}: {err}");
        }
    }

    #[test]
    fn parse_error_reports_offset() {
        let err = "a.b[x]".parse::<PropertyPath>().unwrap_err();
        assert_eq!(
            err,
            PathError::Parse {
                input: "a.b[x]".into(),
                offset: 4,
                reason: "expected index or quoted name",
            }
        );
    }

    #[test]
    fn parent_and_prefix() {
        let path = parse("a.b[2]");
        assert_eq!(path.parent(), Some(parse("a.b")));
        assert!(path.starts_with(&parse("a")));
        assert!(path.starts_with(&path));
        assert!(path.starts_with(&PropertyPath::root()));
        assert!(!path.starts_with(&parse("a.c")));
        assert!(!parse("a").starts_with(&path));
    }

    #[test]
    fn containers_sort_before_children() {
        let mut paths = vec![parse("b"), parse("a[1]"), parse("a.x"), parse("a"), parse("")];
        paths.sort();
        assert_eq!(
            paths,
            vec![parse(""), parse("a"), parse("a.x"), parse("a[1]"), parse("b")]
        );
    }

    #[test]
    fn serde_uses_text_form() {
        let path = parse("a[\"b c\"][3]");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#""a[\"b c\"][3]""#);
        let back: PropertyPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }

    fn element_strategy() -> impl Strategy<Value = PathElement> {
        prop_oneof![
            "[a-z_][a-z0-9_]{0,4}".prop_map(PathElement::Property),
            "[ -~]{0,6}".prop_map(PathElement::Property),
            (0usize..1000).prop_map(PathElement::Index),
        ]
    }

    proptest! {
        #[test]
        fn display_parses_back(elements in prop::collection::vec(element_strategy(), 0..6)) {
            let path = elements
                .into_iter()
                .fold(PropertyPath::root(), |path, element| path.child(element));
            prop_assert_eq!(parse(&path.to_string()), path);
        }
    }
}
