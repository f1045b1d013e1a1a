//! Compound CSS selector parsing and matching
//!
//! The grammar covers selector lists of compound selectors: universal `*`,
//! type, `#id`, `.class`, and the attribute forms `[a]`, `[a=v]`, `[a~=v]`,
//! `[a|=v]`, `[a^=v]`, `[a$=v]`, `[a*=v]` with bare or quoted values.
//! Combinators and pseudo-classes fail to parse; a parse failure is what
//! "syntactically invalid selector" means to the watcher.
//!
//! Matching runs against one `NodeSnapshot` in isolation, which is exactly
//! the information a mutation record carries.

use dom::NodeSnapshot;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("combinators are not supported (found `{0}`)")]
    CombinatorUnsupported(char),

    #[error("pseudo-classes and pseudo-elements are not supported")]
    PseudoUnsupported,

    #[error("unexpected character `{ch}` at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("expected identifier at position {0}")]
    ExpectedIdent(usize),

    #[error("unterminated attribute selector")]
    UnterminatedAttribute,

    #[error("unterminated string in attribute selector")]
    UnterminatedString,
}

/// How an attribute selector compares against the attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    /// `[a]`
    Exists,
    /// `[a=v]`
    Equals(String),
    /// `[a~=v]` - whitespace-token match
    Includes(String),
    /// `[a|=v]` - exact or dash-prefixed
    DashMatch(String),
    /// `[a^=v]`
    Prefix(String),
    /// `[a$=v]`
    Suffix(String),
    /// `[a*=v]`
    Substring(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    op: AttrOp,
}

/// One compound selector: every simple selector in it must hold
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    universal: bool,
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

/// A parsed selector list
///
/// Parsing is the validity check: a `Selector` that exists is well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    list: Vec<Compound>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut parser = Parser::new(input);
        let mut list = Vec::new();

        loop {
            parser.skip_whitespace();
            list.push(parser.parse_compound()?);
            let had_space = parser.skip_whitespace();
            match parser.peek() {
                None => break,
                Some(',') => {
                    parser.bump();
                }
                Some(c @ ('>' | '+' | '~')) => return Err(SelectorError::CombinatorUnsupported(c)),
                Some(_) if had_space => return Err(SelectorError::CombinatorUnsupported(' ')),
                Some(ch) => {
                    return Err(SelectorError::UnexpectedChar {
                        ch,
                        pos: parser.pos,
                    })
                }
            }
        }

        Ok(Self {
            source: input.to_string(),
            list,
        })
    }

    /// The text this selector was parsed from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the snapshot node matches any compound in the list
    ///
    /// Non-element nodes never match.
    pub fn matches(&self, node: &NodeSnapshot) -> bool {
        if !node.is_element() {
            return false;
        }
        self.list.iter().any(|compound| compound.matches(node))
    }
}

impl Compound {
    fn matches(&self, node: &NodeSnapshot) -> bool {
        if let Some(tag) = &self.tag {
            if !tag.eq_ignore_ascii_case(&node.node_name) {
                return false;
            }
        }
        for id in &self.ids {
            if node.id() != Some(id.as_str()) {
                return false;
            }
        }
        for class in &self.classes {
            if !node.classes().any(|token| token == class) {
                return false;
            }
        }
        self.attrs.iter().all(|attr| attr.matches(node))
    }
}

impl AttrSelector {
    fn matches(&self, node: &NodeSnapshot) -> bool {
        let value = match node.attr(&self.name) {
            Some(value) => value,
            None => return false,
        };
        match &self.op {
            AttrOp::Exists => true,
            AttrOp::Equals(want) => value == want,
            AttrOp::Includes(want) => {
                !want.is_empty() && value.split_ascii_whitespace().any(|t| t == want)
            }
            AttrOp::DashMatch(want) => {
                value == want
                    || (value.len() > want.len()
                        && value.starts_with(want.as_str())
                        && value.as_bytes()[want.len()] == b'-')
            }
            AttrOp::Prefix(want) => !want.is_empty() && value.starts_with(want.as_str()),
            AttrOp::Suffix(want) => !want.is_empty() && value.ends_with(want.as_str()),
            AttrOp::Substring(want) => !want.is_empty() && value.contains(want.as_str()),
        }
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    /// Returns whether any whitespace was consumed
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut any = false;

        loop {
            match self.peek() {
                Some('*') => {
                    if any {
                        return Err(SelectorError::UnexpectedChar {
                            ch: '*',
                            pos: self.pos,
                        });
                    }
                    self.bump();
                    compound.universal = true;
                    any = true;
                }
                Some('#') => {
                    self.bump();
                    compound.ids.push(self.parse_ident()?);
                    any = true;
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.parse_ident()?);
                    any = true;
                }
                Some('[') => {
                    self.bump();
                    compound.attrs.push(self.parse_attr()?);
                    any = true;
                }
                Some(':') => return Err(SelectorError::PseudoUnsupported),
                Some(c) if is_ident_char(c) => {
                    if any {
                        return Err(SelectorError::UnexpectedChar { ch: c, pos: self.pos });
                    }
                    compound.tag = Some(self.parse_ident()?);
                    any = true;
                }
                _ => break,
            }
        }

        if !any {
            return match self.peek() {
                None => Err(SelectorError::Empty),
                Some(c @ ('>' | '+' | '~')) => Err(SelectorError::CombinatorUnsupported(c)),
                Some(ch) => Err(SelectorError::UnexpectedChar { ch, pos: self.pos }),
            };
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if !is_ident_char(c) {
                break;
            }
            out.push(c);
            self.pos += 1;
        }
        if out.is_empty() {
            return Err(SelectorError::ExpectedIdent(start));
        }
        Ok(out)
    }

    fn parse_attr(&mut self) -> Result<AttrSelector, SelectorError> {
        self.skip_whitespace();
        let name = self.parse_ident()?;
        self.skip_whitespace();

        let op = match self.peek() {
            None => return Err(SelectorError::UnterminatedAttribute),
            Some(']') => {
                self.bump();
                return Ok(AttrSelector {
                    name,
                    op: AttrOp::Exists,
                });
            }
            Some('=') => {
                self.bump();
                AttrOp::Equals(self.parse_attr_value()?)
            }
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                self.bump();
                if self.peek() != Some('=') {
                    return Err(SelectorError::UnexpectedChar { ch: c, pos: self.pos });
                }
                self.bump();
                let value = self.parse_attr_value()?;
                match c {
                    '~' => AttrOp::Includes(value),
                    '|' => AttrOp::DashMatch(value),
                    '^' => AttrOp::Prefix(value),
                    '$' => AttrOp::Suffix(value),
                    _ => AttrOp::Substring(value),
                }
            }
            Some(ch) => return Err(SelectorError::UnexpectedChar { ch, pos: self.pos }),
        };

        self.skip_whitespace();
        match self.bump() {
            Some(']') => Ok(AttrSelector { name, op }),
            Some(ch) => Err(SelectorError::UnexpectedChar {
                ch,
                pos: self.pos - 1,
            }),
            None => Err(SelectorError::UnterminatedAttribute),
        }
    }

    fn parse_attr_value(&mut self) -> Result<String, SelectorError> {
        self.skip_whitespace();
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let mut out = String::new();
                loop {
                    match self.bump() {
                        Some(c) if c == quote => return Ok(out),
                        Some(c) => out.push(c),
                        None => return Err(SelectorError::UnterminatedString),
                    }
                }
            }
            _ => self.parse_ident(),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, attrs: &[(&str, &str)]) -> NodeSnapshot {
        let mut snap = NodeSnapshot::element(name);
        for (k, v) in attrs {
            snap = snap.with_attr(k, v);
        }
        snap
    }

    #[test]
    fn test_parse_accepts_compound_grammar() {
        for selector in [
            "*",
            "div",
            "#main",
            ".card",
            "div#main.card.active",
            "input[type=text]",
            "[data-role]",
            "a[href^=\"https://\"]",
            "a[lang|=en]",
            "div, span , .card",
            "  div  ",
        ] {
            assert!(Selector::parse(selector).is_ok(), "should parse: {selector}");
        }
    }

    #[test]
    fn test_parse_rejects_invalid_input() {
        assert_eq!(Selector::parse(""), Err(SelectorError::Empty));
        assert_eq!(Selector::parse("   "), Err(SelectorError::Empty));
        assert_eq!(Selector::parse("div,"), Err(SelectorError::Empty));
        assert_eq!(
            Selector::parse("div p"),
            Err(SelectorError::CombinatorUnsupported(' '))
        );
        assert_eq!(
            Selector::parse("div > p"),
            Err(SelectorError::CombinatorUnsupported('>'))
        );
        assert_eq!(
            Selector::parse("a:hover"),
            Err(SelectorError::PseudoUnsupported)
        );
        assert_eq!(
            Selector::parse("[href"),
            Err(SelectorError::UnterminatedAttribute)
        );
        assert_eq!(
            Selector::parse("[href=\"x]"),
            Err(SelectorError::UnterminatedString)
        );
        assert_eq!(Selector::parse("#"), Err(SelectorError::ExpectedIdent(1)));
        assert!(Selector::parse("div!").is_err());
        assert!(Selector::parse("div*").is_err());
    }

    #[test]
    fn test_type_and_universal_matching() {
        let div = node("div", &[]);
        assert!(Selector::parse("div").unwrap().matches(&div));
        assert!(Selector::parse("DIV").unwrap().matches(&div));
        assert!(Selector::parse("*").unwrap().matches(&div));
        assert!(!Selector::parse("span").unwrap().matches(&div));
    }

    #[test]
    fn test_id_and_class_matching() {
        let el = node("div", &[("id", "main"), ("class", "card active")]);
        assert!(Selector::parse("#main").unwrap().matches(&el));
        assert!(!Selector::parse("#other").unwrap().matches(&el));
        assert!(Selector::parse(".card").unwrap().matches(&el));
        assert!(Selector::parse(".card.active").unwrap().matches(&el));
        assert!(!Selector::parse(".cards").unwrap().matches(&el));
        // Class matching is case-sensitive
        assert!(!Selector::parse(".Card").unwrap().matches(&el));
        assert!(Selector::parse("div#main.card").unwrap().matches(&el));
    }

    #[test]
    fn test_attribute_operators() {
        let el = node("a", &[("href", "https://example.com"), ("lang", "en-US")]);
        assert!(Selector::parse("[href]").unwrap().matches(&el));
        assert!(!Selector::parse("[title]").unwrap().matches(&el));
        assert!(Selector::parse("[lang=en-US]").unwrap().matches(&el));
        assert!(Selector::parse("[lang|=en]").unwrap().matches(&el));
        assert!(!Selector::parse("[lang|=e]").unwrap().matches(&el));
        assert!(Selector::parse("[href^=\"https://\"]").unwrap().matches(&el));
        assert!(Selector::parse("[href$=\".com\"]").unwrap().matches(&el));
        assert!(Selector::parse("[href*=example]").unwrap().matches(&el));

        let tokens = node("div", &[("data-tags", "alpha beta")]);
        assert!(Selector::parse("[data-tags~=beta]").unwrap().matches(&tokens));
        assert!(!Selector::parse("[data-tags~=bet]").unwrap().matches(&tokens));
    }

    #[test]
    fn test_selector_list_matches_any_part() {
        let el = node("span", &[]);
        let selector = Selector::parse("div, span").unwrap();
        assert!(selector.matches(&el));
        assert!(!Selector::parse("div, p").unwrap().matches(&el));
    }

    #[test]
    fn test_non_elements_never_match() {
        let mut text = NodeSnapshot::element("#text");
        text.node_type = dom::NodeType::Text;
        assert!(!Selector::parse("*").unwrap().matches(&text));
    }
}
