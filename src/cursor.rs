//! A namespace-aware pull cursor over `quick_xml`.
//!
//! The cursor owns one token at a time. Empty elements are expanded into a
//! start/end pair and comments or processing instructions are dropped.
//! Grammar code walks elements with [`XmlCursor::next_tag`], which also
//! steps over whitespace; [`XmlCursor::next_text`] sees every text run.

use std::io::BufRead;

use quick_xml::{
    events::{BytesStart, Event},
    name::ResolveResult,
    NsReader,
};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Name {
    pub namespace: Option<String>,
    pub local: String,
}

impl Name {
    /// `namespace: None` matches any namespace.
    pub fn matches(&self, namespace: Option<&str>, local: &str) -> bool {
        self.local == local && namespace.map_or(true, |ns| self.namespace.as_deref() == Some(ns))
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Attribute {
    pub name: Name,
    pub value: String,
}

#[derive(Debug, Clone)]
pub(crate) enum Token {
    /// No token read yet.
    Start,
    Element(Name, Vec<Attribute>),
    End(Name),
    Text(String),
    Eof,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Start => f.write_str("start of document"),
            Token::Element(name, _) => write!(f, "<{name}>"),
            Token::End(name) => write!(f, "</{name}>"),
            Token::Text(text) => write!(f, "text '{text}'"),
            Token::Eof => f.write_str("end of document"),
        }
    }
}

fn namespace_of(resolved: &ResolveResult) -> Option<String> {
    match resolved {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        ResolveResult::Unbound | ResolveResult::Unknown(_) => None,
    }
}

pub(crate) struct XmlCursor<R> {
    reader: NsReader<R>,
    buf: Vec<u8>,
    current: Token,
    depth: usize,
}

impl<R: BufRead> XmlCursor<R> {
    pub fn new(source: R) -> Self {
        let mut reader = NsReader::from_reader(source);
        reader.config_mut().expand_empty_elements = true;
        Self {
            reader,
            buf: Vec::new(),
            current: Token::Start,
            depth: 0,
        }
    }

    pub fn current(&self) -> &Token {
        &self.current
    }

    /// Element nesting depth of the current token; the root element is 1.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Advances by one token, skipping comments, declarations and
    /// processing instructions.
    pub fn next(&mut self) -> Result<()> {
        if matches!(self.current, Token::End(_)) {
            self.depth -= 1;
        }
        loop {
            self.buf.clear();
            let (namespace, event) = {
                let (resolved, event) = self.reader.read_resolved_event_into(&mut self.buf)?;
                (namespace_of(&resolved), event)
            };
            let token = match event {
                Event::Start(start) => {
                    let name = Name {
                        namespace,
                        local: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
                    };
                    let attributes = resolve_attributes(&self.reader, &start)?;
                    self.depth += 1;
                    Token::Element(name, attributes)
                }
                Event::End(end) => Token::End(Name {
                    namespace,
                    local: String::from_utf8_lossy(end.local_name().as_ref()).into_owned(),
                }),
                Event::Text(text) => Token::Text(text.unescape()?.into_owned()),
                Event::CData(data) => Token::Text(String::from_utf8_lossy(&data).into_owned()),
                Event::Eof => Token::Eof,
                Event::Empty(_)
                | Event::Comment(_)
                | Event::Decl(_)
                | Event::PI(_)
                | Event::DocType(_) => continue,
            };
            self.current = token;
            return Ok(());
        }
    }

    /// Advances to the next start or end boundary (or the end of the
    /// document), skipping whitespace and failing on any other text.
    pub fn next_tag(&mut self) -> Result<()> {
        loop {
            self.next()?;
            match &self.current {
                Token::Text(text) if text.trim().is_empty() => {}
                Token::Text(text) => {
                    return Err(Error::structural(format!(
                        "unexpected text '{}' where an element was expected",
                        text.trim()
                    )))
                }
                _ => return Ok(()),
            }
        }
    }

    pub fn is_start(&self, namespace: Option<&str>, local: &str) -> bool {
        matches!(&self.current, Token::Element(name, _) if name.matches(namespace, local))
    }

    pub fn is_end(&self, namespace: Option<&str>, local: &str) -> bool {
        matches!(&self.current, Token::End(name) if name.matches(namespace, local))
    }

    pub fn is_any_end(&self) -> bool {
        matches!(self.current, Token::End(_))
    }

    /// The name of the current start boundary.
    ///
    /// # Errors
    ///
    /// Returns a structural error if the cursor is not on a start boundary.
    pub fn start_name(&self) -> Result<&Name> {
        match &self.current {
            Token::Element(name, _) => Ok(name),
            other => Err(Error::structural(format!(
                "expected a start element, found {other}"
            ))),
        }
    }

    pub fn require_start(&self, namespace: Option<&str>, local: &str) -> Result<()> {
        if self.is_start(namespace, local) {
            Ok(())
        } else {
            Err(Error::structural(format!(
                "expected <{}>, found {}",
                display_name(namespace, local),
                self.current
            )))
        }
    }

    pub fn require_end(&self, namespace: Option<&str>, local: &str) -> Result<()> {
        if self.is_end(namespace, local) {
            Ok(())
        } else {
            Err(Error::structural(format!(
                "expected </{}>, found {}",
                display_name(namespace, local),
                self.current
            )))
        }
    }

    /// Value of an attribute of the current start boundary. `namespace: None`
    /// only matches unqualified attributes.
    pub fn attribute(&self, namespace: Option<&str>, local: &str) -> Option<&str> {
        let Token::Element(_, attributes) = &self.current else {
            return None;
        };
        attributes
            .iter()
            .find(|a| a.name.local == local && a.name.namespace.as_deref() == namespace)
            .map(|a| a.value.as_str())
    }

    /// Reads the text content of the current element and leaves the cursor
    /// on its end boundary. Adjacent text and CDATA runs are concatenated.
    pub fn next_text(&mut self) -> Result<String> {
        let name = self.start_name()?.clone();
        let mut content = String::new();
        loop {
            self.next()?;
            match &self.current {
                Token::Text(text) => content.push_str(text),
                Token::End(end) if *end == name => return Ok(content.trim().to_string()),
                other => {
                    return Err(Error::structural(format!(
                        "expected text content of <{name}>, found {other}"
                    )))
                }
            }
        }
    }

    /// Consumes the current element's subtree, leaving the cursor on its end
    /// boundary.
    pub fn skip_element(&mut self) -> Result<()> {
        self.start_name()?;
        let target = self.depth;
        loop {
            self.next()?;
            match &self.current {
                Token::End(_) if self.depth == target => return Ok(()),
                Token::Eof => {
                    return Err(Error::structural(
                        "document ended inside a skipped element",
                    ))
                }
                _ => {}
            }
        }
    }
}

fn display_name(namespace: Option<&str>, local: &str) -> String {
    match namespace {
        Some(ns) => format!("{{{ns}}}{local}"),
        None => local.to_string(),
    }
}

fn resolve_attributes<R>(reader: &NsReader<R>, start: &BytesStart) -> Result<Vec<Attribute>> {
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        let key = attribute.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attribute.key);
        let name = Name {
            namespace: namespace_of(&resolved),
            local: String::from_utf8_lossy(local.as_ref()).into_owned(),
        };
        let value = attribute.unescape_value()?.into_owned();
        attributes.push(Attribute { name, value });
    }
    Ok(attributes)
}
