use crate::Result;
use crate::error::PomlError;
use crate::tpl::ast::{Document, Node};
use quick_xml::escape::{resolve_predefined_entity, unescape};
use std::borrow::Cow;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// Literal prefix every POML text must start with, after trimming.
pub const ROOT_MARKER: &str = "<poml>";

/// Builds a `Node` tree from the event stream of `quick_xml`.
///
/// Every start tag pushes a fresh node onto `stack`; the matching end tag pops
/// it and attaches it to its parent, or makes it the root when the stack is
/// empty. Text and CDATA go to whichever node is on top of the stack.
struct Parser<'a> {
    reader: Reader<&'a [u8]>,
    /// Nodes whose end tag has not been seen yet, outermost first.
    stack: Vec<Node>,
    /// The finished top-level element, once its end tag has been read.
    root: Option<Node>,
}

impl<'a> Parser<'a> {
    fn new(markup: &'a str) -> Self {
        // Text is kept verbatim apart from line-end normalization.
        let reader = Reader::from_str(markup);
        Self {
            reader,
            stack: Vec::new(),
            root: None,
        }
    }

    fn parse(mut self) -> Result<Node> {
        loop {
            let event = match self.reader.read_event() {
                Ok(event) => event,
                Err(e) => return Err(PomlError::syntax(self.reader.error_position(), e)),
            };

            match event {
                Event::Start(ref e) => {
                    let node = self.open_node(e)?;
                    self.stack.push(node);
                }
                Event::Empty(ref e) => {
                    let node = self.open_node(e)?;
                    self.close_node(node);
                }
                Event::End(_) => {
                    // quick_xml already verified that the end name matches.
                    let node = self
                        .stack
                        .pop()
                        .ok_or_else(|| self.error("unexpected end tag"))?;
                    self.close_node(node);
                }
                // The input is a `&str`, so the bytes are always valid UTF-8.
                Event::Text(ref e) => {
                    let text = String::from_utf8_lossy(e);
                    self.append_text(&normalize_line_ends(&text))?;
                }
                Event::CData(ref e) => {
                    let text = String::from_utf8_lossy(e);
                    self.append_text(&normalize_line_ends(&text))?;
                }
                Event::GeneralRef(ref e) => {
                    let resolved = match e.resolve_char_ref().map_err(|e| self.error(e))? {
                        Some(ch) => ch.to_string(),
                        None => {
                            let name = e.decode().map_err(|e| self.error(e))?;
                            resolve_predefined_entity(&name)
                                .ok_or_else(|| {
                                    self.error(format!("undefined entity '&{};'", name))
                                })?
                                .to_string()
                        }
                    };
                    self.append_text(&resolved)?;
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions, doctype.
                _ => {}
            }
        }

        if let Some(open) = self.stack.last() {
            return Err(self.error(format!("unclosed tag <{}>", open.tag())));
        }
        self.root.ok_or_else(|| {
            PomlError::syntax(self.reader.buffer_position(), "no element found")
        })
    }

    /// Creates a node from a start (or empty) tag, decoding its attributes.
    fn open_node(&self, e: &BytesStart) -> Result<Node> {
        if self.stack.is_empty() && self.root.is_some() {
            return Err(self.error("junk after document element"));
        }

        let name = e.name();
        let mut node = Node::new(String::from_utf8_lossy(name.as_ref()));
        for attr in e.attributes() {
            let attr = attr.map_err(|e| self.error(e))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            // Line ends are normalized before references are resolved, so a
            // `&#13;` still yields a carriage return.
            let raw = String::from_utf8_lossy(&attr.value);
            let value = unescape(&normalize_line_ends(&raw))
                .map_err(|e| self.error(e))?
                .into_owned();
            node.push_attr(key, value);
        }
        Ok(node)
    }

    /// Attaches a finished node to its parent, or records it as the root.
    fn close_node(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(parent) => parent.push_child(node),
            None => self.root = Some(node),
        }
    }

    fn append_text(&mut self, text: &str) -> Result<()> {
        match self.stack.last_mut() {
            Some(node) => {
                node.push_text(text);
                Ok(())
            }
            // Outside the root element only whitespace is allowed.
            None if text.trim().is_empty() => Ok(()),
            None if self.root.is_some() => Err(self.error("junk after document element")),
            None => Err(self.error("text before document element")),
        }
    }

    fn error(&self, message: impl std::fmt::Display) -> PomlError {
        PomlError::syntax(self.reader.buffer_position(), message)
    }
}

/// Turns `\r\n` and lone `\r` into `\n`, as XML requires of literal text.
fn normalize_line_ends(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Parses markup into a raw `Node` tree without any POML-specific checks.
pub fn parse_tree(markup: &str) -> Result<Node> {
    Parser::new(markup).parse()
}

/// Parses POML text into a `Document`.
///
/// The root marker is checked on the raw string first, so text that does not
/// start with `<poml>` is rejected without running the XML parser.
pub fn parse(markup: &str) -> Result<Document> {
    if !markup.trim().starts_with(ROOT_MARKER) {
        return Err(PomlError::InvalidRoot);
    }
    let root = parse_tree(markup)?;
    Document::try_from(root)
}
