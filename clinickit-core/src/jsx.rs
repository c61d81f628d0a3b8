// Structural scanner for JSX elements in component source text

use std::ops::Range;

/// Value of a JSX attribute, with quotes or braces stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// `name="text"` or `name='text'`
    Str(String),
    /// `name={expression}`
    Expr(String),
    /// `name` with no value
    Bare,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: AttrValue,
}

/// A JSX element located in the source text.
///
/// `span` covers the whole element, from the opening `<` to the end of the
/// closing tag (or of `/>` for self-closing elements). `children` holds the
/// spans of the elements that appear directly in this element's body, not
/// inside an expression container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub span: Range<usize>,
    pub attributes: Vec<Attribute>,
    pub self_closing: bool,
    pub children: Vec<Range<usize>>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.value)
    }

    /// Text of a string or expression attribute
    pub fn attr_text(&self, name: &str) -> Option<&str> {
        match self.attr(name)? {
            AttrValue::Str(s) | AttrValue::Expr(s) => Some(s.as_str()),
            AttrValue::Bare => None,
        }
    }

    /// True when `other` lies strictly inside this element
    pub fn encloses(&self, other: &Element) -> bool {
        self.span.start <= other.span.start
            && other.span.end <= self.span.end
            && self.span != other.span
    }
}

/// Locate every JSX element in `source`, nested ones included, in order of
/// their opening `<`.
///
/// A `<` that does not open a well-formed element (a comparison, an
/// unterminated tag, a mismatched closing tag) is skipped.
pub fn parse_elements(source: &str) -> Vec<Element> {
    let scanner = Scanner::new(source);
    let bytes = source.as_bytes();
    let mut elements = Vec::new();
    // End of the outermost element found so far; JSX text before it may
    // hold apostrophes that are not string delimiters
    let mut covered = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'/' if scanner.byte(pos + 1) == Some(b'*') => {
                pos = scanner.skip_block_comment(pos);
            }
            // `//` after a colon is usually a URL inside a string
            b'/' if scanner.byte(pos + 1) == Some(b'/') && (pos == 0 || bytes[pos - 1] != b':') => {
                pos = scanner.skip_line_comment(pos);
            }
            q @ (b'\'' | b'"') if pos >= covered => pos = scanner.skip_string(pos, q),
            b'`' if pos >= covered => {
                pos = scanner.skip_template(pos).unwrap_or(pos + 1);
            }
            b'<' => {
                if let Some(element) = scanner.element_at(pos) {
                    covered = covered.max(element.span.end);
                    elements.push(element);
                }
                pos += 1;
            }
            _ => pos += 1,
        }
    }

    elements
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
        }
    }

    fn byte(&self, pos: usize) -> Option<u8> {
        self.bytes.get(pos).copied()
    }

    fn skip_ws(&self, mut pos: usize) -> usize {
        while let Some(b) = self.byte(pos) {
            if !b.is_ascii_whitespace() {
                break;
            }
            pos += 1;
        }
        pos
    }

    fn scan_while(&self, mut pos: usize, pred: impl Fn(u8) -> bool) -> usize {
        while let Some(b) = self.byte(pos) {
            if !pred(b) {
                break;
            }
            pos += 1;
        }
        pos
    }

    fn scan_tag_name(&self, pos: usize) -> Option<usize> {
        if !self.byte(pos)?.is_ascii_alphabetic() {
            return None;
        }
        Some(self.scan_while(pos, |b| {
            b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-' | b':' | b'$')
        }))
    }

    fn skip_line_comment(&self, pos: usize) -> usize {
        self.src[pos..]
            .find('\n')
            .map(|off| pos + off + 1)
            .unwrap_or(self.bytes.len())
    }

    fn skip_block_comment(&self, pos: usize) -> usize {
        self.src[pos + 2..]
            .find("*/")
            .map(|off| pos + 2 + off + 2)
            .unwrap_or(self.bytes.len())
    }

    /// Skip a quoted string starting at `pos`. Stops at an unescaped newline.
    fn skip_string(&self, pos: usize, quote: u8) -> usize {
        let mut i = pos + 1;
        while let Some(b) = self.byte(i) {
            match b {
                b'\\' => i += 2,
                b'\n' => return i,
                b if b == quote => return i + 1,
                _ => i += 1,
            }
        }
        self.bytes.len()
    }

    fn skip_template(&self, pos: usize) -> Option<usize> {
        let mut i = pos + 1;
        loop {
            match self.byte(i)? {
                b'\\' => i += 2,
                b'`' => return Some(i + 1),
                b'$' if self.byte(i + 1) == Some(b'{') => i = self.skip_braced(i + 1)?,
                _ => i += 1,
            }
        }
    }

    /// Skip a `{ ... }` JavaScript expression starting at `pos`; returns the
    /// index just past the matching `}`.
    fn skip_braced(&self, pos: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut i = pos;
        loop {
            match self.byte(i)? {
                b'{' => {
                    depth += 1;
                    i += 1;
                }
                b'}' => {
                    depth -= 1;
                    i += 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                q @ (b'\'' | b'"') => i = self.skip_string(i, q),
                b'`' => i = self.skip_template(i)?,
                b'/' if self.byte(i + 1) == Some(b'/') => i = self.skip_line_comment(i),
                b'/' if self.byte(i + 1) == Some(b'*') => i = self.skip_block_comment(i),
                b'<' => match self.element_at(i) {
                    Some(element) => i = element.span.end,
                    None => i += 1,
                },
                _ => i += 1,
            }
        }
    }

    /// Parse the element whose opening `<` is at `start`. A fragment
    /// `<>...</>` comes back as an element with an empty name.
    fn element_at(&self, start: usize) -> Option<Element> {
        let name_start = start + 1;
        if self.byte(name_start) == Some(b'>') {
            let mut children = Vec::new();
            let end = self.skip_children(name_start + 1, "", &mut children)?;
            return Some(Element {
                name: String::new(),
                span: start..end,
                attributes: Vec::new(),
                self_closing: false,
                children,
            });
        }

        let name_end = self.scan_tag_name(name_start)?;
        let name = &self.src[name_start..name_end];

        let mut attributes = Vec::new();
        let mut pos = name_end;

        loop {
            pos = self.skip_ws(pos);
            match self.byte(pos)? {
                b'/' => {
                    if self.byte(pos + 1)? != b'>' {
                        return None;
                    }
                    return Some(Element {
                        name: name.to_string(),
                        span: start..pos + 2,
                        attributes,
                        self_closing: true,
                        children: Vec::new(),
                    });
                }
                b'>' => {
                    pos += 1;
                    break;
                }
                // Spread attribute
                b'{' => pos = self.skip_braced(pos)?,
                b if b.is_ascii_alphabetic() || b == b'_' => {
                    let attr_end = self.scan_while(pos, |b| {
                        b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b':' | b'.')
                    });
                    let attr_name = self.src[pos..attr_end].to_string();
                    let after_name = self.skip_ws(attr_end);

                    if self.byte(after_name) == Some(b'=') {
                        let value_start = self.skip_ws(after_name + 1);
                        let (value, value_end) = match self.byte(value_start)? {
                            q @ (b'"' | b'\'') => {
                                let close = self.src[value_start + 1..].find(q as char)?;
                                let end = value_start + 1 + close;
                                (
                                    AttrValue::Str(self.src[value_start + 1..end].to_string()),
                                    end + 1,
                                )
                            }
                            b'{' => {
                                let end = self.skip_braced(value_start)?;
                                (
                                    AttrValue::Expr(self.src[value_start + 1..end - 1].to_string()),
                                    end,
                                )
                            }
                            b'<' => {
                                let element = self.element_at(value_start)?;
                                let end = element.span.end;
                                (AttrValue::Expr(self.src[value_start..end].to_string()), end)
                            }
                            _ => return None,
                        };
                        attributes.push(Attribute {
                            name: attr_name,
                            value,
                        });
                        pos = value_end;
                    } else {
                        attributes.push(Attribute {
                            name: attr_name,
                            value: AttrValue::Bare,
                        });
                        pos = attr_end;
                    }
                }
                _ => return None,
            }
        }

        let mut children = Vec::new();
        let end = self.skip_children(pos, name, &mut children)?;

        Some(Element {
            name: name.to_string(),
            span: start..end,
            attributes,
            self_closing: false,
            children,
        })
    }

    /// Walk an element body up to and including `</name>`. An empty `name`
    /// closes a fragment. Returns the index just past the closing tag.
    fn skip_children(
        &self,
        mut pos: usize,
        name: &str,
        children: &mut Vec<Range<usize>>,
    ) -> Option<usize> {
        loop {
            match self.byte(pos)? {
                b'<' if self.byte(pos + 1) == Some(b'/') => {
                    let close_start = self.skip_ws(pos + 2);
                    let close_end = self.scan_tag_name(close_start).unwrap_or(close_start);
                    let after = self.skip_ws(close_end);
                    if self.byte(after)? != b'>' || &self.src[close_start..close_end] != name {
                        return None;
                    }
                    return Some(after + 1);
                }
                b'<' => match self.element_at(pos) {
                    Some(child) => {
                        pos = child.span.end;
                        children.push(child.span);
                    }
                    None => pos += 1,
                },
                b'{' => pos = self.skip_braced(pos)?,
                _ => pos += 1,
            }
        }
    }
}
