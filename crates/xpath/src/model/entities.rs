//! General entities declared in a document's internal DTD subset.
//!
//! Only internal (literal) entities are expanded. External entities are
//! recorded so a reference to one reports a clear error instead of an
//! "undeclared" one. Replacement text that contains markup is refused since
//! the tree builder consumes it as character data.

use super::parser::{XmlError, check_chars, is_xml_char};
use quick_xml::escape::resolve_predefined_entity;
use std::collections::HashMap;

/// Nesting limit for entities whose replacement text references other entities.
const MAX_NESTING: usize = 16;
/// Upper bound on the text produced by expanding a single reference.
const MAX_EXPANSION: usize = 1 << 20;

#[derive(Debug, Default)]
pub(crate) struct Entities {
    internal: HashMap<String, String>,
    external: Vec<String>,
}

impl Entities {
    /// Reads the `<!ENTITY ...>` declarations out of a DOCTYPE body. Parameter
    /// entities are skipped; the first declaration of a name wins.
    pub(crate) fn declare_from_doctype(&mut self, doctype: &str, position: u64) -> Result<(), XmlError> {
        let mut rest = doctype;
        while let Some(ch) = rest.chars().next() {
            if let Some(tail) = rest.strip_prefix("<!--") {
                rest = tail.split_once("-->").map_or("", |(_, after)| after);
            } else if let Some(tail) = rest.strip_prefix("<!ENTITY") {
                rest = self.declaration(tail, position)?;
            } else if ch == '"' || ch == '\'' {
                rest = skip_literal(rest, ch);
            } else {
                rest = &rest[ch.len_utf8()..];
            }
        }
        Ok(())
    }

    /// Parses one declaration body and returns the input following it.
    fn declaration<'d>(&mut self, body: &'d str, position: u64) -> Result<&'d str, XmlError> {
        let body = body.trim_start();
        if body.starts_with('%') {
            return Ok(body);
        }
        let name_len = body.find(|ch: char| ch.is_whitespace() || ch == '"' || ch == '\'').unwrap_or(body.len());
        let (name, rest) = body.split_at(name_len);
        if name.is_empty() {
            return Err(XmlError::Syntax { position, message: "entity declaration without a name".into() });
        }
        let rest = rest.trim_start();
        let Some(quote) = rest.chars().next().filter(|ch| *ch == '"' || *ch == '\'') else {
            // SYSTEM or PUBLIC identifier
            self.external.push(name.to_owned());
            return Ok(rest);
        };
        let literal = &rest[1..];
        let end = literal.find(quote).ok_or_else(|| XmlError::Syntax {
            position,
            message: format!("unterminated value for entity `{name}`"),
        })?;
        let value = expand_char_refs(&literal[..end], position)?;
        check_chars(&value, position)?;
        self.internal.entry(name.to_owned()).or_insert(value);
        Ok(&literal[end + 1..])
    }

    /// Replacement text for the reference `&name;`.
    pub(crate) fn resolve(&self, name: &str, position: u64) -> Result<String, XmlError> {
        let mut out = String::new();
        self.expand_reference(name, 0, &mut out, position)?;
        Ok(out)
    }

    /// Resolves every `&...;` reference in `text`. A lone `&` is an error.
    pub(crate) fn expand(&self, text: &str, position: u64) -> Result<String, XmlError> {
        let mut out = String::with_capacity(text.len());
        self.expand_text(text, 0, &mut out, position)?;
        Ok(out)
    }

    fn expand_text(&self, text: &str, depth: usize, out: &mut String, position: u64) -> Result<(), XmlError> {
        let mut rest = text;
        while let Some(start) = rest.find('&') {
            out.push_str(&rest[..start]);
            let tail = &rest[start + 1..];
            let end = tail.find(';').ok_or_else(|| XmlError::Reference {
                position,
                message: "`&` does not start a reference".into(),
            })?;
            self.expand_reference(&tail[..end], depth, out, position)?;
            rest = &tail[end + 1..];
        }
        out.push_str(rest);
        Ok(())
    }

    fn expand_reference(&self, name: &str, depth: usize, out: &mut String, position: u64) -> Result<(), XmlError> {
        if let Some(code) = name.strip_prefix('#') {
            let ch = char_reference(code).ok_or_else(|| XmlError::Reference {
                position,
                message: format!("invalid character reference `&{name};`"),
            })?;
            out.push(ch);
            return Ok(());
        }
        if let Some(value) = resolve_predefined_entity(name) {
            out.push_str(value);
            return Ok(());
        }
        let Some(value) = self.internal.get(name) else {
            let message = if self.external.iter().any(|e| e == name) {
                format!("external entity `{name}` is not loaded")
            } else {
                format!("undeclared entity `{name}`")
            };
            return Err(XmlError::Reference { position, message });
        };
        if depth >= MAX_NESTING {
            return Err(XmlError::Reference { position, message: format!("entity `{name}` nests too deeply") });
        }
        if value.contains('<') {
            return Err(XmlError::Reference {
                position,
                message: format!("entity `{name}` contains markup, which is not supported"),
            });
        }
        self.expand_text(value, depth + 1, out, position)?;
        if out.len() > MAX_EXPANSION {
            return Err(XmlError::Reference { position, message: format!("entity `{name}` expands too far") });
        }
        Ok(())
    }
}

fn skip_literal(text: &str, quote: char) -> &str {
    let body = &text[quote.len_utf8()..];
    body.find(quote).map_or("", |end| &body[end + 1..])
}

/// Character references in an entity value are replaced when it is declared;
/// general references are kept for expansion at the point of use.
fn expand_char_refs(literal: &str, position: u64) -> Result<String, XmlError> {
    let mut out = String::with_capacity(literal.len());
    let mut rest = literal;
    while let Some(start) = rest.find("&#") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let end = tail.find(';').ok_or_else(|| XmlError::Reference {
            position,
            message: "unterminated character reference".into(),
        })?;
        let ch = char_reference(&tail[..end]).ok_or_else(|| XmlError::Reference {
            position,
            message: format!("invalid character reference `&#{};`", &tail[..end]),
        })?;
        out.push(ch);
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Decodes the digits of `&#NN;` or `&#xHH;` to a character XML allows.
fn char_reference(code: &str) -> Option<char> {
    let (digits, radix) = code.strip_prefix('x').map_or((code, 10), |hex| (hex, 16));
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_digit(radix)) {
        return None;
    }
    u32::from_str_radix(digits, radix).ok().and_then(char::from_u32).filter(|ch| is_xml_char(*ch))
}
