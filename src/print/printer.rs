//! XML printer
//!
//! Serialization counterpart of the scanner: a four-state machine (`Init`,
//! `Content`, `TagAttribute`, `TagElement`) writing into a caller-supplied
//! byte sink in the configured output character set. Application text is
//! UTF-8; every character is re-encoded through the codec on output.
//!
//! The XML prolog is emitted on the first output operation. Self-closing
//! versus explicit-close form follows from the call sequence alone: a close
//! straight after the open tag prints `/>`, a close after content prints
//! `</name>`.

use crate::core::charset::Charset;
use crate::error::Error;
use crate::scan::tagstack::TagStack;
use memchr::memchr;

/// Attribute-value escape set and substitutions (parallel arrays)
const ATTR_ECHR: &[u8] = b"<>'\"&\0\x08\t\n\r";
const ATTR_ESTR: [&str; 10] = [
    "&lt;", "&gt;", "&apos;", "&quot;", "&amp;", "&#0;", "&#8;", "&#9;", "&#10;", "&#13;",
];

/// Content escape set and substitutions (parallel arrays)
const CONTENT_ECHR: &[u8] = b"<>&\0\x08";
const CONTENT_ESTR: [&str; 5] = ["&lt;", "&gt;", "&amp;", "&#0;", "&#8;"];

/// Output state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PState {
    Init,
    Content,
    TagAttribute,
    TagElement,
}

/// Streaming XML serializer
pub struct XmlPrinter {
    out: Charset,
    encoding_name: String,
    state: PState,
    stack: TagStack,
}

impl XmlPrinter {
    /// Printer for an encoding identifier (empty selects UTF-8)
    pub fn new(encoding: &str) -> Result<Self, Error> {
        let out = Charset::from_name(encoding)?;
        let encoding_name = if encoding.is_empty() {
            "UTF-8".to_string()
        } else {
            encoding.to_string()
        };
        tracing::debug!(encoding = %encoding_name, "created XML printer");
        Ok(XmlPrinter {
            out,
            encoding_name,
            state: PState::Init,
            stack: TagStack::new(),
        })
    }

    /// UTF-8 printer
    pub fn utf8() -> Self {
        XmlPrinter {
            out: Charset::Utf8,
            encoding_name: "UTF-8".to_string(),
            state: PState::Init,
            stack: TagStack::new(),
        }
    }

    /// Open an element
    pub fn print_open_tag(&mut self, name: &str, out: &mut Vec<u8>) -> Result<(), Error> {
        self.exit_tag_context(out)?;
        self.put_char('<', out);
        self.put_str(name, out);
        self.stack.push(name.as_bytes());
        self.state = PState::TagElement;
        Ok(())
    }

    /// Begin an attribute; valid only directly inside an open tag
    pub fn print_attribute(&mut self, name: &str, out: &mut Vec<u8>) -> Result<(), Error> {
        if self.state != PState::TagElement {
            return Err(Error::PrinterState("attribute outside tag-open context"));
        }
        self.put_char(' ', out);
        self.put_str(name, out);
        self.put_char('=', out);
        self.state = PState::TagAttribute;
        Ok(())
    }

    /// Print an attribute value or element content, depending on state
    pub fn print_value(&mut self, value: &str, out: &mut Vec<u8>) -> Result<(), Error> {
        if self.state == PState::TagAttribute {
            self.put_char('"', out);
            self.put_escaped(value, ATTR_ECHR, &ATTR_ESTR, out);
            self.put_char('"', out);
            self.state = PState::TagElement;
            return Ok(());
        }
        self.exit_tag_context(out)?;
        self.put_escaped(value, CONTENT_ECHR, &CONTENT_ESTR, out);
        Ok(())
    }

    /// Close the innermost open element
    pub fn print_close_tag(&mut self, out: &mut Vec<u8>) -> Result<(), Error> {
        match self.state {
            PState::TagElement => {
                if self.stack.is_empty() {
                    return Err(Error::PrinterState("close with empty tag stack"));
                }
                self.put_char('/', out);
                self.put_char('>', out);
                self.stack.pop();
                self.state = PState::Content;
                Ok(())
            }
            PState::Content => {
                let Some(top) = self.stack.top() else {
                    return Err(Error::PrinterState("close with empty tag stack"));
                };
                let name = String::from_utf8_lossy(top).into_owned();
                self.put_char('<', out);
                self.put_char('/', out);
                self.put_str(&name, out);
                self.put_char('>', out);
                self.stack.pop();
                Ok(())
            }
            PState::Init => Err(Error::PrinterState("close with empty tag stack")),
            PState::TagAttribute => {
                Err(Error::PrinterState("attribute value missing before close"))
            }
        }
    }

    /// Number of currently open elements
    pub fn tag_depth(&self) -> usize {
        self.stack.depth()
    }

    /// Leave a pending tag-open context, emitting the prolog first if needed
    fn exit_tag_context(&mut self, out: &mut Vec<u8>) -> Result<(), Error> {
        match self.state {
            PState::Content => Ok(()),
            PState::Init => {
                self.print_header(out);
                self.state = PState::Content;
                Ok(())
            }
            PState::TagElement => {
                self.put_char('>', out);
                self.state = PState::Content;
                Ok(())
            }
            PState::TagAttribute => {
                Err(Error::PrinterState("attribute value missing"))
            }
        }
    }

    fn print_header(&self, out: &mut Vec<u8>) {
        self.put_str("<?xml version=\"1.0\" encoding=\"", out);
        self.put_str(&self.encoding_name, out);
        self.put_str("\" standalone=\"yes\"?>\n", out);
    }

    #[inline]
    fn put_char(&self, ch: char, out: &mut Vec<u8>) {
        self.out.print(ch as u32, out);
    }

    fn put_str(&self, s: &str, out: &mut Vec<u8>) {
        for ch in s.chars() {
            self.out.print(ch as u32, out);
        }
    }

    /// Print with ASCII characters substituted from a parallel escape table
    fn put_escaped(&self, s: &str, echr: &[u8], estr: &[&str], out: &mut Vec<u8>) {
        for ch in s.chars() {
            let scalar = ch as u32;
            if scalar < 128 {
                if let Some(i) = memchr(scalar as u8, echr) {
                    self.put_str(estr[i], out);
                    continue;
                }
            }
            self.out.print(scalar, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROLOG: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

    #[test]
    fn test_nested_document() {
        let mut printer = XmlPrinter::utf8();
        let mut out = Vec::new();
        printer.print_open_tag("doc", &mut out).unwrap();
        printer.print_open_tag("item", &mut out).unwrap();
        printer.print_attribute("id", &mut out).unwrap();
        printer.print_value("1", &mut out).unwrap();
        printer.print_value("text", &mut out).unwrap();
        printer.print_close_tag(&mut out).unwrap();
        printer.print_open_tag("empty", &mut out).unwrap();
        printer.print_close_tag(&mut out).unwrap();
        printer.print_close_tag(&mut out).unwrap();

        let expected = format!(
            "{}<doc><item id=\"1\">text</item><empty/></doc>",
            PROLOG
        );
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_prolog_carries_declared_encoding() {
        let mut printer = XmlPrinter::new("ISO-8859-1").unwrap();
        let mut out = Vec::new();
        printer.print_open_tag("a", &mut out).unwrap();
        printer.print_close_tag(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"ISO-8859-1\""));
        assert!(text.ends_with("<a/>"));
    }

    #[test]
    fn test_attribute_value_escaping() {
        let mut printer = XmlPrinter::utf8();
        let mut out = Vec::new();
        printer.print_open_tag("a", &mut out).unwrap();
        printer.print_attribute("k", &mut out).unwrap();
        printer.print_value("a<b>'\"&\n", &mut out).unwrap();
        printer.print_close_tag(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("k=\"a&lt;b&gt;&apos;&quot;&amp;&#10;\""));
    }

    #[test]
    fn test_content_escaping() {
        let mut printer = XmlPrinter::utf8();
        let mut out = Vec::new();
        printer.print_open_tag("a", &mut out).unwrap();
        printer.print_value("x<y>&z\u{0}\u{8}", &mut out).unwrap();
        printer.print_close_tag(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("x&lt;y&gt;&amp;z&#0;&#8;"));
        // Quotes are not escaped in content.
        let mut out = Vec::new();
        let mut printer = XmlPrinter::utf8();
        printer.print_open_tag("a", &mut out).unwrap();
        printer.print_value("it's \"q\"", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("it's \"q\""));
    }

    #[test]
    fn test_attribute_outside_tag_open_fails() {
        let mut printer = XmlPrinter::utf8();
        let mut out = Vec::new();
        printer.print_open_tag("a", &mut out).unwrap();
        printer.print_value("content", &mut out).unwrap();
        let result = printer.print_attribute("k", &mut out);
        assert!(matches!(result, Err(Error::PrinterState(_))));
    }

    #[test]
    fn test_close_with_empty_stack_fails() {
        let mut printer = XmlPrinter::utf8();
        let mut out = Vec::new();
        assert!(printer.print_close_tag(&mut out).is_err());

        printer.print_open_tag("a", &mut out).unwrap();
        printer.print_close_tag(&mut out).unwrap();
        assert!(printer.print_close_tag(&mut out).is_err());
    }

    #[test]
    fn test_dangling_attribute_fails_open() {
        let mut printer = XmlPrinter::utf8();
        let mut out = Vec::new();
        printer.print_open_tag("a", &mut out).unwrap();
        printer.print_attribute("k", &mut out).unwrap();
        assert!(printer.print_open_tag("b", &mut out).is_err());
    }

    #[test]
    fn test_unsupported_encoding_fails_construction() {
        assert!(XmlPrinter::new("koi8-r").is_err());
    }

    #[test]
    fn test_latin1_output_encoding() {
        let mut printer = XmlPrinter::new("isolatin1").unwrap();
        let mut out = Vec::new();
        printer.print_open_tag("a", &mut out).unwrap();
        printer.print_value("caf\u{e9}", &mut out).unwrap();
        printer.print_close_tag(&mut out).unwrap();
        // 'é' is the single byte 0xE9 in ISO-8859-1.
        assert!(out.windows(4).any(|w| w == [b'c', b'a', b'f', 0xE9]));
    }

    #[test]
    fn test_utf16_output_encoding() {
        let mut printer = XmlPrinter::new("UTF-16LE").unwrap();
        let mut out = Vec::new();
        printer.print_open_tag("a", &mut out).unwrap();
        printer.print_close_tag(&mut out).unwrap();
        // "<a/>" near the end, every unit little-endian.
        let tail: Vec<u8> = out[out.len() - 8..].to_vec();
        assert_eq!(tail, vec![b'<', 0, b'a', 0, b'/', 0, b'>', 0]);
    }
}
