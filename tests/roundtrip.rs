//! parse -> print round trips
//!
//! Identity holds up to the documented normalizations: whitespace between
//! tags, attribute quoting style, and escaping of control characters.

use xmlsift::{EventKind, Scan, SliceSource, XmlPrinter, XmlScanner};

/// Reprint a document from its event stream
fn reprint(doc: &[u8]) -> String {
    let mut scanner = XmlScanner::new(SliceSource::new(doc));
    let mut printer = XmlPrinter::utf8();
    let mut out = Vec::new();
    loop {
        match scanner.next_event() {
            Scan::Event(ev) => match ev.kind() {
                EventKind::OpenTag => {
                    let name = String::from_utf8(ev.content().to_vec()).unwrap();
                    printer.print_open_tag(&name, &mut out).unwrap();
                }
                EventKind::TagAttribName => {
                    let name = String::from_utf8(ev.content().to_vec()).unwrap();
                    printer.print_attribute(&name, &mut out).unwrap();
                }
                EventKind::TagAttribValue | EventKind::Content => {
                    let value = String::from_utf8(ev.content().to_vec()).unwrap();
                    printer.print_value(&value, &mut out).unwrap();
                }
                EventKind::CloseTag | EventKind::CloseTagIm => {
                    printer.print_close_tag(&mut out).unwrap();
                }
                EventKind::Exit => return String::from_utf8(out).unwrap(),
                EventKind::ErrorOccurred => {
                    panic!("scan error: {}", String::from_utf8_lossy(ev.content()))
                }
                // The printer emits its own prolog; header and DTD items
                // from the input are dropped.
                _ => {}
            },
            Scan::NeedMore => unreachable!(),
        }
    }
}

const PROLOG: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

#[test]
fn roundtrip_plain_document() {
    let doc = b"<doc><item id=\"1\">x</item><empty/></doc>";
    let expected = format!("{}<doc><item id=\"1\">x</item><empty/></doc>", PROLOG);
    assert_eq!(reprint(doc), expected);
}

#[test]
fn roundtrip_normalizes_attribute_quoting() {
    let doc = b"<a k='v'/>";
    let expected = format!("{}<a k=\"v\"/>", PROLOG);
    assert_eq!(reprint(doc), expected);
}

#[test]
fn roundtrip_preserves_escaping() {
    // &amp; expands on parse and is re-escaped on print.
    let doc = b"<a>x &amp; &lt;y&gt;</a>";
    let expected = format!("{}<a>x &amp; &lt;y&gt;</a>", PROLOG);
    assert_eq!(reprint(doc), expected);
}

#[test]
fn roundtrip_replaces_input_prolog() {
    let doc = b"<?xml version=\"1.0\" encoding=\"utf-8\"?><a/>";
    let expected = format!("{}<a/>", PROLOG);
    assert_eq!(reprint(doc), expected);
}

#[test]
fn roundtrip_is_stable_on_second_pass() {
    let doc = b"<r a=\"1\"><i>x &amp; y</i><i k=\"2\"/></r>";
    let once = reprint(doc);
    let twice = reprint(once.as_bytes());
    assert_eq!(once, twice);
}
