//! End-to-end scanner scenarios, including byte-granular restartability
//! over chunked sources.

use xmlsift::{ChunkedSource, EventKind, Scan, SliceSource, XmlScanner};

fn collect(doc: &[u8]) -> Vec<(EventKind, Vec<u8>)> {
    let mut scanner = XmlScanner::new(SliceSource::new(doc));
    let mut events = Vec::new();
    loop {
        match scanner.next_event() {
            Scan::Event(ev) => {
                let kind = ev.kind();
                events.push((kind, ev.content().to_vec()));
                if matches!(kind, EventKind::Exit | EventKind::ErrorOccurred) {
                    return events;
                }
            }
            Scan::NeedMore => panic!("slice source never pends"),
        }
    }
}

fn collect_chunked(doc: &[u8], split: usize) -> Vec<(EventKind, Vec<u8>)> {
    let mut src = ChunkedSource::new();
    src.feed(&doc[..split]);
    let mut scanner = XmlScanner::new(src);
    let mut events = Vec::new();
    let mut fed_rest = false;
    loop {
        match scanner.next_event() {
            Scan::Event(ev) => {
                let kind = ev.kind();
                events.push((kind, ev.content().to_vec()));
                if matches!(kind, EventKind::Exit | EventKind::ErrorOccurred) {
                    return events;
                }
            }
            Scan::NeedMore => {
                assert!(!fed_rest, "scanner must not pend after the source is finished");
                scanner.source_mut().feed(&doc[split..]);
                scanner.source_mut().finish();
                fed_rest = true;
            }
        }
    }
}

#[test]
fn simple_element_event_sequence() {
    // No header in the input: no header events in the output.
    let events = collect(b"<a>x</a>");
    assert_eq!(
        events,
        vec![
            (EventKind::OpenTag, b"a".to_vec()),
            (EventKind::Content, b"x".to_vec()),
            (EventKind::CloseTag, b"a".to_vec()),
            (EventKind::Exit, vec![]),
        ]
    );
}

#[test]
fn self_closing_element_with_attribute() {
    let events = collect(b"<a k=\"v\"/>");
    assert_eq!(
        events,
        vec![
            (EventKind::OpenTag, b"a".to_vec()),
            (EventKind::TagAttribName, b"k".to_vec()),
            (EventKind::TagAttribValue, b"v".to_vec()),
            (EventKind::CloseTagIm, vec![]),
            (EventKind::Exit, vec![]),
        ]
    );
}

#[test]
fn entity_references_expand_in_content() {
    let events = collect(b"<a>&amp;&lt;</a>");
    assert_eq!(events[1], (EventKind::Content, b"&<".to_vec()));
}

#[test]
fn tag_mismatch_is_terminal_and_reemitted() {
    let doc = b"<a><b></a>";
    let mut scanner = XmlScanner::new(SliceSource::new(doc));
    let mut last = None;
    loop {
        match scanner.next_event() {
            Scan::Event(ev) => {
                if ev.kind() == EventKind::ErrorOccurred {
                    last = Some(ev.content().to_vec());
                    break;
                }
                assert_ne!(ev.kind(), EventKind::Exit, "malformed input must not exit");
            }
            Scan::NeedMore => unreachable!(),
        }
    }
    let first_message = last.unwrap();
    // Subsequent advances re-emit the identical error.
    for _ in 0..3 {
        match scanner.next_event() {
            Scan::Event(ev) => {
                assert_eq!(ev.kind(), EventKind::ErrorOccurred);
                assert_eq!(ev.content(), &first_message[..]);
            }
            Scan::NeedMore => unreachable!(),
        }
    }
}

#[test]
fn attribute_events_alternate_strictly() {
    let doc = b"<a one=\"1\" two=\"2\" three=\"3\"></a>";
    let events = collect(doc);
    let mut expect_name = true;
    for (kind, _) in &events {
        match kind {
            EventKind::TagAttribName => {
                assert!(expect_name);
                expect_name = false;
            }
            EventKind::TagAttribValue => {
                assert!(!expect_name);
                expect_name = true;
            }
            _ => {}
        }
    }
    assert!(expect_name);
}

#[test]
fn open_and_close_multisets_balance() {
    let doc = b"<a><b><c/></b><b/></a>";
    let events = collect(doc);
    let opens = events
        .iter()
        .filter(|(k, _)| *k == EventKind::OpenTag)
        .count();
    let closes = events
        .iter()
        .filter(|(k, _)| matches!(k, EventKind::CloseTag | EventKind::CloseTagIm))
        .count();
    assert_eq!(opens, closes);
    assert_eq!(events.last().unwrap().0, EventKind::Exit);
}

#[test]
fn chunked_source_is_byte_granular_restartable() {
    let doc: &[u8] =
        b"<?xml version=\"1.0\"?><r a=\"1\"><i>x &amp; y</i><![CDATA[raw]]><i k='2'/></r>";
    let whole = collect(doc);
    for split in 0..=doc.len() {
        let chunked = collect_chunked(doc, split);
        assert_eq!(chunked, whole, "event sequence differs at split {}", split);
    }
}

#[test]
fn chunked_source_multibyte_characters_across_splits() {
    let doc = "<a>caf\u{e9} \u{1d11e}</a>".as_bytes();
    let whole = collect(doc);
    for split in 0..=doc.len() {
        let chunked = collect_chunked(doc, split);
        assert_eq!(chunked, whole, "event sequence differs at split {}", split);
    }
}

#[test]
fn header_and_doctype_before_root() {
    let doc = b"<?xml version=\"1.0\"?><!DOCTYPE r SYSTEM \"r.dtd\"><r/>";
    let events = collect(doc);
    let kinds: Vec<EventKind> = events.iter().map(|(k, _)| *k).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::HeaderStart,
            EventKind::HeaderAttribName,
            EventKind::HeaderAttribValue,
            EventKind::HeaderEnd,
            EventKind::DocAttribValue,
            EventKind::DocAttribValue,
            EventKind::DocAttribValue,
            EventKind::DocAttribEnd,
            EventKind::OpenTag,
            EventKind::CloseTagIm,
            EventKind::Exit,
        ]
    );
}
