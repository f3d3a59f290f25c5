//! XML scanner state machine
//!
//! A pull-style lexer over the text scanner. Each advance consumes as many
//! characters as needed to assemble one event and returns it; transitions
//! are keyed on the current character's lexical class. Every piece of
//! progress lives in a named field, never on the call stack, so a source
//! that reports `Pending` mid-token resumes bit-for-bit on the next call.
//!
//! Errors and `Exit` are terminal: once emitted, further advances re-emit
//! the same event.

use crate::core::charset::Charset;
use crate::core::entities::{decode_charref, EntityMap};
use crate::core::source::ByteSource;
use crate::core::textscan::{CharClass, Chr, TextScanner};
use crate::error::{Error, ScanError, ScanErrorKind};
use crate::scan::event::{Event, EventKind, Scan};
use crate::scan::tagstack::TagStack;

/// Grammatical context of the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Content,
    TagOpenFirst,
    OpenTagName,
    AfterOpenName,
    AttribName,
    AfterAttribName,
    ExpectAttribValue,
    AttribValue(u8),
    CloseTagName,
    CloseTagWs,
    ExpectAngleClose,
    HeaderTarget,
    HeaderAfterName,
    HeaderAttribName,
    HeaderAfterAttribName,
    HeaderExpectValue,
    HeaderValue(u8),
    HeaderExpectClose,
    PiSkip,
    PiSkipQuest,
    BangFirst,
    CommentStart,
    Comment,
    CommentDash1,
    CommentDash2,
    CdataOpen(u8),
    Cdata,
    CdataBracket1,
    CdataBracket2,
    DocDeclKeyword,
    DocDecl,
    DocDeclName,
    DocDeclValue(u8),
    DocSubset(u32),
    Entity(EntityFrom),
}

/// Where an entity reference started, for resuming after expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntityFrom {
    Content,
    Attrib(u8),
}

/// Streaming XML lexer
///
/// Generic over the byte source; input and output character sets are fixed
/// at construction. Event content is produced in the output character set
/// (UTF-8 by default) and borrows the scanner's rolling buffer until the
/// next advance.
pub struct XmlScanner<S: ByteSource> {
    text: TextScanner<S>,
    out: Charset,
    entities: EntityMap,
    state: State,
    buf: Vec<u8>,
    ent: Vec<u8>,
    stack: TagStack,
    pending: Option<EventKind>,
    error: Option<ScanError>,
    finished: bool,
    do_tokenize: bool,
    pending_ws: bool,
    bom_checked: bool,
}

impl<S: ByteSource> XmlScanner<S> {
    /// Scanner for UTF-8 input producing UTF-8 event content
    pub fn new(src: S) -> Self {
        Self::with_charsets(src, Charset::Utf8, Charset::Utf8)
    }

    /// Scanner with explicit input and output character sets
    pub fn with_charsets(src: S, input: Charset, output: Charset) -> Self {
        XmlScanner {
            text: TextScanner::new(src, input),
            out: output,
            entities: EntityMap::default(),
            state: State::Start,
            buf: Vec::new(),
            ent: Vec::new(),
            stack: TagStack::new(),
            pending: None,
            error: None,
            finished: false,
            do_tokenize: false,
            pending_ws: false,
            bom_checked: false,
        }
    }

    /// Scanner whose input character set is resolved from an encoding name
    pub fn from_encoding(src: S, encoding: &str) -> Result<Self, Error> {
        let input = Charset::from_name(encoding)?;
        Ok(Self::with_charsets(src, input, Charset::Utf8))
    }

    /// Replace the entity map (builder style)
    pub fn with_entities(mut self, entities: EntityMap) -> Self {
        self.entities = entities;
        self
    }

    /// Toggle content tokenization (builder style)
    pub fn tokenize(mut self, on: bool) -> Self {
        self.do_tokenize = on;
        self
    }

    /// Toggle content tokenization at an event boundary
    ///
    /// When on, whitespace runs in content collapse to a single space and
    /// leading/trailing whitespace is stripped.
    pub fn set_tokenize(&mut self, on: bool) {
        self.do_tokenize = on;
    }

    /// Number of currently open elements
    pub fn tag_depth(&self) -> usize {
        self.stack.depth()
    }

    /// Access the underlying byte source, e.g. to refill a chunked source
    /// after [`Scan::NeedMore`]
    pub fn source_mut(&mut self) -> &mut S {
        self.text.source_mut()
    }

    /// Advance to the next event
    ///
    /// Returns [`Scan::NeedMore`] when the byte source reports pending data;
    /// refill the source and call again to continue exactly where the scan
    /// stopped.
    pub fn next_event(&mut self) -> Scan<'_> {
        if self.error.is_some() {
            return Scan::Event(Event::new(
                EventKind::ErrorOccurred,
                self.error.as_ref().unwrap().message().as_bytes(),
            ));
        }
        self.next_event_inner()
    }

    fn next_event_inner(&mut self) -> Scan<'_> {
        if self.finished {
            return Scan::Event(Event::new(EventKind::Exit, b""));
        }
        if let Some(kind) = self.pending.take() {
            match kind {
                EventKind::CloseTagIm => {
                    self.stack.pop();
                    return Scan::Event(Event::new(kind, b""));
                }
                EventKind::Exit => {
                    self.finished = true;
                    return Scan::Event(Event::new(kind, b""));
                }
                other => return Scan::Event(Event::new(other, b"")),
            }
        }

        loop {
            let ch = match self.text.chr() {
                Chr::Ch(u) => u,
                Chr::End => 0,
                Chr::Pending => return Scan::NeedMore,
                Chr::Malformed => {
                    return self.fail(
                        ScanErrorKind::MalformedCharacter,
                        "cannot decode input byte sequence",
                    )
                }
            };
            let class = CharClass::of(ch);

            if !self.bom_checked {
                self.bom_checked = true;
                if ch == 0xFEFF {
                    self.text.bump();
                    continue;
                }
            }

            match self.state {
                State::Start => match class {
                    CharClass::Lt => {
                        self.text.bump();
                        self.state = State::TagOpenFirst;
                    }
                    CharClass::EndOfText => {
                        if self.stack.is_empty() {
                            self.finished = true;
                            return Scan::Event(Event::new(EventKind::Exit, b""));
                        }
                        return self.fail(
                            ScanErrorKind::UnclosedDocument,
                            "end of data with open elements",
                        );
                    }
                    CharClass::Space if self.do_tokenize || self.stack.is_empty() => {
                        self.text.bump();
                    }
                    CharClass::Amp => {
                        self.begin();
                        self.ent.clear();
                        self.state = State::Entity(EntityFrom::Content);
                        self.text.bump();
                    }
                    _ => {
                        self.begin();
                        self.push_content(ch);
                        self.text.bump();
                        self.state = State::Content;
                    }
                },

                State::Content => match class {
                    CharClass::Lt => {
                        self.text.bump();
                        self.state = State::TagOpenFirst;
                        if !self.buf.is_empty() {
                            return Scan::Event(Event::new(EventKind::Content, &self.buf));
                        }
                    }
                    CharClass::Amp => {
                        self.ent.clear();
                        self.state = State::Entity(EntityFrom::Content);
                        self.text.bump();
                    }
                    CharClass::EndOfText => {
                        if !self.stack.is_empty() {
                            return self.fail(
                                ScanErrorKind::UnclosedDocument,
                                "end of data with open elements",
                            );
                        }
                        if self.buf.is_empty() {
                            self.finished = true;
                            return Scan::Event(Event::new(EventKind::Exit, b""));
                        }
                        self.pending = Some(EventKind::Exit);
                        return Scan::Event(Event::new(EventKind::Content, &self.buf));
                    }
                    _ => {
                        self.push_content(ch);
                        self.text.bump();
                    }
                },

                State::TagOpenFirst => match class {
                    CharClass::Quest => {
                        self.text.bump();
                        self.begin();
                        self.ent.clear();
                        self.state = State::HeaderTarget;
                    }
                    CharClass::Bang => {
                        self.text.bump();
                        self.state = State::BangFirst;
                    }
                    CharClass::Slash => {
                        self.text.bump();
                        self.begin();
                        self.state = State::CloseTagName;
                    }
                    CharClass::NameStart => {
                        self.begin();
                        self.out.print(ch, &mut self.buf);
                        self.text.bump();
                        self.state = State::OpenTagName;
                    }
                    CharClass::EndOfText => {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated markup")
                    }
                    _ => return self.unexpected(ch, "after '<'"),
                },

                State::OpenTagName => match class {
                    c if c.is_name() => {
                        self.out.print(ch, &mut self.buf);
                        self.text.bump();
                    }
                    CharClass::Space => {
                        self.text.bump();
                        self.state = State::AfterOpenName;
                        self.stack.push(&self.buf);
                        return Scan::Event(Event::new(EventKind::OpenTag, &self.buf));
                    }
                    CharClass::Gt => {
                        self.text.bump();
                        self.state = State::Start;
                        self.stack.push(&self.buf);
                        return Scan::Event(Event::new(EventKind::OpenTag, &self.buf));
                    }
                    CharClass::Slash => {
                        self.text.bump();
                        self.state = State::ExpectAngleClose;
                        self.stack.push(&self.buf);
                        self.pending = Some(EventKind::CloseTagIm);
                        return Scan::Event(Event::new(EventKind::OpenTag, &self.buf));
                    }
                    CharClass::EndOfText => {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated start tag")
                    }
                    _ => return self.unexpected(ch, "in element name"),
                },

                State::AfterOpenName => match class {
                    CharClass::Space => self.text.bump(),
                    CharClass::NameStart => {
                        self.begin();
                        self.out.print(ch, &mut self.buf);
                        self.text.bump();
                        self.state = State::AttribName;
                    }
                    CharClass::Slash => {
                        self.text.bump();
                        self.state = State::ExpectAngleClose;
                        self.stack.pop();
                        return Scan::Event(Event::new(EventKind::CloseTagIm, b""));
                    }
                    CharClass::Gt => {
                        self.text.bump();
                        self.state = State::Start;
                    }
                    CharClass::EndOfText => {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated start tag")
                    }
                    _ => return self.unexpected(ch, "in start tag"),
                },

                State::AttribName => match class {
                    c if c.is_name() => {
                        self.out.print(ch, &mut self.buf);
                        self.text.bump();
                    }
                    CharClass::Equal => {
                        self.text.bump();
                        self.state = State::ExpectAttribValue;
                        return Scan::Event(Event::new(EventKind::TagAttribName, &self.buf));
                    }
                    CharClass::Space => {
                        self.text.bump();
                        self.state = State::AfterAttribName;
                    }
                    CharClass::EndOfText => {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated start tag")
                    }
                    _ => return self.unexpected(ch, "in attribute name"),
                },

                State::AfterAttribName => match class {
                    CharClass::Space => self.text.bump(),
                    CharClass::Equal => {
                        self.text.bump();
                        self.state = State::ExpectAttribValue;
                        return Scan::Event(Event::new(EventKind::TagAttribName, &self.buf));
                    }
                    CharClass::EndOfText => {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated start tag")
                    }
                    _ => return self.unexpected(ch, "after attribute name"),
                },

                State::ExpectAttribValue => match class {
                    CharClass::Space => self.text.bump(),
                    CharClass::Dquote => {
                        self.text.bump();
                        self.begin();
                        self.state = State::AttribValue(b'"');
                    }
                    CharClass::Squote => {
                        self.text.bump();
                        self.begin();
                        self.state = State::AttribValue(b'\'');
                    }
                    CharClass::EndOfText => {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated start tag")
                    }
                    _ => return self.unexpected(ch, "before attribute value"),
                },

                State::AttribValue(quote) => {
                    if ch == quote as u32 {
                        self.text.bump();
                        self.state = State::AfterOpenName;
                        return Scan::Event(Event::new(EventKind::TagAttribValue, &self.buf));
                    }
                    match class {
                        CharClass::Amp => {
                            self.ent.clear();
                            self.state = State::Entity(EntityFrom::Attrib(quote));
                            self.text.bump();
                        }
                        CharClass::EndOfText => {
                            return self.fail(
                                ScanErrorKind::UnclosedDocument,
                                "unterminated attribute value",
                            )
                        }
                        _ => {
                            self.out.print(ch, &mut self.buf);
                            self.text.bump();
                        }
                    }
                }

                State::CloseTagName => match class {
                    c if c.is_name() => {
                        self.out.print(ch, &mut self.buf);
                        self.text.bump();
                    }
                    CharClass::Gt => {
                        self.text.bump();
                        return self.close_check();
                    }
                    CharClass::Space => {
                        self.text.bump();
                        self.state = State::CloseTagWs;
                    }
                    CharClass::EndOfText => {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated end tag")
                    }
                    _ => return self.unexpected(ch, "in end tag"),
                },

                State::CloseTagWs => match class {
                    CharClass::Space => self.text.bump(),
                    CharClass::Gt => {
                        self.text.bump();
                        return self.close_check();
                    }
                    CharClass::EndOfText => {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated end tag")
                    }
                    _ => return self.unexpected(ch, "in end tag"),
                },

                State::ExpectAngleClose => match class {
                    CharClass::Gt => {
                        self.text.bump();
                        self.state = State::Start;
                    }
                    CharClass::EndOfText => {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated start tag")
                    }
                    _ => return self.unexpected(ch, "after '/' in empty element"),
                },

                State::HeaderTarget => match class {
                    c if c.is_name() => {
                        self.out.print(ch, &mut self.buf);
                        self.ent.push(if ch < 128 { ch as u8 } else { 0xFF });
                        self.text.bump();
                    }
                    CharClass::Space => {
                        self.text.bump();
                        if self.ent == b"xml" {
                            self.state = State::HeaderAfterName;
                            return Scan::Event(Event::new(EventKind::HeaderStart, &self.buf));
                        }
                        self.state = State::PiSkip;
                    }
                    CharClass::Quest => {
                        self.text.bump();
                        if self.ent == b"xml" {
                            self.state = State::HeaderExpectClose;
                            return Scan::Event(Event::new(EventKind::HeaderStart, &self.buf));
                        }
                        self.state = State::PiSkipQuest;
                    }
                    CharClass::EndOfText => {
                        return self.fail(
                            ScanErrorKind::UnclosedDocument,
                            "unterminated processing instruction",
                        )
                    }
                    _ => {
                        self.state = State::PiSkip;
                    }
                },

                State::PiSkip => match class {
                    CharClass::Quest => {
                        self.text.bump();
                        self.state = State::PiSkipQuest;
                    }
                    CharClass::EndOfText => {
                        return self.fail(
                            ScanErrorKind::UnclosedDocument,
                            "unterminated processing instruction",
                        )
                    }
                    _ => self.text.bump(),
                },

                State::PiSkipQuest => match class {
                    CharClass::Gt => {
                        self.text.bump();
                        self.state = State::Start;
                    }
                    CharClass::Quest => self.text.bump(),
                    CharClass::EndOfText => {
                        return self.fail(
                            ScanErrorKind::UnclosedDocument,
                            "unterminated processing instruction",
                        )
                    }
                    _ => {
                        self.text.bump();
                        self.state = State::PiSkip;
                    }
                },

                State::HeaderAfterName => match class {
                    CharClass::Space => self.text.bump(),
                    CharClass::NameStart => {
                        self.begin();
                        self.out.print(ch, &mut self.buf);
                        self.text.bump();
                        self.state = State::HeaderAttribName;
                    }
                    CharClass::Quest => {
                        self.text.bump();
                        self.state = State::HeaderExpectClose;
                    }
                    CharClass::EndOfText => {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated XML header")
                    }
                    _ => return self.unexpected(ch, "in XML header"),
                },

                State::HeaderAttribName => match class {
                    c if c.is_name() => {
                        self.out.print(ch, &mut self.buf);
                        self.text.bump();
                    }
                    CharClass::Equal => {
                        self.text.bump();
                        self.state = State::HeaderExpectValue;
                        return Scan::Event(Event::new(EventKind::HeaderAttribName, &self.buf));
                    }
                    CharClass::Space => {
                        self.text.bump();
                        self.state = State::HeaderAfterAttribName;
                    }
                    CharClass::EndOfText => {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated XML header")
                    }
                    _ => return self.unexpected(ch, "in XML header attribute"),
                },

                State::HeaderAfterAttribName => match class {
                    CharClass::Space => self.text.bump(),
                    CharClass::Equal => {
                        self.text.bump();
                        self.state = State::HeaderExpectValue;
                        return Scan::Event(Event::new(EventKind::HeaderAttribName, &self.buf));
                    }
                    CharClass::EndOfText => {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated XML header")
                    }
                    _ => return self.unexpected(ch, "in XML header attribute"),
                },

                State::HeaderExpectValue => match class {
                    CharClass::Space => self.text.bump(),
                    CharClass::Dquote => {
                        self.text.bump();
                        self.begin();
                        self.state = State::HeaderValue(b'"');
                    }
                    CharClass::Squote => {
                        self.text.bump();
                        self.begin();
                        self.state = State::HeaderValue(b'\'');
                    }
                    CharClass::EndOfText => {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated XML header")
                    }
                    _ => return self.unexpected(ch, "before header attribute value"),
                },

                State::HeaderValue(quote) => {
                    if ch == quote as u32 {
                        self.text.bump();
                        self.state = State::HeaderAfterName;
                        return Scan::Event(Event::new(EventKind::HeaderAttribValue, &self.buf));
                    }
                    match class {
                        CharClass::EndOfText => {
                            return self
                                .fail(ScanErrorKind::UnclosedDocument, "unterminated XML header")
                        }
                        _ => {
                            self.out.print(ch, &mut self.buf);
                            self.text.bump();
                        }
                    }
                }

                State::HeaderExpectClose => match class {
                    CharClass::Gt => {
                        self.text.bump();
                        self.state = State::Start;
                        return Scan::Event(Event::new(EventKind::HeaderEnd, b""));
                    }
                    CharClass::EndOfText => {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated XML header")
                    }
                    _ => return self.unexpected(ch, "after '?' in XML header"),
                },

                State::BangFirst => {
                    if ch == '-' as u32 {
                        self.text.bump();
                        self.state = State::CommentStart;
                    } else if ch == '[' as u32 {
                        self.text.bump();
                        self.state = State::CdataOpen(0);
                    } else if class == CharClass::NameStart {
                        self.begin();
                        self.out.print(ch, &mut self.buf);
                        self.text.bump();
                        self.state = State::DocDeclKeyword;
                    } else if class == CharClass::EndOfText {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated declaration");
                    } else {
                        return self.unexpected(ch, "after '<!'");
                    }
                }

                State::CommentStart => {
                    if ch == '-' as u32 {
                        self.text.bump();
                        self.state = State::Comment;
                    } else if class == CharClass::EndOfText {
                        return self.fail(ScanErrorKind::UnclosedDocument, "unterminated comment");
                    } else {
                        return self.unexpected(ch, "after '<!-'");
                    }
                }

                State::Comment => {
                    if ch == '-' as u32 {
                        self.text.bump();
                        self.state = State::CommentDash1;
                    } else if class == CharClass::EndOfText {
                        return self.fail(ScanErrorKind::UnclosedDocument, "unterminated comment");
                    } else {
                        self.text.bump();
                    }
                }

                State::CommentDash1 => {
                    if ch == '-' as u32 {
                        self.text.bump();
                        self.state = State::CommentDash2;
                    } else if class == CharClass::EndOfText {
                        return self.fail(ScanErrorKind::UnclosedDocument, "unterminated comment");
                    } else {
                        self.text.bump();
                        self.state = State::Comment;
                    }
                }

                State::CommentDash2 => match class {
                    CharClass::Gt => {
                        self.text.bump();
                        self.state = State::Start;
                    }
                    CharClass::EndOfText => {
                        return self.fail(ScanErrorKind::UnclosedDocument, "unterminated comment")
                    }
                    _ if ch == '-' as u32 => self.text.bump(),
                    _ => {
                        self.text.bump();
                        self.state = State::Comment;
                    }
                },

                State::CdataOpen(i) => {
                    const OPEN: &[u8; 6] = b"CDATA[";
                    if class == CharClass::EndOfText {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated CDATA section");
                    }
                    if ch == OPEN[i as usize] as u32 {
                        self.text.bump();
                        if i as usize + 1 == OPEN.len() {
                            self.begin();
                            self.state = State::Cdata;
                        } else {
                            self.state = State::CdataOpen(i + 1);
                        }
                    } else {
                        return self.unexpected(ch, "in CDATA opening");
                    }
                }

                State::Cdata => {
                    if ch == ']' as u32 {
                        self.text.bump();
                        self.state = State::CdataBracket1;
                    } else if class == CharClass::EndOfText {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated CDATA section");
                    } else {
                        self.out.print(ch, &mut self.buf);
                        self.text.bump();
                    }
                }

                State::CdataBracket1 => {
                    if ch == ']' as u32 {
                        self.text.bump();
                        self.state = State::CdataBracket2;
                    } else if class == CharClass::EndOfText {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated CDATA section");
                    } else {
                        self.out.print(']' as u32, &mut self.buf);
                        self.out.print(ch, &mut self.buf);
                        self.text.bump();
                        self.state = State::Cdata;
                    }
                }

                State::CdataBracket2 => match class {
                    CharClass::Gt => {
                        self.text.bump();
                        self.state = State::Start;
                        if !self.buf.is_empty() {
                            return Scan::Event(Event::new(EventKind::Content, &self.buf));
                        }
                    }
                    CharClass::EndOfText => {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated CDATA section")
                    }
                    _ if ch == ']' as u32 => {
                        self.out.print(']' as u32, &mut self.buf);
                        self.text.bump();
                    }
                    _ => {
                        self.out.print(']' as u32, &mut self.buf);
                        self.out.print(']' as u32, &mut self.buf);
                        self.out.print(ch, &mut self.buf);
                        self.text.bump();
                        self.state = State::Cdata;
                    }
                },

                State::DocDeclKeyword => match class {
                    c if c.is_name() => {
                        self.out.print(ch, &mut self.buf);
                        self.text.bump();
                    }
                    CharClass::Space => {
                        self.text.bump();
                        self.state = State::DocDecl;
                    }
                    CharClass::Gt => {
                        self.text.bump();
                        self.state = State::Start;
                        return Scan::Event(Event::new(EventKind::DocAttribEnd, b""));
                    }
                    CharClass::EndOfText => {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated declaration")
                    }
                    _ => return self.unexpected(ch, "in declaration keyword"),
                },

                State::DocDecl => match class {
                    CharClass::Space => self.text.bump(),
                    CharClass::Dquote => {
                        self.text.bump();
                        self.begin();
                        self.state = State::DocDeclValue(b'"');
                    }
                    CharClass::Squote => {
                        self.text.bump();
                        self.begin();
                        self.state = State::DocDeclValue(b'\'');
                    }
                    CharClass::Gt => {
                        self.text.bump();
                        self.state = State::Start;
                        return Scan::Event(Event::new(EventKind::DocAttribEnd, b""));
                    }
                    CharClass::EndOfText => {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated declaration")
                    }
                    _ if ch == '[' as u32 => {
                        self.text.bump();
                        self.state = State::DocSubset(1);
                    }
                    _ => {
                        self.begin();
                        self.out.print(ch, &mut self.buf);
                        self.text.bump();
                        self.state = State::DocDeclName;
                    }
                },

                State::DocDeclName => match class {
                    CharClass::Space => {
                        self.text.bump();
                        self.state = State::DocDecl;
                        return Scan::Event(Event::new(EventKind::DocAttribValue, &self.buf));
                    }
                    CharClass::Gt => {
                        self.text.bump();
                        self.state = State::Start;
                        self.pending = Some(EventKind::DocAttribEnd);
                        return Scan::Event(Event::new(EventKind::DocAttribValue, &self.buf));
                    }
                    CharClass::EndOfText => {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated declaration")
                    }
                    _ if ch == '[' as u32 => {
                        self.text.bump();
                        self.state = State::DocSubset(1);
                        return Scan::Event(Event::new(EventKind::DocAttribValue, &self.buf));
                    }
                    _ => {
                        self.out.print(ch, &mut self.buf);
                        self.text.bump();
                    }
                },

                State::DocDeclValue(quote) => {
                    if ch == quote as u32 {
                        self.text.bump();
                        self.state = State::DocDecl;
                        return Scan::Event(Event::new(EventKind::DocAttribValue, &self.buf));
                    }
                    match class {
                        CharClass::EndOfText => {
                            return self
                                .fail(ScanErrorKind::UnclosedDocument, "unterminated declaration")
                        }
                        _ => {
                            self.out.print(ch, &mut self.buf);
                            self.text.bump();
                        }
                    }
                }

                State::DocSubset(depth) => {
                    if ch == '[' as u32 {
                        self.text.bump();
                        self.state = State::DocSubset(depth + 1);
                    } else if ch == ']' as u32 {
                        self.text.bump();
                        self.state = if depth == 1 {
                            State::DocDecl
                        } else {
                            State::DocSubset(depth - 1)
                        };
                    } else if class == CharClass::EndOfText {
                        return self
                            .fail(ScanErrorKind::UnclosedDocument, "unterminated declaration");
                    } else {
                        self.text.bump();
                    }
                }

                State::Entity(from) => match class {
                    CharClass::Semicolon => {
                        self.text.bump();
                        let scalar = if self.ent.first() == Some(&b'#') {
                            decode_charref(&self.ent[1..])
                        } else {
                            self.entities.get(&self.ent)
                        };
                        match scalar {
                            Some(u) => {
                                match from {
                                    EntityFrom::Content => self.push_expanded(u),
                                    EntityFrom::Attrib(_) => self.out.print(u, &mut self.buf),
                                }
                                self.state = match from {
                                    EntityFrom::Content => State::Content,
                                    EntityFrom::Attrib(q) => State::AttribValue(q),
                                };
                            }
                            None => {
                                let name = String::from_utf8_lossy(&self.ent).into_owned();
                                return self.fail(
                                    ScanErrorKind::UnknownEntity,
                                    format!("unknown entity reference &{};", name),
                                );
                            }
                        }
                    }
                    c if c.is_name() || ch == '#' as u32 => {
                        if ch < 128 {
                            self.ent.push(ch as u8);
                            self.text.bump();
                        } else {
                            return self.unexpected(ch, "in entity reference");
                        }
                    }
                    CharClass::EndOfText => {
                        return self.fail(
                            ScanErrorKind::UnclosedDocument,
                            "unterminated entity reference",
                        )
                    }
                    _ => return self.unexpected(ch, "in entity reference"),
                },
            }
        }
    }

    /// Start accumulating a new token
    fn begin(&mut self) {
        self.buf.clear();
        self.pending_ws = false;
    }

    /// Append a content character, honoring tokenize mode
    fn push_content(&mut self, ch: u32) {
        if self.do_tokenize {
            if matches!(ch, 0x20 | 0x9 | 0xA | 0xD) {
                self.pending_ws = true;
                return;
            }
            if self.pending_ws && !self.buf.is_empty() {
                self.out.print(0x20, &mut self.buf);
            }
            self.pending_ws = false;
        }
        self.out.print(ch, &mut self.buf);
    }

    /// Append an expanded entity substitution to content
    fn push_expanded(&mut self, scalar: u32) {
        if self.do_tokenize && self.pending_ws && !self.buf.is_empty() {
            self.out.print(0x20, &mut self.buf);
        }
        self.pending_ws = false;
        self.out.print(scalar, &mut self.buf);
    }

    /// Verify the accumulated close-tag name against the stack top
    fn close_check(&mut self) -> Scan<'_> {
        let matches = self.stack.top().is_some_and(|top| top == self.buf);
        if matches {
            self.stack.pop();
            self.state = State::Start;
            return Scan::Event(Event::new(EventKind::CloseTag, &self.buf));
        }
        let name = String::from_utf8_lossy(&self.buf).into_owned();
        self.fail(
            ScanErrorKind::TagMismatch,
            format!("close tag </{}> does not match open element", name),
        )
    }

    /// Enter the terminal error state and emit `ErrorOccurred`
    fn fail(&mut self, kind: ScanErrorKind, message: impl Into<String>) -> Scan<'_> {
        let err = self.error.insert(ScanError::new(kind, message));
        tracing::debug!(kind = err.kind().name(), message = err.message(), "scan error");
        Scan::Event(Event::new(
            EventKind::ErrorOccurred,
            err.message().as_bytes(),
        ))
    }

    fn unexpected(&mut self, ch: u32, context: &str) -> Scan<'_> {
        let printable = char::from_u32(ch).unwrap_or('\u{FFFD}');
        self.fail(
            ScanErrorKind::UnexpectedCharacter,
            format!("unexpected character {:?} {}", printable, context),
        )
    }
}
