//! Scanner event types
//!
//! One advance of the scanner yields one event. Event content borrows the
//! scanner's rolling buffer, so it is valid until the next advance; callers
//! that need to retain it copy it out.

/// Kind of an XML scanner event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Placeholder; never produced by an advance
    None,
    /// Terminal failure; content carries a human-readable message
    ErrorOccurred,
    /// `<?xml` seen; content is the header target name
    HeaderStart,
    /// Attribute name inside the XML header
    HeaderAttribName,
    /// Attribute value inside the XML header
    HeaderAttribValue,
    /// `?>` closed the header
    HeaderEnd,
    /// Item of a `<!` document declaration
    DocAttribValue,
    /// `>` closed a document declaration
    DocAttribEnd,
    /// Attribute name inside a start tag
    TagAttribName,
    /// Attribute value inside a start tag
    TagAttribValue,
    /// Start tag; content is the element name
    OpenTag,
    /// Explicit end tag; content is the element name
    CloseTag,
    /// Immediate close of a self-closing element
    CloseTagIm,
    /// Character data, entity references expanded
    Content,
    /// Regular end of the document; repeated advances re-emit it
    Exit,
}

impl EventKind {
    /// Human-readable label
    pub fn name(self) -> &'static str {
        match self {
            EventKind::None => "None",
            EventKind::ErrorOccurred => "ErrorOccurred",
            EventKind::HeaderStart => "HeaderStart",
            EventKind::HeaderAttribName => "HeaderAttribName",
            EventKind::HeaderAttribValue => "HeaderAttribValue",
            EventKind::HeaderEnd => "HeaderEnd",
            EventKind::DocAttribValue => "DocAttribValue",
            EventKind::DocAttribEnd => "DocAttribEnd",
            EventKind::TagAttribName => "TagAttribName",
            EventKind::TagAttribValue => "TagAttribValue",
            EventKind::OpenTag => "OpenTag",
            EventKind::CloseTag => "CloseTag",
            EventKind::CloseTagIm => "CloseTagIm",
            EventKind::Content => "Content",
            EventKind::Exit => "Exit",
        }
    }
}

/// One scanner event
///
/// `content` is in the scanner's output character set (UTF-8 unless
/// configured otherwise) and borrows the scanner's internal buffer.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    kind: EventKind,
    content: &'a [u8],
}

impl<'a> Event<'a> {
    pub(crate) fn new(kind: EventKind, content: &'a [u8]) -> Self {
        Event { kind, content }
    }

    #[inline]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    #[inline]
    pub fn content(&self) -> &'a [u8] {
        self.content
    }

    /// Label of the event kind
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Result of one scanner advance
#[derive(Debug)]
pub enum Scan<'a> {
    /// The next event in document order
    Event(Event<'a>),
    /// The byte source is pending; refill it and advance again
    NeedMore,
}
