//! xmlsift - streaming XML extraction
//!
//! Tokenizes well-formed XML without buffering more than the current token
//! and evaluates a fixed set of path expressions against the event stream.
//! Queries are compiled ahead of time; the document is never materialized.
//!
//! The pieces:
//! - [`XmlScanner`]: pull-style lexer producing typed events over any
//!   [`ByteSource`], with pluggable input/output character sets
//! - [`PathAutomaton`] + [`PathSelect`]: compile path expressions once,
//!   feed scanner events in, drain integer-tagged matches out
//! - [`XmlPrinter`]: the serialization counterpart, sharing the escaping
//!   and character-set discipline
//!
//! # Example
//!
//! ```
//! use xmlsift::{PathAutomaton, PathSelect, Scan, SliceSource, XmlScanner};
//!
//! let mut atm = PathAutomaton::new();
//! atm.root().child("address").attr("name").assign(1);
//! atm.add_expr("/address/@street", 2).unwrap();
//!
//! let mut scanner = XmlScanner::new(SliceSource::new(
//!     br#"<address name="doe" street="main"/>"#,
//! ));
//! let mut select = PathSelect::new(&atm);
//!
//! let mut found = Vec::new();
//! while let Scan::Event(ev) = scanner.next_event() {
//!     select.push(&ev);
//!     found.extend(select.matches().map(|m| (m.type_tag, m.content.clone())));
//!     if ev.kind() == xmlsift::EventKind::Exit {
//!         break;
//!     }
//! }
//! assert_eq!(found, vec![(1, b"doe".to_vec()), (2, b"main".to_vec())]);
//! ```

mod error;

pub mod core;
pub mod path;
pub mod print;
pub mod scan;

pub use crate::core::charset::{Charset, IsoPage, LATIN1};
pub use crate::core::entities::EntityMap;
pub use crate::core::source::{ByteSource, ChunkedSource, Fetch, SliceSource};
pub use crate::error::{Error, ScanError, ScanErrorKind};
pub use crate::path::automaton::{NodeId, PathAutomaton, PathBuilder};
pub use crate::path::select::{Match, PathSelect};
pub use crate::print::printer::XmlPrinter;
pub use crate::scan::event::{Event, EventKind, Scan};
pub use crate::scan::scanner::XmlScanner;
pub use crate::scan::tagstack::TagStack;
