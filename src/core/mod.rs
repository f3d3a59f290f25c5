//! Input primitives
//!
//! This module contains the building blocks underneath the XML scanner:
//! - Source: pull-style byte-source contract with chunked suspension
//! - Charset: character-set codecs as a tagged variant set
//! - TextScan: Unicode-scalar cursor with lexical classification
//! - Entities: immutable entity map and character-reference decoding

pub mod charset;
pub mod entities;
pub mod source;
pub mod textscan;
