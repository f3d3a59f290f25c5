//! Compact textual path syntax
//!
//! A small alternative to chaining [`PathBuilder`] calls by hand:
//!
//! ```text
//! /r/i[1]/@id          second <i> under <r>, select the id attribute
//! //b                  every <b> at any depth
//! /a/b/text()          character data of /a/b
//! /r/i[@kind='x']/text()   gated on an attribute value
//! /r/i[1..3]           sibling index range [1, 3)
//! ```
//!
//! Parsed expressions are kept in a global LRU cache keyed by source text,
//! so registering the same expression on many automatons re-parses nothing.
//!
//! [`PathBuilder`]: crate::path::automaton::PathBuilder

use crate::error::Error;
use crate::path::automaton::PathAutomaton;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// Global LRU cache of parsed path expressions
static EXPR_CACHE: Mutex<Option<LruCache<String, Arc<Vec<Step>>>>> = Mutex::new(None);

/// Cache capacity - ahead-of-time query sets are small
const CACHE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
enum StepKind {
    Tag(String),
    Attr(String),
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    kind: StepKind,
    follow: bool,
    gates: Vec<(String, Option<String>)>,
    range: Option<(u32, Option<u32>)>,
}

impl PathAutomaton {
    /// Register a textual path expression with an assigned type tag
    pub fn add_expr(&mut self, expr: &str, type_tag: u32) -> Result<(), Error> {
        let steps = parse_cached(expr)?;
        apply(self, &steps, type_tag);
        tracing::debug!(expr, type_tag, "registered path expression");
        Ok(())
    }
}

fn parse_cached(expr: &str) -> Result<Arc<Vec<Step>>, Error> {
    let Ok(mut guard) = EXPR_CACHE.lock() else {
        return parse(expr).map(Arc::new);
    };
    let cache = guard.get_or_insert_with(|| {
        LruCache::new(NonZeroUsize::new(CACHE_CAPACITY).expect("nonzero capacity"))
    });
    if let Some(steps) = cache.get(expr) {
        return Ok(Arc::clone(steps));
    }
    let steps = Arc::new(parse(expr)?);
    cache.put(expr.to_string(), Arc::clone(&steps));
    Ok(steps)
}

fn apply(atm: &mut PathAutomaton, steps: &[Step], type_tag: u32) {
    let mut builder = atm.root();
    for step in steps {
        if step.follow {
            builder = builder.follow();
        }
        match &step.kind {
            StepKind::Tag(name) => {
                builder = builder.child(name);
                if let Some((from, to)) = step.range {
                    builder = builder.from(from);
                    if let Some(to) = to {
                        builder = builder.to(to);
                    }
                }
                for (name, value) in &step.gates {
                    builder = builder.if_attr(name, value.as_deref());
                }
            }
            StepKind::Attr(name) => {
                builder = builder.attr(name);
            }
            StepKind::Content => {
                builder = builder.content();
            }
        }
    }
    builder.assign(type_tag);
}

fn err(expr: &str, reason: &'static str) -> Error {
    Error::PathSyntax {
        expr: expr.to_string(),
        reason,
    }
}

fn parse(expr: &str) -> Result<Vec<Step>, Error> {
    let b = expr.as_bytes();
    let mut pos = 0;
    let mut steps: Vec<Step> = Vec::new();

    if b.first() != Some(&b'/') {
        return Err(err(expr, "expression must start with '/'"));
    }

    while pos < b.len() {
        if b[pos] != b'/' {
            return Err(err(expr, "expected '/' between steps"));
        }
        pos += 1;
        let follow = if b.get(pos) == Some(&b'/') {
            pos += 1;
            true
        } else {
            false
        };
        if pos >= b.len() {
            return Err(err(expr, "expected a step after '/'"));
        }

        if b[pos] == b'@' {
            pos += 1;
            let name = read_name(b, &mut pos);
            if name.is_empty() {
                return Err(err(expr, "expected attribute name after '@'"));
            }
            steps.push(Step {
                kind: StepKind::Attr(name),
                follow,
                gates: Vec::new(),
                range: None,
            });
        } else if b[pos..].starts_with(b"text()") {
            pos += 6;
            steps.push(Step {
                kind: StepKind::Content,
                follow,
                gates: Vec::new(),
                range: None,
            });
        } else {
            let name = read_name(b, &mut pos);
            if name.is_empty() {
                return Err(err(expr, "expected element name"));
            }
            let mut step = Step {
                kind: StepKind::Tag(name),
                follow,
                gates: Vec::new(),
                range: None,
            };
            while b.get(pos) == Some(&b'[') {
                pos += 1;
                if b.get(pos) == Some(&b'@') {
                    pos += 1;
                    let name = read_name(b, &mut pos);
                    if name.is_empty() {
                        return Err(err(expr, "expected attribute name in predicate"));
                    }
                    let value = if b.get(pos) == Some(&b'=') {
                        pos += 1;
                        if b.get(pos) != Some(&b'\'') {
                            return Err(err(expr, "expected quoted value in predicate"));
                        }
                        pos += 1;
                        let start = pos;
                        while pos < b.len() && b[pos] != b'\'' {
                            pos += 1;
                        }
                        if pos >= b.len() {
                            return Err(err(expr, "unterminated value in predicate"));
                        }
                        let value = String::from_utf8_lossy(&b[start..pos]).into_owned();
                        pos += 1;
                        Some(value)
                    } else {
                        None
                    };
                    if b.get(pos) != Some(&b']') {
                        return Err(err(expr, "expected ']' after predicate"));
                    }
                    pos += 1;
                    step.gates.push((name, value));
                } else {
                    let from = read_number(b, &mut pos)
                        .ok_or_else(|| err(expr, "expected index in predicate"))?;
                    let to = if b[pos..].starts_with(b"..") {
                        pos += 2;
                        read_number(b, &mut pos)
                    } else {
                        Some(from + 1)
                    };
                    if b.get(pos) != Some(&b']') {
                        return Err(err(expr, "expected ']' after index"));
                    }
                    pos += 1;
                    if step.range.is_some() {
                        return Err(err(expr, "duplicate index predicate"));
                    }
                    step.range = Some((from, to));
                }
            }
            steps.push(step);
        }
    }

    if steps.is_empty() {
        return Err(err(expr, "empty expression"));
    }
    for (i, step) in steps.iter().enumerate() {
        if i + 1 < steps.len() && !matches!(step.kind, StepKind::Tag(_)) {
            return Err(err(expr, "attribute and text() steps must be final"));
        }
    }
    Ok(steps)
}

fn read_name(b: &[u8], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < b.len()
        && matches!(b[*pos], b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':')
    {
        *pos += 1;
    }
    String::from_utf8_lossy(&b[start..*pos]).into_owned()
}

fn read_number(b: &[u8], pos: &mut usize) -> Option<u32> {
    let start = *pos;
    while *pos < b.len() && b[*pos].is_ascii_digit() {
        *pos += 1;
    }
    if *pos == start {
        return None;
    }
    std::str::from_utf8(&b[start..*pos]).ok()?.parse().ok()
}
