//! Path selection runtime
//!
//! Consumes scanner events and advances activation records over a shared
//! [`PathAutomaton`]. When an event satisfies a terminal node, the node's
//! type tags are emitted together with a copy of the event content.
//!
//! Matches produced by one push stay available until the next push; draining
//! them is non-destructive within that window.

use crate::path::automaton::{Filter, NodeId, PathAutomaton};
use crate::scan::event::{Event, EventKind};

/// One emitted path match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// The type tag assigned to the matched terminal
    pub type_tag: u32,
    /// Copy of the event content that completed the match
    pub content: Vec<u8>,
    seq: u32,
}

/// An active automaton position: children of `node` are matched against
/// events arriving below the element opened at `depth`
#[derive(Debug)]
struct Scope {
    node: NodeId,
    depth: usize,
    /// Per-child sibling-match counters, parallel to the node's child list
    counts: Vec<u32>,
}

/// A child awaiting the attribute value that follows its attribute name
#[derive(Debug)]
enum PendingAttr {
    /// Attribute-select node: emit its tags with the value
    Select(NodeId),
    /// Gate node: activate it if the value matches
    Gate(NodeId, Option<Vec<u8>>),
}

/// Runtime state advancing over one event stream
pub struct PathSelect<'a> {
    atm: &'a PathAutomaton,
    depth: usize,
    scopes: Vec<Scope>,
    pending_attr: Vec<PendingAttr>,
    matches: Vec<Match>,
}

impl<'a> PathSelect<'a> {
    /// New runtime sharing an immutable automaton
    pub fn new(atm: &'a PathAutomaton) -> Self {
        let root_counts = vec![0; atm.node(0).children.len()];
        PathSelect {
            atm,
            depth: 0,
            scopes: vec![Scope {
                node: 0,
                depth: 0,
                counts: root_counts,
            }],
            pending_attr: Vec::new(),
            matches: Vec::new(),
        }
    }

    /// Feed one scanner event
    ///
    /// Clears any undrained matches from the previous push, then records the
    /// matches this event produces; drain them with [`matches`].
    ///
    /// [`matches`]: PathSelect::matches
    pub fn push(&mut self, ev: &Event<'_>) {
        self.matches.clear();
        match ev.kind() {
            EventKind::OpenTag => self.on_open(ev.content()),
            EventKind::TagAttribName => self.on_attrib_name(ev.content()),
            EventKind::TagAttribValue => self.on_attrib_value(ev.content()),
            EventKind::Content => self.on_content(ev.content()),
            EventKind::CloseTag | EventKind::CloseTagIm => self.on_close(),
            // Header, document declaration, error and exit events carry no
            // structure the automaton matches on.
            _ => {}
        }
        self.matches.sort_by_key(|m| m.seq);
    }

    /// Matches produced by the most recent push, in stable assignment order
    pub fn matches(&self) -> std::slice::Iter<'_, Match> {
        self.matches.iter()
    }

    fn on_open(&mut self, name: &[u8]) {
        let atm = self.atm;
        self.depth += 1;
        self.pending_attr.clear();

        // First pass: advance sibling counters and gather in-range children.
        // A direct child matches one level below its scope; a follow child
        // matches at any depth below it.
        let mut candidates: Vec<NodeId> = Vec::new();
        for scope in &mut self.scopes {
            if scope.depth >= self.depth {
                continue;
            }
            let direct = scope.depth + 1 == self.depth;
            let node = atm.node(scope.node);
            for (ci, &child) in node.children.iter().enumerate() {
                let child_node = atm.node(child);
                if !direct && !child_node.follow {
                    continue;
                }
                let matched = matches!(
                    child_node.filter,
                    Some(Filter::Tag(ref t)) if t == name
                );
                if !matched {
                    continue;
                }
                let index = scope.counts[ci];
                scope.counts[ci] += 1;
                if child_node.in_range(index) {
                    candidates.push(child);
                }
            }
        }

        // Second pass: activate, suppressing duplicates by (node, depth).
        for child in candidates {
            let exists = self
                .scopes
                .iter()
                .any(|s| s.node == child && s.depth == self.depth);
            if exists {
                continue;
            }
            let child_node = atm.node(child);
            self.scopes.push(Scope {
                node: child,
                depth: self.depth,
                counts: vec![0; child_node.children.len()],
            });
            for &(tag, seq) in &child_node.assigned {
                self.matches.push(Match {
                    type_tag: tag,
                    content: name.to_vec(),
                    seq,
                });
            }
        }
    }

    fn on_attrib_name(&mut self, name: &[u8]) {
        let atm = self.atm;
        self.pending_attr.clear();
        for scope in &self.scopes {
            if scope.depth > self.depth {
                continue;
            }
            let direct = scope.depth == self.depth;
            for &child in &atm.node(scope.node).children {
                let child_node = atm.node(child);
                match child_node.filter {
                    Some(Filter::Attr(ref n)) if n == name => {
                        if direct || child_node.follow {
                            self.pending_attr.push(PendingAttr::Select(child));
                        }
                    }
                    Some(Filter::IfAttr {
                        name: ref n,
                        ref value,
                    }) if n == name => {
                        if direct || child_node.follow {
                            self.pending_attr
                                .push(PendingAttr::Gate(child, value.clone()));
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn on_attrib_value(&mut self, value: &[u8]) {
        let atm = self.atm;
        let pending = std::mem::take(&mut self.pending_attr);
        for p in pending {
            match p {
                PendingAttr::Select(node) => {
                    for &(tag, seq) in &atm.node(node).assigned {
                        self.matches.push(Match {
                            type_tag: tag,
                            content: value.to_vec(),
                            seq,
                        });
                    }
                }
                PendingAttr::Gate(node, expected) => {
                    let satisfied = expected.as_deref().map_or(true, |e| e == value);
                    if !satisfied {
                        continue;
                    }
                    for &(tag, seq) in &atm.node(node).assigned {
                        self.matches.push(Match {
                            type_tag: tag,
                            content: value.to_vec(),
                            seq,
                        });
                    }
                    let exists = self
                        .scopes
                        .iter()
                        .any(|s| s.node == node && s.depth == self.depth);
                    if !exists {
                        self.scopes.push(Scope {
                            node,
                            depth: self.depth,
                            counts: vec![0; atm.node(node).children.len()],
                        });
                    }
                }
            }
        }
    }

    fn on_content(&mut self, text: &[u8]) {
        let atm = self.atm;
        for scope in &self.scopes {
            if scope.depth > self.depth {
                continue;
            }
            let direct = scope.depth == self.depth;
            for &child in &atm.node(scope.node).children {
                let child_node = atm.node(child);
                if child_node.filter != Some(Filter::Content) {
                    continue;
                }
                if !direct && !child_node.follow {
                    continue;
                }
                for &(tag, seq) in &child_node.assigned {
                    self.matches.push(Match {
                        type_tag: tag,
                        content: text.to_vec(),
                        seq,
                    });
                }
            }
        }
    }

    fn on_close(&mut self) {
        self.pending_attr.clear();
        let closing = self.depth;
        self.scopes.retain(|s| s.depth != closing || s.node == 0);
        self.depth = self.depth.saturating_sub(1);
    }
}
