//! Path automaton
//!
//! Compiles a set of path expressions into an arena of nodes connected by
//! refinement edges. The automaton is built once through the chainable
//! [`PathBuilder`] (or the textual syntax in [`crate::path::expr`]) and is
//! immutable afterwards; any number of runtime selectors may share it by
//! reference.

/// Index of a node in the automaton arena
pub type NodeId = usize;

/// What a node matches on
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Filter {
    /// Element with this name
    Tag(Vec<u8>),
    /// Attribute with this name; the match value is the attribute value
    Attr(Vec<u8>),
    /// Gate on an attribute's presence (value `None`) or exact value
    IfAttr {
        name: Vec<u8>,
        value: Option<Vec<u8>>,
    },
    /// Character data of the current element
    Content,
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    /// `None` only for the synthetic root
    pub(crate) filter: Option<Filter>,
    /// Half-open sibling index range `[from, to)`; `to == None` is unbounded
    pub(crate) from: u32,
    pub(crate) to: Option<u32>,
    /// Descendant axis: children match at any depth below this node
    pub(crate) follow: bool,
    /// Assigned type tags with their registration order
    pub(crate) assigned: Vec<(u32, u32)>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    fn new(filter: Option<Filter>, follow: bool) -> Self {
        Node {
            filter,
            from: 0,
            to: None,
            follow,
            assigned: Vec::new(),
            children: Vec::new(),
        }
    }

    /// True if `index` falls inside the sibling range
    pub(crate) fn in_range(&self, index: u32) -> bool {
        index >= self.from && self.to.map_or(true, |to| index < to)
    }
}

/// Compiled set of path expressions
#[derive(Debug, Default)]
pub struct PathAutomaton {
    pub(crate) nodes: Vec<Node>,
    assign_seq: u32,
}

impl PathAutomaton {
    /// Automaton with only the synthetic root
    pub fn new() -> Self {
        PathAutomaton {
            nodes: vec![Node::new(None, false)],
            assign_seq: 0,
        }
    }

    /// Begin a refinement chain at the document root
    pub fn root(&mut self) -> PathBuilder<'_> {
        PathBuilder {
            atm: self,
            node: 0,
            follow_next: false,
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Total number of nodes, including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Find an existing child with this filter and axis or create a new one
    fn refine(&mut self, parent: NodeId, filter: Filter, follow: bool) -> NodeId {
        if let Some(&existing) = self.nodes[parent].children.iter().find(|&&c| {
            self.nodes[c].filter.as_ref() == Some(&filter) && self.nodes[c].follow == follow
        }) {
            return existing;
        }
        let id = self.nodes.len();
        self.nodes.push(Node::new(Some(filter), follow));
        self.nodes[parent].children.push(id);
        id
    }

    fn assign(&mut self, node: NodeId, type_tag: u32) {
        if self.nodes[node].assigned.iter().any(|&(t, _)| t == type_tag) {
            return;
        }
        let seq = self.assign_seq;
        self.assign_seq += 1;
        self.nodes[node].assigned.push((type_tag, seq));
        tracing::debug!(node, type_tag, seq, "assigned terminal type tag");
    }
}

/// Chainable refinement cursor over a [`PathAutomaton`]
///
/// Each refinement descends to (or creates) a child node and returns a new
/// builder positioned there. `from`/`to` modify the current node in place;
/// `follow` marks the next refinement as a descendant-axis step; `assign`
/// marks the current node terminal.
pub struct PathBuilder<'a> {
    atm: &'a mut PathAutomaton,
    node: NodeId,
    follow_next: bool,
}

impl<'a> PathBuilder<'a> {
    fn descend(self, filter: Filter) -> PathBuilder<'a> {
        let node = self.atm.refine(self.node, filter, self.follow_next);
        PathBuilder {
            atm: self.atm,
            node,
            follow_next: false,
        }
    }

    /// Descend on an element with this name
    pub fn child(self, name: &str) -> PathBuilder<'a> {
        self.descend(Filter::Tag(name.as_bytes().to_vec()))
    }

    /// Match an attribute and select its value
    pub fn attr(self, name: &str) -> PathBuilder<'a> {
        self.descend(Filter::Attr(name.as_bytes().to_vec()))
    }

    /// Gate on an attribute's presence or exact value without selecting it
    pub fn if_attr(self, name: &str, value: Option<&str>) -> PathBuilder<'a> {
        self.descend(Filter::IfAttr {
            name: name.as_bytes().to_vec(),
            value: value.map(|v| v.as_bytes().to_vec()),
        })
    }

    /// Select the character data of the current element
    pub fn content(self) -> PathBuilder<'a> {
        self.descend(Filter::Content)
    }

    /// Restrict the sibling index range to start at `i` (inclusive)
    pub fn from(self, i: u32) -> PathBuilder<'a> {
        self.atm.nodes[self.node].from = i;
        self
    }

    /// Restrict the sibling index range to end at `j` (exclusive)
    pub fn to(self, j: u32) -> PathBuilder<'a> {
        self.atm.nodes[self.node].to = Some(j);
        self
    }

    /// Descendant axis for the next refinement: the step matches at any
    /// depth below the current node instead of directly underneath it
    pub fn follow(mut self) -> PathBuilder<'a> {
        self.follow_next = true;
        self
    }

    /// Mark the current node terminal with a type tag
    pub fn assign(self, type_tag: u32) {
        self.atm.assign(self.node, type_tag);
    }
}
