//! Ordered tree with lazy, composable traversal queries.
//!
//! A [`Tree`] materializes a hierarchy of items once, in pre-order, into an
//! arena of [`Node`]s linked by [`NodeId`]. Slot 0 is a synthetic root whose
//! children are the top-level items, so every real node has a parent.
//!
//! A [`Query`] is an immutable view over a tree: a starting point and
//! direction, a chain of windowing/filtering steps and an optional
//! next-node resolver. Nothing is walked until the query is iterated, and
//! every iteration re-runs the whole chain.
//!
//! ```
//! use codebuilder::tree::Tree;
//!
//! let tree = Tree::from_roots(vec!["a", "b", "c"]);
//! let items: Vec<_> = tree.query().skip(1).items();
//! assert_eq!(items, vec![&"b", &"c"]);
//! ```

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::rc::Rc;

/// Arena slot of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Node<T> {
    pub id: NodeId,
    /// `None` only for the synthetic root
    pub item: Option<T>,
    pub parent: Option<NodeId>,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// 0 for top-level items
    pub depth: usize,
    /// Position among siblings
    pub index: usize,
}

impl<T> Node<T> {
    fn root() -> Self {
        Node {
            id: NodeId::ROOT,
            item: None,
            parent: None,
            prev: None,
            next: None,
            children: Vec::new(),
            depth: 0,
            index: 0,
        }
    }

    pub fn item(&self) -> Option<&T> {
        self.item.as_ref()
    }

    /// Pre-order position among all real nodes; `None` for the root.
    pub fn root_index(&self) -> Option<usize> {
        self.id.0.checked_sub(1)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn first_child(&self) -> Option<NodeId> {
        self.children.first().copied()
    }

    pub fn last_child(&self) -> Option<NodeId> {
        self.children.last().copied()
    }

    pub fn is_first_child(&self) -> bool {
        self.prev.is_none()
    }

    pub fn is_last_child(&self) -> bool {
        self.next.is_none()
    }
}

/// Materialized hierarchy of `T`.
///
/// Items are looked up by value; when the same item appears twice the
/// later node wins.
#[derive(Debug, Clone)]
pub struct Tree<T> {
    nodes: Vec<Node<T>>,
    lookup: HashMap<T, NodeId>,
}

impl<T: Clone + Eq + Hash> Tree<T> {
    /// A flat tree: every item is top-level.
    pub fn from_roots(items: Vec<T>) -> Self {
        Self::build(items, |_| None)
    }

    /// Builds the tree depth-first, asking `children` for each item's
    /// children.
    pub fn build<F>(items: Vec<T>, children: F) -> Self
    where
        F: Fn(&T) -> Option<Vec<T>>,
    {
        let mut tree = Tree {
            nodes: vec![Node::root()],
            lookup: HashMap::new(),
        };
        tree.attach(NodeId::ROOT, items, 0, &children);
        tree
    }

    fn attach<F>(&mut self, parent: NodeId, items: Vec<T>, depth: usize, children: &F)
    where
        F: Fn(&T) -> Option<Vec<T>>,
    {
        let mut prev: Option<NodeId> = None;
        for (index, item) in items.into_iter().enumerate() {
            let id = NodeId(self.nodes.len());
            let child_items = children(&item);
            self.lookup.insert(item.clone(), id);
            self.nodes.push(Node {
                id,
                item: Some(item),
                parent: Some(parent),
                prev,
                next: None,
                children: Vec::new(),
                depth,
                index,
            });
            if let Some(prev) = prev {
                self.nodes[prev.0].next = Some(id);
            }
            self.nodes[parent.0].children.push(id);
            if let Some(child_items) = child_items {
                self.attach(id, child_items, depth + 1, children);
            }
            prev = Some(id);
        }
    }

    /// A forward query over the whole tree.
    pub fn query(&self) -> Query<'_, T> {
        Query::new(self, Origin::forward(None, false))
    }

    pub fn find_node(&self, item: &T) -> Option<&Node<T>> {
        self.lookup.get(item).map(|&id| self.node(id))
    }
}

impl<T> Tree<T> {
    pub fn root(&self) -> &Node<T> {
        &self.nodes[0]
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this tree.
    pub fn node(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node<T>> {
        self.nodes.get(id.0)
    }

    /// Number of real nodes (the synthetic root excluded).
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parent chain, nearest first, ending at the synthetic root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = &Node<T>> + '_ {
        std::iter::successors(self.node(id).parent, |&p| self.node(p).parent).map(|p| self.node(p))
    }

    pub fn get_root(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().map(|n| n.id).unwrap_or(id)
    }

    /// Deepest last descendant, or `id` itself when it has no children.
    pub fn last_descendant(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(last) = self.node(current).last_child() {
            current = last;
        }
        current
    }

    /// Next sibling of the nearest ancestor that has one, or the root when
    /// the chain runs out.
    pub fn ancestor_forward(&self, id: NodeId) -> Option<NodeId> {
        for ancestor in self.ancestors(id) {
            if let Some(next) = ancestor.next {
                return Some(next);
            }
            if ancestor.is_root() {
                return Some(ancestor.id);
            }
        }
        None
    }

    /// Pre-order successor. Without `wrap` the walk ends instead of
    /// returning to the root.
    pub fn forward_node(&self, id: NodeId, wrap: bool) -> Option<NodeId> {
        let node = self.node(id);
        let next = node
            .first_child()
            .or(node.next)
            .or_else(|| self.ancestor_forward(id))
            .filter(|&next| wrap || !self.node(next).is_root());
        next.filter(|&next| next != id)
    }

    /// Pre-order predecessor. With `wrap`, stepping back past the root
    /// continues from the root's last descendant.
    pub fn reverse_node(&self, id: NodeId, wrap: bool) -> Option<NodeId> {
        let node = self.node(id);
        let mut next = match node.prev {
            Some(prev) => Some(self.last_descendant(prev)),
            None => node.parent,
        };
        if next.is_none() && wrap {
            next = Some(self.last_descendant(self.get_root(id)));
        }
        next.filter(|&next| next != id)
    }
}

type NodeFilter<'t, T> = Rc<dyn Fn(&Node<T>) -> bool + 't>;

/// Replaces the default next node at each traversal step.
pub type Resolver<'t, T> = Rc<dyn Fn(&Node<T>, Option<NodeId>) -> Option<NodeId> + 't>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Copy)]
struct Origin {
    direction: Direction,
    from: Option<NodeId>,
    wrap: bool,
}

impl Origin {
    fn forward(from: Option<NodeId>, wrap: bool) -> Self {
        Origin {
            direction: Direction::Forward,
            from,
            wrap,
        }
    }

    fn reverse(from: Option<NodeId>, wrap: bool) -> Self {
        Origin {
            direction: Direction::Reverse,
            from,
            wrap,
        }
    }
}

enum Step<'t, T> {
    Skip(usize),
    Take(usize),
    Where(NodeFilter<'t, T>),
    HasDescendant {
        filter: NodeFilter<'t, T>,
        exclude_match: bool,
    },
}

impl<T> Clone for Step<'_, T> {
    fn clone(&self) -> Self {
        match self {
            Step::Skip(n) => Step::Skip(*n),
            Step::Take(n) => Step::Take(*n),
            Step::Where(filter) => Step::Where(Rc::clone(filter)),
            Step::HasDescendant {
                filter,
                exclude_match,
            } => Step::HasDescendant {
                filter: Rc::clone(filter),
                exclude_match: *exclude_match,
            },
        }
    }
}

/// Lazy view over a [`Tree`].
pub struct Query<'t, T> {
    tree: &'t Tree<T>,
    origin: Origin,
    steps: Vec<Step<'t, T>>,
    resolver: Option<Resolver<'t, T>>,
}

impl<T> Clone for Query<'_, T> {
    fn clone(&self) -> Self {
        Query {
            tree: self.tree,
            origin: self.origin,
            steps: self.steps.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

impl<'t, T: Clone + Eq + Hash> Query<'t, T> {
    fn new(tree: &'t Tree<T>, origin: Origin) -> Self {
        Query {
            tree,
            origin,
            steps: Vec::new(),
            resolver: None,
        }
    }

    pub fn tree(&self) -> &'t Tree<T> {
        self.tree
    }

    fn then(&self, step: Step<'t, T>) -> Self {
        let mut query = self.clone();
        query.steps.push(step);
        query
    }

    fn restart(&self, origin: Origin) -> Self {
        Query {
            tree: self.tree,
            origin,
            steps: Vec::new(),
            resolver: self.resolver.clone(),
        }
    }

    pub fn skip(&self, count: usize) -> Self {
        self.then(Step::Skip(count))
    }

    pub fn take(&self, count: usize) -> Self {
        self.then(Step::Take(count))
    }

    pub fn where_node<F>(&self, filter: F) -> Self
    where
        F: Fn(&Node<T>) -> bool + 't,
    {
        self.then(Step::Where(Rc::new(filter)))
    }

    pub fn where_item<F>(&self, filter: F) -> Self
    where
        F: Fn(&T) -> bool + 't,
    {
        self.where_node(move |node| node.item().is_some_and(&filter))
    }

    /// Keeps nodes whose item matches `filter` or that have a matching
    /// descendant.
    pub fn has_descendant<F>(&self, filter: F, exclude_match: bool) -> Self
    where
        F: Fn(&T) -> bool + 't,
    {
        self.has_descendant_node(move |node| node.item().is_some_and(&filter), exclude_match)
    }

    /// Node-level [`has_descendant`](Self::has_descendant).
    ///
    /// Ancestry is collected from a reverse walk over the whole tree, not
    /// over the steps chained so far; only the resolver carries over.
    pub fn has_descendant_node<F>(&self, filter: F, exclude_match: bool) -> Self
    where
        F: Fn(&Node<T>) -> bool + 't,
    {
        self.then(Step::HasDescendant {
            filter: Rc::new(filter),
            exclude_match,
        })
    }

    /// Reverse pre-order from `from` (or the last node).
    pub fn ascend(&self, from: Option<&T>, wrap: bool) -> Self {
        let from = from.and_then(|item| self.tree.find_node(item)).map(|n| n.id);
        self.restart(Origin::reverse(from, wrap))
    }

    /// Forward pre-order from `from` (or the first node).
    pub fn descend(&self, from: Option<&T>, wrap: bool) -> Self {
        let from = from.and_then(|item| self.tree.find_node(item)).map(|n| n.id);
        self.restart(Origin::forward(from, wrap))
    }

    /// Installs `resolver`, consulted on every step in either direction with
    /// the current node and the default next node.
    pub fn provide_next<F>(&self, resolver: F) -> Self
    where
        F: Fn(&Node<T>, Option<NodeId>) -> Option<NodeId> + 't,
    {
        let mut query = self.clone();
        query.resolver = Some(Rc::new(resolver));
        query
    }

    fn walk(&self) -> Walk<'_, 't, T> {
        let start = match (self.origin.from, self.origin.direction) {
            (Some(from), _) => from,
            (None, Direction::Forward) => NodeId::ROOT,
            (None, Direction::Reverse) => self.tree.last_descendant(NodeId::ROOT),
        };
        Walk {
            tree: self.tree,
            origin: self.origin,
            resolver: self.resolver.as_ref(),
            start,
            current: Some(start),
        }
    }

    fn ancestry_of_matches(&self, filter: &NodeFilter<'t, T>, exclude_match: bool) -> HashSet<NodeId> {
        let mut members = HashSet::new();
        for node in self.ascend(None, false).walk() {
            if !members.contains(&node.id) && filter(node) {
                if !exclude_match {
                    members.insert(node.id);
                }
                members.extend(self.tree.ancestors(node.id).map(|a| a.id));
            }
        }
        members
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &'t Node<T>> + '_> {
        let mut nodes: Box<dyn Iterator<Item = &'t Node<T>> + '_> = Box::new(self.walk());
        for step in &self.steps {
            nodes = match step {
                Step::Skip(count) => Box::new(nodes.skip(*count)),
                Step::Take(count) => Box::new(nodes.take(*count)),
                Step::Where(filter) => Box::new(nodes.filter(move |node| filter(node))),
                Step::HasDescendant {
                    filter,
                    exclude_match,
                } => {
                    let members = self.ancestry_of_matches(filter, *exclude_match);
                    Box::new(nodes.filter(move |node| members.contains(&node.id)))
                }
            };
        }
        nodes
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn nth(&self, n: usize) -> Option<&'t Node<T>> {
        self.skip(n).take(1).iter().next()
    }

    pub fn to_vec(&self) -> Vec<&'t Node<T>> {
        self.iter().collect()
    }

    /// Items of the yielded nodes, in order.
    pub fn items(&self) -> Vec<&'t T> {
        self.iter().filter_map(Node::item).collect()
    }
}

impl<'q, 't, T: Clone + Eq + Hash> IntoIterator for &'q Query<'t, T> {
    type Item = &'t Node<T>;
    type IntoIter = Box<dyn Iterator<Item = &'t Node<T>> + 'q>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Raw traversal under a query's origin and resolver.
struct Walk<'q, 't, T> {
    tree: &'t Tree<T>,
    origin: Origin,
    resolver: Option<&'q Resolver<'t, T>>,
    start: NodeId,
    current: Option<NodeId>,
}

impl<'t, T> Iterator for Walk<'_, 't, T> {
    type Item = &'t Node<T>;

    fn next(&mut self) -> Option<&'t Node<T>> {
        loop {
            let node = self.tree.node(self.current?);
            let default = match self.origin.direction {
                Direction::Forward => self.tree.forward_node(node.id, self.origin.wrap),
                Direction::Reverse => self.tree.reverse_node(node.id, self.origin.wrap),
            };
            let next = match self.resolver {
                Some(resolve) => resolve(node, default),
                None => default,
            };
            // back at the start: a full cycle
            self.current = next.filter(|&next| next != self.start);
            if !node.is_root() {
                return Some(node);
            }
        }
    }
}
