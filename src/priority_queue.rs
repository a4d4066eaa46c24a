//! Priority queue backed by an unbalanced binary search tree with duplicate chains.
//!
//! Each distinct priority occupies one position in the tree. Further values
//! inserted with an existing priority are appended to a singly linked chain
//! hanging off that position, so values of equal priority come out in the
//! order they went in. Huffman tree construction relies on that: the tie
//! break decides the shape of the coding tree and therefore every emitted
//! code.
//!
//! Nodes live in an arena and refer to each other by index. `left`, `right`
//! and `link` own their target; `parent` is only ever used to walk upwards.
//! For a chain node `parent` is its predecessor in the chain.

use std::fmt;

/// Ordering key. Lower priorities are extracted first.
pub type Priority = u64;

type NodeId = usize;

#[derive(Debug)]
struct Node<T> {
    priority: Priority,
    value: T,
    /// Set for nodes reachable only through a `link`.
    dup: bool,
    parent: Option<NodeId>,
    link: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

impl<T> Node<T> {
    fn new(value: T, priority: Priority) -> Self {
        Node {
            priority,
            value,
            dup: false,
            parent: None,
            link: None,
            left: None,
            right: None,
        }
    }
}

#[derive(Debug)]
pub struct PriorityQueue<T> {
    nodes: Vec<Option<Node<T>>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    len: usize,
    /// Traversal position for `begin`/`advance`.
    cursor: Option<NodeId>,
}

impl<T> PriorityQueue<T> {
    pub fn new() -> Self {
        PriorityQueue {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            len: 0,
            cursor: None,
        }
    }

    /// Number of stored values, duplicates included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts `value` with `priority`.
    ///
    /// A new priority becomes a tree node; an existing one gets the value
    /// appended to the end of its duplicate chain.
    pub fn insert(&mut self, value: T, priority: Priority) {
        let id = self.alloc(Node::new(value, priority));
        self.len += 1;

        let Some(mut cur) = self.root else {
            self.root = Some(id);
            return;
        };

        loop {
            let (current, left, right) = {
                let node = self.node(cur);
                (node.priority, node.left, node.right)
            };
            if priority > current {
                match right {
                    Some(right) => cur = right,
                    None => {
                        self.node_mut(cur).right = Some(id);
                        self.node_mut(id).parent = Some(cur);
                        return;
                    }
                }
            } else if priority < current {
                match left {
                    Some(left) => cur = left,
                    None => {
                        self.node_mut(cur).left = Some(id);
                        self.node_mut(id).parent = Some(cur);
                        return;
                    }
                }
            } else {
                let mut tail = cur;
                while let Some(next) = self.node(tail).link {
                    tail = next;
                }
                self.node_mut(tail).link = Some(id);
                let new = self.node_mut(id);
                new.dup = true;
                new.parent = Some(tail);
                return;
            }
        }
    }

    /// Removes and returns the value with the lowest priority, or `None` if
    /// the queue is empty. Among equal priorities the earliest insertion wins.
    ///
    /// Any traversal in progress is abandoned.
    pub fn extract_min(&mut self) -> Option<T> {
        let root = self.root?;
        let min = self.leftmost(root);
        let (parent, link, left, right) = {
            let node = self.node(min);
            (node.parent, node.link, node.left, node.right)
        };

        if let Some(head) = link {
            // The chain head takes over the vacated tree position.
            let promoted = self.node_mut(head);
            promoted.dup = false;
            promoted.parent = parent;
            promoted.left = left;
            promoted.right = right;
            if let Some(right) = right {
                self.node_mut(right).parent = Some(head);
            }
            self.replace_left_of(parent, Some(head));
        } else if let Some(right) = right {
            self.node_mut(right).parent = parent;
            self.replace_left_of(parent, Some(right));
        } else {
            self.replace_left_of(parent, None);
        }

        self.cursor = None;
        self.len -= 1;
        Some(self.release(min).value)
    }

    /// Returns the value `extract_min` would remove, without removing it.
    pub fn peek_min(&self) -> Option<&T> {
        let root = self.root?;
        Some(&self.node(self.leftmost(root)).value)
    }

    /// Positions the traversal cursor on the first element in priority order.
    pub fn begin(&mut self) {
        let first = self.root.map(|root| self.leftmost(root));
        self.cursor = first;
    }

    /// Returns the element under the cursor and moves the cursor on.
    ///
    /// Elements come out in non-decreasing priority, each duplicate chain
    /// right after its tree node. Once exhausted, keeps returning `None`
    /// until the next `begin`.
    pub fn advance(&mut self) -> Option<(&T, Priority)> {
        let current = self.cursor?;
        self.cursor = self.successor(current);
        let node = self.node(current);
        Some((&node.value, node.priority))
    }

    /// Borrowing iterator in the same order as `begin`/`advance`. Does not
    /// disturb the traversal cursor.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            queue: self,
            next: self.root.map(|root| self.leftmost(root)),
            remaining: self.len,
        }
    }

    /// Drops every value, visiting each node's left subtree, right subtree
    /// and duplicate chain before the node itself.
    pub fn clear(&mut self) {
        let mut stack: Vec<(NodeId, bool)> =
            self.root.map(|root| (root, false)).into_iter().collect();
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                drop(self.release(id));
                continue;
            }
            stack.push((id, true));
            let node = self.node(id);
            // Pushed in reverse so the left subtree is released first.
            for child in [node.link, node.right, node.left].into_iter().flatten() {
                stack.push((child, false));
            }
        }

        self.nodes.clear();
        self.free.clear();
        self.root = None;
        self.len = 0;
        self.cursor = None;
    }

    fn successor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(link) = self.node(id).link {
            return Some(link);
        }

        let primary = self.chain_head(id);
        if let Some(right) = self.node(primary).right {
            return Some(self.leftmost(right));
        }

        let mut child = primary;
        let mut parent = self.node(primary).parent;
        while let Some(p) = parent {
            if self.node(p).left == Some(child) {
                return Some(p);
            }
            child = p;
            parent = self.node(p).parent;
        }
        None
    }

    /// Walks back from a chain node to the tree node the chain hangs off.
    fn chain_head(&self, mut id: NodeId) -> NodeId {
        while self.node(id).dup {
            match self.node(id).parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
        id
    }

    fn leftmost(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.node(id).left {
            id = left;
        }
        id
    }

    /// Points `parent`'s left slot at `child`, or makes `child` the root.
    fn replace_left_of(&mut self, parent: Option<NodeId>, child: Option<NodeId>) {
        match parent {
            Some(parent) => self.node_mut(parent).left = child,
            None => self.root = child,
        }
    }

    fn alloc(&mut self, node: Node<T>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) -> Node<T> {
        match self.nodes[id].take() {
            Some(node) => {
                self.free.push(id);
                node
            }
            None => unreachable!("node {id} released twice"),
        }
    }

    fn node(&self, id: NodeId) -> &Node<T> {
        match &self.nodes[id] {
            Some(node) => node,
            None => unreachable!("dangling node {id}"),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        match &mut self.nodes[id] {
            Some(node) => node,
            None => unreachable!("dangling node {id}"),
        }
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for PriorityQueue<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Deep copy by re-insertion, visiting each node, then its chain, then its
/// left and right subtrees. The copy has the same shape as the source.
impl<T: Clone> Clone for PriorityQueue<T> {
    fn clone(&self) -> Self {
        let mut copy = PriorityQueue::new();
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            copy.insert(node.value.clone(), node.priority);
            stack.extend([node.right, node.left, node.link].into_iter().flatten());
        }
        copy
    }
}

/// Two queues are equal when their trees match node for node, chains included.
impl<T: PartialEq> PartialEq for PriorityQueue<T> {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self.root, other.root)];
        while let Some(pair) = stack.pop() {
            match pair {
                (None, None) => {}
                (Some(a), Some(b)) => {
                    let (a, b) = (self.node(a), other.node(b));
                    if a.priority != b.priority || a.value != b.value {
                        return false;
                    }
                    stack.push((a.right, b.right));
                    stack.push((a.left, b.left));
                    stack.push((a.link, b.link));
                }
                _ => return false,
            }
        }
        true
    }
}

impl<T: Eq> Eq for PriorityQueue<T> {}

impl<T: fmt::Display> fmt::Display for PriorityQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (value, priority) in self.iter() {
            writeln!(f, "{priority} value: {value}")?;
        }
        Ok(())
    }
}

pub struct Iter<'a, T> {
    queue: &'a PriorityQueue<T>,
    next: Option<NodeId>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (&'a T, Priority);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let queue = self.queue;
        self.next = queue.successor(id);
        self.remaining = self.remaining.saturating_sub(1);
        let node = queue.node(id);
        Some((&node.value, node.priority))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a PriorityQueue<T> {
    type Item = (&'a T, Priority);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
