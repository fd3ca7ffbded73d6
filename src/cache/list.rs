//! Recency-ordered doubly linked list.
//!
//! Nodes live in a `Vec<Option<Node<T>>>` arena and are addressed by
//! [`NodeId`]. Freed slots go on a free list and are reused by the next push,
//! so a long-running cache does not grow the arena past its peak length.
//! Front is the most recently used end, back the least.

/// Handle to a node inside a [`List`].
///
/// Only meaningful for the list that returned it. A handle whose node has
/// been removed is stale; operations given a stale handle do nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Doubly linked list with O(1) push, remove and move-to-front.
#[derive(Debug)]
pub struct List<T> {
    nodes: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> List<T> {
    /// Create an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Create an empty list with room for `capacity` nodes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            ..Self::new()
        }
    }

    /// Number of linked nodes.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check if the list is empty.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Most recently used node.
    pub const fn front(&self) -> Option<NodeId> {
        match self.head {
            Some(index) => Some(NodeId(index)),
            None => None,
        }
    }

    /// Least recently used node.
    pub const fn back(&self) -> Option<NodeId> {
        match self.tail {
            Some(index) => Some(NodeId(index)),
            None => None,
        }
    }

    /// Borrow the value stored at `id`.
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.node(id.0).map(|n| &n.value)
    }

    /// Mutably borrow the value stored at `id`.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .map(|n| &mut n.value)
    }

    /// Insert a value at the front.
    pub fn push_front(&mut self, value: T) -> NodeId {
        let idx = self.alloc(Node {
            value,
            prev: None,
            next: self.head,
        });

        match self.head {
            Some(old) => self.link_mut(old).prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
        self.len += 1;

        NodeId(idx)
    }

    /// Insert a value at the back.
    pub fn push_back(&mut self, value: T) -> NodeId {
        let idx = self.alloc(Node {
            value,
            prev: self.tail,
            next: None,
        });

        match self.tail {
            Some(old) => self.link_mut(old).next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        self.len += 1;

        NodeId(idx)
    }

    /// Unlink a node and hand back its value.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        self.node(id.0)?;
        self.unlink(id.0);

        let node = self.nodes[id.0].take()?;
        self.free.push(id.0);
        self.len -= 1;

        Some(node.value)
    }

    /// Remove the back node, returning its value.
    pub fn pop_back(&mut self) -> Option<T> {
        let tail = self.back()?;
        self.remove(tail)
    }

    /// Move a node to the front, keeping its handle valid.
    pub fn move_to_front(&mut self, id: NodeId) {
        if self.head == Some(id.0) || self.node(id.0).is_none() {
            return;
        }

        self.unlink(id.0);

        let old_head = self.head;
        {
            let node = self.link_mut(id.0);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(old) => self.link_mut(old).prev = Some(id.0),
            None => self.tail = Some(id.0),
        }
        self.head = Some(id.0);
    }

    /// Drop every node and release the arena.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Iterate values from front (most recent) to back.
    pub const fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    fn node(&self, idx: usize) -> Option<&Node<T>> {
        self.nodes.get(idx).and_then(Option::as_ref)
    }

    // Only called with indices that are known to be linked.
    fn link_mut(&mut self, idx: usize) -> &mut Node<T> {
        match self.nodes[idx].as_mut() {
            Some(node) => node,
            None => unreachable!("linked index {idx} points at a free slot"),
        }
    }

    fn alloc(&mut self, node: Node<T>) -> usize {
        if let Some(idx) = self.free.pop() {
            self.nodes[idx] = Some(node);
            idx
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    /// Detach a node from its neighbours without freeing it.
    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.link_mut(idx);
            (node.prev.take(), node.next.take())
        };

        match prev {
            Some(p) => self.link_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.link_mut(n).prev = prev,
            None => self.tail = prev,
        }
    }
}

/// Front-to-back iterator over a [`List`].
pub struct Iter<'a, T> {
    list: &'a List<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.node(self.cursor?)?;
        self.cursor = node.next;
        Some(&node.value)
    }
}
