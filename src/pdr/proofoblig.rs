use super::derive::Derivation;
use super::reach::ReachFactId;
use crate::chc::RelationId;
use crate::fol::Cube;
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

/// How an obligation was discharged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PobState {
    Open,
    Blocked,
    Reachable(ReachFactId),
}

pub struct PobInner {
    seq: u64,
    pub relation: RelationId,
    pub post: Cube,
    level: Cell<usize>,
    pub depth: usize,
    state: Cell<PobState>,
    /// Set when an ancestor was discharged and this subtree became moot.
    removed: Cell<bool>,
    pub parent: Option<WeakPob>,
    /// Position of this obligation among its parent's rule premises.
    pub oidx: usize,
    children: RefCell<Vec<Pob>>,
    pub derivation: RefCell<Option<Derivation>>,
}

/// A proof obligation: "show that a state satisfying `post` over
/// `relation`'s canonical arguments is unreachable within `level` steps".
/// Obligations form a tree rooted at the query; handles are shared between
/// the tree and the queue, so the mutable bits live in cells.
#[derive(Clone)]
pub struct Pob {
    inner: Rc<PobInner>,
}

impl Pob {
    pub fn new_root(seq: u64, relation: RelationId) -> Self {
        Self::make(seq, relation, Cube::tt(), 0, 0, None, 0)
    }

    pub fn new_child(
        seq: u64,
        parent: &Pob,
        oidx: usize,
        relation: RelationId,
        post: Cube,
        level: usize,
    ) -> Self {
        let child = Self::make(
            seq,
            relation,
            post,
            level,
            parent.depth + 1,
            Some(parent.downgrade()),
            oidx,
        );
        parent.inner.children.borrow_mut().push(child.clone());
        child
    }

    fn make(
        seq: u64,
        relation: RelationId,
        post: Cube,
        level: usize,
        depth: usize,
        parent: Option<WeakPob>,
        oidx: usize,
    ) -> Self {
        Self {
            inner: Rc::new(PobInner {
                seq,
                relation,
                post,
                level: Cell::new(level),
                depth,
                state: Cell::new(PobState::Open),
                removed: Cell::new(false),
                parent,
                oidx,
                children: RefCell::new(Vec::new()),
                derivation: RefCell::new(None),
            }),
        }
    }

    pub fn level(&self) -> usize {
        self.inner.level.get()
    }

    /// Re-aim the obligation at a higher level. Only the root is ever
    /// re-leveled, when the search ceiling rises.
    pub fn set_level(&self, level: usize) {
        debug_assert!(level >= self.inner.level.get());
        self.inner.level.set(level);
    }

    pub fn state(&self) -> PobState {
        self.inner.state.get()
    }

    pub fn is_open(&self) -> bool {
        self.state() == PobState::Open
    }

    pub fn reach_fact(&self) -> Option<ReachFactId> {
        match self.state() {
            PobState::Reachable(f) => Some(f),
            _ => None,
        }
    }

    pub fn close_blocked(&self) {
        debug_assert!(self.is_open());
        self.inner.state.set(PobState::Blocked);
        self.remove_descendants();
    }

    pub fn close_reachable(&self, fact: ReachFactId) {
        debug_assert!(self.is_open());
        self.inner.state.set(PobState::Reachable(fact));
        self.remove_descendants();
    }

    pub fn is_removed(&self) -> bool {
        self.inner.removed.get()
    }

    /// Invalidate every obligation below this one. Removed obligations
    /// still sitting in the queue are skipped at dequeue time.
    pub fn remove_descendants(&self) {
        for child in self.inner.children.borrow_mut().drain(..) {
            child.inner.removed.set(true);
            child.remove_descendants();
        }
        *self.inner.derivation.borrow_mut() = None;
    }

    pub fn downgrade(&self) -> WeakPob {
        WeakPob(Rc::downgrade(&self.inner))
    }
}

impl Deref for Pob {
    type Target = PobInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl PartialEq for Pob {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Pob {}

impl fmt::Debug for Pob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pob")
            .field("relation", &self.inner.relation)
            .field("post", &format_args!("{}", self.inner.post))
            .field("level", &self.level())
            .field("depth", &self.inner.depth)
            .field("state", &self.state())
            .finish()
    }
}

#[derive(Clone)]
pub struct WeakPob(Weak<PobInner>);

impl WeakPob {
    pub fn upgrade(&self) -> Option<Pob> {
        self.0.upgrade().map(|inner| Pob { inner })
    }
}

struct QueueEntry(Pob);

impl QueueEntry {
    fn key(&self) -> (usize, usize, u64) {
        (self.0.level(), self.0.depth, self.0.seq)
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Priority queue of open obligations, lowest `(level, depth)` first so
/// blocking proceeds closest to the initial states, breadth before depth.
/// Insertion order breaks the remaining ties.
#[derive(Default)]
pub struct PobQueue {
    set: BTreeSet<QueueEntry>,
}

impl PobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pob: Pob) {
        self.set.insert(QueueEntry(pob));
    }

    /// Next live obligation, or `None` when the queue drains. Removed and
    /// closed obligations are discarded here.
    pub fn pop(&mut self) -> Option<Pob> {
        while let Some(QueueEntry(pob)) = self.set.pop_first() {
            if !pob.is_removed() && pob.is_open() {
                return Some(pob);
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn clear(&mut self) {
        self.set.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::{Sort, Term, Var};

    fn cube(n: i64) -> Cube {
        Cube::new([Term::eq(Term::var(Var::new("x", Sort::Int)), Term::int(n))])
    }

    #[test]
    fn queue_pops_minimum_level_then_depth() {
        let mut q = PobQueue::new();
        let root = Pob::new_root(0, RelationId::from_index(0));
        root.set_level(3);
        let a = Pob::new_child(1, &root, 0, RelationId::from_index(1), cube(1), 2);
        let b = Pob::new_child(2, &a, 0, RelationId::from_index(1), cube(2), 2);
        let c = Pob::new_child(3, &b, 0, RelationId::from_index(1), cube(3), 1);
        q.add(root.clone());
        q.add(a.clone());
        q.add(b.clone());
        q.add(c.clone());
        // c has the lowest level; a precedes b at equal level by depth
        assert_eq!(q.pop().unwrap(), c);
        assert_eq!(q.pop().unwrap(), a);
        assert_eq!(q.pop().unwrap(), b);
        assert_eq!(q.pop().unwrap(), root);
        assert!(q.pop().is_none());
    }

    #[test]
    fn closing_removes_subtree_from_queue() {
        let mut q = PobQueue::new();
        let root = Pob::new_root(0, RelationId::from_index(0));
        root.set_level(2);
        let a = Pob::new_child(1, &root, 0, RelationId::from_index(1), cube(1), 1);
        let b = Pob::new_child(2, &a, 0, RelationId::from_index(1), cube(2), 0);
        q.add(root.clone());
        q.add(a.clone());
        q.add(b);
        a.close_blocked();
        assert!(!a.is_open());
        // b was invalidated along with a; only the root survives
        assert_eq!(q.pop().unwrap(), root);
        assert!(q.pop().is_none());
    }

    #[test]
    fn reachable_state_records_fact() {
        let root = Pob::new_root(0, RelationId::from_index(0));
        let a = Pob::new_child(1, &root, 0, RelationId::from_index(1), cube(1), 0);
        a.close_reachable(ReachFactId(7));
        assert_eq!(a.reach_fact(), Some(ReachFactId(7)));
        assert_eq!(root.reach_fact(), None);
    }
}
