//! Ordered map with structural sharing.
//!
//! [`SharedMap`] is an AVL tree whose nodes sit behind [`Arc`]. Cloning a
//! map is O(1); inserting copies only the O(log n) nodes on the path to the
//! key, so a map and every map derived from it share all untouched subtrees.
//! Entries are never removed: histories and resolved states only grow.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

type Link<K, V> = Option<Arc<Node<K, V>>>;

struct Node<K, V> {
    key: K,
    value: V,
    height: u8,
    left: Link<K, V>,
    right: Link<K, V>,
}

fn height<K, V>(link: &Link<K, V>) -> u8 {
    link.as_ref().map_or(0, |node| node.height)
}

fn make<K, V>(key: K, value: V, left: Link<K, V>, right: Link<K, V>) -> Arc<Node<K, V>> {
    let height = 1 + height(&left).max(height(&right));
    Arc::new(Node {
        key,
        value,
        height,
        left,
        right,
    })
}

/// Rebuild a node from its parts, rotating if the subtrees differ in height
/// by more than one.
fn balance<K: Clone, V: Clone>(
    key: K,
    value: V,
    left: Link<K, V>,
    right: Link<K, V>,
) -> Arc<Node<K, V>> {
    let (hl, hr) = (height(&left), height(&right));
    if hl > hr + 1 {
        if let Some(l) = &left {
            if height(&l.left) >= height(&l.right) {
                let right = make(key, value, l.right.clone(), right);
                return make(l.key.clone(), l.value.clone(), l.left.clone(), Some(right));
            }
            if let Some(lr) = &l.right {
                let new_left = make(l.key.clone(), l.value.clone(), l.left.clone(), lr.left.clone());
                let new_right = make(key, value, lr.right.clone(), right);
                return make(lr.key.clone(), lr.value.clone(), Some(new_left), Some(new_right));
            }
        }
    } else if hr > hl + 1 {
        if let Some(r) = &right {
            if height(&r.right) >= height(&r.left) {
                let left = make(key, value, left, r.left.clone());
                return make(r.key.clone(), r.value.clone(), Some(left), r.right.clone());
            }
            if let Some(rl) = &r.left {
                let new_left = make(key, value, left, rl.left.clone());
                let new_right = make(r.key.clone(), r.value.clone(), rl.right.clone(), r.right.clone());
                return make(rl.key.clone(), rl.value.clone(), Some(new_left), Some(new_right));
            }
        }
    }
    make(key, value, left, right)
}

fn insert_at<K: Ord + Clone, V: Clone>(
    link: &Link<K, V>,
    key: K,
    value: V,
    replaced: &mut Option<V>,
) -> Arc<Node<K, V>> {
    let Some(node) = link else {
        return make(key, value, None, None);
    };
    match key.cmp(&node.key) {
        Ordering::Equal => {
            *replaced = Some(node.value.clone());
            Arc::new(Node {
                key,
                value,
                height: node.height,
                left: node.left.clone(),
                right: node.right.clone(),
            })
        }
        Ordering::Less => {
            let left = insert_at(&node.left, key, value, replaced);
            balance(node.key.clone(), node.value.clone(), Some(left), node.right.clone())
        }
        Ordering::Greater => {
            let right = insert_at(&node.right, key, value, replaced);
            balance(node.key.clone(), node.value.clone(), node.left.clone(), Some(right))
        }
    }
}

fn collect<'a, K, V>(link: &'a Link<K, V>, out: &mut Vec<(&'a K, &'a V)>) {
    if let Some(node) = link {
        collect(&node.left, out);
        out.push((&node.key, &node.value));
        collect(&node.right, out);
    }
}

/// Persistent ordered map. See the [module documentation](self).
pub struct SharedMap<K, V> {
    root: Link<K, V>,
    len: usize,
}

impl<K, V> SharedMap<K, V> {
    pub fn new() -> Self {
        Self { root: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if both maps share the same tree.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> std::vec::IntoIter<(&K, &V)> {
        let mut out = Vec::with_capacity(self.len);
        collect(&self.root, &mut out);
        out.into_iter()
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    /// The entry with the greatest key.
    pub fn last(&self) -> Option<(&K, &V)> {
        let mut node = self.root.as_ref()?;
        while let Some(right) = &node.right {
            node = right;
        }
        Some((&node.key, &node.value))
    }
}

impl<K: Ord, V> SharedMap<K, V> {
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut link = &self.root;
        while let Some(node) = link {
            match key.cmp(node.key.borrow()) {
                Ordering::Equal => return Some(&node.value),
                Ordering::Less => link = &node.left,
                Ordering::Greater => link = &node.right,
            }
        }
        None
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).is_some()
    }
}

impl<K: Ord + Clone, V: Clone> SharedMap<K, V> {
    /// Insert or replace an entry, returning the replaced value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let mut replaced = None;
        self.root = Some(insert_at(&self.root, key, value, &mut replaced));
        if replaced.is_none() {
            self.len += 1;
        }
        replaced
    }
}

impl<K, V> Default for SharedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for SharedMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            len: self.len,
        }
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for SharedMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && (self.ptr_eq(other) || self.iter().eq(other.iter()))
    }
}

impl<K: Eq, V: Eq> Eq for SharedMap<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for SharedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord + Clone, V: Clone> FromIterator<(K, V)> for SharedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<'a, K, V> IntoIterator for &'a SharedMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = std::vec::IntoIter<(&'a K, &'a V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
