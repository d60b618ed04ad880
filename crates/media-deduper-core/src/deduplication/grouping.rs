//! Partitioning items into duplicate groups.
//!
//! Two items are *linked* when the mean Hamming distance of their aligned
//! fingerprints is within the threshold. Groups are the connected components of
//! that relation, so similarity chains: A~B and B~C puts A, B and C together even
//! when A and C alone would not pass.

use std::cmp::Ordering;

use crate::types::MediaItem;

/// Disjoint-set forest over dense indices `0..n`
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            size: vec![1; len],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Representative of `x`, halving the path on the way up
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets holding `a` and `b`; returns false if already merged
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (mut a, mut b) = (self.find(a), self.find(b));
        if a == b {
            return false;
        }
        if self.size[a] < self.size[b] {
            std::mem::swap(&mut a, &mut b);
        }
        self.parent[b] = a;
        self.size[a] += self.size[b];
        true
    }

    /// All sets, members ascending, sets ordered by their smallest member
    pub fn components(&mut self) -> Vec<Vec<usize>> {
        let mut slot_of_root = vec![usize::MAX; self.len()];
        let mut components: Vec<Vec<usize>> = Vec::new();

        for x in 0..self.len() {
            let root = self.find(x);
            if slot_of_root[root] == usize::MAX {
                slot_of_root[root] = components.len();
                components.push(Vec::new());
            }
            components[slot_of_root[root]].push(x);
        }

        components
    }
}

/// Mean Hamming distance over fingerprints paired by sample index
///
/// Only indices present in both items take part, so a failed offset in one
/// file does not shift the later frames. Returns `None` when no index is
/// shared or the hash lengths differ.
pub fn similarity_score(a: &MediaItem, b: &MediaItem) -> Option<f64> {
    let mut xs = a.fingerprints.iter().peekable();
    let mut ys = b.fingerprints.iter().peekable();
    let mut total = 0u64;
    let mut common = 0u64;

    while let (Some(x), Some(y)) = (xs.peek(), ys.peek()) {
        match x.sample.cmp(&y.sample) {
            Ordering::Less => {
                xs.next();
            }
            Ordering::Greater => {
                ys.next();
            }
            Ordering::Equal => {
                total += x.hash.distance(&y.hash)? as u64;
                common += 1;
                xs.next();
                ys.next();
            }
        }
    }

    if common == 0 {
        return None;
    }
    Some(total as f64 / common as f64)
}

/// Connected components of size ≥ 2 under an arbitrary symmetric link relation
pub fn link_components<F>(len: usize, mut linked: F) -> Vec<Vec<usize>>
where
    F: FnMut(usize, usize) -> bool,
{
    let mut sets = DisjointSet::new(len);

    for i in 0..len {
        for j in (i + 1)..len {
            if linked(i, j) {
                sets.union(i, j);
            }
        }
    }

    sets.components()
        .into_iter()
        .filter(|c| c.len() >= 2)
        .collect()
}

/// Groups items whose score is within a fixed threshold
#[derive(Debug, Clone, Copy)]
pub struct SimilarityGrouper {
    threshold: f64,
}

impl SimilarityGrouper {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Whether `a` and `b` are directly linked
    ///
    /// A video and an image are never linked.
    pub fn is_linked(&self, a: &MediaItem, b: &MediaItem) -> bool {
        a.kind == b.kind && similarity_score(a, b).is_some_and(|score| score <= self.threshold)
    }

    /// Index groups into `items`, singletons dropped
    pub fn group(&self, items: &[MediaItem]) -> Vec<Vec<usize>> {
        link_components(items.len(), |i, j| self.is_linked(&items[i], &items[j]))
    }
}
