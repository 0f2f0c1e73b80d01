use crate::error::SegmentationError;

/// The largest label a region can get; the three values above it are reserved as markers.
pub const MAX_LABEL: u32 = u32::MAX - 3;

/// A disjoint-set (union-find) forest of regions carrying a payload.
///
/// Label 0 is reserved for "no region" and is its own root. Unions keep the smaller label as
/// the root and combine the payloads with the merge function, so the payload of a root always
/// describes the whole region.
pub struct UnionFind<P, F> {
    parent: Vec<u32>,
    value: Vec<P>,
    new_labels: Vec<u32>,
    merge: F,
}

impl<P, F> UnionFind<P, F>
where
    P: Clone + Default,
    F: Fn(&P, &P) -> P,
{
    /// Creates an empty forest.
    pub fn new(merge: F) -> Self {
        Self {
            parent: vec![0],
            value: vec![P::default()],
            new_labels: Vec::new(),
            merge,
        }
    }

    /// Creates a forest with regions `1..=n`, each holding a copy of `value`.
    pub fn with_regions(n: u32, value: P, merge: F) -> Self {
        Self {
            parent: (0..=n).collect(),
            value: vec![value; n as usize + 1],
            new_labels: Vec::new(),
            merge,
        }
    }

    /// Creates a new region, returning its label.
    ///
    /// # Errors
    ///
    /// Fails once [`MAX_LABEL`] regions exist.
    pub fn create(&mut self, value: P) -> Result<u32, SegmentationError> {
        let index = self.parent.len();
        if index > MAX_LABEL as usize {
            return Err(SegmentationError::LabelSpaceExhausted { max: MAX_LABEL });
        }
        let label = index as u32;
        self.parent.push(label);
        self.value.push(value);
        Ok(label)
    }

    /// Returns the root of the region containing `label`, with path compression.
    pub fn find_root(&mut self, label: u32) -> u32 {
        let mut root = label;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }

        // relink the whole path to the root
        let mut id = label;
        while id != root {
            id = std::mem::replace(&mut self.parent[id as usize], root);
        }

        root
    }

    /// Joins the regions containing `a` and `b`, returning the root of the result.
    pub fn union(&mut self, a: u32, b: u32) -> u32 {
        let a = self.find_root(a);
        let b = self.find_root(b);
        if a == b {
            return a;
        }
        let (root, leaf) = if a < b { (a, b) } else { (b, a) };
        let merged = (self.merge)(&self.value[root as usize], &self.value[leaf as usize]);
        self.value[root as usize] = merged;
        self.parent[leaf as usize] = root;
        root
    }

    /// The payload of the region containing `label`.
    pub fn value(&mut self, label: u32) -> &P {
        let root = self.find_root(label);
        &self.value[root as usize]
    }

    /// Mutable access to the payload of the region containing `label`.
    pub fn value_mut(&mut self, label: u32) -> &mut P {
        let root = self.find_root(label);
        &mut self.value[root as usize]
    }

    /// The number of labels created, including merged ones.
    pub fn len(&self) -> usize {
        self.parent.len() - 1
    }

    /// Whether no region was created.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numbers the regions consecutively from 1, returning the number of regions.
    ///
    /// Afterwards [`UnionFind::label`] gives the new label of any old label.
    pub fn relabel(&mut self) -> usize {
        self.relabel_with(|_| true)
    }

    /// Like [`UnionFind::relabel`], but regions whose payload fails `constraint` get label 0.
    pub fn relabel_with<C: Fn(&P) -> bool>(&mut self, constraint: C) -> usize {
        let n = self.parent.len();
        let mut new_labels = vec![0u32; n];
        let mut count = 0u32;
        for label in 1..n as u32 {
            let root = self.find_root(label) as usize;
            if new_labels[root] == 0 && constraint(&self.value[root]) {
                count += 1;
                new_labels[root] = count;
            }
        }
        for label in 1..n {
            new_labels[label] = new_labels[self.parent[label] as usize];
        }
        self.new_labels = new_labels;
        count as usize
    }

    /// The label assigned to `label` by the last relabelling; 0 before any.
    pub fn label(&self, label: u32) -> u32 {
        self.new_labels.get(label as usize).copied().unwrap_or(0)
    }
}
