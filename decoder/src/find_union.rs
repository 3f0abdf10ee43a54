//! Disjoint sets over `0..len`, used to merge ground-truth components.
#[derive(Debug, Clone, Default)]
pub struct FindUnion {
    /// If `parents[i] == i`, `i` represents its set.
    parents: Vec<usize>,
    /// The size of the set. Only meaningful for representatives.
    sizes: Vec<usize>,
}

impl FindUnion {
    pub fn new(len: usize) -> Self {
        Self {
            parents: (0..len).collect(),
            sizes: vec![1; len],
        }
    }
    pub fn len(&self) -> usize {
        self.parents.len()
    }
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
    /// The representative of `index`, or `None` if out of range.
    pub fn find(&mut self, index: usize) -> Option<usize> {
        if self.len() <= index {
            return None;
        }
        let mut current = index;
        while self.parents[current] != current {
            // Path halving.
            let grand = self.parents[self.parents[current]];
            self.parents[current] = grand;
            current = grand;
        }
        Some(current)
    }
    /// Merge the sets of `a` and `b`. Return `Some(true)` if they were different sets.
    pub fn unite(&mut self, a: usize, b: usize) -> Option<bool> {
        let (a, b) = (self.find(a)?, self.find(b)?);
        if a == b {
            return Some(false);
        }
        let (large, small) = if self.sizes[a] < self.sizes[b] {
            (b, a)
        } else {
            (a, b)
        };
        self.parents[small] = large;
        self.sizes[large] += self.sizes[small];
        Some(true)
    }
    pub fn same(&mut self, a: usize, b: usize) -> Option<bool> {
        Some(self.find(a)? == self.find(b)?)
    }
    pub fn size(&mut self, index: usize) -> Option<usize> {
        let root = self.find(index)?;
        Some(self.sizes[root])
    }
}
