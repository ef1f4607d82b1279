//! Union-find over dense indices.

/// Disjoint-set forest with path compression and union by rank.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    /// `len` singleton sets, `0..len`.
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Whether there are no elements.
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Representative of the set containing `x`.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }

        root
    }

    /// Merge the sets containing `a` and `b`. Returns `false` if already merged.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return false;
        }

        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] = self.rank[root_a].saturating_add(1);
            }
        }
        true
    }

    /// Members of every set, each list ascending, lists ordered by smallest member.
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let mut slot_of_root = vec![usize::MAX; self.len()];
        let mut groups: Vec<Vec<usize>> = Vec::new();

        for x in 0..self.len() {
            let root = self.find(x);
            if slot_of_root[root] == usize::MAX {
                slot_of_root[root] = groups.len();
                groups.push(Vec::new());
            }
            groups[slot_of_root[root]].push(x);
        }

        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singletons() {
        let mut sets = DisjointSet::new(3);
        assert_eq!(sets.groups(), vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn test_union_is_transitive() {
        let mut sets = DisjointSet::new(5);
        assert!(sets.union(0, 3));
        assert!(sets.union(3, 4));
        assert!(!sets.union(0, 4));
        assert_eq!(sets.find(4), sets.find(0));
        assert_eq!(sets.groups(), vec![vec![0, 3, 4], vec![1], vec![2]]);
    }

    #[test]
    fn test_long_chain_compresses() {
        let mut sets = DisjointSet::new(1000);
        for i in 1..1000 {
            sets.union(i - 1, i);
        }
        let root = sets.find(999);
        assert!((0..1000).all(|i| sets.find(i) == root));
        assert_eq!(sets.groups().len(), 1);
    }

    #[test]
    fn test_empty() {
        let mut sets = DisjointSet::new(0);
        assert!(sets.is_empty());
        assert!(sets.groups().is_empty());
    }
}
