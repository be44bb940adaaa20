//! Dependency tracking for formula calculation
//!
//! An edge `A -> d` means the formula in `A` reads `d`. Both directions are
//! stored so that writes can drop a cell's outgoing edges and reads of the
//! dependents of a changed cell are cheap.

use ahash::{AHashMap, AHashSet};
use sheetcalc_core::CellAddress;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Dependency graph for formula cells
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Cell → cells it reads (precedents)
    precedents: AHashMap<CellAddress, AHashSet<CellAddress>>,
    /// Cell → cells that read it (dependents)
    dependents: AHashMap<CellAddress, AHashSet<CellAddress>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the outgoing edges of `cell` with `deps`
    pub fn set_dependencies<I>(&mut self, cell: CellAddress, deps: I)
    where
        I: IntoIterator<Item = CellAddress>,
    {
        self.clear_dependencies(cell);

        let deps: AHashSet<CellAddress> = deps.into_iter().collect();
        if deps.is_empty() {
            return;
        }
        for &dep in &deps {
            self.dependents.entry(dep).or_default().insert(cell);
        }
        self.precedents.insert(cell, deps);
    }

    /// Remove the outgoing edges of `cell`
    ///
    /// Edges from other formulas into `cell` are untouched; those formulas
    /// still read the address.
    pub fn clear_dependencies(&mut self, cell: CellAddress) {
        let Some(old) = self.precedents.remove(&cell) else {
            return;
        };
        for dep in old {
            if let Some(readers) = self.dependents.get_mut(&dep) {
                readers.remove(&cell);
                if readers.is_empty() {
                    self.dependents.remove(&dep);
                }
            }
        }
    }

    /// Cells that `cell` reads directly
    pub fn dependencies(&self, cell: CellAddress) -> impl Iterator<Item = CellAddress> + '_ {
        self.precedents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Cells that read `cell` directly
    pub fn dependents(&self, cell: CellAddress) -> impl Iterator<Item = CellAddress> + '_ {
        self.dependents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Check if `cell` has any outgoing edges
    pub fn has_dependencies(&self, cell: CellAddress) -> bool {
        self.precedents.contains_key(&cell)
    }

    /// Number of cells with outgoing edges
    pub fn len(&self) -> usize {
        self.precedents.len()
    }

    /// Check if the graph has no edges
    pub fn is_empty(&self) -> bool {
        self.precedents.is_empty()
    }

    /// Check if `cell` lies on a cycle
    pub fn creates_cycle(&self, cell: CellAddress) -> bool {
        self.find_cycle(cell).is_some()
    }

    /// Check if giving `cell` the dependencies `deps` would close a cycle,
    /// without touching the graph
    pub fn would_create_cycle(&self, cell: CellAddress, deps: &AHashSet<CellAddress>) -> bool {
        if deps.contains(&cell) {
            return true;
        }
        // A cycle appears iff some new dependency already (transitively) reads `cell`
        self.transitive_dependents(cell)
            .iter()
            .any(|reader| deps.contains(reader))
    }

    /// Find a cycle through `cell`
    ///
    /// Returns the path `[cell, .., cell]` following dependents, so each
    /// entry reads the one before it.
    pub fn find_cycle(&self, cell: CellAddress) -> Option<Vec<CellAddress>> {
        let mut parent: AHashMap<CellAddress, CellAddress> = AHashMap::new();
        let mut stack = vec![cell];

        while let Some(current) = stack.pop() {
            for next in self.sorted_dependents(current) {
                if next == cell {
                    let mut path = vec![cell, current];
                    let mut at = current;
                    while at != cell {
                        at = parent[&at];
                        path.push(at);
                    }
                    path.reverse();
                    return Some(path);
                }
                if !parent.contains_key(&next) {
                    parent.insert(next, current);
                    stack.push(next);
                }
            }
        }

        None
    }

    /// Every cell that reads `cell`, directly or transitively
    ///
    /// `cell` itself is included only if it lies on a cycle.
    pub fn transitive_dependents(&self, cell: CellAddress) -> AHashSet<CellAddress> {
        let mut seen = AHashSet::new();
        let mut stack: Vec<CellAddress> = self.dependents(cell).collect();

        while let Some(current) = stack.pop() {
            if seen.insert(current) {
                stack.extend(self.dependents(current).filter(|c| !seen.contains(c)));
            }
        }

        seen
    }

    /// Order `cells` so every cell comes after the cells it reads
    ///
    /// Kahn's algorithm restricted to the subset: only edges with both ends in
    /// `cells` count. Ties are broken by address. Cells left over because they
    /// sit on a cycle are appended in address order.
    pub fn topological_order(&self, cells: &AHashSet<CellAddress>) -> Vec<CellAddress> {
        let mut in_degree: AHashMap<CellAddress, usize> = cells
            .iter()
            .map(|&c| (c, self.dependencies(c).filter(|d| cells.contains(d)).count()))
            .collect();

        let mut ready: BinaryHeap<Reverse<CellAddress>> = in_degree
            .iter()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(&c, _)| Reverse(c))
            .collect();

        let mut order = Vec::with_capacity(cells.len());
        while let Some(Reverse(cell)) = ready.pop() {
            order.push(cell);
            for reader in self.dependents(cell) {
                if let Some(deg) = in_degree.get_mut(&reader) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.push(Reverse(reader));
                    }
                }
            }
        }

        if order.len() < cells.len() {
            let placed: AHashSet<CellAddress> = order.iter().copied().collect();
            let mut leftover: Vec<CellAddress> =
                cells.iter().copied().filter(|c| !placed.contains(c)).collect();
            leftover.sort_unstable();
            order.extend(leftover);
        }

        order
    }

    /// Cells to mark dirty after `cell` changes, in evaluation order
    pub fn recalc_order(&self, cell: CellAddress) -> Vec<CellAddress> {
        let mut affected = self.transitive_dependents(cell);
        affected.remove(&cell);
        self.topological_order(&affected)
    }

    /// Check that the two adjacency maps mirror each other exactly
    pub fn is_consistent(&self) -> bool {
        let forward = self
            .precedents
            .iter()
            .flat_map(|(&cell, deps)| deps.iter().map(move |&d| (cell, d)));
        let backward = self
            .dependents
            .iter()
            .flat_map(|(&dep, readers)| readers.iter().map(move |&r| (r, dep)));

        let forward: AHashSet<_> = forward.collect();
        let backward: AHashSet<_> = backward.collect();
        let no_empty_sets = self.precedents.values().all(|s| !s.is_empty())
            && self.dependents.values().all(|s| !s.is_empty());

        forward == backward && no_empty_sets
    }

    /// Clear the entire graph
    pub fn clear(&mut self) {
        self.precedents.clear();
        self.dependents.clear();
    }

    fn sorted_dependents(&self, cell: CellAddress) -> Vec<CellAddress> {
        let mut readers: Vec<_> = self.dependents(cell).collect();
        readers.sort_unstable();
        readers
    }
}
