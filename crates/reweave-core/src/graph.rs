use crate::model::Model;
use crate::variable::VariableList;

/// Acyclicity test on the model's constraint hypergraph (Graham
/// reduction): repeatedly delete variables that appear in exactly one
/// relation and relations subsumed by another, until nothing changes. The
/// model is decomposable iff everything vanishes; a non-empty residue is a
/// loop, and such models need IPF rather than a junction tree.
pub fn is_acyclic(model: &Model) -> bool {
    let mut relations: Vec<Vec<usize>> = model
        .relations()
        .iter()
        .map(|r| r.positions().to_vec())
        .collect();

    loop {
        let mut changed = false;

        // delete variables occurring in exactly one relation
        let mut occurrences: hashbrown::HashMap<usize, usize> = hashbrown::HashMap::new();
        for rel in &relations {
            for &p in rel {
                *occurrences.entry(p).or_insert(0) += 1;
            }
        }
        for rel in relations.iter_mut() {
            let before = rel.len();
            rel.retain(|p| occurrences[p] > 1);
            if rel.len() != before {
                changed = true;
            }
        }
        relations.retain(|r| !r.is_empty());

        // delete relations contained in another relation
        let mut kept: Vec<Vec<usize>> = Vec::with_capacity(relations.len());
        for (i, rel) in relations.iter().enumerate() {
            let subsumed = relations.iter().enumerate().any(|(j, other)| {
                if i == j {
                    return false;
                }
                let proper = other.len() > rel.len() || (other.len() == rel.len() && j < i);
                proper && rel.iter().all(|p| other.contains(p))
            });
            if subsumed {
                changed = true;
            } else {
                kept.push(rel.clone());
            }
        }
        relations = kept;

        if relations.is_empty() {
            return true;
        }
        if !changed {
            return false;
        }
    }
}

/// The undirected variable-interaction graph of a model: nodes are
/// variables, with an edge between every pair that co-occurs in at least
/// one relation. Used by the neighbor generators to find pairs that are
/// not yet associated.
#[derive(Clone, Debug)]
pub struct InteractionGraph {
    n: usize,
    adjacency: Vec<bool>,
}

impl InteractionGraph {
    pub fn from_model(model: &Model, vars: &VariableList) -> Self {
        let n = vars.len();
        let mut adjacency = vec![false; n * n];
        for rel in model.relations() {
            let positions = rel.positions();
            for (i, &a) in positions.iter().enumerate() {
                for &b in &positions[i + 1..] {
                    adjacency[a * n + b] = true;
                    adjacency[b * n + a] = true;
                }
            }
        }
        InteractionGraph { n, adjacency }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Whether the two variables co-occur in some relation.
    pub fn co_occur(&self, a: usize, b: usize) -> bool {
        self.adjacency[a * self.n + b]
    }

    pub fn degree(&self, v: usize) -> usize {
        (0..self.n).filter(|&u| self.co_occur(v, u)).count()
    }

    /// Pairs `(a, b)` with `a < b` that do not co-occur in any relation.
    pub fn unlinked_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for a in 0..self.n {
            for b in (a + 1)..self.n {
                if !self.co_occur(a, b) {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }

    /// Relations of `model` containing variable `v`.
    pub fn relations_containing(model: &Model, v: usize) -> Vec<usize> {
        model
            .relations()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.contains(v))
            .map(|(i, _)| i)
            .collect()
    }

    /// Relations in which the pair co-occurs.
    pub fn relations_with_pair(model: &Model, a: usize, b: usize) -> Vec<usize> {
        model
            .relations()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.contains(a) && r.contains(b))
            .map(|(i, _)| i)
            .collect()
    }
}
