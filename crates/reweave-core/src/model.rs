use crate::graph;
use crate::relation::Relation;
use crate::variable::VariableList;

/// An unordered set of relations, normalized on construction: duplicate
/// relations and relations that are proper subsets of another are removed,
/// and the survivors are kept in canonical (lexicographic) order so that
/// two models over the same relation set print the same name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Model {
    relations: Vec<Relation>,
}

impl Model {
    pub fn new(relations: Vec<Relation>) -> Self {
        let mut kept: Vec<Relation> = Vec::with_capacity(relations.len());
        for rel in relations {
            if rel.is_empty() {
                continue;
            }
            if kept
                .iter()
                .any(|other| rel.is_subset_of(other))
            {
                continue;
            }
            kept.retain(|other| !other.is_proper_subset_of(&rel));
            kept.push(rel);
        }
        kept.sort();
        Model { relations: kept }
    }

    /// The saturated model: a single relation spanning all variables.
    pub fn saturated(vars: &VariableList) -> Self {
        Model::new(vec![Relation::spanning(vars)])
    }

    /// The independence model: one singleton relation per variable.
    pub fn independence(vars: &VariableList) -> Self {
        Model::new((0..vars.len()).map(|i| Relation::new(vec![i])).collect())
    }

    /// Bottom reference for a directed system: all independent variables in
    /// one relation, the dependent variable alone in another.
    pub fn directed_bottom(vars: &VariableList) -> Option<Self> {
        let dv = vars.dependent_index()?;
        Some(Model::new(vec![
            Relation::new(vars.independent_indices()),
            Relation::new(vec![dv]),
        ]))
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Canonical print form: per-relation abbreviations alphabetized,
    /// relations joined by `:` in canonical order. This string is the
    /// deduplication key during search.
    pub fn name(&self, vars: &VariableList) -> String {
        let mut names: Vec<String> = self.relations.iter().map(|r| r.name(vars)).collect();
        names.sort();
        names.join(":")
    }

    /// All variables mentioned by some relation.
    pub fn scope(&self) -> Relation {
        self.relations
            .iter()
            .fold(Relation::new(vec![]), |acc, r| acc.union(r))
    }

    pub fn is_saturated(&self, vars: &VariableList) -> bool {
        self.relations.len() == 1 && self.relations[0].len() == vars.len()
    }

    pub fn is_independence(&self, vars: &VariableList) -> bool {
        self.relations.iter().all(|r| r.len() == 1) && self.scope().len() == vars.len()
    }

    /// Whether the model's constraint hypergraph has a loop, i.e. the model
    /// is not decomposable and exact inference needs IPF rather than a
    /// junction tree.
    pub fn has_loops(&self) -> bool {
        !graph::is_acyclic(self)
    }

    /// A chain: binary relations forming a single unbranched, loop-free
    /// path through every variable.
    pub fn is_chain(&self, vars: &VariableList) -> bool {
        let n = vars.len();
        if n < 2 || self.relations.len() != n - 1 {
            return false;
        }
        if !self.relations.iter().all(|r| r.len() == 2) {
            return false;
        }
        if self.scope().len() != n {
            return false;
        }
        let mut degree = vec![0usize; n];
        for rel in &self.relations {
            for p in rel.iter() {
                degree[p] += 1;
            }
        }
        degree.iter().all(|&d| d <= 2) && !self.has_loops()
    }

    /// Degrees of freedom. Saturated and independence models use their
    /// closed forms; everything else uses inclusion-exclusion truncated at
    /// second order, which overcounts by one for some loop triangles.
    pub fn degrees_of_freedom(&self, vars: &VariableList) -> f64 {
        if self.is_saturated(vars) {
            return vars.state_space() - 1.0;
        }
        if self.is_independence(vars) {
            return vars.iter().map(|v| v.cardinality as f64 - 1.0).sum();
        }
        let mut df: f64 = self
            .relations
            .iter()
            .map(|r| r.degrees_of_freedom(vars))
            .sum();
        for i in 0..self.relations.len() {
            for j in (i + 1)..self.relations.len() {
                let shared = self.relations[i].intersect(&self.relations[j]);
                df -= shared.degrees_of_freedom(vars);
            }
        }
        df
    }

    /// For a directed system, the unique relation containing the dependent
    /// variable together with at least one independent variable.
    pub fn predictive_relation(&self, vars: &VariableList) -> Option<usize> {
        let dv = vars.dependent_index()?;
        let mut found = None;
        for (i, rel) in self.relations.iter().enumerate() {
            if rel.contains(dv) && rel.len() >= 2 {
                if found.is_some() {
                    return None;
                }
                found = Some(i);
            }
        }
        found
    }
}
