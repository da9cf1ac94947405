use crate::key::KeyMask;
use crate::variable::VariableList;

/// A subset of variables, stored as a sorted vector of distinct positions
/// into a [VariableList].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Relation {
    positions: Vec<usize>,
}

impl Relation {
    pub fn new(mut positions: Vec<usize>) -> Self {
        positions.sort_unstable();
        positions.dedup();
        Relation { positions }
    }

    /// The relation spanning every variable in the list.
    pub fn spanning(vars: &VariableList) -> Self {
        Relation {
            positions: (0..vars.len()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.positions.iter().copied()
    }

    pub fn contains(&self, position: usize) -> bool {
        self.positions.binary_search(&position).is_ok()
    }

    pub fn is_subset_of(&self, other: &Relation) -> bool {
        let mut j = 0;
        for &p in &self.positions {
            while j < other.positions.len() && other.positions[j] < p {
                j += 1;
            }
            if j >= other.positions.len() || other.positions[j] != p {
                return false;
            }
            j += 1;
        }
        true
    }

    pub fn is_proper_subset_of(&self, other: &Relation) -> bool {
        self.len() < other.len() && self.is_subset_of(other)
    }

    /// Two-pointer merge intersection.
    pub fn intersect(&self, other: &Relation) -> Relation {
        let (mut i, mut j) = (0, 0);
        let mut out = Vec::new();
        while i < self.positions.len() && j < other.positions.len() {
            match self.positions[i].cmp(&other.positions[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    out.push(self.positions[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        Relation { positions: out }
    }

    /// Two-pointer merge union.
    pub fn union(&self, other: &Relation) -> Relation {
        let (mut i, mut j) = (0, 0);
        let mut out = Vec::with_capacity(self.len() + other.len());
        while i < self.positions.len() && j < other.positions.len() {
            match self.positions[i].cmp(&other.positions[j]) {
                std::cmp::Ordering::Less => {
                    out.push(self.positions[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    out.push(other.positions[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    out.push(self.positions[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        out.extend_from_slice(&self.positions[i..]);
        out.extend_from_slice(&other.positions[j..]);
        Relation { positions: out }
    }

    pub fn overlaps(&self, other: &Relation) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.positions.len() && j < other.positions.len() {
            match self.positions[i].cmp(&other.positions[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => return true,
            }
        }
        false
    }

    /// A copy with one variable removed.
    pub fn without(&self, position: usize) -> Relation {
        Relation {
            positions: self
                .positions
                .iter()
                .copied()
                .filter(|&p| p != position)
                .collect(),
        }
    }

    /// A copy with one variable added.
    pub fn with(&self, position: usize) -> Relation {
        if self.contains(position) {
            return self.clone();
        }
        let mut positions = self.positions.clone();
        positions.push(position);
        positions.sort_unstable();
        Relation { positions }
    }

    /// `prod(cardinalities) - 1`.
    pub fn degrees_of_freedom(&self, vars: &VariableList) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        vars.state_space_of(&self.positions) - 1.0
    }

    /// Concatenated abbreviations, alphabetized case-insensitively.
    pub fn name(&self, vars: &VariableList) -> String {
        let mut abbrevs: Vec<&str> = self
            .positions
            .iter()
            .map(|&p| vars.get(p).abbrev.as_str())
            .collect();
        abbrevs.sort_by_key(|a| a.to_lowercase());
        abbrevs.concat()
    }

    pub fn mask(&self, vars: &VariableList) -> KeyMask {
        KeyMask::for_positions(vars, &self.positions)
    }

    /// Whether this relation contains the dependent variable.
    pub fn has_dependent(&self, vars: &VariableList) -> bool {
        vars.dependent_index()
            .map(|dv| self.contains(dv))
            .unwrap_or(false)
    }

    /// Whether this relation is made of independent variables only.
    pub fn independent_only(&self, vars: &VariableList) -> bool {
        !self.has_dependent(vars)
    }
}
