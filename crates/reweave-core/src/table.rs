use crate::key::Key;
use crate::relation::Relation;
use crate::variable::VariableList;
use hashbrown::HashMap;
use reweave_error::{Error, Result};

/// What the values of a table mean.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TableKind {
    /// Probabilities or frequencies, expected to sum to 1 after
    /// normalization.
    #[default]
    Information,
    /// 0/1 presence.
    SetTheoretic,
}

/// An ordered sequence of `(key, value)` tuples, sorted lexicographically
/// by segment array. Built by accumulating `add` calls and collapsed once
/// with [Table::sort_and_combine] before use; every operation that
/// produces a table returns it already sorted.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    kind: TableKind,
    segments: usize,
    tuples: Vec<(Key, f64)>,
}

impl Table {
    pub fn new(kind: TableKind, segments: usize) -> Self {
        Table {
            kind,
            segments,
            tuples: Vec::new(),
        }
    }

    pub fn information(vars: &VariableList) -> Self {
        Table::new(TableKind::Information, vars.segments())
    }

    pub fn with_capacity(kind: TableKind, segments: usize, capacity: usize) -> Self {
        Table {
            kind,
            segments,
            tuples: Vec::with_capacity(capacity),
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn segments(&self) -> usize {
        self.segments
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Append a tuple. Cheap during construction; call
    /// [Table::sort_and_combine] once after the last `add`.
    pub fn add(&mut self, key: Key, value: f64) {
        self.tuples.push((key, value));
    }

    /// Lexicographically sort tuples and merge equal keys by summing
    /// values.
    pub fn sort_and_combine(&mut self) {
        self.tuples.sort_by(|a, b| a.0.cmp(&b.0));
        let mut out: Vec<(Key, f64)> = Vec::with_capacity(self.tuples.len());
        for (key, value) in self.tuples.drain(..) {
            match out.last_mut() {
                Some((last, acc)) if *last == key => *acc += value,
                _ => out.push((key, value)),
            }
        }
        self.tuples = out;
    }

    /// Binary search for a key.
    pub fn find(&self, key: &Key) -> Option<usize> {
        self.tuples.binary_search_by(|(k, _)| k.cmp(key)).ok()
    }

    pub fn get(&self, key: &Key) -> Option<f64> {
        self.find(key).map(|i| self.tuples[i].1)
    }

    pub fn key_at(&self, index: usize) -> &Key {
        &self.tuples[index].0
    }

    pub fn value_at(&self, index: usize) -> f64 {
        self.tuples[index].1
    }

    pub fn set_value_at(&mut self, index: usize, value: f64) {
        self.tuples[index].1 = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Key, f64)> {
        self.tuples.iter()
    }

    pub fn sum(&self) -> f64 {
        self.tuples.iter().map(|(_, v)| v).sum()
    }

    /// Scale so the values sum to 1. No-op when the sum is 0 or already 1.
    /// Returns the sum before scaling.
    pub fn normalize(&mut self) -> f64 {
        let total = self.sum();
        if total > 0.0 && (total - 1.0).abs() > f64::EPSILON {
            for (_, v) in self.tuples.iter_mut() {
                *v /= total;
            }
        }
        total
    }

    /// Project onto a relation: mask each key so bits outside the relation
    /// are zeroed, then sum tuples that collapse onto the same masked key.
    /// Projecting onto the empty relation yields the scalar table with a
    /// single all-zero key holding `sum()`.
    pub fn project(&self, vars: &VariableList, relation: &Relation) -> Table {
        let mask = relation.mask(vars);
        let mut grouped: HashMap<Key, f64> = HashMap::with_capacity(self.tuples.len());
        for (key, value) in &self.tuples {
            *grouped.entry(key.masked(&mask)).or_insert(0.0) += *value;
        }
        if relation.is_empty() && grouped.is_empty() {
            grouped.insert(Key::with_segments(self.segments), 0.0);
        }
        let mut out = Table::with_capacity(self.kind, self.segments, grouped.len());
        for (key, value) in grouped {
            out.tuples.push((key, value));
        }
        out.tuples.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Expand a table defined on `src` to the superset `dst` by
    /// cross-producting with uniform weights over the added variables, so
    /// that projecting back onto `src` is the identity.
    pub fn extended(&self, vars: &VariableList, src: &Relation, dst: &Relation) -> Table {
        let added: Vec<usize> = dst.iter().filter(|p| !src.contains(*p)).collect();
        if added.is_empty() {
            return self.clone();
        }
        let added_states = vars.state_space_of(&added);
        let mut out =
            Table::with_capacity(self.kind, self.segments, self.tuples.len() * added_states as usize);
        let mut assignment = vec![0u32; added.len()];
        for (key, value) in &self.tuples {
            let share = value / added_states;
            loop {
                let mut expanded = key.clone();
                for (slot, &p) in added.iter().enumerate() {
                    expanded.set(vars.get(p), assignment[slot]);
                }
                out.tuples.push((expanded, share));

                // odometer over the added variables
                let mut slot = 0;
                loop {
                    if slot == added.len() {
                        break;
                    }
                    assignment[slot] += 1;
                    if (assignment[slot] as usize) < vars.get(added[slot]).cardinality {
                        break;
                    }
                    assignment[slot] = 0;
                    slot += 1;
                }
                if assignment.iter().all(|&v| v == 0) {
                    break;
                }
            }
        }
        out.sort_and_combine();
        out
    }

    /// Elementwise product of two tables defined over (possibly different)
    /// variable sets; both are first extended to the union of their
    /// scopes. Keys absent from either side contribute nothing.
    pub fn multiply(
        a: &Table,
        a_scope: &Relation,
        b: &Table,
        b_scope: &Relation,
        vars: &VariableList,
    ) -> Table {
        let joint_scope = a_scope.union(b_scope);
        let lhs = a.extended(vars, a_scope, &joint_scope);
        let rhs = b.extended(vars, b_scope, &joint_scope);

        let mut out = Table::with_capacity(lhs.kind, lhs.segments, lhs.len().min(rhs.len()));
        let (mut i, mut j) = (0, 0);
        while i < lhs.tuples.len() && j < rhs.tuples.len() {
            match lhs.tuples[i].0.cmp(&rhs.tuples[j].0) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    let product = lhs.tuples[i].1 * rhs.tuples[j].1;
                    if product != 0.0 {
                        out.tuples.push((lhs.tuples[i].0.clone(), product));
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        out
    }

    /// Elementwise quotient over the union scope. A zero (or absent)
    /// denominator yields 0 when the numerator is also 0; a non-zero
    /// numerator over a zero denominator yields 0, or an error in strict
    /// mode.
    pub fn divide(
        a: &Table,
        a_scope: &Relation,
        b: &Table,
        b_scope: &Relation,
        vars: &VariableList,
        strict: bool,
    ) -> Result<Table> {
        const DIV_MIN: f64 = 1e-300;

        let joint_scope = a_scope.union(b_scope);
        let lhs = a.extended(vars, a_scope, &joint_scope);
        let rhs = b.extended(vars, b_scope, &joint_scope);

        let mut out = Table::with_capacity(lhs.kind, lhs.segments, lhs.len());
        for (key, num) in &lhs.tuples {
            let den = rhs.get(key).unwrap_or(0.0);
            if den.abs() < DIV_MIN {
                if *num != 0.0 && strict {
                    return Err(Error::computation(format!(
                        "division by zero: numerator {num} over empty cell"
                    )));
                }
                continue;
            }
            out.tuples.push((key.clone(), num / den));
        }
        Ok(out)
    }

    /// Whether any value is NaN or infinite.
    pub fn has_numerical_issues(&self) -> bool {
        self.tuples.iter().any(|(_, v)| !v.is_finite())
    }
}
