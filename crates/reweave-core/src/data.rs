use crate::key::Key;
use crate::table::Table;
use crate::variable::VariableList;
use reweave_error::{Error, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One variable of an incoming dataset.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VariableSpec {
    pub name: String,
    pub abbrev: String,
    pub cardinality: usize,
    pub dependent: bool,
    pub labels: Option<Vec<String>>,
}

/// Normalized input data: ordered variable specs, integer-valued rows
/// (each of length equal to the variable count, values in
/// `[0, cardinality)`), and a parallel sequence of non-negative counts.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dataset {
    pub name: String,
    pub variables: Vec<VariableSpec>,
    pub rows: Vec<Vec<usize>>,
    pub counts: Vec<f64>,
}

impl Dataset {
    /// Validate and convert to a variable list plus a normalized
    /// contingency table. Returns the sample size N (the count total
    /// before normalization) alongside.
    pub fn build(&self) -> Result<(VariableList, Table, f64)> {
        let mut vars = VariableList::new();
        for spec in &self.variables {
            vars.push_labeled(
                spec.name.clone(),
                spec.abbrev.clone(),
                spec.cardinality,
                spec.dependent,
                spec.labels.clone(),
            )?;
        }

        if self.rows.len() != self.counts.len() {
            return Err(Error::validation(format!(
                "dataset '{}': {} rows but {} counts",
                self.name,
                self.rows.len(),
                self.counts.len()
            )));
        }

        let mut table = Table::with_capacity(Default::default(), vars.segments(), self.rows.len());
        let mut sample_size = 0.0;
        for (row_index, (row, &count)) in self.rows.iter().zip(&self.counts).enumerate() {
            if row.len() != vars.len() {
                return Err(Error::validation(format!(
                    "dataset '{}': row {} has {} values, expected {}",
                    self.name,
                    row_index,
                    row.len(),
                    vars.len()
                )));
            }
            if count < 0.0 {
                return Err(Error::validation(format!(
                    "dataset '{}': row {} has negative count {}",
                    self.name, row_index, count
                )));
            }
            let mut key = Key::zeroed(&vars);
            for (position, &value) in row.iter().enumerate() {
                let var = vars.get(position);
                if value >= var.cardinality {
                    return Err(Error::validation(format!(
                        "dataset '{}': row {} has value {} for variable '{}' of cardinality {}",
                        self.name, row_index, value, var.abbrev, var.cardinality
                    )));
                }
                key.set(var, value as u32);
            }
            table.add(key, count);
            sample_size += count;
        }

        table.sort_and_combine();
        table.normalize();
        Ok((vars, table, sample_size))
    }
}
