use crate::data::Dataset;
use crate::fit::{BpConfig, FitResult, IpfConfig, bp, ipf};
use crate::junction::{JunctionTree, TreeState};
use crate::model::Model;
use crate::relation::Relation;
use crate::stats;
use crate::table::Table;
use crate::variable::VariableList;
use hashbrown::HashMap;
use reweave_error::Result;
use std::sync::Arc;
use tracing::warn;

/// Which way a search moves through the lattice: ascending adds
/// associations starting from the bottom reference, descending removes
/// them starting from the top.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SearchDirection {
    #[default]
    Ascending,
    Descending,
}

/// Routes each fit to the right algorithm and caches per-model results.
///
/// Holds only `Arc`s of the immutable inputs plus a small cache, so search
/// workers clone one per seed and work on private state; there is no
/// shared mutable state between workers.
#[derive(Clone, Debug)]
pub struct FitManager {
    vars: Arc<VariableList>,
    data: Arc<Table>,
    sample_size: f64,
    top: Model,
    bottom: Model,
    top_df: f64,
    direction: SearchDirection,
    ipf: IpfConfig,
    bp: BpConfig,
    cache: HashMap<String, FitResult>,
    bottom_t: Option<f64>,
}

impl FitManager {
    /// `table` is normalized on entry; `sample_size` is the observation
    /// count N before normalization.
    pub fn new(vars: VariableList, mut table: Table, sample_size: f64) -> Self {
        table.normalize();
        let top = Model::saturated(&vars);
        let bottom = Model::directed_bottom(&vars).unwrap_or_else(|| Model::independence(&vars));
        let top_df = top.degrees_of_freedom(&vars);
        FitManager {
            vars: Arc::new(vars),
            data: Arc::new(table),
            sample_size,
            top,
            bottom,
            top_df,
            direction: SearchDirection::default(),
            ipf: IpfConfig::default(),
            bp: BpConfig::default(),
            cache: HashMap::new(),
            bottom_t: None,
        }
    }

    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        let (vars, table, sample_size) = dataset.build()?;
        Ok(Self::new(vars, table, sample_size))
    }

    pub fn with_direction(mut self, direction: SearchDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_ipf_config(mut self, ipf: IpfConfig) -> Self {
        self.ipf = ipf;
        self
    }

    pub fn with_bp_config(mut self, bp: BpConfig) -> Self {
        self.bp = bp;
        self
    }

    pub fn ipf_config(&self) -> &IpfConfig {
        &self.ipf
    }

    pub fn ipf_config_mut(&mut self) -> &mut IpfConfig {
        &mut self.ipf
    }

    pub fn vars(&self) -> &VariableList {
        &self.vars
    }

    pub fn data(&self) -> &Table {
        &self.data
    }

    pub fn sample_size(&self) -> f64 {
        self.sample_size
    }

    pub fn direction(&self) -> SearchDirection {
        self.direction
    }

    /// The saturated reference.
    pub fn top_reference(&self) -> &Model {
        &self.top
    }

    /// The independence reference, or the IV:DV split for directed
    /// systems.
    pub fn bottom_reference(&self) -> &Model {
        &self.bottom
    }

    /// Default search seed for the current direction.
    pub fn start_model(&self) -> Model {
        match self.direction {
            SearchDirection::Ascending => self.bottom.clone(),
            SearchDirection::Descending => self.top.clone(),
        }
    }

    /// Fit a model and derive its statistics, consulting the per-manager
    /// cache first. Loopy models go to IPF; loopless models go through a
    /// junction tree to belief propagation, with a defensive IPF fallback
    /// if the tree build fails.
    pub fn fit(&mut self, model: &Model) -> Result<FitResult> {
        let name = model.name(&self.vars);
        if let Some(hit) = self.cache.get(&name) {
            return Ok(hit.clone());
        }

        let has_loops = model.has_loops();
        let (joint, iterations, error) = self.solve(model, has_loops)?;

        let h = stats::entropy(&joint);
        let t = stats::transmission(&self.data, &joint);
        let df = model.degrees_of_freedom(&self.vars);
        let ddf = self.top_df - df;
        let lr = stats::likelihood_ratio(self.sample_size, t);
        let alpha = stats::chi_square_alpha(lr, ddf);
        let pearson = stats::pearson_chi_square(&self.data, &joint, self.sample_size);
        let aic = stats::aic(lr, ddf);
        let bic = stats::bic(lr, ddf, self.sample_size);

        let bottom_t = self.bottom_transmission()?;
        let information = if bottom_t > stats::PROB_MIN {
            1.0 - t / bottom_t
        } else {
            0.0
        };

        let (dv_conditional, dv_confusion) = if self.vars.is_directed() {
            let conditional = self.conditional_dv(&joint)?;
            let confusion = self.confusion_dv(&conditional);
            (Some(conditional), Some(confusion))
        } else {
            (None, None)
        };

        let result = FitResult {
            model_name: name.clone(),
            h,
            t,
            df,
            ddf,
            lr,
            pearson,
            alpha,
            aic,
            bic,
            information,
            has_loops,
            ipf_iterations: iterations,
            ipf_error: error,
            dv_conditional,
            dv_confusion,
        };
        self.cache.insert(name, result.clone());
        Ok(result)
    }

    /// The fitted joint itself, bypassing the statistics cache.
    pub fn fitted_joint(&self, model: &Model) -> Result<Table> {
        Ok(self.solve(model, model.has_loops())?.0)
    }

    fn solve(&self, model: &Model, has_loops: bool) -> Result<(Table, usize, f64)> {
        let mut tree_state = TreeState::NotBuilt;
        if !has_loops {
            tree_state = match JunctionTree::build(model, &self.vars) {
                Ok(tree) => TreeState::Valid(tree),
                Err(err) => {
                    // Loopless models should always yield a valid tree;
                    // fall back to IPF rather than failing the fit.
                    warn!(model = %model.name(&self.vars), %err, "junction tree build failed");
                    TreeState::Invalid
                }
            };
        }
        match tree_state {
            TreeState::Valid(tree) => {
                let calibrated = bp::fit(&self.data, &tree, &self.vars, &self.bp)?;
                Ok((calibrated.joint(&self.vars)?, 0, 0.0))
            }
            TreeState::NotBuilt | TreeState::Invalid => {
                let outcome = ipf::fit(&self.data, model, &self.vars, &self.ipf)?;
                Ok((outcome.joint, outcome.iterations, outcome.error))
            }
        }
    }

    fn bottom_transmission(&mut self) -> Result<f64> {
        if let Some(t) = self.bottom_t {
            return Ok(t);
        }
        let joint = self.fitted_joint(&self.bottom.clone())?;
        let t = stats::transmission(&self.data, &joint);
        self.bottom_t = Some(t);
        Ok(t)
    }

    /// `p(DV | IVs)`: each joint cell divided by the IV margin of its own
    /// context, looked up through the masked key. `Table::divide` is not
    /// usable here: it shares the extended denominator uniformly over the
    /// missing variables, which would scale every conditional by the DV
    /// cardinality.
    fn conditional_dv(&self, joint: &Table) -> Result<Table> {
        let iv = Relation::new(self.vars.independent_indices());
        let iv_mask = iv.mask(&self.vars);
        let margin = joint.project(&self.vars, &iv);

        let mut out = Table::with_capacity(joint.kind(), joint.segments(), joint.len());
        for (key, p) in joint.iter() {
            let context = margin.get(&key.masked(&iv_mask)).unwrap_or(0.0);
            if context <= 0.0 {
                continue;
            }
            out.add(key.clone(), p / context);
        }
        out.sort_and_combine();
        Ok(out)
    }

    /// Observed-vs-predicted DV mass: in each IV context the model
    /// predicts the modal state of the fitted conditional, and each
    /// observed cell's probability lands in `[observed][predicted]`.
    fn confusion_dv(&self, conditional: &Table) -> Vec<Vec<f64>> {
        let dv = match self.vars.dependent_index() {
            Some(dv) => dv,
            None => return Vec::new(),
        };
        let dv_var = self.vars.get(dv);
        let cardinality = dv_var.cardinality;
        let iv_mask = Relation::new(self.vars.independent_indices()).mask(&self.vars);

        let mut confusion = vec![vec![0.0; cardinality]; cardinality];
        for (key, p) in self.data.iter() {
            let observed = key.get(dv_var) as usize;
            let mut context = key.masked(&iv_mask);
            let mut predicted = 0usize;
            let mut best = f64::NEG_INFINITY;
            for state in 0..cardinality {
                context.set(dv_var, state as u32);
                let q = conditional.get(&context).unwrap_or(0.0);
                if q > best {
                    best = q;
                    predicted = state;
                }
            }
            confusion[observed][predicted] += p;
        }
        confusion
    }

    pub fn ddf(&mut self, model: &Model) -> Result<f64> {
        Ok(self.fit(model)?.ddf)
    }

    pub fn aic(&mut self, model: &Model) -> Result<f64> {
        Ok(self.fit(model)?.aic)
    }

    pub fn bic(&mut self, model: &Model) -> Result<f64> {
        Ok(self.fit(model)?.bic)
    }

    pub fn entropy(&mut self, model: &Model) -> Result<f64> {
        Ok(self.fit(model)?.h)
    }

    pub fn lr(&mut self, model: &Model) -> Result<f64> {
        Ok(self.fit(model)?.lr)
    }

    pub fn df(&mut self, model: &Model) -> Result<f64> {
        Ok(self.fit(model)?.df)
    }

    pub fn information(&mut self, model: &Model) -> Result<f64> {
        Ok(self.fit(model)?.information)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;

    fn chain_manager() -> FitManager {
        let mut vars = VariableList::new();
        vars.push("A", "a", 2, false).unwrap();
        vars.push("B", "b", 2, false).unwrap();
        vars.push("C", "c", 2, false).unwrap();

        let cells = [
            ([0u32, 0, 0], 0.25),
            ([0, 0, 1], 0.05),
            ([0, 1, 0], 0.10),
            ([0, 1, 1], 0.15),
            ([1, 0, 0], 0.05),
            ([1, 0, 1], 0.10),
            ([1, 1, 0], 0.15),
            ([1, 1, 1], 0.15),
        ];
        let mut table = Table::information(&vars);
        for (states, v) in cells {
            let pairs: Vec<(usize, u32)> =
                states.iter().enumerate().map(|(i, &s)| (i, s)).collect();
            table.add(Key::build(&vars, &pairs), v);
        }
        table.sort_and_combine();
        FitManager::new(vars, table, 100.0)
    }

    #[test]
    fn saturated_fit_reproduces_the_data() {
        let mut manager = chain_manager();
        let top = manager.top_reference().clone();
        let result = manager.fit(&top).unwrap();
        assert!(result.t.abs() < 1e-12);
        assert!(result.lr.abs() < 1e-9);
        assert_eq!(result.ddf, 0.0);
        assert_eq!(result.df, 7.0);
        assert!((result.information - 1.0).abs() < 1e-9);

        let joint = manager.fitted_joint(&top).unwrap();
        let data = manager.data().clone();
        assert_eq!(joint.len(), data.len());
        for (key, v) in data.iter() {
            assert!((joint.get(key).unwrap() - v).abs() < 1e-12);
        }
    }

    #[test]
    fn bottom_fit_has_zero_information() {
        let mut manager = chain_manager();
        let bottom = manager.bottom_reference().clone();
        let result = manager.fit(&bottom).unwrap();
        assert!(result.information.abs() < 1e-12);
        assert_eq!(result.df, 3.0);
    }

    #[test]
    fn fit_entropy_never_drops_below_data_entropy() {
        let mut manager = chain_manager();
        let data_h = stats::entropy(manager.data());
        let models = [
            manager.top_reference().clone(),
            manager.bottom_reference().clone(),
            Model::new(vec![Relation::new(vec![0, 1]), Relation::new(vec![1, 2])]),
        ];
        for model in models {
            let result = manager.fit(&model).unwrap();
            assert!(result.h + 1e-12 >= data_h, "{}", result.model_name);
        }
    }

    #[test]
    fn cache_returns_identical_results() {
        let mut manager = chain_manager();
        let model = Model::new(vec![Relation::new(vec![0, 1]), Relation::new(vec![1, 2])]);
        let first = manager.fit(&model).unwrap();
        let second = manager.fit(&model).unwrap();
        assert_eq!(first.h, second.h);
        assert_eq!(first.aic, second.aic);
    }

    #[test]
    fn loopy_model_reports_ipf_iterations() {
        let mut manager = chain_manager();
        let triangle = Model::new(vec![
            Relation::new(vec![0, 1]),
            Relation::new(vec![1, 2]),
            Relation::new(vec![0, 2]),
        ]);
        let result = manager.fit(&triangle).unwrap();
        assert!(result.has_loops);
        assert!(result.ipf_iterations > 0);
    }

    #[test]
    fn directed_fit_carries_conditional_dv() {
        let mut vars = VariableList::new();
        vars.push("A", "a", 2, false).unwrap();
        vars.push("Z", "z", 2, true).unwrap();
        let mut table = Table::information(&vars);
        for (a, z, v) in [(0, 0, 0.4), (0, 1, 0.1), (1, 0, 0.2), (1, 1, 0.3)] {
            table.add(Key::build(&vars, &[(0, a), (1, z)]), v);
        }
        table.sort_and_combine();
        let mut manager = FitManager::new(vars, table, 50.0);

        let model = manager.top_reference().clone();
        let result = manager.fit(&model).unwrap();
        let conditional = result.dv_conditional.unwrap();
        // p(z=0 | a=0) = 0.4 / 0.5
        let vars = manager.vars();
        let key = Key::build(vars, &[(0, 0), (1, 0)]);
        assert!((conditional.get(&key).unwrap() - 0.8).abs() < 1e-12);

        // a=0 predicts z=0, a=1 predicts z=1; the off-diagonal mass is the
        // misclassified probability
        let confusion = result.dv_confusion.unwrap();
        assert!((confusion[0][0] - 0.4).abs() < 1e-12);
        assert!((confusion[1][0] - 0.1).abs() < 1e-12);
        assert!((confusion[0][1] - 0.2).abs() < 1e-12);
        assert!((confusion[1][1] - 0.3).abs() < 1e-12);
    }
}
