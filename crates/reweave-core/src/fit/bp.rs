use super::BpConfig;
use crate::junction::JunctionTree;
use crate::relation::Relation;
use crate::table::Table;
use crate::variable::VariableList;
use reweave_error::{Error, Result};

/// Clique and separator potentials after one collect + distribute sweep.
/// For a decomposable model every clique potential then equals the true
/// marginal of its clique, so no convergence loop is needed.
#[derive(Clone, Debug)]
pub struct Calibrated {
    tree: JunctionTree,
    psi: Vec<Table>,
    phi: Vec<Option<Table>>,
}

/// Sum-product message passing on a junction tree. Potentials are seeded
/// from the observed marginals; the collect phase sweeps leaves to root in
/// post-order, the distribute phase sweeps back in pre-order.
pub fn fit(
    data: &Table,
    tree: &JunctionTree,
    vars: &VariableList,
    cfg: &BpConfig,
) -> Result<Calibrated> {
    let mut psi: Vec<Table> = tree
        .cliques()
        .iter()
        .map(|clique| data.project(vars, clique))
        .collect();
    let mut phi: Vec<Option<Table>> = (0..tree.len())
        .map(|i| tree.separator(i).map(|sep| data.project(vars, sep)))
        .collect();

    // Collect: absorb each clique into its parent.
    for &clique in tree.post_order() {
        let Some(parent) = tree.parent(clique) else {
            continue;
        };
        let separator = tree.separator(clique).cloned().ok_or_else(|| {
            Error::Internal("non-root clique without a separator".into())
        })?;
        let message = psi[clique].project(vars, &separator);
        let prior = phi[clique]
            .as_ref()
            .ok_or_else(|| Error::Internal("separator without a potential".into()))?;
        absorb(
            &mut psi,
            parent,
            tree.clique(parent),
            &message,
            prior,
            &separator,
            vars,
            cfg,
        )?;
        phi[clique] = Some(message);
    }

    // Distribute: push root beliefs back toward the leaves.
    for &clique in tree.post_order().iter().rev() {
        for &child in tree.children(clique) {
            let separator = tree.separator(child).cloned().ok_or_else(|| {
                Error::Internal("child clique without a separator".into())
            })?;
            let message = psi[clique].project(vars, &separator);
            let prior = phi[child]
                .as_ref()
                .ok_or_else(|| Error::Internal("separator without a potential".into()))?;
            absorb(
                &mut psi,
                child,
                tree.clique(child),
                &message,
                prior,
                &separator,
                vars,
                cfg,
            )?;
            phi[child] = Some(message);
        }
    }

    if cfg.normalize {
        for table in psi.iter_mut() {
            table.normalize();
        }
        for table in phi.iter_mut().flatten() {
            table.normalize();
        }
    }

    if cfg.strict {
        let broken = psi.iter().any(Table::has_numerical_issues)
            || phi.iter().flatten().any(Table::has_numerical_issues);
        if broken {
            return Err(Error::computation(
                "NaN or Inf in a calibrated potential",
            ));
        }
    }

    Ok(Calibrated {
        tree: tree.clone(),
        psi,
        phi,
    })
}

/// `psi[target] <- psi[target] * message / phi`, all over the target
/// clique's scope.
#[allow(clippy::too_many_arguments)]
fn absorb(
    psi: &mut [Table],
    target: usize,
    target_scope: &Relation,
    message: &Table,
    phi: &Table,
    separator: &Relation,
    vars: &VariableList,
    cfg: &BpConfig,
) -> Result<()> {
    let scaled = Table::multiply(&psi[target], target_scope, message, separator, vars);
    psi[target] = Table::divide(&scaled, target_scope, phi, separator, vars, cfg.strict)?;
    Ok(())
}

impl Calibrated {
    pub fn tree(&self) -> &JunctionTree {
        &self.tree
    }

    pub fn clique_potential(&self, index: usize) -> &Table {
        &self.psi[index]
    }

    /// Reconstruct the full joint `prod(psi) / prod(phi)`, normalized.
    pub fn joint(&self, vars: &VariableList) -> Result<Table> {
        let spanning = Relation::spanning(vars);

        let mut scope = self.tree.clique(0).clone();
        let mut joint = self.psi[0].clone();
        for index in 1..self.tree.len() {
            joint = Table::multiply(&joint, &scope, &self.psi[index], self.tree.clique(index), vars);
            scope = scope.union(self.tree.clique(index));
        }
        for index in 0..self.tree.len() {
            if let Some(separator) = self.tree.separator(index) {
                if separator.is_empty() {
                    continue;
                }
                let phi = self.phi[index].as_ref().ok_or_else(|| {
                    Error::Internal("separator without a potential".into())
                })?;
                joint = Table::divide(&joint, &scope, phi, separator, vars, false)?;
            }
        }

        if scope.len() < vars.len() {
            joint = joint.extended(vars, &scope, &spanning);
        }
        joint.normalize();
        Ok(joint)
    }

    /// Marginal over a variable subset. When one calibrated clique already
    /// covers the query, project just that potential; otherwise project the
    /// reconstructed joint.
    pub fn marginal(&self, vars: &VariableList, query: &Relation) -> Result<Table> {
        for (index, clique) in self.tree.cliques().iter().enumerate() {
            if query.is_subset_of(clique) {
                let mut out = self.psi[index].project(vars, query);
                out.normalize();
                return Ok(out);
            }
        }
        Ok(self.joint(vars)?.project(vars, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use crate::model::Model;

    fn three_binary() -> VariableList {
        let mut vars = VariableList::new();
        vars.push("A", "a", 2, false).unwrap();
        vars.push("B", "b", 2, false).unwrap();
        vars.push("C", "c", 2, false).unwrap();
        vars
    }

    fn chain_data(vars: &VariableList) -> Table {
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
        let mut table = Table::information(vars);
        for (states, v) in cells {
            let pairs: Vec<(usize, u32)> =
                states.iter().enumerate().map(|(i, &s)| (i, s)).collect();
            table.add(Key::build(vars, &pairs), v);
        }
        table.sort_and_combine();
        table
    }

    #[test]
    fn chain_joint_is_the_closed_form_product() {
        let vars = three_binary();
        let data = chain_data(&vars);
        let model = Model::new(vec![
            Relation::new(vec![0, 1]),
            Relation::new(vec![1, 2]),
        ]);
        let tree = JunctionTree::build(&model, &vars).unwrap();
        let calibrated = fit(&data, &tree, &vars, &BpConfig::default()).unwrap();
        let joint = calibrated.joint(&vars).unwrap();

        // p(abc) = p(ab) p(bc) / p(b)
        let p_ab = data.project(&vars, &Relation::new(vec![0, 1]));
        let p_bc = data.project(&vars, &Relation::new(vec![1, 2]));
        let p_b = data.project(&vars, &Relation::new(vec![1]));

        for (key, fitted) in joint.iter() {
            let ab = p_ab
                .get(&key.masked(&Relation::new(vec![0, 1]).mask(&vars)))
                .unwrap();
            let bc = p_bc
                .get(&key.masked(&Relation::new(vec![1, 2]).mask(&vars)))
                .unwrap();
            let b = p_b
                .get(&key.masked(&Relation::new(vec![1]).mask(&vars)))
                .unwrap();
            assert!((fitted - ab * bc / b).abs() < 1e-12);
        }
        assert!((joint.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn calibrated_cliques_hold_true_marginals() {
        let vars = three_binary();
        let data = chain_data(&vars);
        let ab = Relation::new(vec![0, 1]);
        let bc = Relation::new(vec![1, 2]);
        let model = Model::new(vec![ab.clone(), bc.clone()]);
        let tree = JunctionTree::build(&model, &vars).unwrap();
        let calibrated = fit(&data, &tree, &vars, &BpConfig::default()).unwrap();

        for relation in [&ab, &bc] {
            let target = data.project(&vars, relation);
            let marginal = calibrated.marginal(&vars, relation).unwrap();
            for (key, v) in target.iter() {
                assert!((marginal.get(key).unwrap() - v).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn disconnected_components_multiply() {
        let mut vars = VariableList::new();
        vars.push("A", "a", 2, false).unwrap();
        vars.push("B", "b", 2, false).unwrap();
        let mut data = Table::information(&vars);
        for (a, b, v) in [(0, 0, 0.4), (0, 1, 0.2), (1, 0, 0.1), (1, 1, 0.3)] {
            data.add(Key::build(&vars, &[(0, a), (1, b)]), v);
        }
        data.sort_and_combine();

        let model = Model::new(vec![Relation::new(vec![0]), Relation::new(vec![1])]);
        let tree = JunctionTree::build(&model, &vars).unwrap();
        let calibrated = fit(&data, &tree, &vars, &BpConfig::default()).unwrap();
        let joint = calibrated.joint(&vars).unwrap();

        let p_a = data.project(&vars, &Relation::new(vec![0]));
        let p_b = data.project(&vars, &Relation::new(vec![1]));
        for (key, fitted) in joint.iter() {
            let a = p_a
                .get(&key.masked(&Relation::new(vec![0]).mask(&vars)))
                .unwrap();
            let b = p_b
                .get(&key.masked(&Relation::new(vec![1]).mask(&vars)))
                .unwrap();
            assert!((fitted - a * b).abs() < 1e-12);
        }
    }
}
