use super::{FitOutcome, IpfConfig, IpfIteration};
use crate::key::KeyMask;
use crate::model::Model;
use crate::relation::Relation;
use crate::table::Table;
use crate::variable::VariableList;
use reweave_error::{Error, Result};
use tracing::trace;

/// Cells below this are treated as empty when scaling.
const EPS: f64 = 1e-15;

/// Applied when a trial marginal is empty but the target marginal is not,
/// to drive the cell toward the target on the next sweep.
const RESCUE: f64 = 1e15;

/// Tolerated drift of the trial distribution's total mass before
/// renormalizing.
const DRIFT: f64 = 1e-10;

/// Iterative proportional fitting: cyclic scaling of a trial joint onto
/// each relation's observed marginal. Converges to the maximum-entropy
/// distribution consistent with the marginals; relation order affects the
/// trajectory but not the limit.
pub fn fit(
    data: &Table,
    model: &Model,
    vars: &VariableList,
    cfg: &IpfConfig,
) -> Result<FitOutcome> {
    let relations = model.relations();
    let spanning = Relation::spanning(vars);

    // No constraints: the maximum-entropy joint is uniform, which is the
    // orthogonal expansion of the empty marginal.
    if relations.is_empty() {
        let joint = data
            .project(vars, &Relation::new(vec![]))
            .extended(vars, &Relation::new(vec![]), &spanning);
        return Ok(exact(joint));
    }

    // A single spanning relation pins every cell.
    if relations.len() == 1 && relations[0].len() == vars.len() {
        return Ok(exact(data.clone()));
    }

    // A single partial relation needs no iteration either: its orthogonal
    // expansion already matches the one marginal.
    if relations.len() == 1 {
        let joint = data
            .project(vars, &relations[0])
            .extended(vars, &relations[0], &spanning);
        return Ok(exact(joint));
    }

    let model_name = model.name(vars);
    let masks: Vec<KeyMask> = relations.iter().map(|r| r.mask(vars)).collect();
    let targets: Vec<Table> = relations.iter().map(|r| data.project(vars, r)).collect();

    // Seed with the orthogonal expansion of the first relation's marginal.
    let mut trial = targets[0].extended(vars, &relations[0], &spanning);

    let mut error = f64::INFINITY;
    let mut previous_error = f64::INFINITY;
    let mut converged = false;
    let mut iterations = 0;

    for iteration in 1..=cfg.max_iterations {
        iterations = iteration;

        for (relation_index, relation) in relations.iter().enumerate() {
            let mask = &masks[relation_index];
            let target = &targets[relation_index];
            let trial_marginal = trial.project(vars, relation);

            for cell in 0..trial.len() {
                let projected = trial.key_at(cell).masked(mask);
                let observed = target.get(&projected).unwrap_or(0.0);
                let current = trial_marginal.get(&projected).unwrap_or(0.0);

                let factor = if current < EPS {
                    if observed > EPS { RESCUE } else { 0.0 }
                } else {
                    observed / current
                };
                let value = trial.value_at(cell) * factor;
                trial.set_value_at(cell, value);
            }
        }

        error = max_marginal_deviation(&trial, &targets, relations, vars);
        trace!(model = %model_name, iteration, error, "ipf sweep");

        converged = error < cfg.convergence_threshold
            || (previous_error - error).abs() < 0.1 * cfg.convergence_threshold;

        let report = iteration == 1
            || converged
            || iteration == cfg.max_iterations
            || (cfg.progress_interval > 0 && iteration % cfg.progress_interval == 0);
        if report {
            if let Some(sink) = &cfg.progress {
                sink(&IpfIteration {
                    model_name: model_name.clone(),
                    iteration,
                    max_iterations: cfg.max_iterations,
                    error,
                    state_count: trial.len(),
                    relation_count: relations.len(),
                    converged,
                });
            }
        }

        if converged {
            break;
        }
        previous_error = error;
    }

    if (trial.sum() - 1.0).abs() > DRIFT {
        trial.normalize();
    }

    if !converged && cfg.max_iterations > 0 && cfg.raise_on_nonconvergence {
        return Err(Error::Convergence {
            iterations,
            threshold: cfg.convergence_threshold,
            final_error: error,
        });
    }

    Ok(FitOutcome {
        joint: trial,
        iterations,
        error: if iterations == 0 { 0.0 } else { error },
        converged,
    })
}

fn exact(joint: Table) -> FitOutcome {
    FitOutcome {
        joint,
        iterations: 0,
        error: 0.0,
        converged: true,
    }
}

/// `max over relations R and tuples t of project(data, R) of
/// |project(data, R)[t] - project(trial, R)[t]|`.
fn max_marginal_deviation(
    trial: &Table,
    targets: &[Table],
    relations: &[Relation],
    vars: &VariableList,
) -> f64 {
    let mut worst: f64 = 0.0;
    for (target, relation) in targets.iter().zip(relations) {
        let trial_marginal = trial.project(vars, relation);
        for (key, observed) in target.iter() {
            let fitted = trial_marginal.get(key).unwrap_or(0.0);
            worst = worst.max((observed - fitted).abs());
        }
    }
    worst
}
