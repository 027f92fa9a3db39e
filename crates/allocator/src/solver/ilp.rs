//! Integer linear program over admitted (room, request) pairs, solved with
//! HiGHS through `good_lp`. Stands in for the original CP-SAT model; `good_lp`
//! has no CP-SAT-style `num_search_workers`/`random_seed` knobs, so
//! `config.cp_sat_workers`/`solver_random_seed` are accepted for call-site
//! parity but only `solver_max_time_seconds` is actually honoured here.

use good_lp::{Expression, Solution, SolverModel, constraint, variable, variables};
use good_lp::solvers::highs::highs;

use room_allocator_domain::AllocationConfig;

use crate::pruning::AdmittedPair;

/// Mirrors [`crate::solver::greedy::GreedySelection`] so both backends feed
/// the same result-assembly code.
pub struct IlpSelection {
    pub pair_index: usize,
    pub score: f64,
}

/// Builds and solves the assignment ILP. Returns an empty vector when there
/// is nothing to admit, or when the solver reports infeasibility/timeout —
/// callers log that distinction, this function just returns the result shape.
pub fn solve(admitted: &[AdmittedPair], config: &AllocationConfig) -> Vec<IlpSelection> {
    if admitted.is_empty() {
        return Vec::new();
    }

    let mut vars = variables!();
    let pair_vars: Vec<good_lp::Variable> = admitted.iter().map(|_| vars.add(variable().binary())).collect();
    let total_assigned_var = vars.add(variable().min(0.0).max(admitted.len() as f64));

    let objective: Expression = admitted
        .iter()
        .zip(pair_vars.iter())
        .map(|(pair, &var)| var * pair.score_scaled as f64)
        .sum();

    let mut problem = vars.maximise(objective).using(highs).set_time_limit(config.solver_max_time_seconds);

    for request_id in distinct(admitted.iter().map(|p| p.request_id)) {
        let indices = indices_for(admitted, |p| p.request_id == request_id);
        let total: Expression = indices.iter().map(|&i| pair_vars[i]).sum();
        problem = problem.with(constraint!(total <= 1));
    }
    for room_id in distinct(admitted.iter().map(|p| p.room_id)) {
        let indices = indices_for(admitted, |p| p.room_id == room_id);
        let total: Expression = indices.iter().map(|&i| pair_vars[i]).sum();
        problem = problem.with(constraint!(total <= 1));
    }

    let total_sum: Expression = pair_vars.iter().copied().sum();
    problem = problem.with(constraint!(total_assigned_var == total_sum));

    let cap_scaled = (config.stakeholder_usage_cap * config.objective_scale).round();
    for stakeholder in distinct(admitted.iter().map(|p| p.stakeholder_id.clone())) {
        let indices = indices_for(admitted, |p| p.stakeholder_id == stakeholder);
        let stakeholder_scaled_sum: Expression = indices.iter().map(|&i| pair_vars[i] * config.objective_scale).sum();
        let cap_term: Expression = total_assigned_var * cap_scaled;
        problem = problem.with(constraint!(stakeholder_scaled_sum <= cap_term));
    }

    let solution = match problem.solve() {
        Ok(solution) => solution,
        Err(err) => {
            tracing::warn!(error = %err, "allocation ILP solve failed, returning empty allocations");
            return Vec::new();
        }
    };

    admitted
        .iter()
        .zip(pair_vars.iter())
        .enumerate()
        .filter(|(_, (_, &var))| solution.value(var) > 0.5)
        .map(|(index, (pair, _))| IlpSelection {
            pair_index: index,
            score: pair.score_scaled as f64 / config.objective_scale,
        })
        .collect()
}

fn distinct<T: Ord, I: IntoIterator<Item = T>>(items: I) -> Vec<T> {
    let mut values: Vec<T> = items.into_iter().collect();
    values.sort();
    values.dedup();
    values
}

fn indices_for(admitted: &[AdmittedPair], predicate: impl Fn(&AdmittedPair) -> bool) -> Vec<usize> {
    admitted
        .iter()
        .enumerate()
        .filter(|(_, pair)| predicate(pair))
        .map(|(index, _)| index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AllocationConfig {
        AllocationConfig {
            idle_probability_threshold: 0.5,
            stakeholder_usage_cap: 1.0,
            solver_max_time_seconds: 5.0,
            solver_random_seed: 42,
            objective_scale: 1000.0,
            cp_sat_workers: 1,
        }
    }

    fn pair(room_id: i64, request_id: i64, stakeholder: &str, score_scaled: i64) -> AdmittedPair {
        AdmittedPair {
            room_id,
            request_id,
            stakeholder_id: stakeholder.to_string(),
            priority_weight: 1.0,
            idle_probability: 0.9,
            score_scaled,
        }
    }

    #[test]
    fn empty_admitted_pairs_yields_empty_selection() {
        assert!(solve(&[], &config()).is_empty());
    }

    #[test]
    fn single_pair_is_selected() {
        let admitted = vec![pair(1, 1, "dept_a", 900)];
        let selections = solve(&admitted, &config());
        assert_eq!(selections.len(), 1);
        assert_eq!(selections[0].score, 0.9);
    }

    #[test]
    fn request_exclusivity_is_enforced() {
        let admitted = vec![pair(1, 1, "dept_a", 900), pair(2, 1, "dept_a", 950)];
        let selections = solve(&admitted, &config());
        assert_eq!(selections.len(), 1);
        assert_eq!(admitted[selections[0].pair_index].room_id, 2);
    }
}
