use hashbrown::HashSet;
use reweave_core::{InteractionGraph, Model, Relation, SearchDirection, VariableList};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which slice of the model lattice a search walks through. A closed set
/// of strategies, dispatched by tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SearchFilter {
    /// Only decomposable models.
    Loopless,
    /// Loopy models allowed; pairwise relations may also be added.
    Full,
    /// Relations may not share variables.
    Disjoint,
    /// All linear orderings of the variables, generated once.
    Chain,
}

impl SearchFilter {
    /// Successor models of `seed`, canonicalized and deduplicated by
    /// name. Pure in its inputs, so workers can call it concurrently.
    pub fn neighbors(
        &self,
        seed: &Model,
        vars: &VariableList,
        direction: SearchDirection,
    ) -> Vec<Model> {
        let candidates = match (self, vars.is_directed()) {
            (SearchFilter::Loopless, false) => neutral_candidates(seed, vars, direction, true),
            (SearchFilter::Loopless, true) => directed_candidates(seed, vars, direction, true),
            (SearchFilter::Full, false) => neutral_candidates(seed, vars, direction, false),
            (SearchFilter::Full, true) => directed_candidates(seed, vars, direction, false),
            (SearchFilter::Disjoint, _) => disjoint_candidates(seed, direction),
            (SearchFilter::Chain, _) => generate_all_chains(vars),
        };
        dedup_by_name(candidates, vars)
    }
}

fn dedup_by_name(candidates: Vec<Model>, vars: &VariableList) -> Vec<Model> {
    let mut seen: HashSet<String> = HashSet::with_capacity(candidates.len());
    let mut out = Vec::with_capacity(candidates.len());
    for model in candidates {
        if seen.insert(model.name(vars)) {
            out.push(model);
        }
    }
    out
}

/// Neutral-system moves. Ascending joins the containing relations of a
/// not-yet-associated pair; descending is Krippendorff's split of a
/// relation along one of its pairs. `loop_check` keeps only decomposable
/// results.
fn neutral_candidates(
    seed: &Model,
    vars: &VariableList,
    direction: SearchDirection,
    loop_check: bool,
) -> Vec<Model> {
    match direction {
        SearchDirection::Ascending => {
            let graph = InteractionGraph::from_model(seed, vars);
            let mut out = Vec::new();
            for (a, b) in graph.unlinked_pairs() {
                for &ra in &InteractionGraph::relations_containing(seed, a) {
                    for &rb in &InteractionGraph::relations_containing(seed, b) {
                        if ra == rb {
                            continue;
                        }
                        let merged = seed.relations()[ra].union(&seed.relations()[rb]);
                        let candidate = replace_two(seed, ra, rb, merged);
                        if !loop_check || !candidate.has_loops() {
                            out.push(candidate);
                        }
                    }
                }
                if !loop_check {
                    // a brand-new pairwise relation is also a legal step up
                    let mut relations = seed.relations().to_vec();
                    relations.push(Relation::new(vec![a, b]));
                    out.push(Model::new(relations));
                }
            }
            out
        }
        SearchDirection::Descending => {
            let mut out = Vec::new();
            let n = vars.len();
            for a in 0..n {
                for b in (a + 1)..n {
                    let holders = InteractionGraph::relations_with_pair(seed, a, b);
                    if holders.len() != 1 {
                        continue;
                    }
                    let target = holders[0];
                    if seed.relations()[target].len() < 3 {
                        continue;
                    }
                    let split_a = seed.relations()[target].without(a);
                    let split_b = seed.relations()[target].without(b);
                    let mut relations: Vec<Relation> = seed
                        .relations()
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != target)
                        .map(|(_, r)| r.clone())
                        .collect();
                    relations.push(split_a);
                    relations.push(split_b);
                    let candidate = Model::new(relations);
                    if !loop_check || !candidate.has_loops() {
                        out.push(candidate);
                    }
                }
            }
            out
        }
    }
}

/// Directed-system moves grow or shrink the predictive relation (the one
/// holding the dependent variable) one independent variable at a time.
fn directed_candidates(
    seed: &Model,
    vars: &VariableList,
    direction: SearchDirection,
    loop_check: bool,
) -> Vec<Model> {
    let Some(dv) = vars.dependent_index() else {
        return Vec::new();
    };
    let holders = InteractionGraph::relations_containing(seed, dv);
    let Some(&target) = holders.first() else {
        return Vec::new();
    };
    if holders.len() > 1 {
        return Vec::new();
    }
    let predictive = &seed.relations()[target];

    let mut out = Vec::new();
    match direction {
        SearchDirection::Ascending => {
            for iv in vars.independent_indices() {
                if predictive.contains(iv) {
                    continue;
                }
                let candidate = replace_one(seed, target, predictive.with(iv));
                if !loop_check || !candidate.has_loops() {
                    out.push(candidate);
                }
            }
        }
        SearchDirection::Descending => {
            if predictive.len() < 2 {
                return Vec::new();
            }
            for iv in predictive.iter().filter(|&p| p != dv).collect::<Vec<_>>() {
                let candidate = replace_one(seed, target, predictive.without(iv));
                if !loop_check || !candidate.has_loops() {
                    out.push(candidate);
                }
            }
        }
    }
    out
}

/// Disjoint moves: merge two whole relations, or split one into a
/// singleton plus the rest. Candidates that stop being disjoint are
/// dropped.
fn disjoint_candidates(seed: &Model, direction: SearchDirection) -> Vec<Model> {
    let mut out = Vec::new();
    match direction {
        SearchDirection::Ascending => {
            for i in 0..seed.len() {
                for j in (i + 1)..seed.len() {
                    let merged = seed.relations()[i].union(&seed.relations()[j]);
                    let candidate = replace_two(seed, i, j, merged);
                    if is_disjoint(&candidate) {
                        out.push(candidate);
                    }
                }
            }
        }
        SearchDirection::Descending => {
            for (index, relation) in seed.relations().iter().enumerate() {
                if relation.len() < 2 {
                    continue;
                }
                for v in relation.iter() {
                    let mut relations: Vec<Relation> = seed
                        .relations()
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != index)
                        .map(|(_, r)| r.clone())
                        .collect();
                    relations.push(Relation::new(vec![v]));
                    relations.push(relation.without(v));
                    let candidate = Model::new(relations);
                    if is_disjoint(&candidate) {
                        out.push(candidate);
                    }
                }
            }
        }
    }
    out
}

fn is_disjoint(model: &Model) -> bool {
    let relations = model.relations();
    for i in 0..relations.len() {
        for j in (i + 1)..relations.len() {
            if relations[i].overlaps(&relations[j]) {
                return false;
            }
        }
    }
    true
}

fn replace_one(seed: &Model, index: usize, replacement: Relation) -> Model {
    let mut relations: Vec<Relation> = seed
        .relations()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, r)| r.clone())
        .collect();
    relations.push(replacement);
    Model::new(relations)
}

fn replace_two(seed: &Model, first: usize, second: usize, replacement: Relation) -> Model {
    let mut relations: Vec<Relation> = seed
        .relations()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != first && *i != second)
        .map(|(_, r)| r.clone())
        .collect();
    relations.push(replacement);
    Model::new(relations)
}

/// Every linear ordering of the variables as a chain model, via Heap's
/// algorithm, with a chain and its reverse counted once. The output order
/// is deterministic: calling this twice gives the same list.
pub fn generate_all_chains(vars: &VariableList) -> Vec<Model> {
    let n = vars.len();
    if n < 2 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut stack = vec![0usize; n];
    let mut orderings: Vec<Vec<usize>> = vec![order.clone()];

    // Heap's algorithm, iterative form
    let mut i = 1;
    while i < n {
        if stack[i] < i {
            if i % 2 == 0 {
                order.swap(0, i);
            } else {
                order.swap(stack[i], i);
            }
            orderings.push(order.clone());
            stack[i] += 1;
            i = 1;
        } else {
            stack[i] = 0;
            i += 1;
        }
    }

    let mut seen: HashSet<Vec<usize>> = HashSet::with_capacity(orderings.len());
    let mut out = Vec::with_capacity(orderings.len() / 2);
    for ordering in orderings {
        let reversed: Vec<usize> = ordering.iter().rev().copied().collect();
        if seen.contains(&reversed) {
            continue;
        }
        if !seen.insert(ordering.clone()) {
            continue;
        }
        let relations = ordering
            .windows(2)
            .map(|pair| Relation::new(pair.to_vec()))
            .collect();
        out.push(Model::new(relations));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_vars(n: usize) -> VariableList {
        let mut vars = VariableList::new();
        for i in 0..n {
            let ab = (b'a' + i as u8) as char;
            vars.push(ab.to_uppercase().to_string(), ab.to_string(), 2, false)
                .unwrap();
        }
        vars
    }

    #[test]
    fn loopless_ascent_from_independence() {
        let vars = binary_vars(3);
        let seed = Model::independence(&vars);
        let neighbors =
            SearchFilter::Loopless.neighbors(&seed, &vars, SearchDirection::Ascending);
        let names: Vec<String> = neighbors.iter().map(|m| m.name(&vars)).collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"ab:c".to_string()));
        assert!(names.contains(&"ac:b".to_string()));
        assert!(names.contains(&"a:bc".to_string()));
        for model in &neighbors {
            assert!(!model.has_loops());
        }
    }

    #[test]
    fn loopless_ascent_excludes_loopy_results() {
        let vars = binary_vars(3);
        // ab:bc, where joining a and c would close the triangle
        let seed = Model::new(vec![Relation::new(vec![0, 1]), Relation::new(vec![1, 2])]);
        let neighbors =
            SearchFilter::Loopless.neighbors(&seed, &vars, SearchDirection::Ascending);
        for model in &neighbors {
            assert!(!model.has_loops(), "loopy candidate {}", model.name(&vars));
        }
        // the only loopless join replaces both pairs with a triple
        assert!(
            neighbors
                .iter()
                .any(|m| m.name(&vars) == "abc")
        );
    }

    #[test]
    fn krippendorff_descent_splits_triples() {
        let vars = binary_vars(3);
        let seed = Model::saturated(&vars);
        let neighbors =
            SearchFilter::Loopless.neighbors(&seed, &vars, SearchDirection::Descending);
        let names: Vec<String> = neighbors.iter().map(|m| m.name(&vars)).collect();
        // dropping each pair of abc
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"ab:ac".to_string()));
        assert!(names.contains(&"ab:bc".to_string()));
        assert!(names.contains(&"ac:bc".to_string()));
    }

    #[test]
    fn full_ascent_adds_new_pairwise_relations() {
        let vars = binary_vars(3);
        let seed = Model::new(vec![Relation::new(vec![0, 1]), Relation::new(vec![1, 2])]);
        let neighbors = SearchFilter::Full.neighbors(&seed, &vars, SearchDirection::Ascending);
        // the triangle is reachable under the full filter
        assert!(
            neighbors
                .iter()
                .any(|m| m.name(&vars) == "ab:ac:bc")
        );
        assert!(neighbors.iter().any(|m| m.has_loops()));
    }

    #[test]
    fn disjoint_moves_stay_disjoint() {
        let vars = binary_vars(4);
        let seed = Model::new(vec![Relation::new(vec![0, 1]), Relation::new(vec![2, 3])]);
        let up = SearchFilter::Disjoint.neighbors(&seed, &vars, SearchDirection::Ascending);
        assert_eq!(up.len(), 1);
        assert_eq!(up[0].name(&vars), "abcd");

        let down = SearchFilter::Disjoint.neighbors(&seed, &vars, SearchDirection::Descending);
        for model in &down {
            assert!(is_disjoint(model));
        }
        // each binary relation splits into singletons one way
        assert!(down.iter().any(|m| m.name(&vars) == "a:b:cd"));
        assert!(down.iter().any(|m| m.name(&vars) == "ab:c:d"));
    }

    #[test]
    fn four_variable_chains_number_twelve() {
        let vars = binary_vars(4);
        let chains = generate_all_chains(&vars);
        assert_eq!(chains.len(), 12);

        // idempotent: a second call gives the same list in the same order
        let again = generate_all_chains(&vars);
        let names: Vec<String> = chains.iter().map(|m| m.name(&vars)).collect();
        let names_again: Vec<String> = again.iter().map(|m| m.name(&vars)).collect();
        assert_eq!(names, names_again);

        // all distinct and all genuine chains
        let unique: HashSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), 12);
        for chain in &chains {
            assert!(chain.is_chain(&vars));
        }
    }

    #[test]
    fn directed_ascent_grows_the_predictive_relation() {
        let mut vars = VariableList::new();
        vars.push("A", "a", 2, false).unwrap();
        vars.push("B", "b", 2, false).unwrap();
        vars.push("Z", "z", 2, true).unwrap();

        let seed = Model::directed_bottom(&vars).unwrap();
        let neighbors =
            SearchFilter::Loopless.neighbors(&seed, &vars, SearchDirection::Ascending);
        let names: Vec<String> = neighbors.iter().map(|m| m.name(&vars)).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"ab:az".to_string()));
        assert!(names.contains(&"ab:bz".to_string()));

        // and back down again
        let up = &neighbors[0];
        let down = SearchFilter::Loopless.neighbors(up, &vars, SearchDirection::Descending);
        assert!(down.iter().any(|m| m.name(&vars) == seed.name(&vars)));
    }
}
