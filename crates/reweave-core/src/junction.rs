use crate::model::Model;
use crate::relation::Relation;
use crate::variable::VariableList;
use reweave_error::{Error, Result};

/// Build progress for a model handed to the fit manager. `Invalid`
/// forces IPF; `Valid` enables belief propagation.
#[derive(Clone, Debug, Default)]
pub enum TreeState {
    #[default]
    NotBuilt,
    Valid(JunctionTree),
    Invalid,
}

/// A junction tree (forest, for disconnected models) over a decomposable
/// model: nodes are the model's relations (cliques), each non-root node
/// carries the separator to its parent. Stored as parallel arrays indexed
/// by clique number; parent pointers, children lists, roots, and a
/// post-order listing are all precomputed.
#[derive(Clone, Debug)]
pub struct JunctionTree {
    cliques: Vec<Relation>,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    separators: Vec<Option<Relation>>,
    roots: Vec<usize>,
    post_order: Vec<usize>,
}

impl JunctionTree {
    /// Build a maximum-cardinality junction tree for the model's relations
    /// and verify the running intersection property. RIP failure means the
    /// input was not decomposable; the caller falls back to IPF.
    pub fn build(model: &Model, vars: &VariableList) -> Result<JunctionTree> {
        let cliques: Vec<Relation> = model.relations().to_vec();
        let n = cliques.len();
        if n == 0 {
            return Err(Error::JunctionTree("model has no relations".into()));
        }

        // Kruskal over the intersection-weight multigraph; ties broken by
        // insertion order via the stable sort.
        let mut edges: Vec<(usize, usize, usize)> = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let weight = cliques[i].intersect(&cliques[j]).len();
                if weight > 0 {
                    edges.push((weight, i, j));
                }
            }
        }
        edges.sort_by(|a, b| b.0.cmp(&a.0));

        let mut component: Vec<usize> = (0..n).collect();
        fn find(component: &mut Vec<usize>, x: usize) -> usize {
            let mut root = x;
            while component[root] != root {
                root = component[root];
            }
            let mut cursor = x;
            while component[cursor] != root {
                let next = component[cursor];
                component[cursor] = root;
                cursor = next;
            }
            root
        }

        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (_, i, j) in edges {
            let (ri, rj) = (find(&mut component, i), find(&mut component, j));
            if ri != rj {
                component[ri] = rj;
                adjacency[i].push(j);
                adjacency[j].push(i);
            }
        }

        // Orient away from the lowest-numbered clique of each component.
        let mut parent: Vec<Option<usize>> = vec![None; n];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut visited = vec![false; n];
        let mut roots = Vec::new();
        let mut post_order = Vec::with_capacity(n);

        for start in 0..n {
            if visited[start] {
                continue;
            }
            roots.push(start);
            // iterative DFS emitting children before parents
            let mut stack = vec![(start, false)];
            visited[start] = true;
            while let Some((node, expanded)) = stack.pop() {
                if expanded {
                    post_order.push(node);
                    continue;
                }
                stack.push((node, true));
                for &next in &adjacency[node] {
                    if !visited[next] {
                        visited[next] = true;
                        parent[next] = Some(node);
                        children[node].push(next);
                        stack.push((next, false));
                    }
                }
            }
        }

        let separators: Vec<Option<Relation>> = (0..n)
            .map(|i| parent[i].map(|p| cliques[i].intersect(&cliques[p])))
            .collect();

        let tree = JunctionTree {
            cliques,
            parent,
            children,
            separators,
            roots,
            post_order,
        };
        tree.verify_rip(vars)?;
        Ok(tree)
    }

    /// Running intersection property: for every variable, the cliques
    /// containing it must form a connected subtree.
    fn verify_rip(&self, vars: &VariableList) -> Result<()> {
        for v in 0..vars.len() {
            let holders: Vec<usize> = (0..self.cliques.len())
                .filter(|&c| self.cliques[c].contains(v))
                .collect();
            if holders.len() <= 1 {
                continue;
            }
            let internal_edges = holders
                .iter()
                .filter(|&&c| {
                    self.parent[c]
                        .map(|p| self.cliques[p].contains(v))
                        .unwrap_or(false)
                })
                .count();
            if internal_edges != holders.len() - 1 {
                return Err(Error::JunctionTree(format!(
                    "running intersection property violated for variable '{}': \
                     {} cliques contain it but only {} tree edges connect them",
                    vars.get(v).abbrev,
                    holders.len(),
                    internal_edges
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cliques.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cliques.is_empty()
    }

    pub fn clique(&self, index: usize) -> &Relation {
        &self.cliques[index]
    }

    pub fn cliques(&self) -> &[Relation] {
        &self.cliques
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parent[index]
    }

    pub fn children(&self, index: usize) -> &[usize] {
        &self.children[index]
    }

    /// Separator between a non-root clique and its parent.
    pub fn separator(&self, index: usize) -> Option<&Relation> {
        self.separators[index].as_ref()
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Children-before-parent ordering covering every component.
    pub fn post_order(&self) -> &[usize] {
        &self.post_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(n: usize) -> VariableList {
        let mut list = VariableList::new();
        for i in 0..n {
            let ab = (b'a' + i as u8) as char;
            list.push(ab.to_uppercase().to_string(), ab.to_string(), 2, false)
                .unwrap();
        }
        list
    }

    #[test]
    fn chain_tree_structure() {
        let list = vars(4);
        let model = Model::new(vec![
            Relation::new(vec![0, 1]),
            Relation::new(vec![1, 2]),
            Relation::new(vec![2, 3]),
        ]);
        let tree = JunctionTree::build(&model, &list).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.roots(), &[0]);
        // every non-root separator has exactly one variable
        for i in 0..tree.len() {
            if tree.parent(i).is_some() {
                assert_eq!(tree.separator(i).unwrap().len(), 1);
            }
        }
        // post-order visits children before parents
        let order = tree.post_order();
        assert_eq!(order.len(), 3);
        for (rank, &node) in order.iter().enumerate() {
            if let Some(p) = tree.parent(node) {
                let parent_rank = order.iter().position(|&x| x == p).unwrap();
                assert!(parent_rank > rank);
            }
        }
    }

    #[test]
    fn disconnected_model_builds_a_forest() {
        let list = vars(4);
        let model = Model::new(vec![Relation::new(vec![0, 1]), Relation::new(vec![2, 3])]);
        let tree = JunctionTree::build(&model, &list).unwrap();
        assert_eq!(tree.roots().len(), 2);
        assert!(tree.separator(0).is_none());
        assert!(tree.separator(1).is_none());
    }

    #[test]
    fn rip_failure_is_reported_for_loopy_input() {
        let list = vars(3);
        let model = Model::new(vec![
            Relation::new(vec![0, 1]),
            Relation::new(vec![1, 2]),
            Relation::new(vec![0, 2]),
        ]);
        // the triangle cannot satisfy RIP with only two tree edges
        assert!(JunctionTree::build(&model, &list).is_err());
    }

    #[test]
    fn spanning_tree_prefers_heavier_separators() {
        let list = vars(4);
        // abc and abd share ab (weight 2); cd links weight-1 to both
        let model = Model::new(vec![
            Relation::new(vec![0, 1, 2]),
            Relation::new(vec![0, 1, 3]),
            Relation::new(vec![2, 3]),
        ]);
        // abc:abd:cd is loopy (c-d edge closes a cycle), so RIP fails
        assert!(JunctionTree::build(&model, &list).is_err());

        let decomposable = Model::new(vec![
            Relation::new(vec![0, 1, 2]),
            Relation::new(vec![0, 1, 3]),
        ]);
        let tree = JunctionTree::build(&decomposable, &list).unwrap();
        assert_eq!(tree.separator(1).unwrap().positions(), &[0, 1]);
    }
}
