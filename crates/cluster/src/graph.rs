use petgraph::graph::{NodeIndex, UnGraph};

/// Similarity graph: one node per candidate signature, one edge per
/// pair whose blended similarity cleared the threshold.
pub struct SimilarityGraph {
    pub graph: UnGraph<String, f64>,
    pub index_of: std::collections::HashMap<String, NodeIndex>,
}

impl SimilarityGraph {
    pub fn build(signatures: &[String], similarity: impl Fn(&str, &str) -> f64, threshold: f64) -> Self {
        let mut graph = UnGraph::new_undirected();
        let mut index_of = std::collections::HashMap::with_capacity(signatures.len());
        for signature in signatures {
            let idx = graph.add_node(signature.clone());
            index_of.insert(signature.clone(), idx);
        }

        for i in 0..signatures.len() {
            for j in (i + 1)..signatures.len() {
                let weight = similarity(&signatures[i], &signatures[j]);
                if weight >= threshold {
                    graph.add_edge(index_of[&signatures[i]], index_of[&signatures[j]], weight);
                }
            }
        }

        Self { graph, index_of }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_only_form_above_threshold() {
        let sigs = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let sim = |x: &str, y: &str| if (x, y) == ("a", "b") || (x, y) == ("b", "a") { 0.9 } else { 0.1 };
        let g = SimilarityGraph::build(&sigs, sim, 0.7);
        assert_eq!(g.graph.edge_count(), 1);
    }
}
