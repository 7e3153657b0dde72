use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::cluster::{Cluster, ClusterClassification, ClusterId, ClusterSnapshot};
use crate::community::{detect_communities, CommunityAlgorithm};
use crate::features::{FeatureVector, SignatureContext};
use crate::graph::SimilarityGraph;
use crate::similarity::{blended_similarity, cosine_similarity, hashed_embedding, semantic_cosine, temporal_cross_correlation};

#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub interval_seconds: u64,
    pub min_bot_detections_to_trigger: u64,
    pub min_bot_probability_for_clustering: f64,
    pub similarity_threshold: f64,
    pub min_cluster_size: usize,
    pub max_iterations: usize,
    pub community_algorithm: CommunityAlgorithm,
    pub seed: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 60,
            min_bot_detections_to_trigger: 20,
            min_bot_probability_for_clustering: 0.5,
            similarity_threshold: 0.7,
            min_cluster_size: 3,
            max_iterations: 20,
            community_algorithm: CommunityAlgorithm::LabelPropagation,
            seed: 42,
        }
    }
}

/// Candidate signature handed to a clustering pass, carrying both the
/// numeric feature context and an optional privacy-safe textual
/// summary for the semantic similarity blend.
pub struct ClusterCandidate<'a> {
    pub context: SignatureContext<'a>,
    pub semantic_summary: Option<String>,
}

/// Periodic/event-triggered community detection over signatures whose
/// average bot probability clears the clustering floor. Swaps its
/// output snapshot atomically so readers never observe a signature
/// mapped to a cluster id that hasn't been inserted yet.
pub struct ClusterEngine {
    snapshot: ArcSwap<ClusterSnapshot>,
    country_tracker: crate::country::CountryReputationTracker,
    config: ClusterConfig,
    bot_detections_since_last_run: std::sync::atomic::AtomicU64,
}

impl ClusterEngine {
    pub fn new(config: ClusterConfig) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(ClusterSnapshot::default()),
            country_tracker: crate::country::CountryReputationTracker::new(),
            config,
            bot_detections_since_last_run: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> Arc<ClusterSnapshot> {
        self.snapshot.load_full()
    }

    pub fn country_tracker(&self) -> &crate::country::CountryReputationTracker {
        &self.country_tracker
    }

    pub fn note_bot_detection(&self) -> u64 {
        self.bot_detections_since_last_run.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1
    }

    pub fn should_run_now(&self) -> bool {
        self.bot_detections_since_last_run.load(std::sync::atomic::Ordering::Relaxed)
            >= self.config.min_bot_detections_to_trigger
    }

    /// Runs the full pipeline: filter, extract, similarity graph,
    /// community detection, classification, and label assignment, then
    /// publishes the result.
    pub fn run_pass(&self, candidates: Vec<ClusterCandidate<'_>>) {
        self.bot_detections_since_last_run.store(0, std::sync::atomic::Ordering::Relaxed);

        let eligible: Vec<&ClusterCandidate<'_>> = candidates
            .iter()
            .filter(|c| c.context.avg_bot_probability >= self.config.min_bot_probability_for_clustering)
            .collect();
        if eligible.len() < self.config.min_cluster_size {
            self.snapshot.store(Arc::new(ClusterSnapshot::default()));
            return;
        }

        let signatures: Vec<String> = eligible.iter().map(|c| c.context.signature.to_string()).collect();
        let features: HashMap<String, FeatureVector> = eligible
            .iter()
            .map(|c| (c.context.signature.to_string(), FeatureVector::extract(&c.context)))
            .collect();
        let embeddings: HashMap<String, Option<[f64; 384]>> = eligible
            .iter()
            .map(|c| (c.context.signature.to_string(), c.semantic_summary.as_deref().map(hashed_embedding)))
            .collect();
        let intervals: HashMap<String, Vec<f64>> =
            eligible.iter().map(|c| (c.context.signature.to_string(), c.context.inter_arrival_ms.to_vec())).collect();

        let similarity_threshold = self.config.similarity_threshold;
        let similarity = |a: &str, b: &str| {
            let heuristic = cosine_similarity(&features[a], &features[b]);
            let semantic = match (&embeddings[a], &embeddings[b]) {
                (Some(ea), Some(eb)) => Some(semantic_cosine(ea, eb)),
                _ => None,
            };
            let mut blended = blended_similarity(heuristic, semantic);
            if let Some(temporal) = temporal_cross_correlation(&intervals[a], &intervals[b]) {
                blended = (blended * (1.0 - crate::similarity::TEMPORAL_WEIGHT)
                    + temporal * crate::similarity::TEMPORAL_WEIGHT)
                    .clamp(0.0, 1.0);
            }
            blended
        };

        let graph = SimilarityGraph::build(&signatures, similarity, similarity_threshold);
        let labels = detect_communities(&graph.graph, self.config.community_algorithm, self.config.max_iterations, self.config.seed);

        let mut groups: HashMap<usize, Vec<String>> = HashMap::new();
        for (signature, idx) in &graph.index_of {
            groups.entry(labels[idx]).or_default().push(signature.clone());
        }

        let mut snapshot = ClusterSnapshot::default();
        let mut next_id: ClusterId = 0;
        for (_, members) in groups {
            if members.len() < self.config.min_cluster_size {
                continue;
            }
            let pairs: Vec<(f64, f64)> = Self::pairwise_stats(&members, &features, &intervals);
            let avg_intra_similarity = pairs.iter().map(|(s, _)| s).sum::<f64>() / pairs.len().max(1) as f64;
            let temporal_density = pairs.iter().map(|(_, t)| t).sum::<f64>() / pairs.len().max(1) as f64;

            let classification = Cluster::classify(avg_intra_similarity, temporal_density);
            let avg_rate = members
                .iter()
                .filter_map(|s| eligible.iter().find(|c| c.context.signature == s.as_str()))
                .map(|c| c.context.request_rate)
                .sum::<f64>()
                / members.len() as f64;
            let avg_entropy = members
                .iter()
                .filter_map(|s| eligible.iter().find(|c| c.context.signature == s.as_str()))
                .map(|c| c.context.path_entropy)
                .sum::<f64>()
                / members.len() as f64;
            let label = Cluster::auto_label(classification, avg_rate, avg_entropy, members.len());

            let id = next_id;
            next_id += 1;
            for m in &members {
                snapshot.signature_to_cluster.insert(m.clone(), id);
            }
            snapshot.clusters.insert(
                id,
                Cluster { id, signatures: members, classification, label, avg_intra_similarity, temporal_density },
            );
        }

        self.snapshot.store(Arc::new(snapshot));
    }

    fn pairwise_stats(
        members: &[String],
        features: &HashMap<String, FeatureVector>,
        intervals: &HashMap<String, Vec<f64>>,
    ) -> Vec<(f64, f64)> {
        let mut out = Vec::new();
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                let sim = cosine_similarity(&features[&members[i]], &features[&members[j]]);
                let temporal = temporal_cross_correlation(&intervals[&members[i]], &intervals[&members[j]]).unwrap_or(0.0);
                out.push((sim, temporal.max(0.0)));
            }
        }
        if out.is_empty() {
            out.push((0.0, 0.0));
        }
        out
    }
}
