use std::collections::HashMap;

use bot_detect_identity::Signature;

pub type ClusterId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ClusterClassification {
    BotProduct,
    BotNetwork,
    Unclassified,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub signatures: Vec<Signature>,
    pub classification: ClusterClassification,
    pub label: String,
    pub avg_intra_similarity: f64,
    pub temporal_density: f64,
}

impl Cluster {
    pub const PRODUCT_SIMILARITY_THRESHOLD: f64 = 0.8;
    pub const NETWORK_TEMPORAL_DENSITY_THRESHOLD: f64 = 0.6;
    pub const NETWORK_SIMILARITY_THRESHOLD: f64 = 0.5;

    pub fn classify(avg_intra_similarity: f64, temporal_density: f64) -> ClusterClassification {
        if avg_intra_similarity >= Self::PRODUCT_SIMILARITY_THRESHOLD {
            ClusterClassification::BotProduct
        } else if temporal_density >= Self::NETWORK_TEMPORAL_DENSITY_THRESHOLD
            && avg_intra_similarity >= Self::NETWORK_SIMILARITY_THRESHOLD
        {
            ClusterClassification::BotNetwork
        } else {
            ClusterClassification::Unclassified
        }
    }

    /// Auto-labels by the cheap heuristics §4.8 names: request rate,
    /// path entropy, burstiness, cluster size.
    pub fn auto_label(
        classification: ClusterClassification,
        avg_request_rate: f64,
        avg_path_entropy: f64,
        size: usize,
    ) -> String {
        let tempo = if avg_request_rate > 5.0 { "fast" } else { "slow" };
        let shape = if avg_path_entropy > 2.0 { "wide-crawling" } else { "narrow" };
        match classification {
            ClusterClassification::BotProduct => format!("{tempo}-{shape}-product ({size} signatures)"),
            ClusterClassification::BotNetwork => format!("{tempo}-{shape}-network ({size} signatures)"),
            ClusterClassification::Unclassified => format!("unclassified-group ({size} signatures)"),
        }
    }
}

/// Immutable output of one clustering pass, swapped into the engine's
/// `ArcSwap` as a single unit so readers never see a signature mapped
/// to a cluster id that isn't in `clusters` yet.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ClusterSnapshot {
    pub signature_to_cluster: HashMap<Signature, ClusterId>,
    pub clusters: HashMap<ClusterId, Cluster>,
}

impl ClusterSnapshot {
    pub fn cluster_for(&self, signature: &str) -> Option<&Cluster> {
        self.signature_to_cluster.get(signature).and_then(|id| self.clusters.get(id))
    }
}
