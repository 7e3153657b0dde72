use std::time::{SystemTime, UNIX_EPOCH};

use bot_detect_identity::Signature;
use dashmap::DashMap;

use crate::factors::{Factor, FactorHashes};

#[derive(Debug, Clone)]
pub struct StoredSignature {
    pub primary: Signature,
    pub ip: Signature,
    pub ua: Signature,
    pub subnet: Signature,
    pub client_side: Option<Signature>,
    pub plugin: Option<Signature>,
    pub first_seen_epoch: u64,
    pub last_seen_epoch: u64,
}

impl StoredSignature {
    fn new(hashes: &FactorHashes) -> Self {
        let now = now_epoch();
        Self {
            primary: hashes.primary.clone(),
            ip: hashes.ip.clone(),
            ua: hashes.ua.clone(),
            subnet: hashes.subnet.clone(),
            client_side: hashes.client_side.clone(),
            plugin: hashes.plugin.clone(),
            first_seen_epoch: now,
            last_seen_epoch: now,
        }
    }

    /// Every factor this record currently carries, with its matching
    /// hash — used to score a query against it.
    pub fn factor_hashes(&self) -> Vec<(Factor, &Signature)> {
        let mut out = vec![
            (Factor::Primary, &self.primary),
            (Factor::Ip, &self.ip),
            (Factor::Ua, &self.ua),
            (Factor::Subnet, &self.subnet),
        ];
        if let Some(h) = &self.client_side {
            out.push((Factor::ClientSide, h));
        }
        if let Some(h) = &self.plugin {
            out.push((Factor::Plugin, h));
        }
        out
    }
}

fn now_epoch() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Sparse in-process index: primary hash to stored signature, plus a
/// reverse index per factor so a query missing the primary can still be
/// scored against partial matches. Each signature's record lives behind
/// one `DashMap` entry, so concurrent updates to the *same* signature
/// serialize through that shard's lock while unrelated signatures never
/// contend.
#[derive(Default)]
pub struct FastPathStore {
    primary_index: DashMap<Signature, StoredSignature>,
    ip_index: DashMap<Signature, Vec<Signature>>,
    ua_index: DashMap<Signature, Vec<Signature>>,
    subnet_index: DashMap<Signature, Vec<Signature>>,
    client_side_index: DashMap<Signature, Vec<Signature>>,
    plugin_index: DashMap<Signature, Vec<Signature>>,
}

impl FastPathStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, primary: &Signature) -> Option<StoredSignature> {
        self.primary_index.get(primary).map(|r| r.clone())
    }

    pub fn candidates_for(&self, hashes: &FactorHashes) -> Vec<Signature> {
        let mut seen = Vec::new();
        let mut push_all = |index: &DashMap<Signature, Vec<Signature>>, key: &Signature| {
            if let Some(entries) = index.get(key) {
                for primary in entries.iter() {
                    if !seen.contains(primary) {
                        seen.push(primary.clone());
                    }
                }
            }
        };
        push_all(&self.ip_index, &hashes.ip);
        push_all(&self.ua_index, &hashes.ua);
        push_all(&self.subnet_index, &hashes.subnet);
        if let Some(h) = &hashes.client_side {
            push_all(&self.client_side_index, h);
        }
        if let Some(h) = &hashes.plugin {
            push_all(&self.plugin_index, h);
        }
        seen
    }

    pub fn ip_and_ua_both_match(&self, hashes: &FactorHashes) -> bool {
        let by_ip = self.ip_index.get(&hashes.ip);
        let by_ua = self.ua_index.get(&hashes.ua);
        match (by_ip, by_ua) {
            (Some(ip_primaries), Some(ua_primaries)) => {
                ip_primaries.iter().any(|p| ua_primaries.contains(p))
            }
            _ => false,
        }
    }

    /// Insert or refresh a signature. Returns the primary hash callers
    /// should retain to merge client-side factors in later.
    pub fn store(&self, hashes: &FactorHashes) -> Signature {
        self.primary_index
            .entry(hashes.primary.clone())
            .and_modify(|existing| {
                existing.last_seen_epoch = now_epoch();
                if hashes.client_side.is_some() {
                    existing.client_side = hashes.client_side.clone();
                }
                if hashes.plugin.is_some() {
                    existing.plugin = hashes.plugin.clone();
                }
            })
            .or_insert_with(|| StoredSignature::new(hashes));

        Self::index_push(&self.ip_index, &hashes.ip, &hashes.primary);
        Self::index_push(&self.ua_index, &hashes.ua, &hashes.primary);
        Self::index_push(&self.subnet_index, &hashes.subnet, &hashes.primary);
        if let Some(h) = &hashes.client_side {
            Self::index_push(&self.client_side_index, h, &hashes.primary);
        }
        if let Some(h) = &hashes.plugin {
            Self::index_push(&self.plugin_index, h, &hashes.primary);
        }
        hashes.primary.clone()
    }

    /// Merges client-side factors learned from the post-response
    /// callback into an already-stored signature.
    pub fn merge_client_side(&self, primary: &Signature, client_side_hash: Signature) {
        if let Some(mut record) = self.primary_index.get_mut(primary) {
            record.client_side = Some(client_side_hash.clone());
            record.last_seen_epoch = now_epoch();
        } else {
            return;
        }
        Self::index_push(&self.client_side_index, &client_side_hash, primary);
    }

    fn index_push(index: &DashMap<Signature, Vec<Signature>>, key: &Signature, primary: &Signature) {
        let mut entry = index.entry(key.clone()).or_default();
        if !entry.contains(primary) {
            entry.push(primary.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.primary_index.len()
    }
}
