//! Consolidation: merging near-duplicate units
//!
//! Units whose context vectors reach the similarity threshold are clustered
//! with union-find and each cluster is folded into one survivor. Merged
//! contexts can become similar to further units, so passes repeat until no
//! pair reaches the threshold; a second run with the same threshold is a no-op.
//!
//! Units pinned by an open detour are never merged.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::AdvancedXpEnvironment;
use crate::hrr::cosine_similarity;
use crate::memory::AdvancedXpUnit;

/// One cluster folded into a survivor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRecord {
    pub survivor_id: String,
    pub absorbed_ids: Vec<String>,
}

/// Result of a consolidation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationReport {
    /// Similarity threshold used
    pub threshold: f64,
    /// Clustering passes that found something to merge
    pub passes: usize,
    /// Units examined in the first pass
    pub units_examined: usize,
    /// Units removed by merging
    pub units_merged: usize,
    /// Units left pinned by open detours
    pub units_pinned: usize,
    pub merges: Vec<MergeRecord>,
}

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, x: usize, y: usize) {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx == ry {
            return;
        }
        match self.rank[rx].cmp(&self.rank[ry]) {
            Ordering::Less => self.parent[rx] = ry,
            Ordering::Greater => self.parent[ry] = rx,
            Ordering::Equal => {
                self.parent[ry] = rx;
                self.rank[rx] += 1;
            }
        }
    }
}

/// Survivor order: importance, then rehearsals, then salience, then the earliest unit.
fn survivor_order(a: &AdvancedXpUnit, b: &AdvancedXpUnit) -> Ordering {
    a.importance
        .total_cmp(&b.importance)
        .then_with(|| a.rehearsals.cmp(&b.rehearsals))
        .then_with(|| a.salience.total_cmp(&b.salience))
        .then_with(|| b.timestamp.cmp(&a.timestamp))
        .then_with(|| b.content_id.cmp(&a.content_id))
}

impl AdvancedXpEnvironment {
    /// Merge units whose context similarity is at least `similarity_threshold`.
    pub fn consolidate_memories(&mut self, similarity_threshold: f64) -> ConsolidationReport {
        let mut report = ConsolidationReport {
            threshold: similarity_threshold,
            ..Default::default()
        };
        if similarity_threshold.is_nan() {
            return report;
        }

        loop {
            let eligible: Vec<String> = self
                .xpunits
                .keys()
                .filter(|id| !self.is_pinned(id))
                .cloned()
                .collect();
            if report.passes == 0 {
                report.units_examined = eligible.len();
                report.units_pinned = self.xpunits.len() - eligible.len();
            }

            let clusters = self.find_clusters(&eligible, similarity_threshold);
            if clusters.is_empty() {
                break;
            }
            report.passes += 1;

            for cluster in clusters {
                if let Some(record) = self.merge_cluster(&cluster) {
                    report.units_merged += record.absorbed_ids.len();
                    report.merges.push(record);
                }
            }
        }

        self.total_consolidations += report.units_merged as u64;
        tracing::info!(
            threshold = similarity_threshold,
            passes = report.passes,
            merged = report.units_merged,
            pinned = report.units_pinned,
            remaining = self.xpunits.len(),
            "Consolidation complete"
        );
        report
    }

    fn find_clusters(&self, ids: &[String], threshold: f64) -> Vec<Vec<String>> {
        let units: Vec<&AdvancedXpUnit> = ids.iter().filter_map(|id| self.xpunits.get(id)).collect();
        let n = units.len();
        let mut uf = UnionFind::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                let sim = cosine_similarity(&units[i].context_vec, &units[j].context_vec);
                if f64::from(sim) >= threshold {
                    uf.union(i, j);
                }
            }
        }

        let mut cluster_map: HashMap<usize, Vec<String>> = HashMap::new();
        for (i, unit) in units.iter().enumerate() {
            let root = uf.find(i);
            cluster_map.entry(root).or_default().push(unit.content_id.clone());
        }
        let mut clusters: Vec<Vec<String>> = cluster_map
            .into_values()
            .filter(|c| c.len() > 1)
            .collect();
        clusters.sort();
        clusters
    }

    fn merge_cluster(&mut self, cluster: &[String]) -> Option<MergeRecord> {
        let survivor_id = cluster
            .iter()
            .filter_map(|id| self.xpunits.get(id))
            .max_by(|a, b| survivor_order(a, b))
            .map(|u| u.content_id.clone())?;
        let mut survivor = self.xpunits.remove(&survivor_id)?;

        let mut absorbed_ids = Vec::new();
        for id in cluster.iter().filter(|id| **id != survivor_id) {
            if let Some(other) = self.xpunits.remove(id) {
                survivor.absorb(other, &self.space);
                absorbed_ids.push(id.clone());
            }
        }
        self.xpunits.insert(survivor_id.clone(), survivor);

        for absorbed in &absorbed_ids {
            self.retarget_references(absorbed, &survivor_id);
        }
        tracing::debug!(
            survivor_id = %survivor_id,
            absorbed = absorbed_ids.len(),
            "Merged cluster"
        );
        Some(MergeRecord {
            survivor_id,
            absorbed_ids,
        })
    }

    /// Point every id reference of `from` at `to`.
    fn retarget_references(&mut self, from: &str, to: &str) {
        for thread in self.narrative_capsules.values_mut() {
            thread.replace_member(from, to);
        }
        for topic in self.topic_buffers.values_mut() {
            topic.replace_member(from, to);
        }
        for unit in self.xpunits.values_mut() {
            unit.retarget_links(from, to);
        }
    }
}
