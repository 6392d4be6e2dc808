//! HNSW approximate nearest-neighbor index over cosine distance
//!
//! Layered proximity graph: every vector lives on layer 0 and on a random
//! number of upper layers (geometric distribution with factor `1 / ln(m)`).
//! Search runs a beam of width `ef` on every layer, carrying the beam down
//! as the entry points of the layer below.
//!
//! Neighbors are chosen with the diversity heuristic of Malkov & Yashunin:
//! a candidate closer to an already chosen neighbor than to the base node is
//! set aside, and set-aside candidates only fill the slots left over. Links
//! between clusters survive that way, so clustered data stays one graph.

use super::cosine_distance;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

/// Graph construction and search parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Max links per node on upper layers (layer 0 allows twice as many)
    pub m: usize,
    /// Beam width while inserting
    pub ef_construction: usize,
    /// Beam width while searching
    pub ef_search: usize,
    pub seed: u64,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self { m: 16, ef_construction: 64, ef_search: 40, seed: 0x5eed }
    }
}

struct Node {
    key: i64,
    vector: Vec<f32>,
    /// Neighbor ids per layer, index 0 is the base layer
    links: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, Copy)]
struct Scored {
    distance: f32,
    id: usize,
}

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scored {}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// In-memory HNSW index keyed by row id
pub struct HnswIndex {
    dims: usize,
    params: HnswParams,
    level_factor: f64,
    nodes: Vec<Node>,
    entry: Option<usize>,
    rng: StdRng,
}

impl HnswIndex {
    pub fn new(dims: usize, params: HnswParams) -> Self {
        let m = params.m.max(2);
        let params = HnswParams { m, ..params };
        Self {
            dims,
            params,
            level_factor: 1.0 / (m as f64).ln(),
            nodes: Vec::new(),
            entry: None,
            rng: StdRng::seed_from_u64(params.seed),
        }
    }

    pub fn params(&self) -> &HnswParams {
        &self.params
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn max_links(&self, layer: usize) -> usize {
        if layer == 0 { self.params.m * 2 } else { self.params.m }
    }

    fn random_level(&mut self) -> usize {
        let uniform: f64 = self.rng.gen_range(f64::MIN_POSITIVE..1.0);
        (-uniform.ln() * self.level_factor).floor() as usize
    }

    fn distance_to(&self, query: &[f32], id: usize) -> f32 {
        cosine_distance(query, &self.nodes[id].vector)
    }

    fn top_layer(&self) -> usize {
        self.entry.map(|e| self.nodes[e].links.len() - 1).unwrap_or(0)
    }

    /// Add a vector under `key`
    pub fn insert(&mut self, key: i64, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dims {
            return Err(Error::Dimension { expected: self.dims, actual: vector.len() });
        }

        let level = self.random_level();
        let id = self.nodes.len();
        self.nodes.push(Node { key, vector, links: vec![Vec::new(); level + 1] });

        let Some(entry) = self.entry else {
            self.entry = Some(id);
            return Ok(());
        };

        let top = self.top_layer();
        let query = self.nodes[id].vector.clone();
        let ef = self.params.ef_construction;
        let mut entry_points = vec![Scored { distance: self.distance_to(&query, entry), id: entry }];

        for layer in (level + 1..=top).rev() {
            entry_points = self.search_layer(&query, &entry_points, ef, layer);
        }

        for layer in (0..=level.min(top)).rev() {
            let candidates = self.search_layer(&query, &entry_points, ef, layer);
            let neighbors = self.select_neighbors(&candidates, self.params.m);

            self.nodes[id].links[layer] = neighbors.clone();
            for neighbor in neighbors {
                self.nodes[neighbor].links[layer].push(id);
                self.prune(neighbor, layer);
            }
            entry_points = candidates;
        }

        if level > top {
            self.entry = Some(id);
        }
        Ok(())
    }

    /// Pick up to `limit` links from `candidates`, which are sorted by
    /// distance to the node being linked
    fn select_neighbors(&self, candidates: &[Scored], limit: usize) -> Vec<usize> {
        let mut selected: Vec<Scored> = Vec::with_capacity(limit);
        let mut set_aside = Vec::new();
        for &candidate in candidates {
            if selected.len() >= limit {
                break;
            }
            let vector = &self.nodes[candidate.id].vector;
            let shadowed = selected
                .iter()
                .any(|s| cosine_distance(vector, &self.nodes[s.id].vector) < candidate.distance);
            if shadowed {
                set_aside.push(candidate);
            } else {
                selected.push(candidate);
            }
        }

        let free = limit.saturating_sub(selected.len());
        selected.extend(set_aside.into_iter().take(free));
        selected.into_iter().map(|s| s.id).collect()
    }

    /// Cut the links of `id` on `layer` back to the layer's limit
    fn prune(&mut self, id: usize, layer: usize) {
        let limit = self.max_links(layer);
        if self.nodes[id].links[layer].len() <= limit {
            return;
        }
        let base = &self.nodes[id].vector;
        let mut scored: Vec<Scored> = self.nodes[id].links[layer]
            .iter()
            .map(|&n| Scored { distance: cosine_distance(base, &self.nodes[n].vector), id: n })
            .collect();
        scored.sort();
        let kept = self.select_neighbors(&scored, limit);
        self.nodes[id].links[layer] = kept;
    }

    /// Beam search on one layer; returns up to `ef` nodes sorted by distance
    fn search_layer(&self, query: &[f32], entry_points: &[Scored], ef: usize, layer: usize) -> Vec<Scored> {
        let ef = ef.max(1);
        let mut visited: HashSet<usize> = entry_points.iter().map(|s| s.id).collect();
        let mut candidates: BinaryHeap<Reverse<Scored>> = entry_points.iter().copied().map(Reverse).collect();
        let mut results: BinaryHeap<Scored> = entry_points.iter().copied().collect();
        while results.len() > ef {
            results.pop();
        }

        while let Some(Reverse(closest)) = candidates.pop() {
            let worst = results.peek().map(|s| s.distance).unwrap_or(f32::INFINITY);
            if closest.distance > worst && results.len() >= ef {
                break;
            }
            for &n in &self.nodes[closest.id].links[layer] {
                if !visited.insert(n) {
                    continue;
                }
                let d = self.distance_to(query, n);
                let worst = results.peek().map(|s| s.distance).unwrap_or(f32::INFINITY);
                if results.len() < ef || d < worst {
                    let scored = Scored { distance: d, id: n };
                    candidates.push(Reverse(scored));
                    results.push(scored);
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        results.into_sorted_vec()
    }

    /// The `k` nearest keys to `query`, closest first, with their cosine distances
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(i64, f32)>> {
        if query.len() != self.dims {
            return Err(Error::Dimension { expected: self.dims, actual: query.len() });
        }
        let Some(entry) = self.entry else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let ef = self.params.ef_search.max(k);
        let mut entry_points = vec![Scored { distance: self.distance_to(query, entry), id: entry }];
        for layer in (1..=self.top_layer()).rev() {
            entry_points = self.search_layer(query, &entry_points, ef, layer);
        }

        let found = self.search_layer(query, &entry_points, ef, 0);
        Ok(found
            .into_iter()
            .take(k)
            .map(|s| (self.nodes[s.id].key, s.distance))
            .collect())
    }
}
