//! The outer planning loop: hull triangulation with backtracking, key
//! rebalancing and multi-attempt scoring.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, warn};

use crate::error::PlanError;
use crate::geometry;
use crate::graph::Graph;
use crate::order::improve_edge_order;
use crate::triangle::{Triangle, MAX_OUT_LINKS};

/// Tuning knobs for the randomized planner.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Outer attempts scored by `TK + 2 * MK`; the best one wins.
    pub attempts: usize,
    /// Rebuild retries per first-generation triangle before giving up on it.
    pub tries_per_tri: usize,
    /// Accept plans that overflow the outgoing cap instead of failing.
    pub allow_suboptimal: bool,
    /// Fixing the seed makes the whole pipeline deterministic.
    pub seed: Option<u64>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            attempts: 10,
            tries_per_tri: 1,
            allow_suboptimal: true,
            seed: None,
        }
    }
}

/// One planning attempt: triangulate the convex hull, then rebalance link
/// directions against key shortages. Returns false when no feasible
/// triangulation was found with this randomization.
pub fn max_fields(graph: &mut Graph, rng: &mut StdRng, config: &PlannerConfig) -> bool {
    let pts: Vec<[f64; 2]> = graph.portals.iter().map(|p| p.xy).collect();
    let perim = geometry::convex_hull_boundary(&pts);

    if !triangulate(graph, &perim, rng, config) {
        return false;
    }
    flip_some(graph);
    true
}

/// Recursively triangulate the polygon described by `perim` (portal indices
/// in boundary order), building links as a side effect.
///
/// Each frame tries every boundary position as the final vertex of a
/// first-generation triangle, in random order. A failed build or a failed
/// recursion rolls the link arena and the triangulation list back to the
/// frame's watermark and moves on.
fn triangulate(
    graph: &mut Graph,
    perim: &[usize],
    rng: &mut StdRng,
    config: &PlannerConfig,
) -> bool {
    let pn = perim.len();
    if pn < 3 {
        return true;
    }

    let start_mark = graph.links.watermark();
    let start_tris = graph.triangulation.len();

    let mut positions: Vec<usize> = (0..pn).collect();
    positions.shuffle(rng);

    for i in positions {
        let verts = [
            perim[i],
            perim[(i + pn - 1) % pn],
            perim[(i + 1) % pn],
        ];

        let mut built: Option<Triangle> = None;
        for _ in 0..config.tries_per_tri.max(1) {
            let mut t0 = Triangle::new(verts, true);
            let all: Vec<usize> = (0..graph.portal_count()).collect();
            t0.find_contents(&graph.portals, &all);
            t0.near_split(&graph.portals);

            match t0.build_graph(&mut graph.links) {
                Ok(()) => {
                    built = Some(t0);
                    break;
                }
                Err(dead) => {
                    debug!(reason = %dead.reason, final_vertex = verts[0], "triangle build failed");
                    graph.links.truncate_to(start_mark);
                    graph.triangulation.truncate(start_tris);
                }
            }
        }
        let Some(t0) = built else { continue };

        // Excise position i and triangulate the remaining boundary.
        let sub: Vec<usize> = (1..pn).map(|k| perim[(i + k) % pn]).collect();
        if !triangulate(graph, &sub, rng, config) {
            graph.links.truncate_to(start_mark);
            graph.triangulation.truncate(start_tris);
            continue;
        }

        graph.triangulation.push(t0);
        return true;
    }

    false
}

/// True iff reversing the link p -> q is a Pareto improvement: q must have
/// outgoing capacity left and p a key surplus.
fn can_flip(out_deg: &[i64], key_lack: &[i64], p: usize, q: usize) -> bool {
    out_deg[q] < MAX_OUT_LINKS as i64 && key_lack[p] < 0
}

/// Reverse reversible links toward portals with spare keys, reducing how many
/// keys still have to be farmed. Portals with the greatest shortage go first.
pub fn flip_some(graph: &mut Graph) {
    let n = graph.portal_count();

    let mut out_deg: Vec<i64> = (0..n).map(|p| graph.links.out_degree(p) as i64).collect();
    // negative when the portal owns more keys than its incoming links need
    let mut key_lack: Vec<i64> = (0..n)
        .map(|p| graph.links.in_degree(p) as i64 - graph.portals[p].keys as i64)
        .collect();

    let mut need_keys: Vec<usize> = (0..n).filter(|&p| key_lack[p] > 0).collect();
    need_keys.sort_by_key(|&p| std::cmp::Reverse(key_lack[p]));

    for q in need_keys {
        for idx in graph.links.incoming(q) {
            if key_lack[q] <= 0 {
                break;
            }
            let p = graph.links.get(idx).from;
            if graph.links.get(idx).reversible && can_flip(&out_deg, &key_lack, p, q) {
                graph.links.reverse(idx);
                out_deg[p] -= 1;
                out_deg[q] += 1;
                key_lack[p] += 1;
                key_lack[q] -= 1;
            }
        }
    }
}

/// Produce the best plan over `config.attempts` randomized tries.
///
/// Attempts are scored by `TK + 2 * MK` (total and max key shortfall); a
/// perfect score stops early. The winner gets its fields annotated and its
/// link order compacted before being returned.
pub fn plan(base: &Graph, config: &PlannerConfig) -> Result<Graph, PlanError> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut best: Option<(u32, Graph)> = None;

    for attempt in 0..config.attempts.max(1) {
        let mut g = base.clone();
        g.links.allow_suboptimal = config.allow_suboptimal;

        if !max_fields(&mut g, &mut rng, config) {
            debug!(attempt, "randomization failure");
            continue;
        }

        let (tk, mk) = g.key_shortfalls();
        let score = tk + 2 * mk;
        debug!(attempt, tk, mk, score, "attempt scored");

        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, g));
        }
        if score == 0 {
            break;
        }
    }

    let Some((_, mut g)) = best else {
        return Err(PlanError::PlannerExhausted { attempts: config.attempts.max(1) });
    };

    g.mark_fields();
    improve_edge_order(&mut g.links);

    for p in 0..g.portal_count() {
        if g.links.out_degree(p) > MAX_OUT_LINKS {
            warn!(
                portal = %g.portals[p].name,
                out_degree = g.links.out_degree(p),
                "plan exceeds the outgoing cap; it is usable but suboptimal"
            );
        }
    }

    Ok(g)
}
