//! Assignment of the ordered link sequence to agents.
//!
//! The k-agent schedule is an ordered multi-TSP: link i must be finished
//! before link i+1 anywhere in the team, and only the link's source portal
//! matters for travel. Distances stand in for time until the very end, when
//! meters become seconds via the walking speed.

pub mod branch_bound;

use tracing::debug;

use crate::geometry;
use crate::graph::Graph;
use crate::order::{condense_order, expand_order};
use branch_bound::{branch_bound, SearchState};

/// Walking speed in m/s.
pub const WALK_SPEED: f64 = 2.0;
/// Seconds to communicate a run of completed links.
pub const COMM_SECS: f64 = 60.0;
/// Seconds spent in the link menu per link.
pub const LINK_SECS: f64 = 15.0;

/// Beam ceiling for the branch-and-bound.
const MAX_BRANCHES: usize = 15_000;

/// Square matrix of portal-to-portal surface distances in meters.
struct DistMatrix {
    n: usize,
    data: Vec<f64>,
}

impl DistMatrix {
    fn build(graph: &Graph) -> Self {
        let n = graph.portal_count();
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = geometry::sphere_dist(graph.portals[i].latlng, graph.portals[j].latlng);
                data[i * n + j] = d;
                data[j * n + i] = d;
            }
        }
        Self { n, data }
    }

    fn at(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }
}

/// Partial assignment of the compressed visit sequence to agents.
struct TourState<'a> {
    d: &'a DistMatrix,
    order: &'a [usize],
    nagents: usize,
    /// `visit_to_agent[i]` is the agent making visit i.
    visit_to_agent: Vec<usize>,
    /// `time[i]` is the team clock (meters walked) when visit i completes.
    time: Vec<f64>,
    /// Per agent: the index of their most recent visit, None before
    /// deployment. First deployment is instantaneous.
    last_at: Vec<Option<usize>>,
}

impl<'a> TourState<'a> {
    fn root(d: &'a DistMatrix, order: &'a [usize], nagents: usize) -> Self {
        let mut last_at = vec![None; nagents];
        last_at[0] = Some(0);
        Self {
            d,
            order,
            nagents,
            visit_to_agent: vec![0],
            time: vec![0.0],
            last_at,
        }
    }

    /// The team clock at which `agent` could complete the next visit.
    fn agents_new_time(&self, agent: usize) -> f64 {
        let current = *self.time.last().expect("state always has a visit");
        match self.last_at[agent] {
            None => current,
            Some(last_visit) => {
                let last_pos = self.order[last_visit];
                let next_pos = self.order[self.time.len()];
                current.max(self.time[last_visit] + self.d.at(next_pos, last_pos))
            }
        }
    }
}

impl<'a> SearchState for TourState<'a> {
    fn value(&self) -> f64 {
        *self.time.last().expect("state always has a visit")
    }

    fn split(&self, num: usize) -> Option<Vec<Self>> {
        if self.time.len() >= self.order.len() {
            return None;
        }

        let mut children: Vec<TourState<'a>> = (0..self.nagents)
            .map(|agent| {
                let new_time = self.agents_new_time(agent);
                let mut visit_to_agent = self.visit_to_agent.clone();
                visit_to_agent.push(agent);
                let mut time = self.time.clone();
                time.push(new_time);
                let mut last_at = self.last_at.clone();
                last_at[agent] = Some(time.len() - 1);
                TourState {
                    d: self.d,
                    order: self.order,
                    nagents: self.nagents,
                    visit_to_agent,
                    time,
                    last_at,
                }
            })
            .collect();

        if num < self.nagents {
            children.sort_by(|a, b| a.value().total_cmp(&b.value()));
            children.truncate(num);
        }
        Some(children)
    }
}

/// Assign the compressed visit sequence to agents, minimizing the makespan.
///
/// Returns `(visit_to_agent, time)` with `time[i]` the meters a walker could
/// have covered when visit i is made.
fn get_visits(d: &DistMatrix, order: &[usize], nagents: usize) -> (Vec<usize>, Vec<f64>) {
    let root = TourState::root(d, order, nagents);
    let lo = (MAX_BRANCHES / nagents).max(1);
    let best = branch_bound(root, lo, lo * nagents)
        .expect("ordered tour search always reaches a terminal state");
    (best.visit_to_agent, best.time)
}

/// A complete agent assignment for one plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// `link_to_agent[i]` is the agent making link i (build order).
    pub link_to_agent: Vec<usize>,
    /// Per agent: their link indices, in build order.
    pub movements: Vec<Vec<usize>>,
}

/// Split the plan's link sequence across `nagents` agents and store the
/// walking/communication/linking time aggregates on the graph.
pub fn assign_agents(graph: &mut Graph, nagents: usize) -> Schedule {
    assert!(nagents >= 1, "at least one agent required");

    let m = graph.links.len();
    if m == 0 {
        graph.walktime = 0.0;
        graph.commtime = 0.0;
        graph.linktime = 0.0;
        return Schedule { link_to_agent: Vec::new(), movements: vec![Vec::new(); nagents] };
    }

    let d = DistMatrix::build(graph);
    let sources: Vec<usize> = graph.links.ordered().iter().map(|&(p, _)| p).collect();

    // Runs of links from one portal belong to one agent; compress them away
    // and expand the answer afterward.
    let (condensed, mult) = condense_order(&sources);
    debug!(links = m, visits = condensed.len(), nagents, "scheduling agent movements");

    let (visits, time) = get_visits(&d, &condensed, nagents);
    let link_to_agent = expand_order(&visits, &mult);

    // One communication per maximal same-agent run
    let (comm_runs, _) = condense_order(&link_to_agent);

    graph.walktime = time.last().copied().unwrap_or(0.0) / WALK_SPEED;
    graph.commtime = comm_runs.len() as f64 * COMM_SECS;
    graph.linktime = m as f64 * LINK_SECS;

    let mut movements = vec![Vec::new(); nagents];
    for (link, &agent) in link_to_agent.iter().enumerate() {
        movements[agent].push(link);
    }

    Schedule { link_to_agent, movements }
}
