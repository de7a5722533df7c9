//! The mutable plan container: portals, the directed link arena and the
//! first-generation triangulation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geometry::{self, LatLng};
use crate::triangle::Triangle;

/// A geolocated node. Identity is the index into [`Graph::portals`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portal {
    pub name: String,
    /// Geographic position in radians.
    pub latlng: LatLng,
    /// Unit-sphere coordinate derived from `latlng`.
    pub xyz: [f64; 3],
    /// Gnomonic plane coordinate, filled in by [`Graph::new`].
    pub xy: [f64; 2],
    /// Keys already owned for this portal.
    pub keys: u32,
}

impl Portal {
    pub fn new(name: impl Into<String>, lat_deg: f64, lng_deg: f64, keys: u32) -> Self {
        let latlng = LatLng::from_degrees(lat_deg, lng_deg);
        Self {
            name: name.into(),
            latlng,
            xyz: geometry::latlng_to_xyz(latlng),
            xy: [0.0, 0.0],
            keys,
        }
    }
}

/// A directed link between two portals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub from: usize,
    pub to: usize,
    /// Position in the global build sequence; a permutation of 0..M-1.
    pub order: usize,
    /// Whether either orientation would still produce the required fields.
    pub reversible: bool,
    /// Triangles completed the moment this link is built.
    pub fields: Vec<[usize; 3]>,
}

/// Arena of links in insertion order, doubling as the backtracking log.
///
/// A link's vector index equals its insertion position, so unwinding a failed
/// build is watermark-and-truncate. Reversals keep the index and attributes
/// and only swap the endpoints.
#[derive(Debug, Clone)]
pub struct LinkArena {
    links: Vec<Link>,
    index: HashMap<(usize, usize), usize>,
    out_deg: Vec<usize>,
    in_deg: Vec<usize>,
    /// When set, an edge may be inserted from a saturated portal instead of
    /// failing the build; the planner re-verifies the cap afterward.
    pub allow_suboptimal: bool,
}

impl LinkArena {
    pub fn new(portal_count: usize) -> Self {
        Self {
            links: Vec::new(),
            index: HashMap::new(),
            out_deg: vec![0; portal_count],
            in_deg: vec![0; portal_count],
            allow_suboptimal: true,
        }
    }

    /// Rebuild an arena from persisted links, preserving stored orders.
    pub fn from_links(portal_count: usize, links: Vec<Link>) -> Self {
        let mut arena = Self::new(portal_count);
        for link in links {
            let idx = arena.links.len();
            arena.index.insert((link.from, link.to), idx);
            arena.out_deg[link.from] += 1;
            arena.in_deg[link.to] += 1;
            arena.links.push(link);
        }
        arena
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn out_degree(&self, p: usize) -> usize {
        self.out_deg[p]
    }

    pub fn in_degree(&self, p: usize) -> usize {
        self.in_deg[p]
    }

    /// Index of the link p -> q, if present in that direction.
    pub fn directed(&self, p: usize, q: usize) -> Option<usize> {
        self.index.get(&(p, q)).copied()
    }

    /// Index of a link between p and q in either direction.
    pub fn between(&self, p: usize, q: usize) -> Option<usize> {
        self.directed(p, q).or_else(|| self.directed(q, p))
    }

    pub fn get(&self, idx: usize) -> &Link {
        &self.links[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut Link {
        &mut self.links[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    /// Indices of the links currently leaving p, in insertion order.
    pub fn outgoing(&self, p: usize) -> Vec<usize> {
        self.links
            .iter()
            .enumerate()
            .filter(|(_, l)| l.from == p)
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of the links currently entering q, in insertion order.
    pub fn incoming(&self, q: usize) -> Vec<usize> {
        self.links
            .iter()
            .enumerate()
            .filter(|(_, l)| l.to == q)
            .map(|(i, _)| i)
            .collect()
    }

    /// Append a new link with `order = len()`.
    pub fn insert(&mut self, p: usize, q: usize, reversible: bool) -> usize {
        let idx = self.links.len();
        self.links.push(Link {
            from: p,
            to: q,
            order: idx,
            reversible,
            fields: Vec::new(),
        });
        self.index.insert((p, q), idx);
        self.out_deg[p] += 1;
        self.in_deg[q] += 1;
        idx
    }

    /// Reverse the direction of the link at `idx`, keeping its attributes.
    pub fn reverse(&mut self, idx: usize) {
        let (p, q) = {
            let link = &mut self.links[idx];
            let (p, q) = (link.from, link.to);
            link.from = q;
            link.to = p;
            (p, q)
        };
        self.index.remove(&(p, q));
        self.index.insert((q, p), idx);
        self.out_deg[p] -= 1;
        self.in_deg[p] += 1;
        self.out_deg[q] += 1;
        self.in_deg[q] -= 1;
    }

    /// Current rollback position; pass to [`LinkArena::truncate_to`].
    pub fn watermark(&self) -> usize {
        self.links.len()
    }

    /// Drop every link inserted since `mark`, regardless of later reversals.
    pub fn truncate_to(&mut self, mark: usize) {
        while self.links.len() > mark {
            let link = self.links.pop().expect("watermark beyond arena length");
            self.index.remove(&(link.from, link.to));
            self.out_deg[link.from] -= 1;
            self.in_deg[link.to] -= 1;
        }
    }

    /// Links sorted by build order; `result[k]` is the k-th link to make.
    pub fn ordered(&self) -> Vec<(usize, usize)> {
        let mut out = vec![(0, 0); self.links.len()];
        for link in &self.links {
            out[link.order] = (link.from, link.to);
        }
        out
    }
}

/// A complete (or in-progress) plan.
#[derive(Debug, Clone)]
pub struct Graph {
    pub portals: Vec<Portal>,
    pub links: LinkArena,
    /// First-generation triangles; descendants hang off their children.
    pub triangulation: Vec<Triangle>,
    /// Seconds spent walking, assuming constant walking speed.
    pub walktime: f64,
    /// Seconds waiting on link-completion messages.
    pub commtime: f64,
    /// Seconds navigating the link menu.
    pub linktime: f64,
}

impl Graph {
    /// Build a graph over `portals`, computing their planar coordinates.
    pub fn new(mut portals: Vec<Portal>) -> Self {
        let latlng: Vec<LatLng> = portals.iter().map(|p| p.latlng).collect();
        let xyz: Vec<[f64; 3]> = portals.iter().map(|p| p.xyz).collect();
        let xy = geometry::gnomonic_projection(&latlng, &xyz);
        for (portal, xy) in portals.iter_mut().zip(xy) {
            portal.xy = xy;
        }
        let n = portals.len();
        Self {
            portals,
            links: LinkArena::new(n),
            triangulation: Vec::new(),
            walktime: 0.0,
            commtime: 0.0,
            linktime: 0.0,
        }
    }

    /// Reassemble a graph from persisted parts (planar coordinates are taken
    /// as stored, not recomputed).
    pub fn from_parts(
        portals: Vec<Portal>,
        links: Vec<Link>,
        triangulation: Vec<Triangle>,
        walktime: f64,
        commtime: f64,
        linktime: f64,
    ) -> Self {
        let n = portals.len();
        Self {
            portals,
            links: LinkArena::from_links(n, links),
            triangulation,
            walktime,
            commtime,
            linktime,
        }
    }

    pub fn portal_count(&self) -> usize {
        self.portals.len()
    }

    /// Keys portal p still needs on top of what it owns, floored at zero.
    pub fn key_lack(&self, p: usize) -> u32 {
        (self.links.in_degree(p) as i64 - self.portals[p].keys as i64).max(0) as u32
    }

    /// (total, max) key shortfall over all portals; the planner score is
    /// total + 2 * max.
    pub fn key_shortfalls(&self) -> (u32, u32) {
        let mut total = 0;
        let mut max = 0;
        for p in 0..self.portals.len() {
            let lack = self.key_lack(p);
            total += lack;
            max = max.max(lack);
        }
        (total, max)
    }

    /// Annotate each link with the triangles it completes. Appends, so this
    /// must run exactly once per plan.
    pub fn mark_fields(&mut self) {
        let Graph { triangulation, links, .. } = self;
        for tri in triangulation.iter() {
            tri.mark_edges_with_fields(links);
        }
    }

    /// Total triangles across the whole triangulation, all generations.
    pub fn triangle_count(&self) -> usize {
        fn count(t: &Triangle) -> usize {
            1 + t.children.iter().map(count).sum::<usize>()
        }
        self.triangulation.iter().map(count).sum()
    }
}
