//! Recursive triangle subdivision and the ordered link builder.
//!
//! A [`Triangle`] is built so that the two sides touching its final vertex
//! (`verts[0]`) go up last; placing the remaining side then completes the
//! triangle and every nested descendant in one cascade.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Deadend;
use crate::geometry;
use crate::graph::{LinkArena, Portal};

/// Hard cap on outgoing links per portal.
pub const MAX_OUT_LINKS: usize = 8;

/// Reverse as many outgoing links of `p` as possible, freeing outgoing
/// capacity. Destinations already at the cap are left alone; attributes ride
/// along with the reversal.
pub fn try_reduce_out_degree(links: &mut LinkArena, p: usize) {
    for idx in links.outgoing(p) {
        let q = links.get(idx).to;
        if links.out_degree(q) < MAX_OUT_LINKS {
            links.reverse(idx);
        }
    }
}

/// Insert the next link of the build sequence between `p` and `q`.
///
/// No-op when a link between the two already exists. The orientation is
/// adjusted to respect the outgoing cap: a reversible link leaves the less
/// saturated endpoint, and a saturated source first tries to shed existing
/// links via [`try_reduce_out_degree`], then hands the link to `q`. When
/// both ends are stuck and suboptimal plans are disallowed, fails with
/// [`Deadend`].
pub fn try_ordered_edge(
    links: &mut LinkArena,
    p: usize,
    q: usize,
    reversible: bool,
) -> Result<(), Deadend> {
    if links.between(p, q).is_some() {
        return Ok(());
    }

    let (mut p, mut q) = (p, q);
    if reversible && links.out_degree(p) > links.out_degree(q) {
        std::mem::swap(&mut p, &mut q);
    }

    if links.out_degree(p) >= MAX_OUT_LINKS {
        try_reduce_out_degree(links, p);
    }

    if links.out_degree(p) >= MAX_OUT_LINKS {
        // We tried but failed to reduce the out-degree of p
        if !reversible && !links.allow_suboptimal {
            return Err(Deadend::new(format!("portal {} already has 8 outgoing", p)));
        }

        if links.out_degree(q) >= MAX_OUT_LINKS {
            try_reduce_out_degree(links, q);
        }
        if links.out_degree(q) >= MAX_OUT_LINKS && !links.allow_suboptimal {
            return Err(Deadend::new(format!(
                "portals {} and {} already have 8 outgoing",
                p, q
            )));
        }

        std::mem::swap(&mut p, &mut q);
    }

    links.insert(p, q, reversible);
    Ok(())
}

/// One node of the recursive triangulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle {
    /// Portal indices; `verts[0]` is the final vertex.
    pub verts: [usize; 3],
    /// First-generation triangles have no parent and invert their final-side
    /// orientation so hull portals take links in instead of out.
    pub exterior: bool,
    /// Empty, or `[opposite, adj1, adj2]` after a split. `opposite` does not
    /// share the final vertex; the adjacent two inherit it.
    pub children: Vec<Triangle>,
    /// Portals strictly inside this triangle.
    pub contents: Vec<usize>,
    /// The portal this triangle was split on.
    pub center: Option<usize>,
}

impl Triangle {
    pub fn new(verts: [usize; 3], exterior: bool) -> Self {
        Self {
            verts,
            exterior,
            children: Vec::new(),
            contents: Vec::new(),
            center: None,
        }
    }

    fn corner_xyz(&self, portals: &[Portal]) -> [[f64; 3]; 3] {
        [
            portals[self.verts[0]].xyz,
            portals[self.verts[1]].xyz,
            portals[self.verts[2]].xyz,
        ]
    }

    /// Collect the candidates lying strictly inside this triangle.
    pub fn find_contents(&mut self, portals: &[Portal], candidates: &[usize]) {
        let corners = self.corner_xyz(portals);
        for &p in candidates {
            if self.verts.contains(&p) {
                continue;
            }
            if geometry::sphere_tri_contains(corners, portals[p].xyz) {
                self.contents.push(p);
            }
        }
    }

    /// Split recursively on the content portal closest to the final vertex.
    pub fn near_split(&mut self, portals: &[Portal]) {
        if self.contents.is_empty() {
            return;
        }
        let fin = portals[self.verts[0]].xyz;
        let closest = self
            .contents
            .iter()
            .copied()
            .min_by(|&a, &b| {
                sq_dist(portals[a].xyz, fin).total_cmp(&sq_dist(portals[b].xyz, fin))
            })
            .expect("contents checked non-empty");

        self.split_on(portals, closest);
        for child in &mut self.children {
            child.near_split(portals);
        }
    }

    /// Split recursively on uniformly random content portals.
    pub fn rand_split(&mut self, portals: &[Portal], rng: &mut StdRng) {
        if self.contents.is_empty() {
            return;
        }
        let p = self.contents[rng.gen_range(0..self.contents.len())];
        self.split_on(portals, p);
        for child in &mut self.children {
            child.rand_split(portals, rng);
        }
    }

    /// Produce the three children around portal `p`.
    fn split_on(&mut self, portals: &[Portal], p: usize) {
        let [v0, v1, v2] = self.verts;
        // The opposite child does not touch our final vertex; the build order
        // lets it treat itself as exterior, with p as its final vertex.
        let opposite = Triangle::new([p, v1, v2], true);
        // The adjacent two must keep our final as their final.
        let adj1 = Triangle::new([v0, v2, p], false);
        let adj2 = Triangle::new([v0, v1, p], false);

        self.children = vec![opposite, adj1, adj2];
        self.center = Some(p);

        for child in &mut self.children {
            child.find_contents(portals, &self.contents);
        }
    }

    /// Build every link of this subtree.
    ///
    /// Fails with [`Deadend`] when earlier neighbor builds already completed
    /// both sides at the final vertex: closing the remaining side would field
    /// the triangle before its interior is linked.
    pub fn build_graph(&self, links: &mut LinkArena) -> Result<(), Deadend> {
        let [v0, v1, v2] = self.verts;
        if links.between(v0, v1).is_some() && links.between(v0, v2).is_some() {
            return Err(Deadend::new("final vertex completed by neighbors"));
        }
        self.build_except_final(links)?;
        self.build_final(links)
    }

    /// Build everything but the two sides at the final vertex, depth first.
    /// All links around each split center exist before the finals go up.
    fn build_except_final(&self, links: &mut LinkArena) -> Result<(), Deadend> {
        if self.children.is_empty() {
            return try_ordered_edge(links, self.verts[2], self.verts[1], true);
        }

        // Child 0 is the one opposite the final vertex
        self.children[0].build_graph(links)?;
        for child in &self.children[1..] {
            child.build_except_final(links)?;
        }
        Ok(())
    }

    /// Build the two final-vertex sides, then the children's finals.
    fn build_final(&self, links: &mut LinkArena) -> Result<(), Deadend> {
        let [v0, v1, v2] = self.verts;
        if self.exterior {
            // Hull portals take the final links incoming to save their
            // outgoing capacity; orientation is otherwise immaterial here.
            try_ordered_edge(links, v1, v0, self.exterior)?;
            try_ordered_edge(links, v2, v0, self.exterior)?;
        } else {
            try_ordered_edge(links, v0, v1, self.exterior)?;
            try_ordered_edge(links, v0, v2, self.exterior)?;
        }

        if !self.children.is_empty() {
            for child in &self.children[1..] {
                child.build_final(links)?;
            }
        }
        Ok(())
    }

    /// Append this triangle (and descendants) to the `fields` of whichever
    /// side goes up last in the build order.
    pub fn mark_edges_with_fields(&self, links: &mut LinkArena) {
        let closer = (0..3)
            .map(|i| {
                let p = self.verts[(i + 2) % 3];
                let q = self.verts[(i + 1) % 3];
                links
                    .between(p, q)
                    .expect("triangulation side missing from completed graph")
            })
            .max_by_key(|&idx| links.get(idx).order)
            .expect("triangle has three sides");

        links.get_mut(closer).fields.push(self.verts);

        for child in &self.children {
            child.mark_edges_with_fields(links);
        }
    }
}

fn sq_dist(a: [f64; 3], b: [f64; 3]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    fn toy_portals() -> Vec<Portal> {
        // A small triangle with one interior portal near vertex a.
        vec![
            Portal::new("a", 0.0, 0.0, 1),
            Portal::new("b", 0.004, 0.0, 1),
            Portal::new("c", 0.0, 0.004, 1),
            Portal::new("d", 0.001, 0.001, 1),
        ]
    }

    #[test]
    fn find_contents_skips_vertices() {
        let g = Graph::new(toy_portals());
        let mut t = Triangle::new([0, 1, 2], true);
        let all: Vec<usize> = (0..g.portal_count()).collect();
        t.find_contents(&g.portals, &all);
        assert_eq!(t.contents, vec![3]);
    }

    #[test]
    fn near_split_produces_three_children_around_center() {
        let g = Graph::new(toy_portals());
        let mut t = Triangle::new([0, 1, 2], true);
        let all: Vec<usize> = (0..g.portal_count()).collect();
        t.find_contents(&g.portals, &all);
        t.near_split(&g.portals);

        assert_eq!(t.center, Some(3));
        assert_eq!(t.children.len(), 3);
        // opposite child does not contain the parent's final vertex
        assert!(!t.children[0].verts.contains(&0));
        assert_eq!(t.children[0].verts[0], 3);
        assert!(t.children[0].exterior);
        // adjacent children keep the parent's final vertex as their final
        assert_eq!(t.children[1].verts[0], 0);
        assert_eq!(t.children[2].verts[0], 0);
    }

    #[test]
    fn rand_split_picks_a_content_portal() {
        use rand::SeedableRng;
        let g = Graph::new(toy_portals());
        let mut t = Triangle::new([0, 1, 2], true);
        let all: Vec<usize> = (0..g.portal_count()).collect();
        t.find_contents(&g.portals, &all);
        let mut rng = StdRng::seed_from_u64(1);
        t.rand_split(&g.portals, &mut rng);
        assert_eq!(t.center, Some(3));
        assert_eq!(t.children.len(), 3);
    }

    #[test]
    fn leaf_build_produces_three_links_one_field_cascade() {
        let g = Graph::new(toy_portals());
        let mut links = LinkArena::new(g.portal_count());
        let t = Triangle::new([0, 1, 2], true);
        t.build_graph(&mut links).unwrap();
        assert_eq!(links.len(), 3);
        // except-final side first, then the two sides at vertex 0
        assert!(links.between(1, 2).is_some());
        assert_eq!(links.get(0).order, 0);
        assert!(links.between(0, 1).is_some());
        assert!(links.between(0, 2).is_some());
        for p in 0..3 {
            assert!(links.out_degree(p) <= 2);
        }
    }

    #[test]
    fn build_guard_rejects_completed_final_vertex() {
        let g = Graph::new(toy_portals());
        let mut links = LinkArena::new(g.portal_count());
        links.insert(1, 0, true);
        links.insert(2, 0, true);
        let t = Triangle::new([0, 1, 2], true);
        let err = t.build_graph(&mut links).unwrap_err();
        assert!(err.reason.contains("final vertex"));
    }

    #[test]
    fn try_ordered_edge_is_noop_on_existing_pair() {
        let mut links = LinkArena::new(3);
        try_ordered_edge(&mut links, 0, 1, false).unwrap();
        try_ordered_edge(&mut links, 1, 0, true).unwrap();
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn reversible_edge_leaves_less_saturated_endpoint() {
        let mut links = LinkArena::new(10);
        // load portal 0 with three outgoing links
        for q in 1..4 {
            try_ordered_edge(&mut links, 0, q, false).unwrap();
        }
        try_ordered_edge(&mut links, 0, 5, true).unwrap();
        // the reversible link was swapped to originate at the idle portal
        assert!(links.directed(5, 0).is_some());
    }

    #[test]
    fn saturated_source_sheds_links_or_hands_off() {
        let mut links = LinkArena::new(12);
        for q in 1..9 {
            try_ordered_edge(&mut links, 0, q, false).unwrap();
        }
        assert_eq!(links.out_degree(0), MAX_OUT_LINKS);

        try_ordered_edge(&mut links, 0, 9, false).unwrap();
        assert!(links.between(0, 9).is_some());
        assert!(links.out_degree(0) <= MAX_OUT_LINKS);
        for p in 0..12 {
            assert!(links.out_degree(p) <= MAX_OUT_LINKS);
        }
    }

    /// Portal 0 with 8 outgoing links, every destination itself saturated so
    /// nothing can be shed.
    fn stuck_hub() -> LinkArena {
        let mut links = LinkArena::new(80);
        for q in 1..=8 {
            links.insert(0, q, false);
            for t in 0..8 {
                links.insert(q, 9 + (q - 1) * 8 + t, false);
            }
        }
        links
    }

    #[test]
    fn deadend_when_irreversible_and_nothing_sheds() {
        let mut links = stuck_hub();
        links.allow_suboptimal = false;
        let err = try_ordered_edge(&mut links, 0, 75, false).unwrap_err();
        assert!(err.reason.contains("8 outgoing"));
        // nothing was inserted
        assert!(links.between(0, 75).is_none());
    }

    #[test]
    fn suboptimal_mode_hands_the_link_to_the_other_end() {
        let mut links = stuck_hub();
        try_ordered_edge(&mut links, 0, 75, false).unwrap();
        assert!(links.directed(75, 0).is_some());
        assert_eq!(links.out_degree(0), MAX_OUT_LINKS);
    }
}
