//! Text instruction sheets: key farming prep, portal ownership prep, and the
//! per-agent key and link schedules.
//!
//! All headers take the timestamp as an argument so a reloaded plan can
//! reproduce its output byte for byte.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use fieldplan_core::{geometry, Graph, Schedule};

/// AP awarded per link made.
pub const AP_PER_LINK: u64 = 313;
/// AP awarded per field completed.
pub const AP_PER_FIELD: u64 = 1250;

/// Precomputed lookups shared by all the sheet writers.
pub struct PlanPrinter<'a> {
    graph: &'a Graph,
    nagents: usize,
    /// `ordered_edges[i]` is the i-th link to make.
    ordered_edges: Vec<(usize, usize)>,
    link_to_agent: Vec<usize>,
    movements: Vec<Vec<usize>>,
    /// `agent_key_needs[agent][portal]` keys that agent must carry.
    agent_key_needs: Vec<Vec<u32>>,
    /// Portal indices in case-insensitive name order.
    name_order: Vec<usize>,
    /// Map label per portal: its rank from north to south.
    ns_label: Vec<usize>,
}

impl<'a> PlanPrinter<'a> {
    pub fn new(graph: &'a Graph, schedule: &Schedule, nagents: usize) -> Self {
        let n = graph.portal_count();
        let ordered_edges = graph.links.ordered();

        let mut agent_key_needs = vec![vec![0u32; n]; nagents];
        for (agent, movement) in schedule.movements.iter().enumerate() {
            for &e in movement {
                let (_, q) = ordered_edges[e];
                agent_key_needs[agent][q] += 1;
            }
        }

        let mut name_order: Vec<usize> = (0..n).collect();
        name_order.sort_by_key(|&i| graph.portals[i].name.to_lowercase());

        // Labels run north to south so they are easy to find on a map.
        let mut pos_order: Vec<usize> = (0..n).collect();
        pos_order.sort_by(|&a, &b| graph.portals[b].xy[1].total_cmp(&graph.portals[a].xy[1]));
        let mut ns_label = vec![0usize; n];
        for (rank, &p) in pos_order.iter().enumerate() {
            ns_label[p] = rank;
        }

        Self {
            graph,
            nagents,
            ordered_edges,
            link_to_agent: schedule.link_to_agent.clone(),
            movements: schedule.movements.clone(),
            agent_key_needs,
            name_order,
            ns_label,
        }
    }

    /// `keyPrep.txt` and `ownershipPrep.txt`.
    pub fn key_prep(&self, dir: &Path, stamp: &str) -> Result<()> {
        let path = dir.join("keyPrep.txt");
        let mut out = writer(&path)?;
        writeln!(
            out,
            "Keys Needed | Lacked |                                  {}",
            stamp
        )?;
        for &i in &self.name_order {
            writeln!(
                out,
                "{:11} | {:6} | {}",
                self.graph.links.in_degree(i),
                self.graph.key_lack(i),
                self.graph.portals[i].name
            )?;
        }
        out.flush().with_context(|| format!("writing {:?}", path))?;

        let mut unused: Vec<bool> = vec![true; self.graph.portal_count()];
        let mut in_first: Vec<&str> = Vec::new();
        let mut out_first: Vec<&str> = Vec::new();
        for &(p, q) in &self.ordered_edges {
            if unused[p] {
                out_first.push(&self.graph.portals[p].name);
                unused[p] = false;
            }
            if unused[q] {
                in_first.push(&self.graph.portals[q].name);
                unused[q] = false;
            }
        }
        in_first.sort_unstable();
        out_first.sort_unstable();

        let path = dir.join("ownershipPrep.txt");
        let mut out = writer(&path)?;
        writeln!(
            out,
            "These portals' first links are incoming                 {}",
            stamp
        )?;
        writeln!(out, "They should be at full resonators before linking\n")?;
        for name in &in_first {
            writeln!(out, "  {}", name)?;
        }
        writeln!(out, "\nThese portals' first links are outgoing\n")?;
        writeln!(out, "Their resonators can be applied when first agent arrives")?;
        for name in &out_first {
            writeln!(out, "  {}", name)?;
        }
        out.flush().with_context(|| format!("writing {:?}", path))
    }

    /// `keys_for_agent_<i>_of_<k>.txt`, one per agent.
    pub fn agent_keys(&self, dir: &Path, stamp: &str) -> Result<()> {
        for agent in 0..self.nagents {
            let path = dir.join(format!(
                "keys_for_agent_{}_of_{}.txt",
                agent + 1,
                self.nagents
            ));
            let mut out = writer(&path)?;
            writeln!(
                out,
                "Keys for Agent {} of {}                                   {}\n",
                agent + 1,
                self.nagents,
                stamp
            )?;
            writeln!(out, "Map# Keys Name")?;
            for &portal in &self.name_order {
                let keys = self.agent_key_needs[agent][portal];
                let keys = if keys == 0 { String::new() } else { keys.to_string() };
                writeln!(
                    out,
                    "{:>4} {:>4} {}",
                    self.ns_label[portal], keys, self.graph.portals[portal].name
                )?;
            }
            out.flush().with_context(|| format!("writing {:?}", path))?;
        }
        Ok(())
    }

    /// `links_for_agent_<i>_of_<k>.txt`: the full schedule with the agent's
    /// own links highlighted and non-completing links starred.
    pub fn agent_links(&self, dir: &Path, stamp: &str) -> Result<()> {
        let m = self.ordered_edges.len();

        // Walking starts at each agent's first link; deployment is free.
        let mut agent_dists = vec![0.0f64; self.nagents];
        let mut agent_links = vec![0u64; self.nagents];
        let mut agent_fields = vec![0u64; self.nagents];
        for (agent, movement) in self.movements.iter().enumerate() {
            agent_links[agent] = movement.len() as u64;
            let mut cur = match movement.first() {
                Some(&e) => self.ordered_edges[e].0,
                None => continue,
            };
            agent_fields[agent] += self.fields_of(movement[0]) as u64;
            for &e in &movement[1..] {
                let (p, _) = self.ordered_edges[e];
                agent_dists[agent] +=
                    geometry::sphere_dist(self.graph.portals[cur].latlng, self.graph.portals[p].latlng);
                cur = p;
                agent_fields[agent] += self.fields_of(e) as u64;
            }
        }

        let total_fields: u64 = agent_fields.iter().sum();
        let total_ap = AP_PER_LINK * m as u64 + AP_PER_FIELD * total_fields;
        let total_dist: f64 = agent_dists.iter().sum();
        let total_time = self.graph.walktime + self.graph.linktime + self.graph.commtime;
        let minutes = (total_time / 60.0 + 0.5) as u64;

        for agent in 0..self.nagents {
            let path = dir.join(format!(
                "links_for_agent_{}_of_{}.txt",
                agent + 1,
                self.nagents
            ));
            let mut out = writer(&path)?;
            writeln!(
                out,
                "Complete link schedule issued to agent {} of {}           {}\n",
                agent + 1,
                self.nagents,
                stamp
            )?;
            writeln!(out, "\nLinks marked with * can be made EARLY")?;

            writeln!(out, "----------- PLAN DATA ------------")?;
            writeln!(out, "Minutes:                 {} minutes", minutes)?;
            writeln!(out, "Total Distance:          {} meter", total_dist as u64)?;
            writeln!(out, "Total AP:                {}", total_ap)?;
            writeln!(
                out,
                "AP per Agent per minute: {:.2} AP/Agent/min",
                per(total_ap as f64 / self.nagents as f64, minutes as f64)
            )?;
            writeln!(
                out,
                "AP per Agent per meter:  {:.2} AP/Agent/m",
                per(total_ap as f64 / self.nagents as f64, total_dist)
            )?;

            let ap = AP_PER_LINK * agent_links[agent] + AP_PER_FIELD * agent_fields[agent];
            writeln!(out, "----------- AGENT DATA -----------")?;
            writeln!(
                out,
                "Distance traveled: {} m ({} %)",
                agent_dists[agent] as u64,
                per(100.0 * agent_dists[agent], total_dist) as u64
            )?;
            writeln!(out, "Links made:        {}", agent_links[agent])?;
            writeln!(out, "Fields completed:  {}", agent_fields[agent])?;
            writeln!(
                out,
                "Total experience:  {} AP ({} %)",
                ap,
                per(100.0 * ap as f64, total_ap as f64) as u64
            )?;

            writeln!(out, "----------------------------------")?;
            writeln!(out, "Link  Agent Map# Link Origin")?;
            writeln!(out, "                 Link Destination")?;
            writeln!(out, "----------------------------------")?;

            let mut after_other_agent = false;
            for i in 0..m {
                let (p, q) = self.ordered_edges[i];
                let link_agent = self.link_to_agent[i];
                let star = if self.fields_of(i) == 0 { "*" } else { "" };

                if link_agent != agent {
                    writeln!(
                        out,
                        "{:4}{:1} {:5}{:5} {} -> {} {}",
                        i,
                        star,
                        link_agent + 1,
                        self.ns_label[p],
                        self.graph.portals[p].name,
                        self.ns_label[q],
                        self.graph.portals[q].name
                    )?;
                    after_other_agent = true;
                } else {
                    if after_other_agent {
                        writeln!(out)?;
                    }
                    after_other_agent = false;
                    writeln!(
                        out,
                        "{:4}{:1} {:_>5}{:5} {}\n            {:4} {}\n",
                        i,
                        star,
                        link_agent + 1,
                        self.ns_label[p],
                        self.graph.portals[p].name,
                        self.ns_label[q],
                        self.graph.portals[q].name
                    )?;
                }
            }
            out.flush().with_context(|| format!("writing {:?}", path))?;
        }
        Ok(())
    }

    fn fields_of(&self, link: usize) -> usize {
        let (p, q) = self.ordered_edges[link];
        let idx = self
            .graph
            .links
            .directed(p, q)
            .expect("ordered edge missing from arena");
        self.graph.links.get(idx).fields.len()
    }
}

fn writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("creating {:?}", path))?;
    Ok(BufWriter::new(file))
}

/// Safe ratio for the stats lines; zero when the denominator is zero.
fn per(num: f64, denom: f64) -> f64 {
    if denom > 0.0 {
        num / denom
    } else {
        0.0
    }
}
