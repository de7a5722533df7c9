//! End-to-end: portal list text in, instruction sheets out.

use std::fs;

use fieldplan_cli::input::{parse_portal_list, validate};
use fieldplan_cli::printers::PlanPrinter;
use fieldplan_core::{assign_agents, plan, Graph, PlannerConfig};

const PORTAL_LIST: &str = "\
Fountain; 52.0; 4.0; 2
Mural; 52.003; 4.001; 1
Old Gate; 52.001; 4.004; 1
Bandstand; 51.998; 4.002
scribble line without coordinates
Clock Tower ; https://intel.example/intel?z=17&ll=52.0015,4.0015 ; 1
";

#[test]
fn portal_list_to_instruction_sheets() {
    let portals = parse_portal_list(PORTAL_LIST);
    assert_eq!(portals.len(), 5);
    validate(&portals).unwrap();

    let mut graph = plan(
        &Graph::new(portals),
        &PlannerConfig { seed: Some(2), ..Default::default() },
    )
    .unwrap();

    let nagents = 2;
    let schedule = assign_agents(&mut graph, nagents);
    assert_eq!(schedule.link_to_agent.len(), graph.links.len());
    let assigned: usize = schedule.movements.iter().map(|m| m.len()).sum();
    assert_eq!(assigned, graph.links.len());
    assert!(graph.walktime >= 0.0);
    assert_eq!(graph.linktime, graph.links.len() as f64 * 15.0);

    let dir = tempfile::tempdir().unwrap();
    let printer = PlanPrinter::new(&graph, &schedule, nagents);
    printer.key_prep(dir.path(), "stamp").unwrap();
    printer.agent_keys(dir.path(), "stamp").unwrap();
    printer.agent_links(dir.path(), "stamp").unwrap();

    let key_prep = fs::read_to_string(dir.path().join("keyPrep.txt")).unwrap();
    assert!(key_prep.contains("Keys Needed"));
    assert!(key_prep.contains("Fountain"));
    assert!(key_prep.contains("Clock Tower"));

    let ownership = fs::read_to_string(dir.path().join("ownershipPrep.txt")).unwrap();
    assert!(ownership.contains("first links are incoming"));
    assert!(ownership.contains("first links are outgoing"));

    let links_1 = fs::read_to_string(dir.path().join("links_for_agent_1_of_2.txt")).unwrap();
    assert!(links_1.contains("----------- PLAN DATA ------------"));
    assert!(links_1.contains("Total AP:"));
    // every link listed once
    for i in 0..graph.links.len() {
        assert!(links_1.contains(&format!("{:4}", i)));
    }

    let keys_2 = fs::read_to_string(dir.path().join("keys_for_agent_2_of_2.txt")).unwrap();
    assert!(keys_2.contains("Map# Keys Name"));
}

#[test]
fn agent_key_needs_cover_every_link_target() {
    let portals = parse_portal_list(PORTAL_LIST);
    let mut graph = plan(
        &Graph::new(portals),
        &PlannerConfig { seed: Some(8), ..Default::default() },
    )
    .unwrap();
    let schedule = assign_agents(&mut graph, 3);

    // each link consumes one key at its destination, whoever makes it
    let mut needed = vec![0u32; graph.portal_count()];
    for link in graph.links.iter() {
        needed[link.to] += 1;
    }
    let per_portal_in: Vec<u32> = (0..graph.portal_count())
        .map(|p| graph.links.in_degree(p) as u32)
        .collect();
    assert_eq!(needed, per_portal_in);
    assert_eq!(schedule.movements.len(), 3);
}
