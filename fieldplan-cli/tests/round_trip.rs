//! A saved plan must reload into a graph that drives the printers to
//! byte-identical output.

use std::fs;
use std::path::Path;

use fieldplan_cli::plan::PlanFile;
use fieldplan_cli::printers::PlanPrinter;
use fieldplan_core::{assign_agents, plan, Graph, PlannerConfig, Portal};

const STAMP: &str = "2026-08-01 12:00:00 +0000";

fn sample_graph() -> Graph {
    let portals = vec![
        Portal::new("Fountain", 52.0, 4.0, 2),
        Portal::new("Mural", 52.003, 4.001, 1),
        Portal::new("Old Gate", 52.001, 4.004, 1),
        Portal::new("Bandstand", 51.998, 4.002, 0),
        Portal::new("Clock Tower", 52.0015, 4.0015, 1),
    ];
    plan(
        &Graph::new(portals),
        &PlannerConfig { seed: Some(13), ..Default::default() },
    )
    .expect("plan")
}

fn print_all(graph: &mut Graph, nagents: usize, dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    let schedule = assign_agents(graph, nagents);
    let printer = PlanPrinter::new(graph, &schedule, nagents);
    printer.key_prep(dir, STAMP).unwrap();
    printer.agent_keys(dir, STAMP).unwrap();
    printer.agent_links(dir, STAMP).unwrap();
}

#[test]
fn plan_file_round_trips_the_graph() {
    let g = sample_graph();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lastPlan.json");

    PlanFile::from_graph(&g).save(&path).unwrap();
    let reloaded = PlanFile::load(&path).unwrap().into_graph();

    assert_eq!(reloaded.portals, g.portals);
    assert_eq!(reloaded.links.ordered(), g.links.ordered());
    assert_eq!(reloaded.triangulation, g.triangulation);
    assert_eq!(reloaded.walktime, g.walktime);
    for p in 0..g.portal_count() {
        assert_eq!(reloaded.links.out_degree(p), g.links.out_degree(p));
        assert_eq!(reloaded.links.in_degree(p), g.links.in_degree(p));
    }
}

#[test]
fn reloaded_plan_prints_identical_bytes() {
    let mut original = sample_graph();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lastPlan.json");
    PlanFile::from_graph(&original).save(&path).unwrap();
    let mut reloaded = PlanFile::load(&path).unwrap().into_graph();

    let out_a = dir.path().join("a");
    let out_b = dir.path().join("b");
    print_all(&mut original, 2, &out_a);
    print_all(&mut reloaded, 2, &out_b);

    for name in [
        "keyPrep.txt",
        "ownershipPrep.txt",
        "keys_for_agent_1_of_2.txt",
        "keys_for_agent_2_of_2.txt",
        "links_for_agent_1_of_2.txt",
        "links_for_agent_2_of_2.txt",
    ] {
        let a = fs::read(out_a.join(name)).unwrap();
        let b = fs::read(out_b.join(name)).unwrap();
        assert_eq!(a, b, "{} differs after reload", name);
    }
}

#[test]
fn saving_twice_is_byte_stable() {
    let g = sample_graph();
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("one.json");
    let second = dir.path().join("two.json");
    PlanFile::from_graph(&g).save(&first).unwrap();
    PlanFile::from_graph(&g).save(&second).unwrap();
    assert_eq!(fs::read(first).unwrap(), fs::read(second).unwrap());
}
