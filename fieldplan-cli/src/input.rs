//! Portal-list parsing and input validation.

use std::collections::HashMap;

use regex::Regex;

use fieldplan_core::geometry;
use fieldplan_core::{PlanError, Portal};

/// Parse a portal list: one portal per line, `;` separated, either
///
/// ```text
/// <name> ; <lat> ; <lng> [; <keys>]
/// <name> ; <url containing ll=<lat>,<lng>> [; <keys>]
/// ```
///
/// with coordinates in decimal degrees. Keys default to 0; lines matching
/// neither pattern are skipped.
pub fn parse_portal_list(text: &str) -> Vec<Portal> {
    let url_pat = Regex::new(r"^([^;]*);.*ll=([-0-9.]+),([-0-9.]+)\s*;?\s*(\d+)?")
        .expect("static pattern");
    let csv_pat = Regex::new(r"^([^;]*);\s*([-0-9.]+)\s*;\s*([-0-9.]+)\s*;?\s*(\d+)?")
        .expect("static pattern");

    let mut portals = Vec::new();
    for line in text.lines() {
        let caps = match url_pat.captures(line).or_else(|| csv_pat.captures(line)) {
            Some(c) => c,
            None => continue,
        };

        let name = caps.get(1).map_or("", |m| m.as_str()).trim();
        let lat: f64 = match caps[2].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        let lng: f64 = match caps[3].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        let keys: u32 = caps
            .get(4)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);

        portals.push(Portal::new(name, lat, lng, keys));
    }
    portals
}

/// Reject inputs the core is not defined on: too few portals, duplicate
/// coordinates, or a spread too wide for the gnomonic projection.
pub fn validate(portals: &[Portal]) -> Result<(), PlanError> {
    if portals.len() < 3 {
        return Err(PlanError::InvalidInput(format!(
            "need at least 3 portals, got {}",
            portals.len()
        )));
    }

    let mut seen: HashMap<(u64, u64), usize> = HashMap::new();
    for (i, portal) in portals.iter().enumerate() {
        let key = (portal.latlng.lat.to_bits(), portal.latlng.lng.to_bits());
        if let Some(&j) = seen.get(&key) {
            return Err(PlanError::InvalidInput(format!(
                "portals {:?} and {:?} share the same coordinates",
                portals[j].name, portal.name
            )));
        }
        seen.insert(key, i);
    }

    let latlng: Vec<_> = portals.iter().map(|p| p.latlng).collect();
    if geometry::max_pairwise_arc(&latlng) >= std::f64::consts::FRAC_PI_2 {
        return Err(PlanError::InvalidInput(
            "portals span more than a quarter arc; the planar projection breaks down".into(),
        ));
    }

    Ok(())
}
