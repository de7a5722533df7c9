//! Link-order post-processing and run-length helpers shared with the
//! scheduler.

use crate::graph::LinkArena;

/// Collapse runs of equal consecutive values into `(values, multiplicities)`.
///
/// `condense_order(&[0,5,5,5,2,2,3,0])` is `([0,5,2,3,0], [1,3,2,1,1])`.
pub fn condense_order(order: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let mut values = Vec::new();
    let mut mult = Vec::new();

    let mut iter = order.iter();
    let Some(&first) = iter.next() else {
        return (values, mult);
    };
    let mut cur = first;
    let mut count = 1;
    for &v in iter {
        if v == cur {
            count += 1;
        } else {
            values.push(cur);
            mult.push(count);
            cur = v;
            count = 1;
        }
    }
    values.push(cur);
    mult.push(count);

    (values, mult)
}

/// Inverse of [`condense_order`]: repeat `values[i]` `mult[i]` times.
pub fn expand_order(values: &[usize], mult: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(mult.iter().sum());
    for (&v, &m) in values.iter().zip(mult) {
        out.extend(std::iter::repeat(v).take(m));
    }
    out
}

/// Move links that complete no field to just before the earliest link sharing
/// their source portal.
///
/// Such links can be made as soon as the agent first stands at the source, so
/// clustering them there saves travel. The relative order of field-completing
/// links is untouched, and running the pass twice changes nothing.
pub fn improve_edge_order(links: &mut LinkArena) {
    let m = links.len();
    let mut ordered = links.ordered();

    for j in 1..m {
        let (p, _) = ordered[j];
        if !link_at(links, ordered[j]).fields.is_empty() {
            continue;
        }

        // The first time this portal is used as an origin
        let origin = p;
        let mut i = 0;
        while ordered[i].0 != origin {
            i += 1;
        }
        // Slot in behind links already clustered there, so repeated passes
        // leave the order alone.
        while i < j && ordered[i].0 == origin && link_at(links, ordered[i]).fields.is_empty() {
            i += 1;
        }
        if i < j {
            let moved = ordered.remove(j);
            ordered.insert(i, moved);
        }
    }

    for (pos, &(p, q)) in ordered.iter().enumerate() {
        let idx = links
            .directed(p, q)
            .expect("ordered() returned a missing link");
        links.get_mut(idx).order = pos;
    }
}

fn link_at<'a>(links: &'a LinkArena, (p, q): (usize, usize)) -> &'a crate::graph::Link {
    let idx = links
        .directed(p, q)
        .expect("ordered() returned a missing link");
    links.get(idx)
}
