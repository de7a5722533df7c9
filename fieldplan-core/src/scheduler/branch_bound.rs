//! A small beam-limited branch-and-bound over an abstract search state.

/// A node in the search tree. All states at one depth must either all split
/// or all be terminal.
pub trait SearchState: Sized {
    /// The objective being minimized.
    fn value(&self) -> f64;

    /// Up to `num` children, or None when this state is terminal.
    fn split(&self, num: usize) -> Option<Vec<Self>>;
}

/// Expand the tree breadth first, growing up to `hi` branches per level and
/// trimming to the `lo` best before descending. Terminal states collect in a
/// finals set; the best of them is returned (None only for a rootless
/// search, which cannot happen with a valid root).
///
/// The objective is monotone in the beam width: a larger `hi` never yields a
/// worse final value.
pub fn branch_bound<S: SearchState>(root: S, lo: usize, hi: usize) -> Option<S> {
    let split_size = (hi / lo).max(1);

    let mut states = vec![root];
    let mut finals: Vec<S> = Vec::new();

    while !states.is_empty() {
        let mut branches: Vec<S> = Vec::new();
        for state in std::mem::take(&mut states) {
            match state.split(split_size) {
                Some(children) => branches.extend(children),
                None => finals.push(state),
            }
        }
        branches.sort_by(|a, b| a.value().total_cmp(&b.value()));
        branches.truncate(lo);
        states = branches;
    }

    finals
        .into_iter()
        .min_by(|a, b| a.value().total_cmp(&b.value()))
}
