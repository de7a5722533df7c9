use thiserror::Error;

/// Local infeasibility inside a triangle build. Caught at the enclosing
/// `triangulate` frame, which rolls the link arena back and retries; it
/// never escapes the planner.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("deadend: {reason}")]
pub struct Deadend {
    pub reason: String,
}

impl Deadend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[derive(Error, Debug)]
pub enum PlanError {
    /// Every outer planner attempt failed to produce a feasible plan.
    #[error("planner gave up after {attempts} attempts")]
    PlannerExhausted { attempts: usize },

    /// Rejected at the input boundary; the core itself never raises this.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
