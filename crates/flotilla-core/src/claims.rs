use std::{collections::HashSet, sync::Mutex};

/// Set of task names currently owned by some worker.
///
/// `claim` is an atomic test-and-set: the winner becomes the single driver
/// of that task, losers skip it. The executor releases only on terminal
/// failure; successful and cancelled tasks stay claimed so other workers
/// iterating the same batch do not re-run them. A queue-driven derivative,
/// where no two workers can pick up the same task, should release on
/// success instead.
#[derive(Default, Debug)]
pub struct ClaimSet {
    names: Mutex<HashSet<String>>,
}

impl ClaimSet {
    /// Create an empty claim set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take exclusive ownership of a task name.
    ///
    /// Returns `true` iff the name was not previously claimed.
    pub fn claim(&self, name: &str) -> bool {
        self.names
            .lock()
            .expect("claim set mutex poisoned")
            .insert(name.to_string())
    }

    /// Make a name claimable again. Idempotent.
    pub fn release(&self, name: &str) {
        self.names
            .lock()
            .expect("claim set mutex poisoned")
            .remove(name);
    }
}
