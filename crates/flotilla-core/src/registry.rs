use std::{collections::HashMap, fmt};

use crate::{error::TaskError, handler::Handler};

type HandlerCtor = Box<dyn Fn() -> Box<dyn Handler> + Send + Sync>;

/// Registry mapping a task kind to a handler constructor.
///
/// The composition root populates the registry once, before the captain
/// launches, and then shares it read-only behind an `Arc`; no locking is
/// needed at steady state. Tests pass their own registry instead of mutating
/// process-wide state.
#[derive(Default)]
pub struct HandlerRegistry {
    ctors: HashMap<String, HandlerCtor>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            ctors: HashMap::new(),
        }
    }

    /// Register a constructor for a kind.
    ///
    /// Re-registering a kind replaces the previous constructor (last write
    /// wins).
    pub fn register<F>(&mut self, kind: impl Into<String>, ctor: F)
    where
        F: Fn() -> Box<dyn Handler> + Send + Sync + 'static,
    {
        self.ctors.insert(kind.into(), Box::new(ctor));
    }

    /// Whether a constructor is registered for the kind.
    pub fn contains(&self, kind: &str) -> bool {
        self.ctors.contains_key(kind)
    }

    /// Construct a fresh handler for the kind.
    pub fn resolve(&self, kind: &str) -> Result<Box<dyn Handler>, TaskError> {
        let ctor = self
            .ctors
            .get(kind)
            .ok_or_else(|| TaskError::UnknownTaskType(kind.to_string()))?;
        Ok(ctor())
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.ctors.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}
