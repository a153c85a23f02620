use serde::{Deserialize, Serialize};

/// Subscription generation.
///
/// Every (re)subscription gets a new, strictly greater generation. Messages
/// carry the generation of the subscription that produced them so consumers
/// can discard deliveries from superseded subscriptions that were already in
/// flight when the subscription was torn down.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    /// The generation before any subscription exists.
    pub const INITIAL: Generation = Generation(0);

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for Generation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// A message tagged with the generation of the subscription that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tagged<M> {
    generation: Generation,
    payload: M,
}

impl<M> Tagged<M> {
    pub fn new(generation: Generation, payload: M) -> Self {
        Self {
            generation,
            payload,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn into_payload(self) -> M {
        self.payload
    }

    /// Whether this message belongs to the `current` subscription.
    pub fn is_current(&self, current: Generation) -> bool {
        self.generation == current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generations_increase() {
        let g1 = Generation::INITIAL.next();
        let g2 = g1.next();
        assert!(g2 > g1);
        assert_eq!(g2.value(), 2);
    }

    #[test]
    fn tagged_detects_superseded_generation() {
        let g1 = Generation::INITIAL.next();
        let msg = Tagged::new(g1, "snapshot");
        assert!(msg.is_current(g1));
        assert!(!msg.is_current(g1.next()));
        assert_eq!(msg.into_payload(), "snapshot");
    }
}
