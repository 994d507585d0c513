//! Majority gate over the most recent note decisions.

use std::collections::VecDeque;

pub const DEFAULT_STABILITY_DEPTH: usize = 2;

/// Remembers the last `depth` decisions, newest first. A decision is only
/// confirmed once every slot holds the same value, so a fresh ring needs
/// `depth` agreeing decisions before anything is confirmed.
#[derive(Debug, Clone)]
pub struct NoteStabilizer<T> {
    decisions: VecDeque<T>,
    depth: usize,
}

impl<T: PartialEq + Clone> NoteStabilizer<T> {
    pub fn new(depth: usize) -> Self {
        assert!(depth > 0, "stabilizer depth must be positive");
        Self {
            decisions: VecDeque::with_capacity(depth),
            depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// Records a decision and returns it if the ring is now unanimous.
    pub fn push(&mut self, decision: T) -> Option<T> {
        self.decisions.push_front(decision);
        self.decisions.truncate(self.depth);
        self.agreed().cloned()
    }

    pub fn agreed(&self) -> Option<&T> {
        if self.decisions.len() < self.depth {
            return None;
        }
        let newest = self.decisions.front()?;
        self.decisions
            .iter()
            .all(|decision| decision == newest)
            .then_some(newest)
    }

    pub fn clear(&mut self) {
        self.decisions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_decision_becomes_stable() {
        let mut ring = NoteStabilizer::new(DEFAULT_STABILITY_DEPTH);
        assert_eq!(ring.push("A"), None);
        assert_eq!(ring.push("A"), Some("A"));
        assert_eq!(ring.push("A"), Some("A"));
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn distinct_decisions_never_stabilize() {
        let mut ring = NoteStabilizer::new(3);
        for note in ["A", "B", "C", "D", "E"] {
            assert_eq!(ring.push(note), None);
        }
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn single_glitch_breaks_agreement_once() {
        let mut ring = NoteStabilizer::new(2);
        ring.push("E");
        assert_eq!(ring.push("E"), Some("E"));
        assert_eq!(ring.push("F"), None);
        assert_eq!(ring.push("E"), None);
        assert_eq!(ring.push("E"), Some("E"));
    }

    #[test]
    fn clear_requires_fresh_agreement() {
        let mut ring = NoteStabilizer::new(2);
        ring.push("G");
        ring.push("G");
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.agreed(), None);
        assert_eq!(ring.push("G"), None);
    }

    #[test]
    fn depth_one_passes_everything() {
        let mut ring = NoteStabilizer::new(1);
        assert_eq!(ring.push(3), Some(3));
        assert_eq!(ring.push(4), Some(4));
    }
}
