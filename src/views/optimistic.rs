//! Optimistic list removal with explicit reconciliation.
//!
//! `Pending -> Applied -> Confirmed | RolledBack`. The item leaves the
//! list as soon as the mutation is applied; the server result then either
//! confirms the removal or puts the item back where it was.

use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    /// Mutation requested, nothing changed locally yet.
    Pending,
    /// Item removed locally, server call outstanding.
    Applied,
    /// Server accepted the mutation.
    Confirmed,
    /// Server rejected it; the item is back in the list.
    RolledBack,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    Confirmed,
    RolledBack { error: String },
}

/// In-flight removal of one item from a list.
#[derive(Debug)]
pub struct OptimisticRemoval<T> {
    item: Option<T>,
    index: usize,
    phase: MutationPhase,
}

impl<T> OptimisticRemoval<T> {
    pub fn new() -> Self {
        Self {
            item: None,
            index: 0,
            phase: MutationPhase::Pending,
        }
    }

    pub fn phase(&self) -> MutationPhase {
        self.phase
    }

    /// Remove the first item matching `pred`.
    ///
    /// Returns false (and stays `Pending`) when nothing matched.
    pub fn apply(&mut self, list: &mut Vec<T>, pred: impl Fn(&T) -> bool) -> bool {
        if self.phase != MutationPhase::Pending {
            return false;
        }
        let Some(index) = list.iter().position(pred) else {
            return false;
        };
        self.item = Some(list.remove(index));
        self.index = index;
        self.phase = MutationPhase::Applied;
        true
    }

    /// Feed the server result back into the list.
    pub fn settle<E: Display>(&mut self, list: &mut Vec<T>, result: Result<(), E>) -> Settled {
        match result {
            Ok(()) => {
                self.item = None;
                self.phase = MutationPhase::Confirmed;
                Settled::Confirmed
            }
            Err(e) => {
                if let Some(item) = self.item.take() {
                    let index = self.index.min(list.len());
                    list.insert(index, item);
                }
                self.phase = MutationPhase::RolledBack;
                Settled::RolledBack {
                    error: e.to_string(),
                }
            }
        }
    }
}

impl<T> Default for OptimisticRemoval<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmed_removal_stays_removed() {
        let mut list = vec![1, 2, 3];
        let mut m = OptimisticRemoval::new();
        assert!(m.apply(&mut list, |x| *x == 2));
        assert_eq!(m.phase(), MutationPhase::Applied);
        assert_eq!(list, vec![1, 3]);

        assert_eq!(m.settle(&mut list, Ok::<(), String>(())), Settled::Confirmed);
        assert_eq!(list, vec![1, 3]);
        assert_eq!(m.phase(), MutationPhase::Confirmed);
    }

    #[test]
    fn rejected_removal_restores_position() {
        let mut list = vec!["a", "b", "c"];
        let mut m = OptimisticRemoval::new();
        m.apply(&mut list, |x| *x == "b");

        let settled = m.settle(&mut list, Err("Deny failed"));
        assert_eq!(
            settled,
            Settled::RolledBack {
                error: "Deny failed".to_string()
            }
        );
        assert_eq!(list, vec!["a", "b", "c"]);
        assert_eq!(m.phase(), MutationPhase::RolledBack);
    }

    #[test]
    fn missing_item_is_not_applied() {
        let mut list = vec![1];
        let mut m = OptimisticRemoval::new();
        assert!(!m.apply(&mut list, |x| *x == 9));
        assert_eq!(m.phase(), MutationPhase::Pending);
    }

    #[test]
    fn rollback_clamps_index_when_list_shrank() {
        let mut list = vec![1, 2, 3];
        let mut m = OptimisticRemoval::new();
        m.apply(&mut list, |x| *x == 3);
        list.clear();
        m.settle(&mut list, Err("x"));
        assert_eq!(list, vec![3]);
    }
}
