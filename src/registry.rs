//! Per-group window order.
//!
//! The window manager reports group members in its own stacking order, which
//! changes every time a window is raised.  [`GroupRegistry`] remembers the
//! order windows were first seen in (plus any explicit reorders) so that
//! cells do not shuffle around each time the layout is recomputed.

use crate::command::{Direction, GroupId, WindowId};
use log::debug;
use std::collections::{HashMap, HashSet};

/// Remembered presentation order for every group seen so far.
///
/// Owned by the [`Arranger`](crate::arranger::Arranger) and only ever touched
/// from the control loop, so no locking is involved.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    orders: HashMap<GroupId, Vec<WindowId>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored order for `group`, if any.
    pub fn order(&self, group: GroupId) -> Option<&[WindowId]> {
        self.orders.get(&group).map(Vec::as_slice)
    }

    /// Number of groups with a stored order.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Merge the freshly observed membership of `group` into its stored
    /// order and return the result.
    ///
    /// Windows that are still present keep their previous relative
    /// positions; windows seen for the first time are appended in the order
    /// they appear in `observed`.  An empty `observed` forgets the group.
    pub fn reconcile(&mut self, group: GroupId, observed: &[WindowId]) -> &[WindowId] {
        if observed.is_empty() {
            self.forget(group);
            return &[];
        }

        let mut remaining: HashSet<WindowId> = observed.iter().copied().collect();
        let stored = self.orders.entry(group).or_default();

        let mut merged = Vec::with_capacity(observed.len());
        for &win in stored.iter().chain(observed) {
            if remaining.remove(&win) {
                merged.push(win);
            }
        }
        *stored = merged;
        stored.as_slice()
    }

    /// Swap `window` with its neighbour in `direction`.
    ///
    /// Returns the new order, or `None` if the window is not part of the
    /// group's order or is already at that end of it.
    pub fn move_window(
        &mut self,
        group: GroupId,
        window: WindowId,
        direction: Direction,
    ) -> Option<&[WindowId]> {
        let order = self.orders.get_mut(&group)?;
        let idx = order.iter().position(|&w| w == window)?;
        let neighbour = match direction {
            Direction::Left => idx.checked_sub(1)?,
            Direction::Right => Some(idx + 1).filter(|&n| n < order.len())?,
        };
        order.swap(idx, neighbour);
        debug!("group {}: moved {} {}", group, window, direction);
        Some(order.as_slice())
    }

    /// Drop the stored order for `group`.
    pub fn forget(&mut self, group: GroupId) {
        if self.orders.remove(&group).is_some() {
            debug!("group {}: forgot order", group);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const G: GroupId = GroupId(1);
    const A: WindowId = WindowId(0xa);
    const B: WindowId = WindowId(0xb);
    const C: WindowId = WindowId(0xc);
    const D: WindowId = WindowId(0xd);

    #[test]
    fn first_reconcile_takes_observed_order() {
        let mut reg = GroupRegistry::new();
        assert_eq!(reg.reconcile(G, &[C, A, B]), &[C, A, B]);
        assert_eq!(reg.order(G), Some(&[C, A, B][..]));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let mut reg = GroupRegistry::new();
        let first = reg.reconcile(G, &[A, B, C]).to_vec();
        let second = reg.reconcile(G, &[A, B, C]).to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn new_windows_are_appended() {
        let mut reg = GroupRegistry::new();
        reg.reconcile(G, &[A, B]);
        assert_eq!(reg.reconcile(G, &[A, B, C]), &[A, B, C]);
    }

    #[test]
    fn new_window_appended_even_if_stacked_first() {
        let mut reg = GroupRegistry::new();
        reg.reconcile(G, &[A, B]);
        assert_eq!(reg.reconcile(G, &[C, B, A]), &[A, B, C]);
    }

    #[test]
    fn stacking_changes_do_not_reorder() {
        let mut reg = GroupRegistry::new();
        reg.reconcile(G, &[A, B, C]);
        assert_eq!(reg.reconcile(G, &[C, B, A]), &[A, B, C]);
    }

    #[test]
    fn dropped_window_preserves_rest() {
        let mut reg = GroupRegistry::new();
        reg.reconcile(G, &[A, B, C]);
        assert_eq!(reg.reconcile(G, &[A, C]), &[A, C]);
    }

    #[test]
    fn empty_membership_forgets_group() {
        let mut reg = GroupRegistry::new();
        reg.reconcile(G, &[A, B]);
        assert!(reg.reconcile(G, &[]).is_empty());
        assert_eq!(reg.order(G), None);
        assert!(reg.is_empty());
        // Starts fresh afterwards.
        assert_eq!(reg.reconcile(G, &[B, A]), &[B, A]);
    }

    #[test]
    fn groups_are_independent() {
        let mut reg = GroupRegistry::new();
        reg.reconcile(GroupId(1), &[A, B]);
        reg.reconcile(GroupId(2), &[D, C]);
        reg.move_window(GroupId(1), A, Direction::Right);
        assert_eq!(reg.order(GroupId(1)), Some(&[B, A][..]));
        assert_eq!(reg.order(GroupId(2)), Some(&[D, C][..]));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn move_swaps_with_neighbour() {
        let mut reg = GroupRegistry::new();
        reg.reconcile(G, &[A, B, C]);
        assert_eq!(reg.move_window(G, B, Direction::Right), Some(&[A, C, B][..]));
        assert_eq!(reg.move_window(G, B, Direction::Left), Some(&[A, B, C][..]));
        assert_eq!(reg.move_window(G, B, Direction::Left), Some(&[B, A, C][..]));
    }

    #[test]
    fn move_at_boundaries_is_noop() {
        let mut reg = GroupRegistry::new();
        reg.reconcile(G, &[A, B, C]);
        assert_eq!(reg.move_window(G, A, Direction::Left), None);
        assert_eq!(reg.move_window(G, C, Direction::Right), None);
        assert_eq!(reg.order(G), Some(&[A, B, C][..]));
    }

    #[test]
    fn move_unknown_window_or_group_is_noop() {
        let mut reg = GroupRegistry::new();
        assert_eq!(reg.move_window(G, A, Direction::Right), None);
        reg.reconcile(G, &[A, B]);
        assert_eq!(reg.move_window(G, D, Direction::Right), None);
        assert_eq!(reg.order(G), Some(&[A, B][..]));
    }

    #[test]
    fn moved_order_survives_reconcile() {
        let mut reg = GroupRegistry::new();
        reg.reconcile(G, &[A, B, C]);
        reg.move_window(G, B, Direction::Right);
        assert_eq!(reg.reconcile(G, &[A, B, C]), &[A, C, B]);
        assert_eq!(reg.reconcile(G, &[B, D, A, C]), &[A, C, B, D]);
    }
}
