//! Attachment index: the per-entity halves of the many-to-many join between planes, CRTCs,
//! encoders and connectors.
//!
//! Each entity owns a [`LinkSet`] of peer ids. The graph keeps both halves in sync through
//! [`link`] and [`unlink`], so a plane listing a CRTC always implies the CRTC lists the plane.

use std::collections::BTreeSet;

use crate::{ConfigError, Result};

/// Maximum number of peers a single entity can be linked to.
///
/// Matches the width of the `possible_crtcs` / `possible_clones` bitmasks the display core uses
/// to publish these relations.
pub const MAX_LINKS: usize = 32;

/// Set of peer ids linked to one entity, iterated in ascending id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSet<I> {
    ids: BTreeSet<I>,
}

impl<I> Default for LinkSet<I> {
    fn default() -> Self {
        Self {
            ids: BTreeSet::new(),
        }
    }
}

impl<I: Ord + Copy> LinkSet<I> {
    pub fn contains(&self, id: I) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = I> + '_ {
        self.ids.iter().copied()
    }

    pub fn first(&self) -> Option<I> {
        self.ids.first().copied()
    }

    /// Returns `Ok(true)` if `id` was newly inserted and `Ok(false)` if it was already present.
    pub(crate) fn insert(&mut self, id: I) -> Result<bool> {
        if self.ids.contains(&id) {
            return Ok(false);
        }
        if self.ids.len() >= MAX_LINKS {
            return Err(ConfigError::ResourceExhausted { limit: MAX_LINKS });
        }
        self.ids.insert(id);
        Ok(true)
    }

    pub(crate) fn remove(&mut self, id: I) -> bool {
        self.ids.remove(&id)
    }
}

/// Records `a_id <-> b_id` in both halves of the join.
///
/// `a` is the link set owned by `a_id` (so it stores `B` ids) and `b` is the set owned by `b_id`.
/// If the second insertion fails the first one is undone before the error is returned.
pub(crate) fn link<A, B>(a: &mut LinkSet<B>, a_id: A, b: &mut LinkSet<A>, b_id: B) -> Result<()>
where
    A: Ord + Copy,
    B: Ord + Copy,
{
    let inserted = a.insert(b_id)?;
    if let Err(err) = b.insert(a_id) {
        if inserted {
            a.remove(b_id);
        }
        return Err(err);
    }
    Ok(())
}

/// Removes `a_id <-> b_id` from both halves. Returns whether a link existed.
pub(crate) fn unlink<A, B>(a: &mut LinkSet<B>, a_id: A, b: &mut LinkSet<A>, b_id: B) -> bool
where
    A: Ord + Copy,
    B: Ord + Copy,
{
    let removed_a = a.remove(b_id);
    let removed_b = b.remove(a_id);
    removed_a || removed_b
}
