//! Chain delay computation.
//!
//! A parent staggers its children along a chain: each child gets a position
//! from the parent's [`ChainDirection`] and its resolved delay is
//! `first_child_delay + chain_delay * position`. Positions are a pure
//! function of the direction, the child count and (for `Random`) the seed, so
//! the same child order always yields the same delays.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::trace;

use crate::id::ItemId;
use crate::tree::ItemTree;
use crate::types::{ChainDirection, ItemKey};

/// Chain position of every child, indexed like the child list.
pub fn positions(direction: ChainDirection, count: usize, seed: u64) -> Vec<u32> {
    let last = count.saturating_sub(1) as u32;
    let half = last / 2;

    match direction {
        ChainDirection::FirstToLast => (0..count as u32).collect(),
        ChainDirection::LastToFirst => (0..count as u32).map(|i| last - i).collect(),
        ChainDirection::MiddleToEnds => (0..count as u32).map(|i| center_distance(i, last)).collect(),
        ChainDirection::EndsToMiddle => (0..count as u32)
            .map(|i| half - center_distance(i, last))
            .collect(),
        ChainDirection::Random => {
            let mut order: Vec<u32> = (0..count as u32).collect();
            let mut rng = StdRng::seed_from_u64(seed ^ count as u64);
            order.shuffle(&mut rng);
            order
        }
    }
}

/// Distance of index `i` from the center of `0..=last`, in whole steps.
fn center_distance(i: u32, last: u32) -> u32 {
    (2 * i).abs_diff(last) / 2
}

/// Resolved delay for a child at `position`.
pub fn resolve_delay(first_child_delay: f32, chain_delay: f32, position: u32) -> f32 {
    first_child_delay + chain_delay * position as f32
}

/// Assign every child of `id` its chain delay for `key`.
pub(crate) fn update_item_delays_in_chain(tree: &mut ItemTree, id: ItemId, key: ItemKey) {
    let Some(parent) = tree.get(id) else {
        return;
    };

    let children = parent.children.clone();
    let values = &parent.values;
    let first = values.first_child_delay[key];
    let step = values.chain_delay[key];
    let order = positions(values.chain_direction[key], children.len(), values.chain_seed);

    for (child, position) in children.into_iter().zip(order) {
        if let Some(item) = tree.get_mut(child) {
            let delay = resolve_delay(first, step, position);
            trace!(item = %child, ?key, position, delay, "chain delay");
            item.chain_delay[key] = delay;
        }
    }
}
