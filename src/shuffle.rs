//! Permute function blocks among their slots.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::blocks::Block;

/// Shuffle the function blocks of `blocks` in place, uniformly over all
/// orderings.  Filler blocks keep their positions.
///
/// Returns the order that was applied: `order[slot]` is the index (among
/// function blocks, in original order) of the block now sitting in the
/// `slot`-th function position.  With fewer than two functions this is
/// always the identity.
pub fn shuffle_functions<R>(blocks: &mut [Block], rng: &mut R) -> Vec<usize>
where
    R: Rng + ?Sized,
{
    let slots: Vec<usize> = blocks
        .iter()
        .enumerate()
        .filter(|(_, block)| block.is_function())
        .map(|(i, _)| i)
        .collect();
    let originals: Vec<Block> = slots.iter().map(|&i| blocks[i]).collect();

    let mut order: Vec<usize> = (0..slots.len()).collect();
    order.shuffle(rng);

    for (&slot, &from) in slots.iter().zip(&order) {
        blocks[slot] = originals[from];
    }
    order
}
