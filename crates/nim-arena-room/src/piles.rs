//! Initial pile generation.

use rand::Rng;
use rand::seq::index;

use crate::GameConfig;

/// Generates `count` starting piles with sizes in `min..=max`.
///
/// Sizes are pairwise distinct whenever the range holds at least `count`
/// values. When it doesn't, the piles are filled cyclically as
/// `min + (i mod range)` instead of failing: distinct piles look nicer but
/// any sizes make a playable game.
///
/// `min > max` is treated as the single value `min`; [`GameConfig::validate`]
/// rules that out for configured games.
pub fn generate<R: Rng + ?Sized>(rng: &mut R, count: usize, min: u32, max: u32) -> Vec<u32> {
    let range = max.saturating_sub(min) as usize + 1;

    if range < count {
        return (0..count).map(|i| min + (i % range) as u32).collect();
    }

    index::sample(rng, range, count)
        .into_iter()
        .map(|offset| min + offset as u32)
        .collect()
}

/// Generates piles according to a [`GameConfig`].
pub fn generate_for<R: Rng + ?Sized>(rng: &mut R, config: &GameConfig) -> Vec<u32> {
    generate(rng, config.pile_count, config.min_pile, config.max_pile)
}
