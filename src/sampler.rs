use spacetimedb::rand::Rng;

/// Draw `count` distinct entries from `pool`.
///
/// The entry at `wheel_index` (the one the pointer landed on) is always first.
/// Remaining slots are filled uniformly at random without replacement, in draw
/// order. Output length is `min(count, pool.len())`.
pub fn draw_winners<T: Clone, R: Rng + ?Sized>(
    pool: &[T],
    wheel_index: usize,
    count: usize,
    rng: &mut R,
) -> Vec<T> {
    let count = count.min(pool.len());
    if count == 0 {
        return Vec::new();
    }

    let mut available: Vec<T> = pool.to_vec();
    let first = available.remove(wheel_index.min(pool.len() - 1));

    let mut winners = Vec::with_capacity(count);
    winners.push(first);

    while winners.len() < count && !available.is_empty() {
        let pick = rng.gen_range(0..available.len());
        // remove (not swap_remove) keeps the pool in roster order between draws
        winners.push(available.remove(pick));
    }

    winners
}
