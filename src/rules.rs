use std::time::{SystemTime, UNIX_EPOCH};

// All pacing is counted in reducer ticks (one tick per 200ms subscription).
pub const TICKS_PER_SEC: u32 = 5;

/// Delay before the first question after the battle screen opens.
pub const INTRO_TICKS: u32 = 3 * TICKS_PER_SEC;
/// Countdown a question stays open before it resolves as a non-answer.
pub const QUESTION_TICKS: u32 = 15 * TICKS_PER_SEC;
/// How long the correct/wrong highlight stays up before damage lands.
pub const FEEDBACK_TICKS: u32 = 2 * TICKS_PER_SEC;
/// Breather between an attack landing and the next question.
pub const PACING_TICKS: u32 = 6;

/// First token appears shortly after the mission screen opens.
pub const FIRST_SPAWN_TICKS: u32 = 5 * TICKS_PER_SEC;
/// Steady-state interval between token spawns.
pub const SPAWN_INTERVAL_TICKS: u32 = 30 * TICKS_PER_SEC;

pub fn next_u32(seed: &mut u64) -> u32 {
    *seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    (*seed >> 32) as u32
}

/// Uniform draw in [0, n). Returns 0 for n == 0.
pub fn roll_index(seed: &mut u64, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    next_u32(seed) as usize % n
}

/// Uniform draw in [0, 1).
pub fn next_unit(seed: &mut u64) -> f64 {
    f64::from(next_u32(seed)) / (f64::from(u32::MAX) + 1.0)
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub fn seed_from_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
}

/// Whole seconds left on a tick countdown, rounded up so the display
/// never shows 0 while the countdown is still live.
pub fn ticks_to_secs(ticks: u32) -> u32 {
    ticks.div_ceil(TICKS_PER_SEC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_index_stays_in_range() {
        let mut seed = 42;
        for _ in 0..1000 {
            assert!(roll_index(&mut seed, 7) < 7);
        }
        assert_eq!(roll_index(&mut seed, 0), 0);
    }

    #[test]
    fn next_unit_is_half_open() {
        let mut seed = 9;
        for _ in 0..1000 {
            let r = next_unit(&mut seed);
            assert!((0.0..1.0).contains(&r));
        }
    }

    #[test]
    fn countdown_display_rounds_up() {
        assert_eq!(ticks_to_secs(QUESTION_TICKS), 15);
        assert_eq!(ticks_to_secs(1), 1);
        assert_eq!(ticks_to_secs(0), 0);
    }
}
