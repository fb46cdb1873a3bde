/// Delay before the next attempt, keyed by the *failed* attempt number
/// (spec §4.5). Attempt 5 has no further delay — a failure there
/// transitions straight to `DEAD`.
pub fn delay_ms(failed_attempt: u32) -> u64 {
    match failed_attempt {
        1 => 30_000,
        2 => 120_000,
        3 => 600_000,
        _ => 1_800_000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_the_published_schedule() {
        assert_eq!(delay_ms(1), 30_000);
        assert_eq!(delay_ms(2), 120_000);
        assert_eq!(delay_ms(3), 600_000);
        assert_eq!(delay_ms(4), 1_800_000);
        assert_eq!(delay_ms(10), 1_800_000);
    }
}
