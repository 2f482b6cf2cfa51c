//! Pure access-code logic — no I/O, mirroring the separation kept in
//! `modules/orchestrator/src/domain.rs`.

use chrono::{DateTime, Utc};
use rand::Rng;

/// Generate a 6-digit code, left-padded with zeros (spec.md §4.3).
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{:06}", rng.gen_range(0..1_000_000))
}

/// The validity truth table from spec.md §4.3: valid iff the supplied
/// code matches the issued one and `now` falls inside `[valid_from,
/// valid_to]` inclusive.
pub fn is_valid(
    candidate: &str,
    issued_code: &str,
    valid_from: DateTime<Utc>,
    valid_to: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    candidate == issued_code && now >= valid_from && now <= valid_to
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn generated_code_is_always_six_digits() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let code = generate_code(&mut rng);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn matching_code_within_window_is_valid() {
        let now = Utc::now();
        let from = now - Duration::minutes(5);
        let to = now + Duration::minutes(30);
        assert!(is_valid("123456", "123456", from, to, now));
    }

    #[test]
    fn wrong_code_is_invalid() {
        let now = Utc::now();
        let from = now - Duration::minutes(5);
        let to = now + Duration::minutes(30);
        assert!(!is_valid("000000", "123456", from, to, now));
    }

    #[test]
    fn code_outside_window_is_invalid() {
        let now = Utc::now();
        let from = now + Duration::minutes(1);
        let to = now + Duration::minutes(30);
        assert!(!is_valid("123456", "123456", from, to, now));

        let from = now - Duration::minutes(30);
        let to = now - Duration::minutes(1);
        assert!(!is_valid("123456", "123456", from, to, now));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let now = Utc::now();
        assert!(is_valid("123456", "123456", now, now + Duration::minutes(1), now));
        assert!(is_valid("123456", "123456", now - Duration::minutes(1), now, now));
    }
}
