use rand::{distributions::Alphanumeric, thread_rng, Rng};
use std::iter;

/// Letters and digits, for form fingerprints.
pub fn random_string(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
/// Decimal digits, for the signature nonce.
pub fn random_digits(length: usize) -> String {
    let mut rng = thread_rng();
    iter::repeat_with(|| char::from(b'0' + rng.gen_range(0..10u8)))
        .take(length)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_and_alphabets() {
        let s = random_string(18);
        assert_eq!(s.len(), 18);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
        let d = random_digits(6);
        assert_eq!(d.len(), 6);
        assert!(d.chars().all(|c| c.is_ascii_digit()));
    }
}
