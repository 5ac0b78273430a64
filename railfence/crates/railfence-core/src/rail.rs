use std::fmt;
use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use crate::error::RailError;

/// Validated rail count. Always at least one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct RailKey(usize);

impl RailKey {
    /// Validate a raw rail count. Anything below one is rejected with
    /// [`RailError::InvalidKey`].
    pub fn new(value: i64) -> Result<Self, RailError> {
        if value < 1 {
            return Err(RailError::InvalidKey(value));
        }
        usize::try_from(value)
            .map(Self)
            .map_err(|_| RailError::InvalidKey(value))
    }

    /// Number of rails.
    pub fn get(self) -> usize {
        self.0
    }

    /// Rails that can actually receive a symbol in a sequence of `len`
    /// symbols. The bounce never reverses before index `k - 1`, so for
    /// `k >= len` the walk over `min(k, len)` rails is identical.
    fn span(self, len: usize) -> Self {
        Self(self.0.min(len).max(1))
    }

    /// Rearrange `symbols` rail by rail.
    pub fn encode<T: Clone>(self, symbols: &[T]) -> Vec<T> {
        permutation(symbols.len(), self)
            .into_iter()
            .map(|position| symbols[position].clone())
            .collect()
    }

    /// Invert [`RailKey::encode`].
    ///
    /// The ciphertext is treated as consecutive per-rail slices (in ascending
    /// rail order, sized by rail occupancy); the bounce walk then pulls the
    /// next unread symbol from the slice of whichever rail it lands on.
    pub fn decode<T: Clone>(self, symbols: &[T]) -> Vec<T> {
        let len = symbols.len();
        let mut cursors = rail_starts(len, self);
        let mut plain = Vec::with_capacity(len);
        for rail in Bounce::new(self.span(len)).take(len) {
            plain.push(symbols[cursors[rail]].clone());
            cursors[rail] += 1;
        }
        plain
    }
}

impl TryFrom<i64> for RailKey {
    type Error = RailError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RailKey> for i64 {
    fn from(key: RailKey) -> Self {
        i64::try_from(key.0).unwrap_or(i64::MAX)
    }
}

impl fmt::Display for RailKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Triangle-wave walk over the rails: 0, 1, .., k-1, k-2, .., 0, 1, ..
///
/// The iterator never ends; take as many rail indices as there are symbols.
#[derive(Clone, Debug)]
pub struct Bounce {
    rails: usize,
    rail: usize,
    descending: bool,
}

impl Bounce {
    pub fn new(key: RailKey) -> Self {
        Self {
            rails: key.get(),
            rail: 0,
            descending: true,
        }
    }
}

impl Iterator for Bounce {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.rail;
        if self.rails > 1 {
            if self.descending {
                if current + 1 == self.rails {
                    self.descending = false;
                    self.rail -= 1;
                } else {
                    self.rail += 1;
                }
            } else if current == 0 {
                self.descending = true;
                self.rail += 1;
            } else {
                self.rail -= 1;
            }
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

impl FusedIterator for Bounce {}

/// Occupancy of each rail for a sequence of `len` symbols.
///
/// Exactly `k` entries summing to `len`; rails the walk never reaches hold 0.
pub fn rail_lengths(len: usize, key: RailKey) -> Vec<usize> {
    let mut lengths = occupancy(len, key);
    lengths.resize(key.get(), 0);
    lengths
}

/// Occupancy over the reachable rails only (`min(k, len)` entries, empty when
/// `len == 0`), so that large keys never size a table by `k`.
fn occupancy(len: usize, key: RailKey) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    let span = key.span(len);
    let mut lengths = vec![0usize; span.get()];
    for rail in Bounce::new(span).take(len) {
        lengths[rail] += 1;
    }
    lengths
}

/// Offset of each reachable rail's slice inside the encoded sequence.
fn rail_starts(len: usize, key: RailKey) -> Vec<usize> {
    let mut offset = 0;
    occupancy(len, key)
        .into_iter()
        .map(|count| {
            let start = offset;
            offset += count;
            start
        })
        .collect()
}

/// Original positions in encoded order: grouped by rail ascending, then by
/// order of appearance within the rail. A bijection on `0..len`.
pub fn permutation(len: usize, key: RailKey) -> Vec<usize> {
    let mut cursors = rail_starts(len, key);
    let mut order = vec![0usize; len];
    for (position, rail) in Bounce::new(key.span(len)).take(len).enumerate() {
        order[cursors[rail]] = position;
        cursors[rail] += 1;
    }
    order
}

/// Encode `symbols` across `key` rails.
///
/// Fails with [`RailError::InvalidKey`] when `key < 1`.
pub fn encode<T: Clone>(symbols: &[T], key: i64) -> Result<Vec<T>, RailError> {
    Ok(RailKey::new(key)?.encode(symbols))
}

/// Decode a sequence produced by [`encode`] with the same key.
///
/// The length is trusted as given; a ciphertext produced with another key
/// decodes to a (different) permutation rather than an error.
pub fn decode<T: Clone>(symbols: &[T], key: i64) -> Result<Vec<T>, RailError> {
    Ok(RailKey::new(key)?.decode(symbols))
}

/// [`encode`] over the Unicode scalar values of `text`.
pub fn encode_str(text: &str, key: i64) -> Result<String, RailError> {
    let chars: Vec<char> = text.chars().collect();
    Ok(encode(&chars, key)?.into_iter().collect())
}

/// [`decode`] over the Unicode scalar values of `text`.
pub fn decode_str(text: &str, key: i64) -> Result<String, RailError> {
    let chars: Vec<char> = text.chars().collect();
    Ok(decode(&chars, key)?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn key(value: i64) -> RailKey {
        RailKey::new(value).expect("valid key")
    }

    #[test]
    fn bounce_follows_triangle_wave() {
        let rails: Vec<usize> = Bounce::new(key(3)).take(9).collect();
        assert_eq!(rails, vec![0, 1, 2, 1, 0, 1, 2, 1, 0]);

        let rails: Vec<usize> = Bounce::new(key(2)).take(5).collect();
        assert_eq!(rails, vec![0, 1, 0, 1, 0]);

        assert!(Bounce::new(key(1)).take(6).all(|rail| rail == 0));
    }

    #[test]
    fn encodes_reference_message() {
        let cipher = encode_str("IAMRATNESHKUMAR", 3).expect("encode");
        assert_eq!(cipher, "IASMARTEHUAMNKR");
        assert_eq!(decode_str(&cipher, 3).expect("decode"), "IAMRATNESHKUMAR");

        let mut plain: Vec<char> = "IAMRATNESHKUMAR".chars().collect();
        let mut shuffled: Vec<char> = cipher.chars().collect();
        plain.sort_unstable();
        shuffled.sort_unstable();
        assert_eq!(plain, shuffled);
    }

    #[test]
    fn degenerate_keys_are_identity() {
        assert_eq!(encode_str("ABC", 3).expect("encode"), "ABC");
        assert_eq!(encode_str("ABC", 10).expect("encode"), "ABC");
        assert_eq!(encode_str("ABC", 1_000_000_000).expect("encode"), "ABC");
        assert_eq!(encode_str("rail fence", 1).expect("encode"), "rail fence");
        assert_eq!(decode_str("ABC", 4).expect("decode"), "ABC");
        assert_eq!(decode_str("rail fence", 1).expect("decode"), "rail fence");
    }

    #[test]
    fn empty_input_stays_empty() {
        let empty: [u8; 0] = [];
        assert!(encode(&empty, 3).expect("encode").is_empty());
        assert!(decode(&empty, 3).expect("decode").is_empty());
        assert_eq!(encode_str("", 1).expect("encode"), "");
        assert_eq!(rail_lengths(0, key(4)), vec![0, 0, 0, 0]);
        assert!(permutation(0, key(4)).is_empty());
    }

    #[test]
    fn rejects_non_positive_keys() {
        assert_eq!(encode(b"abc", 0), Err(RailError::InvalidKey(0)));
        assert_eq!(encode(b"abc", -1), Err(RailError::InvalidKey(-1)));
        assert_eq!(decode(b"abc", 0), Err(RailError::InvalidKey(0)));
        assert_eq!(decode(b"abc", -1), Err(RailError::InvalidKey(-1)));
        assert_eq!(encode_str("", 0), Err(RailError::InvalidKey(0)));
        assert_eq!(decode_str("abc", i64::MIN), Err(RailError::InvalidKey(i64::MIN)));
        assert_eq!(
            RailError::InvalidKey(-1).to_string(),
            "invalid rail key -1: at least one rail is required"
        );
    }

    #[test]
    fn rail_lengths_count_occupancy() {
        assert_eq!(rail_lengths(15, key(3)), vec![4, 7, 4]);
        assert_eq!(rail_lengths(5, key(3)), vec![2, 2, 1]);
        assert_eq!(rail_lengths(2, key(8)), vec![1, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(rail_lengths(2, key(8)).len(), 8);
        assert_eq!(rail_lengths(8, key(8)), vec![1; 8]);
        assert_eq!(rail_lengths(7, key(1)), vec![7]);
    }

    #[test]
    fn permutation_is_a_bijection() {
        for len in 0..40 {
            for k in 1..=(len as i64 + 2) {
                let mut order = permutation(len, key(k));
                order.sort_unstable();
                assert_eq!(order, (0..len).collect::<Vec<_>>(), "len={len} k={k}");
            }
        }
    }

    #[test]
    fn repeated_symbols_round_trip() {
        let text = "AAAA BBBB AAAA";
        for k in 1..=6 {
            let cipher = encode_str(text, k).expect("encode");
            assert_eq!(decode_str(&cipher, k).expect("decode"), text);
        }
    }

    #[test]
    fn unicode_is_permuted_by_codepoint() {
        let text = "héllo wörld ✓";
        let cipher = encode_str(text, 4).expect("encode");
        assert_eq!(cipher.chars().count(), text.chars().count());
        assert_eq!(decode_str(&cipher, 4).expect("decode"), text);
    }

    #[test]
    fn random_bytes_round_trip() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let len = rng.gen_range(0..256);
            let mut data = vec![0u8; len];
            rng.fill(&mut data[..]);
            let k = rng.gen_range(1..=len as i64 + 4);

            let cipher = encode(&data, k).expect("encode");
            assert_eq!(cipher.len(), data.len());

            let mut sorted_plain = data.clone();
            let mut sorted_cipher = cipher.clone();
            sorted_plain.sort_unstable();
            sorted_cipher.sort_unstable();
            assert_eq!(sorted_plain, sorted_cipher);

            assert_eq!(decode(&cipher, k).expect("decode"), data);

            let wide = len.max(1) as i64;
            for k in wide..wide + 4 {
                assert_eq!(encode(&data, k).expect("encode"), data, "len={len} k={k}");
                assert_eq!(decode(&data, k).expect("decode"), data, "len={len} k={k}");
            }
        }
    }

    #[test]
    fn rail_key_serde_validates() {
        let parsed: RailKey = serde_json::from_str("3").expect("parse");
        assert_eq!(parsed.get(), 3);
        assert_eq!(serde_json::to_string(&parsed).expect("encode"), "3");
        assert!(serde_json::from_str::<RailKey>("0").is_err());
        assert!(serde_json::from_str::<RailKey>("-4").is_err());
        assert_eq!(RailKey::try_from(5i64).map(|k| k.to_string()), Ok("5".to_string()));
    }
}
