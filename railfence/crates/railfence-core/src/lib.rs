//! Core primitives for the rail fence toolkit.
//!
//! The crate owns a single building block, the zigzag transposer in [`rail`]:
//! symbols are dealt onto `k` rails following a bouncing 0..k-1..0 pattern and
//! read back rail by rail. [`rail::decode`] inverts [`rail::encode`] from the
//! rail count alone.
//!
//! Everything here is pure and allocation-light. Symbols are opaque: the
//! generic functions accept any `T: Clone` (bytes, `char`s, tokens), and the
//! `_str` helpers treat text as a sequence of Unicode scalar values.

pub mod rail;

mod error;

pub use error::RailError;
pub use rail::{
    decode, decode_str, encode, encode_str, permutation, rail_lengths, Bounce, RailKey,
};
