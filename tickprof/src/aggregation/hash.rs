//! Hash functions for the aggregation tables
//!
//! Both are multiply-xorshift-multiply mixes over 64-bit words. Collisions
//! between distinct traces are accepted: two traces with the same hash share
//! a slot and the first writer's frames.

use tickprof_common::StackFrame;

const M: u64 = 0xc6a4_a793_5bd1_e995;

/// Hash a full trace, seeded by its frame count
///
/// Only the frame identities take part; byte-code indices do not split a
/// trace. Never returns 0, which marks an empty slot.
#[must_use]
pub fn hash_call_trace(frames: &[StackFrame]) -> u64 {
    const R: u32 = 47;

    let mut h = (frames.len() as u64).wrapping_mul(M);

    for frame in frames {
        let mut k = frame.method_id.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);
        h ^= k;
        h = h.wrapping_mul(M);
    }

    h ^= h >> R;
    h = h.wrapping_mul(M);
    h ^= h >> R;

    h.max(1)
}

/// Hash a single method identity for the method table's start bucket
#[must_use]
pub fn hash_method(method_id: u64) -> u64 {
    const R: u32 = 17;

    let mut h = method_id;
    h ^= h >> R;
    h = h.wrapping_mul(M);
    h ^= h >> R;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(ids: &[u64]) -> Vec<StackFrame> {
        ids.iter().map(|&id| StackFrame::java(id, 0)).collect()
    }

    #[test]
    fn test_trace_hash_depends_on_order_and_length() {
        let a = hash_call_trace(&frames(&[1, 2, 3]));
        let b = hash_call_trace(&frames(&[3, 2, 1]));
        let c = hash_call_trace(&frames(&[1, 2]));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, hash_call_trace(&frames(&[1, 2, 3])));
    }

    #[test]
    fn test_trace_hash_ignores_bci() {
        let a = hash_call_trace(&[StackFrame::java(9, 1)]);
        let b = hash_call_trace(&[StackFrame::java(9, 40)]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_trace_hash_never_zero() {
        assert_ne!(hash_call_trace(&[]), 0);
    }

    #[test]
    fn test_method_hash_spreads_neighbours() {
        let a = hash_method(0x7f00_0000_1000);
        let b = hash_method(0x7f00_0000_1008);
        assert_ne!(a % 1024, b % 1024);
    }
}
