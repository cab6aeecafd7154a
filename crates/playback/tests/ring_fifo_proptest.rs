//! Property-based tests for the byte ring: it behaves as a bounded FIFO for
//! any interleaving of writes and reads.
#![allow(clippy::arithmetic_side_effects, clippy::indexing_slicing)]

use std::collections::VecDeque;

use playback::ring_buffer::RingBuffer;
use proptest::prelude::*;

const CAP: usize = 64;

#[derive(Debug, Clone)]
enum Op {
    Write(Vec<u8>),
    Read(usize),
    Clear,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => proptest::collection::vec(any::<u8>(), 0..80).prop_map(Op::Write),
        4 => (0usize..80).prop_map(Op::Read),
        1 => Just(Op::Clear),
    ]
}

proptest! {
    /// Reads return exactly the bytes written, in order; a write that does
    /// not fit is rejected whole.
    #[test]
    fn ring_matches_fifo_model(ops in proptest::collection::vec(op(), 0..200)) {
        let mut ring: RingBuffer<CAP> = RingBuffer::new();
        let mut model: VecDeque<u8> = VecDeque::new();
        for op in ops {
            match op {
                Op::Write(data) => {
                    let fits = model.len() + data.len() <= CAP;
                    prop_assert_eq!(ring.write_slice(&data).is_ok(), fits);
                    if fits {
                        model.extend(data);
                    }
                }
                Op::Read(len) => {
                    let mut out = vec![0u8; len];
                    let n = ring.read_slice(&mut out);
                    let expected: Vec<u8> = model.drain(..len.min(model.len())).collect();
                    prop_assert_eq!(&out[..n], &expected[..]);
                }
                Op::Clear => {
                    ring.clear();
                    model.clear();
                }
            }
            prop_assert_eq!(ring.available(), model.len());
            prop_assert_eq!(ring.free(), CAP - model.len());
            prop_assert_eq!(ring.is_empty(), model.is_empty());
            prop_assert_eq!(ring.is_full(), model.len() == CAP);
        }
    }
}
