//! Segment-wise access to sample ring buffers
//!
//! Both the per-channel queues and the master queue are `ringbuf` buffers.
//! These helpers expose the contiguous free/occupied regions as plain `i16`
//! slices (at most two, since the ring may wrap) so converters can write and
//! the mixer can read in place.

use std::mem::MaybeUninit;

use ringbuf::LocalRb;
use ringbuf::storage::Heap;
use ringbuf::traits::{Consumer, Producer};

/// Single-timeline sample queue owned by a channel.
pub type SampleQueue = LocalRb<Heap<i16>>;

/// Create an empty sample queue holding `capacity` samples.
pub fn sample_queue(capacity: usize) -> SampleQueue {
    SampleQueue::new(capacity.max(1))
}

/// Reserve up to `count` samples of free space and let `fill` write them.
///
/// `fill` is called once per contiguous segment with the segment and the
/// number of samples written before it. Returns the number of samples
/// committed, which is less than `count` only when the queue is short on
/// room.
pub fn push_with<P, F>(queue: &mut P, count: usize, mut fill: F) -> usize
where
    P: Producer<Item = i16>,
    F: FnMut(&mut [i16], usize),
{
    let (first, second) = queue.vacant_slices_mut();
    let n1 = first.len().min(count);
    let n2 = second.len().min(count - n1);

    if n1 > 0 {
        fill(zeroed(&mut first[..n1]), 0);
    }
    if n2 > 0 {
        fill(zeroed(&mut second[..n2]), n1);
    }

    // SAFETY: the first n1 + n2 vacant slots were initialized above, in order.
    unsafe { queue.advance_write_index(n1 + n2) };
    n1 + n2
}

/// Hand up to `count` queued samples to `drain` and drop them from the queue.
///
/// `drain` sees each contiguous segment together with the number of samples
/// that preceded it. Returns the number of samples consumed.
pub fn pop_with<C, F>(queue: &mut C, count: usize, mut drain: F) -> usize
where
    C: Consumer<Item = i16>,
    F: FnMut(&[i16], usize),
{
    let (first, second) = queue.as_slices();
    let n1 = first.len().min(count);
    let n2 = second.len().min(count - n1);

    if n1 > 0 {
        drain(&first[..n1], 0);
    }
    if n2 > 0 {
        drain(&second[..n2], n1);
    }

    queue.skip(n1 + n2)
}

/// Copy out every queued sample in FIFO order.
pub fn contents<C: Consumer<Item = i16>>(queue: &C) -> Vec<i16> {
    let (first, second) = queue.as_slices();
    let mut out = Vec::with_capacity(first.len() + second.len());
    out.extend_from_slice(first);
    out.extend_from_slice(second);
    out
}

fn zeroed(slots: &mut [MaybeUninit<i16>]) -> &mut [i16] {
    for slot in slots.iter_mut() {
        slot.write(0);
    }
    // SAFETY: every element was just initialized, and MaybeUninit<i16> has the
    // same layout as i16.
    unsafe { &mut *(slots as *mut [MaybeUninit<i16>] as *mut [i16]) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::traits::Observer;

    #[test]
    fn test_push_with_wraps_into_two_segments() {
        let mut queue = sample_queue(8);
        queue.push_slice(&[1, 2, 3, 4, 5, 6]);
        queue.skip(5);

        let mut segments = Vec::new();
        let pushed = push_with(&mut queue, 6, |seg, offset| {
            segments.push((seg.len(), offset));
            for (i, s) in seg.iter_mut().enumerate() {
                *s = 100 + (offset + i) as i16;
            }
        });

        assert_eq!(pushed, 6);
        assert_eq!(segments, vec![(2, 0), (4, 2)]);
        assert_eq!(contents(&queue), vec![6, 100, 101, 102, 103, 104, 105]);
    }

    #[test]
    fn test_push_with_truncates_to_room() {
        let mut queue = sample_queue(4);
        let pushed = push_with(&mut queue, 10, |seg, _| seg.fill(7));
        assert_eq!(pushed, 4);
        assert!(queue.is_full());
    }

    #[test]
    fn test_pop_with_reads_across_wrap() {
        let mut queue = sample_queue(4);
        queue.push_slice(&[1, 2, 3]);
        queue.skip(2);
        queue.push_slice(&[4, 5, 6]);

        let mut seen = Vec::new();
        let popped = pop_with(&mut queue, 3, |seg, offset| {
            assert_eq!(offset, seen.len());
            seen.extend_from_slice(seg);
        });

        assert_eq!(popped, 3);
        assert_eq!(seen, vec![3, 4, 5]);
        assert_eq!(contents(&queue), vec![6]);
    }

    #[test]
    fn test_pop_with_on_empty_queue() {
        let mut queue = sample_queue(4);
        let popped = pop_with(&mut queue, 4, |_, _| panic!("no segments expected"));
        assert_eq!(popped, 0);
        assert_eq!(queue.occupied_len(), 0);
    }
}
