//! Deterministic fan-out of one line sequence into N partitions.
//!
//! A dedicated pump thread pulls from the input and routes each line to one
//! of N bounded queues, chosen by a user-supplied hash key. Order is
//! preserved within a partition; two lines whose keys are congruent mod N
//! always land in the same partition.
//!
//! Closing a downstream detaches it from the pump: lines destined for a
//! detached partition are discarded, lines for the remaining partitions are
//! never lost. Once every downstream is detached the pump closes the input
//! and exits.

use std::sync::Arc;
use std::thread;

use tracing::{trace, warn};

use crate::queue::{BoundedQueue, PutError};
use crate::stream::LineStream;

/// Split `input` into `partitions` downstream sequences by `key`, each
/// buffered by a bounded queue of `capacity` lines. Both counts are clamped
/// to at least 1.
pub fn partition(
    input: LineStream,
    partitions: usize,
    capacity: usize,
    key: impl Fn(&str) -> i64 + Send + 'static,
) -> Vec<LineStream> {
    let partitions = partitions.max(1);
    let queues: Vec<Arc<BoundedQueue>> = (0..partitions)
        .map(|_| Arc::new(BoundedQueue::new(capacity)))
        .collect();

    let pump_queues = queues.clone();
    thread::spawn(move || pump(input, pump_queues, key));

    queues.into_iter().map(LineStream::from_queue).collect()
}

fn pump(
    mut input: LineStream,
    queues: Vec<Arc<BoundedQueue>>,
    key: impl Fn(&str) -> i64,
) {
    let n = queues.len();
    let mut attached = vec![true; n];
    let mut live = n;

    for item in &mut input {
        let line = match item {
            Ok(line) => line,
            Err(e) => {
                warn!("partition input failed, ending all partitions: {e}");
                break;
            }
        };
        let index = partition_index(key(&line), n);
        if !attached[index] {
            trace!(partition = index, "dropping line for detached partition");
            continue;
        }
        match queues[index].put(line) {
            Ok(()) => {}
            Err(PutError::Disconnected) | Err(PutError::Closed) => {
                trace!(partition = index, "downstream detached mid-put");
                attached[index] = false;
                live -= 1;
                if live == 0 {
                    break;
                }
            }
        }
    }

    input.close();
    for queue in &queues {
        queue.close();
    }
}

/// Euclidean remainder: a stable partition index for any signed key.
fn partition_index(key: i64, n: usize) -> usize {
    let n = n as i64;
    (((key % n) + n) % n) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::test_support::data_stream;

    fn drain(stream: LineStream) -> Vec<String> {
        stream.map_while(|r| r.ok()).collect()
    }

    fn byte_sum_key(line: &str) -> i64 {
        // Stable per-line hash for tests: sum of bytes.
        line.bytes().map(i64::from).sum()
    }

    #[test]
    fn negative_keys_map_to_a_valid_partition() {
        assert_eq!(partition_index(-1, 4), 3);
        assert_eq!(partition_index(-8, 4), 0);
        assert_eq!(partition_index(7, 4), 3);
    }

    #[test]
    fn union_of_partitions_equals_input() {
        let input = LineStream::from_lines(["A", "B", "C", "D", "E", "F", "G", "H"]);
        let outs = partition(input, 2, 100, byte_sum_key);
        let mut all: Vec<String> = outs.into_iter().flat_map(drain).collect();
        all.sort();
        assert_eq!(all, vec!["A", "B", "C", "D", "E", "F", "G", "H"]);
    }

    #[test]
    fn per_partition_order_is_a_subsequence_of_input() {
        let lines: Vec<String> = (0..200).map(|i| format!("{i}")).collect();
        let outs = partition(LineStream::from_lines(lines.clone()), 3, 10, |l| {
            l.parse::<i64>().unwrap()
        });
        for (p, out) in outs.into_iter().enumerate() {
            let got = drain(out);
            for pair in got.windows(2) {
                let a: usize = pair[0].parse().unwrap();
                let b: usize = pair[1].parse().unwrap();
                assert!(a < b, "partition {p} out of order: {a} before {b}");
            }
        }
    }

    #[test]
    fn same_key_means_same_partition() {
        let outs = partition(
            LineStream::from_lines(["x", "y", "x", "y", "x"]),
            2,
            10,
            byte_sum_key,
        );
        for out in outs {
            let got = drain(out);
            // All "x" must be together and all "y" must be together.
            assert!(
                got.iter().all(|l| l == "x") || got.iter().all(|l| l == "y"),
                "mixed keys in one partition: {got:?}"
            );
        }
    }

    #[test]
    fn many_lines_through_tiny_queues_in_parallel() {
        let n = 10_000;
        let outs = partition(data_stream("A", n), 6, 1, byte_sum_key);
        let counters: Vec<_> = outs
            .into_iter()
            .map(|out| std::thread::spawn(move || drain(out)))
            .collect();
        let mut total = 0;
        for c in counters {
            let got = c.join().unwrap();
            assert!(got.iter().all(|l| l.starts_with("A-")));
            total += got.len();
        }
        assert_eq!(total, n);
    }

    #[test]
    fn closed_partition_is_lossy_open_partitions_are_lossless() {
        let lines: Vec<String> = (0..1000).map(|i| format!("{i}")).collect();
        let mut outs = partition(LineStream::from_lines(lines), 2, 1, |l| {
            l.parse::<i64>().unwrap()
        });
        let odd = outs.pop().unwrap();
        let mut even = outs.pop().unwrap();
        // Abandon the even partition immediately.
        even.close();

        let got = drain(odd);
        let expected: Vec<String> = (0..1000).filter(|i| i % 2 == 1).map(|i| format!("{i}")).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn closing_every_partition_terminates_the_pump() {
        let outs = partition(data_stream("data", 1_000_000), 4, 1, byte_sum_key);
        for mut out in outs {
            out.close();
        }
        // Nothing to assert directly; the pump exiting (instead of wedging
        // on a full queue) is the property, and the test harness would hang
        // here if it did not.
    }

    #[test]
    fn single_partition_receives_everything_in_order() {
        let outs = partition(data_stream("d", 100), 1, 4, byte_sum_key);
        let got = drain(outs.into_iter().next().unwrap());
        assert_eq!(got.len(), 100);
        assert_eq!(got[0], "d-0");
        assert_eq!(got[99], "d-99");
    }
}
