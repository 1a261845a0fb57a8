//! Fair, non-deterministic fan-in of N line sequences into one.
//!
//! One pump thread per input blocking-puts into a single shared bounded
//! queue; the pump that drops the alive-producers counter to zero closes
//! the queue, so the merged sequence ends exactly when every input has
//! ended and the queue has drained. Fairness is approximate: a fast
//! producer parks once its share of the queue is full, which is what lets
//! slow producers make progress.

use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use crate::queue::BoundedQueue;
use crate::stream::LineStream;
use crate::sync::Monitor;

/// Interleave `inputs` into one sequence holding at most `capacity` lines
/// in flight. The output is the multiset union of the inputs; each input's
/// relative order is preserved.
pub fn merge(inputs: Vec<LineStream>, capacity: usize) -> LineStream {
    if inputs.is_empty() {
        return LineStream::empty();
    }

    let queue = Arc::new(BoundedQueue::new(capacity));
    let alive = Arc::new(Monitor::new(inputs.len()));

    for (index, input) in inputs.into_iter().enumerate() {
        let queue = queue.clone();
        let alive = alive.clone();
        thread::spawn(move || pump(index, input, queue, alive));
    }

    LineStream::from_queue(queue)
}

fn pump(index: usize, mut input: LineStream, queue: Arc<BoundedQueue>, alive: Arc<Monitor<usize>>) {
    for item in &mut input {
        match item {
            Ok(line) => {
                if queue.put(line).is_err() {
                    // Merged output was closed; stop pulling this input.
                    debug!(input = index, "merge output closed, ending pump");
                    break;
                }
            }
            Err(e) => {
                warn!(input = index, "merge input failed: {e}");
                break;
            }
        }
    }
    input.close();
    alive.update_and_notify_all(|remaining| {
        *remaining -= 1;
        if *remaining == 0 {
            queue.close();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::test_support::data_stream;

    fn drain(stream: LineStream) -> Vec<String> {
        stream.map_while(|r| r.ok()).collect()
    }

    fn positions_of(out: &[String], of: &[&str]) -> Vec<usize> {
        of.iter()
            .map(|needle| out.iter().position(|l| l == needle).unwrap())
            .collect()
    }

    #[test]
    fn one_input_merges_in_exact_order() {
        let merged = merge(
            vec![LineStream::from_lines([
                "A", "B", "C", "D", "E", "F", "G", "H",
            ])],
            1,
        );
        assert_eq!(
            drain(merged),
            vec!["A", "B", "C", "D", "E", "F", "G", "H"]
        );
    }

    #[test]
    fn two_inputs_interleave_preserving_each_inputs_order() {
        let upper = ["A", "B", "C", "D", "E", "F", "G", "H"];
        let lower = ["a", "b", "c", "d", "e", "f", "g", "h"];
        let merged = merge(
            vec![
                LineStream::from_lines(upper),
                LineStream::from_lines(lower),
            ],
            1,
        );
        let out = drain(merged);
        assert_eq!(out.len(), 16);

        let upper_pos = positions_of(&out, &upper);
        assert!(upper_pos.windows(2).all(|w| w[0] < w[1]));
        let lower_pos = positions_of(&out, &lower);
        assert!(lower_pos.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn unbalanced_inputs_merge_completely() {
        let merged = merge(
            vec![data_stream("data", 100_000), LineStream::empty()],
            10_000,
        );
        assert_eq!(drain(merged).len(), 100_000);
    }

    #[test]
    fn no_inputs_is_the_empty_sequence() {
        assert!(drain(merge(Vec::new(), 1)).is_empty());
    }

    #[test]
    fn output_is_the_multiset_union() {
        let merged = merge(
            vec![
                data_stream("A", 1_000),
                data_stream("B", 1_000),
                data_stream("C", 1_000),
            ],
            8,
        );
        let mut out = drain(merged);
        assert_eq!(out.len(), 3_000);
        out.sort();
        out.dedup();
        assert_eq!(out.len(), 3_000, "duplicate or lost lines");
    }

    #[test]
    fn closing_the_output_terminates_all_pumps() {
        let mut merged = merge(
            vec![data_stream("x", 1_000_000), data_stream("y", 1_000_000)],
            1,
        );
        let first = merged.next();
        assert!(first.is_some());
        merged.close();
        // Pumps notice the detached reader on their next put and exit; the
        // harness would hang on leaked full-queue pumps if they did not.
    }
}
