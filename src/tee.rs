//! Duplicating fan-out: every downstream sees every line.
//!
//! Same pump/queue machinery as [`partition`](crate::partition::partition),
//! but each line is cloned into all attached downstream queues instead of
//! being routed to one. Detached downstreams are skipped; once all are
//! detached the pump closes the input and exits.

use std::sync::Arc;
use std::thread;

use tracing::{trace, warn};

use crate::queue::BoundedQueue;
use crate::stream::LineStream;

/// Duplicate `input` into `downstreams` sequences, each buffered by a
/// bounded queue of `capacity` lines. Counts are clamped to at least 1.
pub fn tee(input: LineStream, downstreams: usize, capacity: usize) -> Vec<LineStream> {
    let downstreams = downstreams.max(1);
    let queues: Vec<Arc<BoundedQueue>> = (0..downstreams)
        .map(|_| Arc::new(BoundedQueue::new(capacity)))
        .collect();

    let pump_queues = queues.clone();
    thread::spawn(move || pump(input, pump_queues));

    queues.into_iter().map(LineStream::from_queue).collect()
}

fn pump(mut input: LineStream, queues: Vec<Arc<BoundedQueue>>) {
    let mut attached = vec![true; queues.len()];
    let mut live = queues.len();

    for item in &mut input {
        let line = match item {
            Ok(line) => line,
            Err(e) => {
                warn!("tee input failed, ending all downstreams: {e}");
                break;
            }
        };
        for (index, queue) in queues.iter().enumerate() {
            if !attached[index] {
                continue;
            }
            if queue.put(line.clone()).is_err() {
                trace!(downstream = index, "downstream detached");
                attached[index] = false;
                live -= 1;
            }
        }
        if live == 0 {
            break;
        }
    }

    input.close();
    for queue in &queues {
        queue.close();
    }
}
