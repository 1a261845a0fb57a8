//! Fan-in/fan-out coordinator over line sequences.
//!
//! A [`Selector`] owns a set of [`Route`]s, each binding one producer
//! sequence to one sink. [`Selector::run`] spawns exactly one worker thread
//! per route and blocks until every route marked *critical* has drained,
//! then closes the remaining producers and joins all workers.
//!
//! The critical flag is the termination rule: completion of the critical
//! routes defines completion of the whole pipeline, no matter how much the
//! non-critical routes still had to say. For a wrapped process this is what
//! makes "the command is done" mean "its stdout is exhausted" rather than
//! "we finished feeding stdin".
//!
//! Failure: the first error recorded by any worker wins; the driver then
//! interrupts the siblings and returns that error. Errors raised after the
//! termination decision are the natural result of tearing the routes down
//! and are logged, not reported.

use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::sink::LineSink;
use crate::stream::LineStream;
use crate::sync::Monitor;

/// One producer→consumer binding inside a [`Selector`].
pub struct Route {
    producer: LineStream,
    sink: Box<dyn LineSink>,
    critical: bool,
    label: String,
}

impl Route {
    pub fn new(producer: LineStream, sink: impl LineSink + 'static, critical: bool) -> Self {
        Self {
            producer,
            sink: Box::new(sink),
            critical,
            label: String::new(),
        }
    }

    /// Name the route in logs and worker thread names.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }
}

struct Shared {
    remaining_critical: usize,
    closing: bool,
    first_error: Option<Error>,
}

/// Runs N producer sequences into N sinks until the critical ones drain.
pub struct Selector {
    routes: Vec<Route>,
}

impl Default for Selector {
    fn default() -> Self {
        Self::new()
    }
}

impl Selector {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn with_routes(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn add(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Drive all routes to completion. Returns when every critical route's
    /// producer has signalled end-of-sequence, or when the first failure is
    /// recorded; either way the remaining producers are closed and all
    /// workers joined before returning.
    pub fn run(self) -> Result<()> {
        let remaining_critical = self.routes.iter().filter(|r| r.critical).count();
        if remaining_critical == 0 {
            return Err(Error::Pipeline(
                "selector requires at least one critical route".to_string(),
            ));
        }

        let shared = Arc::new(Monitor::new(Shared {
            remaining_critical,
            closing: false,
            first_error: None,
        }));

        let producer_handles: Vec<_> = self.routes.iter().map(|r| r.producer.handle()).collect();

        let mut workers = Vec::with_capacity(self.routes.len());
        for (index, mut route) in self.routes.into_iter().enumerate() {
            if route.label.is_empty() {
                route.label = format!("route-{index}");
            }
            let shared = shared.clone();
            let worker = thread::Builder::new()
                .name(format!("selector-{}", route.label))
                .spawn(move || drive_route(route, &shared))
                .map_err(Error::Io)?;
            workers.push(worker);
        }

        shared.wait_while(|s| s.remaining_critical > 0 && s.first_error.is_none());
        shared.update_and_notify_all(|s| s.closing = true);

        debug!(routes = producer_handles.len(), "selector terminating");
        for handle in &producer_handles {
            handle.close();
        }
        for worker in workers {
            if worker.join().is_err() {
                warn!("selector worker panicked during teardown");
            }
        }

        match shared.with(|s| s.first_error.take()) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Records a route's outcome on drop, so a panicking sink still releases
/// the driver.
struct RouteGuard {
    shared: Arc<Monitor<Shared>>,
    critical: bool,
    label: String,
    outcome: Option<Result<()>>,
}

impl Drop for RouteGuard {
    fn drop(&mut self) {
        let outcome = self
            .outcome
            .take()
            .unwrap_or_else(|| Err(Error::Pipeline(format!("route {} panicked", self.label))));
        self.shared.update_and_notify_all(|s| {
            if self.critical {
                s.remaining_critical -= 1;
            }
            if let Err(e) = outcome {
                if s.closing {
                    debug!(route = %self.label, error = %e, "error after termination; dropped");
                } else if s.first_error.is_none() {
                    s.first_error = Some(e);
                } else {
                    warn!(route = %self.label, error = %e, "suppressing secondary failure");
                }
            }
        });
    }
}

fn drive_route(route: Route, shared: &Arc<Monitor<Shared>>) {
    let Route {
        mut producer,
        mut sink,
        critical,
        label,
    } = route;

    let mut guard = RouteGuard {
        shared: shared.clone(),
        critical,
        label: label.clone(),
        outcome: None,
    };

    let pumped = (|| -> Result<()> {
        for item in &mut producer {
            sink.accept(item?)?;
        }
        Ok(())
    })();

    let outcome = match pumped {
        Ok(()) => sink.finish(),
        Err(e) if !critical && e.is_broken_pipe() => {
            // The peer behind the sink went away; for a non-critical route
            // that is an end-of-stream condition, not a failure.
            debug!(route = %label, "peer closed; route ends");
            let _ = sink.finish();
            Ok(())
        }
        Err(e) => Err(e),
    };

    producer.close();
    guard.outcome = Some(outcome);
}
