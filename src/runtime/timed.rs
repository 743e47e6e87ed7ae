//! Time-ordered (stochastic) firing engine.
//!
//! Deposits only update counts and push newly-enabled transitions
//! into a shared candidate structure; a single simulation loop pops
//! candidates in priority order and fires them one at a time. The
//! loop itself is one unit of pool work that re-submits itself after
//! each step, so it coexists with any other submitted work. Because
//! the loop is the only withdrawer, firing needs no two-phase lock
//! protocol: it re-validates token counts immediately before commit
//! and silently drops candidates that went stale since enqueue.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex};

use log::{debug, trace};
use rand::Rng;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::structure::{ArcList, Weight};
use crate::runtime::{Core, EngineKind};
use crate::utils::lock;

/// Priority discipline for the candidate queue. Mutually exclusive,
/// fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimedPolicy {
    /// Classical timed simulation: min-heap keyed by each candidate's
    /// delay; with `advance_clock` the consumed keys accumulate into a
    /// running clock offsetting later delays.
    DelayHeap { advance_clock: bool },
    /// Uniformly random priority assigned when the candidate enables.
    RandomPriority,
    /// Uniform random pick among all currently enabled candidates.
    RandomChoice,
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct Candidate {
    key: u64,
    /// Push counter, breaks key ties FIFO.
    order: u64,
    transition: TransitionId,
}

enum CandidateQueue {
    Heap(BinaryHeap<Reverse<Candidate>>),
    Bag(Vec<TransitionId>),
}

struct SimInner {
    queue: CandidateQueue,
    clock: u64,
    pushed: u64,
    stop: bool,
}

pub(crate) struct SimState {
    inner: Mutex<SimInner>,
    cvar: Condvar,
}

impl SimState {
    pub(crate) fn new(policy: TimedPolicy) -> Self {
        let queue = match policy {
            TimedPolicy::RandomChoice => CandidateQueue::Bag(Vec::new()),
            _ => CandidateQueue::Heap(BinaryHeap::new()),
        };
        Self {
            inner: Mutex::new(SimInner {
                queue,
                clock: 0,
                pushed: 0,
                stop: false,
            }),
            cvar: Condvar::new(),
        }
    }

    pub(crate) fn notify_stop(&self) {
        lock(&self.inner).stop = true;
        self.cvar.notify_all();
    }
}

impl SimInner {
    fn push(&mut self, transition: TransitionId, key: u64) {
        self.pushed += 1;
        match &mut self.queue {
            CandidateQueue::Heap(heap) => heap.push(Reverse(Candidate {
                key,
                order: self.pushed,
                transition,
            })),
            CandidateQueue::Bag(bag) => bag.push(transition),
        }
    }

    fn pop(&mut self) -> Option<(TransitionId, u64)> {
        match &mut self.queue {
            CandidateQueue::Heap(heap) => heap
                .pop()
                .map(|Reverse(c)| (c.transition, c.key)),
            CandidateQueue::Bag(bag) => {
                if bag.is_empty() {
                    None
                } else {
                    let idx = rand::rng().random_range(0..bag.len());
                    Some((bag.swap_remove(idx), 0))
                }
            }
        }
    }
}

fn policy(core: &Core) -> TimedPolicy {
    match core.engine {
        EngineKind::TimeOrdered(policy) => policy,
        EngineKind::Greedy => unreachable!("timed engine invoked under greedy runtime"),
    }
}

fn delay_of(core: &Core, t: TransitionId) -> u64 {
    core.net.transitions[t]
        .delay
        .as_ref()
        .map_or(0, |delay| delay())
}

/// Deposit under the time-ordered engine: update the count, record
/// newly-enabled candidates, wake the loop. Never fires anything.
pub(crate) fn add_tokens(core: &Arc<Core>, place: PlaceId, n: Weight) {
    let p = &core.net.places[place];
    let eligible: ArcList = match &p.chooser {
        Some(chooser) => chooser(&p.oarcs),
        None => p.oarcs.clone(),
    };

    let mut newly = Vec::new();
    let after;
    {
        let mut tokens = lock(&core.tokens[place]);
        let old = *tokens;
        after = old + n;
        *tokens = after;
        core.check_capacity(place, after);
        core.note_add(old, after, &eligible, &mut newly);
    }
    trace!("place {} now holds {} tokens", p.name, after);

    if !newly.is_empty() {
        let sim = core.sim.as_ref().expect("timed engine without sim state");
        let policy = policy(core);
        {
            let mut inner = lock(&sim.inner);
            for t in newly {
                let key = match policy {
                    TimedPolicy::DelayHeap { .. } => inner.clock + delay_of(core, t),
                    TimedPolicy::RandomPriority => u64::from(rand::rng().random::<u32>()),
                    TimedPolicy::RandomChoice => 0,
                };
                trace!(
                    "transition {} enqueued as candidate, key {}",
                    core.net.transitions[t].name,
                    key
                );
                inner.push(t, key);
            }
        }
        sim.cvar.notify_all();
    }
    core.run_add_hook(place, after);
}

/// One step of the simulation loop. Pops the minimum-key candidate
/// (waiting on the condvar while the structure is empty), processes
/// it, and re-submits itself; returns without re-submitting once stop
/// is requested, letting the pool drain.
pub(crate) fn sim_step(core: Arc<Core>) {
    let sim = core.sim.as_ref().expect("timed engine without sim state");
    let (t, key) = {
        let mut inner = lock(&sim.inner);
        loop {
            if inner.stop {
                return;
            }
            if let Some(candidate) = inner.pop() {
                break candidate;
            }
            inner = sim.cvar.wait(inner).unwrap_or_else(|e| e.into_inner());
        }
    };
    process_candidate(&core, t, key);

    let next = Arc::clone(&core);
    core.pool.submit(Box::new(move || sim_step(next)));
}

fn process_candidate(core: &Arc<Core>, t: TransitionId, key: u64) {
    let needs = core.input_requirements(t);

    // Re-validate against current counts; enqueue-time information is
    // not trusted. Deposits can only raise counts and this loop is the
    // sole withdrawer, so a check that passes here stays valid.
    for &(place, required) in &needs {
        if *lock(&core.tokens[place]) < required {
            debug!(
                "dropping stale candidate {}, place {} fell short",
                core.net.transitions[t].name, core.net.places[place].name
            );
            return;
        }
    }

    let mut after = Vec::with_capacity(needs.len());
    let mut starved = Vec::new();
    for &(place, required) in &needs {
        let mut tokens = lock(&core.tokens[place]);
        let old = *tokens;
        let new = old - required;
        *tokens = new;
        core.note_deduct(place, old, new, &mut starved);
        drop(tokens);
        after.push((place, new));
    }

    if let EngineKind::TimeOrdered(TimedPolicy::DelayHeap { advance_clock: true }) = core.engine {
        let sim = core.sim.as_ref().expect("timed engine without sim state");
        let mut inner = lock(&sim.inner);
        if key > inner.clock {
            inner.clock = key;
        }
    }

    for &(place, tokens) in &after {
        core.run_deduct_hook(place, tokens);
    }
    core.run_starved_hooks(&starved);
    core.fire_effects(t);
}
