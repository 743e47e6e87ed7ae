//! Token flow over a frozen [`Net`]: shared accounting state plus the
//! two interchangeable firing engines.
//!
//! Both engines speak through one `add_tokens` entry point, the single
//! place where enablement is computed. The greedy engine schedules a
//! firing attempt onto the pool the moment a transition looks enabled;
//! the time-ordered engine only records candidates and leaves all
//! firing to its simulation loop.

pub mod greedy;
pub mod timed;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::debug;

use crate::net::ids::{ArcId, PlaceId, TransitionId};
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::structure::{ArcDirection, FireCtx, HookCtx, Weight};
use crate::net::Net;
use crate::pool::{Pool, PoolHandle};
use crate::unrecoverable;
use crate::utils::lock;

pub use timed::TimedPolicy;

/// Firing discipline, chosen once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// Fire-as-soon-as-enabled, attempts run concurrently on the pool.
    Greedy,
    /// Single logical clock, candidates fired one at a time in
    /// priority order by a dedicated loop.
    TimeOrdered(TimedPolicy),
}

#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    pub threads: usize,
    pub engine: EngineKind,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            engine: EngineKind::Greedy,
        }
    }
}

/// Shared engine state referenced by every scheduled work item.
pub(crate) struct Core {
    pub(crate) net: Net,
    /// Per-place token counter, serialized by that place's lock.
    pub(crate) tokens: IndexVec<PlaceId, Mutex<Weight>>,
    /// Per-transition count of currently-satisfied input arcs. A
    /// transition is a firing candidate when this equals its input
    /// arc count. Leaf lock: taken while a place lock is held, never
    /// the other way around.
    pub(crate) enabled: IndexVec<TransitionId, Mutex<u32>>,
    /// Whether each input arc is currently counted in its transition's
    /// `enabled` entry. Guarded by the owning place's lock; keeps the
    /// increment/decrement pairing symmetric when a chooser skipped the
    /// arc's upward crossing.
    pub(crate) satisfied: IndexVec<ArcId, AtomicBool>,
    /// Effective requirement per input arc: the summed weight of every
    /// arc joining the same place to the same transition, so a doubled
    /// arc only reads satisfied once the place can cover the pair.
    pub(crate) threshold: IndexVec<ArcId, Weight>,
    pub(crate) seq: AtomicU64,
    pub(crate) pool: PoolHandle,
    pub(crate) engine: EngineKind,
    /// Candidate structure of the time-ordered engine, `None` under
    /// the greedy engine.
    pub(crate) sim: Option<timed::SimState>,
}

impl Core {
    pub(crate) fn add_tokens(self: &Arc<Self>, place: PlaceId, n: Weight) {
        match self.engine {
            EngineKind::Greedy => greedy::add_tokens(self, place, n),
            EngineKind::TimeOrdered(_) => timed::add_tokens(self, place, n),
        }
    }

    pub(crate) fn request_stop(&self) {
        self.pool.request_stop();
        if let Some(sim) = &self.sim {
            sim.notify_stop();
        }
    }

    pub(crate) fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    pub(crate) fn check_capacity(&self, place: PlaceId, tokens: Weight) {
        let p = &self.net.places[place];
        if p.capacity != 0 && tokens > p.capacity {
            unrecoverable!(
                "place {} ({:?}) exceeded its capacity: {} > {}",
                p.name,
                place,
                tokens,
                p.capacity
            );
        }
    }

    /// Upward threshold crossings of one deposit. Caller holds the
    /// place's lock; transitions that thereby become fully enabled are
    /// pushed to `newly` for the engine to schedule.
    pub(crate) fn note_add(
        &self,
        old: Weight,
        new: Weight,
        eligible: &[ArcId],
        newly: &mut Vec<TransitionId>,
    ) {
        for &aid in eligible {
            let arc = &self.net.arcs[aid];
            let need = self.threshold[aid];
            if old < need
                && new >= need
                && !self.satisfied[aid].swap(true, Ordering::Relaxed)
            {
                let mut cnt = lock(&self.enabled[arc.transition]);
                *cnt += 1;
                if *cnt as usize == self.net.transitions[arc.transition].iarcs.len() {
                    newly.push(arc.transition);
                }
            }
        }
    }

    /// Downward threshold crossings of one withdrawal. Caller holds
    /// the place's lock; transitions that just lost full enablement
    /// are pushed to `starved` so their hooks can run outside locks.
    pub(crate) fn note_deduct(
        &self,
        place: PlaceId,
        old: Weight,
        new: Weight,
        starved: &mut Vec<TransitionId>,
    ) {
        for &aid in self.net.places[place].oarcs.iter() {
            let arc = &self.net.arcs[aid];
            let need = self.threshold[aid];
            // Only arcs whose upward crossing was actually counted get
            // decremented; a chooser may have skipped the arc entirely.
            if old >= need
                && new < need
                && self.satisfied[aid].swap(false, Ordering::Relaxed)
            {
                let mut cnt = lock(&self.enabled[arc.transition]);
                let was_full =
                    *cnt as usize == self.net.transitions[arc.transition].iarcs.len();
                *cnt -= 1;
                if was_full {
                    starved.push(arc.transition);
                }
            }
        }
    }

    /// Input requirements grouped per unique place (a place feeding
    /// the transition through several arcs is counted once, with the
    /// summed weight) and sorted by place id, a fixed total order.
    pub(crate) fn input_requirements(&self, t: TransitionId) -> Vec<(PlaceId, Weight)> {
        let mut needs: Vec<(PlaceId, Weight)> = Vec::new();
        for &aid in self.net.transitions[t].iarcs.iter() {
            let arc = &self.net.arcs[aid];
            match needs.iter_mut().find(|(p, _)| *p == arc.place) {
                Some((_, w)) => *w += arc.weight,
                None => needs.push((arc.place, arc.weight)),
            }
        }
        needs.sort_by_key(|&(p, _)| p);
        needs
    }

    pub(crate) fn fully_enabled(&self, t: TransitionId) -> bool {
        *lock(&self.enabled[t]) as usize == self.net.transitions[t].iarcs.len()
    }

    /// Commit effects of a firing: sequence number, external listener
    /// (first, for causal visibility), local fire hook, then the
    /// cascading deposits into the output places. Caller must hold no
    /// engine lock.
    pub(crate) fn fire_effects(self: &Arc<Self>, t: TransitionId) {
        let seq = self.next_seq();
        if let Some(listener) = &self.net.listener {
            listener(t, seq);
        }
        let tr = &self.net.transitions[t];
        debug!("transition {} fired, seq {}", tr.name, seq);
        if let Some(hook) = &tr.on_fire {
            hook(&FireCtx {
                transition: t,
                name: &tr.name,
                seq,
            });
        }
        for &aid in tr.oarcs.iter() {
            let arc = &self.net.arcs[aid];
            self.add_tokens(arc.place, arc.weight);
        }
    }

    pub(crate) fn run_add_hook(&self, place: PlaceId, tokens: Weight) {
        let p = &self.net.places[place];
        if let Some(hook) = &p.on_add {
            let stopper = || self.request_stop();
            hook(&HookCtx {
                place,
                name: &p.name,
                tokens,
                stop: &stopper,
            });
        }
    }

    pub(crate) fn run_deduct_hook(&self, place: PlaceId, tokens: Weight) {
        let p = &self.net.places[place];
        if let Some(hook) = &p.on_deduct {
            let stopper = || self.request_stop();
            hook(&HookCtx {
                place,
                name: &p.name,
                tokens,
                stop: &stopper,
            });
        }
    }

    pub(crate) fn run_starved_hooks(&self, starved: &[TransitionId]) {
        for &t in starved {
            let tr = &self.net.transitions[t];
            debug!("transition {} no longer fully enabled", tr.name);
            if let Some(hook) = &tr.on_starved {
                hook(t);
            }
        }
    }
}

/// A running net: frozen topology, live token counts, worker pool.
pub struct Runtime {
    core: Arc<Core>,
    pool: Option<Pool>,
}

impl Runtime {
    /// Freezes `net`, spawns the pool, applies every place's initial
    /// marking through the engine's `add_tokens` entry point, and for
    /// the time-ordered engine submits the simulation loop.
    pub fn start(net: Net, config: RuntimeConfig) -> Self {
        let pool = Pool::new(config.threads);
        let tokens = IndexVec::from_vec(
            (0..net.places.len()).map(|_| Mutex::new(0)).collect(),
        );
        let enabled = IndexVec::from_vec(
            (0..net.transitions.len()).map(|_| Mutex::new(0)).collect(),
        );
        let satisfied = IndexVec::from_vec(
            (0..net.arcs.len()).map(|_| AtomicBool::new(false)).collect(),
        );
        let mut threshold: IndexVec<ArcId, Weight> =
            IndexVec::from_vec(vec![0; net.arcs.len()]);
        for (aid, arc) in net.arcs.iter_enumerated() {
            if arc.direction == ArcDirection::PlaceToTransition {
                threshold[aid] = net.transitions[arc.transition]
                    .iarcs
                    .iter()
                    .filter(|&&sibling| net.arcs[sibling].place == arc.place)
                    .map(|&sibling| net.arcs[sibling].weight)
                    .sum();
            }
        }
        let sim = match config.engine {
            EngineKind::Greedy => None,
            EngineKind::TimeOrdered(policy) => Some(timed::SimState::new(policy)),
        };
        let core = Arc::new(Core {
            net,
            tokens,
            enabled,
            satisfied,
            threshold,
            seq: AtomicU64::new(0),
            pool: pool.handle(),
            engine: config.engine,
            sim,
        });

        for place in (0..core.net.places.len()).map(PlaceId::from_usize) {
            let marking = core.net.places[place].marking;
            if marking > 0 {
                core.add_tokens(place, marking);
            }
        }
        if core.sim.is_some() {
            let loop_core = Arc::clone(&core);
            core.pool
                .submit(Box::new(move || timed::sim_step(loop_core)));
        }

        Self {
            core,
            pool: Some(pool),
        }
    }

    /// Deposit `n` tokens into `place`. Valid from any thread once the
    /// runtime is started; this is the same entry point the cascading
    /// firings use.
    pub fn add_tokens(&self, place: PlaceId, n: Weight) {
        if place.index() >= self.core.net.places.len() {
            unrecoverable!("place handle {:?} was not created by this net", place);
        }
        self.core.add_tokens(place, n);
    }

    /// Current token count of one place. A snapshot; under a running
    /// net it may be stale by the time the caller looks at it.
    pub fn tokens(&self, place: PlaceId) -> Weight {
        *lock(&self.core.tokens[place])
    }

    pub fn request_stop(&self) {
        self.core.request_stop();
    }

    /// Drains the pool (the caller participates in the work), joins
    /// every worker and hands the net back with each place's final
    /// token count written into it.
    pub fn join(mut self) -> Net {
        let pool = self.pool.take().expect("runtime already joined");
        pool.join_all();
        let core = Arc::clone(&self.core);
        drop(self);
        let core = match Arc::try_unwrap(core) {
            Ok(core) => core,
            Err(_) => unrecoverable!("work items still alive after pool drain"),
        };
        let Core { mut net, tokens, .. } = core;
        for (idx, cell) in tokens.into_vec().into_iter().enumerate() {
            let place = PlaceId::from_usize(idx);
            net.places[place].tokens = cell.into_inner().unwrap_or_else(|e| e.into_inner());
        }
        net
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        // Dropped without join: stop the pool so workers exit.
        if let Some(pool) = self.pool.take() {
            self.core.request_stop();
            pool.join_all();
        }
    }
}
