//! Greedy concurrent firing engine.
//!
//! Every deposit that makes a transition look enabled schedules a
//! firing attempt onto the pool. An attempt withdraws from all input
//! places through an all-or-nothing protocol: places are visited in
//! ascending id order (a fixed total order, so no two attempts can
//! hold each other's locks crosswise), each locked only if it still
//! meets its requirement, and on any shortfall everything acquired so
//! far is released in reverse order and the attempt retries while the
//! transition still looks enabled. A transition may repeatedly lose a
//! contended input place to a sibling; the engine deliberately offers
//! no fairness, since starvation in the modeled net is exactly what
//! the tool exists to expose.

use std::sync::{Arc, MutexGuard};

use log::trace;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::structure::{ArcList, Weight};
use crate::runtime::Core;
use crate::utils::lock;

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

    // Token accounting above always runs, but no new attempts are
    // scheduled once a stop is requested, or a cycling net would feed
    // the queue forever and the pool could never drain.
    if !core.pool.stop_requested() {
        for t in newly {
            let attempt_core = Arc::clone(core);
            core.pool
                .submit(Box::new(move || try_fire(&attempt_core, t)));
        }
    }
    core.run_add_hook(place, after);
}

/// One scheduled firing attempt. Loops while the enabled-input counter
/// still reads full: a failed withdrawal only means another contender
/// got there first, and a different input place may have refilled in
/// the meantime.
pub(crate) fn try_fire(core: &Arc<Core>, t: TransitionId) {
    let needs = core.input_requirements(t);
    while !core.pool.stop_requested() && core.fully_enabled(t) {
        let Some((after, starved)) = try_withdraw(core, &needs) else {
            continue;
        };
        for &(place, tokens) in &after {
            core.run_deduct_hook(place, tokens);
        }
        core.run_starved_hooks(&starved);
        core.fire_effects(t);
    }
}

type Withdrawal = (Vec<(PlaceId, Weight)>, Vec<TransitionId>);

/// All-or-nothing withdrawal across the grouped input requirements.
/// Returns the post-withdrawal count per place and the transitions
/// that lost full enablement, or `None` if some place fell short.
fn try_withdraw(core: &Core, needs: &[(PlaceId, Weight)]) -> Option<Withdrawal> {
    let mut guards: Vec<MutexGuard<'_, Weight>> = Vec::with_capacity(needs.len());
    for &(place, required) in needs {
        let guard = lock(&core.tokens[place]);
        if *guard < required {
            drop(guard);
            // Unwind in reverse acquisition order.
            while let Some(held) = guards.pop() {
                drop(held);
            }
            return None;
        }
        guards.push(guard);
    }

    // Every input place is locked with enough tokens: commit.
    let mut after = Vec::with_capacity(needs.len());
    let mut starved = Vec::new();
    for (guard, &(place, required)) in guards.iter_mut().zip(needs) {
        let old = **guard;
        let new = old - required;
        **guard = new;
        core.note_deduct(place, old, new, &mut starved);
        after.push((place, new));
    }
    while let Some(held) = guards.pop() {
        drop(held);
    }
    Some((after, starved))
}
