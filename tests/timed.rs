//! Time-ordered engine behavior: one firing at a time, in the order
//! the configured policy dictates.

use std::sync::{Arc, Mutex};

use pnflow::models;
use pnflow::net::{Net, Place, Transition, TransitionId};
use pnflow::runtime::{EngineKind, Runtime, RuntimeConfig, TimedPolicy};

fn timed(policy: TimedPolicy) -> RuntimeConfig {
    RuntimeConfig {
        threads: 2,
        engine: EngineKind::TimeOrdered(policy),
    }
}

#[test]
fn chain_drains_under_every_policy() {
    let policies = [
        TimedPolicy::DelayHeap {
            advance_clock: false,
        },
        TimedPolicy::DelayHeap {
            advance_clock: true,
        },
        TimedPolicy::RandomPriority,
        TimedPolicy::RandomChoice,
    ];
    for policy in policies {
        let model = models::simple_chain();
        let net = Runtime::start(model.net, timed(policy)).join();
        assert_eq!(net.place(model.p1).tokens(), 0, "{policy:?}");
        assert_eq!(net.place(model.p2).tokens(), 0, "{policy:?}");
        assert_eq!(net.place(model.done).tokens(), 1, "{policy:?}");
    }
}

#[test]
fn mutex_rounds_complete_under_random_choice() {
    let model = models::mutex_pair(30);
    let net = Runtime::start(model.net, timed(TimedPolicy::RandomChoice)).join();
    assert_eq!(net.place(model.mutex).tokens(), 1);
    assert_eq!(net.place(model.use1).tokens(), 0);
    assert_eq!(net.place(model.use2).tokens(), 0);
}

/// Three transitions with delays 5, 2 and 4, where the delay-4 one is
/// only enabled by the delay-2 one's output. Whether the clock
/// advances decides who fires second: with a running clock the late
/// enablement costs 2 + 4 = 6 and the delay-5 transition goes first;
/// with a frozen clock the delay-4 key beats it.
fn delay_order(advance_clock: bool) -> Vec<&'static str> {
    let mut net = Net::new();
    let pa = net.create_place(Place::new("pa").with_marking(1));
    let pb = net.create_place(Place::new("pb").with_marking(1));
    let pc = net.create_place(Place::new("pc"));
    let pend = net.create_place(Place::new("pend"));
    let quit = net.create_quit_place("quit");
    let ta = net.create_transition(Transition::new("ta").with_delay(|| 5));
    let tb = net.create_transition(Transition::new("tb").with_delay(|| 2));
    let tc = net.create_transition(Transition::new("tc").with_delay(|| 4));
    let fin = net.create_transition(Transition::new("fin"));
    net.create_arc(pa.into(), ta.into(), 1);
    net.create_arc(ta.into(), pend.into(), 1);
    net.create_arc(pb.into(), tb.into(), 1);
    net.create_arc(tb.into(), pc.into(), 1);
    net.create_arc(pc.into(), tc.into(), 1);
    net.create_arc(tc.into(), pend.into(), 1);
    net.create_arc(pend.into(), fin.into(), 2);
    net.create_arc(fin.into(), quit.into(), 1);

    let order: Arc<Mutex<Vec<TransitionId>>> = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&order);
    net.set_listener(move |t, _| {
        if t != fin {
            log.lock().unwrap().push(t);
        }
    });

    Runtime::start(net, timed(TimedPolicy::DelayHeap { advance_clock })).join();
    let order = order.lock().unwrap();
    order
        .iter()
        .map(|&t| match t {
            t if t == ta => "ta",
            t if t == tb => "tb",
            _ => "tc",
        })
        .collect()
}

#[test]
fn advancing_clock_offsets_late_enablement() {
    assert_eq!(delay_order(true), ["tb", "ta", "tc"]);
}

#[test]
fn frozen_clock_orders_by_raw_delay() {
    assert_eq!(delay_order(false), ["tb", "tc", "ta"]);
}

#[test]
fn stale_candidate_is_dropped_not_fired() {
    let mut net = Net::new();
    let p = net.create_place(Place::new("p").with_marking(1));
    let quit = net.create_quit_place("quit");
    let t1 = net.create_transition(Transition::new("t1"));
    let t2 = net.create_transition(Transition::new("t2"));
    net.create_arc(p.into(), t1.into(), 1);
    net.create_arc(p.into(), t2.into(), 1);
    net.create_arc(t1.into(), quit.into(), 1);
    net.create_arc(t2.into(), quit.into(), 1);

    let fired: Arc<Mutex<Vec<TransitionId>>> = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&fired);
    net.set_listener(move |t, _| log.lock().unwrap().push(t));

    // Both transitions enter the candidate queue off the one deposit;
    // whichever pops second fails re-validation and must vanish
    // without firing.
    let net = Runtime::start(
        net,
        timed(TimedPolicy::DelayHeap {
            advance_clock: false,
        }),
    )
    .join();
    assert_eq!(fired.lock().unwrap().len(), 1);
    assert_eq!(net.place(p).tokens(), 0);
    assert_eq!(net.place(quit).tokens(), 1);
}
