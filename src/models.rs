//! Ready-made nets: clients of the construction API, used by the demo
//! binary and the integration tests. Each finite model wires a quit
//! place so a completed run reaches quiescence on its own; the dining
//! philosophers deliberately do not, since their point is to deadlock.

use crate::net::{Net, Place, PlaceId, Transition, TransitionId};

pub struct SimpleChain {
    pub net: Net,
    pub p1: PlaceId,
    pub p2: PlaceId,
    pub done: PlaceId,
}

/// p1 -> t1 -> p2 -> t2 -> done. One token deposited at p1 flows
/// through and ends the run.
pub fn simple_chain() -> SimpleChain {
    let mut net = Net::new();
    let p1 = net.create_place(Place::new("p1").with_marking(1));
    let p2 = net.create_place(Place::new("p2"));
    let done = net.create_quit_place("done");
    let t1 = net.create_transition(Transition::new("t1"));
    let t2 = net.create_transition(Transition::new("t2"));
    net.create_arc(p1.into(), t1.into(), 1);
    net.create_arc(t1.into(), p2.into(), 1);
    net.create_arc(p2.into(), t2.into(), 1);
    net.create_arc(t2.into(), done.into(), 1);
    SimpleChain { net, p1, p2, done }
}

pub struct MutexPair {
    pub net: Net,
    pub mutex: PlaceId,
    pub use1: PlaceId,
    pub use2: PlaceId,
    pub acquire1: TransitionId,
    pub release1: TransitionId,
    pub acquire2: TransitionId,
    pub release2: TransitionId,
}

/// Two critical sections sharing one mutex token. Each side wants the
/// section `rounds` times; once both are done a collector transition
/// (arc weight = rounds on both inputs) ends the run.
pub fn mutex_pair(rounds: u64) -> MutexPair {
    let mut net = Net::new();
    let mutex = net.create_place(Place::new("mutex").with_marking(1));
    let req1 = net.create_place(Place::new("req1").with_marking(rounds));
    let req2 = net.create_place(Place::new("req2").with_marking(rounds));
    let use1 = net.create_place(Place::new("use1"));
    let use2 = net.create_place(Place::new("use2"));
    let done1 = net.create_place(Place::new("done1"));
    let done2 = net.create_place(Place::new("done2"));
    let quit = net.create_quit_place("alldone");

    let acquire1 = net.create_transition(Transition::new("acquire1"));
    let release1 = net.create_transition(Transition::new("release1"));
    let acquire2 = net.create_transition(Transition::new("acquire2"));
    let release2 = net.create_transition(Transition::new("release2"));
    let finish = net.create_transition(Transition::new("finish"));

    net.create_arc(req1.into(), acquire1.into(), 1);
    net.create_arc(mutex.into(), acquire1.into(), 1);
    net.create_arc(acquire1.into(), use1.into(), 1);
    net.create_arc(use1.into(), release1.into(), 1);
    net.create_arc(release1.into(), mutex.into(), 1);
    net.create_arc(release1.into(), done1.into(), 1);

    net.create_arc(req2.into(), acquire2.into(), 1);
    net.create_arc(mutex.into(), acquire2.into(), 1);
    net.create_arc(acquire2.into(), use2.into(), 1);
    net.create_arc(use2.into(), release2.into(), 1);
    net.create_arc(release2.into(), mutex.into(), 1);
    net.create_arc(release2.into(), done2.into(), 1);

    net.create_arc(done1.into(), finish.into(), rounds);
    net.create_arc(done2.into(), finish.into(), rounds);
    net.create_arc(finish.into(), quit.into(), 1);

    MutexPair {
        net,
        mutex,
        use1,
        use2,
        acquire1,
        release1,
        acquire2,
        release2,
    }
}

pub struct BoundedBuffer {
    pub net: Net,
    pub free: PlaceId,
    pub filled: PlaceId,
    pub push: TransitionId,
    pub pop: TransitionId,
}

/// Producer/consumer over `slots` buffer slots moving `items` items.
/// `filled` carries an explicit capacity, so an engine that ever
/// overfills the buffer dies loudly instead of silently.
pub fn bounded_buffer(slots: u64, items: u64) -> BoundedBuffer {
    let mut net = Net::new();
    let src = net.create_place(Place::new("src").with_marking(items));
    let free = net.create_place(Place::new("free").with_marking(slots));
    let filled = net.create_place(Place::new("filled").with_capacity(slots));
    let popped = net.create_place(Place::new("popped"));
    let quit = net.create_quit_place("drained");

    let push = net.create_transition(Transition::new("push"));
    let pop = net.create_transition(Transition::new("pop"));
    let finish = net.create_transition(Transition::new("finish"));

    net.create_arc(src.into(), push.into(), 1);
    net.create_arc(free.into(), push.into(), 1);
    net.create_arc(push.into(), filled.into(), 1);

    net.create_arc(filled.into(), pop.into(), 1);
    net.create_arc(pop.into(), free.into(), 1);
    net.create_arc(pop.into(), popped.into(), 1);

    net.create_arc(popped.into(), finish.into(), items);
    net.create_arc(finish.into(), quit.into(), 1);

    BoundedBuffer {
        net,
        free,
        filled,
        push,
        pop,
    }
}

pub struct Pipeline {
    pub net: Net,
    pub head: PlaceId,
    pub tail: PlaceId,
}

/// A linear pipe of `stages` places; each stage is joined to the next
/// through a synthesized transition, the tail feeds the quit place.
pub fn pipeline(stages: usize) -> Pipeline {
    assert!(stages >= 1, "a pipe needs at least one stage");
    let mut net = Net::new();
    let head = net.create_place(Place::new("stage0").with_marking(1));
    let mut prev = head;
    for i in 1..stages {
        let stage = net.create_place(Place::new(format!("stage{i}")));
        net.create_arc(prev.into(), stage.into(), 1);
        prev = stage;
    }
    let quit = net.create_quit_place("sink");
    net.create_arc(prev.into(), quit.into(), 1);
    Pipeline {
        net,
        head,
        tail: prev,
    }
}

pub struct Diner {
    pub have_lfork: PlaceId,
    pub have_rfork: PlaceId,
    pub eating: PlaceId,
    pub free_fork: PlaceId,
    pub start_eating: TransitionId,
}

pub struct DiningTable {
    pub net: Net,
    pub diners: Vec<Diner>,
}

/// The classical dining philosophers, forks shared circularly:
/// philosopher `i`'s left fork is fork `i`, their right fork is fork
/// `(i + 1) % seats`. The net cycles forever unless it deadlocks, so
/// runs are ended from outside by `request_stop`.
pub fn dining_philosophers(seats: usize) -> DiningTable {
    assert!(seats >= 2, "the table needs at least two seats");
    let mut net = Net::new();
    let mut diners = Vec::with_capacity(seats);

    for i in 0..seats {
        let have_lfork = net.create_place(Place::new(format!("have_lfork{i}")));
        let have_rfork = net.create_place(Place::new(format!("have_rfork{i}")));
        let lhand_empty = net.create_place(Place::new(format!("lhand_empty{i}")).with_marking(1));
        let rhand_empty = net.create_place(Place::new(format!("rhand_empty{i}")).with_marking(1));
        let eating = net.create_place(Place::new(format!("eating{i}")));
        let thinking = net.create_place(Place::new(format!("thinking{i}")).with_marking(1));
        let thinkingl = net.create_place(Place::new(format!("thinkingl{i}")));
        let thinkingr = net.create_place(Place::new(format!("thinkingr{i}")));
        let free_fork = net.create_place(Place::new(format!("free_fork{i}")).with_marking(1));

        let take_lfork = net.create_transition(Transition::new(format!("take_lfork{i}")));
        let take_rfork = net.create_transition(Transition::new(format!("take_rfork{i}")));
        let start_eating = net.create_transition(Transition::new(format!("start_eating{i}")));
        let start_thinking = net.create_transition(Transition::new(format!("start_thinking{i}")));
        let put_lfork = net.create_transition(Transition::new(format!("put_lfork{i}")));
        let put_rfork = net.create_transition(Transition::new(format!("put_rfork{i}")));

        net.create_arc(lhand_empty.into(), take_lfork.into(), 1);
        net.create_arc(free_fork.into(), take_lfork.into(), 1);
        net.create_arc(take_lfork.into(), have_lfork.into(), 1);

        net.create_arc(rhand_empty.into(), take_rfork.into(), 1);
        net.create_arc(take_rfork.into(), have_rfork.into(), 1);
        // the right fork arc is wired below, once the neighbor exists

        net.create_arc(have_lfork.into(), start_eating.into(), 1);
        net.create_arc(have_rfork.into(), start_eating.into(), 1);
        net.create_arc(thinking.into(), start_eating.into(), 1);
        net.create_arc(start_eating.into(), eating.into(), 1);

        net.create_arc(eating.into(), start_thinking.into(), 1);
        net.create_arc(start_thinking.into(), thinking.into(), 1);
        net.create_arc(start_thinking.into(), thinkingl.into(), 1);
        net.create_arc(start_thinking.into(), thinkingr.into(), 1);

        net.create_arc(thinkingl.into(), put_lfork.into(), 1);
        net.create_arc(put_lfork.into(), lhand_empty.into(), 1);
        net.create_arc(put_lfork.into(), free_fork.into(), 1);

        net.create_arc(thinkingr.into(), put_rfork.into(), 1);
        net.create_arc(put_rfork.into(), rhand_empty.into(), 1);
        // the fork return arc is wired below as well

        diners.push((
            Diner {
                have_lfork,
                have_rfork,
                eating,
                free_fork,
                start_eating,
            },
            take_rfork,
            put_rfork,
        ));
    }

    for i in 0..seats {
        let neighbor_fork = diners[(i + 1) % seats].0.free_fork;
        let (take_rfork, put_rfork) = (diners[i].1, diners[i].2);
        net.create_arc(neighbor_fork.into(), take_rfork.into(), 1);
        net.create_arc(put_rfork.into(), neighbor_fork.into(), 1);
    }

    DiningTable {
        net,
        diners: diners.into_iter().map(|(diner, _, _)| diner).collect(),
    }
}
