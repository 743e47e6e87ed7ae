//! Demo runner: builds one of the bundled models, lets it flow on the
//! chosen engine and reports the final marking.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Arg, Command};

use pnflow::models;
use pnflow::net::Net;
use pnflow::runtime::{EngineKind, Runtime, RuntimeConfig, TimedPolicy};
use pnflow::{export, net::NodeRef};

fn make_parser() -> Command {
    Command::new("pnrun")
        .about("Run a bundled Petri net model on the pnflow engine")
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .default_value("simple")
                .value_parser(["simple", "mutex", "buffer", "pipe", "dine"]),
        )
        .arg(
            Arg::new("engine")
                .short('e')
                .long("engine")
                .default_value("greedy")
                .value_parser(["greedy", "delay", "random-priority", "random-choice"]),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .default_value("4")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("seats")
                .long("seats")
                .help("Seats at the dining table (dine model only)")
                .default_value("4")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("rounds")
                .long("rounds")
                .help("Critical-section rounds / buffered items")
                .default_value("100")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("dot")
                .long("dot")
                .value_name("FILE")
                .help("Write the final net as a Graphviz file"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .value_name("FILE")
                .help("Write the final net as a petri.json snapshot"),
        )
}

fn parse_engine(name: &str) -> EngineKind {
    match name {
        "greedy" => EngineKind::Greedy,
        "delay" => EngineKind::TimeOrdered(TimedPolicy::DelayHeap {
            advance_clock: true,
        }),
        "random-priority" => EngineKind::TimeOrdered(TimedPolicy::RandomPriority),
        "random-choice" => EngineKind::TimeOrdered(TimedPolicy::RandomChoice),
        other => unreachable!("clap rejects engine {other}"),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let matches = make_parser().get_matches();

    let engine = parse_engine(matches.get_one::<String>("engine").unwrap());
    let threads = *matches.get_one::<usize>("threads").unwrap();
    let seats = *matches.get_one::<usize>("seats").unwrap();
    let rounds = *matches.get_one::<u64>("rounds").unwrap();
    let config = RuntimeConfig { threads, engine };

    let model = matches.get_one::<String>("model").unwrap().as_str();
    let net = match model {
        "simple" => run_to_quiescence(models::simple_chain().net, config),
        "pipe" => run_to_quiescence(models::pipeline(8).net, config),
        "mutex" => run_mutex(rounds, config)?,
        "buffer" => run_to_quiescence(models::bounded_buffer(4, rounds).net, config),
        "dine" => run_dining(seats, config),
        other => bail!("unknown model {other}"),
    };

    println!("final marking:");
    for (id, place) in net.places() {
        if place.tokens() > 0 {
            println!(
                "  {:<6} {:<16} {}",
                net.node_key(NodeRef::Place(id)),
                place.name,
                place.tokens()
            );
        }
    }

    if let Some(path) = matches.get_one::<String>("dot") {
        export::write_dot(&net, path)?;
        println!("dot graph written to {path}");
    }
    if let Some(path) = matches.get_one::<String>("json") {
        export::write_json(&net, path)?;
        println!("json snapshot written to {path}");
    }
    Ok(())
}

fn run_to_quiescence(net: Net, config: RuntimeConfig) -> Net {
    Runtime::start(net, config).join()
}

fn run_mutex(rounds: u64, config: RuntimeConfig) -> Result<Net> {
    let model = models::mutex_pair(rounds);
    let mut net = model.net;
    let (acquire1, acquire2) = (model.acquire1, model.acquire2);
    let (release1, release2) = (model.release1, model.release2);
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    net.set_listener(move |t, seq| {
        if t == acquire1 || t == acquire2 || t == release1 || t == release2 {
            sink.lock().unwrap().push((seq, t));
        }
    });

    let net = run_to_quiescence(net, config);

    // The listener in the returned net keeps its clone of the log
    // alive, so read through the lock instead of unwrapping the Arc.
    let mut events = log.lock().unwrap().clone();
    events.sort_unstable_by_key(|&(seq, _)| seq);
    let mut holder = None;
    for (_, t) in events {
        match holder {
            None if t == acquire1 || t == acquire2 => holder = Some(t),
            Some(held) if (held == acquire1 && t == release1)
                || (held == acquire2 && t == release2) => holder = None,
            _ => bail!("mutual exclusion violated around transition {t:?}"),
        }
    }
    println!("mutex discipline held for {rounds} rounds per side");
    Ok(net)
}

fn run_dining(seats: usize, config: RuntimeConfig) -> Net {
    let table = models::dining_philosophers(seats);
    let meals = Arc::new(AtomicU64::new(0));
    let mut net = table.net;
    let eaten = Arc::clone(&meals);
    let eat_transitions: Vec<_> = table.diners.iter().map(|d| d.start_eating).collect();
    net.set_listener(move |t, _| {
        if eat_transitions.contains(&t) {
            eaten.fetch_add(1, Ordering::SeqCst);
        }
    });

    let rt = Runtime::start(net, config);
    // The table cycles until it deadlocks; give it a moment either way.
    std::thread::sleep(Duration::from_secs(2));
    rt.request_stop();
    let net = rt.join();

    let meals = meals.load(Ordering::SeqCst);
    if net.enabled_transitions().is_empty() {
        println!("table deadlocked after {meals} meals");
    } else {
        println!("stopped while still live, {meals} meals served");
    }
    net
}
