//! 导出支持：dot 图与 petri.json 快照序列化接口。
//!
//! Consumes only the net's iteration contract; never touches engine
//! state, so it is safe on a freshly built net or on one handed back
//! by `Runtime::join`.

use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::structure::ArcDirection;
use crate::net::{Net, NodeRef};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One node record: `[id, label, [successor ids]]`. Serialized as a
/// plain array, the property-bag shape generic graph slicers consume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeRecord(pub String, pub String, pub Vec<String>);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetSnapshot {
    pub places: Vec<NodeRecord>,
    pub transitions: Vec<NodeRecord>,
}

pub fn snapshot(net: &Net) -> NetSnapshot {
    let places = net
        .places()
        .map(|(id, place)| {
            let succ = place
                .output_arcs()
                .iter()
                .map(|&aid| net.node_key(NodeRef::Transition(net.arc(aid).transition)))
                .collect();
            NodeRecord(
                net.node_key(NodeRef::Place(id)),
                place.name.clone(),
                succ,
            )
        })
        .collect();
    let transitions = net
        .transitions()
        .map(|(id, transition)| {
            let succ = transition
                .output_arcs()
                .iter()
                .map(|&aid| net.node_key(NodeRef::Place(net.arc(aid).place)))
                .collect();
            NodeRecord(
                net.node_key(NodeRef::Transition(id)),
                transition.name.clone(),
                succ,
            )
        })
        .collect();
    NetSnapshot {
        places,
        transitions,
    }
}

pub fn to_json(net: &Net) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&snapshot(net))?)
}

pub fn write_json<P: AsRef<Path>>(net: &Net, path: P) -> Result<(), ExportError> {
    fs::write(path, to_json(net)?)?;
    Ok(())
}

/// Graphviz rendering: places as ellipses labeled with their token
/// count, transitions as rectangles, arc weights above 1 as edge
/// labels.
pub fn to_dot(net: &Net) -> String {
    let mut dot = String::new();
    let _ = writeln!(&mut dot, "digraph {{");
    for (id, place) in net.places() {
        let _ = writeln!(
            &mut dot,
            "    {} [label=\"{} ({})\"];",
            net.node_key(NodeRef::Place(id)),
            escape_label(&place.name),
            place.tokens()
        );
    }
    for (id, transition) in net.transitions() {
        let _ = writeln!(
            &mut dot,
            "    {} [shape=rectangle, label=\"{}\"];",
            net.node_key(NodeRef::Transition(id)),
            escape_label(&transition.name)
        );
    }
    for (_, arc) in net.arcs() {
        let place = net.node_key(NodeRef::Place(arc.place));
        let transition = net.node_key(NodeRef::Transition(arc.transition));
        let (from, to) = match arc.direction {
            ArcDirection::PlaceToTransition => (place, transition),
            ArcDirection::TransitionToPlace => (transition, place),
        };
        if arc.weight == 1 {
            let _ = writeln!(&mut dot, "    {from} -> {to};");
        } else {
            let _ = writeln!(&mut dot, "    {from} -> {to} [label=\"{}\"];", arc.weight);
        }
    }
    let _ = writeln!(&mut dot, "}}");
    dot
}

pub fn write_dot<P: AsRef<Path>>(net: &Net, path: P) -> Result<(), ExportError> {
    fs::write(path, to_dot(net))?;
    Ok(())
}

fn escape_label(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{Place, Transition};

    fn chain() -> Net {
        let mut net = Net::new();
        let p = net.create_place(Place::new("src").with_marking(2));
        let t = net.create_transition(Transition::new("move"));
        let q = net.create_place(Place::new("dst"));
        net.create_arc(p.into(), t.into(), 2);
        net.create_arc(t.into(), q.into(), 1);
        net
    }

    #[test]
    fn snapshot_lists_successors_by_key() {
        let snap = snapshot(&chain());
        assert_eq!(
            snap.places,
            vec![
                NodeRecord("p0".into(), "src".into(), vec!["t0".into()]),
                NodeRecord("p1".into(), "dst".into(), vec![]),
            ]
        );
        assert_eq!(
            snap.transitions,
            vec![NodeRecord("t0".into(), "move".into(), vec!["p1".into()])]
        );
    }

    #[test]
    fn snapshot_json_round_trips() {
        let snap = snapshot(&chain());
        let json = to_json(&chain()).unwrap();
        let back: NetSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn dot_marks_transitions_and_weights() {
        let dot = to_dot(&chain());
        assert!(dot.contains("t0 [shape=rectangle, label=\"move\"];"));
        assert!(dot.contains("p0 -> t0 [label=\"2\"];"));
        assert!(dot.contains("t0 -> p1;"));
    }
}
