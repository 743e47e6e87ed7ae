//! Petri 网容器: 拥有全部库所、迁移与弧, 提供构造与遍历接口.
use std::fmt;

use log::debug;

use crate::net::ids::{ArcId, PlaceId, TransitionId};
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::structure::{
    Arc, ArcDirection, EventListener, NodeRef, Place, Transition, Weight,
};
use crate::unrecoverable;

/// Bipartite directed multigraph of places and transitions. The net
/// exclusively owns every node and arc it creates; handles are plain
/// arena indices assigned from a per-net monotonic counter. Topology
/// is frozen once the runtime starts; only token counts change after
/// that.
#[derive(Default)]
pub struct Net {
    pub(crate) places: IndexVec<PlaceId, Place>,
    pub(crate) transitions: IndexVec<TransitionId, Transition>,
    pub(crate) arcs: IndexVec<ArcId, Arc>,
    pub(crate) listener: Option<EventListener>,
}

impl Net {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_place(&mut self, place: Place) -> PlaceId {
        self.places.push(place)
    }

    pub fn create_transition(&mut self, transition: Transition) -> TransitionId {
        self.transitions.push(transition)
    }

    /// A place whose token arrival ends the run: its `on_add` hook
    /// requests pool shutdown, honored once the work queue drains.
    pub fn create_quit_place(&mut self, name: impl Into<String>) -> PlaceId {
        let name = name.into();
        self.create_place(Place::new(name).with_on_add(|ctx| {
            debug!("quit place {} got a token, requesting stop", ctx.name);
            ctx.request_stop();
        }))
    }

    /// Wires `src -> dst`. Between unlike endpoints a single arc is
    /// created and `None` returned. Between like endpoints (place to
    /// place, transition to transition) an intermediate node of the
    /// opposite type is synthesized, two arcs are wired through it and
    /// the intermediate is returned.
    pub fn create_arc(&mut self, src: NodeRef, dst: NodeRef, weight: Weight) -> Option<NodeRef> {
        if weight == 0 {
            unrecoverable!("arc {:?} -> {:?} requested with weight 0", src, dst);
        }
        match (src, dst) {
            (NodeRef::Place(p), NodeRef::Transition(t)) => {
                self.wire(p, t, weight, ArcDirection::PlaceToTransition);
                None
            }
            (NodeRef::Transition(t), NodeRef::Place(p)) => {
                self.wire(p, t, weight, ArcDirection::TransitionToPlace);
                None
            }
            (NodeRef::Place(a), NodeRef::Place(b)) => {
                self.check_place(a);
                self.check_place(b);
                let name = format!("{}_to_{}", self.places[a].name, self.places[b].name);
                let t = self.create_transition(Transition::new(name));
                self.wire(a, t, weight, ArcDirection::PlaceToTransition);
                self.wire(b, t, weight, ArcDirection::TransitionToPlace);
                Some(NodeRef::Transition(t))
            }
            (NodeRef::Transition(a), NodeRef::Transition(b)) => {
                self.check_transition(a);
                self.check_transition(b);
                let name = format!(
                    "{}_to_{}",
                    self.transitions[a].name, self.transitions[b].name
                );
                let p = self.create_place(Place::new(name));
                self.wire(p, a, weight, ArcDirection::TransitionToPlace);
                self.wire(p, b, weight, ArcDirection::PlaceToTransition);
                Some(NodeRef::Place(p))
            }
        }
    }

    fn wire(&mut self, place: PlaceId, transition: TransitionId, weight: Weight, direction: ArcDirection) {
        self.check_place(place);
        self.check_transition(transition);
        let arc = self.arcs.push(Arc {
            place,
            transition,
            weight,
            direction,
        });
        match direction {
            ArcDirection::PlaceToTransition => {
                self.places[place].oarcs.push(arc);
                self.transitions[transition].iarcs.push(arc);
            }
            ArcDirection::TransitionToPlace => {
                self.transitions[transition].oarcs.push(arc);
                self.places[place].iarcs.push(arc);
            }
        }
    }

    fn check_place(&self, place: PlaceId) {
        if place.index() >= self.places.len() {
            unrecoverable!("place handle {:?} was not created by this net", place);
        }
    }

    fn check_transition(&self, transition: TransitionId) {
        if transition.index() >= self.transitions.len() {
            unrecoverable!(
                "transition handle {:?} was not created by this net",
                transition
            );
        }
    }

    /// Global event listener, invoked synchronously on every firing
    /// with `(transition, sequence number)` before the transition's
    /// local `on_fire` hook runs.
    pub fn set_listener<F>(&mut self, listener: F)
    where
        F: Fn(TransitionId, u64) + Send + Sync + 'static,
    {
        self.listener = Some(Box::new(listener));
    }

    pub fn place(&self, id: PlaceId) -> &Place {
        &self.places[id]
    }

    /// Mutable access for attaching hooks after creation. Topology
    /// edits still go through `create_arc`.
    pub fn place_mut(&mut self, id: PlaceId) -> &mut Place {
        &mut self.places[id]
    }

    pub fn transition(&self, id: TransitionId) -> &Transition {
        &self.transitions[id]
    }

    pub fn arc(&self, id: ArcId) -> &Arc {
        &self.arcs[id]
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    pub fn arcs_len(&self) -> usize {
        self.arcs.len()
    }

    pub fn places(&self) -> impl Iterator<Item = (PlaceId, &Place)> {
        self.places.iter_enumerated()
    }

    pub fn transitions(&self) -> impl Iterator<Item = (TransitionId, &Transition)> {
        self.transitions.iter_enumerated()
    }

    pub fn arcs(&self) -> impl Iterator<Item = (ArcId, &Arc)> {
        self.arcs.iter_enumerated()
    }

    /// Stable textual identity for exporters: `p{n}` / `t{n}`.
    pub fn node_key(&self, node: NodeRef) -> String {
        match node {
            NodeRef::Place(p) => format!("p{}", p.index()),
            NodeRef::Transition(t) => format!("t{}", t.index()),
        }
    }

    /// Transitions enabled under the written-back token counts. Only
    /// meaningful on a net returned by `Runtime::join`; used to tell a
    /// deadlocked terminal marking from an interrupted run.
    /// Requirements are grouped per place, so a place feeding a
    /// transition through several arcs must cover their summed weight.
    pub fn enabled_transitions(&self) -> Vec<TransitionId> {
        self.transitions
            .iter_enumerated()
            .filter(|(_, tr)| {
                let mut needs: Vec<(PlaceId, Weight)> = Vec::new();
                for &aid in tr.iarcs.iter() {
                    let arc = &self.arcs[aid];
                    match needs.iter_mut().find(|(p, _)| *p == arc.place) {
                        Some((_, w)) => *w += arc.weight,
                        None => needs.push((arc.place, arc.weight)),
                    }
                }
                needs
                    .iter()
                    .all(|&(p, w)| self.places[p].tokens >= w)
            })
            .map(|(id, _)| id)
            .collect()
    }
}

impl fmt::Debug for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Net")
            .field("places", &self.places)
            .field("transitions", &self.transitions)
            .field("arcs", &self.arcs)
            .finish()
    }
}
