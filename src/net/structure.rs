//! P/T 网静态结构元素：库所、迁移、弧与回调挂点。
use std::fmt;

use smallvec::SmallVec;

use crate::net::ids::{ArcId, PlaceId, TransitionId};

pub type Weight = u64;

/// Per-node arc lists stay inline for the common small fan-out.
pub type ArcList = SmallVec<[ArcId; 4]>;

/// Context handed to a place's `on_add` / `on_deduct` hook, outside
/// every engine lock. `tokens` is the count right after the update
/// that triggered the hook.
pub struct HookCtx<'a> {
    pub place: PlaceId,
    pub name: &'a str,
    pub tokens: Weight,
    pub(crate) stop: &'a (dyn Fn() + Sync),
}

impl HookCtx<'_> {
    /// Cooperative shutdown: the pool stops once its queue drains.
    pub fn request_stop(&self) {
        (self.stop)()
    }
}

/// Context handed to a transition's `on_fire` hook. `seq` is the
/// globally monotonic event sequence number assigned at commit.
pub struct FireCtx<'a> {
    pub transition: TransitionId,
    pub name: &'a str,
    pub seq: u64,
}

pub type PlaceHook = Box<dyn Fn(&HookCtx<'_>) + Send + Sync>;
pub type ArcChooser = Box<dyn Fn(&[ArcId]) -> ArcList + Send + Sync>;
pub type FireHook = Box<dyn Fn(&FireCtx<'_>) + Send + Sync>;
pub type StarveHook = Box<dyn Fn(TransitionId) + Send + Sync>;
pub type DelayFn = Box<dyn Fn() -> u64 + Send + Sync>;
pub type EventListener = Box<dyn Fn(TransitionId, u64) + Send + Sync>;

pub struct Place {
    pub name: String,
    /// Initial tokens, applied once when the runtime starts.
    pub marking: Weight,
    /// 0 means the place can hold unlimited tokens.
    pub capacity: Weight,
    /// Final token count, written back when the runtime is joined.
    pub(crate) tokens: Weight,
    pub(crate) iarcs: ArcList,
    pub(crate) oarcs: ArcList,
    pub(crate) on_add: Option<PlaceHook>,
    pub(crate) on_deduct: Option<PlaceHook>,
    pub(crate) chooser: Option<ArcChooser>,
}

impl Place {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            marking: 0,
            capacity: 0,
            tokens: 0,
            iarcs: ArcList::new(),
            oarcs: ArcList::new(),
            on_add: None,
            on_deduct: None,
            chooser: None,
        }
    }

    pub fn with_marking(mut self, marking: Weight) -> Self {
        self.marking = marking;
        self
    }

    pub fn with_capacity(mut self, capacity: Weight) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_on_add<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HookCtx<'_>) + Send + Sync + 'static,
    {
        self.on_add = Some(Box::new(hook));
        self
    }

    /// Like [`Place::with_on_add`], for a place already in a net.
    pub fn set_on_add<F>(&mut self, hook: F)
    where
        F: Fn(&HookCtx<'_>) + Send + Sync + 'static,
    {
        self.on_add = Some(Box::new(hook));
    }

    pub fn with_on_deduct<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HookCtx<'_>) + Send + Sync + 'static,
    {
        self.on_deduct = Some(Box::new(hook));
        self
    }

    /// Restricts which outgoing arcs get notified on a deposit: the
    /// chooser receives every outgoing arc and returns the subset to
    /// notify (partial / non-deterministic fan-out).
    pub fn with_chooser<F>(mut self, chooser: F) -> Self
    where
        F: Fn(&[ArcId]) -> ArcList + Send + Sync + 'static,
    {
        self.chooser = Some(Box::new(chooser));
        self
    }

    pub fn tokens(&self) -> Weight {
        self.tokens
    }

    pub fn input_arcs(&self) -> &[ArcId] {
        &self.iarcs
    }

    pub fn output_arcs(&self) -> &[ArcId] {
        &self.oarcs
    }
}

impl fmt::Debug for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Place")
            .field("name", &self.name)
            .field("marking", &self.marking)
            .field("capacity", &self.capacity)
            .field("tokens", &self.tokens)
            .finish()
    }
}

pub struct Transition {
    pub name: String,
    pub(crate) iarcs: ArcList,
    pub(crate) oarcs: ArcList,
    pub(crate) on_fire: Option<FireHook>,
    pub(crate) on_starved: Option<StarveHook>,
    pub(crate) delay: Option<DelayFn>,
}

impl Transition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            iarcs: ArcList::new(),
            oarcs: ArcList::new(),
            on_fire: None,
            on_starved: None,
            delay: None,
        }
    }

    pub fn with_on_fire<F>(mut self, hook: F) -> Self
    where
        F: Fn(&FireCtx<'_>) + Send + Sync + 'static,
    {
        self.on_fire = Some(Box::new(hook));
        self
    }

    /// Invoked when the transition was fully enabled and a concurrent
    /// withdrawal dropped one of its input places below threshold.
    pub fn with_on_starved<F>(mut self, hook: F) -> Self
    where
        F: Fn(TransitionId) + Send + Sync + 'static,
    {
        self.on_starved = Some(Box::new(hook));
        self
    }

    /// Delay/priority source, consulted only by the time-ordered
    /// engine. Distributions are the caller's business.
    pub fn with_delay<F>(mut self, delay: F) -> Self
    where
        F: Fn() -> u64 + Send + Sync + 'static,
    {
        self.delay = Some(Box::new(delay));
        self
    }

    pub fn input_arcs(&self) -> &[ArcId] {
        &self.iarcs
    }

    pub fn output_arcs(&self) -> &[ArcId] {
        &self.oarcs
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transition").field(&self.name).finish()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Arc {
    pub place: PlaceId,
    pub transition: TransitionId,
    pub weight: Weight,
    pub direction: ArcDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArcDirection {
    PlaceToTransition,
    TransitionToPlace,
}

impl fmt::Debug for Arc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arc")
            .field("place", &self.place)
            .field("transition", &self.transition)
            .field("weight", &self.weight)
            .field("direction", &self.direction)
            .finish()
    }
}

/// Either endpoint of a `create_arc` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Place(PlaceId),
    Transition(TransitionId),
}

impl From<PlaceId> for NodeRef {
    fn from(id: PlaceId) -> Self {
        NodeRef::Place(id)
    }
}

impl From<TransitionId> for NodeRef {
    fn from(id: TransitionId) -> Self {
        NodeRef::Transition(id)
    }
}
