//! # Petri 网数据模型（Place/Transition Net）
//!
//! 设库所集合 `P` 与迁移集合 `T`。每条弧连接一个库所与一个迁移并携带
//! 权重 `w ≥ 1`。对标识 `M ∈ ℕ^{|P|}`，迁移 `t` **可激发** 当且仅当
//! `∀(p, t): M[p] ≥ w[p, t]`；**发射** 原子地从全部输入库所扣除权重并
//! 向全部输出库所增加权重。
//!
//! 本模块只定义静态结构与构造接口；令牌流动与两种发射引擎见
//! [`crate::runtime`]。
//!
//! ## 示例
//!
//! ```rust
//! use pnflow::net::{Net, Place, Transition};
//! use pnflow::runtime::{EngineKind, Runtime, RuntimeConfig};
//!
//! let mut net = Net::new();
//! let p1 = net.create_place(Place::new("p1").with_marking(1));
//! let p2 = net.create_place(Place::new("p2"));
//! let t1 = net.create_transition(Transition::new("t1"));
//! let done = net.create_quit_place("done");
//!
//! net.create_arc(p1.into(), t1.into(), 1);
//! net.create_arc(t1.into(), p2.into(), 1);
//! net.create_arc(p2.into(), done.into(), 1); // synthesizes the consuming transition
//!
//! let rt = Runtime::start(
//!     net,
//!     RuntimeConfig {
//!         threads: 2,
//!         engine: EngineKind::Greedy,
//!     },
//! );
//! let net = rt.join();
//! assert_eq!(net.place(p1).tokens(), 0);
//! assert_eq!(net.place(p2).tokens(), 0);
//! assert_eq!(net.place(done).tokens(), 1);
//! ```

pub mod core;
pub mod ids;
pub mod index_vec;
pub mod structure;

pub use self::core::Net;
pub use ids::{ArcId, PlaceId, TransitionId};
pub use index_vec::{Idx, IndexVec};
pub use structure::{
    Arc, ArcDirection, ArcList, FireCtx, HookCtx, NodeRef, Place, Transition, Weight,
};
