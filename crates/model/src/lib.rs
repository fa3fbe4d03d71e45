//! Metaschema document model.
//!
//! The foundation layer of the Metapath engine: interned qualified names,
//! the atomic value model (strings, numbers, dates, durations, network
//! addresses), the arena-owned document tree, and the navigation axes.
//!
//! # Key Types
//!
//! - [`Name`]: an interned `(namespace, local)` pair compared by integer
//! - [`AtomicValue`]: a typed atomic value wrapping a native representation
//! - [`ModelNode`]: the navigable node contract the engine is written against
//! - [`DocumentTree`]: the production arena-backed node tree

pub mod atomic;
pub mod axes;
pub mod datatype;
pub mod error;
pub mod name;
pub mod node;
pub mod temporal;

pub use atomic::AtomicValue;
pub use datatype::DataType;
pub use error::ModelError;
pub use name::Name;
pub use node::{DocumentTree, DocumentTreeBuilder, ModelNode, NodeKind, TreeNode};
pub use temporal::{Date, DateTime, DayTimeDuration, Time, Timezone, YearMonthDuration};
