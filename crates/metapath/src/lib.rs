//! Metapath: an XPath-3.1-derived query and computation language over
//! metaschema document trees.
//!
//! An expression is compiled once against a [`StaticContext`] and evaluated
//! any number of times, against any node type implementing the model crate's
//! `ModelNode` trait:
//!
//! ```
//! use metapath::{compile, DynamicContext, StaticContext};
//! use metapath_model::node::tests::sample_catalog;
//! use metapath_model::TreeNode;
//! use std::sync::Arc;
//!
//! let tree = sample_catalog();
//! let static_ctx = Arc::new(StaticContext::new());
//! let expr = compile("/catalog/product[price gt 100]/@sku", &static_ctx).unwrap();
//! let ctx: DynamicContext<TreeNode> = DynamicContext::new(static_ctx);
//! let result = expr
//!     .evaluate(Some(metapath::Item::Node(tree.root())), &ctx)
//!     .unwrap();
//! assert_eq!(result.string_value(), "B-200");
//! ```

pub mod ast;
mod compile;
mod context;
pub mod cst;
mod engine;
mod error;
mod functions;
mod operators;
mod parser;
pub mod types;

pub use compile::{CompiledExpression, compile};
pub use context::{
    ARRAY_NAMESPACE, DynamicContext, FN_NAMESPACE, MAP_NAMESPACE, MATH_NAMESPACE, StaticContext,
};
pub use engine::Focus;
pub use error::MetapathError;
pub use parser::parse_expression;
pub use types::{
    ArrayValue, FunctionValue, Item, ItemType, KindTest, MapValue, Occurrence, Sequence,
    SequenceType,
};
