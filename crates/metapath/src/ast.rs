//! The compiled, typed expression tree.
//!
//! Built once from the parse tree by [`crate::compile`]; names are interned
//! [`Name`]s, cast targets are resolved [`DataType`]s, and arrow steps have
//! been desugared into ordinary calls. Expressions own their sub-expressions
//! by value and are immutable after construction, so a compiled tree can be
//! evaluated concurrently from many threads.

use crate::types::{KindTest, SequenceType};
use metapath_model::{AtomicValue, DataType, Name};
use std::sync::Arc;

pub use crate::cst::{ArithmeticOp, Axis, ComparisonOp, Quantifier};

#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    Wildcard,
    Name(Name),
    Kind(KindTest),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Name,
    pub type_decl: Option<SequenceType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupKey {
    Wildcard,
    Integer(i64),
    Name(String),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(AtomicValue),
    ContextItem,
    Variable(Name),
    Sequence(Vec<Expr>),
    Path {
        absolute: bool,
        base: Option<Box<Expr>>,
        steps: Vec<Step>,
    },
    Filter {
        base: Box<Expr>,
        predicates: Vec<Expr>,
    },
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    ValueComparison {
        op: ComparisonOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    GeneralComparison {
        op: ComparisonOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Negate(Box<Expr>),
    StringConcat(Box<Expr>, Box<Expr>),
    Range {
        start: Box<Expr>,
        end: Box<Expr>,
    },
    Union(Box<Expr>, Box<Expr>),
    If {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    For {
        bindings: Vec<(Name, Expr)>,
        return_expr: Box<Expr>,
    },
    Let {
        bindings: Vec<(Name, Expr)>,
        return_expr: Box<Expr>,
    },
    Quantified {
        quantifier: Quantifier,
        bindings: Vec<(Name, Expr)>,
        satisfies: Box<Expr>,
    },
    FunctionCall {
        name: Name,
        args: Vec<Expr>,
    },
    DynamicCall {
        base: Box<Expr>,
        args: Vec<Expr>,
    },
    NamedFunctionRef {
        name: Name,
        arity: usize,
    },
    InlineFunction {
        params: Vec<Param>,
        return_type: Option<SequenceType>,
        body: Arc<Expr>,
    },
    ArgumentPlaceholder,
    MapConstructor(Vec<(Expr, Expr)>),
    SquareArray(Vec<Expr>),
    CurlyArray(Box<Expr>),
    Lookup {
        base: Box<Expr>,
        key: LookupKey,
    },
    UnaryLookup(LookupKey),
    SimpleMap {
        base: Box<Expr>,
        mapping: Box<Expr>,
    },
    InstanceOf {
        expr: Box<Expr>,
        sequence_type: SequenceType,
    },
    TreatAs {
        expr: Box<Expr>,
        sequence_type: SequenceType,
    },
    CastAs {
        expr: Box<Expr>,
        data_type: DataType,
        optional: bool,
    },
    CastableAs {
        expr: Box<Expr>,
        data_type: DataType,
        optional: bool,
    },
}
