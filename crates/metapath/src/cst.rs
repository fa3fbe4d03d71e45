//! The untyped parse tree produced by the parser.
//!
//! Names are still raw `prefix:local` text and type names are unresolved
//! strings; the builder in [`crate::compile`] turns this into the typed
//! expression tree, resolving names against the static context.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QName {
    pub fn local(local: impl Into<String>) -> Self {
        QName {
            prefix: None,
            local: local.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(p) => write!(f, "{}:{}", p, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    SelfAxis,
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Flag,
}

/// A kind test as written: `assembly(part)`, `field(*, decimal)`, `flag()`,
/// `document-node()`, `node()`.
#[derive(Debug, Clone, PartialEq)]
pub enum KindTest {
    AnyNode,
    Document,
    Assembly {
        name: Option<QName>,
        type_name: Option<QName>,
    },
    Field {
        name: Option<QName>,
        type_name: Option<QName>,
    },
    Flag {
        name: Option<QName>,
        type_name: Option<QName>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    Wildcard,
    Name(QName),
    Kind(KindTest),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    IntegerDivide,
    Modulo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Some,
    Every,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Integer(i64),
    Decimal(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupKey {
    Wildcard,
    Integer(i64),
    Name(String),
    Parenthesized(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub type_decl: Option<SequenceTypeDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Occurrence {
    ExactlyOne,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemTypeDecl {
    AnyItem,
    AnyAtomic,
    AnyMap,
    AnyArray,
    AnyFunction,
    Kind(KindTest),
    Named(QName),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SequenceTypeDecl {
    Empty,
    Typed {
        item_type: ItemTypeDecl,
        occurrence: Occurrence,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SingleTypeDecl {
    pub type_name: QName,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrowStep {
    pub target: ArrowTarget,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowTarget {
    Named(QName),
    Variable(String),
    Parenthesized(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    ContextItem,
    Variable(String),
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
        bindings: Vec<(String, Expr)>,
        return_expr: Box<Expr>,
    },
    Let {
        bindings: Vec<(String, Expr)>,
        return_expr: Box<Expr>,
    },
    Quantified {
        quantifier: Quantifier,
        bindings: Vec<(String, Expr)>,
        satisfies: Box<Expr>,
    },
    FunctionCall {
        name: QName,
        args: Vec<Expr>,
    },
    DynamicCall {
        base: Box<Expr>,
        args: Vec<Expr>,
    },
    NamedFunctionRef {
        name: QName,
        arity: usize,
    },
    InlineFunction {
        params: Vec<Param>,
        return_type: Option<SequenceTypeDecl>,
        body: Box<Expr>,
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
    Arrow {
        base: Box<Expr>,
        steps: Vec<ArrowStep>,
    },
    SimpleMap {
        base: Box<Expr>,
        mapping: Box<Expr>,
    },
    InstanceOf {
        expr: Box<Expr>,
        sequence_type: SequenceTypeDecl,
    },
    TreatAs {
        expr: Box<Expr>,
        sequence_type: SequenceTypeDecl,
    },
    CastAs {
        expr: Box<Expr>,
        single_type: SingleTypeDecl,
    },
    CastableAs {
        expr: Box<Expr>,
        single_type: SingleTypeDecl,
    },
}
