//! Compilation of parsed expressions into the typed tree.
//!
//! Resolves every name against the static context, turns type names into
//! [`DataType`]s, desugars arrow chains into ordinary calls, and verifies
//! that every statically named function exists with the called arity.

use crate::ast;
use crate::context::{DynamicContext, StaticContext};
use crate::cst;
use crate::engine::{self, Focus};
use crate::error::MetapathError;
use crate::parser;
use crate::types::{
    Item, ItemType, KindTest, Occurrence, Sequence, SequenceType,
};
use metapath_model::{AtomicValue, DataType, ModelNode, Name};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

/// Parses and compiles `source` under `static_ctx`.
pub fn compile(
    source: &str,
    static_ctx: &StaticContext,
) -> Result<CompiledExpression, MetapathError> {
    log::debug!("compiling metapath expression: {}", source);
    let cst = parser::parse_expression(source)?;
    let builder = Builder { static_ctx };
    let expr = builder.expr(&cst)?;
    Ok(CompiledExpression {
        source: source.to_string(),
        expr: Arc::new(expr),
    })
}

/// A compiled, reusable expression. Immutable and shareable across threads.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    source: String,
    expr: Arc<ast::Expr>,
}

impl CompiledExpression {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn expr(&self) -> &ast::Expr {
        &self.expr
    }

    /// Evaluates against an optional context item.
    pub fn evaluate<'a, N: ModelNode<'a>>(
        &self,
        context_item: Option<Item<N>>,
        ctx: &DynamicContext<N>,
    ) -> Result<Sequence<N>, MetapathError> {
        log::trace!("evaluating: {}", self.source);
        let focus = Focus::of(context_item);
        engine::evaluate(&self.expr, ctx, &focus, &HashMap::new())
    }

    pub fn evaluate_as_boolean<'a, N: ModelNode<'a>>(
        &self,
        context_item: Option<Item<N>>,
        ctx: &DynamicContext<N>,
    ) -> Result<bool, MetapathError> {
        self.evaluate(context_item, ctx)?.effective_boolean_value()
    }

    pub fn evaluate_as_string<'a, N: ModelNode<'a>>(
        &self,
        context_item: Option<Item<N>>,
        ctx: &DynamicContext<N>,
    ) -> Result<String, MetapathError> {
        Ok(self.evaluate(context_item, ctx)?.string_value())
    }

    pub fn evaluate_as_integer<'a, N: ModelNode<'a>>(
        &self,
        context_item: Option<Item<N>>,
        ctx: &DynamicContext<N>,
    ) -> Result<Option<i64>, MetapathError> {
        match self.evaluate(context_item, ctx)?.atomized_singleton()? {
            None => Ok(None),
            Some(value) => value.to_integer().map(Some).ok_or_else(|| {
                MetapathError::type_error(format!("{} is not an integer", value.type_name()))
            }),
        }
    }
}

struct Builder<'c> {
    static_ctx: &'c StaticContext,
}

impl Builder<'_> {
    fn expr(&self, e: &cst::Expr) -> Result<ast::Expr, MetapathError> {
        Ok(match e {
            cst::Expr::Literal(lit) => ast::Expr::Literal(self.literal(lit)?),
            cst::Expr::ContextItem => ast::Expr::ContextItem,
            cst::Expr::Variable(v) => {
                ast::Expr::Variable(self.variable_name(v)?)
            }
            cst::Expr::Sequence(items) => {
                ast::Expr::Sequence(self.exprs(items)?)
            }
            cst::Expr::Path {
                absolute,
                base,
                steps,
            } => ast::Expr::Path {
                absolute: *absolute,
                base: self.boxed_opt(base)?,
                steps: steps
                    .iter()
                    .map(|s| self.step(s))
                    .collect::<Result<_, _>>()?,
            },
            cst::Expr::Filter { base, predicates } => ast::Expr::Filter {
                base: self.boxed(base)?,
                predicates: self.exprs(predicates)?,
            },
            cst::Expr::Or(l, r) => ast::Expr::Or(self.boxed(l)?, self.boxed(r)?),
            cst::Expr::And(l, r) => ast::Expr::And(self.boxed(l)?, self.boxed(r)?),
            cst::Expr::ValueComparison { op, left, right } => ast::Expr::ValueComparison {
                op: *op,
                left: self.boxed(left)?,
                right: self.boxed(right)?,
            },
            cst::Expr::GeneralComparison { op, left, right } => ast::Expr::GeneralComparison {
                op: *op,
                left: self.boxed(left)?,
                right: self.boxed(right)?,
            },
            cst::Expr::Arithmetic { op, left, right } => ast::Expr::Arithmetic {
                op: *op,
                left: self.boxed(left)?,
                right: self.boxed(right)?,
            },
            cst::Expr::Negate(e) => ast::Expr::Negate(self.boxed(e)?),
            cst::Expr::StringConcat(l, r) => {
                ast::Expr::StringConcat(self.boxed(l)?, self.boxed(r)?)
            }
            cst::Expr::Range { start, end } => ast::Expr::Range {
                start: self.boxed(start)?,
                end: self.boxed(end)?,
            },
            cst::Expr::Union(l, r) => ast::Expr::Union(self.boxed(l)?, self.boxed(r)?),
            cst::Expr::If {
                condition,
                then_branch,
                else_branch,
            } => ast::Expr::If {
                condition: self.boxed(condition)?,
                then_branch: self.boxed(then_branch)?,
                else_branch: self.boxed(else_branch)?,
            },
            cst::Expr::For {
                bindings,
                return_expr,
            } => ast::Expr::For {
                bindings: self.bindings(bindings)?,
                return_expr: self.boxed(return_expr)?,
            },
            cst::Expr::Let {
                bindings,
                return_expr,
            } => ast::Expr::Let {
                bindings: self.bindings(bindings)?,
                return_expr: self.boxed(return_expr)?,
            },
            cst::Expr::Quantified {
                quantifier,
                bindings,
                satisfies,
            } => ast::Expr::Quantified {
                quantifier: *quantifier,
                bindings: self.bindings(bindings)?,
                satisfies: self.boxed(satisfies)?,
            },
            cst::Expr::FunctionCall { name, args } => {
                self.function_call(name, self.exprs(args)?)?
            }
            cst::Expr::DynamicCall { base, args } => ast::Expr::DynamicCall {
                base: self.boxed(base)?,
                args: self.exprs(args)?,
            },
            cst::Expr::NamedFunctionRef { name, arity } => {
                let name = self
                    .static_ctx
                    .resolve_function_name(name.prefix.as_deref(), &name.local)?;
                self.check_function(name, *arity)?;
                ast::Expr::NamedFunctionRef {
                    name,
                    arity: *arity,
                }
            }
            cst::Expr::InlineFunction {
                params,
                return_type,
                body,
            } => ast::Expr::InlineFunction {
                params: params
                    .iter()
                    .map(|p| self.param(p))
                    .collect::<Result<_, _>>()?,
                return_type: return_type
                    .as_ref()
                    .map(|t| self.sequence_type(t))
                    .transpose()?,
                body: Arc::new(self.expr(body)?),
            },
            cst::Expr::ArgumentPlaceholder => ast::Expr::ArgumentPlaceholder,
            cst::Expr::MapConstructor(entries) => ast::Expr::MapConstructor(
                entries
                    .iter()
                    .map(|(k, v)| Ok((self.expr(k)?, self.expr(v)?)))
                    .collect::<Result<_, MetapathError>>()?,
            ),
            cst::Expr::SquareArray(members) => {
                ast::Expr::SquareArray(self.exprs(members)?)
            }
            cst::Expr::CurlyArray(e) => ast::Expr::CurlyArray(self.boxed(e)?),
            cst::Expr::Lookup { base, key } => ast::Expr::Lookup {
                base: self.boxed(base)?,
                key: self.lookup_key(key)?,
            },
            cst::Expr::UnaryLookup(key) => ast::Expr::UnaryLookup(self.lookup_key(key)?),
            cst::Expr::Arrow { base, steps } => self.arrow(base, steps)?,
            cst::Expr::SimpleMap { base, mapping } => ast::Expr::SimpleMap {
                base: self.boxed(base)?,
                mapping: self.boxed(mapping)?,
            },
            cst::Expr::InstanceOf {
                expr,
                sequence_type,
            } => ast::Expr::InstanceOf {
                expr: self.boxed(expr)?,
                sequence_type: self.sequence_type(sequence_type)?,
            },
            cst::Expr::TreatAs {
                expr,
                sequence_type,
            } => ast::Expr::TreatAs {
                expr: self.boxed(expr)?,
                sequence_type: self.sequence_type(sequence_type)?,
            },
            cst::Expr::CastAs { expr, single_type } => ast::Expr::CastAs {
                expr: self.boxed(expr)?,
                data_type: self.data_type(&single_type.type_name)?,
                optional: single_type.optional,
            },
            cst::Expr::CastableAs { expr, single_type } => ast::Expr::CastableAs {
                expr: self.boxed(expr)?,
                data_type: self.data_type(&single_type.type_name)?,
                optional: single_type.optional,
            },
        })
    }

    fn exprs(&self, es: &[cst::Expr]) -> Result<Vec<ast::Expr>, MetapathError> {
        es.iter().map(|e| self.expr(e)).collect()
    }

    fn boxed(&self, e: &cst::Expr) -> Result<Box<ast::Expr>, MetapathError> {
        Ok(Box::new(self.expr(e)?))
    }

    fn boxed_opt(
        &self,
        e: &Option<Box<cst::Expr>>,
    ) -> Result<Option<Box<ast::Expr>>, MetapathError> {
        e.as_ref().map(|e| self.boxed(e)).transpose()
    }

    fn bindings(
        &self,
        bindings: &[(String, cst::Expr)],
    ) -> Result<Vec<(Name, ast::Expr)>, MetapathError> {
        bindings
            .iter()
            .map(|(v, e)| Ok((self.variable_name(v)?, self.expr(e)?)))
            .collect()
    }

    // Variables are written `$prefix:local` or `$local`.
    fn variable_name(&self, text: &str) -> Result<Name, MetapathError> {
        match text.split_once(':') {
            Some((prefix, local)) => self
                .static_ctx
                .resolve_variable_name(Some(prefix), local),
            None => self.static_ctx.resolve_variable_name(None, text),
        }
    }

    fn literal(&self, lit: &cst::Literal) -> Result<AtomicValue, MetapathError> {
        Ok(match lit {
            cst::Literal::String(s) => AtomicValue::String(s.clone()),
            cst::Literal::Integer(i) => AtomicValue::Integer(*i),
            cst::Literal::Decimal(text) => AtomicValue::Decimal(
                Decimal::from_str(text)
                    .map_err(|e| MetapathError::syntax(text, e.to_string()))?,
            ),
        })
    }

    fn function_call(
        &self,
        name: &cst::QName,
        args: Vec<ast::Expr>,
    ) -> Result<ast::Expr, MetapathError> {
        let name = self
            .static_ctx
            .resolve_function_name(name.prefix.as_deref(), &name.local)?;
        self.check_function(name, args.len())?;
        Ok(ast::Expr::FunctionCall { name, args })
    }

    fn check_function(&self, name: Name, arity: usize) -> Result<(), MetapathError> {
        if crate::functions::is_known_function(name, arity) {
            Ok(())
        } else {
            Err(MetapathError::UnknownFunction {
                name: name.to_string(),
                arity,
            })
        }
    }

    /// `a => f(b) => $g(c)` becomes `$g(f(a, b), c)`.
    fn arrow(
        &self,
        base: &cst::Expr,
        steps: &[cst::ArrowStep],
    ) -> Result<ast::Expr, MetapathError> {
        let mut current = self.expr(base)?;
        for step in steps {
            let mut args = Vec::with_capacity(step.args.len() + 1);
            args.push(current);
            args.extend(self.exprs(&step.args)?);
            current = match &step.target {
                cst::ArrowTarget::Named(name) => self.function_call(name, args)?,
                cst::ArrowTarget::Variable(v) => ast::Expr::DynamicCall {
                    base: Box::new(ast::Expr::Variable(self.variable_name(v)?)),
                    args,
                },
                cst::ArrowTarget::Parenthesized(e) => ast::Expr::DynamicCall {
                    base: self.boxed(e)?,
                    args,
                },
            };
        }
        Ok(current)
    }

    fn step(&self, step: &cst::Step) -> Result<ast::Step, MetapathError> {
        Ok(ast::Step {
            axis: step.axis,
            test: self.node_test(&step.test)?,
            predicates: self.exprs(&step.predicates)?,
        })
    }

    fn node_test(&self, test: &cst::NodeTest) -> Result<ast::NodeTest, MetapathError> {
        Ok(match test {
            cst::NodeTest::Wildcard => ast::NodeTest::Wildcard,
            cst::NodeTest::Name(q) => ast::NodeTest::Name(self.node_name(q)?),
            cst::NodeTest::Kind(kt) => ast::NodeTest::Kind(self.kind_test(kt)?),
        })
    }

    fn node_name(&self, q: &cst::QName) -> Result<Name, MetapathError> {
        self.static_ctx
            .resolve_node_name(q.prefix.as_deref(), &q.local)
    }

    fn kind_test(&self, kt: &cst::KindTest) -> Result<KindTest, MetapathError> {
        let names = |name: &Option<cst::QName>,
                     type_name: &Option<cst::QName>|
         -> Result<(Option<Name>, Option<Name>), MetapathError> {
            Ok((
                name.as_ref().map(|q| self.node_name(q)).transpose()?,
                type_name.as_ref().map(|q| self.node_name(q)).transpose()?,
            ))
        };
        Ok(match kt {
            cst::KindTest::AnyNode => KindTest::AnyNode,
            cst::KindTest::Document => KindTest::Document,
            cst::KindTest::Assembly { name, type_name } => {
                let (name, type_name) = names(name, type_name)?;
                KindTest::Assembly { name, type_name }
            }
            cst::KindTest::Field { name, type_name } => {
                let (name, type_name) = names(name, type_name)?;
                KindTest::Field { name, type_name }
            }
            cst::KindTest::Flag { name, type_name } => {
                let (name, type_name) = names(name, type_name)?;
                KindTest::Flag { name, type_name }
            }
        })
    }

    fn param(&self, p: &cst::Param) -> Result<ast::Param, MetapathError> {
        Ok(ast::Param {
            name: self.variable_name(&p.name)?,
            type_decl: p
                .type_decl
                .as_ref()
                .map(|t| self.sequence_type(t))
                .transpose()?,
        })
    }

    fn lookup_key(&self, key: &cst::LookupKey) -> Result<ast::LookupKey, MetapathError> {
        Ok(match key {
            cst::LookupKey::Wildcard => ast::LookupKey::Wildcard,
            cst::LookupKey::Integer(i) => ast::LookupKey::Integer(*i),
            cst::LookupKey::Name(n) => ast::LookupKey::Name(n.clone()),
            cst::LookupKey::Parenthesized(e) => ast::LookupKey::Expr(self.boxed(e)?),
        })
    }

    fn data_type(&self, q: &cst::QName) -> Result<DataType, MetapathError> {
        if let Some(prefix) = &q.prefix
            && self.static_ctx.namespace_for_prefix(prefix).is_none()
        {
            return Err(MetapathError::UnknownPrefix(prefix.clone()));
        }
        DataType::lookup(&q.local)
            .ok_or_else(|| MetapathError::UnknownTypeName(q.to_string()))
    }

    fn sequence_type(
        &self,
        decl: &cst::SequenceTypeDecl,
    ) -> Result<SequenceType, MetapathError> {
        Ok(match decl {
            cst::SequenceTypeDecl::Empty => SequenceType::Empty,
            cst::SequenceTypeDecl::Typed {
                item_type,
                occurrence,
            } => SequenceType::Typed {
                item_type: self.item_type(item_type)?,
                occurrence: match occurrence {
                    cst::Occurrence::ExactlyOne => Occurrence::ExactlyOne,
                    cst::Occurrence::ZeroOrOne => Occurrence::ZeroOrOne,
                    cst::Occurrence::ZeroOrMore => Occurrence::ZeroOrMore,
                    cst::Occurrence::OneOrMore => Occurrence::OneOrMore,
                },
            },
        })
    }

    fn item_type(&self, decl: &cst::ItemTypeDecl) -> Result<ItemType, MetapathError> {
        Ok(match decl {
            cst::ItemTypeDecl::AnyItem => ItemType::AnyItem,
            cst::ItemTypeDecl::AnyAtomic => ItemType::AnyAtomic,
            cst::ItemTypeDecl::AnyMap => ItemType::AnyMap,
            cst::ItemTypeDecl::AnyArray => ItemType::AnyArray,
            cst::ItemTypeDecl::AnyFunction => ItemType::AnyFunction,
            cst::ItemTypeDecl::Kind(kt) => ItemType::Kind(self.kind_test(kt)?),
            cst::ItemTypeDecl::Named(q) => ItemType::Atomic(self.data_type(q)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_default(source: &str) -> Result<CompiledExpression, MetapathError> {
        compile(source, &StaticContext::new())
    }

    #[test]
    fn test_arrow_desugars_to_calls() {
        let compiled = compile_default("'ab' => substring(2) => upper-case()").unwrap();
        let ast::Expr::FunctionCall { name, args } = compiled.expr() else {
            panic!("expected a call, got {:?}", compiled.expr());
        };
        assert_eq!(name.local(), "upper-case");
        assert_eq!(args.len(), 1);
        let ast::Expr::FunctionCall { name, args } = &args[0] else {
            panic!("expected an inner call");
        };
        assert_eq!(name.local(), "substring");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_unknown_function_is_static_error() {
        let err = compile_default("no-such-function(1)").unwrap_err();
        assert_eq!(err.code(), "XPST0017");
        // wrong arity is the same failure
        let err = compile_default("not(1, 2)").unwrap_err();
        assert_eq!(err.code(), "XPST0017");
    }

    #[test]
    fn test_unknown_prefix_is_static_error() {
        let err = compile_default("undeclared:f(1)").unwrap_err();
        assert_eq!(err.code(), "XPST0081");
    }

    #[test]
    fn test_unknown_type_name() {
        let err = compile_default("'1' cast as no-such-type").unwrap_err();
        assert_eq!(err.code(), "XPST0051");
    }

    #[test]
    fn test_cast_target_resolves() {
        let compiled = compile_default("'5' cast as integer?").unwrap();
        let ast::Expr::CastAs {
            data_type,
            optional,
            ..
        } = compiled.expr()
        else {
            panic!("expected a cast");
        };
        assert_eq!(*data_type, DataType::Integer);
        assert!(optional);
    }

    #[test]
    fn test_step_names_resolve_in_default_namespace() {
        let compiled = compile_default("/catalog/product/@sku").unwrap();
        let ast::Expr::Path { steps, .. } = compiled.expr() else {
            panic!("expected a path");
        };
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].test, ast::NodeTest::Name(Name::local_only("catalog")));
        assert_eq!(steps[2].axis, ast::Axis::Flag);
    }
}
