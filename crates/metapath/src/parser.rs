//! Recursive-descent Metapath parser.
//!
//! Produces the untyped tree in [`crate::cst`]; precedence is encoded in the
//! call chain from [`expr_single`] down to [`primary_expr`]. Keyword
//! operators (`and`, `div`, `eq`, ...) only match on a word boundary so that
//! names like `android` or `division` parse as names.

use crate::cst::*;
use crate::error::MetapathError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map, map_res, not, opt, peek, recognize, value},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded},
};

pub fn parse_expression(input: &str) -> Result<Expr, MetapathError> {
    match expr(input.trim()) {
        Ok(("", expr)) => Ok(expr),
        Ok((rem, _)) => Err(MetapathError::syntax(
            input,
            format!("unparsed input remaining: '{}'", rem),
        )),
        Err(e) => Err(MetapathError::syntax(input, e.to_string())),
    }
}

fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: nom::error::ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

/// A keyword operator: the tag must end at a word boundary.
fn keyword<'a>(kw: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>>
{
    ws(nom::sequence::terminated(
        tag(kw),
        peek(not(take_while1(|c: char| {
            c.is_alphanumeric() || c == '_' || c == '-'
        }))),
    ))
}

fn expr(input: &str) -> IResult<&str, Expr> {
    let (input, items) = separated_list1(ws(char(',')), expr_single).parse(input)?;
    let expr = match items.len() {
        1 => items.into_iter().next().unwrap_or(Expr::Sequence(vec![])),
        _ => Expr::Sequence(items),
    };
    Ok((input, expr))
}

fn expr_single(input: &str) -> IResult<&str, Expr> {
    alt((for_expr, let_expr, quantified_expr, if_expr, or_expr)).parse(input)
}

fn for_expr(input: &str) -> IResult<&str, Expr> {
    let (input, _) = keyword("for").parse(input)?;
    let (input, bindings) = separated_list1(ws(char(',')), in_binding).parse(input)?;
    let (input, _) = keyword("return").parse(input)?;
    let (input, return_expr) = expr_single(input)?;
    Ok((
        input,
        Expr::For {
            bindings,
            return_expr: Box::new(return_expr),
        },
    ))
}

fn in_binding(input: &str) -> IResult<&str, (String, Expr)> {
    let (input, _) = ws(char('$')).parse(input)?;
    let (input, name) = var_name(input)?;
    let (input, _) = keyword("in").parse(input)?;
    let (input, expr) = expr_single(input)?;
    Ok((input, (name, expr)))
}

fn let_expr(input: &str) -> IResult<&str, Expr> {
    let (input, _) = keyword("let").parse(input)?;
    let (input, bindings) = separated_list1(ws(char(',')), let_binding).parse(input)?;
    let (input, _) = keyword("return").parse(input)?;
    let (input, return_expr) = expr_single(input)?;
    Ok((
        input,
        Expr::Let {
            bindings,
            return_expr: Box::new(return_expr),
        },
    ))
}

fn let_binding(input: &str) -> IResult<&str, (String, Expr)> {
    let (input, _) = ws(char('$')).parse(input)?;
    let (input, name) = var_name(input)?;
    let (input, _) = ws(tag(":=")).parse(input)?;
    let (input, expr) = expr_single(input)?;
    Ok((input, (name, expr)))
}

fn quantified_expr(input: &str) -> IResult<&str, Expr> {
    let (input, quantifier) = alt((
        value(Quantifier::Some, keyword("some")),
        value(Quantifier::Every, keyword("every")),
    ))
    .parse(input)?;
    let (input, bindings) = separated_list1(ws(char(',')), in_binding).parse(input)?;
    let (input, _) = keyword("satisfies").parse(input)?;
    let (input, satisfies) = expr_single(input)?;
    Ok((
        input,
        Expr::Quantified {
            quantifier,
            bindings,
            satisfies: Box::new(satisfies),
        },
    ))
}

fn if_expr(input: &str) -> IResult<&str, Expr> {
    let (input, _) = keyword("if").parse(input)?;
    let (input, condition) = delimited(ws(char('(')), expr, ws(char(')'))).parse(input)?;
    let (input, _) = keyword("then").parse(input)?;
    let (input, then_branch) = expr_single(input)?;
    let (input, _) = keyword("else").parse(input)?;
    let (input, else_branch) = expr_single(input)?;
    Ok((
        input,
        Expr::If {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        },
    ))
}

fn or_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(keyword("or"), and_expr)).parse(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |acc, right| Expr::Or(Box::new(acc), Box::new(right))),
    ))
}

fn and_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = comparison_expr(input)?;
    let (input, rest) = many0(preceded(keyword("and"), comparison_expr)).parse(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |acc, right| Expr::And(Box::new(acc), Box::new(right))),
    ))
}

#[derive(Clone)]
enum ComparisonKind {
    Value(ComparisonOp),
    General(ComparisonOp),
}

fn comparison_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = string_concat_expr(input)?;
    let (input, rest) = opt(pair(
        alt((
            value(ComparisonKind::Value(ComparisonOp::Eq), keyword("eq")),
            value(ComparisonKind::Value(ComparisonOp::Ne), keyword("ne")),
            value(ComparisonKind::Value(ComparisonOp::Le), keyword("le")),
            value(ComparisonKind::Value(ComparisonOp::Lt), keyword("lt")),
            value(ComparisonKind::Value(ComparisonOp::Ge), keyword("ge")),
            value(ComparisonKind::Value(ComparisonOp::Gt), keyword("gt")),
            value(ComparisonKind::General(ComparisonOp::Ne), ws(tag("!="))),
            value(ComparisonKind::General(ComparisonOp::Le), ws(tag("<="))),
            value(ComparisonKind::General(ComparisonOp::Ge), ws(tag(">="))),
            value(ComparisonKind::General(ComparisonOp::Eq), ws(char('='))),
            value(ComparisonKind::General(ComparisonOp::Lt), ws(char('<'))),
            value(ComparisonKind::General(ComparisonOp::Gt), ws(char('>'))),
        )),
        string_concat_expr,
    ))
    .parse(input)?;

    match rest {
        Some((ComparisonKind::Value(op), right)) => Ok((
            input,
            Expr::ValueComparison {
                op,
                left: Box::new(first),
                right: Box::new(right),
            },
        )),
        Some((ComparisonKind::General(op), right)) => Ok((
            input,
            Expr::GeneralComparison {
                op,
                left: Box::new(first),
                right: Box::new(right),
            },
        )),
        None => Ok((input, first)),
    }
}

fn string_concat_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = range_expr(input)?;
    let (input, rest) = many0(preceded(ws(tag("||")), range_expr)).parse(input)?;
    Ok((
        input,
        rest.into_iter().fold(first, |acc, right| {
            Expr::StringConcat(Box::new(acc), Box::new(right))
        }),
    ))
}

fn range_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = additive_expr(input)?;
    let (input, rest) = opt(preceded(keyword("to"), additive_expr)).parse(input)?;
    match rest {
        Some(end) => Ok((
            input,
            Expr::Range {
                start: Box::new(first),
                end: Box::new(end),
            },
        )),
        None => Ok((input, first)),
    }
}

fn additive_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = multiplicative_expr(input)?;
    let (input, rest) = many0(pair(
        ws(alt((
            value(ArithmeticOp::Add, char('+')),
            value(ArithmeticOp::Subtract, char('-')),
        ))),
        multiplicative_expr,
    ))
    .parse(input)?;
    Ok((input, fold_arithmetic(first, rest)))
}

fn multiplicative_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = union_expr(input)?;
    let (input, rest) = many0(pair(
        alt((
            value(ArithmeticOp::Multiply, ws(char('*'))),
            value(ArithmeticOp::IntegerDivide, keyword("idiv")),
            value(ArithmeticOp::Divide, keyword("div")),
            value(ArithmeticOp::Modulo, keyword("mod")),
        )),
        union_expr,
    ))
    .parse(input)?;
    Ok((input, fold_arithmetic(first, rest)))
}

fn fold_arithmetic(first: Expr, rest: Vec<(ArithmeticOp, Expr)>) -> Expr {
    rest.into_iter().fold(first, |acc, (op, right)| Expr::Arithmetic {
        op,
        left: Box::new(acc),
        right: Box::new(right),
    })
}

fn union_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = instanceof_expr(input)?;
    let (input, rest) = many0(preceded(
        alt((keyword("union"), ws(tag("|")))),
        instanceof_expr,
    ))
    .parse(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |acc, right| Expr::Union(Box::new(acc), Box::new(right))),
    ))
}

fn instanceof_expr(input: &str) -> IResult<&str, Expr> {
    let (input, expr) = treat_expr(input)?;
    let (input, decl) = opt(preceded(
        pair(keyword("instance"), keyword("of")),
        sequence_type,
    ))
    .parse(input)?;
    match decl {
        Some(sequence_type) => Ok((
            input,
            Expr::InstanceOf {
                expr: Box::new(expr),
                sequence_type,
            },
        )),
        None => Ok((input, expr)),
    }
}

fn treat_expr(input: &str) -> IResult<&str, Expr> {
    let (input, expr) = castable_expr(input)?;
    let (input, decl) = opt(preceded(
        pair(keyword("treat"), keyword("as")),
        sequence_type,
    ))
    .parse(input)?;
    match decl {
        Some(sequence_type) => Ok((
            input,
            Expr::TreatAs {
                expr: Box::new(expr),
                sequence_type,
            },
        )),
        None => Ok((input, expr)),
    }
}

fn castable_expr(input: &str) -> IResult<&str, Expr> {
    let (input, expr) = cast_expr(input)?;
    let (input, decl) = opt(preceded(
        pair(keyword("castable"), keyword("as")),
        single_type,
    ))
    .parse(input)?;
    match decl {
        Some(single_type) => Ok((
            input,
            Expr::CastableAs {
                expr: Box::new(expr),
                single_type,
            },
        )),
        None => Ok((input, expr)),
    }
}

fn cast_expr(input: &str) -> IResult<&str, Expr> {
    let (input, expr) = unary_expr(input)?;
    let (input, decl) =
        opt(preceded(pair(keyword("cast"), keyword("as")), single_type)).parse(input)?;
    match decl {
        Some(single_type) => Ok((
            input,
            Expr::CastAs {
                expr: Box::new(expr),
                single_type,
            },
        )),
        None => Ok((input, expr)),
    }
}

fn sequence_type(input: &str) -> IResult<&str, SequenceTypeDecl> {
    if let Ok((rest, _)) = tag::<_, _, nom::error::Error<&str>>("empty-sequence()").parse(input) {
        return Ok((rest, SequenceTypeDecl::Empty));
    }
    let (input, item_type) = item_type(input)?;
    let (input, occurrence) = opt(ws(alt((
        value(Occurrence::ZeroOrOne, char('?')),
        value(Occurrence::ZeroOrMore, char('*')),
        value(Occurrence::OneOrMore, char('+')),
    ))))
    .parse(input)?;
    Ok((
        input,
        SequenceTypeDecl::Typed {
            item_type,
            occurrence: occurrence.unwrap_or(Occurrence::ExactlyOne),
        },
    ))
}

fn item_type(input: &str) -> IResult<&str, ItemTypeDecl> {
    alt((
        value(ItemTypeDecl::AnyItem, tag("item()")),
        value(ItemTypeDecl::AnyAtomic, tag("atomic()")),
        value(ItemTypeDecl::AnyMap, alt((tag("map(*)"), tag("map()")))),
        value(ItemTypeDecl::AnyArray, alt((tag("array(*)"), tag("array()")))),
        value(
            ItemTypeDecl::AnyFunction,
            alt((tag("function(*)"), tag("function()"))),
        ),
        map(kind_test, ItemTypeDecl::Kind),
        map(qname, ItemTypeDecl::Named),
    ))
    .parse(input)
}

fn single_type(input: &str) -> IResult<&str, SingleTypeDecl> {
    let (input, type_name) = ws(qname).parse(input)?;
    let (input, optional) = opt(ws(char('?'))).parse(input)?;
    Ok((
        input,
        SingleTypeDecl {
            type_name,
            optional: optional.is_some(),
        },
    ))
}

fn unary_expr(input: &str) -> IResult<&str, Expr> {
    let (input, sign) = opt(ws(alt((char('-'), char('+'))))).parse(input)?;
    let (input, expr) = arrow_expr(input)?;
    match sign {
        Some('-') => Ok((input, Expr::Negate(Box::new(expr)))),
        _ => Ok((input, expr)),
    }
}

fn arrow_expr(input: &str) -> IResult<&str, Expr> {
    let (input, base) = simple_map_expr(input)?;
    let (input, steps) = many0(arrow_step).parse(input)?;
    if steps.is_empty() {
        Ok((input, base))
    } else {
        Ok((
            input,
            Expr::Arrow {
                base: Box::new(base),
                steps,
            },
        ))
    }
}

fn arrow_step(input: &str) -> IResult<&str, ArrowStep> {
    let (input, _) = ws(tag("=>")).parse(input)?;
    let (input, target) = alt((
        map(preceded(char('$'), var_name), ArrowTarget::Variable),
        map(
            delimited(ws(char('(')), expr_single, ws(char(')'))),
            |e| ArrowTarget::Parenthesized(Box::new(e)),
        ),
        map(qname, ArrowTarget::Named),
    ))
    .parse(input)?;
    let (input, args) = argument_list(input)?;
    Ok((input, ArrowStep { target, args }))
}

fn simple_map_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = path_expr(input)?;
    let (input, rest) = many0(preceded(
        // '!' must not be the head of '!='
        ws(nom::sequence::terminated(char('!'), peek(not(char('='))))),
        path_expr,
    ))
    .parse(input)?;
    Ok((
        input,
        rest.into_iter().fold(first, |acc, right| Expr::SimpleMap {
            base: Box::new(acc),
            mapping: Box::new(right),
        }),
    ))
}

fn path_expr(input: &str) -> IResult<&str, Expr> {
    // "//name" starts an absolute path that first descends through the
    // whole tree.
    if let Ok((rest, _)) = ws::<_, _, nom::error::Error<&str>>(tag("//")).parse(input) {
        let (rest, first) = path_step(rest)?;
        let (rest, mut steps) = many0(path_step_with_separator).parse(rest)?;
        let mut all = vec![
            Step {
                axis: Axis::DescendantOrSelf,
                test: NodeTest::Kind(KindTest::AnyNode),
                predicates: vec![],
            },
            first,
        ];
        all.append(&mut steps);
        return Ok((
            rest,
            Expr::Path {
                absolute: true,
                base: None,
                steps: all,
            },
        ));
    }

    // "/" on its own selects the document root; "/name/..." walks from it.
    if let Ok((rest, _)) = ws::<_, _, nom::error::Error<&str>>(char('/')).parse(input) {
        let (rest, first) = opt(path_step).parse(rest)?;
        return match first {
            Some(step) => {
                let (rest, mut steps) = many0(path_step_with_separator).parse(rest)?;
                let mut all = vec![step];
                all.append(&mut steps);
                Ok((
                    rest,
                    Expr::Path {
                        absolute: true,
                        base: None,
                        steps: all,
                    },
                ))
            }
            None => Ok((
                rest,
                Expr::Path {
                    absolute: true,
                    base: None,
                    steps: vec![],
                },
            )),
        };
    }

    relative_path_expr(input)
}

fn relative_path_expr(input: &str) -> IResult<&str, Expr> {
    let (input, head) = alt((map(path_step, PathHead::Step), map(postfix_expr, PathHead::Expr)))
        .parse(input)?;
    let (input, rest) = many0(path_step_with_separator).parse(input)?;

    let expr = match (head, rest.is_empty()) {
        (PathHead::Expr(base), true) => base,
        (PathHead::Expr(base), false) => Expr::Path {
            absolute: false,
            base: Some(Box::new(base)),
            steps: rest,
        },
        (PathHead::Step(step), _) => {
            let mut steps = vec![step];
            steps.extend(rest);
            Expr::Path {
                absolute: false,
                base: None,
                steps,
            }
        }
    };
    Ok((input, expr))
}

enum PathHead {
    Step(Step),
    Expr(Expr),
}

fn path_step_with_separator(input: &str) -> IResult<&str, Step> {
    if let Ok((rest, _)) = ws::<_, _, nom::error::Error<&str>>(tag("//")).parse(input) {
        let (rest, step) = path_step(rest)?;
        // Desugared as descendant with the step's own test.
        return Ok((
            rest,
            Step {
                axis: match step.axis {
                    Axis::Child => Axis::Descendant,
                    other => other,
                },
                test: step.test,
                predicates: step.predicates,
            },
        ));
    }
    let (input, _) = ws(char('/')).parse(input)?;
    path_step(input)
}

fn path_step(input: &str) -> IResult<&str, Step> {
    // ".." abbreviates parent::node()
    if let Ok((rest, _)) = ws::<_, _, nom::error::Error<&str>>(tag("..")).parse(input) {
        let (rest, predicates) = many0(predicate).parse(rest)?;
        return Ok((
            rest,
            Step {
                axis: Axis::Parent,
                test: NodeTest::Kind(KindTest::AnyNode),
                predicates,
            },
        ));
    }
    let (input, axis) = opt(axis_specifier).parse(input)?;
    let (input, test) = node_test(input)?;
    let (input, predicates) = many0(predicate).parse(input)?;
    Ok((
        input,
        Step {
            axis: axis.unwrap_or(Axis::Child),
            test,
            predicates,
        },
    ))
}

fn axis_specifier(input: &str) -> IResult<&str, Axis> {
    alt((
        value(Axis::Child, pair(tag("child"), tag("::"))),
        value(Axis::SelfAxis, pair(tag("self"), tag("::"))),
        value(Axis::Parent, pair(tag("parent"), tag("::"))),
        value(Axis::AncestorOrSelf, pair(tag("ancestor-or-self"), tag("::"))),
        value(Axis::Ancestor, pair(tag("ancestor"), tag("::"))),
        value(
            Axis::DescendantOrSelf,
            pair(tag("descendant-or-self"), tag("::")),
        ),
        value(Axis::Descendant, pair(tag("descendant"), tag("::"))),
        value(
            Axis::FollowingSibling,
            pair(tag("following-sibling"), tag("::")),
        ),
        value(Axis::Following, pair(tag("following"), tag("::"))),
        value(
            Axis::PrecedingSibling,
            pair(tag("preceding-sibling"), tag("::")),
        ),
        value(Axis::Preceding, pair(tag("preceding"), tag("::"))),
        value(Axis::Flag, pair(tag("flag"), tag("::"))),
        value(Axis::Flag, char('@')),
    ))
    .parse(input)
}

fn node_test(input: &str) -> IResult<&str, NodeTest> {
    alt((
        map(kind_test, NodeTest::Kind),
        map(char('*'), |_| NodeTest::Wildcard),
        map(name_test, NodeTest::Name),
    ))
    .parse(input)
}

/// A name test: a qname not followed by `(` (which would make it a function
/// call), `#` (a named function reference), or `{` (a map/array/function
/// body).
fn name_test(input: &str) -> IResult<&str, QName> {
    let (rest, name) = qname(input)?;
    if let Ok((_, _)) = peek(ws::<_, _, nom::error::Error<&str>>(alt((
        char('('),
        char('#'),
        char('{'),
    ))))
    .parse(rest)
    {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }
    Ok((rest, name))
}

fn kind_test(input: &str) -> IResult<&str, KindTest> {
    alt((
        value(KindTest::AnyNode, pair(tag("node"), pair(ws(char('(')), char(')')))),
        value(
            KindTest::Document,
            pair(tag("document-node"), pair(ws(char('(')), char(')'))),
        ),
        named_kind_test("assembly", |name, type_name| KindTest::Assembly {
            name,
            type_name,
        }),
        named_kind_test("field", |name, type_name| KindTest::Field { name, type_name }),
        named_kind_test("flag", |name, type_name| KindTest::Flag { name, type_name }),
    ))
    .parse(input)
}

/// `assembly()`, `assembly(name)`, `assembly(*, type)`, `assembly(name, type)`.
fn named_kind_test<'a>(
    kw: &'static str,
    build: fn(Option<QName>, Option<QName>) -> KindTest,
) -> impl Parser<&'a str, Output = KindTest, Error = nom::error::Error<&'a str>> {
    map(
        preceded(
            pair(tag(kw), ws(char('('))),
            nom::sequence::terminated(
                opt(pair(
                    alt((value(None, ws(char('*'))), map(ws(qname), Some))),
                    opt(preceded(ws(char(',')), ws(qname))),
                )),
                ws(char(')')),
            ),
        ),
        move |args| match args {
            None => build(None, None),
            Some((name, type_name)) => build(name, type_name),
        },
    )
}

fn predicate(input: &str) -> IResult<&str, Expr> {
    delimited(ws(char('[')), expr, ws(char(']'))).parse(input)
}

fn postfix_expr(input: &str) -> IResult<&str, Expr> {
    let (input, base) = primary_expr(input)?;
    let (input, postfixes) = many0(alt((
        map(predicate, PostfixOp::Predicate),
        map(argument_list, PostfixOp::ArgumentList),
        map(lookup, PostfixOp::Lookup),
    )))
    .parse(input)?;

    let mut result = base;
    for postfix in postfixes {
        result = match postfix {
            PostfixOp::Predicate(pred) => match result {
                Expr::Filter {
                    base,
                    mut predicates,
                } => {
                    predicates.push(pred);
                    Expr::Filter { base, predicates }
                }
                other => Expr::Filter {
                    base: Box::new(other),
                    predicates: vec![pred],
                },
            },
            PostfixOp::ArgumentList(args) => Expr::DynamicCall {
                base: Box::new(result),
                args,
            },
            PostfixOp::Lookup(key) => Expr::Lookup {
                base: Box::new(result),
                key,
            },
        };
    }
    Ok((input, result))
}

enum PostfixOp {
    Predicate(Expr),
    ArgumentList(Vec<Expr>),
    Lookup(LookupKey),
}

fn argument_list(input: &str) -> IResult<&str, Vec<Expr>> {
    delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), argument),
        ws(char(')')),
    )
    .parse(input)
}

fn argument(input: &str) -> IResult<&str, Expr> {
    alt((
        value(
            Expr::ArgumentPlaceholder,
            // a bare '?': not a lookup key
            ws(nom::sequence::terminated(
                char('?'),
                peek(alt((ws(char(',')), ws(char(')'))))),
            )),
        ),
        expr_single,
    ))
    .parse(input)
}

fn lookup(input: &str) -> IResult<&str, LookupKey> {
    preceded(ws(char('?')), key_specifier).parse(input)
}

fn key_specifier(input: &str) -> IResult<&str, LookupKey> {
    alt((
        value(LookupKey::Wildcard, char('*')),
        map(integer_literal, LookupKey::Integer),
        map(nc_name, |s| LookupKey::Name(s.to_string())),
        map(delimited(ws(char('(')), expr, ws(char(')'))), |e| {
            LookupKey::Parenthesized(Box::new(e))
        }),
    ))
    .parse(input)
}

fn primary_expr(input: &str) -> IResult<&str, Expr> {
    ws(alt((
        map_constructor,
        curly_array_constructor,
        square_array_constructor,
        inline_function,
        named_function_ref,
        function_call,
        variable_reference,
        context_item_expr,
        parenthesized_expr,
        literal,
        unary_lookup,
    )))
    .parse(input)
}

fn literal(input: &str) -> IResult<&str, Expr> {
    alt((
        map(string_literal, |s| Expr::Literal(Literal::String(s))),
        decimal_literal,
        integer_literal_expr,
    ))
    .parse(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    alt((
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
    ))
    .map(|s: &str| s.to_string())
    .parse(input)
}

fn integer_literal(input: &str) -> IResult<&str, i64> {
    map_res(digit1, |s: &str| s.parse::<i64>()).parse(input)
}

fn integer_literal_expr(input: &str) -> IResult<&str, Expr> {
    map(integer_literal, |i| Expr::Literal(Literal::Integer(i))).parse(input)
}

fn decimal_literal(input: &str) -> IResult<&str, Expr> {
    let (input, s) = recognize((opt(digit1), char('.'), digit1)).parse(input)?;
    Ok((input, Expr::Literal(Literal::Decimal(s.to_string()))))
}

fn variable_reference(input: &str) -> IResult<&str, Expr> {
    map(preceded(char('$'), var_name), Expr::Variable).parse(input)
}

fn var_name(input: &str) -> IResult<&str, String> {
    map(qname_str, |s| s.to_string()).parse(input)
}

fn context_item_expr(input: &str) -> IResult<&str, Expr> {
    let (input, _) = char('.').parse(input)?;
    if let Some(c) = input.chars().next()
        && (c.is_alphanumeric() || c == '_' || c == '.')
    {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }
    Ok((input, Expr::ContextItem))
}

fn parenthesized_expr(input: &str) -> IResult<&str, Expr> {
    let (input, items) = delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), expr_single),
        ws(char(')')),
    )
    .parse(input)?;
    let expr = match &items[..] {
        [] => Expr::Sequence(vec![]),
        [single] => single.clone(),
        _ => Expr::Sequence(items),
    };
    Ok((input, expr))
}

fn map_constructor(input: &str) -> IResult<&str, Expr> {
    let (input, _) = tag("map").parse(input)?;
    let (input, entries) = delimited(
        ws(char('{')),
        separated_list0(ws(char(',')), map_entry),
        ws(char('}')),
    )
    .parse(input)?;
    Ok((input, Expr::MapConstructor(entries)))
}

fn map_entry(input: &str) -> IResult<&str, (Expr, Expr)> {
    let (input, key) = expr_single(input)?;
    let (input, _) = ws(char(':')).parse(input)?;
    let (input, value) = expr_single(input)?;
    Ok((input, (key, value)))
}

fn square_array_constructor(input: &str) -> IResult<&str, Expr> {
    let (input, members) = delimited(
        ws(char('[')),
        separated_list0(ws(char(',')), expr_single),
        ws(char(']')),
    )
    .parse(input)?;
    Ok((input, Expr::SquareArray(members)))
}

fn curly_array_constructor(input: &str) -> IResult<&str, Expr> {
    let (input, _) = tag("array").parse(input)?;
    let (input, enclosed) = delimited(ws(char('{')), expr, ws(char('}'))).parse(input)?;
    Ok((input, Expr::CurlyArray(Box::new(enclosed))))
}

fn inline_function(input: &str) -> IResult<&str, Expr> {
    let (input, _) = tag("function").parse(input)?;
    let (input, params) = delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), param),
        ws(char(')')),
    )
    .parse(input)?;
    let (input, return_type) = opt(preceded(keyword("as"), sequence_type)).parse(input)?;
    let (input, body) = delimited(ws(char('{')), expr, ws(char('}'))).parse(input)?;
    Ok((
        input,
        Expr::InlineFunction {
            params,
            return_type,
            body: Box::new(body),
        },
    ))
}

fn param(input: &str) -> IResult<&str, Param> {
    let (input, _) = ws(char('$')).parse(input)?;
    let (input, name) = var_name(input)?;
    let (input, type_decl) = opt(preceded(keyword("as"), sequence_type)).parse(input)?;
    Ok((input, Param { name, type_decl }))
}

const RESERVED_FUNCTION_NAMES: [&str; 13] = [
    "if",
    "for",
    "let",
    "some",
    "every",
    "function",
    "map",
    "array",
    "node",
    "document-node",
    "assembly",
    "field",
    "flag",
];

fn function_call(input: &str) -> IResult<&str, Expr> {
    let (rest, name) = qname(input)?;
    let (rest, _) = peek(ws(char('('))).parse(rest)?;
    if name.prefix.is_none() && RESERVED_FUNCTION_NAMES.contains(&name.local.as_str()) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }
    let (rest, args) = argument_list(rest)?;
    Ok((rest, Expr::FunctionCall { name, args }))
}

fn named_function_ref(input: &str) -> IResult<&str, Expr> {
    let (input, name) = qname(input)?;
    let (input, _) = char('#').parse(input)?;
    let (input, arity) = integer_literal(input)?;
    Ok((
        input,
        Expr::NamedFunctionRef {
            name,
            arity: arity as usize,
        },
    ))
}

fn unary_lookup(input: &str) -> IResult<&str, Expr> {
    map(preceded(char('?'), key_specifier), Expr::UnaryLookup).parse(input)
}

fn qname(input: &str) -> IResult<&str, QName> {
    let (input, first) = nc_name(input)?;
    let (input, second) = opt(preceded(char(':'), nc_name)).parse(input)?;
    match second {
        Some(local) => Ok((
            input,
            QName {
                prefix: Some(first.to_string()),
                local: local.to_string(),
            },
        )),
        None => Ok((
            input,
            QName {
                prefix: None,
                local: first.to_string(),
            },
        )),
    }
}

fn qname_str(input: &str) -> IResult<&str, &str> {
    recognize(pair(nc_name, opt(pair(char(':'), nc_name)))).parse(input)
}

fn nc_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '-'),
    ))
    .parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literals() {
        assert!(matches!(
            parse_expression("42").unwrap(),
            Expr::Literal(Literal::Integer(42))
        ));
        assert!(matches!(
            parse_expression("'hello'").unwrap(),
            Expr::Literal(Literal::String(s)) if s == "hello"
        ));
        assert!(matches!(
            parse_expression("3.14").unwrap(),
            Expr::Literal(Literal::Decimal(s)) if s == "3.14"
        ));
    }

    #[test]
    fn test_parse_path_with_flag_abbreviation() {
        let expr = parse_expression("/catalog/product/@sku").unwrap();
        let Expr::Path {
            absolute, steps, ..
        } = expr
        else {
            panic!("expected a path");
        };
        assert!(absolute);
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[2].axis, Axis::Flag);
    }

    #[test]
    fn test_parse_parent_abbreviation() {
        let expr = parse_expression("../field2").unwrap();
        let Expr::Path { steps, .. } = expr else {
            panic!("expected a path");
        };
        assert_eq!(steps[0].axis, Axis::Parent);
        assert_eq!(steps[1].axis, Axis::Child);
    }

    #[test]
    fn test_parse_kind_tests() {
        let expr = parse_expression("descendant::assembly(part)[1]").unwrap();
        let Expr::Path { steps, .. } = expr else {
            panic!("expected a path");
        };
        assert_eq!(steps[0].axis, Axis::Descendant);
        assert!(matches!(
            &steps[0].test,
            NodeTest::Kind(KindTest::Assembly { name: Some(n), type_name: None }) if n.local == "part"
        ));
        assert_eq!(steps[0].predicates.len(), 1);

        let expr = parse_expression("self::field(*, decimal)").unwrap();
        let Expr::Path { steps, .. } = expr else {
            panic!("expected a path");
        };
        assert!(matches!(
            &steps[0].test,
            NodeTest::Kind(KindTest::Field { name: None, type_name: Some(t) }) if t.local == "decimal"
        ));
    }

    #[test]
    fn test_keyword_operators_need_boundaries() {
        // "divisor" is a name, not "div" followed by "isor"
        let expr = parse_expression("$a div $b").unwrap();
        assert!(matches!(
            expr,
            Expr::Arithmetic {
                op: ArithmeticOp::Divide,
                ..
            }
        ));
        let expr = parse_expression("divisor").unwrap();
        assert!(matches!(expr, Expr::Path { .. }));
    }

    #[test]
    fn test_value_and_general_comparisons() {
        assert!(matches!(
            parse_expression("1 eq 2").unwrap(),
            Expr::ValueComparison {
                op: ComparisonOp::Eq,
                ..
            }
        ));
        assert!(matches!(
            parse_expression("1 = 2").unwrap(),
            Expr::GeneralComparison {
                op: ComparisonOp::Eq,
                ..
            }
        ));
        assert!(matches!(
            parse_expression("1 <= 2").unwrap(),
            Expr::GeneralComparison {
                op: ComparisonOp::Le,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_arrow_chain() {
        let expr = parse_expression("'1' => concat('2') => concat('3')").unwrap();
        let Expr::Arrow { steps, .. } = expr else {
            panic!("expected an arrow expression");
        };
        assert_eq!(steps.len(), 2);
    }

    #[test]
    fn test_parse_simple_map() {
        let expr = parse_expression("(1,2,1) ! '*'").unwrap();
        assert!(matches!(expr, Expr::SimpleMap { .. }));
        // '!' must not swallow '!='
        assert!(matches!(
            parse_expression("1 != 2").unwrap(),
            Expr::GeneralComparison { .. }
        ));
    }

    #[test]
    fn test_parse_quantified() {
        let expr = parse_expression("some $x in (1,2,3) satisfies $x > 2").unwrap();
        assert!(matches!(
            expr,
            Expr::Quantified {
                quantifier: Quantifier::Some,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_inline_function() {
        let expr = parse_expression("function($a, $b) { $a + $b }").unwrap();
        let Expr::InlineFunction { params, .. } = expr else {
            panic!("expected an inline function");
        };
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_parse_map_and_array_constructors() {
        assert!(matches!(
            parse_expression("map { 'a': 1, 'b': 2 }").unwrap(),
            Expr::MapConstructor(entries) if entries.len() == 2
        ));
        assert!(matches!(
            parse_expression("[1, 2, 3]").unwrap(),
            Expr::SquareArray(members) if members.len() == 3
        ));
        assert!(matches!(
            parse_expression("array { 1 to 3 }").unwrap(),
            Expr::CurlyArray(_)
        ));
    }

    #[test]
    fn test_parse_lookup_and_placeholder() {
        assert!(matches!(
            parse_expression("$m?key").unwrap(),
            Expr::Lookup {
                key: LookupKey::Name(k),
                ..
            } if k == "key"
        ));
        let expr = parse_expression("concat('a', ?)").unwrap();
        let Expr::FunctionCall { args, .. } = expr else {
            panic!("expected a call");
        };
        assert!(matches!(args[1], Expr::ArgumentPlaceholder));
    }

    #[test]
    fn test_parse_named_function_ref_and_dynamic_call() {
        assert!(matches!(
            parse_expression("concat#2").unwrap(),
            Expr::NamedFunctionRef { arity: 2, .. }
        ));
        assert!(matches!(
            parse_expression("$f(1, 2)").unwrap(),
            Expr::DynamicCall { .. }
        ));
    }

    #[test]
    fn test_parse_path_from_function_result() {
        let expr = parse_expression("doc('x')/catalog/product").unwrap();
        let Expr::Path { base, steps, .. } = expr else {
            panic!("expected a rooted path");
        };
        assert!(matches!(base.as_deref(), Some(Expr::FunctionCall { .. })));
        assert_eq!(steps.len(), 2);
    }

    #[test]
    fn test_parse_cast_and_instance() {
        assert!(matches!(
            parse_expression("'123' cast as integer").unwrap(),
            Expr::CastAs { .. }
        ));
        assert!(matches!(
            parse_expression("$x instance of field()*").unwrap(),
            Expr::InstanceOf { .. }
        ));
        assert!(matches!(
            parse_expression("$x treat as assembly(part)").unwrap(),
            Expr::TreatAs { .. }
        ));
    }

    #[test]
    fn test_unparsed_trailing_input_is_an_error() {
        assert!(parse_expression("1 + ").is_err());
        assert!(parse_expression("if (1) then 2").is_err());
    }
}
