//! End-to-end compile-and-evaluate tests over the sample catalog tree.

use metapath::{DynamicContext, Item, MetapathError, Sequence, StaticContext, compile};
use metapath_model::node::tests::sample_catalog;
use metapath_model::{AtomicValue, DocumentTree, ModelNode, TreeNode};
use std::sync::Arc;

fn eval<'a>(
    source: &str,
    tree: &'a DocumentTree,
) -> Result<Sequence<TreeNode<'a>>, MetapathError> {
    let static_ctx = Arc::new(StaticContext::new());
    let expr = compile(source, &static_ctx)?;
    let ctx = DynamicContext::new(static_ctx);
    expr.evaluate(Some(Item::Node(tree.root())), &ctx)
}

fn eval_at<'a>(
    source: &str,
    node: TreeNode<'a>,
) -> Result<Sequence<TreeNode<'a>>, MetapathError> {
    let static_ctx = Arc::new(StaticContext::new());
    let expr = compile(source, &static_ctx)?;
    let ctx = DynamicContext::new(static_ctx);
    expr.evaluate(Some(Item::Node(node)), &ctx)
}

fn strings(seq: &Sequence<TreeNode>) -> Vec<String> {
    seq.items().iter().map(|i| i.string_value()).collect()
}

#[test]
fn numeric_addition_commutes_and_has_identity() {
    let tree = sample_catalog();
    assert_eq!(eval("1 + 0", &tree).unwrap(), Sequence::from_integer(1));
    assert_eq!(eval("0 + 1", &tree).unwrap(), Sequence::from_integer(1));
    assert_eq!(eval("2 + 3", &tree).unwrap(), eval("3 + 2", &tree).unwrap());
}

#[test]
fn quantified_expressions_short_circuit_to_booleans() {
    let tree = sample_catalog();
    assert_eq!(
        eval("some $x in (1,2,3) satisfies $x > 2", &tree).unwrap(),
        Sequence::from_bool(true)
    );
    assert_eq!(
        eval("every $x in (1,2,3) satisfies $x > 2", &tree).unwrap(),
        Sequence::from_bool(false)
    );
}

#[test]
fn arrow_chain_threads_the_first_argument() {
    let tree = sample_catalog();
    let r = eval("'1' => concat('2') => concat('3')", &tree).unwrap();
    assert_eq!(strings(&r), ["123"]);
}

#[test]
fn simple_map_evaluates_once_per_item() {
    let tree = sample_catalog();
    let r = eval("(1,2,1) ! '*'", &tree).unwrap();
    assert_eq!(strings(&r), ["*", "*", "*"]);
}

#[test]
fn parent_axis_reaches_siblings() {
    let tree = sample_catalog();
    let name = eval("/catalog/vendor/name", &tree).unwrap();
    let node = *name.items()[0].as_node().unwrap();
    let r = eval_at("../rating", node).unwrap();
    assert_eq!(strings(&r), ["4"]);
}

#[test]
fn casts_follow_lexical_forms() {
    let tree = sample_catalog();
    assert_eq!(
        eval("'1234567' cast as integer", &tree).unwrap(),
        Sequence::from_integer(1234567)
    );
    assert_eq!(
        eval("'ABCD0' cast as boolean", &tree).unwrap(),
        Sequence::from_bool(false)
    );
    assert_eq!(
        eval("'true' cast as boolean", &tree).unwrap(),
        Sequence::from_bool(true)
    );
    assert_eq!(
        eval("'1' cast as boolean", &tree).unwrap(),
        Sequence::from_bool(true)
    );
}

#[test]
fn temporal_arithmetic_dispatches_by_operand_types() {
    let tree = sample_catalog();
    let r = eval(
        "('2025-01-03' cast as date) - ('2025-01-01' cast as date)",
        &tree,
    )
    .unwrap();
    assert_eq!(strings(&r), ["P2D"]);
    let r = eval(
        "('2024-03-15' cast as date) - ('P1M' cast as year-month-duration)",
        &tree,
    )
    .unwrap();
    assert_eq!(strings(&r), ["2024-02-15"]);
    let err = eval(
        "('P1Y' cast as year-month-duration) - ('P1D' cast as day-time-duration)",
        &tree,
    )
    .unwrap_err();
    assert_eq!(err.code(), "FORG0006");
}

#[test]
fn ancestors_and_descendants_are_mutual_inverses() {
    let tree = sample_catalog();
    let catalog_seq = eval("/catalog", &tree).unwrap();
    let catalog = *catalog_seq.items()[0].as_node().unwrap();
    let descendants = eval_at("descendant::*", catalog).unwrap();
    assert!(!descendants.is_empty());
    for item in descendants.items() {
        let node = *item.as_node().unwrap();
        let ancestors = eval_at("ancestor::*", node).unwrap();
        assert!(
            ancestors.items().iter().any(|a| a.as_node() == Some(&catalog)),
            "catalog missing from ancestors of {:?}",
            node.name()
        );
    }
}

#[test]
fn sibling_axes_partition_the_siblings() {
    let tree = sample_catalog();
    let product = eval("/catalog/product[1]", &tree).unwrap();
    let product = *product.items()[0].as_node().unwrap();
    let following = eval_at("following-sibling::*", product).unwrap();
    let preceding = eval_at("preceding-sibling::*", product).unwrap();
    let all = eval_at("../*", product).unwrap();
    assert_eq!(following.len() + preceding.len() + 1, all.len());
    assert_eq!(preceding.len(), 1);
    assert_eq!(
        preceding.items()[0].as_node().unwrap().name(),
        Some(metapath_model::Name::local_only("vendor"))
    );
    let mut recombined: Vec<_> = preceding
        .items()
        .iter()
        .chain(std::iter::once(&Item::Node(product)))
        .chain(following.items())
        .cloned()
        .collect();
    let mut expected: Vec<_> = all.items().to_vec();
    recombined.sort_by(|a, b| a.as_node().unwrap().cmp(b.as_node().unwrap()));
    expected.sort_by(|a, b| a.as_node().unwrap().cmp(b.as_node().unwrap()));
    assert_eq!(recombined, expected);
}

#[test]
fn positional_and_boolean_predicates() {
    let tree = sample_catalog();
    let r = eval("/catalog/product[2]/name", &tree).unwrap();
    assert_eq!(strings(&r), ["Gadget"]);
    let r = eval("/catalog/product[price gt 100]/@sku", &tree).unwrap();
    assert_eq!(strings(&r), ["B-200"]);
    let r = eval("/catalog/product[last()]/name", &tree).unwrap();
    assert_eq!(strings(&r), ["Gadget"]);
}

#[test]
fn union_is_document_ordered_and_deduplicated() {
    let tree = sample_catalog();
    let r = eval("/catalog/product/name | /catalog/vendor | /catalog/vendor", &tree).unwrap();
    assert_eq!(r.len(), 3);
    // vendor precedes both product names in document order
    let first = r.items()[0].as_node().unwrap();
    assert_eq!(first.name(), Some(metapath_model::Name::local_only("vendor")));
}

#[test]
fn double_slash_walks_all_descendants() {
    let tree = sample_catalog();
    let r = eval("//name", &tree).unwrap();
    assert_eq!(r.len(), 5);
    let r = eval("count(//part)", &tree).unwrap();
    assert_eq!(r, Sequence::from_integer(3));
    // the cycle back-edge contributes no new names
    let r = eval("count(distinct-values(//part/name))", &tree).unwrap();
    assert_eq!(r, Sequence::from_integer(2));
}

#[test]
fn ranges_for_let_and_conditionals() {
    let tree = sample_catalog();
    assert_eq!(eval("sum(1 to 4)", &tree).unwrap(), Sequence::from_integer(10));
    let r = eval("for $x in (1,2), $y in (10,20) return $x * $y", &tree).unwrap();
    assert_eq!(strings(&r), ["10", "20", "20", "40"]);
    assert_eq!(
        eval("let $x := 5 return $x * $x", &tree).unwrap(),
        Sequence::from_integer(25)
    );
    let r = eval("if (empty(())) then 'y' else 'n'", &tree).unwrap();
    assert_eq!(strings(&r), ["y"]);
}

#[test]
fn inline_functions_close_over_their_environment() {
    let tree = sample_catalog();
    assert_eq!(
        eval("let $f := function($x) { $x + 1 } return $f(2)", &tree).unwrap(),
        Sequence::from_integer(3)
    );
    assert_eq!(
        eval(
            "let $n := 10 return (let $f := function($x) { $x + $n } return $f(5))",
            &tree
        )
        .unwrap(),
        Sequence::from_integer(15)
    );
    let r = eval("for-each((1,2,3), function($x) { $x * 2 })", &tree).unwrap();
    assert_eq!(strings(&r), ["2", "4", "6"]);
}

#[test]
fn partial_application_with_placeholders() {
    let tree = sample_catalog();
    assert_eq!(
        eval(
            "let $add := function($a, $b) { $a + $b } return $add(1, ?)(5)",
            &tree
        )
        .unwrap(),
        Sequence::from_integer(6)
    );
    assert_eq!(
        eval("let $u := upper-case#1 return $u('ok')", &tree).unwrap(),
        Sequence::from_string("OK")
    );
}

#[test]
fn maps_and_arrays_are_first_class() {
    let tree = sample_catalog();
    assert_eq!(
        eval("map {'a': 1, 'b': 2}?b", &tree).unwrap(),
        Sequence::from_integer(2)
    );
    assert_eq!(eval("[1, 2, 3](2)", &tree).unwrap(), Sequence::from_integer(2));
    let r = eval("array:flatten([1, [2, 3]])", &tree).unwrap();
    assert_eq!(r.len(), 3);
    assert_eq!(
        eval("map:get(map:put(map {}, 'k', 7), 'k')", &tree).unwrap(),
        Sequence::from_integer(7)
    );
    let err = eval("[1, 2, 3](9)", &tree).unwrap_err();
    assert_eq!(err.code(), "FOAY0001");
}

#[test]
fn type_tests_and_treat() {
    let tree = sample_catalog();
    assert_eq!(
        eval("5 instance of integer", &tree).unwrap(),
        Sequence::from_bool(true)
    );
    assert_eq!(
        eval("5 instance of decimal", &tree).unwrap(),
        Sequence::from_bool(true)
    );
    assert_eq!(
        eval("'x' castable as integer", &tree).unwrap(),
        Sequence::from_bool(false)
    );
    assert_eq!(
        eval("() castable as integer?", &tree).unwrap(),
        Sequence::from_bool(true)
    );
    let err = eval("(1, 2) treat as integer", &tree).unwrap_err();
    assert_eq!(err.code(), "XPTY0004");
    assert_eq!(
        eval("/catalog/product[1] instance of assembly(product)", &tree).unwrap(),
        Sequence::from_bool(true)
    );
}

#[test]
fn string_library_round_trip() {
    let tree = sample_catalog();
    let r = eval("string-join(('a', 'b', 'c'), '-')", &tree).unwrap();
    assert_eq!(strings(&r), ["a-b-c"]);
    let r = eval("normalize-space('  a  b ')", &tree).unwrap();
    assert_eq!(strings(&r), ["a b"]);
    let r = eval("'x' || 1 || ()", &tree).unwrap();
    assert_eq!(strings(&r), ["x1"]);
    let r = eval("upper-case(/catalog/vendor/name)", &tree).unwrap();
    assert_eq!(strings(&r), ["INITECH"]);
}

#[test]
fn documents_resolve_through_the_registry() {
    let tree = sample_catalog();
    let static_ctx = Arc::new(StaticContext::new());
    let expr = compile("doc('https://example.com/catalog')/catalog/vendor/name", &static_ctx)
        .unwrap();
    let mut ctx: DynamicContext<TreeNode> = DynamicContext::new(static_ctx);
    ctx.register_document("https://example.com/catalog", tree.root());
    let r = expr.evaluate(None, &ctx).unwrap();
    assert_eq!(r.string_value(), "Initech");
    let missing = compile("doc('nope')", ctx.static_context())
        .unwrap()
        .evaluate(None, &ctx)
        .unwrap_err();
    assert_eq!(missing.code(), "FOER0000");
}

#[test]
fn closures_read_the_invoking_context() {
    // a closure captures variables, not the dynamic context: the clock it
    // reports is the one of the context it is invoked under
    let static_ctx = Arc::new(StaticContext::new());
    let expr = compile("(function() { current-dateTime() })()", &static_ctx).unwrap();
    let pinned = metapath_model::DateTime::from_epoch_seconds(0.0);
    let ctx: DynamicContext<TreeNode> =
        DynamicContext::new(static_ctx).with_current_date_time(pinned);
    let r = expr.evaluate(None, &ctx).unwrap();
    assert_eq!(r.string_value(), pinned.to_string());
}

#[test]
fn dynamic_errors_carry_stable_codes() {
    let tree = sample_catalog();
    assert_eq!(eval("$missing", &tree).unwrap_err().code(), "XPST0008");
    assert_eq!(eval("1 div 0", &tree).unwrap_err().code(), "FOAR0001");
    assert_eq!(
        eval("'a' cast as date", &tree).unwrap_err().code(),
        "FOCA0002"
    );
    let static_ctx = Arc::new(StaticContext::new());
    let expr = compile("name()", &static_ctx).unwrap();
    let ctx: DynamicContext<TreeNode> = DynamicContext::new(static_ctx);
    assert_eq!(
        expr.evaluate(None, &ctx).unwrap_err().code(),
        "XPDY0002"
    );
}

#[test]
fn flags_atomize_to_their_typed_values() {
    let tree = sample_catalog();
    let r = eval("/catalog/@version", &tree).unwrap();
    assert_eq!(r.len(), 1);
    let r = eval("data(/catalog/product[1]/@sku)", &tree).unwrap();
    assert_eq!(
        r.items()[0],
        Item::Atomic(AtomicValue::String("A-100".to_string()))
    );
    let r = eval("base-uri(/catalog/product[1])", &tree).unwrap();
    assert_eq!(r.string_value(), "https://example.com/catalog");
}
