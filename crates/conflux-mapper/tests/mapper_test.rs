//! Integration tests for the complete mapping pipeline
//!
//! Tests drive compiled mappers end to end over real scopes to verify:
//! - Expression field mapping and templates
//! - Foreach iteration with aliases, filters, and whole-element assigns
//! - Conditional and if/else branch selection
//! - Variable declarations
//! - Error propagation and relaxed-mapping degradation

use conflux_core::scope::SimpleScope;
use conflux_core::settings::EngineSettings;
use conflux_expr::ExprFactory;
use conflux_mapper::{Error, MapperFactory};
use rstest::rstest;
use serde_json::{json, Value};

fn scope_of(bindings: Value) -> SimpleScope {
    let map = bindings.as_object().expect("test bindings are objects");
    SimpleScope::from_iter(map.iter().map(|(k, v)| (k.clone(), v.clone())))
}

fn apply(spec: Value, bindings: Value) -> conflux_mapper::Result<Value> {
    let factory = MapperFactory::new(ExprFactory::new());
    let mapper = factory.new_mapper(&spec)?;
    mapper.apply(&scope_of(bindings))
}

// =============================================================================
// Expression and template fields
// =============================================================================

#[test]
fn test_expression_field_mapping() {
    let out = apply(
        json!({"full": "=$.first + \" \" + $.last"}),
        json!({"first": "A", "last": "B"}),
    )
    .unwrap();
    assert_eq!(out, json!({"full": "A B"}));
}

#[test]
fn test_literal_fields_pass_through_verbatim() {
    let out = apply(
        json!({"kind": "order", "count": 3, "nested": {"tag": "x"}}),
        json!({}),
    )
    .unwrap();
    assert_eq!(out, json!({"kind": "order", "count": 3, "nested": {"tag": "x"}}));
}

#[test]
fn test_template_field() {
    let out = apply(
        json!({"summary": "={{$.n}} items for {{$.who}}"}),
        json!({"n": 2, "who": "Ada"}),
    )
    .unwrap();
    assert_eq!(out, json!({"summary": "2 items for Ada"}));
}

#[test]
fn test_array_spec_maps_each_element() {
    let out = apply(
        json!(["=1+1", "literal", {"v": "=$.x"}]),
        json!({"x": 9}),
    )
    .unwrap();
    assert_eq!(out, json!([2, "literal", {"v": 9}]));
}

// =============================================================================
// Foreach
// =============================================================================

#[test]
fn test_foreach_with_alias() {
    let out = apply(
        json!({"@foreach($.items,\"it\")": {"v": "=$loop.it.x"}}),
        json!({"items": [{"x": 1}, {"x": 2}]}),
    )
    .unwrap();
    assert_eq!(out, json!([{"v": 1}, {"v": 2}]));
}

#[test]
fn test_foreach_filter_skips_elements() {
    let out = apply(
        json!({"@foreach($.items,\"it\",$loop.it.x > 1)": {"v": "=$loop.it.x"}}),
        json!({"items": [{"x": 1}, {"x": 2}]}),
    )
    .unwrap();
    assert_eq!(out, json!([{"v": 2}]));
}

#[test]
fn test_foreach_without_alias_reads_element_fields() {
    let out = apply(
        json!({"@foreach($.items)": {"v": "=$loop.x", "pos": "=$loop.index"}}),
        json!({"items": [{"x": "a"}, {"x": "b"}]}),
    )
    .unwrap();
    assert_eq!(out, json!([{"v": "a", "pos": 0}, {"v": "b", "pos": 1}]));
}

#[test]
fn test_foreach_whole_element_assign() {
    let out = apply(
        json!({"@foreach($.items)": {"=": "=$loop"}}),
        json!({"items": [1, "two", {"x": 3}]}),
    )
    .unwrap();
    assert_eq!(out, json!([1, "two", {"x": 3}]));
}

#[test]
fn test_foreach_assign_merges_extra_fields() {
    let out = apply(
        json!({"@foreach($.items)": {"=": "=$loop", "extra": "=$loop.x * 10"}}),
        json!({"items": [{"x": 1}, {"x": 2}]}),
    )
    .unwrap();
    assert_eq!(out, json!([{"x": 1, "extra": 10}, {"x": 2, "extra": 20}]));
}

#[test]
fn test_foreach_newarray_synthesizes_one_element() {
    let out = apply(
        json!({"@foreach(NEWARRAY)": {"seeded": "=true"}}),
        json!({}),
    )
    .unwrap();
    assert_eq!(out, json!([{"seeded": true}]));
}

#[test]
fn test_foreach_coerces_scalar_source() {
    let out = apply(
        json!({"@foreach($.single)": {"v": "=$loop.x"}}),
        json!({"single": {"x": 5}}),
    )
    .unwrap();
    assert_eq!(out, json!([{"v": 5}]));
}

#[test]
fn test_foreach_parses_json_string_source() {
    let out = apply(
        json!({"@foreach($.encoded)": {"v": "=$loop.x"}}),
        json!({"encoded": "[{\"x\": 7}]"}),
    )
    .unwrap();
    assert_eq!(out, json!([{"v": 7}]));
}

#[test]
fn test_foreach_preserves_surviving_order_after_skips() {
    let out = apply(
        json!({"@foreach($.ns,\"n\",$loop.n % 2 == 0)": {"even": "=$loop.n"}}),
        json!({"ns": [1, 2, 3, 4, 5, 6]}),
    )
    .unwrap();
    assert_eq!(out, json!([{"even": 2}, {"even": 4}, {"even": 6}]));
}

#[test]
fn test_nested_foreach() {
    let out = apply(
        json!({"orders": {"@foreach($.orders,\"o\")": {
            "id": "=$loop.o.id",
            "skus": {"@foreach($loop.o.lines)": {"=": "=$loop.sku"}}
        }}}),
        json!({"orders": [
            {"id": 1, "lines": [{"sku": "a"}, {"sku": "b"}]},
            {"id": 2, "lines": [{"sku": "c"}]}
        ]}),
    )
    .unwrap();
    assert_eq!(
        out,
        json!({"orders": [
            {"id": 1, "skus": ["a", "b"]},
            {"id": 2, "skus": ["c"]}
        ]})
    );
}

// =============================================================================
// Conditionals
// =============================================================================

#[rstest]
#[case("A", "branch-a")]
#[case("B", "branch-b")]
#[case("C", "fallback")]
fn test_conditional_selects_first_true_branch(#[case] status: &str, #[case] expected: &str) {
    let spec = json!({"@conditional($.status)": {
        "== \"A\"": "branch-a",
        "== \"B\"": "branch-b",
        "@otherwise": "fallback"
    }});
    assert_eq!(
        apply(spec, json!({"status": status})).unwrap(),
        json!(expected)
    );
}

#[test]
fn test_conditional_long_form_without_prefix() {
    let spec = json!({"@conditional": {
        "$.total > 100": "high",
        "$.total > 10": "medium",
        "@otherwise": "low"
    }});
    assert_eq!(apply(spec.clone(), json!({"total": 500})).unwrap(), json!("high"));
    assert_eq!(apply(spec.clone(), json!({"total": 50})).unwrap(), json!("medium"));
    assert_eq!(apply(spec, json!({"total": 5})).unwrap(), json!("low"));
}

#[test]
fn test_conditional_without_default_yields_nil() {
    let spec = json!({"@conditional": {"$.flag": "set"}});
    assert_eq!(apply(spec, json!({"flag": false})).unwrap(), Value::Null);
}

#[test]
fn test_if_else_legacy_spelling() {
    let spec = json!({
        "@if($.x == 1)": "one",
        "@elseIf($.x == 2)": "two",
        "@else": "many"
    });
    assert_eq!(apply(spec.clone(), json!({"x": 1})).unwrap(), json!("one"));
    assert_eq!(apply(spec.clone(), json!({"x": 2})).unwrap(), json!("two"));
    assert_eq!(apply(spec, json!({"x": 3})).unwrap(), json!("many"));
}

#[test]
fn test_conditional_branch_result_can_be_a_mapping() {
    let spec = json!({"@conditional": {
        "$.vip": {"tier": "gold", "discount": "=$.total / 10"},
        "@otherwise": {"tier": "standard", "discount": "=0"}
    }});
    assert_eq!(
        apply(spec.clone(), json!({"vip": true, "total": 200})).unwrap(),
        json!({"tier": "gold", "discount": 20})
    );
    assert_eq!(
        apply(spec, json!({"vip": false, "total": 200})).unwrap(),
        json!({"tier": "standard", "discount": 0})
    );
}

// =============================================================================
// Variable declarations
// =============================================================================

#[test]
fn test_var_declaration_visible_to_sibling_fields() {
    let out = apply(
        json!({"@var(threshold)": "=$.limit * 2", "over": "=$.value > $.threshold"}),
        json!({"limit": 10, "value": 25}),
    )
    .unwrap();
    assert_eq!(out, json!({"over": true}));
}

// =============================================================================
// Error handling
// =============================================================================

#[test]
fn test_missing_reference_aborts_apply() {
    let err = apply(json!({"v": "=$.missing"}), json!({})).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_failing_field_yields_no_partial_output() {
    let result = apply(
        json!({"good": "=1+1", "bad": "=$.missing.deep"}),
        json!({}),
    );
    assert!(result.is_err());
}

#[test]
fn test_compile_errors_surface_before_apply() {
    let factory = MapperFactory::new(ExprFactory::new());
    let err = factory
        .new_mapper(&json!({"bad": "=1 +"}))
        .expect_err("malformed expression must fail at compile time");
    assert!(matches!(err, Error::Expr(_)));
}

#[test]
fn test_relaxed_mapping_degrades_missing_fields_to_null() {
    let factory = MapperFactory::with_settings(
        ExprFactory::new(),
        EngineSettings {
            skip_missing_paths: false,
            relaxed_mapping: true,
        },
    );
    let mapper = factory
        .new_mapper(&json!({"v": "=$.missing", "kept": "=1+1"}))
        .unwrap();
    let out = mapper.apply(&scope_of(json!({}))).unwrap();
    assert_eq!(out, json!({"v": null, "kept": 2}));
}

#[test]
fn test_relaxed_mapping_treats_missing_foreach_source_as_empty() {
    let factory = MapperFactory::with_settings(
        ExprFactory::new(),
        EngineSettings {
            skip_missing_paths: false,
            relaxed_mapping: true,
        },
    );
    let mapper = factory
        .new_mapper(&json!({"@foreach($.absent)": {"v": "=$loop.x"}}))
        .unwrap();
    let out = mapper.apply(&scope_of(json!({}))).unwrap();
    assert_eq!(out, json!([]));
}

#[test]
fn test_strict_mapping_propagates_missing_foreach_source() {
    let result = apply(
        json!({"@foreach($.absent)": {"v": "=$loop.x"}}),
        json!({}),
    );
    assert!(result.is_err());
}
