//! Fuzzy matching through the whole pipeline

use crate::common::assertions::assert_diff_eq;
use crate::common::{id_set, record_for, TestFixture};
use rowdiff::fuzzy::{CaseInsensitive, Lowercase, NumericTolerance, Trim};
use rowdiff::{DiffEngine, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

fn widget_fixture() -> TestFixture {
    let fixture = TestFixture::new().unwrap();
    fixture.create_products().unwrap();
    fixture
        .insert_products("backup", &[(1, "Widget", 10, "Acme")])
        .unwrap();
    fixture
        .insert_products("live", &[(1, "Widget ", 12, "Acme")])
        .unwrap();
    fixture
}

#[test]
fn test_trimmed_name_drops_out_price_survives() {
    let fixture = widget_fixture();
    let records = fixture
        .records(
            fixture
                .products()
                .columns(["name", "price"])
                .normalizer("name", Arc::new(Trim)),
        )
        .unwrap();

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_diff_eq(record.source_diff.as_ref(), &[("price", Value::Integer(10))]);
    assert_diff_eq(record.dest_diff.as_ref(), &[("price", Value::Integer(12))]);
    // Full rows keep the raw values
    assert_eq!(record.dest_row.get("name"), Some(&Value::Text("Widget ".into())));
}

#[test]
fn test_fully_matched_row_is_suppressed_but_still_counted() {
    let fixture = widget_fixture();
    let config = fixture
        .products()
        .columns(["name", "price"])
        .normalizer("name", Arc::new(Trim))
        .comparator("price", Arc::new(NumericTolerance(5.0)))
        .build()
        .unwrap();
    let engine = DiffEngine::new(&fixture.database, config);

    let mut calls = 0;
    assert_eq!(engine.each(|_| calls += 1).unwrap(), 0);
    assert_eq!(calls, 0);
    // count works on the SQL predicate only
    assert_eq!(engine.count().unwrap(), 1);
}

#[test]
fn test_normalizer_chain_applies_in_order() {
    let fixture = TestFixture::new().unwrap();
    fixture.create_products().unwrap();
    fixture
        .insert_products("backup", &[(1, "  WIDGET", 10, "Acme")])
        .unwrap();
    fixture
        .insert_products("live", &[(1, "widget ", 10, "Acme")])
        .unwrap();

    let records = fixture
        .records(
            fixture
                .products()
                .columns(["name"])
                .normalizer("name", Arc::new(Trim))
                .normalizer("name", Arc::new(Lowercase)),
        )
        .unwrap();
    assert!(records.is_empty());
}

#[test]
fn test_comparator_without_normalizer() {
    let fixture = TestFixture::new().unwrap();
    fixture.create_products().unwrap();
    fixture
        .insert_products("backup", &[(1, "Widget", 10, "ACME"), (2, "Gadget", 5, "Acme")])
        .unwrap();
    fixture
        .insert_products("live", &[(1, "Widget", 10, "acme"), (2, "Gadget", 5, "Globex")])
        .unwrap();

    let records = fixture
        .records(
            fixture
                .products()
                .columns(["name", "price", "vendor"])
                .comparator("vendor", Arc::new(CaseInsensitive)),
        )
        .unwrap();
    assert_eq!(id_set(&records), BTreeSet::from([2]));
    assert_diff_eq(
        record_for(&records, 2).dest_diff.as_ref(),
        &[("vendor", Value::Text("Globex".into()))],
    );
}

#[test]
fn test_closure_normalizer_and_comparator() {
    let fixture = widget_fixture();
    let records = fixture
        .records(
            fixture
                .products()
                .columns(["name", "price"])
                .normalizer(
                    "name",
                    Arc::new(|v: &Value| match v {
                        Value::Text(s) => Value::Text(s.trim_end().to_string()),
                        other => other.clone(),
                    }),
                )
                .comparator(
                    "price",
                    Arc::new(|a: &Value, b: &Value| {
                        matches!((a, b), (Value::Integer(x), Value::Integer(y)) if (x - y).abs() <= 2)
                    }),
                ),
        )
        .unwrap();
    assert!(records.is_empty());
}

#[test]
fn test_missing_rows_bypass_fuzzy_matching() {
    let fixture = widget_fixture();
    fixture
        .insert_products("live", &[(2, "Extra", 0, "Acme")])
        .unwrap();

    let records = fixture
        .records(
            fixture
                .products()
                .columns(["name", "price"])
                .normalizer("name", Arc::new(Trim))
                .comparator("price", Arc::new(|_: &Value, _: &Value| true)),
        )
        .unwrap();

    // Row 1 collapses entirely, row 2 is reported in full
    assert_eq!(id_set(&records), BTreeSet::from([2]));
    let record = record_for(&records, 2);
    assert_eq!(record.source_diff, None);
    assert_eq!(record.dest_diff.as_ref().map(|d| d.len()), Some(2));
}
