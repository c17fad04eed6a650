mod common;

use common::{assert_valid, cells, dataset, i, map, s};
use csv_normalize::data::{Cell, CompositeKind};
use csv_normalize::expand::{ExpandError, expand_mixed, is_expandable};
use proptest::prelude::*;

#[test]
fn dict_column_expands_into_prefixed_columns() {
    let data = dataset(vec![
        ("id", vec![i(1), i(2)]),
        (
            "info",
            vec![map(&[("a", i(1)), ("b", i(2))]), map(&[("a", i(3)), ("b", i(4))])],
        ),
    ]);
    let expanded = expand_mixed(data, &CompositeKind::ALL).expect("expand");
    assert_eq!(expanded.names(), vec!["id", "info_a", "info_b"]);
    assert_eq!(cells(&expanded, "info_a"), &[i(1), i(3)]);
    assert_eq!(cells(&expanded, "info_b"), &[i(2), i(4)]);
    assert!(!expanded.contains("info"));
}

#[test]
fn list_positions_become_indexed_columns() {
    let data = dataset(vec![(
        "coords",
        vec![
            Cell::List(vec![i(1), s("x")]),
            Cell::List(vec![i(2), s("y")]),
        ],
    )]);
    let expanded = expand_mixed(data, &CompositeKind::ALL).expect("expand");
    assert_eq!(expanded.names(), vec!["coords_0", "coords_1"]);
    assert_eq!(cells(&expanded, "coords_1"), &[s("x"), s("y")]);
}

#[test]
fn missing_rows_stay_aligned() {
    let data = dataset(vec![(
        "info",
        vec![map(&[("a", i(1))]), Cell::Missing, map(&[("a", i(3))])],
    )]);
    let expanded = expand_mixed(data, &CompositeKind::ALL).expect("expand");
    assert_eq!(expanded.row_count(), 3);
    assert_eq!(cells(&expanded, "info_a"), &[i(1), Cell::Missing, i(3)]);
}

#[test]
fn nested_composites_are_left_alone() {
    let data = dataset(vec![(
        "deep",
        vec![
            Cell::List(vec![i(1), Cell::List(vec![i(2)])]),
            Cell::List(vec![i(3), Cell::List(vec![i(4)])]),
        ],
    )]);
    let expanded = expand_mixed(data.clone(), &CompositeKind::ALL).expect("expand");
    assert_eq!(expanded, data);
}

#[test]
fn columns_with_scalars_and_composites_are_not_expanded() {
    let data = dataset(vec![("half", vec![map(&[("a", i(1))]), i(5)])]);
    let expanded = expand_mixed(data.clone(), &CompositeKind::ALL).expect("expand");
    assert_eq!(expanded, data);
}

#[test]
fn restricting_kinds_skips_other_shapes() {
    let data = dataset(vec![
        ("pairs", vec![Cell::List(vec![i(1), i(2)])]),
        ("info", vec![map(&[("k", s("v"))])]),
    ]);
    let expanded = expand_mixed(data, &[CompositeKind::Dict]).expect("expand");
    assert_eq!(expanded.names(), vec!["pairs", "info_k"]);
}

// An all-missing or zero-row column would satisfy "every non-missing cell is
// a flat composite" vacuously; such columns are defined as not expandable.
#[test]
fn vacuous_columns_are_not_expanded() {
    let all_missing = dataset(vec![("empty", vec![Cell::Missing, Cell::Missing])]);
    assert!(!is_expandable(&all_missing.columns()[0], &CompositeKind::ALL));
    let expanded = expand_mixed(all_missing.clone(), &CompositeKind::ALL).expect("expand");
    assert_eq!(expanded, all_missing);

    let zero_rows = dataset(vec![("empty", Vec::new())]);
    let expanded = expand_mixed(zero_rows.clone(), &CompositeKind::ALL).expect("expand");
    assert_eq!(expanded, zero_rows);
}

#[test]
fn ragged_lists_raise_a_named_error() {
    let data = dataset(vec![(
        "tags",
        vec![
            Cell::List(vec![s("a"), s("b")]),
            Cell::List(vec![s("c")]),
        ],
    )]);
    let err = expand_mixed(data, &CompositeKind::ALL).unwrap_err();
    assert_eq!(
        err,
        ExpandError::RaggedComposite {
            column: "tags".to_string(),
            row: 1,
            expected: 2,
            found: 1,
        }
    );
    assert!(err.to_string().contains("tags"));
}

#[test]
fn differing_keys_raise_a_named_error() {
    let data = dataset(vec![(
        "info",
        vec![map(&[("a", i(1))]), map(&[("b", i(2))])],
    )]);
    let err = expand_mixed(data, &CompositeKind::ALL).unwrap_err();
    assert!(matches!(err, ExpandError::KeyMismatch { row: 1, .. }));
}

#[test]
fn colliding_names_leave_the_column_unexpanded() {
    let data = dataset(vec![
        ("info_a", vec![i(1), i(3)]),
        ("info", vec![map(&[("a", i(1))]), map(&[("a", i(3))])]),
        ("pairs", vec![Cell::List(vec![s("x")]), Cell::List(vec![s("y")])]),
    ]);
    let expanded = expand_mixed(data, &CompositeKind::ALL).expect("expand");
    assert_valid(&expanded);
    assert_eq!(expanded.names(), vec!["info_a", "info", "pairs_0"]);
    assert_eq!(
        cells(&expanded, "info"),
        &[map(&[("a", i(1))]), map(&[("a", i(3))])]
    );
    assert_eq!(cells(&expanded, "pairs_0"), &[s("x"), s("y")]);
}

#[test]
fn a_clash_with_an_earlier_expansion_keeps_the_later_column() {
    let data = dataset(vec![
        ("a", vec![map(&[("b_c", i(1))])]),
        ("a_b", vec![map(&[("c", i(2))])]),
    ]);
    let expanded = expand_mixed(data, &CompositeKind::ALL).expect("expand");
    assert_valid(&expanded);
    assert_eq!(expanded.names(), vec!["a_b", "a_b_c"]);
    assert_eq!(cells(&expanded, "a_b_c"), &[i(1)]);
}

proptest! {
    #[test]
    fn expansion_leaves_no_eligible_composites(
        rows in proptest::collection::vec(proptest::collection::vec(any::<i64>(), 3), 1..20)
    ) {
        let column = rows
            .iter()
            .map(|row| Cell::List(row.iter().copied().map(Cell::Integer).collect()))
            .collect::<Vec<_>>();
        let data = dataset(vec![("values", column), ("id", vec![i(0); rows.len()])]);
        let expanded = expand_mixed(data, &CompositeKind::ALL).expect("expand");
        prop_assert_eq!(expanded.validate(), Ok(()));
        prop_assert_eq!(expanded.row_count(), rows.len());
        prop_assert_eq!(expanded.column_count(), 4);
        for column in expanded.columns() {
            prop_assert!(column.cells().iter().all(|cell| !cell.is_composite_of(&CompositeKind::ALL)));
        }
    }
}
