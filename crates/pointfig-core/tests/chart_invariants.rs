//! Property tests for the chart-wide invariants
//!
//! Random price walks are replayed through fresh charts and the structural
//! invariants checked after every configuration: bounds ordering, box
//! quantization, extrema coverage, direction alternation, replay
//! determinism, and the snapshot round-trip law.

use pointfig_core::{BoxScale, BoxType, Chart, Column, Direction};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn check_linear_invariants(chart: &Chart, box_size: Decimal) {
    // Invariant: there is always at least the open column
    assert!(chart.number_of_columns() >= 1);

    let (y_min, y_max) = chart.y_limits();
    let mut all_columns: Vec<&Column> = chart.columns().iter().collect();
    all_columns.push(chart.current_column());

    for column in &all_columns {
        if column.is_empty() {
            continue;
        }
        // Invariant: top never sits below bottom
        assert!(
            column.top() >= column.bottom(),
            "top {} below bottom {}",
            column.top(),
            column.bottom()
        );
        // Invariant: the column height is a whole number of boxes
        let height = column.top() - column.bottom();
        assert_eq!(
            height % box_size,
            Decimal::ZERO,
            "height {height} not a multiple of {box_size}"
        );
        // Invariant: a directionless column has zero height
        if column.direction() == Direction::Unknown {
            assert_eq!(column.top(), column.bottom());
        }
        // Invariant: step-back reversals only exist under a one-box count
        if column.had_reversal() {
            assert_eq!(column.reversal_boxes(), 1);
        }
        // Invariant: the chart extrema cover every column
        assert!(y_min <= column.bottom());
        assert!(y_max >= column.top());
    }

    // Invariant: adjacent closed columns alternate unless the earlier one
    // changed direction in place
    for pair in chart.columns().windows(2) {
        if !pair[0].had_reversal() {
            assert_ne!(
                pair[0].direction(),
                pair[1].direction(),
                "closed columns failed to alternate"
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn linear_walks_hold_invariants(
        start in 20i64..200,
        steps in prop::collection::vec(-6i64..=6, 1..80),
        reversal_boxes in 1u32..=5,
    ) {
        let box_size = Decimal::ONE;
        let mut chart = Chart::new(
            "PROP",
            box_size,
            reversal_boxes,
            BoxType::Integral,
            BoxScale::Linear,
        ).unwrap();

        let mut price = start;
        let mut time = 0i64;
        chart.add_value(Decimal::from(price), time);
        for step in steps {
            // Keep prices positive so the empty sentinel stays unambiguous
            price = (price + step).max(1);
            time += 1;
            chart.add_value(Decimal::from(price), time);
        }

        check_linear_invariants(&chart, box_size);
    }

    #[test]
    fn replay_determinism(
        steps in prop::collection::vec(-5i64..=5, 1..60),
    ) {
        let build = |times_scale: i64| {
            let mut chart = Chart::new(
                "REPLAY",
                Decimal::ONE,
                3,
                BoxType::Integral,
                BoxScale::Linear,
            ).unwrap();
            let mut price = 100i64;
            for (i, step) in steps.iter().enumerate() {
                price = (price + step).max(1);
                chart.add_value(Decimal::from(price), (i as i64) * times_scale);
            }
            chart
        };

        // Identical observations produce equal charts, whatever the clock did
        prop_assert_eq!(build(1), build(1_000_000_000));
    }

    #[test]
    fn snapshot_round_trip_holds(
        steps in prop::collection::vec(-5i64..=5, 1..60),
        reversal_boxes in 1u32..=3,
    ) {
        let mut chart = Chart::new(
            "SNAP",
            Decimal::ONE,
            reversal_boxes,
            BoxType::Integral,
            BoxScale::Linear,
        ).unwrap();
        let mut price = 100i64;
        for (i, step) in steps.iter().enumerate() {
            price = (price + step).max(1);
            chart.add_value(Decimal::from(price), i as i64);
        }

        let restored = Chart::from_snapshot(&chart.to_snapshot()).unwrap();
        prop_assert_eq!(restored, chart);
    }

    #[test]
    fn ignored_observations_leave_state_unchanged(
        steps in prop::collection::vec(-5i64..=5, 1..40),
        probe in 1i64..300,
    ) {
        let mut chart = Chart::new(
            "IDEM",
            Decimal::ONE,
            3,
            BoxType::Integral,
            BoxScale::Linear,
        ).unwrap();
        let mut price = 100i64;
        for (i, step) in steps.iter().enumerate() {
            price = (price + step).max(1);
            chart.add_value(Decimal::from(price), i as i64);
        }

        let probe = Decimal::from(probe);
        let status = chart.add_value(probe, 1_000);
        if status == pointfig_core::Status::Ignored {
            let before = chart.clone();
            // Same price later must again be ignored and change nothing
            let again = chart.add_value(probe, 2_000);
            prop_assert_eq!(again, pointfig_core::Status::Ignored);
            prop_assert_eq!(chart, before);
        }
    }
}
