//! Deterministic observation walks for tests
//!
//! All generators are pure: same input, same output, no RNG and no I/O.
//! Times advance one second per observation so time-ordering assertions
//! stay readable.

use crate::chart::Observation;
use crate::timestamp::NANOS_PER_SEC;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Observation at `seq` seconds since epoch.
pub fn obs(price: &str, seq: i64) -> Observation {
    Observation {
        price: Decimal::from_str(price).expect("test price must parse"),
        time: seq * NANOS_PER_SEC,
    }
}

/// Straight run of whole-number prices from `start` up to `end` inclusive.
pub fn uptrend_walk(start: i64, end: i64) -> Vec<Observation> {
    (start..=end)
        .enumerate()
        .map(|(i, price)| obs(&price.to_string(), i as i64))
        .collect()
}

/// Up `legs[0]` boxes, down `legs[1]`, up `legs[2]`, … starting at `start`.
/// Produces alternating columns under a small enough reversal count.
pub fn zigzag_walk(start: i64, legs: &[i64]) -> Vec<Observation> {
    let mut observations = Vec::new();
    let mut price = start;
    let mut seq = 0i64;
    let mut upward = true;

    observations.push(obs(&price.to_string(), seq));
    for &leg in legs {
        for _ in 0..leg {
            price += if upward { 1 } else { -1 };
            seq += 1;
            observations.push(obs(&price.to_string(), seq));
        }
        upward = !upward;
    }
    observations
}

/// Sub-box noise around a whole-number anchor; every value truncates to
/// `anchor` under integral boxes.
pub fn inside_box_noise(anchor: i64) -> Vec<Observation> {
    [".0", ".3", ".7", ".9"]
        .iter()
        .enumerate()
        .map(|(i, frac)| obs(&format!("{anchor}{frac}"), i as i64))
        .collect()
}

/// Percent-scale ladder: each step is exactly one 4% box above the last.
pub fn percent_ladder() -> Vec<Observation> {
    ["100", "104", "108.16", "112.4864"]
        .iter()
        .enumerate()
        .map(|(i, price)| obs(price, i as i64))
        .collect()
}
