//! Log-scale distribution bucketer
//!
//! Turns a raw sample into a human-readable magnitude bucket such as
//! `latencye[230m-240m]`, so that a distribution can be tracked with plain
//! counters (one counter per bucket).
//!
//! The label is `name + sign + sort prefix + "[" + range + "]"`:
//! - the magnitude is split into a base-1000 [`Scale`] (femto .. tera) and a
//!   short value in `[1, 1000)`;
//! - the sort prefix is one letter per scale so that sorting labels
//!   alphabetically groups them by magnitude;
//! - the range string comes from a [`BucketPolicy`]; the built-in policies are
//!   the three [`Resolution`] levels.
//!
//! Zero is never bucketed (`"name [zero]"`). Magnitudes outside the unit table
//! yield an out-of-range label that still sorts on the correct side of the
//! table: `"name0[out-of-range]"` below femto, `"namez[out-of-range]"` at peta
//! and above (non-finite samples included).

use std::fmt;

use tally_domain::constants::{
    OUT_OF_RANGE_BUCKET, OVERFLOW_SORT_PREFIX, UNDERFLOW_SORT_PREFIX, ZERO_BUCKET,
};
use tally_domain::Resolution;

const UNITS: [&str; 11] = ["f", "p", "n", "mi", "m", "", "k", "M", "G", "T", "P"];
const SORT_PREFIXES: [&str; 11] = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k"];
/// Offset from a scale index to its slot in [`UNITS`] (index 0 is units).
const UNIT_BIAS: i32 = 5;

/// Relative nudge applied before flooring so that a sample sitting on a
/// bucket boundary up to floating error lands in the higher bucket.
const BOUNDARY_TOLERANCE: f64 = 1e-9;

const LOW_STEPS: [u32; 9] = [1, 2, 5, 10, 20, 50, 100, 200, 500];
const MEDIUM_STEPS: [u32; 27] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 200, 300, 400, 500, 600,
    700, 800, 900,
];

/// A supported base-1000 magnitude: `10^(3 * index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scale {
    index: i32,
}

impl Scale {
    /// Returns `None` when `index` has no unit (below femto, or peta and up;
    /// peta only exists as the roll-up unit of the tera scale).
    pub fn new(index: i32) -> Option<Self> {
        let slot = index.checked_add(UNIT_BIAS)?;
        (0..UNITS.len() as i32 - 1).contains(&slot).then_some(Self { index })
    }

    /// Power of 1000 this scale stands for.
    pub fn index(self) -> i32 {
        self.index
    }

    /// SI-style unit suffix (`"m"`, `""`, `"k"`, ...).
    pub fn unit(self) -> &'static str {
        UNITS[self.slot()]
    }

    /// Unit of the next scale up, used by the top bucket (`500-1k`).
    pub fn next_unit(self) -> &'static str {
        UNITS[self.slot() + 1]
    }

    /// Letter that orders labels of this scale alphabetically by magnitude.
    pub fn sort_prefix(self) -> &'static str {
        SORT_PREFIXES[self.slot()]
    }

    fn slot(self) -> usize {
        // Scale::new guarantees 0 <= index + bias < UNITS.len() - 1
        (self.index + UNIT_BIAS) as usize
    }
}

/// Strategy producing the bracketed range string for a decomposed sample.
///
/// `short_value` is nominally in `[1, 1000)`; implementations must tolerate
/// values marginally outside that interval caused by floating error.
pub trait BucketPolicy: Send + Sync + fmt::Debug {
    /// Range string placed between the brackets of the label.
    fn bucket(&self, short_value: f64, scale: Scale) -> String;
}

impl BucketPolicy for Resolution {
    fn bucket(&self, short_value: f64, scale: Scale) -> String {
        match self {
            Resolution::Low => stepped_bucket(short_value, scale, &LOW_STEPS),
            Resolution::Medium => stepped_bucket(short_value, scale, &MEDIUM_STEPS),
            Resolution::High => two_figure_bucket(short_value, scale),
        }
    }
}

/// Maps `(name, value)` to its bucket label under `policy`.
///
/// ```
/// use tally_core::distribution::derive_bucket_label;
/// use tally_domain::Resolution;
///
/// assert_eq!(derive_bucket_label("test", 1113.0, &Resolution::Low), "testg[001k-2k]");
/// assert_eq!(derive_bucket_label("test", 1113.0, &Resolution::High), "testg[001.1k-1.2k]");
/// assert_eq!(derive_bucket_label("test", 0.0, &Resolution::High), "test [zero]");
/// ```
pub fn derive_bucket_label(name: &str, value: f64, policy: &dyn BucketPolicy) -> String {
    if value == 0.0 {
        return format!("{name}{ZERO_BUCKET}");
    }

    let sign = if value < 0.0 { "-" } else { "" };
    match decompose(value.abs()) {
        Some((short_value, scale)) => {
            let range = policy.bucket(short_value, scale);
            format!("{name}{sign}{}[{range}]", scale.sort_prefix())
        }
        None => {
            let magnitude = value.abs();
            let prefix = if magnitude.is_finite() && magnitude < 1.0 {
                UNDERFLOW_SORT_PREFIX
            } else {
                OVERFLOW_SORT_PREFIX
            };
            format!("{name}{sign}{prefix}[{OUT_OF_RANGE_BUCKET}]")
        }
    }
}

/// Splits a positive magnitude into `(short_value, scale)`.
fn decompose(magnitude: f64) -> Option<(f64, Scale)> {
    if !magnitude.is_finite() || magnitude <= 0.0 {
        return None;
    }

    let decade = magnitude.log10().floor();
    if decade.abs() > f64::from(i16::MAX) {
        return None;
    }
    // integer division rounding toward negative infinity
    let scale = Scale::new((decade as i32).div_euclid(3))?;
    let short_value = magnitude / 10f64.powf(f64::from(scale.index() * 3));
    Some((short_value, scale))
}

fn nudge(short_value: f64) -> f64 {
    short_value * (1.0 + BOUNDARY_TOLERANCE)
}

/// Fixed step table; each bucket runs from one step to the next and the last
/// one rolls up to `1<next unit>`.
fn stepped_bucket(short_value: f64, scale: Scale, steps: &[u32]) -> String {
    let nudged = nudge(short_value);
    let idx = steps.iter().rposition(|&step| nudged >= f64::from(step)).unwrap_or(0);
    let unit = scale.unit();
    let lower = steps[idx];
    match steps.get(idx + 1) {
        Some(upper) => format!("{lower:03}{unit}-{upper}{unit}"),
        None => format!("{lower:03}{unit}-1{}", scale.next_unit()),
    }
}

/// Two significant figures: tenths below 10, units below 100, tens below
/// 1000, with `990-1<next unit>` on top.
fn two_figure_bucket(short_value: f64, scale: Scale) -> String {
    let nudged = nudge(short_value);
    let unit = scale.unit();

    if nudged >= 990.0 {
        return format!("990{unit}-1{}", scale.next_unit());
    }
    if nudged >= 100.0 {
        let lower = ((nudged / 10.0).floor() as u32 * 10).clamp(100, 980);
        return format!("{lower:03}{unit}-{}{unit}", lower + 10);
    }
    if nudged >= 10.0 {
        let lower = (nudged.floor() as u32).clamp(10, 99);
        return format!("{lower:03}{unit}-{}{unit}", lower + 1);
    }

    let tenths = ((nudged * 10.0).floor() as u32).clamp(10, 99);
    let lower = f64::from(tenths) / 10.0;
    let upper = f64::from(tenths + 1) / 10.0;
    format!("{lower:05.1}{unit}-{upper:.1}{unit}")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Case {
        name: &'static str,
        value: f64,
        low: &'static str,
        medium: &'static str,
        high: &'static str,
    }

    const CASES: &[Case] = &[
        Case {
            name: "test",
            value: 1113.0,
            low: "testg[001k-2k]",
            medium: "testg[001k-2k]",
            high: "testg[001.1k-1.2k]",
        },
        Case {
            name: "test",
            value: 0.0,
            low: "test [zero]",
            medium: "test [zero]",
            high: "test [zero]",
        },
        Case {
            name: "test",
            value: 2113.0,
            low: "testg[002k-5k]",
            medium: "testg[002k-3k]",
            high: "testg[002.1k-2.2k]",
        },
        Case {
            name: "test",
            value: 5113.0,
            low: "testg[005k-10k]",
            medium: "testg[005k-6k]",
            high: "testg[005.1k-5.2k]",
        },
        Case {
            name: "test",
            value: 15113.0,
            low: "testg[010k-20k]",
            medium: "testg[010k-20k]",
            high: "testg[015k-16k]",
        },
        Case {
            name: "test",
            value: 45113.0,
            low: "testg[020k-50k]",
            medium: "testg[040k-50k]",
            high: "testg[045k-46k]",
        },
        Case {
            name: "test",
            value: 95113.0,
            low: "testg[050k-100k]",
            medium: "testg[090k-100k]",
            high: "testg[095k-96k]",
        },
        Case {
            name: "test2",
            value: 113.0,
            low: "test2f[100-200]",
            medium: "test2f[100-200]",
            high: "test2f[110-120]",
        },
        Case {
            name: "test2",
            value: 213.0,
            low: "test2f[200-500]",
            medium: "test2f[200-300]",
            high: "test2f[210-220]",
        },
        Case {
            name: "test2",
            value: 0.23,
            low: "test2e[200m-500m]",
            medium: "test2e[200m-300m]",
            high: "test2e[230m-240m]",
        },
        Case {
            name: "test2",
            value: 0.831,
            low: "test2e[500m-1]",
            medium: "test2e[800m-900m]",
            high: "test2e[830m-840m]",
        },
        Case {
            name: "test2",
            value: 0.00083,
            low: "test2d[500mi-1m]",
            medium: "test2d[800mi-900mi]",
            high: "test2d[830mi-840mi]",
        },
    ];

    #[test]
    fn low_resolution_table() {
        for case in CASES {
            let label = derive_bucket_label(case.name, case.value, &Resolution::Low);
            assert_eq!(label, case.low, "value {}", case.value);
        }
    }

    #[test]
    fn medium_resolution_table() {
        for case in CASES {
            let label = derive_bucket_label(case.name, case.value, &Resolution::Medium);
            assert_eq!(label, case.medium, "value {}", case.value);
        }
    }

    #[test]
    fn high_resolution_table() {
        for case in CASES {
            let label = derive_bucket_label(case.name, case.value, &Resolution::High);
            assert_eq!(label, case.high, "value {}", case.value);
        }
    }

    #[test]
    fn negative_values_carry_sign_before_prefix() {
        assert_eq!(derive_bucket_label("t", -1113.0, &Resolution::Low), "t-g[001k-2k]");
        assert_eq!(derive_bucket_label("t", -0.0, &Resolution::Low), "t [zero]");
    }

    #[test]
    fn boundaries_resolve_to_higher_bucket() {
        assert_eq!(derive_bucket_label("b", 2000.0, &Resolution::Low), "bg[002k-5k]");
        assert_eq!(derive_bucket_label("b", 1.0, &Resolution::High), "bf[001.0-1.1]");
        assert_eq!(derive_bucket_label("b", 1000.0, &Resolution::High), "bg[001.0k-1.1k]");
        assert_eq!(derive_bucket_label("b", 0.001, &Resolution::Medium), "be[001m-2m]");
        assert_eq!(derive_bucket_label("b", 999.5, &Resolution::High), "bf[990-1k]");
    }

    #[test]
    fn top_buckets_roll_up_to_next_unit() {
        assert_eq!(derive_bucket_label("r", 950.0, &Resolution::Medium), "rf[900-1k]");
        assert_eq!(derive_bucket_label("r", 7e14, &Resolution::Low), "rj[500T-1P]");
    }

    #[test]
    fn out_of_range_magnitudes_do_not_panic() {
        assert_eq!(derive_bucket_label("x", 1e15, &Resolution::High), "xz[out-of-range]");
        assert_eq!(derive_bucket_label("x", -1e300, &Resolution::Low), "x-z[out-of-range]");
        assert_eq!(derive_bucket_label("x", 1e-16, &Resolution::Medium), "x0[out-of-range]");
        assert_eq!(derive_bucket_label("x", f64::NAN, &Resolution::High), "xz[out-of-range]");
        assert_eq!(derive_bucket_label("x", f64::INFINITY, &Resolution::High), "xz[out-of-range]");
        assert_eq!(
            derive_bucket_label("x", f64::MIN_POSITIVE / 4.0, &Resolution::High),
            "x0[out-of-range]"
        );
    }

    #[test]
    fn out_of_range_labels_sort_outside_the_unit_table() {
        let tiny = derive_bucket_label("x", 1e-16, &Resolution::High);
        let femto = derive_bucket_label("x", 1e-15, &Resolution::High);
        let tera = derive_bucket_label("x", 9e14, &Resolution::High);
        let huge = derive_bucket_label("x", 1e15, &Resolution::High);

        assert!(tiny < femto, "{tiny} sorts after {femto}");
        assert!(tera < huge, "{huge} sorts before {tera}");
    }

    #[test]
    fn smallest_supported_scale_is_femto() {
        assert_eq!(derive_bucket_label("f", 3e-15, &Resolution::Low), "fa[002f-5f]");
    }

    #[test]
    fn bucket_index_is_monotonic_in_short_value() {
        let scale = Scale::new(0).unwrap();
        for policy in [Resolution::Low, Resolution::Medium, Resolution::High] {
            let mut previous_lower = 0.0;
            let mut short = 1.0;
            while short < 1000.0 {
                let range = policy.bucket(short, scale);
                let lower: f64 = range.split('-').next().unwrap().parse().unwrap();
                assert!(lower >= previous_lower, "{policy} went down at {short}: {range}");
                previous_lower = lower;
                short += 0.37;
            }
        }
    }

    #[test]
    fn labels_are_deterministic() {
        for value in [0.5, 12.0, 7_777.0, -3.3e-7] {
            for policy in [Resolution::Low, Resolution::Medium, Resolution::High] {
                assert_eq!(
                    derive_bucket_label("d", value, &policy),
                    derive_bucket_label("d", value, &policy)
                );
            }
        }
    }

    #[test]
    fn custom_policy_receives_decomposed_value() {
        #[derive(Debug)]
        struct Coarse;

        impl BucketPolicy for Coarse {
            fn bucket(&self, short_value: f64, scale: Scale) -> String {
                if short_value < 100.0 {
                    format!("small{}", scale.unit())
                } else {
                    format!("large{}", scale.unit())
                }
            }
        }

        assert_eq!(derive_bucket_label("c", 4_200.0, &Coarse), "cg[smallk]");
        assert_eq!(derive_bucket_label("c", 420.0, &Coarse), "cf[large]");
    }
}
