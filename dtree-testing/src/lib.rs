//! Float assertions shared by the workspace's tests.

use assert_float_eq::*;

/// Asserts that `actual` matches `expected` element by element, each within a relative `epsilon`.
pub fn assert_slice_f64_relative(expected: &[f64], actual: &[f64], epsilon: f64) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "slices differ in length: {expected:?} vs {actual:?}"
    );
    for (&expected, &actual) in expected.iter().zip(actual) {
        if expected != actual {
            assert_float_relative_eq!(expected, actual, epsilon);
        }
    }
}

/// Asserts that every element of `probs` is a valid probability and that the elements sum to
/// `expected_sum` within an absolute `epsilon`.
pub fn assert_probs_sum(expected_sum: f64, probs: &[f64], epsilon: f64) {
    for (index, &prob) in probs.iter().enumerate() {
        assert!(
            (0.0..=1.0).contains(&prob),
            "probs[{index}]={prob} outside [0, 1] in {probs:?}"
        );
    }
    let sum: f64 = probs.iter().sum();
    assert_float_absolute_eq!(expected_sum, sum, epsilon);
}
