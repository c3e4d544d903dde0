/// Asserts that a numerical value is in the provided interval `[a,b]` and panics
/// with a helpful message if not
///
/// ### Example
/// ```should_panic
/// # use platformer_rl::assert_interval;
/// let value = 2.0;
/// assert_interval!(value, 0.0, 1.0);
/// ```
/// This will panic with the message "Invalid value for \`value\`. Must be in the interval \[0, 1\]."
#[macro_export]
macro_rules! assert_interval {
    ($var:expr, $a:expr, $b:expr) => {
        assert!(
            $var >= $a && $var <= $b,
            "Invalid value for `{}`. Must be in the interval [{}, {}].",
            stringify!($var),
            $a,
            $b,
        );
    };
}

/// Mean of the last `window` values, `0.0` if there are none
pub fn trailing_mean(values: &[f32], window: usize) -> f32 {
    let tail = &values[values.len().saturating_sub(window)..];
    if tail.is_empty() {
        return 0.0;
    }
    tail.iter().sum::<f32>() / tail.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_mean_functional() {
        assert_eq!(trailing_mean(&[], 10), 0.0);
        assert_eq!(trailing_mean(&[1.0, 2.0, 3.0], 10), 2.0);
        assert_eq!(trailing_mean(&[1.0, 2.0, 3.0, 5.0], 2), 4.0);
    }
}
