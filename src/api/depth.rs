// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reversed-Z support.
//!
//! Under the reversed-Z convention 1.0 is the near plane and 0.0 the far
//! plane, which distributes floating-point depth precision far better. The
//! transforms here are applied exactly once, at the boundary between
//! user-space compare functions/clear values and backend state. Applying
//! them twice silently restores conventional Z, so both are involutions and
//! tested as such.

use crate::api::descriptors::CompareFunction;

/// Whether the crate was built for reversed-Z. Compile-time for now; all
/// translation paths funnel through the functions below so flipping this is
/// one change.
pub const IS_DEPTH_REVERSED: bool = true;

/// Swaps the depth sense of a compare function (LESS↔GREATER,
/// LEQUAL↔GEQUAL). Self-inverse.
pub fn reverse_depth_for_compare_function(func: CompareFunction) -> CompareFunction {
    if !IS_DEPTH_REVERSED {
        return func;
    }
    match func {
        CompareFunction::Less => CompareFunction::Greater,
        CompareFunction::Greater => CompareFunction::Less,
        CompareFunction::LessEqual => CompareFunction::GreaterEqual,
        CompareFunction::GreaterEqual => CompareFunction::LessEqual,
        other => other,
    }
}

/// Maps a clear value across the depth reversal (`v → 1 − v`). Self-inverse.
pub fn reverse_depth_for_clear_value(value: f32) -> f32 {
    if !IS_DEPTH_REVERSED {
        return value;
    }
    1.0 - value
}

/// Rewrites a column-major perspective projection matrix in place for
/// reversed-Z, remapping the clip-space depth range `[0, 1] → [1, 0]`.
pub fn reverse_depth_for_perspective(matrix: &mut [f32; 16]) {
    if !IS_DEPTH_REVERSED {
        return;
    }
    // z' = -z + 1 applied to the third output row.
    for i in [2, 6, 10, 14] {
        matrix[i] = -matrix[i];
    }
    matrix[10] += matrix[11];
    matrix[14] += matrix[15];
}

/// Orthographic counterpart of [`reverse_depth_for_perspective`].
pub fn reverse_depth_for_orthographic(matrix: &mut [f32; 16]) {
    reverse_depth_for_perspective(matrix);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_function_reversal_is_involution() {
        for func in [
            CompareFunction::Never,
            CompareFunction::Less,
            CompareFunction::Equal,
            CompareFunction::LessEqual,
            CompareFunction::Greater,
            CompareFunction::NotEqual,
            CompareFunction::GreaterEqual,
            CompareFunction::Always,
        ] {
            assert_eq!(
                reverse_depth_for_compare_function(reverse_depth_for_compare_function(func)),
                func
            );
        }
    }

    #[test]
    fn compare_function_reversal_swaps_depth_sense() {
        assert_eq!(
            reverse_depth_for_compare_function(CompareFunction::LessEqual),
            CompareFunction::GreaterEqual
        );
        assert_eq!(
            reverse_depth_for_compare_function(CompareFunction::Less),
            CompareFunction::Greater
        );
        assert_eq!(
            reverse_depth_for_compare_function(CompareFunction::Equal),
            CompareFunction::Equal
        );
    }

    #[test]
    fn clear_value_reversal_is_involution() {
        for v in [0.0f32, 0.25, 0.5, 1.0] {
            assert_eq!(reverse_depth_for_clear_value(reverse_depth_for_clear_value(v)), v);
        }
    }
}
