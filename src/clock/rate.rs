//! Fixed-point conversion from a speed value to a virtual-time increment.
//!
//! | Constant   | Value       | Meaning                                    |
//! |------------|-------------|--------------------------------------------|
//! | SCALE      | 1_000_000   | Microseconds per second                    |
//! | FACTOR     | 100         | Speed value that means 1x real time        |
//! | QUOTIENT   | 10_000      | Microseconds added per unit of speed       |
//! | REMAINDER  | 0           | Leftover of SCALE / FACTOR                 |

pub const SCALE: i64 = 1_000_000;
pub const FACTOR: i64 = 100;
pub const QUOTIENT: i64 = SCALE / FACTOR;
pub const REMAINDER: i64 = SCALE % FACTOR;

/// Result of one conversion: whole seconds to add and the new micros remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    pub seconds: i64,
    pub micros: i64,
}

/// Converts `speed` and the current micros remainder into an [`Advance`]
/// worth `speed / FACTOR` real seconds.
///
/// Arithmetic is carried in `i128` so that any `i64` speed is safe; the
/// resulting second count always fits back in `i64`.
pub fn convert(speed: i64, micros: i64) -> Advance {
    debug_assert!(speed >= 0, "speed must be non-negative");
    let raw = QUOTIENT as i128 * speed as i128 + REMAINDER as i128 * speed as i128 + micros as i128;
    Advance {
        seconds: (raw / SCALE as i128) as i64,
        micros: (raw % SCALE as i128) as i64,
    }
}
