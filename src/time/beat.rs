//! Exact rational beat positions

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

/// Exact beat position `beat + num / den`.
///
/// Always kept reduced: `den >= 1` and `0 <= num < den`, so every position
/// has exactly one representation. Ordering and equality are integer-exact;
/// [`BeatTime::to_beats`] is a lossy projection for geometry and display and
/// must never drive a structural decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(i32, i32, i32)", into = "(i32, i32, i32)")]
pub struct BeatTime {
    beat: i32,
    num: i32,
    den: i32,
}

impl BeatTime {
    /// Beat zero
    pub const ZERO: BeatTime = BeatTime {
        beat: 0,
        num: 0,
        den: 1,
    };

    /// Create a validated, reduced beat time.
    ///
    /// Rejects a zero or negative denominator before anything structural can
    /// observe the value. The numerator may be negative or exceed the
    /// denominator; whole beats are carried into `beat`.
    pub fn new(beat: i32, num: i32, den: i32) -> Result<Self, Error> {
        if den <= 0 {
            return Err(Error::BadDenominator { beat, num, den });
        }
        Ok(Self::reduced(beat as i64, num as i64, den as i64))
    }

    /// Whole-beat constructor
    pub fn from_beat(beat: i32) -> Self {
        Self { beat, num: 0, den: 1 }
    }

    pub fn beat(&self) -> i32 {
        self.beat
    }

    pub fn numerator(&self) -> i32 {
        self.num
    }

    pub fn denominator(&self) -> i32 {
        self.den
    }

    /// Lossy float projection, for jump-slot geometry and display only
    pub fn to_beats(&self) -> f64 {
        self.beat as f64 + self.num as f64 / self.den as f64
    }

    fn reduced(beat: i64, num: i64, den: i64) -> Self {
        debug_assert!(den > 0);
        let carry = num.div_euclid(den);
        let num = num.rem_euclid(den);
        let g = gcd(num, den);
        Self {
            beat: (beat + carry) as i32,
            num: (num / g) as i32,
            den: (den / g) as i32,
        }
    }
}

/// Greatest common divisor; `gcd(0, d) == d`
fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.max(1)
}

impl Ord for BeatTime {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reduced form makes the whole-beat comparison decisive before the
        // fractional cross-multiplication.
        self.beat.cmp(&other.beat).then_with(|| {
            let lhs = self.num as i64 * other.den as i64;
            let rhs = other.num as i64 * self.den as i64;
            lhs.cmp(&rhs)
        })
    }
}

impl PartialOrd for BeatTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for BeatTime {
    type Output = BeatTime;

    fn add(self, rhs: BeatTime) -> BeatTime {
        let den = self.den as i64 * rhs.den as i64;
        let num = self.num as i64 * rhs.den as i64 + rhs.num as i64 * self.den as i64;
        BeatTime::reduced(self.beat as i64 + rhs.beat as i64, num, den)
    }
}

impl Sub for BeatTime {
    type Output = BeatTime;

    fn sub(self, rhs: BeatTime) -> BeatTime {
        let den = self.den as i64 * rhs.den as i64;
        let num = self.num as i64 * rhs.den as i64 - rhs.num as i64 * self.den as i64;
        BeatTime::reduced(self.beat as i64 - rhs.beat as i64, num, den)
    }
}

impl fmt::Display for BeatTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.beat, self.num, self.den)
    }
}

impl TryFrom<(i32, i32, i32)> for BeatTime {
    type Error = Error;

    fn try_from((beat, num, den): (i32, i32, i32)) -> Result<Self, Error> {
        BeatTime::new(beat, num, den)
    }
}

impl From<BeatTime> for (i32, i32, i32) {
    fn from(t: BeatTime) -> Self {
        (t.beat, t.num, t.den)
    }
}
