//! Roulette wheel/ball variant
//!
//! The wheel and the ball are two actors in one session. The ball handle is
//! parented to the wheel, so both land on the same pocket angle in the wheel's
//! own frame: the wheel turns that pocket under the pointer while the ball
//! bounces into it.

use crate::error::SpinError;
use crate::profile::ProfileName;
use crate::sim::SpinOptions;

/// European single-zero pocket order, clockwise from the top
pub const EUROPEAN_POCKETS: [u8; 37] = [
    0, 32, 15, 19, 4, 21, 2, 25, 17, 34, 6, 27, 13, 36, 11, 30, 8, 23, 10, 5, 24, 16, 33, 1, 20,
    14, 31, 9, 22, 18, 29, 7, 28, 12, 35, 3, 26,
];

/// Ball orbit radius while racing around the rim (fraction of wheel radius)
pub const BALL_TRACK_RADIUS: f32 = 0.88;
/// Ball radius once seated in a pocket
pub const BALL_POCKET_RADIUS: f32 = 0.62;

const RED_NUMBERS: [u8; 18] = [1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36];

/// Pocket colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PocketColor {
    Green,
    Red,
    Black,
}

pub fn pocket_color(number: u8) -> PocketColor {
    if number == 0 {
        PocketColor::Green
    } else if RED_NUMBERS.contains(&number) {
        PocketColor::Red
    } else {
        PocketColor::Black
    }
}

/// Pocket labels in wheel order (the shared track of both actors)
pub fn pocket_symbols() -> Vec<String> {
    EUROPEAN_POCKETS.iter().map(|n| n.to_string()).collect()
}

/// Ball orbit radius for a speed fraction (1 = full speed, 0 = at rest)
#[inline]
pub fn ball_radius(speed_fraction: f32) -> f32 {
    let t = speed_fraction.clamp(0.0, 1.0);
    BALL_POCKET_RADIUS + (BALL_TRACK_RADIUS - BALL_POCKET_RADIUS) * t
}

/// Outcomes and options for a wheel + ball spin landing on `number`
///
/// Handles passed to `spin` must be `[wheel, ball]`.
pub fn request(number: u8, seed: Option<u64>) -> Result<(Vec<String>, SpinOptions), SpinError> {
    if !EUROPEAN_POCKETS.contains(&number) {
        return Err(SpinError::UnknownOutcome {
            index: 0,
            outcome: number.to_string(),
        });
    }
    let outcome = number.to_string();
    let options = SpinOptions {
        symbols: pocket_symbols(),
        actor_profiles: vec![ProfileName::RouletteWheel, ProfileName::RouletteBall],
        seed,
        ..SpinOptions::default()
    };
    Ok((vec![outcome.clone(), outcome], options))
}
