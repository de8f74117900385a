//! Recompute-or-reuse decision, free of timers and I/O

use serde::{Deserialize, Serialize};
use taskroute_geo::{distance, Coordinate};

/// Distance thresholds in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Closer than this to the destination counts as arrived
    pub arrival_m: f64,
    /// Movement below this reuses the cached route
    pub hysteresis_m: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            arrival_m: 10.0,
            hysteresis_m: 20.0,
        }
    }
}

/// Outcome of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No known position: drop the route and the last origin
    NoPosition,
    /// At the destination: drop the route, remember the origin
    Arrived,
    /// Within the hysteresis band of a cached route
    Reuse,
    /// Schedule a debounced provider request
    Recompute,
}

/// Decide what to do for the current inputs
pub fn decide(
    origin: Option<Coordinate>,
    destination: Coordinate,
    last_origin: Option<Coordinate>,
    has_route: bool,
    thresholds: &Thresholds,
) -> Decision {
    let Some(origin) = origin else {
        return Decision::NoPosition;
    };

    if distance(Some(origin), Some(destination)) < thresholds.arrival_m {
        return Decision::Arrived;
    }

    // An absent last origin is infinitely far away.
    if has_route && distance(last_origin, Some(origin)) < thresholds.hysteresis_m {
        return Decision::Reuse;
    }

    Decision::Recompute
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DEST: Coordinate = Coordinate {
        latitude: 14.5547,
        longitude: 121.0244,
    };

    /// Roughly `meters` north of `c`
    fn north(c: Coordinate, meters: f64) -> Coordinate {
        Coordinate::new(c.latitude + meters / 111_195.0, c.longitude)
    }

    #[test]
    fn test_no_position() {
        let d = decide(None, DEST, Some(north(DEST, 500.0)), true, &Thresholds::default());
        assert_eq!(d, Decision::NoPosition);
    }

    #[test]
    fn test_arrived_regardless_of_cache() {
        let origin = north(DEST, 5.0);
        for has_route in [false, true] {
            let d = decide(Some(origin), DEST, Some(north(DEST, 900.0)), has_route, &Thresholds::default());
            assert_eq!(d, Decision::Arrived);
        }
    }

    #[test]
    fn test_jitter_reuses_route() {
        let last = north(DEST, 1_000.0);
        let d = decide(Some(north(last, 12.0)), DEST, Some(last), true, &Thresholds::default());
        assert_eq!(d, Decision::Reuse);
    }

    #[test]
    fn test_jitter_without_route_recomputes() {
        let last = north(DEST, 1_000.0);
        let d = decide(Some(north(last, 12.0)), DEST, Some(last), false, &Thresholds::default());
        assert_eq!(d, Decision::Recompute);
    }

    #[test]
    fn test_real_movement_recomputes() {
        let last = north(DEST, 1_000.0);
        let d = decide(Some(north(last, 25.0)), DEST, Some(last), true, &Thresholds::default());
        assert_eq!(d, Decision::Recompute);
    }

    #[test]
    fn test_first_evaluation_recomputes() {
        let d = decide(Some(north(DEST, 300.0)), DEST, None, false, &Thresholds::default());
        assert_eq!(d, Decision::Recompute);
    }

    proptest! {
        #[test]
        fn prop_inside_arrival_radius_never_routes(meters in 0.0f64..9.5, has_route: bool) {
            let d = decide(Some(north(DEST, meters)), DEST, None, has_route, &Thresholds::default());
            prop_assert_eq!(d, Decision::Arrived);
        }

        #[test]
        fn prop_inside_band_with_route_reuses(base in 50.0f64..5_000.0, jitter in 0.0f64..19.0) {
            let last = north(DEST, base);
            let d = decide(Some(north(last, jitter)), DEST, Some(last), true, &Thresholds::default());
            prop_assert_eq!(d, Decision::Reuse);
        }
    }
}
