//! Batch distance ranking with optional parallelism.
//!
//! Used to answer "which tracked worker is closest to this point" over the
//! registry's current positions.

use crate::{distance, Coordinate};
use serde::Serialize;

/// One ranked item: the caller's identifier plus its distance in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ranked<I> {
    /// Caller-supplied identifier
    pub id: I,
    /// Distance to the target in meters (infinite if the item's coordinate is invalid)
    pub distance_m: f64,
}

/// Ranks `items` by distance to `target`, closest first.
///
/// Items whose coordinate is invalid sort last with an infinite distance.
/// `limit` truncates the result after sorting.
///
/// ```
/// use taskroute_geo::{rank_by_distance, Coordinate};
///
/// let target = Coordinate::new(14.5547, 121.0244);
/// let items = vec![
///     (1, Coordinate::new(14.6760, 121.0437)),
///     (2, Coordinate::new(14.5509, 121.0503)),
/// ];
///
/// let ranked = rank_by_distance(target, &items, None);
/// assert_eq!(ranked[0].id, 2);
/// ```
pub fn rank_by_distance<I>(target: Coordinate, items: &[(I, Coordinate)], limit: Option<usize>) -> Vec<Ranked<I>>
where
    I: Copy + Send + Sync,
{
    let mut results = measure_all(target, items);

    results.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));

    if let Some(max) = limit {
        results.truncate(max);
    }

    results
}

fn measure_all<I>(target: Coordinate, items: &[(I, Coordinate)]) -> Vec<Ranked<I>>
where
    I: Copy + Send + Sync,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        items
            .par_iter()
            .map(|(id, coord)| measure_one(target, *id, *coord))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        items
            .iter()
            .map(|(id, coord)| measure_one(target, *id, *coord))
            .collect()
    }
}

#[inline]
fn measure_one<I>(target: Coordinate, id: I, coord: Coordinate) -> Ranked<I> {
    Ranked {
        id,
        distance_m: distance(Some(target), Some(coord)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<(i64, Coordinate)> {
        vec![
            (1, Coordinate::new(14.6760, 121.0437)), // Quezon City
            (2, Coordinate::new(14.5509, 121.0503)), // BGC
            (3, Coordinate::new(f64::NAN, 0.0)),     // garbage
            (4, Coordinate::new(14.5995, 120.9842)), // Manila
        ]
    }

    #[test]
    fn test_sorted_closest_first() {
        let target = Coordinate::new(14.5547, 121.0244);
        let ranked = rank_by_distance(target, &items(), None);
        let order: Vec<i64> = ranked.iter().map(|r| r.id).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);
        assert!(ranked[3].distance_m.is_infinite());
    }

    #[test]
    fn test_limit_truncates_after_sort() {
        let target = Coordinate::new(14.5547, 121.0244);
        let ranked = rank_by_distance(target, &items(), Some(1));
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, 2);
    }

    #[test]
    fn test_empty_input() {
        let ranked = rank_by_distance::<i64>(Coordinate::new(0.0, 0.0), &[], Some(5));
        assert!(ranked.is_empty());
    }
}
