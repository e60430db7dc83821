/// In-memory telemetry store for one flight.
///
/// Keyed by frame identifier, so a live packet repeating a frame already
/// loaded from history replaces it rather than duplicating it. Retrieval is
/// always a snapshot ordered by descending pressure (surface first).

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::{FrameKey, NormalizedFrame};

#[derive(Debug, Clone, Default)]
pub struct TelemetryStore {
    frames: HashMap<FrameKey, NormalizedFrame>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a frame by key. Returns `true` if the key is new.
    pub fn upsert(&mut self, frame: NormalizedFrame) -> bool {
        self.frames.insert(frame.key.clone(), frame).is_none()
    }

    pub fn get(&self, key: &FrameKey) -> Option<&NormalizedFrame> {
        self.frames.get(key)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Every stored frame, highest pressure first.
    ///
    /// Equal pressures fall back to timestamp then key so the order is
    /// stable between calls.
    pub fn ordered_by_pressure_descending(&self) -> Vec<NormalizedFrame> {
        let mut frames: Vec<NormalizedFrame> = self.frames.values().cloned().collect();
        frames.sort_by(|a, b| {
            b.pressure
                .total_cmp(&a.pressure)
                .then_with(|| a.datetime.cmp(&b.datetime))
                .then_with(|| a.key.cmp(&b.key))
        });
        frames
    }
}

/// Keeps every `factor`-th element plus the last one.
///
/// The first and last elements always survive. A factor of 0 or 1 returns
/// the input unchanged. Used only to bound rendering cost.
pub fn decimate<T: Clone>(items: &[T], factor: usize) -> Vec<T> {
    if items.is_empty() || factor <= 1 {
        return items.to_vec();
    }
    let mut out: Vec<T> = items.iter().step_by(factor).cloned().collect();
    if (items.len() - 1) % factor != 0 {
        if let Some(last) = items.last() {
            out.push(last.clone());
        }
    }
    out
}

/// Descending total order over pressures, NaN-safe.
pub(crate) fn pressure_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(key: i64, pressure: f64, temp: f64) -> NormalizedFrame {
        NormalizedFrame {
            key: FrameKey::Number(key),
            temp,
            humidity: 50.0,
            dewpoint: temp - 10.0,
            pressure,
            altitude: None,
            datetime: None,
            lat: None,
            lon: None,
            wind_dir: None,
            wind_speed: None,
            vel_v: Some(5.0),
        }
    }

    #[test]
    fn test_upsert_same_key_overwrites_in_place() {
        let mut store = TelemetryStore::new();
        assert!(store.upsert(sample(1, 900.0, 10.0)));
        assert!(!store.upsert(sample(1, 900.0, 11.5)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&FrameKey::Number(1)).map(|f| f.temp), Some(11.5));
    }

    #[test]
    fn test_ordered_snapshot_is_surface_first() {
        let mut store = TelemetryStore::new();
        store.upsert(sample(3, 500.0, -15.0));
        store.upsert(sample(1, 1000.0, 20.0));
        store.upsert(sample(2, 850.0, 8.0));
        let pressures: Vec<f64> = store
            .ordered_by_pressure_descending()
            .iter()
            .map(|f| f.pressure)
            .collect();
        assert_eq!(pressures, vec![1000.0, 850.0, 500.0]);
    }

    #[test]
    fn test_clear_empties_store() {
        let mut store = TelemetryStore::new();
        store.upsert(sample(1, 900.0, 10.0));
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_decimate_keeps_stride_and_endpoints() {
        let items: Vec<i32> = (0..10).collect();
        assert_eq!(decimate(&items, 4), vec![0, 4, 8, 9]);
        assert_eq!(decimate(&items, 3), vec![0, 3, 6, 9]);
        assert_eq!(decimate(&items, 1), items);
        assert_eq!(decimate(&items, 0), items);
        assert_eq!(decimate::<i32>(&[], 5), Vec::<i32>::new());
        assert_eq!(decimate(&[7], 5), vec![7]);
    }

    #[test]
    fn test_pressure_desc_orders_high_first() {
        assert_eq!(pressure_desc(1000.0, 500.0), Ordering::Less);
        assert_eq!(pressure_desc(500.0, 1000.0), Ordering::Greater);

        let mut pressures = vec![500.0, f64::NAN, 1000.0, 850.0];
        pressures.sort_by(|a, b| pressure_desc(*a, *b));
        assert!(pressures[0].is_nan(), "positive NaN sorts ahead under a descending total order");
        assert_eq!(&pressures[1..], &[1000.0, 850.0, 500.0]);
    }

    proptest! {
        #[test]
        fn prop_decimate_retains_endpoints(n in 1usize..500, factor in 1usize..40) {
            let items: Vec<usize> = (0..n).collect();
            let out = decimate(&items, factor);
            prop_assert_eq!(out.first(), items.first());
            prop_assert_eq!(out.last(), items.last());
            // Stride samples plus, at most, the appended last element
            prop_assert!(out.len() <= n.div_ceil(factor) + 1);
        }

        #[test]
        fn prop_reinsert_keeps_size(keys in proptest::collection::vec(0i64..50, 1..200)) {
            let mut store = TelemetryStore::new();
            for k in &keys {
                store.upsert(sample(*k, 900.0, 10.0));
            }
            let distinct: std::collections::HashSet<_> = keys.iter().collect();
            prop_assert_eq!(store.len(), distinct.len());
        }
    }
}
