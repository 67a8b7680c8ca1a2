//! Selection of the freshest reading from the two sensor endpoints.

use crate::SensorReading;

// ---

/// Reduce a history list to its newest sample.
///
/// On equal timestamps the sample seen first is kept.
pub fn latest_sample<I>(samples: I) -> Option<SensorReading>
where
    I: IntoIterator<Item = SensorReading>,
{
    // ---
    samples.into_iter().fold(None, |best, sample| match best {
        Some(best) if sample.timestamp <= best.timestamp => Some(best),
        _ => Some(sample),
    })
}

/// Pick the later of the newest history sample and the status reading.
///
/// The history sample wins a tie. If only one side has a reading it is
/// returned as-is.
pub fn reconcile(
    history: Option<SensorReading>,
    status: Option<SensorReading>,
) -> Option<SensorReading> {
    // ---
    match (history, status) {
        (Some(history), Some(status)) if status.timestamp > history.timestamp => Some(status),
        (Some(history), _) => Some(history),
        (None, status) => status,
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::{TimeZone, Utc};

    fn create_test_reading(hour: u32, temperature: f64) -> SensorReading {
        // ---
        SensorReading {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            temperature,
            humidity: 40.0,
        }
    }

    #[test]
    fn test_reconcile_returns_later_sample() {
        // ---
        let early = create_test_reading(9, 21.0);
        let late = create_test_reading(10, 20.0);

        assert_eq!(reconcile(Some(late), Some(early)), Some(late));
        assert_eq!(reconcile(Some(early), Some(late)), Some(late));
    }

    #[test]
    fn test_reconcile_tie_keeps_history() {
        // ---
        let history = create_test_reading(10, 20.0);
        let status = create_test_reading(10, 25.0);
        assert_eq!(reconcile(Some(history), Some(status)), Some(history));
    }

    #[test]
    fn test_reconcile_with_one_side_missing() {
        // ---
        let reading = create_test_reading(10, 20.0);
        assert_eq!(reconcile(Some(reading), None), Some(reading));
        assert_eq!(reconcile(None, Some(reading)), Some(reading));
        assert_eq!(reconcile(None, None), None);
    }

    #[test]
    fn test_latest_sample_is_order_independent() {
        // ---
        let a = create_test_reading(8, 18.0);
        let b = create_test_reading(12, 22.0);
        let c = create_test_reading(10, 20.0);

        let orders = [
            [a, b, c],
            [a, c, b],
            [b, a, c],
            [b, c, a],
            [c, a, b],
            [c, b, a],
        ];
        for order in orders {
            assert_eq!(latest_sample(order), Some(b));
        }
    }

    #[test]
    fn test_latest_sample_tie_keeps_first() {
        // ---
        let first = create_test_reading(10, 20.0);
        let second = create_test_reading(10, 30.0);
        assert_eq!(latest_sample([first, second]), Some(first));
    }

    #[test]
    fn test_latest_sample_empty() {
        // ---
        assert_eq!(latest_sample(Vec::new()), None);
    }
}
