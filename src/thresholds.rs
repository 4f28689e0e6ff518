use std::collections::BTreeMap;

/// Inclusive acceptable range for a single sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdRange {
    pub low: f64,
    pub high: f64,
}

impl ThresholdRange {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

/// Recommended ranges for the compost tank sensors, keyed by `sensors.sensorid`.
const COMPOST_THRESHOLDS: &[(i32, ThresholdRange)] = &[
    (1, ThresholdRange::new(2121.0, 3303.0)), // CO2
    (4, ThresholdRange::new(818.0, 964.0)),   // CH4
    (8, ThresholdRange::new(28.0, 29.0)),     // Soil Temperature
    (9, ThresholdRange::new(47.0, 80.0)),     // Soil Moisture
    (10, ThresholdRange::new(4.7, 6.0)),      // Soil pH
    (11, ThresholdRange::new(1298.0, 1958.0)), // Soil EC
    (12, ThresholdRange::new(298.0, 372.0)),  // Soil Nitrogen
    (13, ThresholdRange::new(519.0, 901.0)),  // Soil Phosphorus
    (14, ThresholdRange::new(10.0, 50.0)),    // Soil Potassium
];

/// Read-only map from sensor id to its acceptable range.
///
/// A sensor without an entry is simply not monitored.
#[derive(Debug, Clone)]
pub struct ThresholdRegistry {
    ranges: BTreeMap<i32, ThresholdRange>,
}

impl ThresholdRegistry {
    pub fn compost() -> Self {
        Self::from_entries(COMPOST_THRESHOLDS.iter().copied())
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (i32, ThresholdRange)>) -> Self {
        Self {
            ranges: entries.into_iter().collect(),
        }
    }

    pub fn lookup(&self, sensor_id: i32) -> Option<ThresholdRange> {
        self.ranges.get(&sensor_id).copied()
    }

    /// All entries in ascending sensor-id order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, ThresholdRange)> + '_ {
        self.ranges.iter().map(|(id, range)| (*id, *range))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }
}
