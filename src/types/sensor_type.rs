//! Defines the five sensor types reported by the environment API and the
//! aggregation rule applied when several readings land in the same hour.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// Number of sensor types stacked into every training example.
pub const SENSOR_COUNT: usize = 5;

/// A measured weather variable.
///
/// The declaration order is the stacking order of the feature tensor:
/// rainfall first (it is also the forecast target), then relative humidity,
/// wind direction, wind speed and air temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SensorType {
    /// Rainfall in millimetres. Summed within an hour.
    Rainfall,
    /// Relative humidity in percent.
    RelativeHumidity,
    /// Wind direction in degrees.
    WindDirection,
    /// Wind speed in knots.
    WindSpeed,
    /// Air temperature in degrees Celsius.
    AirTemperature,
}

/// How multiple readings for one station-hour collapse into a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
}

impl SensorType {
    /// All sensor types in feature-stacking order.
    pub const ALL: [SensorType; SENSOR_COUNT] = [
        SensorType::Rainfall,
        SensorType::RelativeHumidity,
        SensorType::WindDirection,
        SensorType::WindSpeed,
        SensorType::AirTemperature,
    ];

    /// The sensor type whose forecast-window sum is the training target.
    pub const TARGET: SensorType = SensorType::Rainfall;

    /// Endpoint path below the API base url. Also used as the `data_type`
    /// tag of persisted records.
    pub fn path_segment(&self) -> &'static str {
        match self {
            SensorType::Rainfall => "environment/rainfall",
            SensorType::RelativeHumidity => "environment/relative-humidity",
            SensorType::WindDirection => "environment/wind-direction",
            SensorType::WindSpeed => "environment/wind-speed",
            SensorType::AirTemperature => "environment/air-temperature",
        }
    }

    pub fn aggregation(&self) -> Aggregation {
        match self {
            SensorType::Rainfall => Aggregation::Sum,
            _ => Aggregation::Mean,
        }
    }

    /// Position of this sensor type in [`SensorType::ALL`].
    pub fn index(&self) -> usize {
        match self {
            SensorType::Rainfall => 0,
            SensorType::RelativeHumidity => 1,
            SensorType::WindDirection => 2,
            SensorType::WindSpeed => 3,
            SensorType::AirTemperature => 4,
        }
    }
}

/// Formats a `SensorType` using its `path_segment`.
///
/// # Examples
///
/// ```
/// use weather_windows::SensorType;
///
/// assert_eq!(SensorType::WindSpeed.to_string(), "environment/wind-speed");
/// ```
impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown sensor type '{0}'")]
pub struct UnknownSensorType(pub String);

/// Parses either the full path segment (`environment/rainfall`) or the bare
/// endpoint name (`rainfall`).
impl FromStr for SensorType {
    type Err = UnknownSensorType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('/');
        let name = trimmed.strip_prefix("environment/").unwrap_or(trimmed);
        match name {
            "rainfall" => Ok(SensorType::Rainfall),
            "relative-humidity" => Ok(SensorType::RelativeHumidity),
            "wind-direction" => Ok(SensorType::WindDirection),
            "wind-speed" => Ok(SensorType::WindSpeed),
            "air-temperature" => Ok(SensorType::AirTemperature),
            _ => Err(UnknownSensorType(s.to_string())),
        }
    }
}

/// One value per sensor type, indexable by [`SensorType`].
#[derive(Debug, Clone, PartialEq)]
pub struct PerSensor<T>([T; SENSOR_COUNT]);

impl<T> PerSensor<T> {
    pub fn from_fn(mut f: impl FnMut(SensorType) -> T) -> Self {
        let [a, b, c, d, e] = SensorType::ALL;
        PerSensor([f(a), f(b), f(c), f(d), f(e)])
    }

    pub fn try_from_fn<E>(mut f: impl FnMut(SensorType) -> Result<T, E>) -> Result<Self, E> {
        let [a, b, c, d, e] = SensorType::ALL;
        Ok(PerSensor([f(a)?, f(b)?, f(c)?, f(d)?, f(e)?]))
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> PerSensor<U> {
        PerSensor(self.0.map(&mut f))
    }

    /// Iterates `(sensor, value)` pairs in stacking order.
    pub fn iter(&self) -> impl Iterator<Item = (SensorType, &T)> {
        SensorType::ALL.into_iter().zip(self.0.iter())
    }

    pub fn into_inner(self) -> [T; SENSOR_COUNT] {
        self.0
    }
}

impl<T> Index<SensorType> for PerSensor<T> {
    type Output = T;

    fn index(&self, sensor: SensorType) -> &T {
        &self.0[sensor.index()]
    }
}

impl<T> IndexMut<SensorType> for PerSensor<T> {
    fn index_mut(&mut self, sensor: SensorType) -> &mut T {
        &mut self.0[sensor.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_all_order() {
        for (i, sensor) in SensorType::ALL.iter().enumerate() {
            assert_eq!(sensor.index(), i);
        }
        assert_eq!(SensorType::TARGET, SensorType::ALL[0]);
    }

    #[test]
    fn test_only_rainfall_is_summed() {
        for sensor in SensorType::ALL {
            let expected = if sensor == SensorType::Rainfall {
                Aggregation::Sum
            } else {
                Aggregation::Mean
            };
            assert_eq!(sensor.aggregation(), expected, "{}", sensor);
        }
    }

    #[test]
    fn test_parse_path_segment_and_bare_name() {
        for sensor in SensorType::ALL {
            assert_eq!(sensor.path_segment().parse::<SensorType>(), Ok(sensor));
        }
        assert_eq!("wind-speed".parse(), Ok(SensorType::WindSpeed));
        assert_eq!(
            "/environment/air-temperature".parse(),
            Ok(SensorType::AirTemperature)
        );
        assert!("environment/pm25".parse::<SensorType>().is_err());
    }

    #[test]
    fn test_per_sensor_try_from_fn_short_circuits() {
        let mut seen = Vec::new();
        let result: Result<PerSensor<u8>, SensorType> = PerSensor::try_from_fn(|sensor| {
            seen.push(sensor);
            if sensor == SensorType::WindDirection {
                Err(sensor)
            } else {
                Ok(1)
            }
        });
        assert_eq!(result, Err(SensorType::WindDirection));
        assert_eq!(seen.len(), 3);
    }
}
