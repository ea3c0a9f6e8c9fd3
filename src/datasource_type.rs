use crate::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Query protocol spoken by the configured backend.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasourceType {
    #[default]
    Prometheus,
    Graphite,
}

impl DatasourceType {
    pub const fn name(&self) -> &'static str {
        match self {
            DatasourceType::Prometheus => "prometheus",
            DatasourceType::Graphite => "graphite",
        }
    }

    /// Whether the engine accepts time-range queries.
    pub const fn supports_range_queries(&self) -> bool {
        match self {
            DatasourceType::Prometheus => true,
            DatasourceType::Graphite => false,
        }
    }
}

impl fmt::Display for DatasourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DatasourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prometheus" => Ok(DatasourceType::Prometheus),
            "graphite" => Ok(DatasourceType::Graphite),
            other => Err(Error::UnsupportedEngine(other.to_string())),
        }
    }
}

impl Serialize for DatasourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for DatasourceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(<D::Error as serde::de::Error>::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_known_engines() {
        assert_eq!(
            "prometheus".parse::<DatasourceType>().unwrap(),
            DatasourceType::Prometheus
        );
        assert_eq!(
            "graphite".parse::<DatasourceType>().unwrap(),
            DatasourceType::Graphite
        );
        assert_eq!(DatasourceType::default(), DatasourceType::Prometheus);
    }

    #[test]
    fn unknown_engine_is_named_in_error() {
        let err = "influx".parse::<DatasourceType>().unwrap_err();
        assert!(matches!(&err, Error::UnsupportedEngine(name) if name == "influx"));
        assert!(err.to_string().contains("\"influx\""), "{err}");
    }

    #[test]
    fn deserialize_by_name() {
        let t: DatasourceType = serde_json::from_str("\"graphite\"").unwrap();
        assert_eq!(t, DatasourceType::Graphite);
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"graphite\"");
        assert!(serde_json::from_str::<DatasourceType>("\"Graphite\"").is_err());
    }
}
