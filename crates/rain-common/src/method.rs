//! Value interpolation methods recorded on each timeseries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SyncError;

/// How the values of a timeseries were derived from its upstream sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueMethod {
    /// Copied from a single forecast model
    #[serde(rename = "SF")]
    SingleForecast,
    /// Averaged over several forecast models
    #[serde(rename = "MME")]
    MultiModelEnsemble,
    /// Observed station data
    #[serde(rename = "OBS")]
    Observation,
}

impl ValueMethod {
    /// Abbreviation stored in the `method` column.
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Self::SingleForecast => "SF",
            Self::MultiModelEnsemble => "MME",
            Self::Observation => "OBS",
        }
    }
}

impl FromStr for ValueMethod {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SF" => Ok(Self::SingleForecast),
            "MME" => Ok(Self::MultiModelEnsemble),
            "OBS" => Ok(Self::Observation),
            _ => Err(SyncError::parse("value method", s)),
        }
    }
}

impl fmt::Display for ValueMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbreviation_round_trip() {
        for method in [
            ValueMethod::SingleForecast,
            ValueMethod::MultiModelEnsemble,
            ValueMethod::Observation,
        ] {
            assert_eq!(method.abbreviation().parse::<ValueMethod>().unwrap(), method);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("mme".parse::<ValueMethod>().unwrap(), ValueMethod::MultiModelEnsemble);
        assert!("linear".parse::<ValueMethod>().is_err());
    }

    #[test]
    fn test_serde_uses_abbreviation() {
        let json = serde_json::to_string(&ValueMethod::MultiModelEnsemble).unwrap();
        assert_eq!(json, "\"MME\"");
    }
}
