use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum CalcType {
    #[default]
    Sum,
    Avg,
}

impl CalcType {
    pub fn from_stored(raw: i64) -> Self {
        match raw {
            1 => Self::Avg,
            _ => Self::Sum,
        }
    }

    pub fn as_stored(self) -> i64 {
        match self {
            Self::Sum => 0,
            Self::Avg => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Avg => "avg",
        }
    }
}

impl FromStr for CalcType {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "avg" | "average" => Ok(Self::Avg),
            _ => Err(TallyError::Parse(format!("unknown calc type: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metric {
    pub id: i64,
    pub name: String,
    pub suffix: String,
    pub description: String,
    pub calc_type: CalcType,
    pub default_value: f64,
    pub places: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMetric {
    pub name: String,
    pub suffix: String,
    pub description: String,
    pub calc_type: CalcType,
    pub default_value: f64,
    pub places: u32,
}

impl NewMetric {
    pub fn with_id(self, id: i64) -> Metric {
        Metric {
            id,
            name: self.name,
            suffix: self.suffix,
            description: self.description,
            calc_type: self.calc_type,
            default_value: self.default_value,
            places: self.places,
        }
    }
}
