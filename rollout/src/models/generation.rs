//! Node generations and resource kinds

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role a node holds in a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    /// Serving live traffic
    Active,

    /// Next candidate generation
    Pending,

    /// Being decommissioned
    Old,
}

impl Generation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Generation::Active => "active",
            Generation::Pending => "pending",
            Generation::Old => "old",
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Generation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Generation::Active),
            "pending" => Ok(Generation::Pending),
            "old" => Ok(Generation::Old),
            _ => Err(format!("Invalid generation: {}", s)),
        }
    }
}

/// Kind of cloud resource a deployer manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AwsType {
    Ec2,
    Rds,
}

impl AwsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AwsType::Ec2 => "ec2",
            AwsType::Rds => "rds",
        }
    }
}

impl fmt::Display for AwsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
