use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Routing values accepted by the HenrikDev match and MMR endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Eu,
    Na,
    Ap,
    Kr,
    Latam,
    Br,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eu => "eu",
            Self::Na => "na",
            Self::Ap => "ap",
            Self::Kr => "kr",
            Self::Latam => "latam",
            Self::Br => "br",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Eu => "Europe",
            Self::Na => "North America",
            Self::Ap => "Asia Pacific",
            Self::Kr => "Korea",
            Self::Latam => "Latin America",
            Self::Br => "Brazil",
        }
    }
}

impl FromStr for Region {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eu" => Ok(Self::Eu),
            "na" => Ok(Self::Na),
            "ap" => Ok(Self::Ap),
            "kr" => Ok(Self::Kr),
            "latam" => Ok(Self::Latam),
            "br" => Ok(Self::Br),
            _ => Err(AppError::InvalidRegion(s.to_string())),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
