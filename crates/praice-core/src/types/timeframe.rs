//! 기술적 분석 타임프레임 정의.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::PraiceError;

/// 기술적 분석 봉 단위.
///
/// 저장 형식은 `1D`, `1W`, `1M`이며 소문자 별칭도 파싱합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Timeframe {
    /// 일봉
    #[default]
    #[serde(rename = "1D")]
    D1,
    /// 주봉
    #[serde(rename = "1W")]
    W1,
    /// 월봉
    #[serde(rename = "1M")]
    MN1,
}

impl Timeframe {
    /// 저장용 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::D1 => "1D",
            Timeframe::W1 => "1W",
            Timeframe::MN1 => "1M",
        }
    }

    /// Yahoo Finance 간격 문자열.
    pub fn to_yahoo_interval(&self) -> &'static str {
        match self {
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1wk",
            Timeframe::MN1 => "1mo",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = PraiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1D" | "1d" => Ok(Timeframe::D1),
            "1W" | "1w" => Ok(Timeframe::W1),
            "1M" | "1m" => Ok(Timeframe::MN1),
            other => Err(PraiceError::Validation(format!(
                "Invalid timeframe: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_parse() {
        assert_eq!("1D".parse::<Timeframe>().unwrap(), Timeframe::D1);
        assert_eq!("1w".parse::<Timeframe>().unwrap(), Timeframe::W1);
        assert_eq!("1M".parse::<Timeframe>().unwrap(), Timeframe::MN1);
        assert!("5m".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_timeframe_default_and_display() {
        assert_eq!(Timeframe::default(), Timeframe::D1);
        assert_eq!(Timeframe::W1.to_string(), "1W");
        assert_eq!(Timeframe::MN1.to_yahoo_interval(), "1mo");
    }
}
