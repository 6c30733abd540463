//! 재무제표 보고 주기.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::PraiceError;

/// 재무 데이터 보고 주기 (연간/분기).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// 연간
    Annual,
    /// 분기
    Quarterly,
}

impl Period {
    /// 수집 대상 전체 주기.
    pub const ALL: [Period; 2] = [Period::Annual, Period::Quarterly];

    /// 저장용 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Annual => "annual",
            Period::Quarterly => "quarterly",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = PraiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "annual" => Ok(Period::Annual),
            "quarterly" => Ok(Period::Quarterly),
            other => Err(PraiceError::Validation(format!("Invalid period: {}", other))),
        }
    }
}
