//! 자산 클래스.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::PraiceError;

/// 심볼의 자산 클래스.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    /// 주식
    #[default]
    Stock,
    /// 원자재
    Commodity,
    /// 통화
    Currency,
    /// 암호화폐
    Crypto,
    /// ETF
    Etf,
    /// 지수
    Index,
    /// 채권
    Bond,
    /// 뮤추얼 펀드
    MutualFund,
    /// 선물
    Futures,
    /// 옵션
    Option,
}

impl AssetClass {
    /// 저장용 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Stock => "stock",
            AssetClass::Commodity => "commodity",
            AssetClass::Currency => "currency",
            AssetClass::Crypto => "crypto",
            AssetClass::Etf => "etf",
            AssetClass::Index => "index",
            AssetClass::Bond => "bond",
            AssetClass::MutualFund => "mutualfund",
            AssetClass::Futures => "futures",
            AssetClass::Option => "option",
        }
    }

    /// Yahoo Finance `quoteType`에서 자산 클래스를 결정합니다.
    ///
    /// 알 수 없는 타입이거나 값이 없으면 `Stock`을 반환합니다.
    pub fn from_quote_type(quote_type: Option<&str>) -> Self {
        match quote_type.map(|t| t.to_lowercase()).as_deref() {
            Some("equity") => AssetClass::Stock,
            Some("future") => AssetClass::Futures,
            Some("etf") => AssetClass::Etf,
            Some("mutualfund") => AssetClass::MutualFund,
            Some("currency") => AssetClass::Currency,
            Some("commodity") => AssetClass::Commodity,
            _ => AssetClass::Stock,
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = PraiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stock" => Ok(AssetClass::Stock),
            "commodity" => Ok(AssetClass::Commodity),
            "currency" => Ok(AssetClass::Currency),
            "crypto" => Ok(AssetClass::Crypto),
            "etf" => Ok(AssetClass::Etf),
            "index" => Ok(AssetClass::Index),
            "bond" => Ok(AssetClass::Bond),
            "mutualfund" => Ok(AssetClass::MutualFund),
            "futures" => Ok(AssetClass::Futures),
            "option" => Ok(AssetClass::Option),
            other => Err(PraiceError::Validation(format!(
                "Invalid asset class: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_quote_type() {
        assert_eq!(AssetClass::from_quote_type(Some("EQUITY")), AssetClass::Stock);
        assert_eq!(AssetClass::from_quote_type(Some("FUTURE")), AssetClass::Futures);
        assert_eq!(AssetClass::from_quote_type(Some("ETF")), AssetClass::Etf);
        assert_eq!(
            AssetClass::from_quote_type(Some("MUTUALFUND")),
            AssetClass::MutualFund
        );
        assert_eq!(AssetClass::from_quote_type(Some("INDEX")), AssetClass::Stock);
        assert_eq!(AssetClass::from_quote_type(None), AssetClass::Stock);
    }

    #[test]
    fn test_asset_class_parse() {
        assert_eq!("ETF".parse::<AssetClass>().unwrap(), AssetClass::Etf);
        assert_eq!("crypto".parse::<AssetClass>().unwrap(), AssetClass::Crypto);
        assert!("warrant".parse::<AssetClass>().is_err());
        for class in [AssetClass::Bond, AssetClass::MutualFund, AssetClass::Option] {
            assert_eq!(class.as_str().parse::<AssetClass>().unwrap(), class);
        }
    }
}
