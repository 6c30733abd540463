//! 심볼 및 심볼별 수집 설정.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::text::title_case;
use crate::{AssetClass, PraiceError, PraiceResult};

/// 심볼 코드 최대 길이.
pub const MAX_SYMBOL_LEN: usize = 10;

/// 저장된 심볼.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: i64,
    /// 대문자 심볼 코드 (고유)
    pub symbol: String,
    pub name: String,
    pub asset_class: AssetClass,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub exchange: Option<String>,
    /// 스케줄 수집 대상 여부
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 심볼 코드를 정규화합니다 (공백 제거 후 대문자).
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// 심볼 코드를 정규화하고 형식을 검증합니다.
pub fn validate_code(code: &str) -> PraiceResult<String> {
    let normalized = normalize_code(code);
    if normalized.is_empty() {
        return Err(PraiceError::Validation("symbol code is empty".to_string()));
    }
    if normalized.chars().count() > MAX_SYMBOL_LEN {
        return Err(PraiceError::Validation(format!(
            "symbol code '{}' exceeds {} characters",
            normalized, MAX_SYMBOL_LEN
        )));
    }
    Ok(normalized)
}

fn normalize_opt(value: Option<String>, f: fn(&str) -> String) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(|v| f(&v))
}

fn upper(value: &str) -> String {
    value.to_uppercase()
}

/// 새 심볼 생성 요청.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSymbol {
    pub symbol: String,
    pub name: String,
    pub asset_class: AssetClass,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub exchange: Option<String>,
}

impl NewSymbol {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>, asset_class: AssetClass) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            asset_class,
            sector: None,
            industry: None,
            exchange: None,
        }
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }

    /// 저장 전 정규화를 적용합니다.
    ///
    /// 코드와 거래소는 대문자, 이름/섹터/산업은 타이틀 케이스로 변환됩니다.
    pub fn normalized(self) -> PraiceResult<Self> {
        let symbol = validate_code(&self.symbol)?;
        let name = title_case(self.name.trim());
        if name.is_empty() {
            return Err(PraiceError::Validation(format!(
                "symbol '{}' has an empty name",
                symbol
            )));
        }

        Ok(Self {
            symbol,
            name,
            asset_class: self.asset_class,
            sector: normalize_opt(self.sector, title_case),
            industry: normalize_opt(self.industry, title_case),
            exchange: normalize_opt(self.exchange, upper),
        })
    }
}

/// 심볼 부분 업데이트. `None`인 필드는 변경하지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolUpdate {
    pub name: Option<String>,
    pub asset_class: Option<AssetClass>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub exchange: Option<String>,
    pub is_active: Option<bool>,
}

impl SymbolUpdate {
    /// 활성 플래그만 변경하는 업데이트.
    pub fn active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// 정규화된 값을 심볼에 적용합니다.
    pub fn apply_to(&self, symbol: &mut Symbol) {
        if let Some(name) = normalize_opt(self.name.clone(), title_case) {
            symbol.name = name;
        }
        if let Some(asset_class) = self.asset_class {
            symbol.asset_class = asset_class;
        }
        if self.sector.is_some() {
            symbol.sector = normalize_opt(self.sector.clone(), title_case);
        }
        if self.industry.is_some() {
            symbol.industry = normalize_opt(self.industry.clone(), title_case);
        }
        if self.exchange.is_some() {
            symbol.exchange = normalize_opt(self.exchange.clone(), upper);
        }
        if let Some(is_active) = self.is_active {
            symbol.is_active = is_active;
        }
    }
}

/// 심볼별 수집 대상 설정 (심볼과 1:1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolConfig {
    pub id: i64,
    pub symbol_id: i64,
    pub collect_price_data: bool,
    pub collect_yfinance_news: bool,
    pub collect_technical_indicators: bool,
    pub collect_fundamental_data: bool,
}

impl SymbolConfig {
    /// 모든 수집 플래그가 켜진 기본 설정.
    pub fn defaults(id: i64, symbol_id: i64) -> Self {
        Self {
            id,
            symbol_id,
            collect_price_data: true,
            collect_yfinance_news: true,
            collect_technical_indicators: true,
            collect_fundamental_data: true,
        }
    }
}

/// 수집 설정 부분 업데이트.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolConfigUpdate {
    pub collect_price_data: Option<bool>,
    pub collect_yfinance_news: Option<bool>,
    pub collect_technical_indicators: Option<bool>,
    pub collect_fundamental_data: Option<bool>,
}

impl SymbolConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// 값을 적용하고 실제로 변경되었는지 반환합니다.
    pub fn apply_to(&self, config: &mut SymbolConfig) -> bool {
        let before = config.clone();
        if let Some(v) = self.collect_price_data {
            config.collect_price_data = v;
        }
        if let Some(v) = self.collect_yfinance_news {
            config.collect_yfinance_news = v;
        }
        if let Some(v) = self.collect_technical_indicators {
            config.collect_technical_indicators = v;
        }
        if let Some(v) = self.collect_fundamental_data {
            config.collect_fundamental_data = v;
        }
        before != *config
    }
}

/// 외부 조회로 얻은 심볼 메타데이터.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub quote_type: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub exchange: Option<String>,
}

impl SymbolInfo {
    /// 조회 결과를 새 심볼 요청으로 변환합니다.
    ///
    /// 이름은 longName → shortName → "Unknown" 순으로 선택합니다.
    pub fn into_new_symbol(self, code: &str) -> NewSymbol {
        let name = self
            .long_name
            .or(self.short_name)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Unknown".to_string());

        NewSymbol {
            symbol: code.to_string(),
            name,
            asset_class: AssetClass::from_quote_type(self.quote_type.as_deref()),
            sector: self.sector,
            industry: self.industry,
            exchange: self.exchange,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_symbol() -> Symbol {
        let now = Utc::now();
        Symbol {
            id: 1,
            symbol: "MSFT".to_string(),
            name: "Microsoft".to_string(),
            asset_class: AssetClass::Stock,
            sector: Some("Technology".to_string()),
            industry: None,
            exchange: Some("NMS".to_string()),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_new_symbol_normalization() {
        let new = NewSymbol::new(" msft", "microsoft corporation", AssetClass::Stock)
            .with_sector("technology")
            .with_industry("software-infrastructure")
            .with_exchange("nms")
            .normalized()
            .unwrap();

        assert_eq!(new.symbol, "MSFT");
        assert_eq!(new.name, "Microsoft Corporation");
        assert_eq!(new.sector.as_deref(), Some("Technology"));
        assert_eq!(new.industry.as_deref(), Some("Software-Infrastructure"));
        assert_eq!(new.exchange.as_deref(), Some("NMS"));
    }

    #[test]
    fn test_new_symbol_validation() {
        assert!(NewSymbol::new("", "x", AssetClass::Stock).normalized().is_err());
        assert!(NewSymbol::new("TOOLONGCODE1", "x", AssetClass::Stock)
            .normalized()
            .is_err());
        assert!(NewSymbol::new("AAPL", "  ", AssetClass::Stock)
            .normalized()
            .is_err());
    }

    #[test]
    fn test_symbol_update_apply() {
        let mut symbol = sample_symbol();
        let update = SymbolUpdate {
            sector: Some("information technology".to_string()),
            exchange: Some("nasdaq".to_string()),
            ..Default::default()
        };
        update.apply_to(&mut symbol);

        assert_eq!(symbol.sector.as_deref(), Some("Information Technology"));
        assert_eq!(symbol.exchange.as_deref(), Some("NASDAQ"));
        assert_eq!(symbol.name, "Microsoft");

        SymbolUpdate::active(false).apply_to(&mut symbol);
        assert!(!symbol.is_active);
    }

    #[test]
    fn test_config_update_reports_change() {
        let mut config = SymbolConfig::defaults(1, 1);
        let update = SymbolConfigUpdate {
            collect_yfinance_news: Some(false),
            ..Default::default()
        };
        assert!(update.apply_to(&mut config));
        assert!(!config.collect_yfinance_news);
        assert!(!update.apply_to(&mut config));
    }

    #[test]
    fn test_symbol_info_name_fallback() {
        let info = SymbolInfo {
            symbol: "BTC-USD".to_string(),
            short_name: Some("Bitcoin USD".to_string()),
            quote_type: Some("CRYPTOCURRENCY".to_string()),
            ..Default::default()
        };
        let new = info.into_new_symbol("BTC-USD");
        assert_eq!(new.name, "Bitcoin USD");
        assert_eq!(new.asset_class, AssetClass::Stock);

        let empty = SymbolInfo::default().into_new_symbol("XYZ");
        assert_eq!(empty.name, "Unknown");
    }
}
