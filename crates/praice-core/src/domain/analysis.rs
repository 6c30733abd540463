//! 기술적 분석 결과.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Timeframe;

/// 날짜 하나에 대한 지표/캔들 패턴 값.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaEntry {
    /// 지표명 → 숫자 또는 null
    pub technical_indicators: Map<String, Value>,
    /// `CDL*` 패턴명 → +100/-100/0 또는 null
    pub candlestick_patterns: Map<String, Value>,
}

impl TaEntry {
    pub fn is_empty(&self) -> bool {
        self.technical_indicators.is_empty() && self.candlestick_patterns.is_empty()
    }
}

/// 저장된 기술적 분석 행 (`(symbol_id, date, timeframe)` 고유).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
    pub symbol_id: i64,
    pub date: NaiveDate,
    pub timeframe: Timeframe,
    pub technical_indicators: Map<String, Value>,
    pub candlestick_patterns: Map<String, Value>,
}

impl TechnicalAnalysis {
    /// 새 값의 키를 기존 JSON 객체에 병합합니다 (덮어쓰기 아님).
    pub fn merge(&mut self, entry: &TaEntry) {
        merge_json_object(&mut self.technical_indicators, &entry.technical_indicators);
        merge_json_object(&mut self.candlestick_patterns, &entry.candlestick_patterns);
    }
}

/// `incoming`의 키를 `target`에 덮어쓰며, 기존의 다른 키는 유지합니다.
pub fn merge_json_object(target: &mut Map<String, Value>, incoming: &Map<String, Value>) {
    for (key, value) in incoming {
        target.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_keeps_existing_keys() {
        let mut row = TechnicalAnalysis {
            symbol_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            timeframe: Timeframe::D1,
            technical_indicators: json!({"RSI_14": 55.0, "EMA_5": 1.0})
                .as_object()
                .cloned()
                .unwrap(),
            candlestick_patterns: Map::new(),
        };

        let entry = TaEntry {
            technical_indicators: json!({"EMA_5": 2.0, "MACD": null})
                .as_object()
                .cloned()
                .unwrap(),
            candlestick_patterns: json!({"CDLDOJI": 100}).as_object().cloned().unwrap(),
        };
        row.merge(&entry);

        assert_eq!(row.technical_indicators["RSI_14"], json!(55.0));
        assert_eq!(row.technical_indicators["EMA_5"], json!(2.0));
        assert!(row.technical_indicators["MACD"].is_null());
        assert_eq!(row.candlestick_patterns["CDLDOJI"], json!(100));
    }
}
