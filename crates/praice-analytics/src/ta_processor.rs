//! 기술적 분석 처리기.
//!
//! 가격 이력 전체를 받아 날짜별 [`TaEntry`]를 만듭니다.
//! 지표 값은 JSON 숫자 또는 `null`, 캔들 패턴 값은 `+100/-100/0`입니다.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use praice_core::{PriceBar, TaEntry};
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::indicators::{Candle, CandlePatternIndicator, IndicatorResult, IndicatorSurface};

/// 가격 이력에 대해 지표 표면과 캔들 패턴을 계산합니다.
///
/// 입력은 날짜 순으로 정렬한 뒤 계산합니다. 빈 입력은 빈 맵을 반환합니다.
pub fn process_technical_analysis(
    bars: &[PriceBar],
) -> IndicatorResult<BTreeMap<NaiveDate, TaEntry>> {
    if bars.is_empty() {
        return Ok(BTreeMap::new());
    }

    let mut sorted = bars.to_vec();
    sorted.sort_by_key(|bar| bar.date);

    let indicators = IndicatorSurface::compute(&sorted)?;

    let candles: Vec<Candle> = sorted
        .iter()
        .map(|bar| Candle::new(bar.open, bar.high, bar.low, bar.close))
        .collect();
    let patterns = CandlePatternIndicator::new().detect_all(&candles);

    let mut result = BTreeMap::new();
    for (index, bar) in sorted.iter().enumerate() {
        let technical_indicators: Map<String, Value> = indicators
            .iter()
            .map(|(name, values)| (name.clone(), number_or_null(values[index])))
            .collect();
        let candlestick_patterns: Map<String, Value> = patterns
            .iter()
            .map(|(name, values)| (name.to_string(), Value::from(values[index])))
            .collect();

        result.insert(
            bar.date,
            TaEntry {
                technical_indicators,
                candlestick_patterns,
            },
        );
    }

    debug!(
        bars = sorted.len(),
        indicators = indicators.len(),
        patterns = patterns.len(),
        "Technical analysis computed"
    );

    Ok(result)
}

fn number_or_null(value: Option<f64>) -> Value {
    value
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::PATTERN_NAMES;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Duration::days(offset)
    }

    fn bar(offset: i64, close: Decimal) -> PriceBar {
        PriceBar::ohlcv(day(offset), close - dec!(1), close + dec!(2), close - dec!(2), close, 5_000)
    }

    #[test]
    fn test_empty_input_gives_empty_map() {
        assert!(process_technical_analysis(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_entries_are_keyed_by_date_regardless_of_input_order() {
        let bars: Vec<PriceBar> = (0..30)
            .rev()
            .map(|i| bar(i, dec!(50) + Decimal::from(i)))
            .collect();

        let result = process_technical_analysis(&bars).unwrap();
        assert_eq!(result.len(), 30);
        assert_eq!(result.keys().next(), Some(&day(0)));

        // 오름차순 정렬 후 계산되므로 첫 날짜는 워밍업 null
        let first = &result[&day(0)];
        assert_eq!(first.technical_indicators["EMA_5"], Value::Null);
        assert!(first.technical_indicators["AVGPRICE"].is_number());

        let fifth = &result[&day(4)];
        assert!(fifth.technical_indicators["EMA_5"].is_number());
    }

    #[test]
    fn test_single_bar() {
        let result = process_technical_analysis(&[bar(0, dec!(10))]).unwrap();
        let entry = &result[&day(0)];

        assert_eq!(entry.technical_indicators["RSI_14"], Value::Null);
        assert_eq!(entry.technical_indicators["TRANGE"], Value::Null);
        assert_eq!(entry.candlestick_patterns["CDLENGULFING"], Value::from(0));
    }

    proptest! {
        #[test]
        fn prop_every_entry_carries_full_surface(
            closes in prop::collection::vec(1u32..10_000, 1..80)
        ) {
            let bars: Vec<PriceBar> = closes
                .iter()
                .enumerate()
                .map(|(i, c)| bar(i as i64, Decimal::from(*c) / dec!(10) + dec!(3)))
                .collect();

            let result = process_technical_analysis(&bars).unwrap();
            prop_assert_eq!(result.len(), bars.len());

            for entry in result.values() {
                prop_assert_eq!(entry.candlestick_patterns.len(), PATTERN_NAMES.len());
                for value in entry.candlestick_patterns.values() {
                    let v = value.as_i64().unwrap();
                    prop_assert!(v == 100 || v == -100 || v == 0);
                }
                for value in entry.technical_indicators.values() {
                    prop_assert!(value.is_null() || value.as_f64().is_some_and(f64::is_finite));
                }
            }
        }
    }
}
