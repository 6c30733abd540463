//! 캔들 패턴 감지 지표.
//!
//! 캔들스틱 패턴을 감지하여 봉마다 `+100`(강세), `-100`(약세), `0`(없음)을 반환합니다.
//!
//! ## 지원 패턴
//! - **도지 계열**: `CDLDOJI`, `CDLDRAGONFLYDOJI`, `CDLGRAVESTONEDOJI`
//! - **망치 계열**: `CDLHAMMER`, `CDLINVERTEDHAMMER`, `CDLHANGINGMAN`, `CDLSHOOTINGSTAR`
//! - **2봉 반전**: `CDLENGULFING`, `CDLHARAMI`, `CDLPIERCING`, `CDLDARKCLOUDCOVER`
//! - **몸통 형태**: `CDLMARUBOZU`, `CDLSPINNINGTOP`
//! - **3봉 패턴**: `CDLMORNINGSTAR`, `CDLEVENINGSTAR`, `CDL3WHITESOLDIERS`, `CDL3BLACKCROWS`
//!
//! 추세 의존 패턴(망치형/교수형 등)은 직전 `trend_period`개 봉의 종가 기울기로
//! 추세를 판단합니다.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// 강세 신호 값.
pub const BULLISH: i32 = 100;
/// 약세 신호 값.
pub const BEARISH: i32 = -100;

/// 감지하는 패턴 이름 (출력 순서).
pub const PATTERN_NAMES: [&str; 17] = [
    "CDLDOJI",
    "CDLDRAGONFLYDOJI",
    "CDLGRAVESTONEDOJI",
    "CDLHAMMER",
    "CDLINVERTEDHAMMER",
    "CDLHANGINGMAN",
    "CDLSHOOTINGSTAR",
    "CDLENGULFING",
    "CDLHARAMI",
    "CDLMARUBOZU",
    "CDLSPINNINGTOP",
    "CDLPIERCING",
    "CDLDARKCLOUDCOVER",
    "CDLMORNINGSTAR",
    "CDLEVENINGSTAR",
    "CDL3WHITESOLDIERS",
    "CDL3BLACKCROWS",
];

/// 캔들 패턴 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CandlePatternParams {
    /// 몸통 비율 임계값 (기본: 0.1, 도지 판단용).
    pub body_ratio_threshold: Decimal,
    /// 그림자 비율 임계값 (기본: 2.0, 망치형 판단용).
    pub shadow_ratio_threshold: Decimal,
    /// 장대 몸통 비율 (기본: 0.6).
    pub long_body_ratio: Decimal,
    /// 추세 확인 기간 (기본: 5).
    pub trend_period: usize,
}

impl Default for CandlePatternParams {
    fn default() -> Self {
        Self {
            body_ratio_threshold: dec!(0.1),
            shadow_ratio_threshold: dec!(2.0),
            long_body_ratio: dec!(0.6),
            trend_period: 5,
        }
    }
}

/// 캔들 데이터.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

impl Candle {
    pub fn new(open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Self {
        Self {
            open,
            high,
            low,
            close,
        }
    }

    /// 캔들 몸통 크기.
    fn body(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    /// 전체 캔들 크기.
    fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// 상단 그림자 크기.
    fn upper_shadow(&self) -> Decimal {
        self.high - self.body_top()
    }

    /// 하단 그림자 크기.
    fn lower_shadow(&self) -> Decimal {
        self.body_bottom() - self.low
    }

    fn body_top(&self) -> Decimal {
        self.open.max(self.close)
    }

    fn body_bottom(&self) -> Decimal {
        self.open.min(self.close)
    }

    fn midpoint(&self) -> Decimal {
        (self.open + self.close) / dec!(2)
    }

    /// 상승 캔들 여부.
    fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// 하락 캔들 여부.
    fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    fn color(&self) -> i32 {
        if self.is_bullish() {
            BULLISH
        } else if self.is_bearish() {
            BEARISH
        } else {
            0
        }
    }
}

/// 추세 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trend {
    Up,
    Down,
    Flat,
}

/// 캔들 패턴 감지기.
#[derive(Debug, Default)]
pub struct CandlePatternIndicator {
    params: CandlePatternParams,
}

impl CandlePatternIndicator {
    /// 기본 파라미터로 감지기 생성.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: CandlePatternParams) -> Self {
        Self { params }
    }

    /// 모든 패턴을 봉마다 감지합니다.
    ///
    /// # 반환
    /// 패턴 이름 → 봉별 값 (`candles`와 같은 길이)
    pub fn detect_all(&self, candles: &[Candle]) -> BTreeMap<&'static str, Vec<i32>> {
        let mut result: BTreeMap<&'static str, Vec<i32>> = PATTERN_NAMES
            .iter()
            .map(|name| (*name, Vec::with_capacity(candles.len())))
            .collect();

        for index in 0..candles.len() {
            for name in PATTERN_NAMES {
                let value = self.detect(name, candles, index);
                if let Some(series) = result.get_mut(name) {
                    series.push(value);
                }
            }
        }

        result
    }

    /// `index`번째 봉에서 패턴 하나를 감지합니다. 이전 봉이 부족하면 0.
    pub fn detect(&self, pattern: &str, candles: &[Candle], index: usize) -> i32 {
        let Some(candle) = candles.get(index) else {
            return 0;
        };
        let prev = index.checked_sub(1).and_then(|i| candles.get(i));
        let prev2 = index.checked_sub(2).and_then(|i| candles.get(i));

        match pattern {
            "CDLDOJI" => signal(self.is_doji(candle), BULLISH),
            "CDLDRAGONFLYDOJI" => signal(self.is_dragonfly_doji(candle), BULLISH),
            "CDLGRAVESTONEDOJI" => signal(self.is_gravestone_doji(candle), BULLISH),
            "CDLHAMMER" => signal(
                self.is_hammer_shape(candle) && self.trend(candles, index) == Trend::Down,
                BULLISH,
            ),
            "CDLHANGINGMAN" => signal(
                self.is_hammer_shape(candle) && self.trend(candles, index) == Trend::Up,
                BEARISH,
            ),
            "CDLINVERTEDHAMMER" => signal(
                self.is_inverted_hammer_shape(candle) && self.trend(candles, index) == Trend::Down,
                BULLISH,
            ),
            "CDLSHOOTINGSTAR" => signal(
                self.is_inverted_hammer_shape(candle) && self.trend(candles, index) == Trend::Up,
                BEARISH,
            ),
            "CDLENGULFING" => prev.map_or(0, |p| self.engulfing(candle, p)),
            "CDLHARAMI" => prev.map_or(0, |p| self.harami(candle, p)),
            "CDLMARUBOZU" => self.marubozu(candle),
            "CDLSPINNINGTOP" => self.spinning_top(candle),
            "CDLPIERCING" => signal(prev.is_some_and(|p| self.is_piercing(candle, p)), BULLISH),
            "CDLDARKCLOUDCOVER" => signal(
                prev.is_some_and(|p| self.is_dark_cloud_cover(candle, p)),
                BEARISH,
            ),
            "CDLMORNINGSTAR" => match (prev2, prev) {
                (Some(first), Some(star)) => {
                    signal(self.is_morning_star(first, star, candle), BULLISH)
                }
                _ => 0,
            },
            "CDLEVENINGSTAR" => match (prev2, prev) {
                (Some(first), Some(star)) => {
                    signal(self.is_evening_star(first, star, candle), BEARISH)
                }
                _ => 0,
            },
            "CDL3WHITESOLDIERS" => match (prev2, prev) {
                (Some(first), Some(second)) => {
                    signal(self.is_three_white_soldiers(first, second, candle), BULLISH)
                }
                _ => 0,
            },
            "CDL3BLACKCROWS" => match (prev2, prev) {
                (Some(first), Some(second)) => {
                    signal(self.is_three_black_crows(first, second, candle), BEARISH)
                }
                _ => 0,
            },
            _ => 0,
        }
    }

    /// 추세 감지.
    ///
    /// 현재 봉 직전 `trend_period`개 봉의 첫 종가와 마지막 종가를 비교합니다 (±2%).
    fn trend(&self, candles: &[Candle], index: usize) -> Trend {
        let period = self.params.trend_period;
        if period < 2 || index < period {
            return Trend::Flat;
        }

        let first = candles[index - period].close;
        let last = candles[index - 1].close;

        if last > first * dec!(1.02) {
            Trend::Up
        } else if last < first * dec!(0.98) {
            Trend::Down
        } else {
            Trend::Flat
        }
    }

    fn is_long_body(&self, candle: &Candle) -> bool {
        candle.range() > Decimal::ZERO
            && candle.body() >= candle.range() * self.params.long_body_ratio
    }

    fn is_doji(&self, candle: &Candle) -> bool {
        candle.range() > Decimal::ZERO
            && candle.body() <= candle.range() * self.params.body_ratio_threshold
    }

    fn is_dragonfly_doji(&self, candle: &Candle) -> bool {
        self.is_doji(candle)
            && candle.upper_shadow() <= candle.range() * self.params.body_ratio_threshold
            && candle.lower_shadow() >= candle.range() * self.params.long_body_ratio
    }

    fn is_gravestone_doji(&self, candle: &Candle) -> bool {
        self.is_doji(candle)
            && candle.lower_shadow() <= candle.range() * self.params.body_ratio_threshold
            && candle.upper_shadow() >= candle.range() * self.params.long_body_ratio
    }

    /// 조건: 하단 그림자 >= 몸통 * 2, 상단 그림자 작음
    fn is_hammer_shape(&self, candle: &Candle) -> bool {
        let body = candle.body();
        body > Decimal::ZERO
            && candle.lower_shadow() >= body * self.params.shadow_ratio_threshold
            && candle.upper_shadow() < body * dec!(0.5)
    }

    /// 조건: 상단 그림자 >= 몸통 * 2, 하단 그림자 작음
    fn is_inverted_hammer_shape(&self, candle: &Candle) -> bool {
        let body = candle.body();
        body > Decimal::ZERO
            && candle.upper_shadow() >= body * self.params.shadow_ratio_threshold
            && candle.lower_shadow() < body * dec!(0.5)
    }

    /// 현재 몸통이 이전 몸통을 완전히 감싸는 반대 색 캔들.
    fn engulfing(&self, candle: &Candle, prev: &Candle) -> i32 {
        if prev.is_bearish()
            && candle.is_bullish()
            && candle.open <= prev.close
            && candle.close >= prev.open
            && candle.body() > prev.body()
        {
            BULLISH
        } else if prev.is_bullish()
            && candle.is_bearish()
            && candle.open >= prev.close
            && candle.close <= prev.open
            && candle.body() > prev.body()
        {
            BEARISH
        } else {
            0
        }
    }

    /// 장대 캔들의 몸통 안에 들어가는 작은 몸통. 부호는 첫 캔들의 반대.
    fn harami(&self, candle: &Candle, prev: &Candle) -> i32 {
        if !self.is_long_body(prev) || candle.body() >= prev.body() {
            return 0;
        }
        if candle.body_top() < prev.body_top() && candle.body_bottom() > prev.body_bottom() {
            -prev.color()
        } else {
            0
        }
    }

    fn marubozu(&self, candle: &Candle) -> i32 {
        let range = candle.range();
        let tolerance = range * dec!(0.05);
        if range > Decimal::ZERO
            && candle.body() >= range * dec!(0.9)
            && candle.upper_shadow() <= tolerance
            && candle.lower_shadow() <= tolerance
        {
            candle.color()
        } else {
            0
        }
    }

    fn spinning_top(&self, candle: &Candle) -> i32 {
        let body = candle.body();
        if self.is_doji(candle) || body <= Decimal::ZERO {
            return 0;
        }
        if body <= candle.range() * dec!(0.3)
            && candle.upper_shadow() > body
            && candle.lower_shadow() > body
        {
            candle.color()
        } else {
            0
        }
    }

    /// 장대 음봉 후 저가 아래에서 시작해 몸통 중간 위로 마감하는 양봉.
    fn is_piercing(&self, candle: &Candle, prev: &Candle) -> bool {
        prev.is_bearish()
            && self.is_long_body(prev)
            && candle.is_bullish()
            && candle.open < prev.low
            && candle.close > prev.midpoint()
            && candle.close < prev.open
    }

    /// 장대 양봉 후 고가 위에서 시작해 몸통 중간 아래로 마감하는 음봉.
    fn is_dark_cloud_cover(&self, candle: &Candle, prev: &Candle) -> bool {
        prev.is_bullish()
            && self.is_long_body(prev)
            && candle.is_bearish()
            && candle.open > prev.high
            && candle.close < prev.midpoint()
            && candle.close > prev.open
    }

    fn is_star(&self, first: &Candle, star: &Candle) -> bool {
        star.body() <= first.body() * dec!(0.3)
    }

    fn is_morning_star(&self, first: &Candle, star: &Candle, third: &Candle) -> bool {
        first.is_bearish()
            && self.is_long_body(first)
            && self.is_star(first, star)
            && star.body_top() < first.close
            && third.is_bullish()
            && third.close > first.midpoint()
    }

    fn is_evening_star(&self, first: &Candle, star: &Candle, third: &Candle) -> bool {
        first.is_bullish()
            && self.is_long_body(first)
            && self.is_star(first, star)
            && star.body_bottom() > first.close
            && third.is_bearish()
            && third.close < first.midpoint()
    }

    fn is_three_white_soldiers(&self, first: &Candle, second: &Candle, third: &Candle) -> bool {
        let candles = [first, second, third];
        candles
            .iter()
            .all(|c| c.is_bullish() && c.upper_shadow() <= c.body() * dec!(0.3))
            && candles.windows(2).all(|w| {
                let (prev, cur) = (w[0], w[1]);
                cur.close > prev.close && cur.open > prev.open && cur.open <= prev.close
            })
    }

    fn is_three_black_crows(&self, first: &Candle, second: &Candle, third: &Candle) -> bool {
        let candles = [first, second, third];
        candles
            .iter()
            .all(|c| c.is_bearish() && c.lower_shadow() <= c.body() * dec!(0.3))
            && candles.windows(2).all(|w| {
                let (prev, cur) = (w[0], w[1]);
                cur.close < prev.close && cur.open < prev.open && cur.open >= prev.close
            })
    }
}

fn signal(matched: bool, value: i32) -> i32 {
    if matched {
        value
    } else {
        0
    }
}
