//! 기술적 지표 표면 (ta-rs 기반).
//!
//! 일봉 시계열 하나에 대해 모든 지표를 한 번에 계산합니다.
//! 각 지표는 입력과 같은 길이의 `Vec<Option<f64>>`를 반환하며,
//! 워밍업 구간과 유한하지 않은 값은 `None`입니다.

use std::collections::BTreeMap;

use praice_core::PriceBar;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use ta::indicators::{
    AverageTrueRange, BollingerBands, CommodityChannelIndex, ExponentialMovingAverage,
    FastStochastic, KeltnerChannel, Maximum, Minimum, MoneyFlowIndex,
    MovingAverageConvergenceDivergence, OnBalanceVolume, PercentagePriceOscillator, RateOfChange,
    RelativeStrengthIndex, SimpleMovingAverage, SlowStochastic, StandardDeviation, TrueRange,
};
use ta::{Close, High, Low, Next, Open, Volume};

use super::{IndicatorError, IndicatorResult};

/// 지표명 → 봉별 값.
pub type IndicatorSeries = BTreeMap<String, Vec<Option<f64>>>;

/// EMA 기간.
pub const EMA_PERIODS: [usize; 6] = [5, 10, 20, 50, 100, 200];
/// SMA 기간.
pub const SMA_PERIODS: [usize; 2] = [20, 50];
/// RSI 기간.
pub const RSI_PERIODS: [usize; 2] = [9, 14];

const BBANDS_PERIOD: usize = 5;
const BBANDS_DEV: f64 = 2.0;
const KC_PERIOD: usize = 20;
const KC_MULTIPLIER: f64 = 2.0;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const STOCH_PERIOD: usize = 5;
const STOCH_SMOOTH: usize = 3;
const CCI_PERIOD: usize = 14;
const MFI_PERIOD: usize = 14;
const ROC_PERIOD: usize = 10;
const MOM_PERIOD: usize = 10;
const ATR_PERIOD: usize = 14;
const STDDEV_PERIOD: usize = 5;
const WILLR_PERIOD: usize = 14;

/// ta-rs 트레이트 구현용 내부 봉.
#[derive(Debug, Clone, Copy)]
struct Bar {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl Bar {
    fn from_price(bar: &PriceBar) -> IndicatorResult<Self> {
        Ok(Self {
            open: to_f64(bar.open)?,
            high: to_f64(bar.high)?,
            low: to_f64(bar.low)?,
            close: to_f64(bar.close)?,
            volume: bar.volume as f64,
        })
    }
}

impl Open for Bar {
    fn open(&self) -> f64 {
        self.open
    }
}

impl High for Bar {
    fn high(&self) -> f64 {
        self.high
    }
}

impl Low for Bar {
    fn low(&self) -> f64 {
        self.low
    }
}

impl Close for Bar {
    fn close(&self) -> f64 {
        self.close
    }
}

impl Volume for Bar {
    fn volume(&self) -> f64 {
        self.volume
    }
}

fn to_f64(value: Decimal) -> IndicatorResult<f64> {
    value
        .to_f64()
        .ok_or_else(|| IndicatorError::CalculationError(format!("{} 변환 실패", value)))
}

fn ta_error(err: ta::errors::TaError) -> IndicatorError {
    IndicatorError::InvalidParameter(format!("{:?}", err))
}

/// 지표를 입력 전체에 순서대로 적용합니다.
fn run<I, N>(mut indicator: N, inputs: impl IntoIterator<Item = I>) -> Vec<N::Output>
where
    N: Next<I>,
{
    inputs.into_iter().map(|input| indicator.next(input)).collect()
}

/// 워밍업 구간과 NaN/inf를 `None`으로 가립니다.
fn mask(values: Vec<f64>, warmup: usize) -> Vec<Option<f64>> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| (i >= warmup && v.is_finite()).then_some(v))
        .collect()
}

/// 지표 표면 계산기.
#[derive(Debug, Default)]
pub struct IndicatorSurface {
    series: IndicatorSeries,
}

impl IndicatorSurface {
    fn insert(&mut self, key: impl Into<String>, values: Vec<f64>, warmup: usize) {
        self.series.insert(key.into(), mask(values, warmup));
    }

    /// 모든 지표를 계산합니다.
    ///
    /// `bars`는 날짜 오름차순이어야 합니다. 빈 입력은 빈 결과를 반환합니다.
    pub fn compute(bars: &[PriceBar]) -> IndicatorResult<IndicatorSeries> {
        if bars.is_empty() {
            return Ok(IndicatorSeries::new());
        }

        let bars: Vec<Bar> = bars.iter().map(Bar::from_price).collect::<IndicatorResult<_>>()?;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        let mut surface = Self::default();
        surface.moving_averages(&closes)?;
        surface.bands(&bars, &closes)?;
        surface.oscillators(&bars, &closes)?;
        surface.volatility(&bars, &closes)?;
        surface.price_transforms(&bars)?;

        Ok(surface.series)
    }

    fn moving_averages(&mut self, closes: &[f64]) -> IndicatorResult<()> {
        for period in EMA_PERIODS {
            let ema = ExponentialMovingAverage::new(period).map_err(ta_error)?;
            self.insert(format!("EMA_{}", period), run(ema, closes.iter().copied()), period - 1);
        }
        for period in SMA_PERIODS {
            let sma = SimpleMovingAverage::new(period).map_err(ta_error)?;
            self.insert(format!("SMA_{}", period), run(sma, closes.iter().copied()), period - 1);
        }
        Ok(())
    }

    fn bands(&mut self, bars: &[Bar], closes: &[f64]) -> IndicatorResult<()> {
        let bb = BollingerBands::new(BBANDS_PERIOD, BBANDS_DEV).map_err(ta_error)?;
        let out = run(bb, closes.iter().copied());
        let warmup = BBANDS_PERIOD - 1;
        self.insert("BBANDS_upper", out.iter().map(|o| o.upper).collect(), warmup);
        self.insert("BBANDS_middle", out.iter().map(|o| o.average).collect(), warmup);
        self.insert("BBANDS_lower", out.iter().map(|o| o.lower).collect(), warmup);

        let kc = KeltnerChannel::new(KC_PERIOD, KC_MULTIPLIER).map_err(ta_error)?;
        let out = run(kc, bars.iter());
        let warmup = KC_PERIOD - 1;
        self.insert("KC_upper", out.iter().map(|o| o.upper).collect(), warmup);
        self.insert("KC_middle", out.iter().map(|o| o.average).collect(), warmup);
        self.insert("KC_lower", out.iter().map(|o| o.lower).collect(), warmup);
        Ok(())
    }

    fn oscillators(&mut self, bars: &[Bar], closes: &[f64]) -> IndicatorResult<()> {
        for period in RSI_PERIODS {
            let rsi = RelativeStrengthIndex::new(period).map_err(ta_error)?;
            self.insert(format!("RSI_{}", period), run(rsi, closes.iter().copied()), period);
        }

        // 시그널 라인은 느린 EMA가 찬 뒤 시그널 기간만큼 더 필요
        let line_warmup = MACD_SLOW - 1;
        let signal_warmup = line_warmup + MACD_SIGNAL - 1;

        let macd = MovingAverageConvergenceDivergence::new(MACD_FAST, MACD_SLOW, MACD_SIGNAL)
            .map_err(ta_error)?;
        let out = run(macd, closes.iter().copied());
        self.insert("MACD", out.iter().map(|o| o.macd).collect(), line_warmup);
        self.insert("MACD_signal", out.iter().map(|o| o.signal).collect(), signal_warmup);
        self.insert("MACD_hist", out.iter().map(|o| o.histogram).collect(), signal_warmup);

        let ppo = PercentagePriceOscillator::new(MACD_FAST, MACD_SLOW, MACD_SIGNAL)
            .map_err(ta_error)?;
        let out = run(ppo, closes.iter().copied());
        self.insert("PPO", out.iter().map(|o| o.ppo).collect(), line_warmup);
        self.insert("PPO_signal", out.iter().map(|o| o.signal).collect(), signal_warmup);
        self.insert("PPO_hist", out.iter().map(|o| o.histogram).collect(), signal_warmup);

        let fast_k = run(FastStochastic::new(STOCH_PERIOD).map_err(ta_error)?, bars.iter());
        let fast_d = run(
            SimpleMovingAverage::new(STOCH_SMOOTH).map_err(ta_error)?,
            fast_k.iter().copied(),
        );
        let k_warmup = STOCH_PERIOD - 1;
        self.insert("STOCHF_k", fast_k, k_warmup);
        self.insert("STOCHF_d", fast_d, k_warmup + STOCH_SMOOTH - 1);

        let slow_k = run(
            SlowStochastic::new(STOCH_PERIOD, STOCH_SMOOTH).map_err(ta_error)?,
            bars.iter(),
        );
        let slow_d = run(
            SimpleMovingAverage::new(STOCH_SMOOTH).map_err(ta_error)?,
            slow_k.iter().copied(),
        );
        let slow_warmup = k_warmup + STOCH_SMOOTH - 1;
        self.insert("STOCH_k", slow_k, slow_warmup);
        self.insert("STOCH_d", slow_d, slow_warmup + STOCH_SMOOTH - 1);

        let cci = CommodityChannelIndex::new(CCI_PERIOD).map_err(ta_error)?;
        self.insert("CCI", run(cci, bars.iter()), CCI_PERIOD - 1);

        let mfi = MoneyFlowIndex::new(MFI_PERIOD).map_err(ta_error)?;
        self.insert("MFI", run(mfi, bars.iter()), MFI_PERIOD);

        self.insert("OBV", run(OnBalanceVolume::new(), bars.iter()), 0);

        let roc = RateOfChange::new(ROC_PERIOD).map_err(ta_error)?;
        self.insert("ROC", run(roc, closes.iter().copied()), ROC_PERIOD);

        let mom = closes
            .iter()
            .enumerate()
            .map(|(i, close)| match i.checked_sub(MOM_PERIOD) {
                Some(j) => close - closes[j],
                None => f64::NAN,
            })
            .collect();
        self.insert("MOM", mom, MOM_PERIOD);

        let highest = run(Maximum::new(WILLR_PERIOD).map_err(ta_error)?, bars.iter());
        let lowest = run(Minimum::new(WILLR_PERIOD).map_err(ta_error)?, bars.iter());
        let willr = closes
            .iter()
            .zip(highest.iter().zip(lowest.iter()))
            .map(|(close, (hh, ll))| {
                let range = hh - ll;
                if range == 0.0 {
                    0.0
                } else {
                    (hh - close) / range * -100.0
                }
            })
            .collect();
        self.insert("WILLR", willr, WILLR_PERIOD - 1);

        Ok(())
    }

    fn volatility(&mut self, bars: &[Bar], closes: &[f64]) -> IndicatorResult<()> {
        let atr = run(AverageTrueRange::new(ATR_PERIOD).map_err(ta_error)?, bars.iter());
        let natr = atr
            .iter()
            .zip(closes)
            .map(|(atr, close)| {
                if *close == 0.0 {
                    f64::NAN
                } else {
                    atr / close * 100.0
                }
            })
            .collect();
        self.insert("ATR", atr, ATR_PERIOD);
        self.insert("NATR", natr, ATR_PERIOD);

        self.insert("TRANGE", run(TrueRange::new(), bars.iter()), 1);

        let stddev = run(
            StandardDeviation::new(STDDEV_PERIOD).map_err(ta_error)?,
            closes.iter().copied(),
        );
        let variance = stddev.iter().map(|sd| sd * sd).collect();
        self.insert("STDDEV", stddev, STDDEV_PERIOD - 1);
        self.insert("VAR", variance, STDDEV_PERIOD - 1);

        Ok(())
    }

    fn price_transforms(&mut self, bars: &[Bar]) -> IndicatorResult<()> {
        self.insert(
            "AVGPRICE",
            bars.iter()
                .map(|b| (b.open + b.high + b.low + b.close) / 4.0)
                .collect(),
            0,
        );
        self.insert(
            "MEDPRICE",
            bars.iter().map(|b| (b.high + b.low) / 2.0).collect(),
            0,
        );
        self.insert(
            "BOP",
            bars.iter()
                .map(|b| {
                    let range = b.high - b.low;
                    if range == 0.0 {
                        0.0
                    } else {
                        (b.close - b.open) / range
                    }
                })
                .collect(),
            0,
        );
        Ok(())
    }
}
