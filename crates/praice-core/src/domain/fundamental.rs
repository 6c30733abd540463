//! 재무제표 데이터.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Period;

/// 저장된 재무 데이터 행 (`(symbol_id, date, period)` 고유).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalData {
    pub symbol_id: i64,
    pub date: NaiveDate,
    pub period: Period,
    /// lower_snake_case 항목명 → 숫자 또는 null
    pub data: Map<String, Value>,
}
