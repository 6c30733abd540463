//! 날짜 문자열 파싱.

use chrono::NaiveDate;

use crate::{PraiceError, PraiceResult};

/// 저장 및 CLI에서 사용하는 날짜 형식.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// `YYYY-MM-DD` 형식의 날짜를 파싱합니다.
pub fn parse_date(value: &str) -> PraiceResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| PraiceError::Validation(format!("Invalid date '{}': {}", value, e)))
}

/// 선택적 시작/종료일이 올바른 순서인지 확인합니다.
pub fn validate_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> PraiceResult<()> {
    match (start, end) {
        (Some(s), Some(e)) if s > e => Err(PraiceError::Validation(format!(
            "start date {} is after end date {}",
            s, e
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-01-02").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
        assert!(parse_date("2024/01/02").unwrap_err().is_validation());
        assert!(parse_date("2024-13-01").is_err());
    }

    #[test]
    fn test_validate_range() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 1);
        let b = NaiveDate::from_ymd_opt(2024, 2, 1);
        assert!(validate_range(a, b).is_ok());
        assert!(validate_range(b, a).is_err());
        assert!(validate_range(None, a).is_ok());
    }
}
