//! 문자열 정규화 유틸리티.

/// 각 알파벳 구간의 첫 글자를 대문자로, 나머지를 소문자로 변환합니다.
///
/// 알파벳이 아닌 문자 뒤에 오는 글자는 새 단어로 취급합니다
/// (`"3m co"` → `"3M Co"`, `"o'neil"` → `"O'Neil"`).
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_alpha = false;

    for c in value.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }

    out
}

/// 재무제표 항목 이름을 lower_snake_case 키로 변환합니다.
///
/// 공백/구두점은 `_`로 바뀌고, CamelCase 경계에도 `_`가 삽입됩니다.
pub fn to_snake_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len() + 8);
    let mut prev: Option<char> = None;

    for c in label.trim().chars() {
        if c.is_alphanumeric() {
            if c.is_uppercase() {
                if let Some(p) = prev {
                    if p.is_lowercase() || p.is_ascii_digit() {
                        out.push('_');
                    }
                }
            }
            out.extend(c.to_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
        prev = Some(c);
    }

    while out.ends_with('_') {
        out.pop();
    }
    out
}
