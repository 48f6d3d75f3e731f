//! Đọc chuỗi khoảng tham chiếu thành khoảng số.
//!
//! Chỉ nhận các dạng `"4-7"`, `"4 to 7"`, `"up to 12.5"`, `"> 10"`, `"<= 10"`.
//! Mọi chuỗi khác là văn bản mô tả và không bao giờ gây cờ bất thường.

use std::sync::LazyLock;

use regex::Regex;

use crate::ClassifierConfig;

const NUMBER: &str = r"(\d+(?:\.\d+)?|\.\d+)";

static UP_TO_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^up\s*(?:to)?\s*{NUMBER}$")).expect("Invalid up-to regex")
});

static GREATER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?:>\s*=?|≥)\s*{NUMBER}$")).expect("Invalid greater-than regex")
});

static LESS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?:<\s*=?|≤)\s*{NUMBER}$")).expect("Invalid less-than regex")
});

static INTERVAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^{NUMBER}\s*(?:-|to)\s*{NUMBER}$")).expect("Invalid interval regex")
});

/// Khoảng số `[lower, upper]`; `upper` có thể là vô cực.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub lower: f64,
    pub upper: f64,
}

/// Đọc chuỗi khoảng tham chiếu theo thứ tự ưu tiên:
/// "up to", so sánh lớn hơn, so sánh nhỏ hơn, rồi khoảng hai đầu.
pub fn parse_numeric(text: &str, config: &ClassifierConfig) -> Option<NumericRange> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = UP_TO_REGEX.captures(text) {
        return Some(NumericRange {
            lower: config.up_to_lower_bound,
            upper: number(caps.get(1)?.as_str())?,
        });
    }

    if let Some(caps) = GREATER_REGEX.captures(text) {
        return Some(NumericRange {
            lower: number(caps.get(1)?.as_str())?,
            upper: f64::INFINITY,
        });
    }

    if let Some(caps) = LESS_REGEX.captures(text) {
        return Some(NumericRange {
            lower: 0.0,
            upper: number(caps.get(1)?.as_str())?,
        });
    }

    if let Some(caps) = INTERVAL_REGEX.captures(text) {
        let lower = number(caps.get(1)?.as_str())?;
        let upper = number(caps.get(2)?.as_str())?;
        // Khoảng ngược chiều coi như văn bản mô tả.
        if lower > upper {
            return None;
        }
        return Some(NumericRange { lower, upper });
    }

    None
}

fn number(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|value| value.is_finite())
}
