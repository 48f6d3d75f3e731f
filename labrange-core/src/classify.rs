//! Phân loại giá trị đo so với khoảng tham chiếu.

use crate::{ClassifierConfig, Deviation, DeviationLevel, DeviationSeverity, NumericRange, OutOfRangeFlag};

/// Đọc kết quả đo thành số; kết quả định tính hoặc rỗng trả về `None`.
pub fn parse_value(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Phân loại `value` theo khoảng đã đọc.
///
/// Giá trị hoặc khoảng không phải số luôn được coi là bình thường.
pub fn classify(value: &str, range: Option<&NumericRange>, config: &ClassifierConfig) -> Deviation {
    let (Some(number), Some(range)) = (parse_value(value), range) else {
        return Deviation::normal();
    };

    if number < range.lower {
        Deviation {
            level: DeviationLevel::Low,
            severity: Some(severity_for(range.lower - number, range.lower, config)),
        }
    } else if number > range.upper {
        Deviation {
            level: DeviationLevel::High,
            severity: Some(severity_for(number - range.upper, range.upper, config)),
        }
    } else {
        Deviation::normal()
    }
}

fn severity_for(distance: f64, bound: f64, config: &ClassifierConfig) -> DeviationSeverity {
    // Độ lệch tương đối không xác định khi cận bằng 0; parser chỉ sinh cận không âm.
    if bound == 0.0 {
        return DeviationSeverity::Severe;
    }

    let relative = distance / bound;
    if relative > config.severe_threshold {
        DeviationSeverity::Severe
    } else if relative > config.moderate_threshold {
        DeviationSeverity::Moderate
    } else {
        DeviationSeverity::Mild
    }
}

/// Nhãn L/H dùng khi in, không tính mức độ.
pub fn flag(value: &str, range: Option<&NumericRange>) -> Option<OutOfRangeFlag> {
    let number = parse_value(value)?;
    let range = range?;
    if number < range.lower {
        Some(OutOfRangeFlag::Low)
    } else if number > range.upper {
        Some(OutOfRangeFlag::High)
    } else {
        None
    }
}
