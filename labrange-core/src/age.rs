//! Chọn khoảng tham chiếu theo giới tính và tuổi (tính bằng ngày).

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::{AgeRangeItem, Gender, GenderRangeTable, ParameterRange, PatientContext};

pub const DAYS_PER_MONTH: f64 = 30.0;
pub const DAYS_PER_YEAR: f64 = 365.0;

static RANGE_KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*([dmy])?\s*(?:-\s*(\d+(?:\.\d+)?)\s*([dmy])?)?\s*$")
        .expect("Invalid range key regex")
});

/// Khoảng tuổi `[lower_days, upper_days]`, hai đầu đều bao gồm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeBucket {
    pub lower_days: f64,
    pub upper_days: f64,
}

impl AgeBucket {
    pub fn contains(&self, age_days: f64) -> bool {
        self.lower_days <= age_days && age_days <= self.upper_days
    }
}

/// Đọc khóa nhóm tuổi như `"0-30d"`, `"1m-12m"`, `"18y"`.
///
/// Mỗi số dùng hậu tố của chính nó, nếu không có thì dùng hậu tố cuối,
/// nếu vẫn không có thì tính theo ngày. Thiếu cận trên nghĩa là không giới hạn.
pub fn parse_range_key(key: &str) -> Option<AgeBucket> {
    let caps = RANGE_KEY_REGEX.captures(key)?;

    let lower: f64 = caps.get(1)?.as_str().parse().ok()?;
    let lower_suffix = caps.get(2).map(|m| m.as_str());
    let upper = caps.get(3).map(|m| m.as_str().parse::<f64>());
    let upper_suffix = caps.get(4).map(|m| m.as_str());

    let trailing = upper_suffix.or(lower_suffix);
    let lower_days = lower * unit_multiplier(lower_suffix.or(trailing));

    let upper_days = match upper {
        Some(Ok(value)) => value * unit_multiplier(trailing),
        Some(Err(_)) => return None,
        None => f64::INFINITY,
    };

    Some(AgeBucket {
        lower_days,
        upper_days,
    })
}

fn unit_multiplier(suffix: Option<&str>) -> f64 {
    match suffix.map(str::to_ascii_lowercase).as_deref() {
        Some("m") => DAYS_PER_MONTH,
        Some("y") => DAYS_PER_YEAR,
        _ => 1.0,
    }
}

/// Trả về `rangeValue` của nhóm tuổi đầu tiên chứa `age_days`.
///
/// Không nhóm nào khớp thì lấy nhóm cuối cùng; danh sách rỗng trả về chuỗi rỗng.
pub fn resolve(buckets: &[AgeRangeItem], age_days: f64) -> String {
    let matched = buckets.iter().find(|item| match parse_range_key(&item.range_key) {
        Some(bucket) => bucket.contains(age_days),
        None => {
            debug!(range_key = %item.range_key, "Bỏ qua khóa nhóm tuổi không hợp lệ");
            false
        }
    });

    match matched {
        Some(item) => item.range_value.clone(),
        None => fallback_last(buckets),
    }
}

fn fallback_last(buckets: &[AgeRangeItem]) -> String {
    match buckets.last() {
        Some(item) => {
            debug!(range_key = %item.range_key, "Không có nhóm tuổi phù hợp, dùng nhóm cuối");
            item.range_value.clone()
        }
        None => String::new(),
    }
}

/// Chọn bảng theo giới tính: giới tính yêu cầu, rồi nữ, rồi nam.
pub fn select_gender_table(table: &GenderRangeTable, gender: Gender) -> Option<&[AgeRangeItem]> {
    let requested = match gender {
        Gender::Male => table.male.as_deref(),
        Gender::Female => table.female.as_deref(),
        Gender::Unspecified => None,
    };

    requested
        .or(table.female.as_deref())
        .or(table.male.as_deref())
}

/// Xác định chuỗi khoảng tham chiếu áp dụng cho bệnh nhân.
pub fn resolve_range(range: Option<&ParameterRange>, patient: &PatientContext) -> String {
    match range {
        None => String::new(),
        Some(ParameterRange::Fixed(text)) => text.clone(),
        Some(ParameterRange::ByGenderAge(table)) => {
            let Some(buckets) = select_gender_table(table, patient.gender) else {
                return String::new();
            };
            match patient.age_days {
                Some(age_days) => resolve(buckets, age_days),
                None => fallback_last(buckets),
            }
        }
    }
}

/// Đổi chuỗi `"/n"` trong khoảng tham chiếu thành xuống dòng thật.
pub fn display_range(text: &str) -> String {
    text.replace("/n", "\n")
}
