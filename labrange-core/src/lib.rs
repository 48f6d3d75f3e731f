//! Logic lõi xác định khoảng tham chiếu và phân loại kết quả xét nghiệm.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod age;
pub mod classify;
pub mod compose;
pub mod numeric;

pub use age::{display_range, parse_range_key, resolve, resolve_range, select_gender_table, AgeBucket};
pub use classify::{classify, flag, parse_value};
pub use compose::compose_rows;
pub use numeric::{parse_numeric, NumericRange};

/// Cấu hình các hằng số phân loại.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Cận dưới dùng cho khoảng dạng "up to N".
    pub up_to_lower_bound: f64,
    /// Độ lệch tương đối (> ngưỡng) coi là mức trung bình.
    pub moderate_threshold: f64,
    /// Độ lệch tương đối (> ngưỡng) coi là mức nặng.
    pub severe_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            up_to_lower_bound: 0.0,
            moderate_threshold: 0.1,
            severe_threshold: 0.3,
        }
    }
}

/// Giới tính bệnh nhân, dùng để chọn bảng khoảng tham chiếu.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unspecified,
}

impl Gender {
    /// Đọc giới tính không phân biệt hoa thường.
    pub fn parse(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "male" | "m" => Gender::Male,
            "female" | "f" => Gender::Female,
            _ => Gender::Unspecified,
        }
    }
}

/// Thông tin bệnh nhân cần cho việc chọn khoảng tham chiếu.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientContext {
    /// Tuổi tính theo ngày; `None` khi hồ sơ không có tuổi.
    pub age_days: Option<f64>,
    pub gender: Gender,
}

/// Một khoảng tuổi trong bảng tham chiếu theo giới tính.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgeRangeItem {
    pub range_key: String,
    pub range_value: String,
}

/// Bảng khoảng tham chiếu theo giới tính và tuổi.
///
/// `None` nghĩa là hồ sơ không có khóa giới tính đó, khác với danh sách rỗng.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenderRangeTable {
    #[serde(default)]
    pub male: Option<Vec<AgeRangeItem>>,
    #[serde(default)]
    pub female: Option<Vec<AgeRangeItem>>,
}

/// Khoảng tham chiếu của một chỉ số.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ParameterRange {
    /// Một chuỗi áp dụng cho mọi bệnh nhân.
    Fixed(String),
    /// Bảng theo giới tính và nhóm tuổi.
    ByGenderAge(GenderRangeTable),
}

/// Một chỉ số xét nghiệm đã nhập kết quả.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Parameter {
    pub name: String,
    /// Kết quả đo; chuỗi rỗng khi chưa có kết quả.
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub range: Option<ParameterRange>,
    #[serde(default)]
    pub subparameters: Vec<Parameter>,
}

/// Hướng lệch so với khoảng tham chiếu.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeviationLevel {
    Normal,
    Low,
    High,
}

/// Mức độ lệch, sắp xếp từ nhẹ tới nặng.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeviationSeverity {
    Mild,
    Moderate,
    Severe,
}

/// Kết quả phân loại một giá trị.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deviation {
    pub level: DeviationLevel,
    /// Chỉ có khi giá trị nằm ngoài khoảng.
    pub severity: Option<DeviationSeverity>,
}

impl Deviation {
    pub const fn normal() -> Self {
        Self {
            level: DeviationLevel::Normal,
            severity: None,
        }
    }

    pub fn is_abnormal(&self) -> bool {
        self.level != DeviationLevel::Normal
    }
}

impl Default for Deviation {
    fn default() -> Self {
        Self::normal()
    }
}

/// Nhãn in trên phiếu kết quả.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OutOfRangeFlag {
    #[serde(rename = "L")]
    Low,
    #[serde(rename = "H")]
    High,
}

impl OutOfRangeFlag {
    pub fn label(&self) -> &'static str {
        match self {
            OutOfRangeFlag::Low => "L",
            OutOfRangeFlag::High => "H",
        }
    }
}

/// Một dòng đã sẵn sàng cho tầng trình bày.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportRow {
    pub name: String,
    pub value: String,
    pub unit: Option<String>,
    /// Khoảng tham chiếu đã chọn, "/n" đã đổi thành xuống dòng.
    pub range: String,
    pub flag: Option<OutOfRangeFlag>,
    pub deviation: Deviation,
    /// 0 cho chỉ số chính, 1 cho chỉ số con.
    pub depth: u8,
}

/// Nhóm dòng dưới một tiêu đề phụ.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReportSection {
    pub heading: Option<String>,
    pub rows: Vec<ReportRow>,
}

/// Kết quả của một xét nghiệm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestReport {
    pub name: String,
    pub sections: Vec<ReportSection>,
    pub abnormal_count: usize,
}

impl TestReport {
    pub fn new(name: String, sections: Vec<ReportSection>) -> Self {
        let abnormal_count = sections
            .iter()
            .flat_map(|section| section.rows.iter())
            .filter(|row| row.deviation.is_abnormal())
            .count();
        Self {
            name,
            sections,
            abnormal_count,
        }
    }

    /// Tất cả các dòng theo thứ tự hiển thị.
    pub fn rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.sections.iter().flat_map(|section| section.rows.iter())
    }
}

/// Thông tin bệnh nhân in ở đầu phiếu.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientSummary {
    pub name: Option<String>,
    pub gender: Gender,
    pub age_days: Option<f64>,
    pub reported_on: Option<String>,
}

impl PatientSummary {
    pub fn context(&self) -> PatientContext {
        PatientContext {
            age_days: self.age_days,
            gender: self.gender,
        }
    }
}

/// Phiếu kết quả tổng hợp cuối cùng.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabReport {
    pub generated_at: DateTime<Utc>,
    pub patient: PatientSummary,
    pub tests: Vec<TestReport>,
}

impl LabReport {
    /// Khởi tạo phiếu từ các thành phần đã chuẩn bị.
    pub fn new(patient: PatientSummary, tests: Vec<TestReport>) -> Self {
        Self {
            generated_at: Utc::now(),
            patient,
            tests,
        }
    }

    /// Các dòng nằm ngoài khoảng tham chiếu, theo thứ tự phiếu.
    pub fn abnormal_rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.tests
            .iter()
            .flat_map(TestReport::rows)
            .filter(|row| row.deviation.is_abnormal())
    }
}

/// Lỗi chung khi tạo phiếu kết quả.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Hồ sơ thiếu thông tin tối thiểu")]
    MissingData,
    #[error("Không đọc được dữ liệu: {0}")]
    Parse(String),
    #[error("Lỗi khác: {0}")]
    Other(String),
}
