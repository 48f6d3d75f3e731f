//! Dựng các dòng phiếu kết quả cho một chỉ số và các chỉ số con.

use tracing::trace;

use crate::age::{display_range, resolve_range};
use crate::classify::{classify, flag};
use crate::numeric::parse_numeric;
use crate::{ClassifierConfig, Parameter, PatientContext, ReportRow};

/// Dòng của chỉ số cha đứng trước, các chỉ số con theo sau với `depth` tăng 1.
pub fn compose_rows(
    parameter: &Parameter,
    patient: &PatientContext,
    config: &ClassifierConfig,
) -> Vec<ReportRow> {
    let mut rows = Vec::with_capacity(1 + parameter.subparameters.len());
    push_rows(parameter, patient, config, 0, &mut rows);
    rows
}

fn push_rows(
    parameter: &Parameter,
    patient: &PatientContext,
    config: &ClassifierConfig,
    depth: u8,
    rows: &mut Vec<ReportRow>,
) {
    rows.push(compose_row(parameter, patient, config, depth));
    for child in &parameter.subparameters {
        push_rows(child, patient, config, depth.saturating_add(1), rows);
    }
}

fn compose_row(
    parameter: &Parameter,
    patient: &PatientContext,
    config: &ClassifierConfig,
    depth: u8,
) -> ReportRow {
    let range = display_range(&resolve_range(parameter.range.as_ref(), patient));
    let numeric = parse_numeric(&range, config);
    let value = parameter.value.trim().to_string();
    let deviation = classify(&value, numeric.as_ref(), config);

    trace!(
        parameter = %parameter.name,
        numeric_range = numeric.is_some(),
        level = ?deviation.level,
        "Đã phân loại chỉ số"
    );

    ReportRow {
        name: parameter.name.clone(),
        flag: flag(&value, numeric.as_ref()),
        value,
        unit: parameter
            .unit
            .as_ref()
            .map(|unit| unit.trim().to_string())
            .filter(|unit| !unit.is_empty()),
        range,
        deviation,
        depth,
    }
}
