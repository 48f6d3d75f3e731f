//! Patient record JSON to `LabReport` converter.
//!
//! Records come from a schemaless document store, so every field below the
//! `tests` collection is read tolerantly: a malformed parameter or range
//! degrades to "no range" instead of failing the whole report.

use chrono::{DateTime, NaiveDate, Utc};
use labrange_core::age::{DAYS_PER_MONTH, DAYS_PER_YEAR};
use labrange_core::{
    compose_rows, AgeRangeItem, ClassifierConfig, Gender, GenderRangeTable, LabReport, Parameter,
    ParameterRange, PatientContext, PatientSummary, ReportError, ReportSection, TestReport,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

/// Compose a lab report from a JSON string.
pub fn compose_report_str(
    record_json: &str,
    config: &ClassifierConfig,
) -> Result<LabReport, ReportError> {
    let value: Value =
        serde_json::from_str(record_json).map_err(|err| ReportError::Parse(err.to_string()))?;
    compose_report_value(&value, config)
}

/// Compose a lab report from a `serde_json::Value`.
pub fn compose_report_value(
    record: &Value,
    config: &ClassifierConfig,
) -> Result<LabReport, ReportError> {
    if !record.is_object() {
        return Err(ReportError::Parse(
            "Expected a patient record object".to_string(),
        ));
    }

    let tests = record
        .get("tests")
        .map(collection_items)
        .ok_or(ReportError::MissingData)?;

    let today = Utc::now().date_naive();
    let patient = extract_patient(record, today);
    let context = patient.context();

    info!(
        tests = tests.len(),
        age_known = patient.age_days.is_some(),
        "Composing lab report"
    );

    let reports = tests
        .into_iter()
        .map(|test| compose_test(test, &context, config))
        .collect();

    Ok(LabReport::new(patient, reports))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Subheading {
    title: String,
    #[serde(default)]
    parameter_names: Vec<String>,
}

fn compose_test(
    test: &Value,
    patient: &PatientContext,
    config: &ClassifierConfig,
) -> TestReport {
    let name = first_text(test, &["testName", "name"]).unwrap_or_else(|| "Test".to_string());

    let parameters: Vec<Parameter> = test
        .get("parameters")
        .map(collection_items)
        .unwrap_or_default()
        .into_iter()
        .filter_map(parameter_from_value)
        .collect();

    let subheadings: Vec<Subheading> = test
        .get("subheadings")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|entry| Subheading::deserialize(entry).ok())
                .collect()
        })
        .unwrap_or_default();

    let mut ungrouped = ReportSection::default();
    let mut grouped: Vec<ReportSection> = subheadings
        .iter()
        .map(|sub| ReportSection {
            heading: Some(sub.title.clone()),
            rows: Vec::new(),
        })
        .collect();

    for parameter in &parameters {
        let rows = compose_rows(parameter, patient, config);
        let group = subheadings
            .iter()
            .position(|sub| sub.parameter_names.iter().any(|n| n == &parameter.name));
        match group {
            Some(index) => grouped[index].rows.extend(rows),
            None => ungrouped.rows.extend(rows),
        }
    }

    let mut sections = Vec::with_capacity(grouped.len() + 1);
    if !ungrouped.rows.is_empty() {
        sections.push(ungrouped);
    }
    sections.extend(grouped.into_iter().filter(|section| !section.rows.is_empty()));

    let report = TestReport::new(name, sections);
    debug!(
        test = %report.name,
        parameters = parameters.len(),
        abnormal = report.abnormal_count,
        "Composed test"
    );
    report
}

fn parameter_from_value(value: &Value) -> Option<Parameter> {
    let name = first_text(value, &["name"])?;

    Some(Parameter {
        name,
        value: value.get("value").and_then(scalar_text).unwrap_or_default(),
        unit: value.get("unit").and_then(scalar_text),
        range: value.get("range").and_then(range_from_value),
        subparameters: value
            .get("subparameters")
            .map(collection_items)
            .unwrap_or_default()
            .into_iter()
            .filter_map(parameter_from_value)
            .collect(),
    })
}

fn range_from_value(value: &Value) -> Option<ParameterRange> {
    if let Some(text) = scalar_text(value) {
        return Some(ParameterRange::Fixed(text));
    }

    let obj = value.as_object()?;
    let table = GenderRangeTable {
        male: gender_items(obj.get("male")),
        female: gender_items(obj.get("female")),
    };

    if table.male.is_none() && table.female.is_none() {
        debug!("Range object without gender tables");
        return None;
    }

    Some(ParameterRange::ByGenderAge(table))
}

/// A gender key counts as present only when it holds a collection.
fn gender_items(value: Option<&Value>) -> Option<Vec<AgeRangeItem>> {
    value
        .filter(|v| v.is_array() || v.is_object())
        .map(age_items_from_value)
}

/// Keyless buckets are kept: they never match an age but may still be the last bucket.
fn age_items_from_value(value: &Value) -> Vec<AgeRangeItem> {
    collection_items(value)
        .into_iter()
        .filter(|item| item.is_object())
        .map(|item| AgeRangeItem {
            range_key: item
                .get("rangeKey")
                .and_then(scalar_text)
                .unwrap_or_default(),
            range_value: item
                .get("rangeValue")
                .and_then(scalar_text)
                .unwrap_or_default(),
        })
        .collect()
}

fn extract_patient(record: &Value, today: NaiveDate) -> PatientSummary {
    let reported_on = first_text(record, &["reportedOn"]);
    let reference_date = reported_on
        .as_deref()
        .and_then(parse_date_or_datetime)
        .unwrap_or(today);

    PatientSummary {
        name: first_text(record, &["name", "patientName"]),
        gender: record
            .get("gender")
            .and_then(Value::as_str)
            .map(Gender::parse)
            .unwrap_or_default(),
        age_days: extract_age_days(record, reference_date),
        reported_on,
    }
}

fn extract_age_days(record: &Value, reference_date: NaiveDate) -> Option<f64> {
    let explicit_age = record.get("age").and_then(|age| match age {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    });

    if let Some(age) = explicit_age.filter(|age| age.is_finite() && *age >= 0.0) {
        let unit = record
            .get("ageUnit")
            .and_then(Value::as_str)
            .unwrap_or("years")
            .trim()
            .to_lowercase();
        let multiplier = match unit.chars().next() {
            Some('d') => 1.0,
            Some('m') => DAYS_PER_MONTH,
            _ => DAYS_PER_YEAR,
        };
        return Some(age * multiplier);
    }

    let birth_date = record
        .get("dateOfBirth")
        .and_then(Value::as_str)
        .and_then(parse_date)?;
    let days = reference_date.signed_duration_since(birth_date).num_days();
    if days >= 0 {
        Some(days as f64)
    } else {
        None
    }
}

/// Items of a collection stored either as an array or as a key-ordered map.
fn collection_items(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(arr) => arr.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => Vec::new(),
    }
}

fn first_text(value: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|field| value.get(*field).and_then(scalar_text))
        .next()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(number) => number.as_f64().map(format_numeric),
        _ => None,
    }
}

fn format_numeric(value: f64) -> String {
    if (value.fract() - 0.0).abs() < f64::EPSILON {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

fn parse_date_or_datetime(value: &str) -> Option<NaiveDate> {
    parse_datetime(value)
        .map(|dt| dt.date_naive())
        .or_else(|| parse_date(value))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
