//! Cầu nối WASM <-> JavaScript cho phiếu kết quả xét nghiệm.

use labrange_core::{classify, flag, parse_numeric, ClassifierConfig, Deviation, OutOfRangeFlag, ReportError};
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
struct JsClassifierConfig {
    #[serde(default)]
    up_to_lower_bound: Option<f64>,
    #[serde(default)]
    moderate_threshold: Option<f64>,
    #[serde(default)]
    severe_threshold: Option<f64>,
}

impl From<JsClassifierConfig> for ClassifierConfig {
    fn from(cfg: JsClassifierConfig) -> Self {
        let mut base = ClassifierConfig::default();
        if let Some(lower) = cfg.up_to_lower_bound {
            base.up_to_lower_bound = lower;
        }
        if let Some(threshold) = cfg.moderate_threshold {
            base.moderate_threshold = threshold;
        }
        if let Some(threshold) = cfg.severe_threshold {
            base.severe_threshold = threshold;
        }
        base
    }
}

/// Kết quả phân loại trả về cho JavaScript.
#[derive(Serialize)]
struct JsClassification {
    deviation: Deviation,
    flag: Option<OutOfRangeFlag>,
    numeric: bool,
}

fn read_config(config: Option<JsValue>) -> Result<ClassifierConfig, JsValue> {
    match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => {
            let cfg: JsClassifierConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Không đọc được config: {err}")))?;
            Ok(ClassifierConfig::from(cfg))
        }
        _ => Ok(ClassifierConfig::default()),
    }
}

/// Dựng phiếu kết quả từ hồ sơ bệnh nhân (object JSON).
#[wasm_bindgen]
pub fn compose_report(record: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let record_value = from_value::<serde_json::Value>(record)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được hồ sơ JSON: {err}")))?;

    let cfg = read_config(config)?;

    let report = labrange_report::compose_report_value(&record_value, &cfg)
        .map_err(|err| JsValue::from_str(&format_report_error(err)))?;

    to_value(&report).map_err(|err| JsValue::from_str(&format!("Không serialize phiếu: {err}")))
}

/// Phân loại một giá trị theo chuỗi khoảng tham chiếu đã chọn sẵn.
#[wasm_bindgen]
pub fn classify_range(
    value: &str,
    range_text: &str,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let cfg = read_config(config)?;
    let numeric = parse_numeric(range_text, &cfg);

    let result = JsClassification {
        deviation: classify(value, numeric.as_ref(), &cfg),
        flag: flag(value, numeric.as_ref()),
        numeric: numeric.is_some(),
    };

    to_value(&result).map_err(|err| JsValue::from_str(&format!("Không serialize kết quả: {err}")))
}

fn format_report_error(err: ReportError) -> String {
    format!("Report error: {err}")
}
