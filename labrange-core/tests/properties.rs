use labrange_core::{
    classify, compose_rows, parse_numeric, resolve, AgeRangeItem, ClassifierConfig, DeviationLevel,
    DeviationSeverity, Gender, GenderRangeTable, NumericRange, OutOfRangeFlag, Parameter,
    ParameterRange, PatientContext,
};
use proptest::prelude::*;

/// Dựng các nhóm tuổi liền nhau, không chồng lấn, theo ngày.
fn contiguous_buckets(widths: &[u32]) -> (Vec<AgeRangeItem>, Vec<(u32, u32)>) {
    let mut items = Vec::new();
    let mut bounds = Vec::new();
    let mut lower = 0u32;
    for (index, width) in widths.iter().enumerate() {
        let upper = lower + width;
        items.push(AgeRangeItem {
            range_key: format!("{lower}-{upper}d"),
            range_value: format!("bucket-{index}"),
        });
        bounds.push((lower, upper));
        lower = upper + 1;
    }
    (items, bounds)
}

proptest! {
    #[test]
    fn resolve_returns_containing_bucket(
        widths in prop::collection::vec(0u32..400, 1..8),
        pick in any::<prop::sample::Index>(),
        offset in 0u32..400,
    ) {
        let (items, bounds) = contiguous_buckets(&widths);
        let index = pick.index(bounds.len());
        let (lower, upper) = bounds[index];
        let age = lower + offset % (upper - lower + 1);

        prop_assert_eq!(resolve(&items, f64::from(age)), format!("bucket-{index}"));
    }

    #[test]
    fn resolve_falls_back_to_last_bucket(
        widths in prop::collection::vec(0u32..400, 1..8),
        beyond in 1u32..10_000,
    ) {
        let (items, bounds) = contiguous_buckets(&widths);
        let (_, last_upper) = bounds[bounds.len() - 1];
        let age = f64::from(last_upper + beyond);

        prop_assert_eq!(resolve(&items, age), format!("bucket-{}", bounds.len() - 1));
    }

    #[test]
    fn severity_grows_with_distance_below_lower(
        lower in 1.0f64..1000.0,
        near in 0.0f64..1.0,
        extra in 0.0f64..1.0,
    ) {
        let config = ClassifierConfig::default();
        let range = NumericRange { lower, upper: lower * 2.0 };
        let closer = lower * (1.0 - near * 0.5);
        let farther = closer - lower * extra * 0.5;

        let a = classify(&closer.to_string(), Some(&range), &config);
        let b = classify(&farther.to_string(), Some(&range), &config);
        let rank = |severity: Option<DeviationSeverity>| severity.map_or(0, |s| s as u8 + 1);

        prop_assert!(rank(a.severity) <= rank(b.severity));
    }

    #[test]
    fn free_text_ranges_never_flag(value in -1.0e6f64..1.0e6, word in "[a-zA-Z ]{1,20}") {
        let config = ClassifierConfig::default();
        let parsed = parse_numeric(&word, &config);
        let deviation = classify(&value.to_string(), parsed.as_ref(), &config);
        prop_assert_eq!(deviation.level, DeviationLevel::Normal);
    }

    #[test]
    fn composer_is_idempotent(value in "[0-9]{1,3}(\\.[0-9])?", age in 0u32..40_000) {
        let parameter = Parameter {
            name: "Platelets".to_string(),
            value,
            unit: Some("10^3/uL".to_string()),
            range: Some(ParameterRange::ByGenderAge(GenderRangeTable {
                male: Some(vec![
                    AgeRangeItem { range_key: "0-1y".to_string(), range_value: "200-475".to_string() },
                    AgeRangeItem { range_key: "1y".to_string(), range_value: "150-450".to_string() },
                ]),
                female: None,
            })),
            subparameters: Vec::new(),
        };
        let patient = PatientContext { age_days: Some(f64::from(age)), gender: Gender::Male };
        let config = ClassifierConfig::default();

        let first = compose_rows(&parameter, &patient, &config);
        let second = compose_rows(&parameter, &patient, &config);
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}

#[test]
fn documented_parse_examples() {
    let config = ClassifierConfig::default();
    assert_eq!(
        parse_numeric("4-7", &config),
        Some(NumericRange { lower: 4.0, upper: 7.0 })
    );
    assert_eq!(
        parse_numeric("up to 12.5", &config),
        Some(NumericRange { lower: 0.0, upper: 12.5 })
    );
    assert_eq!(
        parse_numeric("> 10", &config),
        Some(NumericRange { lower: 10.0, upper: f64::INFINITY })
    );
    assert_eq!(parse_numeric("normal", &config), None);
}

#[test]
fn severity_example_under_lower_bound() {
    let config = ClassifierConfig::default();
    let range = NumericRange { lower: 10.0, upper: 20.0 };
    let mild = classify("9", Some(&range), &config);
    let severe = classify("6", Some(&range), &config);
    assert_eq!(mild.severity, Some(DeviationSeverity::Mild));
    assert_eq!(severe.severity, Some(DeviationSeverity::Severe));
    assert!(mild.severity <= severe.severity);
}

#[test]
fn scenario_fixed_range_in_bounds() {
    let parameter = Parameter {
        name: "Hemoglobin".to_string(),
        value: "15".to_string(),
        unit: Some("g/dL".to_string()),
        range: Some(ParameterRange::Fixed("12-16".to_string())),
        subparameters: Vec::new(),
    };
    let rows = compose_rows(&parameter, &PatientContext::default(), &ClassifierConfig::default());

    assert_eq!(rows[0].range, "12-16");
    assert_eq!(rows[0].flag, None);
    assert_eq!(rows[0].deviation.level, DeviationLevel::Normal);
}

#[test]
fn scenario_newborn_male_bucket() {
    let parameter = Parameter {
        name: "Bilirubin".to_string(),
        value: "2".to_string(),
        unit: None,
        range: Some(ParameterRange::ByGenderAge(GenderRangeTable {
            male: Some(vec![AgeRangeItem {
                range_key: "0-30d".to_string(),
                range_value: "1-3".to_string(),
            }]),
            female: Some(vec![AgeRangeItem {
                range_key: "0-30d".to_string(),
                range_value: "5-9".to_string(),
            }]),
        })),
        subparameters: Vec::new(),
    };
    let patient = PatientContext {
        age_days: Some(10.0),
        gender: Gender::parse("MALE"),
    };
    let rows = compose_rows(&parameter, &patient, &ClassifierConfig::default());

    assert_eq!(rows[0].range, "1-3");
    assert_eq!(rows[0].deviation.level, DeviationLevel::Normal);
}

#[test]
fn scenario_up_to_breach_is_severe_high() {
    let parameter = Parameter {
        name: "Urea".to_string(),
        value: "20".to_string(),
        unit: None,
        range: Some(ParameterRange::Fixed("up to 12.5".to_string())),
        subparameters: Vec::new(),
    };

    for lower in [0.0, 1.0] {
        let config = ClassifierConfig {
            up_to_lower_bound: lower,
            ..ClassifierConfig::default()
        };
        let rows = compose_rows(&parameter, &PatientContext::default(), &config);
        assert_eq!(rows[0].deviation.level, DeviationLevel::High);
        assert_eq!(rows[0].deviation.severity, Some(DeviationSeverity::Severe));
        assert_eq!(rows[0].flag, Some(OutOfRangeFlag::High));
    }
}

#[test]
fn range_deserializes_from_string_or_table() {
    let fixed: Parameter =
        serde_json::from_str(r#"{"name":"Hb","value":"13","range":"12-16"}"#).unwrap();
    assert_eq!(fixed.range, Some(ParameterRange::Fixed("12-16".to_string())));

    let table: Parameter = serde_json::from_str(
        r#"{"name":"Hb","value":"13","range":{"female":[{"rangeKey":"0-100y","rangeValue":"12-16"}]}}"#,
    )
    .unwrap();
    match table.range {
        Some(ParameterRange::ByGenderAge(table)) => {
            assert!(table.male.is_none());
            assert_eq!(table.female.unwrap()[0].range_value, "12-16");
        }
        other => panic!("unexpected range: {other:?}"),
    }
}

#[test]
fn partial_config_keeps_default_thresholds() {
    let config: ClassifierConfig = serde_json::from_str(r#"{"up_to_lower_bound": 1.0}"#).unwrap();
    assert_eq!(config.up_to_lower_bound, 1.0);
    assert_eq!(config.moderate_threshold, 0.1);
    assert_eq!(config.severe_threshold, 0.3);
}
