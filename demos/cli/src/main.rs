mod logging;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use labrange_core::{ClassifierConfig, LabReport, ReportRow};
use labrange_report::compose_report_str;
use logging::{init_logging, LogConfig, LogFormat};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "labrange-cli",
    about = "Tạo phiếu kết quả xét nghiệm từ hồ sơ bệnh nhân JSON."
)]
struct Args {
    /// Đường dẫn tới file JSON hồ sơ bệnh nhân.
    #[arg(short, long)]
    input: PathBuf,

    /// File JSON cấu hình ngưỡng phân loại (tùy chọn).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// In phiếu dạng JSON thay vì bảng.
    #[arg(long)]
    json: bool,

    /// Tăng mức log (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Định dạng log.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Tắt màu ANSI trong log.
    #[arg(long)]
    no_color: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(
        &LogConfig::from_verbosity(args.verbose)
            .with_format(args.log_format)
            .with_ansi(!args.no_color),
    );

    let data = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Không đọc được file {:?}", args.input))?;

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ClassifierConfig::default(),
    };

    let report = compose_report_str(&data, &config)
        .with_context(|| format!("Không dựng được phiếu từ {:?}", args.input))?;
    info!(
        tests = report.tests.len(),
        abnormal = report.abnormal_rows().count(),
        "Đã dựng phiếu"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<ClassifierConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Không đọc được file cấu hình {path:?}"))?;
    serde_json::from_str(&text).with_context(|| format!("Cấu hình không hợp lệ: {path:?}"))
}

fn print_report(report: &LabReport) {
    let patient = &report.patient;
    println!(
        "Patient: {}\nGender: {:?}\nAge (days): {}\nReported on: {}",
        patient.name.as_deref().unwrap_or("-"),
        patient.gender,
        patient
            .age_days
            .map(|days| format!("{days:.0}"))
            .unwrap_or_else(|| "-".to_string()),
        patient.reported_on.as_deref().unwrap_or("-"),
    );

    for test in &report.tests {
        println!("\n== {} ({} abnormal)", test.name, test.abnormal_count);
        for section in &test.sections {
            if let Some(heading) = &section.heading {
                println!("-- {heading}");
            }
            for row in &section.rows {
                println!("{}", format_row(row));
            }
        }
    }
}

fn format_row(row: &ReportRow) -> String {
    let indent = "  ".repeat(usize::from(row.depth));
    let name = format!("{indent}{}", row.name);
    format!(
        "{name:<32} {:>10} {:<2} {:<12} {}",
        row.value,
        row.flag.map(|flag| flag.label()).unwrap_or(""),
        row.unit.as_deref().unwrap_or(""),
        row.range.replace('\n', " / "),
    )
}
