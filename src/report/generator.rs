//! Markdown and JSON report generation.
//!
//! This module renders the corpus report and writes the exported JSON
//! artefacts consumed by the dashboard.

use crate::models::{CorpusSummary, RegionDetail, Report, ReportMetadata};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// File names of the exported artefacts.
pub const AGGREGATES_FILE: &str = "district_aggregates.json";
pub const TIME_SERIES_FILE: &str = "time_series.json";
pub const SUMMARY_FILE: &str = "summary_stats.json";

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# RegionLens Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_summary_section(&report.summary));
    output.push_str(&generate_typology_section(&report.summary));
    output.push_str(&generate_ranked_section(
        "Most Volatile Regions",
        "Identity volatility is demographic updates per enrolment.",
        &report.most_volatile,
    ));
    output.push_str(&generate_ranked_section(
        "Lowest Adult Biometric Compliance",
        "Adult biometric updates relative to adult enrolments.",
        &report.lowest_compliance,
    ));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Source:** {} ({:?})\n",
        metadata.source, metadata.source_mode
    ));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Records:** {} enrolment, {} demographic, {} biometric\n",
        metadata.records.enrolment, metadata.records.demographic, metadata.records.biometric
    ));
    section.push_str(&format!(
        "- **Typology Policy:** `{:?}`\n",
        metadata.typology_policy
    ));
    section.push_str(&format!(
        "- **Lifecycle Integrity:** `{:?}` | **Maintenance Imbalance:** `{:?}`\n",
        metadata.lifecycle_variant, metadata.imbalance_variant
    ));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Summary](#summary)\n");

    if !report.summary.typology_distribution.is_empty() {
        toc.push_str("- [Typology Distribution](#typology-distribution)\n");
    }
    if !report.most_volatile.is_empty() {
        toc.push_str("- [Most Volatile Regions](#most-volatile-regions)\n");
    }
    if !report.lowest_compliance.is_empty() {
        toc.push_str("- [Lowest Adult Biometric Compliance](#lowest-adult-biometric-compliance)\n");
    }

    toc.push('\n');
    toc
}

/// Generate the corpus summary section.
fn generate_summary_section(summary: &CorpusSummary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Regions | Enrolments | Demographic Updates | Biometric Updates |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        summary.total_regions,
        summary.total_enrolments,
        summary.total_demo_updates,
        summary.total_bio_updates
    ));
    section.push_str(&format!(
        "- **Average identity volatility:** {:.4}\n",
        summary.avg_identity_volatility
    ));
    section.push_str(&format!(
        "- **Average adult biometric compliance:** {:.2}%\n\n",
        summary.avg_adult_bio_compliance
    ));

    section
}

/// Generate the typology histogram, largest label first.
fn generate_typology_section(summary: &CorpusSummary) -> String {
    if summary.typology_distribution.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Typology Distribution\n\n");
    section.push_str("| Typology | Regions | Share |\n");
    section.push_str("|:---|:---:|:---:|\n");

    let mut labels: Vec<_> = summary.typology_distribution.iter().collect();
    labels.sort_by_key(|(_, count)| std::cmp::Reverse(**count));

    let total = summary.total_regions.max(1) as f64;
    for (typology, count) in labels {
        section.push_str(&format!(
            "| {} | {} | {:.1}% |\n",
            typology,
            count,
            *count as f64 / total * 100.0
        ));
    }
    section.push('\n');

    section
}

/// Generate a ranked region table.
fn generate_ranked_section(title: &str, caption: &str, regions: &[RegionDetail]) -> String {
    if regions.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", title));
    section.push_str(&format!("*{}*\n\n", caption));
    section.push_str(
        "| # | District | State | Enrolments | Volatility | Adult Bio Compliance | Typology |\n",
    );
    section.push_str("|:---:|:---|:---|:---:|:---:|:---:|:---|\n");

    for (i, region) in regions.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {:.4} | {:.2}% | {} |\n",
            i + 1,
            region.district,
            region.state,
            region.total_enrolments,
            region.identity_volatility,
            region.adult_bio_compliance,
            region.district_typology
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by RegionLens*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Serialize a value as compact JSON into `dir/name`.
pub fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    let path = dir.join(name);
    let content = serde_json::to_string(value)
        .with_context(|| format!("Failed to serialize {}", name))?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Saved {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ImbalanceVariant, LifecycleVariant, TypologyPolicy};
    use crate::config::SourceMode;
    use crate::models::{RecordCounts, RegionAggregate, RegionKey, Typology};
    use chrono::Utc;
    use tempfile::TempDir;

    fn create_test_report() -> Report {
        let metadata = ReportMetadata {
            source: "datasets".to_string(),
            source_mode: SourceMode::Local,
            generated_at: Utc::now(),
            typology_policy: TypologyPolicy::Relative,
            lifecycle_variant: LifecycleVariant::BioToDemoRatio,
            imbalance_variant: ImbalanceVariant::Signed,
            records: RecordCounts {
                enrolment: 10,
                demographic: 20,
                biometric: 30,
            },
            duration_seconds: 1.5,
        };

        let mut agg = RegionAggregate::empty(RegionKey::new("Maharashtra", "Pune"));
        agg.enrol_18_plus = 700;
        agg.recompute_totals();
        agg.metrics.identity_volatility = 0.75;
        agg.metrics.adult_bio_compliance = 42.0;
        agg.typology = Typology::Volatile;
        let detail = RegionDetail::from_aggregate(&agg, false, None);

        Report {
            metadata,
            summary: CorpusSummary {
                total_regions: 2,
                total_enrolments: 700,
                total_demo_updates: 525,
                total_bio_updates: 294,
                avg_identity_volatility: 0.375,
                avg_adult_bio_compliance: 21.0,
                typology_distribution: [(Typology::Volatile, 1), (Typology::StableSaturated, 1)]
                    .into_iter()
                    .collect(),
            },
            most_volatile: vec![detail.clone()],
            lowest_compliance: vec![detail],
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# RegionLens Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("## Typology Distribution"));
        assert!(markdown.contains("| Stable & Saturated | 1 | 50.0% |"));
        assert!(markdown.contains("## Most Volatile Regions"));
        assert!(markdown.contains("| 1 | Pune | Maharashtra | 700 | 0.7500 | 42.00% | Volatile |"));
    }

    #[test]
    fn test_generate_metadata_section() {
        let report = create_test_report();
        let section = generate_metadata_section(&report.metadata);

        assert!(section.contains("datasets"));
        assert!(section.contains("10 enrolment, 20 demographic, 30 biometric"));
        assert!(section.contains("`Relative`"));
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let mut report = create_test_report();
        report.summary.typology_distribution.clear();
        report.most_volatile.clear();
        report.lowest_compliance.clear();

        let markdown = generate_markdown_report(&report);
        assert!(!markdown.contains("## Typology Distribution"));
        assert!(!markdown.contains("## Most Volatile Regions"));
        assert!(markdown.contains("## Summary"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"typology_distribution\""));
        assert!(json.contains("\"Stable & Saturated\""));
        assert!(json.contains("\"relative\""));
    }

    #[test]
    fn test_write_json() {
        let temp = TempDir::new().unwrap();
        let report = create_test_report();

        let path = write_json(temp.path(), SUMMARY_FILE, &report.summary).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        let parsed: CorpusSummary = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, report.summary);
    }
}
