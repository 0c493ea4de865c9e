//! Result tables handed to report and plotting consumers.

use crate::aggregate::CohortSummary;
use crate::data::Diagnostics;
use crate::error::Result;
use crate::test::{PairwiseResults, TestOutcome};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Results of one cohort analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// Analysis name.
    pub name: String,
    /// Kind of cohort scheme used.
    pub scheme: String,
    /// Cohort summaries in display order.
    pub summaries: Vec<CohortSummary>,
    /// Test across all cohorts at once, if requested.
    pub all_groups_test: Option<TestOutcome>,
    /// Requested pairwise tests.
    pub pairwise: PairwiseResults,
    /// Samples the cohort scheme scoped out.
    pub diagnostics: Diagnostics,
}

impl AnalysisOutput {
    /// Look up a cohort summary by label.
    pub fn summary(&self, label: &str) -> Option<&CohortSummary> {
        self.summaries.iter().find(|s| s.label == label)
    }

    /// All test outcomes, the all-groups test first.
    pub fn tests(&self) -> impl Iterator<Item = &TestOutcome> {
        self.all_groups_test.iter().chain(self.pairwise.outcomes.iter())
    }

    /// Write cohort summaries to TSV.
    pub fn write_summaries_tsv<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(
            writer,
            "label\tn\tpresent_count\tabsent_count\tpresence_fraction\tmean_cpm"
        )?;

        for s in &self.summaries {
            let mean_cpm = s
                .mean_cpm
                .map(|m| format!("{:.4}", m))
                .unwrap_or_else(|| "NA".to_string());
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}",
                s.label, s.n, s.present_count, s.absent_count, s.presence_fraction, mean_cpm
            )?;
        }

        Ok(())
    }

    /// Write test results to TSV.
    ///
    /// Failed tests are kept as rows with `NA` values and the failure reason.
    pub fn write_tests_tsv<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(
            writer,
            "{}",
            concat!(
                "groups_compared\tstatistic\tdegrees_of_freedom\tp_value\tadjusted_p_value\t",
                "continuity_correction_applied\tn_pairwise_tests\tcorrection\tstatus"
            )
        )?;

        for outcome in self.tests() {
            let groups = outcome.groups_compared().join(",");
            match outcome {
                TestOutcome::Completed(r) => {
                    let adjusted = r
                        .adjusted_p_value
                        .map(|p| format!("{:.4e}", p))
                        .unwrap_or_else(|| "NA".to_string());
                    writeln!(
                        writer,
                        "{}\t{:.4}\t{}\t{:.4e}\t{}\t{}\t{}\t{}\tok",
                        groups,
                        r.statistic,
                        r.degrees_of_freedom,
                        r.p_value,
                        adjusted,
                        r.continuity_correction_applied,
                        self.pairwise.n_tests,
                        self.pairwise.correction.name(),
                    )?;
                }
                TestOutcome::Failed { reason, .. } => {
                    writeln!(
                        writer,
                        "{}\tNA\tNA\tNA\tNA\tNA\t{}\t{}\tfailed: {}",
                        groups,
                        self.pairwise.n_tests,
                        self.pairwise.correction.name(),
                        reason
                    )?;
                }
            }
        }

        Ok(())
    }
}

/// Results of a full pipeline pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Pipeline name.
    pub name: String,
    /// Records entering normalization.
    pub n_input: usize,
    /// Records surviving normalization and the depth filter.
    pub n_classified: usize,
    /// Records called present.
    pub n_present: usize,
    /// Rows dropped while loading or normalizing.
    pub diagnostics: Diagnostics,
    /// One output per configured analysis, in configuration order.
    pub analyses: Vec<AnalysisOutput>,
}

impl PipelineOutput {
    /// Look up an analysis by name.
    pub fn analysis(&self, name: &str) -> Option<&AnalysisOutput> {
        self.analyses.iter().find(|a| a.name == name)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write pretty JSON to a file.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Write `<analysis>_summary.tsv` and `<analysis>_tests.tsv` into a directory.
    pub fn write_tsv_dir<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        for analysis in &self.analyses {
            let summary_path = dir.join(format!("{}_summary.tsv", analysis.name));
            let mut writer = BufWriter::new(File::create(summary_path)?);
            analysis.write_summaries_tsv(&mut writer)?;
            writer.flush()?;

            let tests_path = dir.join(format!("{}_tests.tsv", analysis.name));
            let mut writer = BufWriter::new(File::create(tests_path)?);
            analysis.write_tests_tsv(&mut writer)?;
            writer.flush()?;
        }

        Ok(())
    }
}

impl std::fmt::Display for PipelineOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Pipeline '{}'", self.name)?;
        writeln!(f, "  Input samples:      {}", self.n_input)?;
        writeln!(f, "  Classified samples: {}", self.n_classified)?;
        writeln!(f, "  Present:            {}", self.n_present)?;
        write!(f, "{}", self.diagnostics)?;
        for analysis in &self.analyses {
            writeln!(f, "Analysis '{}' ({})", analysis.name, analysis.scheme)?;
            for s in &analysis.summaries {
                writeln!(
                    f,
                    "  {:<20} n={:<6} present={:<6} fraction={}",
                    s.label, s.n, s.present_count, s.presence_fraction
                )?;
            }
            for outcome in analysis.tests() {
                match outcome {
                    TestOutcome::Completed(r) => writeln!(
                        f,
                        "  test [{}]: X2={:.3}, df={}, p={:.3e}",
                        r.groups_compared.join(" vs "),
                        r.statistic,
                        r.degrees_of_freedom,
                        r.p_value
                    )?,
                    TestOutcome::Failed {
                        groups_compared,
                        reason,
                    } => writeln!(
                        f,
                        "  test [{}]: failed ({})",
                        groups_compared.join(" vs "),
                        reason
                    )?,
                }
            }
        }
        Ok(())
    }
}
