//! Pipeline runner: normalize, classify, build cohorts, summarize, test.

use crate::aggregate::summarize_set;
use crate::classify::{ClassifiedRecord, Classifier, DEFAULT_CPM_THRESHOLD};
use crate::cohort::{AgeBinning, CohortBuilder, CohortScheme, CompositeMember, HEALTHY, INFANT};
use crate::correct::Correction;
use crate::data::{AnalysisOutput, Diagnostics, PipelineOutput, SampleRecord, SampleTable};
use crate::error::{BilrError, Result};
use crate::normalize::{norm_cpm, CpmConfig};
use crate::test::{ProportionTester, TestOutcome};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_threshold() -> f64 {
    DEFAULT_CPM_THRESHOLD
}

/// One cohort analysis: a scheme plus the tests to run on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Analysis name, used for output files.
    pub name: String,
    /// How samples are partitioned.
    pub scheme: CohortScheme,
    /// Test all cohorts together.
    #[serde(default)]
    pub test_all_groups: bool,
    /// Pairwise comparisons, by cohort label.
    #[serde(default)]
    pub pairs: Vec<(String, String)>,
    /// Multiple testing correction across the pairwise tests.
    #[serde(default)]
    pub correction: Correction,
}

impl AnalysisConfig {
    pub fn new(name: &str, scheme: CohortScheme) -> Self {
        Self {
            name: name.to_string(),
            scheme,
            test_all_groups: false,
            pairs: Vec::new(),
            correction: Correction::None,
        }
    }

    /// Also test all cohorts at once.
    pub fn all_groups(mut self) -> Self {
        self.test_all_groups = true;
        self
    }

    /// Add a pairwise comparison.
    pub fn pair(mut self, a: &str, b: &str) -> Self {
        self.pairs.push((a.to_string(), b.to_string()));
        self
    }

    /// Set the correction policy for the pairwise tests.
    pub fn correction(mut self, correction: Correction) -> Self {
        self.correction = correction;
        self
    }

    /// Check the scheme and that every pair names two distinct cohorts.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(BilrError::InvalidParameter(
                "Analysis name must not be empty".to_string(),
            ));
        }
        self.scheme.validate()?;

        let labels = self.scheme.labels();
        for (a, b) in &self.pairs {
            for label in [a, b] {
                if !labels.contains(label) {
                    return Err(BilrError::UnknownCohort {
                        analysis: self.name.clone(),
                        label: label.clone(),
                    });
                }
            }
            if a == b {
                return Err(BilrError::InvalidParameter(format!(
                    "Analysis '{}' compares cohort '{}' with itself",
                    self.name, a
                )));
            }
        }
        Ok(())
    }
}

/// Pipeline configuration for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the pipeline.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Depth filter and CPM scale.
    #[serde(default)]
    pub normalize: CpmConfig,
    /// CPM at or below which a sample is called absent.
    #[serde(default = "default_threshold")]
    pub presence_threshold: f64,
    /// Bioprojects left out of every analysis.
    #[serde(default)]
    pub excluded_bioprojects: Vec<String>,
    /// Apply Yates' correction to two-group tests.
    #[serde(default = "default_true")]
    pub continuity_correction: bool,
    /// Cohort analyses, in output order.
    #[serde(default)]
    pub analyses: Vec<AnalysisConfig>,
}

impl Default for PipelineConfig {
    /// The bilirubin reductase cohort study.
    fn default() -> Self {
        Self {
            name: "bilr".to_string(),
            description: Some(
                "BilR presence across infant age bins, IBD groups, and healthy adults".to_string(),
            ),
            normalize: CpmConfig::default(),
            presence_threshold: DEFAULT_CPM_THRESHOLD,
            excluded_bioprojects: Vec::new(),
            continuity_correction: true,
            analyses: vec![
                AnalysisConfig::new(
                    "infant_year",
                    CohortScheme::infant_age_bins(AgeBinning::year()),
                ),
                AnalysisConfig::new(
                    "infant_three_month",
                    CohortScheme::infant_age_bins(AgeBinning::three_month()),
                ),
                AnalysisConfig::new("ibd", CohortScheme::disease_groups(&["CD", "UC", HEALTHY]))
                    .all_groups()
                    .pair("CD", "UC")
                    .pair("CD", HEALTHY)
                    .pair("UC", HEALTHY),
                AnalysisConfig::new(
                    "infant_vs_adult",
                    CohortScheme::disease_groups(&[INFANT, HEALTHY]),
                )
                .pair(INFANT, HEALTHY),
                AnalysisConfig::new(
                    "newborn_vs_adult",
                    CohortScheme::composite(vec![
                        CompositeMember::new("infant_under_1_month", INFANT).age_range(0.0, 30.0),
                        CompositeMember::new("healthy_adult", HEALTHY),
                    ]),
                )
                .pair("infant_under_1_month", "healthy_adult"),
            ],
        }
    }
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(BilrError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(BilrError::from)
    }

    /// Check every setting before a run.
    pub fn validate(&self) -> Result<()> {
        self.normalize.validate()?;
        Classifier::new(self.presence_threshold)?;

        let mut names = std::collections::HashSet::new();
        for analysis in &self.analyses {
            analysis.validate()?;
            if !names.insert(analysis.name.as_str()) {
                return Err(BilrError::InvalidParameter(format!(
                    "Duplicate analysis name '{}'",
                    analysis.name
                )));
            }
        }
        Ok(())
    }
}

/// Builder for constructing and running the cohort pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create a pipeline with default thresholds and no analyses.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig {
                name: "unnamed".to_string(),
                description: None,
                analyses: Vec::new(),
                ..PipelineConfig::default()
            },
        }
    }

    /// The full study configuration.
    pub fn study() -> Self {
        Self::from_config(&PipelineConfig::default())
    }

    /// Create from a config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Set the pipeline name.
    pub fn name(mut self, name: &str) -> Self {
        self.config.name = name.to_string();
        self
    }

    /// Samples need strictly more than `min_total_reads` reads.
    pub fn min_total_reads(mut self, min_total_reads: u64) -> Self {
        self.config.normalize.min_total_reads = min_total_reads;
        self
    }

    /// Set the CPM scale factor.
    pub fn cpm_scale(mut self, scale_factor: f64) -> Self {
        self.config.normalize.scale_factor = scale_factor;
        self
    }

    /// Set the presence threshold in CPM.
    pub fn presence_threshold(mut self, threshold: f64) -> Self {
        self.config.presence_threshold = threshold;
        self
    }

    /// Leave a bioproject out of every analysis.
    pub fn exclude_bioproject(mut self, bioproject: &str) -> Self {
        self.config.excluded_bioprojects.push(bioproject.to_string());
        self
    }

    /// Enable or disable Yates' correction.
    pub fn continuity_correction(mut self, enabled: bool) -> Self {
        self.config.continuity_correction = enabled;
        self
    }

    /// Add an analysis.
    pub fn analysis(mut self, analysis: AnalysisConfig) -> Self {
        self.config.analyses.push(analysis);
        self
    }

    /// Convert to config for serialization.
    pub fn to_config(&self, description: Option<&str>) -> PipelineConfig {
        let mut config = self.config.clone();
        if let Some(d) = description {
            config.description = Some(d.to_string());
        }
        config
    }

    /// Run the pipeline on records.
    pub fn run_records(&self, records: &[SampleRecord]) -> Result<PipelineOutput> {
        self.run(&SampleTable::from_records(records.to_vec()))
    }

    /// Run the pipeline on a loaded table.
    pub fn run(&self, table: &SampleTable) -> Result<PipelineOutput> {
        let config = &self.config;
        config.validate()?;

        let cpm_table = norm_cpm(table.records(), &config.normalize)?;
        let classifier = Classifier::new(config.presence_threshold)?;
        let classified = classifier.classify_all(&cpm_table);

        let diagnostics =
            Diagnostics::from_exclusions(table.exclusions().iter().chain(&cpm_table.exclusions));

        tracing::info!(
            pipeline = %config.name,
            input = table.len(),
            classified = classified.len(),
            malformed = diagnostics.n_malformed,
            filtered = diagnostics.n_filtered,
            "normalized and classified samples"
        );

        let analyses = config
            .analyses
            .par_iter()
            .map(|analysis| self.run_analysis(analysis, &classified))
            .collect::<Result<Vec<_>>>()?;

        Ok(PipelineOutput {
            name: config.name.clone(),
            n_input: table.len(),
            n_classified: classified.len(),
            n_present: classified.iter().filter(|r| r.is_present()).count(),
            diagnostics,
            analyses,
        })
    }

    fn run_analysis(
        &self,
        analysis: &AnalysisConfig,
        classified: &[ClassifiedRecord],
    ) -> Result<AnalysisOutput> {
        let builder = CohortBuilder::new(analysis.scheme.clone())?
            .exclude_bioprojects(self.config.excluded_bioprojects.iter().cloned());
        let set = builder.build(classified);
        let summaries = summarize_set(&set);

        let tester = ProportionTester::new()
            .continuity_correction(self.config.continuity_correction)
            .correction(analysis.correction);

        let all_groups_test = if analysis.test_all_groups {
            Some(match tester.test_set(&set) {
                Ok(result) => TestOutcome::Completed(result),
                Err(e) => {
                    tracing::warn!(analysis = %analysis.name, error = %e, "all-groups test failed");
                    TestOutcome::Failed {
                        groups_compared: set.labels().iter().map(|l| l.to_string()).collect(),
                        reason: e.to_string(),
                    }
                }
            })
        } else {
            None
        };

        let pairwise = tester.test_pairs(&set, &analysis.pairs);

        tracing::info!(
            analysis = %analysis.name,
            cohorts = set.len(),
            assigned = set.n_assigned(),
            pairwise_tests = pairwise.n_tests,
            "analysis complete"
        );

        Ok(AnalysisOutput {
            name: analysis.name.clone(),
            scheme: analysis.scheme.kind().to_string(),
            summaries,
            all_groups_test,
            pairwise,
            diagnostics: set.diagnostics(),
        })
    }
}

/// Run the full study configuration.
pub fn run_study(table: &SampleTable) -> Result<PipelineOutput> {
    Pipeline::study().run(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FilterReason;

    fn create_test_records() -> Vec<SampleRecord> {
        let mut records = Vec::new();

        // Infants across the first year, present in even-indexed samples
        for i in 0..40u64 {
            let age = (i * 9) as f64;
            let gene = if i % 2 == 0 { 40 } else { 2 };
            records.push(
                SampleRecord::new(&format!("inf{}", i), "PRJ_INF", INFANT, 2_000_000, gene)
                    .with_age_days(age),
            );
        }

        // IBD and healthy adults
        for i in 0..20u64 {
            let gene = if i < 5 { 100 } else { 0 };
            records.push(SampleRecord::new(&format!("cd{}", i), "PRJ_IBD", "CD", 3_000_000, gene));
        }
        for i in 0..20u64 {
            let gene = if i < 10 { 100 } else { 0 };
            records.push(SampleRecord::new(&format!("uc{}", i), "PRJ_IBD", "UC", 3_000_000, gene));
        }
        for i in 0..20u64 {
            let gene = if i < 19 { 100 } else { 0 };
            records.push(SampleRecord::new(&format!("h{}", i), "PRJ_H", HEALTHY, 3_000_000, gene));
        }

        // Shallow sample and probiotic study sample
        records.push(SampleRecord::new("shallow", "PRJ_H", HEALTHY, 1_000_000, 500));
        records.push(SampleRecord::new("probiotic", "PRJ_PRO", "CD", 3_000_000, 100));
        records
    }

    #[test]
    fn test_pipeline_builder() {
        let pipeline = Pipeline::new()
            .name("test")
            .presence_threshold(5.0)
            .analysis(
                AnalysisConfig::new("ibd", CohortScheme::disease_groups(&["CD", "UC"]))
                    .pair("CD", "UC"),
            );

        let config = pipeline.to_config(Some("Test pipeline"));
        assert_eq!(config.analyses.len(), 1);
        assert_eq!(config.name, "test");
        assert_eq!(config.description.as_deref(), Some("Test pipeline"));
    }

    #[test]
    fn test_study_run() {
        let output = Pipeline::study()
            .exclude_bioproject("PRJ_PRO")
            .run_records(&create_test_records())
            .unwrap();

        assert_eq!(output.n_input, 102);
        assert_eq!(output.n_classified, 101);
        assert_eq!(output.diagnostics.filtered(FilterReason::Depth), 1);
        assert_eq!(output.analyses.len(), 5);

        let ibd = output.analysis("ibd").unwrap();
        assert_eq!(ibd.summary("CD").unwrap().n, 20);
        assert_eq!(ibd.summary("CD").unwrap().present_count, 5);
        assert_eq!(ibd.summary("healthy").unwrap().present_count, 19);
        assert_eq!(ibd.diagnostics.filtered(FilterReason::ExcludedBioproject), 1);
        assert_eq!(ibd.pairwise.n_tests, 3);
        assert!(ibd.all_groups_test.as_ref().unwrap().is_completed());

        let year = output.analysis("infant_year").unwrap();
        assert_eq!(year.summaries.len(), 13);
        assert_eq!(year.summaries.iter().map(|s| s.n).sum::<usize>(), 40);
    }

    #[test]
    fn test_empty_bins_do_not_abort() {
        let records: Vec<SampleRecord> = (0..10)
            .map(|i| {
                SampleRecord::new(&format!("i{}", i), "P", INFANT, 2_000_000, 100)
                    .with_age_days(2.0)
            })
            .chain(
                (0..10)
                    .map(|i| SampleRecord::new(&format!("h{}", i), "P", HEALTHY, 2_000_000, 0)),
            )
            .collect();

        let output = Pipeline::new()
            .analysis(
                AnalysisConfig::new(
                    "fine",
                    CohortScheme::infant_age_bins(AgeBinning::three_month()),
                )
                    .all_groups()
                    .pair("0-4", "5-9"),
            )
            .analysis(
                AnalysisConfig::new("adult", CohortScheme::disease_groups(&[INFANT, HEALTHY]))
                    .pair(INFANT, HEALTHY),
            )
            .run_records(&records)
            .unwrap();

        let fine = output.analysis("fine").unwrap();
        assert!(!fine.all_groups_test.as_ref().unwrap().is_completed());
        assert_eq!(fine.pairwise.n_tests, 0);
        assert!(fine.summaries[1].presence_fraction.is_undefined());

        let adult = output.analysis("adult").unwrap();
        assert_eq!(adult.pairwise.n_tests, 1);
    }

    #[test]
    fn test_unknown_pair_label_is_rejected() {
        let result = Pipeline::new()
            .analysis(
                AnalysisConfig::new("ibd", CohortScheme::disease_groups(&["CD", "UC"]))
                    .pair("CD", "IBS"),
            )
            .run_records(&create_test_records());

        assert!(matches!(result, Err(BilrError::UnknownCohort { .. })));
    }

    #[test]
    fn test_invalid_threshold_is_rejected() {
        let result = Pipeline::study()
            .presence_threshold(-1.0)
            .run_records(&create_test_records());
        assert!(result.is_err());
    }

    #[test]
    fn test_pipeline_config_yaml() {
        let config = PipelineConfig::default();
        let yaml = config.to_yaml().unwrap();

        let parsed = PipelineConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, config);
        parsed.validate().unwrap();
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let yaml = r#"
name: minimal
excluded_bioprojects: [PRJ_PRO]
analyses:
  - name: ibd
    scheme:
      type: disease_groups
      groups: [CD, UC, healthy]
    pairs:
      - [CD, UC]
    correction: bonferroni
"#;
        let config = PipelineConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.presence_threshold, 5.0);
        assert_eq!(config.normalize.min_total_reads, 1_000_000);
        assert!(config.continuity_correction);
        assert_eq!(config.analyses[0].correction, Correction::Bonferroni);

        let output = Pipeline::from_config(&config)
            .run_records(&create_test_records())
            .unwrap();
        let ibd = output.analysis("ibd").unwrap();
        let result = ibd.pairwise.get("CD", "UC").unwrap().result().unwrap();
        assert_eq!(result.adjusted_p_value, Some(result.p_value));
    }

    #[test]
    fn test_partial_normalize_section() {
        let yaml = "name: partial\nnormalize:\n  min_total_reads: 500000\n";
        let config = PipelineConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.normalize.min_total_reads, 500_000);
        assert_eq!(config.normalize.scale_factor, 1e6);
        config.validate().unwrap();

        let output = Pipeline::from_config(&config)
            .run_records(&create_test_records())
            .unwrap();
        // The 1M-read sample now passes the depth filter
        assert_eq!(output.n_classified, 102);
    }

    #[test]
    fn test_oversized_binning_is_rejected() {
        let yaml = r#"
name: wide
analyses:
  - name: bins
    scheme:
      type: age_bins
      binning: {width: 1, max_age: 1.0e30, open_last: false}
"#;
        let config = PipelineConfig::from_yaml(yaml).unwrap();

        assert!(matches!(
            config.validate(),
            Err(BilrError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_run_is_deterministic() {
        let records = create_test_records();
        let pipeline = Pipeline::study();

        let first = pipeline.run_records(&records).unwrap();
        let second = pipeline.run_records(&records).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }
}
