//! Predicts whether a bug will need developer documentation.
//!
//! Labels come from the bug's keyword history (see [`labeling::dev_doc`]).
//! Features are taken from the bug as it looked before `dev-doc-needed` was
//! first added, so the model never sees the outcome it is asked to predict.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::bugzilla::{Bug, BugDataError, BugId, Change, DEV_DOC_COMPLETE, DEV_DOC_NEEDED};
use crate::config::TriageConfig;
use crate::features::{BugExtractor, CleanupFunction, FeatureExtractor};
use crate::labeling::{self, LABEL_DOMAIN, Label, LabelError, LabelSet, dev_doc};
use crate::ml::cpu::physical_cpu_count;
use crate::ml::gbdt_stump::{GbdtStumpModel, TrainDataset, TrainOptions, train_gbdt_stump};
use crate::ml::metrics::{ConfusionMatrix, PerClassStats, accuracy, precision_recall_by_class};
use crate::ml::sampler::RandomUnderSampler;
use crate::pipeline::{Column, ColumnTransformer, ExtractionPipeline, PipelineError, TextField};

/// Version of the saved model layout written by [`DevDocNeededModel::save_json`].
pub const MODEL_FORMAT_VERSION: i64 = 1;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Labels(#[from] LabelError),
    #[error("Model has not been trained")]
    NotFitted,
    #[error("Not enough data to train: {0}")]
    NotEnoughData(String),
    #[error("Training failed: {0}")]
    Train(String),
    #[error("Failed to access model file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid model file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Incompatible model file {path}: {reason}")]
    Incompatible { path: PathBuf, reason: String },
}

impl From<PipelineError> for ModelError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NotFitted => Self::NotFitted,
        }
    }
}

/// Held-out evaluation computed at the end of [`DevDocNeededModel::train`].
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub accuracy: f32,
    pub per_class: Vec<PerClassStats>,
    pub confusion: ConfusionMatrix,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    /// Labeled bugs per class, in label-domain order.
    pub label_counts: Vec<usize>,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Training rows left after under-sampling.
    pub sampled_rows: usize,
    pub feature_len: usize,
    /// `None` when the test split is empty.
    pub evaluation: Option<Evaluation>,
}

#[derive(Serialize)]
struct SavedModelRef<'a> {
    format_version: i64,
    settings: &'a TriageConfig,
    union: &'a ColumnTransformer,
    estimator: &'a GbdtStumpModel,
}

#[derive(Deserialize)]
struct SavedModel {
    format_version: i64,
    settings: TriageConfig,
    union: ColumnTransformer,
    estimator: GbdtStumpModel,
}

/// Dev-doc-needed classifier: configuration plus, once trained, the fitted
/// column transform and estimator.
#[derive(Debug, Clone)]
pub struct DevDocNeededModel {
    settings: TriageConfig,
    cross_validation_enabled: bool,
    sampler: RandomUnderSampler,
    pipeline: ExtractionPipeline,
    n_jobs: usize,
    estimator: Option<GbdtStumpModel>,
}

impl DevDocNeededModel {
    pub fn new(settings: TriageConfig) -> Self {
        let bug_extractor = BugExtractor::new(Self::feature_extractors(), Self::cleanup_functions())
            .with_rollback(Self::rollback)
            .with_commit_data(true);
        let union = Self::column_transformer(&settings);
        let n_jobs = settings
            .training
            .n_jobs
            .unwrap_or_else(physical_cpu_count)
            .max(1);
        Self {
            sampler: RandomUnderSampler::new(settings.training.sampler_seed),
            cross_validation_enabled: false,
            pipeline: ExtractionPipeline::new(bug_extractor, union),
            n_jobs,
            estimator: None,
            settings,
        }
    }

    /// Structured extractors, in the order their values enter the `data` column.
    pub fn feature_extractors() -> Vec<FeatureExtractor> {
        vec![
            FeatureExtractor::HasStr,
            FeatureExtractor::HasRegressionRange,
            FeatureExtractor::Severity,
            FeatureExtractor::keywords_ignoring([DEV_DOC_NEEDED, DEV_DOC_COMPLETE]),
            FeatureExtractor::IsCoverityIssue,
            FeatureExtractor::HasCrashSignature,
            FeatureExtractor::HasUrl,
            FeatureExtractor::HasW3cUrl,
            FeatureExtractor::HasGithubUrl,
            FeatureExtractor::Whiteboard,
            FeatureExtractor::Patches,
            FeatureExtractor::Landings,
            FeatureExtractor::Product,
            FeatureExtractor::Component,
            FeatureExtractor::CommitAdded,
            FeatureExtractor::CommitDeleted,
            FeatureExtractor::CommitTypes,
        ]
    }

    pub fn cleanup_functions() -> Vec<CleanupFunction> {
        vec![
            CleanupFunction::FileRef,
            CleanupFunction::Url,
            CleanupFunction::Synonyms,
        ]
    }

    fn column_transformer(settings: &TriageConfig) -> ColumnTransformer {
        let min_df = settings.text.min_df;
        ColumnTransformer::new(vec![
            Column::dict("data"),
            Column::text("title", TextField::Title, min_df),
            Column::text("comments", TextField::Comments, min_df),
        ])
    }

    /// Rollback point: the change that first adds a dev-doc keyword.
    pub fn rollback(change: &Change) -> bool {
        dev_doc::adds_dev_doc_keyword(change)
    }

    /// Derive labels using the configured history and invalid-bug policies.
    pub fn get_labels<I>(&self, source: I) -> Result<LabelSet, ModelError>
    where
        I: IntoIterator<Item = Result<Bug, BugDataError>>,
    {
        let labels = labeling::derive_labels(source, self.settings.labels)?;
        let counts = labels.counts();
        info!(
            labeled = labels.classes.len(),
            negative = counts.first().copied().unwrap_or(0),
            positive = counts.get(1).copied().unwrap_or(0),
            "Derived dev-doc-needed labels"
        );
        Ok(labels)
    }

    /// Output feature names of the fitted column transform, prefixed by column.
    pub fn get_feature_names(&self) -> Result<Vec<String>, ModelError> {
        if self.estimator.is_none() {
            return Err(ModelError::NotFitted);
        }
        Ok(self.pipeline.feature_names_out()?)
    }

    pub fn settings(&self) -> &TriageConfig {
        &self.settings
    }

    pub fn cross_validation_enabled(&self) -> bool {
        self.cross_validation_enabled
    }

    pub fn sampler(&self) -> &RandomUnderSampler {
        &self.sampler
    }

    pub fn bug_extractor(&self) -> &BugExtractor {
        &self.pipeline.bug_extractor
    }

    pub fn column_transformer_config(&self) -> &ColumnTransformer {
        &self.pipeline.union
    }

    /// Worker threads given to the estimator.
    pub fn n_jobs(&self) -> usize {
        self.n_jobs
    }

    pub fn is_trained(&self) -> bool {
        self.estimator.is_some()
    }

    /// Label, split, fit and evaluate on `bugs`.
    ///
    /// When an id appears more than once, its last record supplies the
    /// features. The model is only replaced if every step succeeds.
    pub fn train(&mut self, bugs: &[Bug]) -> Result<TrainReport, ModelError> {
        let labels = self.get_labels(bugs.iter().cloned().map(Ok))?;

        let mut latest: BTreeMap<BugId, &Bug> = BTreeMap::new();
        for bug in bugs {
            latest.insert(bug.id, bug);
        }
        let rows: Vec<(&Bug, usize)> = latest
            .into_values()
            .filter_map(|bug| {
                let label = labels.get(bug.id)?;
                class_index(label).map(|class_idx| (bug, class_idx))
            })
            .collect();

        let training = &self.settings.training;
        let (train_idx, test_idx) =
            stratified_split(&rows, &training.split_seed, training.test_fraction);
        let mut train_counts = vec![0usize; LABEL_DOMAIN.len()];
        for &idx in &train_idx {
            train_counts[rows[idx].1] += 1;
        }
        if let Some(missing) = train_counts.iter().position(|&count| count == 0) {
            return Err(ModelError::NotEnoughData(format!(
                "no training bugs labeled {}",
                LABEL_DOMAIN[missing]
            )));
        }

        let extractor = &self.pipeline.bug_extractor;
        let train_extracted = extractor.transform(train_idx.iter().map(|&idx| rows[idx].0));
        let mut union = Self::column_transformer(&self.settings);
        let x_train = union.fit_transform(&train_extracted)?;
        let y_train: Vec<usize> = train_idx.iter().map(|&idx| rows[idx].1).collect();
        debug!(
            rows = x_train.len(),
            features = union.output_len(),
            "Fitted column transform"
        );

        let (x, y) = self
            .sampler
            .fit_resample(&x_train, &y_train, LABEL_DOMAIN.len());
        let sampled_rows = y.len();
        let dataset = TrainDataset {
            feature_len_f32: union.output_len(),
            classes: LABEL_DOMAIN.to_vec(),
            x,
            y,
        };
        let options = TrainOptions {
            rounds: training.rounds,
            learning_rate: training.learning_rate,
            bins: training.bins,
            n_jobs: self.n_jobs,
        };
        let estimator = train_gbdt_stump(&dataset, &options).map_err(ModelError::Train)?;

        let evaluation = if test_idx.is_empty() {
            None
        } else {
            let mut confusion = ConfusionMatrix::new(LABEL_DOMAIN.len());
            for &idx in &test_idx {
                let (bug, truth) = rows[idx];
                let row = union.transform(&extractor.extract(bug))?;
                confusion.add(truth, estimator.predict_class_index(&row));
            }
            Some(Evaluation {
                accuracy: accuracy(&confusion),
                per_class: precision_recall_by_class(&confusion, &LABEL_DOMAIN),
                confusion,
            })
        };

        let report = TrainReport {
            label_counts: labels.counts(),
            train_rows: train_idx.len(),
            test_rows: test_idx.len(),
            sampled_rows,
            feature_len: union.output_len(),
            evaluation,
        };
        info!(
            train = report.train_rows,
            test = report.test_rows,
            sampled = report.sampled_rows,
            features = report.feature_len,
            accuracy = report.evaluation.as_ref().map(|eval| eval.accuracy),
            "Trained dev-doc-needed model"
        );
        self.pipeline.union = union;
        self.estimator = Some(estimator);
        Ok(report)
    }

    /// Class probabilities in label-domain order.
    pub fn classify(&self, bug: &Bug) -> Result<Vec<f32>, ModelError> {
        let estimator = self.estimator.as_ref().ok_or(ModelError::NotFitted)?;
        let row = self.pipeline.transform_one(bug)?;
        Ok(estimator.predict_proba(&row))
    }

    pub fn predict(&self, bug: &Bug) -> Result<Label, ModelError> {
        let estimator = self.estimator.as_ref().ok_or(ModelError::NotFitted)?;
        let row = self.pipeline.transform_one(bug)?;
        Ok(estimator.predict_label(&row))
    }

    /// Write the settings, fitted column transform and estimator as JSON.
    pub fn save_json(&self, path: &Path) -> Result<(), ModelError> {
        let estimator = self.estimator.as_ref().ok_or(ModelError::NotFitted)?;
        let saved = SavedModelRef {
            format_version: MODEL_FORMAT_VERSION,
            settings: &self.settings,
            union: &self.pipeline.union,
            estimator,
        };
        let io_error = |source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let bytes = serde_json::to_vec_pretty(&saved).map_err(|source| ModelError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, bytes).map_err(io_error)
    }

    /// Load a model written by [`Self::save_json`].
    pub fn load_json(path: &Path) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let saved: SavedModel = serde_json::from_slice(&bytes).map_err(|source| ModelError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let incompatible = |reason: String| ModelError::Incompatible {
            path: path.to_path_buf(),
            reason,
        };
        if saved.format_version != MODEL_FORMAT_VERSION {
            return Err(incompatible(format!(
                "format_version {} (expected {MODEL_FORMAT_VERSION})",
                saved.format_version
            )));
        }
        saved.estimator.validate().map_err(incompatible)?;
        if !saved.union.is_fitted() {
            return Err(incompatible("column transform is not fitted".to_string()));
        }
        if saved.union.output_len() != saved.estimator.feature_len_f32 {
            return Err(incompatible(format!(
                "column transform yields {} features, estimator expects {}",
                saved.union.output_len(),
                saved.estimator.feature_len_f32
            )));
        }
        if saved.estimator.classes != LABEL_DOMAIN {
            return Err(incompatible(format!(
                "unexpected classes {:?}",
                saved.estimator.classes
            )));
        }

        let mut model = Self::new(saved.settings);
        model.pipeline.union = saved.union;
        model.estimator = Some(saved.estimator);
        Ok(model)
    }
}

fn class_index(label: Label) -> Option<usize> {
    LABEL_DOMAIN.iter().position(|&candidate| candidate == label)
}

/// Deterministic per-class split: rows are ordered by a seeded hash of their
/// class and bug id and the first `round(n * test_fraction)` of each class are
/// held out. A class always keeps at least one training row.
fn stratified_split(
    rows: &[(&Bug, usize)],
    seed: &str,
    test_fraction: f64,
) -> (Vec<usize>, Vec<usize>) {
    let mut by_class: BTreeMap<usize, Vec<(u128, usize)>> = BTreeMap::new();
    for (row_idx, (bug, class_idx)) in rows.iter().enumerate() {
        let hash = blake3::hash(format!("{seed}|{class_idx}|{}", bug.id).as_bytes());
        let mut key = [0u8; 16];
        key.copy_from_slice(&hash.as_bytes()[..16]);
        by_class
            .entry(*class_idx)
            .or_default()
            .push((u128::from_le_bytes(key), row_idx));
    }

    let mut train = Vec::new();
    let mut test = Vec::new();
    for mut entries in by_class.into_values() {
        entries.sort_unstable();
        let n = entries.len();
        let test_n = ((n as f64) * test_fraction).round() as usize;
        let test_n = test_n.min(n.saturating_sub(1));
        for (position, (_, row_idx)) in entries.into_iter().enumerate() {
            if position < test_n {
                test.push(row_idx);
            } else {
                train.push(row_idx);
            }
        }
    }
    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}
