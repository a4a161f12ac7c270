use log::{info, warn};
use serde::Serialize;

use crate::config::PredictorConfig;
use crate::error::{ModelRole, PredictorError};
use crate::model::{ModelLoader, ModelSet, ProbabilityModel};

/// Result of one load attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CandidateStatus {
    Loaded,
    NotFound { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateReport {
    pub role: ModelRole,
    pub location: String,
    pub status: CandidateStatus,
}

/// Per-candidate account of a [`load_model_set`] run, exposed to the page for operators.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub candidates: Vec<CandidateReport>,
    pub tie_loaded: bool,
    pub ensemble_loaded: usize,
}

impl LoadReport {
    fn record(&mut self, role: ModelRole, location: &str, status: CandidateStatus) {
        self.candidates.push(CandidateReport {
            role,
            location: location.to_string(),
            status,
        });
    }

    pub fn attempted(&self, role: ModelRole) -> usize {
        self.candidates.iter().filter(|c| c.role == role).count()
    }
}

/// Load the tie model (first candidate that loads wins) and every ensemble member that loads.
/// Failures are logged and recorded, never returned.
pub async fn load_model_set(
    loader: &dyn ModelLoader,
    config: &PredictorConfig,
) -> (ModelSet, LoadReport) {
    info!("loading models...");
    let mut report = LoadReport::default();

    let mut tie = None;
    for location in &config.tie_candidates {
        if let Some(model) = attempt(loader, ModelRole::Tie, location, &mut report).await {
            tie = Some(model);
            break;
        }
    }
    if tie.is_none() {
        let attempted = report.attempted(ModelRole::Tie);
        warn!(
            "{}; tie gating disabled",
            PredictorError::CandidatesExhausted { role: ModelRole::Tie, attempted }
        );
    }

    let mut ensemble = Vec::with_capacity(config.ensemble_candidates.len());
    for location in config.ensemble_locations() {
        if let Some(model) = attempt(loader, ModelRole::Ensemble, &location, &mut report).await {
            ensemble.push(model);
        }
    }
    if ensemble.is_empty() {
        let attempted = report.attempted(ModelRole::Ensemble);
        warn!(
            "{}; ensemble average falls back to 0.5",
            PredictorError::CandidatesExhausted { role: ModelRole::Ensemble, attempted }
        );
    }

    report.tie_loaded = tie.is_some();
    report.ensemble_loaded = ensemble.len();
    info!(
        "models loaded -> tie: {} | ensemble count: {}",
        if report.tie_loaded { "ok" } else { "none" },
        report.ensemble_loaded
    );
    (ModelSet::new(tie, ensemble), report)
}

async fn attempt(
    loader: &dyn ModelLoader,
    role: ModelRole,
    location: &str,
    report: &mut LoadReport,
) -> Option<Box<dyn ProbabilityModel>> {
    match loader.load(location).await {
        Ok(model) => {
            info!("{role} model loaded: {location}");
            report.record(role, location, CandidateStatus::Loaded);
            Some(model)
        }
        Err(err) => {
            let reason = match err {
                PredictorError::ModelNotFound { reason, .. } => reason,
                other => other.to_string(),
            };
            warn!(
                "{}",
                PredictorError::ModelNotFound {
                    location: location.to_string(),
                    reason: reason.clone(),
                }
            );
            report.record(role, location, CandidateStatus::NotFound { reason });
            None
        }
    }
}
