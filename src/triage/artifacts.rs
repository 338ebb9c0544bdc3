use log::info;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::{ Path, PathBuf };

use super::classifier::{ Classifier, LabelEncoder, LinearClassifier };
use super::knowledge::KnowledgeBase;

pub const COLUMNS_FILE: &str = "columns.json";
pub const ENCODER_FILE: &str = "encoder.json";
pub const MODEL_FILE: &str = "model.json";

pub const DESCRIPTION_FILE: &str = "description.json";
pub const MEDICATIONS_FILE: &str = "medications.json";
pub const DIETS_FILE: &str = "diets.json";
pub const PRECAUTIONS_FILE: &str = "precautions.json";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to read artifact '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse artifact '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Inconsistent model artifacts: {0}")]
    Shape(String),
}

/// Vocabulary, label encoder and classifier, checked against each other.
pub struct ModelArtifacts {
    pub columns: Vec<String>,
    pub encoder: LabelEncoder,
    pub classifier: LinearClassifier,
}

fn read_json<T: DeserializeOwned>(path: PathBuf) -> Result<T, ArtifactError> {
    let content = fs::read_to_string(&path).map_err(|source| ArtifactError::Io {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ArtifactError::Json { path, source })
}

pub fn load_model<P: AsRef<Path>>(dir: P) -> Result<ModelArtifacts, ArtifactError> {
    let dir = dir.as_ref();
    let columns: Vec<String> = read_json(dir.join(COLUMNS_FILE))?;
    let encoder: LabelEncoder = read_json(dir.join(ENCODER_FILE))?;
    let classifier: LinearClassifier = read_json(dir.join(MODEL_FILE))?;
    classifier.validate()?;

    if columns.is_empty() {
        return Err(ArtifactError::Shape("symptom vocabulary is empty".into()));
    }
    if classifier.n_features() != columns.len() {
        return Err(
            ArtifactError::Shape(
                format!(
                    "model expects {} features but vocabulary has {} columns",
                    classifier.n_features(),
                    columns.len()
                )
            )
        );
    }
    if classifier.n_classes() != encoder.len() {
        return Err(
            ArtifactError::Shape(
                format!(
                    "model has {} classes but encoder has {} labels",
                    classifier.n_classes(),
                    encoder.len()
                )
            )
        );
    }

    info!(
        "Loaded classifier from {}: {} symptom columns, {} diseases",
        dir.display(),
        columns.len(),
        encoder.len()
    );
    Ok(ModelArtifacts { columns, encoder, classifier })
}

pub fn load_knowledge<P: AsRef<Path>>(dir: P) -> Result<KnowledgeBase, ArtifactError> {
    let dir = dir.as_ref();
    let descriptions: HashMap<String, String> = read_json(dir.join(DESCRIPTION_FILE))?;
    let medications: HashMap<String, Vec<String>> = read_json(dir.join(MEDICATIONS_FILE))?;
    let diets: HashMap<String, Vec<String>> = read_json(dir.join(DIETS_FILE))?;
    let precautions: HashMap<String, Vec<String>> = read_json(dir.join(PRECAUTIONS_FILE))?;
    info!("Loaded disease knowledge from {} ({} descriptions)", dir.display(), descriptions.len());
    Ok(KnowledgeBase::new(descriptions, medications, diets, precautions))
}
