pub mod artifacts;
pub mod classifier;
pub mod knowledge;
pub mod matcher;

use log::{ info, warn };
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

pub use artifacts::ArtifactError;
pub use classifier::{ Classifier, LabelEncoder, LinearClassifier };
pub use knowledge::KnowledgeBase;
pub use matcher::{ MatchReport, SymptomMatch, SymptomMatcher };

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("No valid symptoms provided")]
    EmptyInput,
    #[error("Could not predict disease from provided symptoms")]
    NoMatch {
        unmatched: Vec<String>,
    },
    #[error("Classifier error: {0}")]
    Classifier(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    pub predicted_disease: String,
    pub description: String,
    pub medications: Vec<String>,
    pub diet: Vec<String>,
    pub precautions: Vec<String>,
}

/// Symptom text to disease plus reference text. Every part is loaded once
/// and read-only afterwards.
pub struct Predictor {
    matcher: SymptomMatcher,
    classifier: Arc<dyn Classifier>,
    labels: LabelEncoder,
    knowledge: KnowledgeBase,
}

impl Predictor {
    pub fn new(
        matcher: SymptomMatcher,
        classifier: Arc<dyn Classifier>,
        labels: LabelEncoder,
        knowledge: KnowledgeBase
    ) -> Result<Self, ArtifactError> {
        if classifier.n_features() != matcher.vocabulary().len() {
            return Err(
                ArtifactError::Shape(
                    format!(
                        "classifier expects {} features but vocabulary has {} columns",
                        classifier.n_features(),
                        matcher.vocabulary().len()
                    )
                )
            );
        }
        Ok(Self { matcher, classifier, labels, knowledge })
    }

    pub fn load<P: AsRef<Path>>(
        model_dir: P,
        knowledge_dir: P,
        cutoff: f64
    ) -> Result<Self, ArtifactError> {
        let model = artifacts::load_model(model_dir)?;
        let knowledge = artifacts::load_knowledge(knowledge_dir)?;
        Self::new(
            SymptomMatcher::new(model.columns, cutoff),
            Arc::new(model.classifier),
            model.encoder,
            knowledge
        )
    }

    pub fn matcher(&self) -> &SymptomMatcher {
        &self.matcher
    }

    pub fn predict(&self, symptoms: &str) -> Result<Prediction, TriageError> {
        if SymptomMatcher::tokenize(symptoms).is_empty() {
            return Err(TriageError::EmptyInput);
        }

        let report = self.matcher.match_symptoms(symptoms);
        for token in &report.unmatched {
            warn!("Could not find close match for symptom '{}'", token);
        }
        if report.matched.is_empty() {
            return Err(TriageError::NoMatch { unmatched: report.unmatched });
        }

        let features = self.matcher.feature_vector(&report);
        let class = self.classifier.predict(&features)?;
        let disease = self.labels.inverse_transform(class)?.to_string();
        info!("Predicted '{}' from symptoms {:?}", disease, report.columns());

        Ok(Prediction {
            description: self.knowledge.description(&disease),
            medications: self.knowledge.medications(&disease),
            diet: self.knowledge.diet(&disease),
            precautions: self.knowledge.precautions(&disease),
            predicted_disease: disease,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::HashMap;

    /// Three diseases over eight columns; GERD has no knowledge entries.
    pub fn predictor() -> Predictor {
        let columns: Vec<String> = [
            "itching",
            "skin_rash",
            "nodal_skin_eruptions",
            "continuous_sneezing",
            "shivering",
            "chills",
            "stomach_pain",
            "acidity",
        ]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let classifier = LinearClassifier::new(
            vec![
                vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
                vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0],
                vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0]
            ],
            vec![0.0, 0.0, 0.0]
        ).expect("fixture model is consistent");
        let labels = LabelEncoder::new(
            vec!["Fungal infection".into(), "Allergy".into(), "GERD".into()]
        );
        let knowledge = KnowledgeBase::new(
            HashMap::from([
                ("Fungal infection".to_string(), "A fungal skin infection.".to_string()),
                ("Allergy".to_string(), "An immune reaction.".to_string()),
            ]),
            HashMap::from([("Fungal infection".to_string(), vec!["Antifungal cream".to_string()])]),
            HashMap::from([("Fungal infection".to_string(), vec!["Probiotics".to_string()])]),
            HashMap::from([
                ("Fungal infection".to_string(), vec!["Keep skin dry".to_string(), "nan".to_string()]),
            ])
        );
        Predictor::new(
            SymptomMatcher::new(columns, matcher::DEFAULT_CUTOFF),
            Arc::new(classifier),
            labels,
            knowledge
        ).expect("fixture predictor is consistent")
    }
}
