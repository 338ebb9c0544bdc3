use serde::Deserialize;

use super::artifacts::ArtifactError;
use super::TriageError;

/// Opaque disease model: a feature vector over the symptom vocabulary in,
/// a class index out. Must be deterministic for a given input.
pub trait Classifier: Send + Sync {
    fn n_features(&self) -> usize;

    fn n_classes(&self) -> usize;

    fn predict(&self, features: &[f32]) -> Result<usize, TriageError>;
}

/// One-vs-rest linear model; the class with the highest decision score wins,
/// ties going to the lower class index.
#[derive(Clone, Debug, Deserialize)]
pub struct LinearClassifier {
    coef: Vec<Vec<f32>>,
    intercept: Vec<f32>,
}

impl LinearClassifier {
    pub fn new(coef: Vec<Vec<f32>>, intercept: Vec<f32>) -> Result<Self, ArtifactError> {
        let model = Self { coef, intercept };
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.coef.is_empty() {
            return Err(ArtifactError::Shape("model has no classes".into()));
        }
        if self.intercept.len() != self.coef.len() {
            return Err(
                ArtifactError::Shape(
                    format!(
                        "model has {} coefficient rows but {} intercepts",
                        self.coef.len(),
                        self.intercept.len()
                    )
                )
            );
        }
        let width = self.coef[0].len();
        if let Some(row) = self.coef.iter().position(|r| r.len() != width) {
            return Err(
                ArtifactError::Shape(format!("coefficient row {} is not {} wide", row, width))
            );
        }
        Ok(())
    }
}

impl Classifier for LinearClassifier {
    fn n_features(&self) -> usize {
        self.coef.first().map_or(0, Vec::len)
    }

    fn n_classes(&self) -> usize {
        self.coef.len()
    }

    fn predict(&self, features: &[f32]) -> Result<usize, TriageError> {
        if features.len() != self.n_features() {
            return Err(
                TriageError::Classifier(
                    format!("expected {} features, got {}", self.n_features(), features.len())
                )
            );
        }

        let mut best = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (class, (row, bias)) in self.coef.iter().zip(&self.intercept).enumerate() {
            let score = row
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f32>() + bias;
            if score > best_score {
                best_score = score;
                best = class;
            }
        }
        Ok(best)
    }
}

/// Maps class indices back to disease labels.
#[derive(Clone, Debug, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn inverse_transform(&self, index: usize) -> Result<&str, TriageError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| TriageError::Classifier(format!("unknown class index {}", index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_decision_score_wins() {
        let model = LinearClassifier::new(
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 1.0]],
            vec![0.0, 0.0]
        ).unwrap();
        assert_eq!(model.predict(&[1.0, 0.0, 0.0]).unwrap(), 0);
        assert_eq!(model.predict(&[1.0, 1.0, 1.0]).unwrap(), 1);
    }

    #[test]
    fn ties_go_to_the_first_class() {
        let model = LinearClassifier::new(vec![vec![1.0], vec![1.0]], vec![0.0, 0.0]).unwrap();
        assert_eq!(model.predict(&[1.0]).unwrap(), 0);
    }

    #[test]
    fn wrong_feature_count_is_an_error() {
        let model = LinearClassifier::new(vec![vec![1.0, 0.0]], vec![0.0]).unwrap();
        assert!(matches!(model.predict(&[1.0]), Err(TriageError::Classifier(_))));
    }

    #[test]
    fn ragged_models_are_rejected() {
        assert!(LinearClassifier::new(vec![vec![1.0, 0.0], vec![1.0]], vec![0.0, 0.0]).is_err());
        assert!(LinearClassifier::new(vec![vec![1.0]], vec![]).is_err());
        assert!(LinearClassifier::new(vec![], vec![]).is_err());
    }

    #[test]
    fn encoder_decodes_known_indices_only() {
        let encoder = LabelEncoder::new(vec!["Allergy".into(), "GERD".into()]);
        assert_eq!(encoder.inverse_transform(1).unwrap(), "GERD");
        assert!(encoder.inverse_transform(2).is_err());
    }
}
