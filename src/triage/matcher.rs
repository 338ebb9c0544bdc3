use log::debug;
use similar::TextDiff;

pub const DEFAULT_CUTOFF: f64 = 0.6;

#[derive(Clone, Debug, PartialEq)]
pub struct SymptomMatch {
    /// Token in stored form (lower-case, underscores for spaces).
    pub input: String,
    pub column: String,
    pub index: usize,
    pub score: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchReport {
    pub matched: Vec<SymptomMatch>,
    pub unmatched: Vec<String>,
}

impl MatchReport {
    pub fn columns(&self) -> Vec<&str> {
        self.matched.iter().map(|m| m.column.as_str()).collect()
    }
}

/// Fuzzy lookup of free-text symptoms against the classifier's column vocabulary.
#[derive(Clone, Debug)]
pub struct SymptomMatcher {
    vocabulary: Vec<String>,
    normalized: Vec<String>,
    cutoff: f64,
}

impl SymptomMatcher {
    pub fn new(vocabulary: Vec<String>, cutoff: f64) -> Self {
        let normalized = vocabulary.iter().map(|c| for_matching(c)).collect();
        Self { vocabulary, normalized, cutoff }
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Splits on commas into the stored form: trimmed, lower-case, spaces as underscores.
    pub fn tokenize(input: &str) -> Vec<String> {
        input
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join("_"))
            .collect()
    }

    /// Best column at or above the cutoff; ties keep the earlier column.
    pub fn closest(&self, token: &str) -> Option<SymptomMatch> {
        let query = for_matching(token);
        if query.is_empty() {
            return None;
        }

        let mut best: Option<usize> = None;
        let mut best_score = 0.0;
        for (index, candidate) in self.normalized.iter().enumerate() {
            let score = similarity(&query, candidate);
            if score > best_score {
                best_score = score;
                best = Some(index);
            }
        }

        match best {
            Some(index) if best_score >= self.cutoff => {
                debug!("Matched '{}' to '{}' ({:.3})", token, self.vocabulary[index], best_score);
                Some(SymptomMatch {
                    input: token.to_string(),
                    column: self.vocabulary[index].clone(),
                    index,
                    score: best_score,
                })
            }
            _ => None,
        }
    }

    pub fn match_symptoms(&self, input: &str) -> MatchReport {
        let mut report = MatchReport::default();
        for token in Self::tokenize(input) {
            match self.closest(&token) {
                Some(found) => report.matched.push(found),
                None => report.unmatched.push(token),
            }
        }
        report
    }

    /// One slot per vocabulary column, 1.0 where a symptom matched.
    pub fn feature_vector(&self, report: &MatchReport) -> Vec<f32> {
        let mut features = vec![0.0; self.vocabulary.len()];
        for found in &report.matched {
            features[found.index] = 1.0;
        }
        features
    }
}

/// `2 * matched / total` over characters, as in a sequence-matcher ratio.
fn similarity(query: &str, candidate: &str) -> f64 {
    f64::from(TextDiff::from_chars(query, candidate).ratio())
}

fn for_matching(text: &str) -> String {
    text.trim().to_lowercase().replace('_', " ")
}
