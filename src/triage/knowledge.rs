use std::collections::HashMap;

pub const NO_DESCRIPTION: &str = "No description found";
pub const NO_MEDICATION: &str = "No medication info found";
pub const NO_DIET: &str = "No diet info found";
pub const NO_PRECAUTIONS: &str = "No specific precautions found for this condition";

/// Per-disease reference text, keyed by exact disease name. A miss yields a
/// placeholder instead of an error.
#[derive(Clone, Debug, Default)]
pub struct KnowledgeBase {
    descriptions: HashMap<String, String>,
    medications: HashMap<String, Vec<String>>,
    diets: HashMap<String, Vec<String>>,
    precautions: HashMap<String, Vec<String>>,
}

impl KnowledgeBase {
    pub fn new(
        descriptions: HashMap<String, String>,
        medications: HashMap<String, Vec<String>>,
        diets: HashMap<String, Vec<String>>,
        precautions: HashMap<String, Vec<String>>
    ) -> Self {
        Self {
            descriptions,
            medications: clean_table(medications),
            diets: clean_table(diets),
            precautions: clean_table(precautions),
        }
    }

    pub fn description(&self, disease: &str) -> String {
        self.descriptions
            .get(disease)
            .map(|d| d.trim().to_string())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string())
    }

    pub fn medications(&self, disease: &str) -> Vec<String> {
        lookup(&self.medications, disease, NO_MEDICATION)
    }

    pub fn diet(&self, disease: &str) -> Vec<String> {
        lookup(&self.diets, disease, NO_DIET)
    }

    pub fn precautions(&self, disease: &str) -> Vec<String> {
        lookup(&self.precautions, disease, NO_PRECAUTIONS)
    }
}

fn lookup(table: &HashMap<String, Vec<String>>, disease: &str, placeholder: &str) -> Vec<String> {
    table
        .get(disease)
        .cloned()
        .unwrap_or_else(|| vec![placeholder.to_string()])
}

/// Trims entries and drops blanks and spreadsheet `nan` cells.
fn clean_table(table: HashMap<String, Vec<String>>) -> HashMap<String, Vec<String>> {
    table
        .into_iter()
        .map(|(disease, items)| {
            let items = items
                .into_iter()
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty() && !i.eq_ignore_ascii_case("nan"))
                .collect();
            (disease, items)
        })
        .collect()
}
