use serde::{Deserialize, Serialize};

/// An in-memory representation of an image, encoded as base 64
#[derive(Deserialize)]
pub struct B64Image {
    pub image: String,
}

impl std::fmt::Debug for B64Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "B64Image {{ image: <{} chars> }}", self.image.len())
    }
}

/// What the JSON API answers with
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub description: String,
    pub model_id: String,
}
