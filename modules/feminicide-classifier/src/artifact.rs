//! Portable, `bincode`-serialized replacements for the original's pickled
//! scikit-learn objects (`spec.md` §4.3, §9 redesign note).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// A from-scratch re-implementation of scikit-learn's `TfidfVectorizer`
/// (vocabulary + smoothed inverse-document-frequency weights, L2-normalized
/// output), not a wrapper around scikit-learn itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    pub vocabulary: HashMap<String, u32>,
    /// Indexed by the term id in `vocabulary`.
    pub idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn dimension(&self) -> usize {
        self.idf.len()
    }

    /// Tokenize, count, weight by idf, and L2-normalize — mirrors sklearn's
    /// default `TfidfVectorizer(norm='l2', use_idf=True, smooth_idf=True)`
    /// token pattern (`\b\w\w+\b`, lowercased).
    pub fn transform(&self, texts: &[String]) -> Vec<Vec<f64>> {
        texts.iter().map(|t| self.transform_one(t)).collect()
    }

    fn transform_one(&self, text: &str) -> Vec<f64> {
        let mut counts: HashMap<u32, f64> = HashMap::new();
        for token in tokenize(text) {
            if let Some(&term_id) = self.vocabulary.get(&token) {
                *counts.entry(term_id).or_insert(0.0) += 1.0;
            }
        }

        let mut vec = vec![0.0; self.idf.len()];
        for (term_id, count) in counts {
            vec[term_id as usize] = count * self.idf[term_id as usize];
        }

        l2_normalize(&mut vec);
        vec
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| w.chars().count() >= 2)
        .map(|w| w.to_string())
        .collect()
}

fn l2_normalize(vec: &mut [f64]) {
    let norm = vec.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        for v in vec.iter_mut() {
            *v /= norm;
        }
    }
}

/// Which predictor family produced `coefficients`/`intercept`.
///
/// Both a linear logistic-regression model and a (multinomial/Bernoulli)
/// naive-Bayes model reduce, at `predict_proba` time, to `sigmoid(w·x + b)`
/// for a fixed trained decision boundary — naive Bayes' log-odds *is* a
/// linear function of the input features. The two kinds are kept distinct
/// here only because the artifact format records provenance, not because
/// scoring differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactModelKind {
    LogisticRegression,
    NaiveBayes,
}

/// A from-scratch, portable stand-in for a pickled scikit-learn predictor:
/// a trained linear decision boundary plus which family trained it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub kind: ArtifactModelKind,
}

impl LinearModel {
    /// `predict_proba`'s "probability of the positive class" column, for a
    /// batch of already-vectorized inputs.
    pub fn predict_proba(&self, vectors: &[Vec<f64>]) -> Result<Vec<f64>> {
        vectors
            .iter()
            .map(|v| self.predict_one(v))
            .collect::<Result<Vec<_>>>()
    }

    fn predict_one(&self, vector: &[f64]) -> Result<f64> {
        if vector.len() != self.coefficients.len() {
            return Err(ModelError::ShapeMismatch {
                expected: self.coefficients.len(),
                actual: vector.len(),
            });
        }

        let logit: f64 = vector
            .iter()
            .zip(&self.coefficients)
            .map(|(x, w)| x * w)
            .sum::<f64>()
            + self.intercept;

        let score = sigmoid(logit);
        if score.is_nan() || !(0.0..=1.0).contains(&score) {
            return Err(ModelError::InvalidScore);
        }
        Ok(score)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

pub fn serialize_vectorizer(v: &TfidfVectorizer) -> std::result::Result<Vec<u8>, bincode::Error> {
    bincode::serialize(v)
}

pub fn deserialize_vectorizer(bytes: &[u8], path: &str) -> Result<TfidfVectorizer> {
    bincode::deserialize(bytes).map_err(|source| ModelError::CorruptArtifact {
        path: path.to_string(),
        source,
    })
}

pub fn serialize_model(m: &LinearModel) -> std::result::Result<Vec<u8>, bincode::Error> {
    bincode::serialize(m)
}

pub fn deserialize_model(bytes: &[u8], path: &str) -> Result<LinearModel> {
    bincode::deserialize(bytes).map_err(|source| ModelError::CorruptArtifact {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_vectorizer() -> TfidfVectorizer {
        let mut vocabulary = HashMap::new();
        vocabulary.insert("femicide".to_string(), 0);
        vocabulary.insert("weather".to_string(), 1);
        TfidfVectorizer {
            vocabulary,
            idf: vec![2.0, 1.0],
        }
    }

    #[test]
    fn transform_is_deterministic_and_normalized() {
        let vectorizer = toy_vectorizer();
        let texts = vec!["Femicide femicide weather".to_string()];
        let first = vectorizer.transform(&texts);
        let second = vectorizer.transform(&texts);
        assert_eq!(first, second, "tf-idf scoring must be bit-identical (spec.md §8)");

        let v = &first[0];
        let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_tokens_are_ignored() {
        let vectorizer = toy_vectorizer();
        let out = vectorizer.transform(&["completely unrelated text".to_string()]);
        assert!(out[0].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn predict_proba_rejects_shape_mismatch() {
        let model = LinearModel {
            coefficients: vec![1.0, 2.0],
            intercept: 0.0,
            kind: ArtifactModelKind::LogisticRegression,
        };
        let err = model.predict_proba(&[vec![1.0]]).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { .. }));
    }

    #[test]
    fn predict_proba_is_a_valid_probability() {
        let model = LinearModel {
            coefficients: vec![1.0, -1.0],
            intercept: 0.0,
            kind: ArtifactModelKind::NaiveBayes,
        };
        let scores = model.predict_proba(&[vec![3.0, 0.0], vec![0.0, 3.0]]).unwrap();
        assert!(scores[0] > 0.5);
        assert!(scores[1] < 0.5);
        for s in scores {
            assert!((0.0..=1.0).contains(&s));
        }
    }
}
