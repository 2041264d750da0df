use std::collections::HashMap;
use std::fmt;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::traits::model::ModelError;

#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector{
    values: Array1<f32>,
}

impl FeatureVector {
    // Create new feature vector
    pub fn new(values: Vec<f32>) -> Self {
        Self {values: Array1::from(values)}
    }

    pub fn from_array(values: Array1<f32>) -> Self {
        Self { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn as_array(&self) -> &Array1<f32>{
        &self.values
    }
}

/// A single raw field value as it arrives from a form or JSON body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
    /// Any other JSON value (null, bool, array, object); never a valid code
    Other(serde_json::Value),
}

impl FieldValue {
    /// Coerce to an integer/categorical code; `None` when the value is not one.
    pub fn as_code(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            // i64::MAX as f64 rounds up to 2^63, which is already out of range
            FieldValue::Float(v)
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 =>
            {
                Some(*v as i64)
            }
            FieldValue::Float(_) => None,
            FieldValue::Text(s) => s.trim().parse::<i64>().ok(),
            FieldValue::Other(_) => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v.into())
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

/// Named raw inputs for one prediction request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecord {
    fields: HashMap<String, FieldValue>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for FeatureRecord {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Ordered list of feature names a transform was fitted on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// The telco churn inputs, in training column order.
    pub fn churn() -> Self {
        Self::new([
            "SeniorCitizen",
            "tenure",
            "InternetService",
            "OnlineSecurity",
            "OnlineBackup",
            "DeviceProtection",
            "TechSupport",
            "StreamingTV",
            "StreamingMovies",
            "Contract",
        ])
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// First name that appears more than once, if any.
    pub fn duplicate(&self) -> Option<&str> {
        self.names
            .iter()
            .enumerate()
            .find(|(i, name)| self.names[..*i].contains(name))
            .map(|(_, name)| name.as_str())
    }

    /// Encode a record into a vector in schema order.
    ///
    /// The record must carry exactly the schema's fields. Missing fields are
    /// reported first, in schema order, then malformed ones, then any field the
    /// schema does not know about (alphabetically).
    pub fn encode(&self, record: &FeatureRecord) -> Result<FeatureVector, ModelError> {
        let mut values = Vec::with_capacity(self.names.len());
        for name in &self.names {
            if record.get(name).is_none() {
                return Err(ModelError::InvalidFeature(name.clone()));
            }
        }
        for name in &self.names {
            let code = record
                .get(name)
                .and_then(FieldValue::as_code)
                .ok_or_else(|| ModelError::InvalidFeature(name.clone()))?;
            values.push(code as f32);
        }
        if record.len() != self.names.len() {
            let mut unexpected: Vec<&str> = record
                .names()
                .filter(|n| !self.names.iter().any(|s| s == n))
                .collect();
            unexpected.sort_unstable();
            if let Some(name) = unexpected.first() {
                return Err(ModelError::InvalidFeature(name.to_string()));
            }
        }
        Ok(FeatureVector::new(values))
    }
}

impl fmt::Display for FeatureSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names.join(", "))
    }
}
