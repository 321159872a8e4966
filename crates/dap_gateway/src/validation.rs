use std::fmt::Display;

use serde::Serialize;

/// One segment of the location of an invalid field, e.g.
/// `["body", "coordinates", 0]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Loc {
    Key(String),
    Index(usize),
}

impl From<&str> for Loc {
    fn from(value: &str) -> Self {
        Loc::Key(value.to_owned())
    }
}

impl From<String> for Loc {
    fn from(value: String) -> Self {
        Loc::Key(value)
    }
}

impl From<usize> for Loc {
    fn from(value: usize) -> Self {
        Loc::Index(value)
    }
}

impl Display for Loc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Loc::Key(key) => write!(f, "{}", key),
            Loc::Index(index) => write!(f, "{}", index),
        }
    }
}

#[macro_export]
macro_rules! loc {
    ($($segment:expr),* $(,)?) => {
        vec![$($crate::validation::Loc::from($segment)),*]
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub loc: Vec<Loc>,
    pub msg: String,
}

impl ValidationError {
    pub fn new(loc: Vec<Loc>, msg: impl Into<String>) -> Self {
        ValidationError {
            loc,
            msg: msg.into(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let loc: Vec<String> = self.loc.iter().map(Loc::to_string).collect();
        write!(f, "{}: {}", loc.join("."), self.msg)
    }
}

/// Every problem found in a request. Never empty once returned as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        ValidationErrors(Vec::new())
    }

    pub fn single(loc: Vec<Loc>, msg: impl Into<String>) -> Self {
        ValidationErrors(vec![ValidationError::new(loc, msg)])
    }

    pub fn push(&mut self, loc: Vec<Loc>, msg: impl Into<String>) {
        self.0.push(ValidationError::new(loc, msg));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let errors: Vec<String> = self.0.iter().map(ValidationError::to_string).collect();
        write!(f, "{}", errors.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

pub(crate) fn is_valid_longitude(value: f64) -> bool {
    value.is_finite() && (-180.0..=180.0).contains(&value)
}

pub(crate) fn is_valid_latitude(value: f64) -> bool {
    value.is_finite() && (-90.0..=90.0).contains(&value)
}

/// Pushes an error for each out of range component of `coordinate`.
pub(crate) fn check_coordinate(errors: &mut ValidationErrors, loc: Vec<Loc>, coordinate: [f64; 2]) {
    if !is_valid_longitude(coordinate[0]) {
        errors.push(loc.clone(), "longitude must be between -180 and 180");
    }
    if !is_valid_latitude(coordinate[1]) {
        errors.push(loc, "latitude must be between -90 and 90");
    }
}
