use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scoring::{RaterAssignment, RawSubject};

/// Subject data handed to the engine by the caller.
///
/// Example YAML:
/// ```yaml
/// subjects:
///   - id: E-001
///     values: { skill: 82, responsibility: 75, effort: 90, conditions: 60 }
/// ratings:
///   - rater: R-01
///     factor: skill
///     subjects: [E-001]
/// ```
///
/// A rating lists the subjects a rater scored on one factor; the scores
/// themselves are the subjects' `values`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationInput {
    pub subjects: Vec<RawSubject>,
    #[serde(default)]
    pub ratings: Vec<RaterAssignment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Yaml,
    Json,
}

impl InputFormat {
    /// Pick a format from the file extension; anything unknown is read as YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => InputFormat::Json,
            _ => InputFormat::Yaml,
        }
    }
}

impl EvaluationInput {
    pub fn parse(content: &str, format: InputFormat) -> Result<Self> {
        let input: EvaluationInput = match format {
            InputFormat::Yaml => serde_saphyr::from_str(content).context("invalid YAML input")?,
            InputFormat::Json => serde_json::from_str(content).context("invalid JSON input")?,
        };
        input.check()?;
        Ok(input)
    }

    /// Subject ids unique; ratings refer to known subjects that carry the
    /// rated factor; one rating per (rater, factor).
    fn check(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for subject in &self.subjects {
            if !ids.insert(subject.id.as_str()) {
                bail!("duplicate subject id '{}'", subject.id);
            }
        }

        let mut seen = HashSet::new();
        for (i, sheet) in self.ratings.iter().enumerate() {
            if !seen.insert((sheet.rater.as_str(), sheet.factor.as_str())) {
                bail!(
                    "ratings[{}]: duplicate rating for rater '{}' factor '{}'",
                    i, sheet.rater, sheet.factor
                );
            }
            for id in &sheet.subjects {
                let Some(subject) = self.subjects.iter().find(|s| &s.id == id) else {
                    bail!("ratings[{}].subjects: unknown subject '{}'", i, id);
                };
                if !subject.values.contains_key(&sheet.factor) {
                    bail!(
                        "ratings[{}].subjects: subject '{}' has no '{}' value",
                        i, id, sheet.factor
                    );
                }
            }
        }
        Ok(())
    }
}

/// Load subject data from a YAML (`.yaml`/`.yml`) or JSON (`.json`) file
pub fn load_input(path: &Path) -> Result<EvaluationInput> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file at {}", path.display()))?;

    let input = EvaluationInput::parse(&content, InputFormat::from_path(path))
        .with_context(|| format!("Failed to load {}", path.display()))?;

    debug!(
        path = %path.display(),
        subjects = input.subjects.len(),
        ratings = input.ratings.len(),
        "input loaded"
    );
    Ok(input)
}
