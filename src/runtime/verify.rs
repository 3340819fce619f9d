//! Prediction agreement between a source model and its converted artifact

use super::Interpreter;
use crate::convert::{convert_model, ConversionOptions};
use crate::io::SavedModel;
use crate::lite::LiteModel;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Outcome of comparing two models on the same inputs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifyReport {
    pub samples: usize,
    pub max_abs_diff: f32,
    pub mean_abs_diff: f32,
    /// Fraction of samples whose largest output index agrees
    pub argmax_agreement: f32,
    pub tolerance: f32,
}

impl VerifyReport {
    pub fn passed(&self) -> bool {
        self.max_abs_diff <= self.tolerance
    }
}

/// Compare a converted artifact against its source model.
///
/// The reference is the source translated one to one at float32, so the
/// report isolates what optimization and precision reduction changed.
/// Inputs are drawn uniformly from `[-1, 1)` with a seeded generator.
pub fn verify(
    source: &SavedModel,
    lite: &LiteModel,
    samples: usize,
    seed: u64,
    tolerance: f32,
) -> Result<VerifyReport> {
    if samples == 0 {
        return Err(Error::Config("verification needs at least one sample".to_string()));
    }

    let reference = Interpreter::new(&convert_model(source, &ConversionOptions::reference())?)?;
    let candidate = Interpreter::new(lite)?;

    if reference.input_shape() != candidate.input_shape() {
        return Err(Error::Runtime(format!(
            "input shapes differ: source {:?}, artifact {:?}",
            reference.input_shape(),
            candidate.input_shape()
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let inputs: Vec<Vec<f32>> = (0..samples)
        .map(|_| {
            (0..reference.input_len())
                .map(|_| rng.random_range(-1.0f32..1.0))
                .collect()
        })
        .collect();

    compare(&reference, &candidate, &inputs, tolerance)
}

/// Run both interpreters on `inputs` and summarize the differences
pub fn compare(
    reference: &Interpreter,
    candidate: &Interpreter,
    inputs: &[Vec<f32>],
    tolerance: f32,
) -> Result<VerifyReport> {
    let mut max_abs_diff = 0.0f32;
    let mut total_diff = 0.0f64;
    let mut count = 0usize;
    let mut agree = 0usize;

    for input in inputs {
        let expected = reference.predict(input)?;
        let actual = candidate.predict(input)?;
        if expected.len() != actual.len() {
            return Err(Error::Runtime(format!(
                "output sizes differ: {} vs {}",
                expected.len(),
                actual.len()
            )));
        }

        for (e, a) in expected.iter().zip(&actual) {
            let diff = (e - a).abs();
            max_abs_diff = max_abs_diff.max(diff);
            total_diff += f64::from(diff);
            count += 1;
        }
        if argmax(&expected) == argmax(&actual) {
            agree += 1;
        }
    }

    let report = VerifyReport {
        samples: inputs.len(),
        max_abs_diff,
        mean_abs_diff: if count > 0 {
            (total_diff / count as f64) as f32
        } else {
            0.0
        },
        argmax_agreement: if inputs.is_empty() {
            1.0
        } else {
            agree as f32 / inputs.len() as f32
        },
        tolerance,
    };

    tracing::debug!(
        samples = report.samples,
        max_abs_diff = report.max_abs_diff,
        mean_abs_diff = report.mean_abs_diff,
        "compared predictions"
    );
    Ok(report)
}

fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_report_passed() {
        let report = VerifyReport {
            samples: 1,
            max_abs_diff: 0.01,
            mean_abs_diff: 0.001,
            argmax_agreement: 1.0,
            tolerance: 0.01,
        };
        assert!(report.passed());
        let failing = VerifyReport {
            max_abs_diff: 0.02,
            ..report
        };
        assert!(!failing.passed());
    }
}
