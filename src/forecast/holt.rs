//! Holt's linear method: double exponential smoothing with an additive
//! trend and no seasonal component.

use anyhow::{Result, bail};

use super::Predictor;

/// Fewest observations the smoother will fit. Two seed the level and trend,
/// the rest drive the error being minimised.
pub const MIN_OBSERVATIONS: usize = 3;

const GRID_STEPS: usize = 20;
const REFINE_ROUNDS: usize = 6;

/// Holt linear model with smoothing parameters chosen by minimising the
/// one-step-ahead squared error over `alpha, beta ∈ [0, 1]`.
#[derive(Debug, Clone, Default)]
pub struct HoltLinear {
    fitted: Option<HoltFit>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoltFit {
    pub alpha: f64,
    pub beta: f64,
    pub level: f64,
    pub trend: f64,
    pub sse: f64,
}

impl HoltLinear {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit_result(&self) -> Option<&HoltFit> {
        self.fitted.as_ref()
    }
}

/// Runs the smoothing recursion, returning the final state and the SSE.
fn smooth(data: &[f64], alpha: f64, beta: f64) -> HoltFit {
    let mut level = data[0];
    let mut trend = data[1] - data[0];
    let mut sse = 0.0;

    for &y in &data[1..] {
        let forecast = level + trend;
        let err = y - forecast;
        sse += err * err;

        let prev_level = level;
        level = alpha * y + (1.0 - alpha) * forecast;
        trend = beta * (level - prev_level) + (1.0 - beta) * trend;
    }

    HoltFit {
        alpha,
        beta,
        level,
        trend,
        sse,
    }
}

fn better(candidate: HoltFit, best: Option<HoltFit>) -> bool {
    candidate.sse.is_finite() && best.is_none_or(|b| candidate.sse < b.sse)
}

impl Predictor for HoltLinear {
    fn fit(&mut self, data: &[f64]) -> Result<()> {
        self.fitted = None;

        if data.len() < MIN_OBSERVATIONS {
            bail!(
                "exponential smoothing needs at least {MIN_OBSERVATIONS} observations, got {}",
                data.len()
            );
        }
        if data.iter().any(|v| !v.is_finite()) {
            bail!("exponential smoothing input contains non-finite values");
        }

        let mut best: Option<HoltFit> = None;

        for i in 0..=GRID_STEPS {
            for j in 0..=GRID_STEPS {
                let alpha = i as f64 / GRID_STEPS as f64;
                let beta = j as f64 / GRID_STEPS as f64;
                let candidate = smooth(data, alpha, beta);
                if better(candidate, best) {
                    best = Some(candidate);
                }
            }
        }

        let mut step = 1.0 / GRID_STEPS as f64;
        for _ in 0..REFINE_ROUNDS {
            let Some(centre) = best else { break };
            step /= 4.0;
            for di in -4i32..=4 {
                for dj in -4i32..=4 {
                    let alpha = (centre.alpha + di as f64 * step).clamp(0.0, 1.0);
                    let beta = (centre.beta + dj as f64 * step).clamp(0.0, 1.0);
                    let candidate = smooth(data, alpha, beta);
                    if better(candidate, best) {
                        best = Some(candidate);
                    }
                }
            }
        }

        match best {
            Some(fit) if fit.level.is_finite() && fit.trend.is_finite() => {
                self.fitted = Some(fit);
                Ok(())
            }
            _ => bail!("exponential smoothing did not converge"),
        }
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        let Some(fit) = &self.fitted else {
            bail!("exponential smoothing model has not been fitted");
        };
        Ok((1..=steps)
            .map(|h| fit.level + h as f64 * fit.trend)
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_linear_series_is_continued() {
        let mut model = HoltLinear::new();
        model.fit(&[1.0, 3.0, 5.0, 7.0, 9.0]).unwrap();
        assert_close(&model.predict(3).unwrap(), &[11.0, 13.0, 15.0]);
    }

    #[test]
    fn test_constant_series_stays_flat() {
        let mut model = HoltLinear::new();
        model.fit(&[4.0, 4.0, 4.0, 4.0]).unwrap();
        assert_close(&model.predict(2).unwrap(), &[4.0, 4.0]);
        assert_eq!(model.fit_result().unwrap().sse, 0.0);
    }

    #[test]
    fn test_parameters_stay_in_unit_interval() {
        let mut model = HoltLinear::new();
        model.fit(&[3.0, 8.0, 2.0, 9.0, 4.0, 7.0, 5.0]).unwrap();
        let fit = model.fit_result().unwrap();
        assert!((0.0..=1.0).contains(&fit.alpha));
        assert!((0.0..=1.0).contains(&fit.beta));
        assert_eq!(model.predict(5).unwrap().len(), 5);
    }

    #[test]
    fn test_refinement_does_not_worsen_grid_optimum() {
        let data = [3.0, 8.0, 2.0, 9.0, 4.0, 7.0, 5.0];
        let mut model = HoltLinear::new();
        model.fit(&data).unwrap();
        let grid_best = smooth(&data, 0.0, 0.0).sse;
        assert!(model.fit_result().unwrap().sse <= grid_best);
    }

    #[test]
    fn test_short_series_fails() {
        let mut model = HoltLinear::new();
        assert!(model.fit(&[1.0, 2.0]).is_err());
        assert!(!model.is_fitted());
    }

    #[test]
    fn test_non_finite_input_fails() {
        let mut model = HoltLinear::new();
        assert!(model.fit(&[1.0, f64::NAN, 3.0]).is_err());
    }

    #[test]
    fn test_overflowing_input_does_not_converge() {
        let mut model = HoltLinear::new();
        assert!(model.fit(&[f64::MAX, -f64::MAX, f64::MAX]).is_err());
    }

    #[test]
    fn test_predict_before_fit_fails() {
        assert!(HoltLinear::new().predict(3).is_err());
    }
}
