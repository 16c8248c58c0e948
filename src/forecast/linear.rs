use anyhow::{Result, bail};

use super::Predictor;

/// Ordinary least-squares line fitted against the integer time index
/// `0..n`, extrapolated past the end of the observed range.
#[derive(Debug, Clone, Default)]
pub struct LinearTrend {
    fitted: Option<LineFit>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LineFit {
    slope: f64,
    intercept: f64,
    len: usize,
}

impl LinearTrend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slope(&self) -> Option<f64> {
        self.fitted.map(|f| f.slope)
    }

    pub fn intercept(&self) -> Option<f64> {
        self.fitted.map(|f| f.intercept)
    }
}

impl Predictor for LinearTrend {
    fn fit(&mut self, data: &[f64]) -> Result<()> {
        self.fitted = None;

        let n = data.len();
        if n < 2 {
            bail!("a line needs at least 2 observations, got {n}");
        }

        let x_mean = (n - 1) as f64 / 2.0;
        let y_mean = data.iter().sum::<f64>() / n as f64;

        let mut sxy = 0.0;
        let mut sxx = 0.0;
        for (i, y) in data.iter().enumerate() {
            let dx = i as f64 - x_mean;
            sxy += dx * (y - y_mean);
            sxx += dx * dx;
        }

        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;
        if !slope.is_finite() || !intercept.is_finite() {
            bail!("linear fit produced non-finite coefficients");
        }

        self.fitted = Some(LineFit {
            slope,
            intercept,
            len: n,
        });
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        let Some(fit) = self.fitted else {
            bail!("linear model has not been fitted");
        };
        Ok((fit.len..fit.len + steps)
            .map(|x| fit.intercept + fit.slope * x as f64)
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}
