//! Statistical primitives over plain `f64` samples.
//!
//! Every function returns `None` where the statistic is undefined for the
//! given sample (too few observations, zero variance), so no caller ever sees
//! a NaN.

use crate::error::AnalyticsError;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Mean with a two-sided confidence interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
    pub confidence: f64,
}

/// Result of a two-sample t-test with unequal variances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WelchTest {
    pub t_statistic: f64,
    /// Welch–Satterthwaite degrees of freedom.
    pub degrees_of_freedom: f64,
    /// Two-sided p-value.
    pub p_value: f64,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (n - 1 denominator).
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some(sum_sq / (values.len() - 1) as f64)
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

/// Linear-interpolation quantile (R-7, the spreadsheet default) of an
/// ascending slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    Some(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

/// Quantile of an unsorted sample.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}

/// Pearson correlation of paired observations.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let (mut cov, mut vx, mut vy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx) * (x - mx);
        vy += (y - my) * (y - my);
    }
    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    let r = cov / (vx.sqrt() * vy.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Confidence interval of the mean using the Student t critical value.
pub fn confidence_interval(
    values: &[f64],
    confidence: f64,
) -> Result<Option<ConfidenceInterval>, AnalyticsError> {
    let (Some(m), Some(sd)) = (mean(values), sample_std(values)) else {
        return Ok(None);
    };
    let n = values.len() as f64;
    let t = students_t(n - 1.0)?.inverse_cdf((1.0 + confidence) / 2.0);
    let margin = t * sd / n.sqrt();
    if !margin.is_finite() {
        return Ok(None);
    }
    Ok(Some(ConfidenceInterval {
        mean: m,
        lower: m - margin,
        upper: m + margin,
        confidence,
    }))
}

/// Welch's two-sample t-test of equal means.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Result<Option<WelchTest>, AnalyticsError> {
    let (Some(ma), Some(mb)) = (mean(a), mean(b)) else {
        return Ok(None);
    };
    let (Some(var_a), Some(var_b)) = (sample_variance(a), sample_variance(b)) else {
        return Ok(None);
    };
    let (na, nb) = (a.len() as f64, b.len() as f64);
    let se_a = var_a / na;
    let se_b = var_b / nb;
    let se = se_a + se_b;
    if se == 0.0 {
        return Ok(None);
    }

    let t_statistic = (ma - mb) / se.sqrt();
    let degrees_of_freedom =
        se * se / (se_a * se_a / (na - 1.0) + se_b * se_b / (nb - 1.0));
    let p_value = 2.0 * (1.0 - students_t(degrees_of_freedom)?.cdf(t_statistic.abs()));

    Ok(Some(WelchTest {
        t_statistic,
        degrees_of_freedom,
        p_value: p_value.clamp(0.0, 1.0),
    }))
}

fn students_t(freedom: f64) -> Result<StudentsT, AnalyticsError> {
    StudentsT::new(0.0, 1.0, freedom).map_err(|e| AnalyticsError::Distribution(e.to_string()))
}
