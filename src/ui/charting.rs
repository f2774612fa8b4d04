use crate::time_series::TimeSeriesPoint;

/// X (seconds) and Y (WPM) upper bounds for the results chart
pub fn compute_chart_params(samples: &[TimeSeriesPoint], elapsed_ms: u64) -> (f64, f64) {
    let highest_wpm = samples.iter().map(|p| p.wpm).fold(0.0, f64::max);

    let overall_duration = match samples.last() {
        Some(p) => p.t,
        None => elapsed_ms as f64 / 1000.0,
    }
    .max(1.0);

    (overall_duration, highest_wpm.round().max(1.0))
}

pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
