pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let data_mean = mean(data)?;
    let variance = data
        .iter()
        .map(|value| (data_mean - value).powi(2))
        .sum::<f64>()
        / data.len() as f64;

    Some(variance.sqrt())
}

/// `ms` as `m:ss`
pub fn format_clock(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[10., 20., 30., 15., 22.]), Some(19.4));
        assert_eq!(mean(&[42.0]), Some(42.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[2.0, 4.0]), Some(1.0));
        assert_eq!(std_dev(&[5.0, 5.0, 5.0]), Some(0.0));
        assert_eq!(std_dev(&[]), None);
        let sd = std_dev(&[15., 7., 55.]).unwrap();
        assert!((sd - 20.997354330698162).abs() < 1e-10);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(59_999), "0:59");
        assert_eq!(format_clock(61_000), "1:01");
        assert_eq!(format_clock(600_000), "10:00");
    }
}
