//! Summary statistics over measurement series

use serde::{Deserialize, Serialize};

/// Ordered durations (seconds) for one build system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub color: String,
    pub durations: Vec<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            durations: Vec::new(),
        }
    }
}

/// Reduced statistics for one build system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub name: String,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation, 0 with fewer than 2 samples
    pub std_dev: f64,
    /// Population standard deviation, 0 with fewer than 2 samples
    pub population_std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl Summary {
    /// Summarize `values`. An empty slice yields all-zero statistics.
    pub fn from_values(name: impl Into<String>, values: &[f64]) -> Self {
        let count = values.len();
        if count == 0 {
            return Self {
                name: name.into(),
                mean: 0.0,
                median: 0.0,
                std_dev: 0.0,
                population_std_dev: 0.0,
                min: 0.0,
                max: 0.0,
                count,
            };
        }

        let mean = values.iter().sum::<f64>() / count as f64;
        let (std_dev, population_std_dev) = if count < 2 {
            (0.0, 0.0)
        } else {
            let sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (
                (sq / (count - 1) as f64).sqrt(),
                (sq / count as f64).sqrt(),
            )
        };

        Self {
            name: name.into(),
            mean,
            median: median(values),
            std_dev,
            population_std_dev,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            count,
        }
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Summaries for every series, in series order
pub fn summarize(series: &[Series]) -> Vec<Summary> {
    series
        .iter()
        .map(|s| Summary::from_values(&s.name, &s.durations))
        .collect()
}

/// Headline comparisons across build systems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    /// Lowest mean
    pub fastest: String,
    /// Highest mean
    pub slowest: String,
    /// Lowest standard deviation
    pub most_consistent: String,
}

impl Insights {
    /// `None` when there are no summaries
    pub fn from_summaries(summaries: &[Summary]) -> Option<Self> {
        let fastest = summaries.iter().min_by(|a, b| a.mean.total_cmp(&b.mean))?;
        let slowest = summaries.iter().max_by(|a, b| a.mean.total_cmp(&b.mean))?;
        let consistent = summaries
            .iter()
            .min_by(|a, b| a.std_dev.total_cmp(&b.std_dev))?;

        Some(Self {
            fastest: fastest.name.clone(),
            slowest: slowest.name.clone(),
            most_consistent: consistent.name.clone(),
        })
    }
}

/// Plain-text comparison table
pub fn format_summary_table(summaries: &[Summary]) -> String {
    let width = summaries
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0)
        .max("build_system".len());

    let mut out = format!(
        "{:<width$}  {:>9}  {:>9}  {:>9}  {:>9}  {:>9}  {:>5}\n",
        "build_system", "mean", "std_dev", "median", "min", "max", "count",
        width = width
    );
    for s in summaries {
        out.push_str(&format!(
            "{:<width$}  {:>9.2}  {:>9.2}  {:>9.2}  {:>9.2}  {:>9.2}  {:>5}\n",
            s.name, s.mean, s.std_dev, s.median, s.min, s.max, s.count,
            width = width
        ));
    }
    out
}
