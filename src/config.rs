use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::data::filter::DatasetFilter;
use crate::data::model::Column;
use crate::error::{FenceError, Result};
use crate::stats::{
    column_fences, IqrFences, Method, SigmaClip, EXTREME_MULTIPLIER, MILD_MULTIPLIER,
};

/// Which bound estimator a filter run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    /// Iterative sigma clipping.
    #[default]
    Sigma,
    /// Quartile fences.
    Iqr,
}

/// `[iqr]` section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IqrConfig {
    pub k: f64,
    pub extreme_k: f64,
}

impl Default for IqrConfig {
    fn default() -> Self {
        IqrConfig {
            k: MILD_MULTIPLIER,
            extreme_k: EXTREME_MULTIPLIER,
        }
    }
}

/// Filter settings, usually read from a TOML file:
///
/// ```toml
/// method = "iqr"
/// column = "temperature"   # omit to filter on every numeric column
/// parallel = true
///
/// [iqr]
/// k = 1.5
/// extreme_k = 3.0
///
/// [sigma]
/// low = 3.0
/// high = 3.0
/// deviation = "sample"     # or "population"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    pub method: MethodKind,
    pub iqr: IqrConfig,
    pub sigma: SigmaClip,
    /// Restrict filtering to one column.
    pub column: Option<String>,
    pub parallel: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            method: MethodKind::default(),
            iqr: IqrConfig::default(),
            sigma: SigmaClip::default(),
            column: None,
            parallel: true,
        }
    }
}

impl FilterConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: FilterConfig = toml::from_str(text).context("parsing filter config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("iqr.k", self.iqr.k), ("iqr.extreme_k", self.iqr.extreme_k)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(FenceError::InvalidParameter { name, value });
            }
        }
        self.sigma.validate()
    }

    pub fn method(&self) -> Method {
        match self.method {
            MethodKind::Sigma => Method::SigmaClip(self.sigma),
            MethodKind::Iqr => Method::iqr(self.iqr.k),
        }
    }

    pub fn dataset_filter(&self) -> DatasetFilter {
        DatasetFilter::new(self.method()).with_parallel(self.parallel)
    }

    /// Quartile fences of `column` at the configured `k` (mild) and
    /// `extreme_k` (extreme) multipliers.
    pub fn column_fences(&self, column: &Column) -> Result<IqrFences> {
        let mut fences = column_fences(column)?;
        fences.mild = fences.with_multiplier(self.iqr.k);
        fences.extreme = fences.with_multiplier(self.iqr.extreme_k);
        Ok(fences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{Bounds, Deviation};

    #[test]
    fn empty_file_gives_defaults() {
        let config = FilterConfig::from_toml_str("").unwrap();
        assert_eq!(config, FilterConfig::default());
        assert_eq!(config.method(), Method::default());
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let config = FilterConfig::from_toml_str(
            r#"
            method = "iqr"
            column = "pressure"

            [iqr]
            k = 2.0

            [sigma]
            deviation = "population"
            "#,
        )
        .unwrap();
        assert_eq!(config.method(), Method::iqr(2.0));
        assert_eq!(config.iqr.extreme_k, EXTREME_MULTIPLIER);
        assert_eq!(config.sigma.low, 3.0);
        assert_eq!(config.sigma.deviation, Deviation::Population);
        assert_eq!(config.column.as_deref(), Some("pressure"));
        assert!(config.parallel);
    }

    #[test]
    fn rejects_bad_values_and_unknown_keys() {
        assert!(FilterConfig::from_toml_str("[iqr]\nk = -1.0\n").is_err());
        assert!(FilterConfig::from_toml_str("[sigma]\nhigh = -2.0\n").is_err());
        assert!(FilterConfig::from_toml_str("methd = \"iqr\"\n").is_err());
    }

    #[test]
    fn sigma_section_rejects_unknown_keys() {
        assert!(FilterConfig::from_toml_str("[sigma]\nlo = 2.0\n").is_err());
        assert!(FilterConfig::from_toml_str("[sigma]\nlow = 2.0\n").is_ok());
    }

    #[test]
    fn reported_fences_follow_the_configured_multipliers() {
        let column = Column::float(
            "v",
            [1.0, 2.0, 2.0, 3.0, 3.0, 3.0, 4.0, 4.0, 5.0, 100.0].map(Some),
        );
        let config = FilterConfig::from_toml_str("[iqr]\nk = 2.0\nextreme_k = 4.0\n").unwrap();
        let fences = config.column_fences(&column).unwrap();
        assert_eq!(fences.mild, Method::iqr(2.0).column_bounds(&column).unwrap());
        assert_eq!(fences.extreme, Method::iqr(4.0).column_bounds(&column).unwrap());
        assert_eq!(fences.mild, Bounds::new(-1.25, 7.5));

        let defaults = FilterConfig::default().column_fences(&column).unwrap();
        assert_eq!(defaults, column_fences(&column).unwrap());
    }
}
