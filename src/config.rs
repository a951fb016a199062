//! Pipeline configuration: which sources to read and how to present the charts.
//!
//! Everything has a built-in default matching the three provider exports, so a
//! YAML file only needs to name what it overrides.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use crate::load::TextEncoding;

/// One upstream export: a label that ends up in `Empresa`, and where to read it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceSpec {
    pub label: String,
    pub path: PathBuf,
    /// Overrides [`PipelineConfig::encoding`] for this file only.
    #[serde(default)]
    pub encoding: Option<String>,
}

impl SourceSpec {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
            encoding: None,
        }
    }
}

/// Title, axis and legend text of a single chart.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChartText {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub legend_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChartLabels {
    pub revenue: ChartText,
    pub profit: ChartText,
}

impl Default for ChartLabels {
    fn default() -> Self {
        Self {
            revenue: ChartText {
                title: "Receita Total por Produto e Empresa".into(),
                x_label: "Empresas".into(),
                y_label: "Receita Total (CLP)".into(),
                legend_title: "Produtos".into(),
            },
            profit: ChartText {
                title: "Lucro Total por Região e Empresa".into(),
                x_label: "Regiões".into(),
                y_label: "Lucro Total (CLP)".into(),
                legend_title: "Empresas".into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Processed in order; row order of the combined table follows it.
    pub sources: Vec<SourceSpec>,
    pub delimiter: char,
    /// `latin1` (strict ISO-8859-1) or any WHATWG label understood by
    /// `encoding_rs` (`utf-8`, `windows-1252`, ...).
    pub encoding: String,
    pub output_dir: PathBuf,
    pub preview_rows: usize,
    /// Open the interactive chart in the default browser after writing it.
    /// Turn off for headless runs.
    pub open_viewer: bool,
    pub labels: ChartLabels,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                SourceSpec::new("AutoCare", "dados/autocare_seguros.csv"),
                SourceSpec::new("HealthPro", "dados/healthpro_seguros.csv"),
                SourceSpec::new("HomeGuard", "dados/homeguard_seguros.csv"),
            ],
            delimiter: ';',
            encoding: "latin1".into(),
            output_dir: PathBuf::from("graficos"),
            preview_rows: 5,
            open_viewer: true,
            labels: ChartLabels::default(),
        }
    }
}

impl PipelineConfig {
    /// Read a YAML config; keys that are left out keep their defaults.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let cfg: PipelineConfig = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.delimiter_byte()?;
        resolve_encoding(&self.encoding)?;

        let mut seen = HashSet::new();
        for src in &self.sources {
            if src.label.trim().is_empty() {
                bail!("source {} has an empty label", src.path.display());
            }
            if !seen.insert(src.label.as_str()) {
                bail!("source label `{}` is used more than once", src.label);
            }
            if let Some(enc) = &src.encoding {
                resolve_encoding(enc)
                    .with_context(|| format!("source `{}`", src.label))?;
            }
        }
        Ok(())
    }

    /// The field separator as the single byte the CSV reader wants.
    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(anyhow!(
                "delimiter `{}` must be a single ASCII character",
                self.delimiter
            ))
        }
    }

    pub fn revenue_chart_path(&self) -> PathBuf {
        self.output_dir.join("receita_por_produto.svg")
    }

    pub fn profit_chart_path(&self) -> PathBuf {
        self.output_dir.join("lucro_por_regiao.html")
    }
}

/// Look up an encoding label. ISO-8859-1 labels stay strict Latin-1 rather
/// than the windows-1252 superset WHATWG maps them to.
pub fn resolve_encoding(label: &str) -> Result<TextEncoding> {
    TextEncoding::for_label(label).ok_or_else(|| anyhow!("unknown encoding `{}`", label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_provider_exports() {
        let cfg = PipelineConfig::default();
        let labels: Vec<_> = cfg.sources.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["AutoCare", "HealthPro", "HomeGuard"]);
        assert_eq!(cfg.delimiter_byte().unwrap(), b';');
        assert_eq!(resolve_encoding(&cfg.encoding).unwrap(), TextEncoding::Latin1);
        assert!(cfg.open_viewer);
        cfg.validate().unwrap();
    }

    #[test]
    fn yaml_overrides_only_what_it_names() -> Result<()> {
        let cfg = PipelineConfig::from_yaml_str(
            r#"
sources:
  - label: Alpha
    path: a.csv
  - label: Beta
    path: b.csv
    encoding: utf-8
output_dir: out
"#,
        )?;
        assert_eq!(cfg.sources.len(), 2);
        assert_eq!(cfg.encoding, "latin1");
        assert_eq!(cfg.sources[0].encoding, None);
        assert_eq!(cfg.sources[1].encoding.as_deref(), Some("utf-8"));
        assert_eq!(cfg.delimiter, ';');
        assert_eq!(cfg.preview_rows, 5);
        assert_eq!(cfg.revenue_chart_path(), PathBuf::from("out/receita_por_produto.svg"));
        assert_eq!(cfg.labels, ChartLabels::default());
        Ok(())
    }

    #[test]
    fn rejects_duplicate_labels_and_bad_encodings() {
        let dup = "sources:\n  - {label: A, path: a.csv}\n  - {label: A, path: b.csv}\n";
        assert!(PipelineConfig::from_yaml_str(dup).is_err());

        let enc = "encoding: klingon\n";
        assert!(PipelineConfig::from_yaml_str(enc).is_err());

        let delim = "delimiter: \"§\"\n";
        assert!(PipelineConfig::from_yaml_str(delim).is_err());
    }
}
