//! Revenue by product and company: a static grouped bar chart (SVG).

use anyhow::{anyhow, Context, Result};
use plotters::prelude::*;
use std::{fs, path::Path};
use tracing::{error, info, instrument};

use super::{sum_by, GroupedSums, ReportOutcome};
use crate::{clean::CanonicalColumn, clean::CleanedTable, config::ChartText};

const REQUIRED: [CanonicalColumn; 2] = [CanonicalColumn::ContractValue, CanonicalColumn::Product];

/// Sum `Valor Contrato` per (`Empresa`, `Produto`) and draw it to `out`.
#[instrument(level = "info", skip(cleaned, text), fields(output = %out.display()))]
pub fn revenue_by_product(cleaned: &CleanedTable, text: &ChartText, out: &Path) -> Result<ReportOutcome> {
    let missing = cleaned.presence.missing(&REQUIRED);
    if !missing.is_empty() {
        error!(
            "required columns ('{}' and '{}') are not present in the data",
            CanonicalColumn::ContractValue,
            CanonicalColumn::Product
        );
        return Ok(ReportOutcome::Skipped { missing });
    }

    let sums = revenue_sums(&cleaned.table)?;
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    draw_grouped_bars(&sums, text, out)?;

    info!(groups = sums.len(), "revenue chart written");
    Ok(ReportOutcome::Rendered {
        path: out.to_path_buf(),
        groups: sums.len(),
    })
}

/// Companies as categories, products as series.
pub fn revenue_sums(table: &arrow::record_batch::RecordBatch) -> Result<GroupedSums> {
    sum_by(
        table,
        CanonicalColumn::Company,
        CanonicalColumn::Product,
        CanonicalColumn::ContractValue,
    )
}

/// One segment per bar plus a spacer segment closing each category.
fn draw_grouped_bars(sums: &GroupedSums, text: &ChartText, out: &Path) -> Result<()> {
    let per_group = sums.series.len() + 1;
    let slots = (sums.categories.len() * per_group).max(1);
    let (lo, hi) = sums.value_range();
    let (y_lo, y_hi) = if hi - lo > 0.0 {
        (lo * 1.1, hi * 1.1)
    } else {
        (0.0, 1.0)
    };

    let root = SVGBackend::new(out, (1200, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("{e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&text.title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d((0..slots).into_segmented(), y_lo..y_hi)
        .map_err(|e| anyhow!("{e}"))?;

    let categories = sums.categories.clone();
    let middle = sums.series.len().saturating_sub(1) / 2;
    let label_for = move |v: &SegmentValue<usize>| match v {
        SegmentValue::CenterOf(slot) if slot % per_group == middle => categories
            .get(slot / per_group)
            .cloned()
            .unwrap_or_default(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(slots)
        .x_label_formatter(&label_for)
        .x_desc(text.x_label.as_str())
        .y_desc(text.y_label.as_str())
        .draw()
        .map_err(|e| anyhow!("{e}"))?;

    for (s_idx, series) in sums.series.iter().enumerate() {
        let color = Palette99::pick(s_idx).to_rgba();
        let bars = sums
            .series_values(series)
            .into_iter()
            .enumerate()
            .filter_map(|(c_idx, v)| v.map(|v| (c_idx * per_group + s_idx, v)))
            .map(move |(slot, v)| {
                Rectangle::new(
                    [
                        (SegmentValue::Exact(slot), 0.0),
                        (SegmentValue::Exact(slot + 1), v),
                    ],
                    color.filled(),
                )
            })
            .collect::<Vec<_>>();

        chart
            .draw_series(bars)
            .map_err(|e| anyhow!("{e}"))?
            .label(series.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
    }

    // plotters draws no title on the series-label box, so the box goes at a
    // known spot in the plotting area and the title is written just above it
    let widest = sums
        .series
        .iter()
        .chain(std::iter::once(&text.legend_title))
        .map(|s| s.chars().count())
        .max()
        .unwrap_or(0) as i32;
    let (plot_w, _) = chart.plotting_area().dim_in_pixel();
    let (base_x, base_y) = chart.plotting_area().get_base_pixel();
    let legend_x = plot_w as i32 - (widest * 9 + 40) - 10;
    let legend_y = 34;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::Coordinate(legend_x, legend_y))
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .draw()
        .map_err(|e| anyhow!("{e}"))?;

    root.draw(&Text::new(
        text.legend_title.clone(),
        (base_x + legend_x + 4, base_y + legend_y - 22),
        ("sans-serif", 16),
    ))
    .map_err(|e| anyhow!("{e}"))?;

    root.present().map_err(|e| anyhow!("{e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clean::clean, config::ChartLabels, report::tests::typed_table};
    use tempfile::tempdir;

    #[test]
    fn renders_svg_with_titles() {
        let table = typed_table(
            &[
                ("Empresa", vec![Some("AutoCare"), Some("HomeGuard"), Some("AutoCare")]),
                ("Produto", vec![Some("Auto"), Some("Casa"), Some("Vida")]),
            ],
            ("Valor Contrato", vec![Some(100.0), Some(250.0), Some(40.0)]),
        );
        let cleaned = clean(&table).unwrap();
        let dir = tempdir().unwrap();
        let out = dir.path().join("charts").join("receita.svg");

        let outcome = revenue_by_product(&cleaned, &ChartLabels::default().revenue, &out).unwrap();
        assert_eq!(
            outcome,
            ReportOutcome::Rendered {
                path: out.clone(),
                groups: 3
            }
        );

        let svg = fs::read_to_string(&out).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Receita Total por Produto e Empresa"));
        assert!(svg.contains("Produtos"));
        assert!(svg.contains("Empresas"));
        assert!(svg.contains("Receita Total (CLP)"));
    }

    #[test]
    fn skips_without_product_column() {
        let table = typed_table(&[("Empresa", vec![Some("A")])], ("Valor Contrato", vec![Some(1.0)]));
        let cleaned = clean(&table).unwrap();
        let dir = tempdir().unwrap();
        let out = dir.path().join("receita.svg");

        let outcome = revenue_by_product(&cleaned, &ChartLabels::default().revenue, &out).unwrap();
        assert_eq!(
            outcome,
            ReportOutcome::Skipped {
                missing: vec![CanonicalColumn::Product]
            }
        );
        assert!(!out.exists());
    }
}
