//! Profit by region and company: an interactive grouped bar chart (HTML).

use anyhow::{Context, Result};
use plotly::{
    common::Title,
    layout::{Axis, BarMode, Layout, Legend},
    Bar, Plot,
};
use std::{
    fs,
    panic::{self, AssertUnwindSafe},
    path::Path,
};
use tracing::{error, info, instrument, warn};

use super::{sum_by, GroupedSums, ReportOutcome};
use crate::{clean::CanonicalColumn, clean::CleanedTable, config::ChartText};

const REQUIRED: [CanonicalColumn; 2] = [CanonicalColumn::Profit, CanonicalColumn::Region];

/// Sum `Lucro` per (`Região`, `Empresa`) and write a self-contained HTML chart.
///
/// With `open_viewer` the chart is also handed to the default browser.
#[instrument(level = "info", skip(cleaned, text), fields(output = %out.display()))]
pub fn profit_by_region(
    cleaned: &CleanedTable,
    text: &ChartText,
    out: &Path,
    open_viewer: bool,
) -> Result<ReportOutcome> {
    let missing = cleaned.presence.missing(&REQUIRED);
    if !missing.is_empty() {
        error!(
            "required columns ('{}' and '{}') are not present in the data",
            CanonicalColumn::Profit,
            CanonicalColumn::Region
        );
        return Ok(ReportOutcome::Skipped { missing });
    }

    let sums = profit_sums(&cleaned.table)?;
    let plot = build_plot(&sums, text);

    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(out, plot.to_html()).with_context(|| format!("writing {}", out.display()))?;
    info!(groups = sums.len(), "profit chart written");

    if open_viewer {
        // plotly panics when it cannot launch a browser
        if panic::catch_unwind(AssertUnwindSafe(|| plot.show())).is_err() {
            warn!("could not open a viewer; the chart is still at {}", out.display());
        }
    }

    Ok(ReportOutcome::Rendered {
        path: out.to_path_buf(),
        groups: sums.len(),
    })
}

/// Regions as categories, companies as series.
pub fn profit_sums(table: &arrow::record_batch::RecordBatch) -> Result<GroupedSums> {
    sum_by(
        table,
        CanonicalColumn::Region,
        CanonicalColumn::Company,
        CanonicalColumn::Profit,
    )
}

fn build_plot(sums: &GroupedSums, text: &ChartText) -> Plot {
    let mut plot = Plot::new();

    for company in &sums.series {
        let (regions, totals): (Vec<String>, Vec<f64>) = sums
            .categories
            .iter()
            .zip(sums.series_values(company))
            .filter_map(|(region, v)| v.map(|v| (region.clone(), v)))
            .unzip();
        plot.add_trace(Bar::new(regions, totals).name(company));
    }

    let layout = Layout::new()
        .title(Title::new(&text.title))
        .bar_mode(BarMode::Group)
        .x_axis(Axis::new().title(Title::new(&text.x_label)))
        .y_axis(Axis::new().title(Title::new(&text.y_label)))
        .legend(Legend::new().title(Title::new(&text.legend_title)));
    plot.set_layout(layout);

    plot
}
