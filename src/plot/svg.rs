//! SVG export of the price/forecast chart (Plotters `SVGBackend`).

use std::error::Error;
use std::path::Path;

use plotters::prelude::*;

use crate::error::{AppError, EXIT_INPUT};
use crate::plot::ChartData;

pub const SVG_SIZE: (u32, u32) = (1024, 576);

/// Series colours shared with the TUI chart.
pub const ACTUAL_COLOR: RGBColor = RGBColor(31, 119, 180);
pub const FORECAST_COLOR: RGBColor = RGBColor(44, 160, 44);

/// Write the chart to `path`.
pub fn write_svg_chart(path: &Path, data: &ChartData, title: &str) -> Result<(), AppError> {
    draw_svg(path, data, title)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write SVG chart '{}': {e}", path.display())))
}

fn draw_svg(path: &Path, data: &ChartData, title: &str) -> Result<(), Box<dyn Error>> {
    let root = SVGBackend::new(path, SVG_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let [x0, x1] = data.x_bounds();
    let [y0, y1] = data.y_bounds();

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .x_labels(6)
        .y_labels(8)
        .x_label_formatter(&|x| data.date_at(*x).to_string())
        .y_label_formatter(&|y| format!("{y:.2}"))
        .y_desc("Adjusted close")
        .draw()?;

    chart
        .draw_series(LineSeries::new(data.actual.iter().copied(), &ACTUAL_COLOR))?
        .label("Actual")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &ACTUAL_COLOR));

    if !data.forecast.is_empty() {
        chart
            .draw_series(LineSeries::new(
                data.forecast.iter().copied(),
                ShapeStyle::from(&FORECAST_COLOR).stroke_width(2),
            ))?
            .label("Forecast")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &FORECAST_COLOR));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ForecastPoint, ForecastSeries, PricePoint, PriceSeries};
    use chrono::NaiveDate;

    #[test]
    fn writes_an_svg_file() {
        let d = |day: u32| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let series = PriceSeries::from_points((1..=10).map(|day| PricePoint {
            date: d(day),
            price: 100.0 + day as f64,
        }));
        let forecast = ForecastSeries {
            points: vec![ForecastPoint { date: d(11), prediction: 111.0 }],
        };
        let data = ChartData::new(&series, Some(&forecast)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.svg");
        write_svg_chart(&path, &data, "TEST").unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("polyline"));
    }
}
