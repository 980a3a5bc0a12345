//! ASCII plotting for terminal output.
//!
//! A fixed-size character grid, so the output is deterministic and easy to
//! pin in golden tests.
//!
//! Plot elements:
//! - price history: `-` line
//! - forecast: `*` line

use crate::domain::{ForecastSeries, PriceSeries};
use crate::plot::ChartData;

const ACTUAL: char = '-';
const FORECAST: char = '*';
/// Narrowest grid that still fits the first and last dates under the plot.
const MIN_FOOTER_WIDTH: usize = 21;

/// Plot the price history and (optionally) its forecast.
pub fn render_forecast_plot(
    series: &PriceSeries,
    forecast: Option<&ForecastSeries>,
    width: usize,
    height: usize,
) -> String {
    match ChartData::new(series, forecast) {
        Some(data) => render_ascii_chart(&data, width, height),
        None => "Plot: no data\n".to_string(),
    }
}

pub fn render_ascii_chart(data: &ChartData, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let [x_min, x_max] = data.x_bounds();
    let [y_min, y_max] = data.y_bounds();
    let mut grid = vec![vec![' '; width]; height];

    let to_cell = |(x, y): (f64, f64)| (map_x(x, x_min, x_max, width), map_y(y, y_min, y_max, height));

    draw_polyline(&mut grid, data.actual.iter().copied().map(to_cell), ACTUAL);
    // The forecast is drawn last so it stays visible where the two meet.
    draw_polyline(&mut grid, data.forecast.iter().copied().map(to_cell), FORECAST);

    let mut legend = format!("{ACTUAL} actual");
    if !data.forecast.is_empty() {
        legend.push_str(&format!(", {FORECAST} forecast"));
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: date=[{}, {}] | price=[{y_min:.2}, {y_max:.2}] | {legend}\n",
        data.date_at(x_min.max(0.0)),
        data.date_at(x_max)
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    if width >= MIN_FOOTER_WIDTH {
        let first = data.date_at(x_min.max(0.0)).to_string();
        let last = data.date_at(x_max).to_string();
        out.push_str(&format!("{first}{last:>pad$}\n", pad = width - first.len()));
    }
    out
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top of the plot.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_polyline(grid: &mut [Vec<char>], cells: impl Iterator<Item = (usize, usize)>, ch: char) {
    let mut prev = None;
    for (x, y) in cells {
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, y, ch),
            None => grid[y][x] = ch,
        }
        prev = Some((x, y));
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if let Some(cell) = grid.get_mut(y0 as usize).and_then(|row| row.get_mut(x0 as usize)) {
            *cell = ch;
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ForecastPoint, PricePoint};
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample() -> (PriceSeries, ForecastSeries) {
        let series = PriceSeries::from_points((1..=3).map(|day| PricePoint {
            date: d(day),
            price: day as f64,
        }));
        let forecast = ForecastSeries {
            points: (4..=5)
                .map(|day| ForecastPoint {
                    date: d(day),
                    prediction: day as f64,
                })
                .collect(),
        };
        (series, forecast)
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let (series, forecast) = sample();
        let txt = render_forecast_plot(&series, Some(&forecast), 10, 5);
        let expected = concat!(
            "Plot: date=[2024-01-01, 2024-01-05] | price=[0.80, 5.20] | - actual, * forecast\n",
            "        **\n",
            "       *  \n",
            "    --    \n",
            " ---      \n",
            "-         \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn wide_plots_get_a_date_footer() {
        let (series, forecast) = sample();
        let txt = render_forecast_plot(&series, Some(&forecast), 24, 6);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 1 + 6 + 1);
        assert_eq!(lines[7], "2024-01-01    2024-01-05");
        assert!(lines[1..7].iter().all(|l| l.chars().count() == 24));
    }

    #[test]
    fn history_only_and_empty() {
        let (series, _) = sample();
        let txt = render_forecast_plot(&series, None, 10, 5);
        assert!(!txt.contains('*'));
        assert!(txt.contains("date=[2024-01-01, 2024-01-03]"));
        assert!(txt.lines().next().unwrap().ends_with("| - actual"));
        assert_eq!(render_forecast_plot(&PriceSeries::empty(), None, 10, 5), "Plot: no data\n");
    }
}
