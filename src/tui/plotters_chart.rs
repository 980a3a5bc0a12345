//! Plotters-powered price/forecast chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using
//! `plotters-ratatui-backend`. All series and bounds come precomputed in a
//! `ChartData`, so `render()` only draws.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::plot::ChartData;

/// High-contrast stand-ins for the blue/green palette on dark terminals.
const ACTUAL_COLOR: RGBColor = RGBColor(80, 160, 255);
const FORECAST_COLOR: RGBColor = RGBColor(0, 255, 0);

pub struct ForecastChart<'a> {
    pub data: &'a ChartData,
    pub y_label: &'a str,
}

impl Widget for ForecastChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to lay out a chart in a tiny area; show a hint instead.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.data.x_bounds();
        let [y0, y1] = self.data.y_bounds();
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let data = self.data;
        let y_label = self.y_label;
        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 8)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .y_desc(y_label)
                .x_labels(4)
                .y_labels(5)
                .x_label_formatter(&|v| data.date_at(*v).format("%Y-%m-%d").to_string())
                .y_label_formatter(&|v| format!("{v:.2}"))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            chart.draw_series(LineSeries::new(data.actual.iter().copied(), &ACTUAL_COLOR))?;
            if !data.forecast.is_empty() {
                chart.draw_series(LineSeries::new(data.forecast.iter().copied(), &FORECAST_COLOR))?;
                // A one-day forecast is a single point; mark every point so it stays visible.
                chart.draw_series(data.forecast.iter().map(|&(x, y)| Pixel::new((x, y), FORECAST_COLOR)))?;
            }
            Ok(())
        });

        widget.render(area, buf);
    }
}
