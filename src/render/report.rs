use std::panic;
use std::path::Path;

use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontStyle;

use crate::error::ReportError;
use crate::processing::aggregate::{floor_hour, DailyStat, HourlyPoint};
use crate::processing::window::AnalysisWindow;
use crate::state::report_data::ReportData;
use crate::state::theme::{rgb, ReportStyle};

const FONT: &str = "sans-serif";
const MAX_COLOR: RGBColor = RGBColor(0xE7, 0x4C, 0x3C);
const MIN_COLOR: RGBColor = RGBColor(0x1F, 0x5F, 0xBF);
const MEAN_COLOR: RGBColor = RGBColor(0x27, 0xAE, 0x60);
const RANGE_COLOR: RGBColor = RGBColor(128, 128, 128);

/// Draw the two-panel report and save it as PNG at `path`.
///
/// The chart is drawn into an owned pixel buffer that is encoded once the
/// drawing area has been released. A panicking backend is reported as a
/// render error instead of unwinding through the caller.
pub fn render_report(
    data: &ReportData,
    style: &ReportStyle,
    path: &Path,
) -> Result<(), ReportError> {
    let render = || -> Result<()> { draw_to_file(data, style, path) };

    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| ReportError::Render("plotting backend panicked".to_string()))?
        .map_err(|e| ReportError::Render(format!("{e:#}")))
}

fn draw_to_file(data: &ReportData, style: &ReportStyle, path: &Path) -> Result<()> {
    let (width, height) = (style.width, style.height);
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&style.theme.plot_bg())?;
        let (upper, lower) = root.split_vertically((height * 2 / 3) as i32);
        draw_trend_panel(&upper, data, style)?;
        draw_daily_panel(&lower, &data.daily_stats, style)?;
        root.present()?;
    }

    let image = image::RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| anyhow!("pixel buffer does not match {width}x{height}"))?;
    image.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

/// Left edge of the trend panel: the first hourly slot, so a window that
/// starts mid-hour does not push that slot off the chart.
fn chart_origin(window: &AnalysisWindow) -> NaiveDateTime {
    floor_hour(window.start)
}

fn hours_since(origin: NaiveDateTime, ts: NaiveDateTime) -> f64 {
    (ts - origin).num_milliseconds() as f64 / 3_600_000.0
}

/// Split the hourly series into runs of consecutive non-gap points so each
/// run is drawn as its own line.
fn contiguous_runs(points: &[HourlyPoint], origin: NaiveDateTime) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for p in points {
        match p.mean_mmol {
            Some(v) => current.push((hours_since(origin, p.hour_start), v)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Fixed y range from the style, widened when readings fall outside it.
fn fit_range((lo, hi): (f64, f64), values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((lo, hi), |(lo, hi), v| (lo.min(v - 0.5), hi.max(v + 0.5)))
}

fn draw_trend_panel<DB>(
    area: &DrawingArea<DB, Shift>,
    data: &ReportData,
    style: &ReportStyle,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let fg = style.theme.foreground();
    let grid = style.theme.grid_color();
    let origin = chart_origin(&data.window);
    let x_max = hours_since(origin, data.window.end).max(1.0);
    let days = (data.window.end.date() - data.window.start.date()).num_days() + 1;
    let (y_lo, y_hi) = fit_range(
        style.trend_y_range,
        data.hourly_series.iter().filter_map(|p| p.mean_mmol),
    );

    let mut chart = ChartBuilder::on(area)
        .caption(
            format!("{days}-Day Glucose Trends (Hourly Average)"),
            (FONT, 28).into_font().style(FontStyle::Bold).color(&fg),
        )
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..x_max, y_lo..y_hi)?;

    // Target zones.
    let [low_color, target_color, high_color] = style.theme.band_colors();
    let bands = [
        (y_lo, style.target_low, low_color, 0.5, format!("Low (< {})", style.target_low)),
        (
            style.target_low,
            style.target_high,
            target_color,
            1.0,
            format!("Target ({} - {})", style.target_low, style.target_high),
        ),
        (
            style.target_high,
            style.band_ceiling,
            high_color,
            0.5,
            format!("High (> {})", style.target_high),
        ),
    ];
    for (lo, hi, color, alpha, label) in bands {
        let (lo, hi) = (lo.max(y_lo), hi.min(y_hi));
        if lo >= hi {
            continue;
        }
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(0.0, lo), (x_max, hi)],
                color.mix(alpha).filled(),
            )))?
            .label(label)
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 6), (x + 24, y + 6)], color.mix(alpha).filled())
            });
    }

    chart
        .configure_mesh()
        .x_labels(days as usize * 4)
        .x_label_formatter(&|h: &f64| {
            let ts = origin + Duration::milliseconds((h * 3_600_000.0).round() as i64);
            ts.format("%d/%m %H:%M").to_string()
        })
        .y_desc("Glucose (mmol/L)")
        .axis_desc_style((FONT, 20).into_font().color(&fg))
        .label_style((FONT, 16).into_font().color(&fg))
        .axis_style(fg)
        .bold_line_style(grid.mix(0.5))
        .light_line_style(grid.mix(0.15))
        .draw()?;

    // Midnight separators; the window start is emphasised.
    let mut midnight = origin.date().and_time(chrono::NaiveTime::default());
    if midnight < origin {
        midnight += Duration::days(1);
    }
    while midnight <= data.window.end {
        let x = hours_since(origin, midnight);
        let stroke = if midnight == origin {
            fg.mix(0.5).stroke_width(2)
        } else {
            grid.mix(0.8).stroke_width(1)
        };
        chart.draw_series(LineSeries::new(vec![(x, y_lo), (x, y_hi)], stroke))?;
        midnight += Duration::days(1);
    }

    // Hourly mean, broken at gaps.
    let line_color = rgb(style.trend_color);
    let mut labelled = false;
    for run in contiguous_runs(&data.hourly_series, origin) {
        let anno = if run.len() == 1 {
            chart.draw_series(std::iter::once(Circle::new(run[0], 4, line_color.filled())))?
        } else {
            chart.draw_series(LineSeries::new(run, line_color.stroke_width(3)))?
        };
        if !labelled {
            anno.label("Hourly Avg Glucose").legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 24, y)], line_color.stroke_width(3))
            });
            labelled = true;
        }
    }

    // Weekly average as a dashed line, value labelled at the latest reading.
    let avg_color = rgb(style.average_color);
    let avg = data.weekly_average;
    let dash = x_max / 120.0;
    let mut x = 0.0;
    let mut first_dash = true;
    while x < x_max {
        let anno = chart.draw_series(LineSeries::new(
            vec![(x, avg), ((x + dash).min(x_max), avg)],
            avg_color.stroke_width(2),
        ))?;
        if first_dash {
            anno.label(format!("Weekly Avg ({avg:.2})")).legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 24, y)], avg_color.stroke_width(2))
            });
            first_dash = false;
        }
        x += dash * 2.0;
    }
    if let Some(last) = data.last_timestamp() {
        chart.draw_series(std::iter::once(Text::new(
            format!("  {avg:.2}"),
            (hours_since(origin, last), avg),
            (FONT, 22).into_font().style(FontStyle::Bold).color(&avg_color),
        )))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(style.theme.plot_bg().mix(0.85))
        .border_style(fg)
        .label_font((FONT, 16).into_font().color(&fg))
        .draw()?;

    Ok(())
}

fn draw_daily_panel<DB>(
    area: &DrawingArea<DB, Shift>,
    stats: &[DailyStat],
    style: &ReportStyle,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let fg = style.theme.foreground();
    let n = stats.len().max(1);
    let (y_lo, y_hi) = fit_range(
        style.daily_y_range,
        stats.iter().flat_map(|d| [d.min, d.max]),
    );
    let dates: Vec<NaiveDate> = stats.iter().map(|d| d.date).collect();

    let mut chart = ChartBuilder::on(area)
        .caption(
            "Daily Summary: Min, Max, and Average",
            (FONT, 24).into_font().style(FontStyle::Bold).color(&fg),
        )
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5..(n as f64 - 0.5), y_lo..y_hi)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n * 2 + 1)
        .x_label_formatter(&|x: &f64| {
            let i = x.round();
            if (x - i).abs() > 1e-6 || i < 0.0 {
                return String::new();
            }
            dates
                .get(i as usize)
                .map(|d| d.format("%d/%m").to_string())
                .unwrap_or_default()
        })
        .y_desc("Glucose (mmol/L)")
        .axis_desc_style((FONT, 20).into_font().color(&fg))
        .label_style((FONT, 16).into_font().color(&fg))
        .axis_style(fg)
        .bold_line_style(style.theme.grid_color().mix(0.5))
        .light_line_style(style.theme.grid_color().mix(0.15))
        .draw()?;

    for (i, d) in stats.iter().enumerate() {
        let x = i as f64;
        chart.draw_series(LineSeries::new(
            vec![(x, d.min), (x, d.max)],
            RANGE_COLOR.mix(0.5).stroke_width(6),
        ))?;
    }

    let positions = || stats.iter().enumerate().map(|(i, d)| (i as f64, d));
    let value_font = |color: RGBColor| (FONT, 17).into_font().style(FontStyle::Bold).color(&color);

    chart
        .draw_series(
            positions().map(|(x, d)| TriangleMarker::new((x, d.max), 10, MAX_COLOR.filled())),
        )?
        .label("Max")
        .legend(|(x, y)| TriangleMarker::new((x + 10, y), 7, MAX_COLOR.filled()));
    chart
        .draw_series(
            positions().map(|(x, d)| Cross::new((x, d.min), 8, MIN_COLOR.stroke_width(3))),
        )?
        .label("Min")
        .legend(|(x, y)| Cross::new((x + 10, y), 6, MIN_COLOR.stroke_width(3)));
    chart
        .draw_series(positions().map(|(x, d)| Circle::new((x, d.mean), 9, MEAN_COLOR.filled())))?
        .label("Daily Avg")
        .legend(|(x, y)| Circle::new((x + 10, y), 6, MEAN_COLOR.filled()));

    chart.draw_series(positions().map(|(x, d)| {
        EmptyElement::at((x, d.max))
            + Text::new(format!("{:.1}", d.max), (-14, -32), value_font(MAX_COLOR))
    }))?;
    chart.draw_series(positions().map(|(x, d)| {
        EmptyElement::at((x, d.min))
            + Text::new(format!("{:.1}", d.min), (-14, 14), value_font(MIN_COLOR))
    }))?;
    chart.draw_series(positions().map(|(x, d)| {
        EmptyElement::at((x, d.mean))
            + Text::new(format!("{:.1}", d.mean), (16, -9), value_font(MEAN_COLOR))
    }))?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(style.theme.plot_bg().mix(0.85))
        .border_style(fg)
        .label_font((FONT, 16).into_font().color(&fg))
        .draw()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn runs_break_at_gaps() {
        let points = vec![
            HourlyPoint { hour_start: ts(1, 0), mean_mmol: Some(5.0) },
            HourlyPoint { hour_start: ts(1, 1), mean_mmol: Some(6.0) },
            HourlyPoint { hour_start: ts(1, 2), mean_mmol: None },
            HourlyPoint { hour_start: ts(1, 3), mean_mmol: Some(7.0) },
            HourlyPoint { hour_start: ts(1, 4), mean_mmol: None },
        ];
        let runs = contiguous_runs(&points, ts(1, 0));
        assert_eq!(runs, vec![vec![(0.0, 5.0), (1.0, 6.0)], vec![(3.0, 7.0)]]);
    }

    #[test]
    fn mid_hour_window_keeps_first_slot_on_chart() {
        use crate::processing::aggregate::hour_slots;
        use crate::processing::window::WindowAlignment;

        let latest = ts(10, 14) + Duration::minutes(32);
        let window = AnalysisWindow::anchored(latest, 7, WindowAlignment::RawTrailing).unwrap();
        let origin = chart_origin(&window);
        let slots = hour_slots(&window);

        assert_eq!(origin, ts(4, 14));
        assert_eq!(hours_since(origin, slots[0]), 0.0);
        assert!(slots.iter().all(|&s| hours_since(origin, s) >= 0.0));
    }

    #[test]
    fn range_widens_only_when_needed() {
        assert_eq!(fit_range((3.0, 11.5), [5.0, 9.0].into_iter()), (3.0, 11.5));
        assert_eq!(fit_range((3.0, 11.5), [2.0, 15.0].into_iter()), (1.5, 15.5));
    }
}
