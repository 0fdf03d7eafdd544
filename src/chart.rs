//! A line chart of a time series, drawn with `egui_plot`.

use chrono::{DateTime, Utc};
use egui::{Color32, RichText, Ui};
use egui_plot::{Line, Plot, PlotPoints};

/// The number of interpolated segments between two data points of a smoothed curve.
const SMOOTHING_STEPS: usize = 8;

/// A single value of a time series.
#[derive(Clone, Debug, PartialEq)]
pub struct TimePoint {
    /// When the value was observed.
    pub timestamp: DateTime<Utc>,

    /// The observed value.
    pub value: f64,
}

impl TimePoint {
    /// Creates a point from a timestamp in milliseconds since the Unix epoch. Returns `None` for
    /// timestamps out of range.
    pub fn from_millis(millis: i64, value: f64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(|timestamp| Self { timestamp, value })
    }
}

/// How a chart is drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartOptions {
    /// The title above the chart.
    pub title: String,

    /// Whether the line is smoothed between the data points.
    pub smooth: bool,

    /// Whether a legend is shown.
    pub legend: bool,

    /// The color of the line.
    pub color: Color32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: "Brightness over time".to_string(),
            smooth: true,
            legend: false,
            color: Color32::from_rgb(66, 133, 244),
        }
    }
}

/// A line chart of a time series. The points are drawn in the order they are given.
#[derive(Clone, Debug, PartialEq)]
pub struct LineChart {
    series: Vec<TimePoint>,
    options: ChartOptions,
}

impl LineChart {
    /// Creates a chart of `series`.
    pub fn new(series: Vec<TimePoint>, options: ChartOptions) -> Self {
        Self { series, options }
    }

    /// The charted series.
    pub fn series(&self) -> &[TimePoint] {
        &self.series
    }

    /// The chart options.
    pub fn options(&self) -> &ChartOptions {
        &self.options
    }

    /// The plotted points, x being milliseconds since the Unix epoch.
    pub fn plot_points(&self) -> Vec<[f64; 2]> {
        let points: Vec<[f64; 2]> = self
            .series
            .iter()
            .map(|p| [p.timestamp.timestamp_millis() as f64, p.value])
            .collect();

        if self.options.smooth {
            smooth(&points, SMOOTHING_STEPS)
        } else {
            points
        }
    }

    /// Draws the chart.
    pub fn ui(&self, ui: &mut Ui, height: f32) {
        ui.label(RichText::new(&self.options.title).strong());

        let mut plot = Plot::new("time_series_chart")
            .height(height)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .x_axis_formatter(|mark, _range| format_date(mark.value));
        if self.options.legend {
            plot = plot.legend(egui_plot::Legend::default());
        }

        let line = Line::new(self.options.title.clone(), PlotPoints::new(self.plot_points()))
            .color(self.options.color);
        plot.show(ui, |plot_ui| plot_ui.line(line));
    }
}

/// Formats milliseconds since the Unix epoch as a calendar date.
fn format_date(millis: f64) -> String {
    DateTime::from_timestamp_millis(millis as i64)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Interpolates a Catmull-Rom spline through the points, `steps` segments between each pair.
///
/// The curve passes through every original point.
pub(crate) fn smooth(points: &[[f64; 2]], steps: usize) -> Vec<[f64; 2]> {
    if points.len() < 3 || steps < 2 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut smoothed = Vec::with_capacity(last * steps + 1);
    for i in 0..last {
        let p0 = points[i.saturating_sub(1)];
        let p1 = points[i];
        let p2 = points[i + 1];
        let p3 = points[(i + 2).min(last)];

        for step in 0..steps {
            let t = step as f64 / steps as f64;
            let t2 = t * t;
            let t3 = t2 * t;
            let interpolate = |a: f64, b: f64, c: f64, d: f64| {
                0.5 * (2.0 * b
                    + (c - a) * t
                    + (2.0 * a - 5.0 * b + 4.0 * c - d) * t2
                    + (3.0 * b - a - 3.0 * c + d) * t3)
            };
            smoothed.push([
                interpolate(p0[0], p1[0], p2[0], p3[0]),
                interpolate(p0[1], p1[1], p2[1], p3[1]),
            ]);
        }
    }
    smoothed.push(points[last]);
    smoothed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let options = ChartOptions::default();
        assert_eq!(options.title, "Brightness over time");
        assert!(options.smooth);
        assert!(!options.legend);
    }

    #[test]
    fn time_point_from_millis() {
        let point = TimePoint::from_millis(1000, 10.0).unwrap();
        assert_eq!(point.timestamp.timestamp_millis(), 1000);
        assert_eq!(point.value, 10.0);

        assert!(TimePoint::from_millis(i64::MAX, 1.0).is_none());
    }

    #[test]
    fn smoothing_passes_through_every_point() {
        let points = [[0.0, 0.0], [1.0, 4.0], [2.0, 1.0], [3.0, 3.0]];
        let smoothed = smooth(&points, 4);

        assert_eq!(smoothed.len(), 3 * 4 + 1);
        for (i, point) in points.iter().enumerate() {
            let s = smoothed[i * 4];
            assert!((s[0] - point[0]).abs() < 1e-12 && (s[1] - point[1]).abs() < 1e-12);
        }
    }

    #[test]
    fn short_series_are_not_smoothed() {
        let points = [[1000.0, 10.0], [2000.0, 20.0]];
        assert_eq!(smooth(&points, 8), points.to_vec());
    }

    #[test]
    fn plot_points_keep_the_series_order() {
        let series = vec![
            TimePoint::from_millis(2000, 20.0).unwrap(),
            TimePoint::from_millis(1000, 10.0).unwrap(),
        ];
        let chart = LineChart::new(
            series,
            ChartOptions {
                smooth: false,
                ..Default::default()
            },
        );

        assert_eq!(chart.plot_points(), vec![[2000.0, 20.0], [1000.0, 10.0]]);
    }

    #[test]
    fn dates_are_formatted_as_calendar_days() {
        assert_eq!(format_date(0.0), "1970-01-01");
        assert_eq!(format_date(1_500_000_000_000.0), "2017-07-14");
    }
}
