use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn plot_bg(&self) -> RGBColor {
        match self {
            Theme::Dark => RGBColor(20, 20, 20),
            Theme::Light => RGBColor(255, 255, 255),
        }
    }

    pub fn foreground(&self) -> RGBColor {
        match self {
            Theme::Dark => RGBColor(230, 230, 230),
            Theme::Light => RGBColor(30, 30, 30),
        }
    }

    pub fn grid_color(&self) -> RGBColor {
        match self {
            Theme::Dark => RGBColor(100, 100, 100),
            Theme::Light => RGBColor(180, 180, 180),
        }
    }

    /// Fill colors for the low, target and high glucose bands.
    pub fn band_colors(&self) -> [RGBColor; 3] {
        match self {
            Theme::Light => [
                RGBColor(0xFF, 0xCC, 0xCC),
                RGBColor(0xE8, 0xF8, 0xF5),
                RGBColor(0xFC, 0xF3, 0xCF),
            ],
            Theme::Dark => [
                RGBColor(0x5C, 0x2A, 0x2A),
                RGBColor(0x1E, 0x3B, 0x36),
                RGBColor(0x4D, 0x45, 0x1F),
            ],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Theme::Dark => "Dark",
            Theme::Light => "Light",
        }
    }
}

/// Visual settings handed to the renderer for a single draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportStyle {
    pub width: u32,
    pub height: u32,
    pub theme: Theme,
    /// Upper bound of the low band / lower bound of the target band.
    pub target_low: f64,
    /// Upper bound of the target band / lower bound of the high band.
    pub target_high: f64,
    /// Ceiling of the high band.
    pub band_ceiling: f64,
    pub trend_y_range: (f64, f64),
    pub daily_y_range: (f64, f64),
    pub trend_color: [u8; 3],
    pub average_color: [u8; 3],
}

impl Default for ReportStyle {
    fn default() -> Self {
        Self {
            width: 1800,
            height: 1800,
            theme: Theme::default(),
            target_low: 3.9,
            target_high: 10.0,
            band_ceiling: 20.0,
            trend_y_range: (3.0, 11.5),
            daily_y_range: (2.0, 12.0),
            trend_color: [0x29, 0x80, 0xB9],
            average_color: [128, 0, 128],
        }
    }
}

impl ReportStyle {
    pub fn validate(&self) -> Result<(), String> {
        if self.width < 200 || self.height < 200 {
            return Err(format!(
                "image size {}x{} is too small (minimum 200x200)",
                self.width, self.height
            ));
        }
        if !(self.target_low < self.target_high && self.target_high < self.band_ceiling) {
            return Err("target band thresholds must be increasing".to_string());
        }
        for (name, (lo, hi)) in [("trend", self.trend_y_range), ("daily", self.daily_y_range)] {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(format!("{name} y range must be finite and increasing"));
            }
        }
        Ok(())
    }
}

pub fn rgb(c: [u8; 3]) -> RGBColor {
    RGBColor(c[0], c[1], c[2])
}
