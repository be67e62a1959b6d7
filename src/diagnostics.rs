//! Debug plotting of one joint's raw rotation channels.
//!
//! Not load-bearing for conversion: callers log and swallow any error
//! reported here instead of aborting the file being converted.

use image::{ImageError, Rgb, RgbImage};
use std::path::Path;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 400;
const MARGIN: u32 = 12;

/// Curve colors: x red, y green, z blue.
const CURVE_COLORS: [Rgb<u8>; 3] = [
    Rgb([200, 60, 50]),
    Rgb([40, 140, 70]),
    Rgb([50, 80, 190]),
];
const AXIS_COLOR: Rgb<u8> = Rgb([180, 180, 180]);
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Raw X/Y/Z rotation samples of one joint, accumulated across the frames of
/// a single file. Scoped to that file; a new series is built per conversion.
#[derive(Debug)]
pub struct ChannelSeries {
    joint: String,
    samples: Vec<(f64, f64, f64)>,
}

impl ChannelSeries {
    pub fn new(joint: &str) -> ChannelSeries {
        ChannelSeries {
            joint: joint.to_string(),
            samples: Vec::new(),
        }
    }

    pub fn joint(&self) -> &str {
        &self.joint
    }

    pub fn push(&mut self, x: f64, y: f64, z: f64) {
        self.samples.push((x, y, z));
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Render the series as an x/y/z-versus-frame polyline chart.
pub fn render_plot(series: &ChannelSeries, path: &Path) -> Result<(), ImageError> {
    if series.is_empty() {
        return Ok(());
    }

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &(x, y, z) in &series.samples {
        for v in [x, y, z] {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    // flat series still gets a visible band
    if hi - lo < f64::EPSILON {
        lo -= 1.0;
        hi += 1.0;
    }

    let plot_w = (WIDTH - 2 * MARGIN) as f64;
    let plot_h = (HEIGHT - 2 * MARGIN) as f64;
    let n = series.samples.len();
    let x_at = |i: usize| -> f64 {
        if n == 1 {
            MARGIN as f64 + plot_w / 2.0
        } else {
            MARGIN as f64 + (i as f64 / (n - 1) as f64) * (plot_w - 1.0)
        }
    };
    let y_at = |v: f64| -> f64 { MARGIN as f64 + (1.0 - (v - lo) / (hi - lo)) * (plot_h - 1.0) };

    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);

    // zero baseline, when zero falls inside the value range
    if lo <= 0.0 && 0.0 <= hi {
        let y = y_at(0.0);
        draw_line(&mut img, MARGIN as f64, y, (WIDTH - MARGIN) as f64, y, AXIS_COLOR);
    }

    for (channel, color) in CURVE_COLORS.iter().enumerate() {
        for i in 1..n {
            let (a, b) = (series.samples[i - 1], series.samples[i]);
            let v0 = [a.0, a.1, a.2][channel];
            let v1 = [b.0, b.1, b.2][channel];
            draw_line(&mut img, x_at(i - 1), y_at(v0), x_at(i), y_at(v1), *color);
        }
        if n == 1 {
            let only = series.samples[0];
            let v = [only.0, only.1, only.2][channel];
            draw_line(&mut img, x_at(0) - 2.0, y_at(v), x_at(0) + 2.0, y_at(v), *color);
        }
        // legend swatch, top-left, one row per channel
        let swatch_y = (4 + channel as u32 * 4) as f64;
        draw_line(&mut img, 4.0, swatch_y, 24.0, swatch_y, *color);
    }

    img.save(path)
}

/// Plot a straight segment by stepping one pixel at a time.
fn draw_line(img: &mut RgbImage, x0: f64, y0: f64, x1: f64, y1: f64, color: Rgb<u8>) {
    let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0);
    let n = steps as u32;
    for s in 0..=n {
        let t = s as f64 / steps;
        let x = (x0 + (x1 - x0) * t).round();
        let y = (y0 + (y1 - y0) * t).round();
        if x >= 0.0 && y >= 0.0 && (x as u32) < img.width() && (y as u32) < img.height() {
            img.put_pixel(x as u32, y as u32, color);
        }
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_samples() {
        let mut series = ChannelSeries::new("right hip");
        assert!(series.is_empty());
        series.push(1.0, 2.0, 3.0);
        series.push(-1.0, 0.5, 0.0);
        assert_eq!(series.len(), 2);
        assert_eq!(series.joint(), "right hip");
    }

    #[test]
    fn renders_a_png() {
        let mut series = ChannelSeries::new("right hip");
        for i in 0..60 {
            let t = i as f64 * 0.2;
            series.push(t.sin() * 30.0, t.cos() * 15.0, t * 0.5 - 3.0);
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plot.png");
        render_plot(&series, &path).unwrap();

        use image::GenericImageView;
        let written = image::open(&path).unwrap();
        assert_eq!(written.dimensions(), (WIDTH, HEIGHT));
    }

    #[test]
    fn single_sample_and_flat_series_do_not_panic() {
        let mut one = ChannelSeries::new("neck");
        one.push(0.0, 0.0, 0.0);
        let dir = tempfile::tempdir().unwrap();
        render_plot(&one, &dir.path().join("one.png")).unwrap();

        let mut flat = ChannelSeries::new("neck");
        for _ in 0..10 {
            flat.push(5.0, 5.0, 5.0);
        }
        render_plot(&flat, &dir.path().join("flat.png")).unwrap();
    }

    #[test]
    fn empty_series_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        render_plot(&ChannelSeries::new("chest"), &path).unwrap();
        assert!(!path.exists());
    }
}
