//! Chart of a service's report series.

use image::ImageEncoder;
use plotters::prelude::*;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 400;

/// Upper bound of the y axis, padded above the highest point.
fn y_max(series: &[u32]) -> u32 {
    let max = series.iter().copied().max().unwrap_or(0);
    max.saturating_add(max / 10).max(10)
}

/// Draws `series` as a line chart titled after `service` and encodes it as PNG.
pub fn render_series_chart(service: &str, series: &[u32]) -> anyhow::Result<Vec<u8>> {
    let points: Vec<(u32, u32)> = series
        .iter()
        .enumerate()
        .map(|(i, &count)| (i as u32, count))
        .collect();
    let x_max = (points.len() as u32).saturating_sub(1).max(1);
    let y_max = y_max(series);

    let mut buffer = vec![0; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&RGBColor(43, 45, 49))?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("{service}: reports"),
                ("sans-serif", 20).into_font().color(&WHITE),
            )
            .margin(20)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(0..x_max, 0..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(0)
            .y_desc("Reports")
            .label_style(("sans-serif", 15).into_font().color(&WHITE))
            .axis_style(WHITE)
            .draw()?;

        let line = RGBColor(224, 108, 117);
        chart.draw_series(
            AreaSeries::new(points.iter().copied(), 0, line.mix(0.25))
                .border_style(line.stroke_width(3)),
        )?;

        root.present()?;
    }

    let mut png_bytes = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut png_bytes);
    image::codecs::png::PngEncoder::new(&mut cursor).write_image(
        &buffer,
        WIDTH,
        HEIGHT,
        image::ExtendedColorType::Rgb8,
    )?;

    Ok(png_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_y_max_padding() {
        assert_eq!(y_max(&[]), 10);
        assert_eq!(y_max(&[3, 4]), 10);
        assert_eq!(y_max(&[10, 200, 50]), 220);
    }

    #[test]
    fn test_y_max_saturates_on_huge_counts() {
        assert_eq!(y_max(&[1, u32::MAX]), u32::MAX);
        assert_eq!(y_max(&[u32::MAX - 5]), u32::MAX);
    }
}
