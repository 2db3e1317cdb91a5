// Preview coordinate mapping tests

use image::{DynamicImage, Rgb, RgbImage};
use photomark::watermark::position::ImageDimensions;
use photomark::watermark::{
    PositionSpec, PreviewTransform, TextStyle, WatermarkEngine, WatermarkPosition, WatermarkSpec,
};
use photomark::config::EngineConfig;
use rstest::rstest;

fn dims(width: u32, height: u32) -> ImageDimensions {
    ImageDimensions { width, height }
}

#[rstest]
#[case(dims(4000, 3000), dims(800, 800))]
#[case(dims(3000, 4000), dims(1024, 768))]
#[case(dims(640, 480), dims(1920, 1080))]
#[case(dims(7, 5), dims(3, 3))]
fn test_canvas_round_trip_within_one_pixel(
    #[case] source: ImageDimensions,
    #[case] canvas: ImageDimensions,
) {
    let transform = PreviewTransform::fit(source, canvas);
    let (sx, sy) = transform.scale();
    let tolerance_x = (1.0 / sx).ceil() as i32;
    let tolerance_y = (1.0 / sy).ceil() as i32;

    for &(x, y) in &[
        (0, 0),
        (source.width as i32 / 3, source.height as i32 / 2),
        (source.width as i32 - 1, source.height as i32 - 1),
    ] {
        let (cx, cy) = transform.to_canvas_point(x, y);
        let (bx, by) = transform.to_source_point(cx, cy);
        assert!((bx - x).abs() <= tolerance_x, "x {} -> {}", x, bx);
        assert!((by - y).abs() <= tolerance_y, "y {} -> {}", y, by);
    }
}

#[test]
fn test_small_source_is_not_upscaled() {
    let transform = PreviewTransform::fit(dims(640, 480), dims(1920, 1080));
    assert_eq!(transform.scale(), (1.0, 1.0));
    assert_eq!(transform.canvas_offset(), (640.0, 300.0));
}

#[test]
fn test_points_off_the_preview_clamp_to_the_edge() {
    let transform = PreviewTransform::fit(dims(4000, 3000), dims(800, 800));
    assert_eq!(transform.to_source_point(-50.0, -50.0), (0, 0));
    assert_eq!(transform.to_source_point(5000.0, 5000.0), (4000, 3000));
    assert_eq!(transform.to_source_point(400.0, 20.0), (2000, 0));
}

#[test]
fn test_drag_moves_watermark_in_source_pixels() {
    let engine = WatermarkEngine::new(&EngineConfig {
        system_fonts: false,
        ..EngineConfig::default()
    });
    let base = DynamicImage::ImageRgb8(RgbImage::from_pixel(2000, 1000, Rgb([20, 20, 20])));
    let spec = WatermarkSpec::Text(TextStyle {
        size: Some(60),
        alpha: 1.0,
        ..TextStyle::new("DRAG")
    });
    let preset = PositionSpec::anchored(WatermarkPosition::TopLeft, 40);

    let first = engine.render(&base, &spec, &preset);
    let anchor = first.anchor.expect("anchor of the preset placement");
    let bbox = first.bbox.unwrap();

    // Preview at 500x250: one canvas pixel is four source pixels
    let transform = PreviewTransform::fit(dims(2000, 1000), dims(500, 500));
    assert_eq!(transform.scale(), (0.25, 0.25));

    let rect = transform.to_canvas_rect(&bbox);
    let grab = (rect.x + rect.width / 2.0, rect.y + rect.height / 2.0);
    let delta = transform.drag_delta(grab, (grab.0 + 25.0, grab.1 + 10.0));
    assert_eq!(delta, (100, 40));

    let moved = preset.dragged_from((anchor.x, anchor.y), delta);
    assert_eq!(moved.custom, Some((anchor.x + 100, anchor.y + 40)));

    let second = engine.render(&base, &spec, &moved);
    let moved_bbox = second.bbox.unwrap();
    assert_eq!(moved_bbox.left, bbox.left + 100);
    assert_eq!(moved_bbox.top, bbox.top + 40);
    assert_eq!((moved_bbox.width, moved_bbox.height), (bbox.width, bbox.height));
}

#[test]
fn test_drag_off_image_is_not_clamped() {
    let transform = PreviewTransform::fit(dims(1000, 1000), dims(100, 100));
    assert_eq!(transform.drag_delta((50.0, 50.0), (-10.0, 50.0)), (-600, 0));
}
