// Render entrypoint tests
//
// End-to-end checks of WatermarkEngine: placement, format adaptation,
// degradation paths and concurrent use of one engine.

use image::{DynamicImage, GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};
use photomark::config::EngineConfig;
use photomark::watermark::{
    OutputFormat, PixelBBox, PositionSpec, ShadowStyle, StrokeStyle, TextStyle, TimestampStyle,
    WatermarkEngine, WatermarkPosition, WatermarkSpec, ImageWatermarkStyle,
};
use rstest::rstest;

fn engine() -> WatermarkEngine {
    WatermarkEngine::new(&EngineConfig::default())
}

fn offline_engine() -> WatermarkEngine {
    WatermarkEngine::new(&EngineConfig {
        system_fonts: false,
        ..EngineConfig::default()
    })
}

fn gray(width: u32, height: u32, value: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([value, value, value])))
}

fn text(text: &str, size: u32, alpha: f32) -> TextStyle {
    TextStyle {
        size: Some(size),
        alpha,
        ..TextStyle::new(text)
    }
}

fn bbox_center(bbox: &PixelBBox) -> (f64, f64) {
    (
        bbox.left as f64 + bbox.width as f64 / 2.0,
        bbox.top as f64 + bbox.height as f64 / 2.0,
    )
}

#[test]
fn test_two_line_text_at_bottom_right() {
    // 1000x800, "A\nB", size 40, bottom-right, margin 20: the box ends near
    // (980, 780), short of it only by side bearing and descent
    let base = gray(1000, 800, 60);
    let spec = WatermarkSpec::Text(text("A\nB", 40, 1.0));
    let position = PositionSpec::anchored(WatermarkPosition::BottomRight, 20);

    let (result, bbox) = engine().render_with_bbox(&base, &spec, &position);
    let bbox = bbox.expect("text must be visible");

    assert!(bbox.right() <= 982, "right edge {}", bbox.right());
    assert!(bbox.right() >= 980 - 20, "right edge {}", bbox.right());
    assert!(bbox.bottom() <= 782, "bottom edge {}", bbox.bottom());
    assert!(bbox.bottom() >= 780 - 20, "bottom edge {}", bbox.bottom());
    assert_eq!(result.image.dimensions(), (1000, 800));
}

#[test]
fn test_missing_asset_is_pixel_identical() {
    let base = DynamicImage::ImageRgba8(RgbaImage::from_fn(120, 80, |x, y| {
        Rgba([x as u8, y as u8, 7, 200])
    }));
    let spec = WatermarkSpec::Image(ImageWatermarkStyle::new("/no/such/logo.png"));

    let result = engine().render(&base, &spec, &PositionSpec::default());
    assert_eq!(result.image, base);
    assert_eq!(result.bbox, None);
}

#[test]
fn test_opaque_output_blends_half_alpha_text() {
    let base = gray(400, 200, 100);
    let spec = WatermarkSpec::Text(text("MMMM", 60, 0.5));
    let position = PositionSpec::anchored(WatermarkPosition::Center, 0);

    let result = offline_engine().render_as(&base, &spec, &position, OutputFormat::Jpeg);
    assert_eq!(result.image.color(), image::ColorType::Rgb8);

    let bbox = result.bbox.expect("text must be visible");
    let rgb = result.image.to_rgb8();
    let mut brightest = 0;
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let inside = bbox.contains(x as i32, y as i32);
        if !inside {
            assert_eq!(*pixel, Rgb([100, 100, 100]), "outside pixel changed at {},{}", x, y);
        }
        brightest = brightest.max(pixel[0]);
    }
    // Fully covered glyph pixels: 100 + (255 - 100) * 127 / 255
    assert!((175..=179).contains(&brightest), "brightest {}", brightest);
}

#[test]
fn test_transparent_source_flattens_on_white() {
    let base = DynamicImage::ImageRgba8(RgbaImage::new(50, 50));
    let spec = WatermarkSpec::Image(ImageWatermarkStyle::new("/no/such/logo.png"));
    let result = engine().render_as(&base, &spec, &PositionSpec::default(), OutputFormat::Bmp);
    assert_eq!(result.image.color(), image::ColorType::Rgb8);
    assert_eq!(*result.image.to_rgb8().get_pixel(25, 25), Rgb([255, 255, 255]));
}

#[rstest]
#[case(OutputFormat::Png, image::ColorType::Rgba8)]
#[case(OutputFormat::Webp, image::ColorType::Rgba8)]
#[case(OutputFormat::Jpeg, image::ColorType::Rgb8)]
#[case(OutputFormat::Bmp, image::ColorType::Rgb8)]
fn test_output_layout_per_format(#[case] format: OutputFormat, #[case] expected: image::ColorType) {
    let base = DynamicImage::ImageRgba8(RgbaImage::from_pixel(80, 80, Rgba([0, 0, 0, 255])));
    let spec = WatermarkSpec::Text(text("OK", 20, 0.8));
    let result = offline_engine().render_as(&base, &spec, &PositionSpec::default(), format);
    assert_eq!(result.image.color(), expected);
}

#[test]
fn test_base_image_is_not_modified() {
    let base = gray(300, 300, 10);
    let snapshot = base.clone();
    let spec = WatermarkSpec::Text(TextStyle {
        stroke: Some(StrokeStyle::default()),
        shadow: Some(ShadowStyle::default()),
        ..text("Keep me", 30, 1.0)
    });
    let _ = engine().render(&base, &spec, &PositionSpec::default());
    assert_eq!(base, snapshot);
}

#[rstest]
#[case("")]
#[case("   ")]
#[case("\n\n")]
fn test_blank_text_draws_nothing(#[case] content: &str) {
    let base = gray(64, 64, 33);
    let spec = WatermarkSpec::Text(text(content, 20, 1.0));
    let result = engine().render(&base, &spec, &PositionSpec::default());
    assert_eq!(result.image, base);
    assert_eq!(result.bbox, None);
}

#[test]
fn test_timestamp_renders_formatted_date() {
    let base = gray(600, 400, 0);
    let captured = chrono::NaiveDate::from_ymd_opt(2024, 3, 15)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap();
    let spec = WatermarkSpec::Timestamp(TimestampStyle {
        captured_at: Some(captured),
        style: text("", 24, 1.0),
        ..TimestampStyle::default()
    });
    let result = engine().render(&base, &spec, &PositionSpec::default());
    assert!(result.bbox.is_some());

    let missing = WatermarkSpec::Timestamp(TimestampStyle::default());
    let result = engine().render(&base, &missing, &PositionSpec::default());
    assert_eq!(result.image, base);
}

#[test]
fn test_quarter_turn_swaps_bbox_sides() {
    let base = gray(800, 800, 0);
    let position = PositionSpec::anchored(WatermarkPosition::Center, 0);
    let upright = WatermarkSpec::Text(text("ROTATE", 40, 1.0));
    let turned = WatermarkSpec::Text(TextStyle {
        rotation: 90.0,
        ..text("ROTATE", 40, 1.0)
    });

    let engine = offline_engine();
    let a = engine.render(&base, &upright, &position).bbox.unwrap();
    let b = engine.render(&base, &turned, &position).bbox.unwrap();
    assert_eq!((a.width, a.height), (b.height, b.width));

    // A full turn is the same render as none
    let full = WatermarkSpec::Text(TextStyle {
        rotation: 360.0,
        ..text("ROTATE", 40, 1.0)
    });
    assert_eq!(
        engine.render(&base, &full, &position).image,
        engine.render(&base, &upright, &position).image
    );
}

#[test]
fn test_arbitrary_rotation_stays_near_center() {
    let base = gray(800, 800, 0);
    let position = PositionSpec::anchored(WatermarkPosition::Center, 0);
    let engine = offline_engine();

    let upright = engine
        .render(&base, &WatermarkSpec::Text(text("HHHH", 40, 1.0)), &position)
        .bbox
        .unwrap();
    let tilted = engine
        .render(
            &base,
            &WatermarkSpec::Text(TextStyle {
                rotation: -35.0,
                ..text("HHHH", 40, 1.0)
            }),
            &position,
        )
        .bbox
        .unwrap();

    let (ux, uy) = bbox_center(&upright);
    let (tx, ty) = bbox_center(&tilted);
    assert!((ux - tx).abs() <= 6.0 && (uy - ty).abs() <= 6.0);
    assert!(tilted.height > upright.height);
}

#[test]
fn test_concurrent_renders_share_one_engine() {
    let engine = engine();
    let base = gray(320, 240, 50);
    let spec = WatermarkSpec::Text(TextStyle {
        bold: true,
        italic: true,
        ..text("Shared", 28, 0.9)
    });
    let position = PositionSpec::default();
    let expected = engine.render(&base, &spec, &position).image;

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| engine.render(&base, &spec, &position).image))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
