// Image watermark tests
//
// Scale modes, flips and rotation go through the full render so the
// reported bbox is what a caller would see.

use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use photomark::watermark::{
    ImageWatermarkStyle, PixelBBox, PositionSpec, ScaleMode, WatermarkEngine, WatermarkPosition,
    WatermarkSpec,
};
use rstest::rstest;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// 200x100 opaque logo: red left half, blue right half
fn write_logo(dir: &Path) -> PathBuf {
    let path = dir.join("logo.png");
    RgbaImage::from_fn(200, 100, |x, _| {
        if x < 100 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 255])
        }
    })
    .save(&path)
    .unwrap();
    path
}

fn render(base: &DynamicImage, style: ImageWatermarkStyle) -> (DynamicImage, PixelBBox) {
    let engine = WatermarkEngine::default();
    let position = PositionSpec::anchored(WatermarkPosition::TopLeft, 0);
    let result = engine.render(base, &WatermarkSpec::Image(style), &position);
    let bbox = result.bbox.expect("logo should be visible");
    (result.image, bbox)
}

fn black(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
}

#[rstest]
#[case(ScaleMode::Percentage { percent: 50.0 }, (100, 50))]
#[case(ScaleMode::Percentage { percent: 1.0 }, (20, 20))]
#[case(ScaleMode::PixelExact { width: 60, height: 60, keep_aspect_ratio: true }, (60, 30))]
#[case(ScaleMode::PixelExact { width: 60, height: 60, keep_aspect_ratio: false }, (60, 60))]
#[case(ScaleMode::AdaptiveToTarget, (150, 75))]
fn test_scale_modes(#[case] scale: ScaleMode, #[case] expected: (u32, u32)) {
    let dir = TempDir::new().unwrap();
    let logo = write_logo(dir.path());
    let style = ImageWatermarkStyle {
        scale,
        alpha: 1.0,
        ..ImageWatermarkStyle::new(logo)
    };

    let (_, bbox) = render(&black(800, 600), style);
    assert_eq!((bbox.width, bbox.height), expected);
    assert_eq!((bbox.left, bbox.top), (0, 0));
}

#[rstest]
#[case((1000, 10), (800, 600), (150, 20))]
#[case((10, 1000), (800, 600), (20, 150))]
#[case((200, 100), (600, 900), (150, 75))]
fn test_adaptive_scale_extreme_ratios(
    #[case] logo: (u32, u32),
    #[case] target: (u32, u32),
    #[case] expected: (u32, u32),
) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("strip.png");
    RgbaImage::from_pixel(logo.0, logo.1, Rgba([255, 255, 255, 255]))
        .save(&path)
        .unwrap();
    let style = ImageWatermarkStyle {
        scale: ScaleMode::AdaptiveToTarget,
        alpha: 1.0,
        ..ImageWatermarkStyle::new(path)
    };

    let (_, bbox) = render(&black(target.0, target.1), style);
    assert_eq!((bbox.width, bbox.height), expected);
    // The longer side stays within a quarter of the shorter target side
    assert!(bbox.width.max(bbox.height) <= target.0.min(target.1) / 4);
}

#[test]
fn test_horizontal_flip_swaps_halves() {
    let dir = TempDir::new().unwrap();
    let logo = write_logo(dir.path());
    let style = ImageWatermarkStyle {
        scale: ScaleMode::Percentage { percent: 100.0 },
        alpha: 1.0,
        flip_horizontal: true,
        ..ImageWatermarkStyle::new(logo)
    };

    let (image, _) = render(&black(400, 300), style);
    let rgb = image.to_rgb8();
    assert_eq!(*rgb.get_pixel(10, 50), Rgb([0, 0, 255]));
    assert_eq!(*rgb.get_pixel(190, 50), Rgb([255, 0, 0]));
}

#[test]
fn test_clockwise_quarter_turn() {
    let dir = TempDir::new().unwrap();
    let logo = write_logo(dir.path());
    let style = ImageWatermarkStyle {
        scale: ScaleMode::Percentage { percent: 100.0 },
        alpha: 1.0,
        rotation: 90.0,
        ..ImageWatermarkStyle::new(logo)
    };

    let (image, bbox) = render(&black(400, 300), style);
    assert_eq!((bbox.width, bbox.height), (100, 200));

    // The left (red) half ends up on top after a clockwise turn
    let rgb = image.to_rgb8();
    assert_eq!(*rgb.get_pixel(50, 20), Rgb([255, 0, 0]));
    assert_eq!(*rgb.get_pixel(50, 180), Rgb([0, 0, 255]));
}

#[test]
fn test_bottom_right_uses_rotated_size() {
    let dir = TempDir::new().unwrap();
    let logo = write_logo(dir.path());
    let style = ImageWatermarkStyle {
        scale: ScaleMode::Percentage { percent: 100.0 },
        alpha: 1.0,
        rotation: -90.0,
        ..ImageWatermarkStyle::new(logo)
    };

    let engine = WatermarkEngine::default();
    let position = PositionSpec::anchored(WatermarkPosition::BottomRight, 10);
    let result = engine.render(&black(400, 300), &WatermarkSpec::Image(style), &position);
    let bbox = result.bbox.unwrap();
    assert_eq!(
        bbox,
        PixelBBox {
            left: 290,
            top: 90,
            width: 100,
            height: 200
        }
    );
}

#[test]
fn test_alpha_fades_logo() {
    let dir = TempDir::new().unwrap();
    let logo = write_logo(dir.path());
    let style = ImageWatermarkStyle {
        scale: ScaleMode::Percentage { percent: 100.0 },
        alpha: 0.5,
        ..ImageWatermarkStyle::new(logo)
    };

    let (image, _) = render(&black(400, 300), style);
    let red = image.to_rgb8().get_pixel(50, 50)[0];
    assert!((126..=129).contains(&red), "red {}", red);
}

#[test]
fn test_undecodable_asset_leaves_image_unchanged() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"not a png").unwrap();

    let base = black(100, 100);
    let engine = WatermarkEngine::default();
    let result = engine.render(
        &base,
        &WatermarkSpec::Image(ImageWatermarkStyle::new(path)),
        &PositionSpec::default(),
    );
    assert_eq!(result.image, base);
    assert!(result.bbox.is_none());
}
