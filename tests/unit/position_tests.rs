// Position resolver tests

use photomark::watermark::{
    calculate_position, is_visible, resolve_position, ImageDimensions, PlacementPosition,
    PositionSpec, WatermarkDimensions, WatermarkPosition,
};
use rstest::rstest;

const FRAME: ImageDimensions = ImageDimensions {
    width: 1920,
    height: 1080,
};
const MARK: WatermarkDimensions = WatermarkDimensions {
    width: 300,
    height: 81,
};

#[rstest]
#[case(WatermarkPosition::TopLeft, 25, 25)]
#[case(WatermarkPosition::TopCenter, 810, 25)]
#[case(WatermarkPosition::TopRight, 1595, 25)]
#[case(WatermarkPosition::CenterLeft, 25, 499)]
#[case(WatermarkPosition::Center, 810, 499)]
#[case(WatermarkPosition::CenterRight, 1595, 499)]
#[case(WatermarkPosition::BottomLeft, 25, 974)]
#[case(WatermarkPosition::BottomCenter, 810, 974)]
#[case(WatermarkPosition::BottomRight, 1595, 974)]
fn test_anchor_formulas(#[case] anchor: WatermarkPosition, #[case] x: i32, #[case] y: i32) {
    // (1080 - 81) / 2 = 499.5 floors to 499
    let pos = calculate_position(anchor, &FRAME, &MARK, 25);
    assert_eq!(pos, PlacementPosition::new(x, y));
    assert!(is_visible(&pos, &FRAME, &MARK));
}

#[rstest]
#[case(0, 0)]
#[case(-400, -90)]
#[case(5000, 5000)]
fn test_override_returned_unmodified(#[case] x: i32, #[case] y: i32) {
    let spec = PositionSpec {
        anchor: WatermarkPosition::Center,
        margin: 99,
        custom: Some((x, y)),
    };
    assert_eq!(
        resolve_position(&spec, &FRAME, &MARK),
        PlacementPosition::new(x, y)
    );
}

#[rstest]
#[case(WatermarkPosition::TopLeft)]
#[case(WatermarkPosition::Center)]
#[case(WatermarkPosition::BottomRight)]
fn test_oversized_watermark_goes_negative(#[case] anchor: WatermarkPosition) {
    let small = ImageDimensions {
        width: 50,
        height: 40,
    };
    let pos = calculate_position(anchor, &small, &MARK, 10);
    let centered_or_far = matches!(
        anchor,
        WatermarkPosition::Center | WatermarkPosition::BottomRight
    );
    if centered_or_far {
        assert!(pos.x < 0 && pos.y < 0, "{:?} -> {:?}", anchor, pos);
    } else {
        assert_eq!(pos, PlacementPosition::new(10, 10));
    }
}

#[test]
fn test_parse_position_names() {
    for name in [
        "top-left",
        "top-center",
        "top-right",
        "center-left",
        "center",
        "center-right",
        "bottom-left",
        "bottom-center",
        "bottom-right",
    ] {
        let parsed: WatermarkPosition = name.parse().unwrap();
        assert_eq!(parsed.as_str(), name);
    }
}
