use inkgrid_core::synth::{render_tag, TagStyle};
use inkgrid_core::{ChannelOrder, PixelBuffer, Rgb};
use inkgrid_grid::{detect_grid, Evidence, GridDetector, GridError, GridParams, StrategyKind};

const CYAN: Rgb = [0, 188, 212];
const BLUE: Rgb = [33, 150, 243];

fn render(pattern: &[u32], size: usize, style: &TagStyle) -> PixelBuffer {
    render_tag(pattern, size, &[CYAN, BLUE], style).expect("render")
}

fn thin_lines() -> TagStyle {
    TagStyle {
        line_px: 1,
        ..TagStyle::default()
    }
}

/// 2×2 blocks of one ink, blocks alternating: neighbouring cells mostly share
/// a color.
fn block_pattern(size: usize) -> Vec<u32> {
    (0..size * size)
        .map(|i| {
            let (r, c) = (i / size, i % size);
            ((r / 2 + c / 2) % 2) as u32
        })
        .collect()
}

fn checkerboard(size: usize) -> Vec<u32> {
    (0..size * size)
        .map(|i| ((i / size + i % size) % 2) as u32)
        .collect()
}

#[test]
fn small_grid_is_sized_from_lines() {
    let style = TagStyle::default();
    let img = render(&checkerboard(3), 3, &style);
    let found = detect_grid(&img, &GridParams::default()).expect("detect");

    assert_eq!(found.size(), 3);
    assert_eq!(found.chosen.strategy, StrategyKind::Lines);
    assert_eq!(found.geometry.cells.len(), 9);
}

#[test]
fn dense_grid_is_sized_from_regions() {
    let style = thin_lines();
    let img = render(&checkerboard(8), 8, &style);
    let found = detect_grid(&img, &GridParams::default()).expect("detect");

    assert_eq!(found.size(), 8);
    assert_eq!(found.chosen.strategy, StrategyKind::ColorRegions);
    // The confident region estimate ends the search.
    assert_eq!(found.estimates.len(), 1);
}

#[test]
fn merged_regions_defer_to_lines() {
    let style = thin_lines();
    let img = render(&block_pattern(8), 8, &style);
    let found = GridDetector::default().detect(&img).expect("detect");

    let region = found
        .estimates
        .iter()
        .find(|e| e.strategy == StrategyKind::ColorRegions)
        .expect("region estimate");
    match region.evidence {
        Evidence::ColorRegions {
            component_count, ..
        } => assert!(component_count < 50, "{component_count}"),
        ref other => panic!("unexpected evidence {other:?}"),
    }
    assert!(region.size < 6);

    assert_eq!(found.size(), 8);
    assert_eq!(found.chosen.strategy, StrategyKind::Lines);
}

#[test]
fn sample_points_fall_inside_their_cells() {
    let style = TagStyle::default();
    let size = 5;
    let pattern = checkerboard(size);
    let img = render(&pattern, size, &style);
    let found = detect_grid(&img, &GridParams::default()).expect("detect");
    assert_eq!(found.size(), size);

    for cell in &found.geometry.cells {
        let (x, y) = (cell.point.x.round() as usize, cell.point.y.round() as usize);
        let expected = [CYAN, BLUE][pattern[cell.row * size + cell.col] as usize];
        assert_eq!(img.rgb(x, y), expected, "cell ({}, {})", cell.row, cell.col);
    }
}

#[test]
fn channel_order_does_not_change_the_result() {
    let rgb = render(&checkerboard(4), 4, &TagStyle::default());
    let bgr = render(
        &checkerboard(4),
        4,
        &TagStyle {
            order: ChannelOrder::Bgr,
            ..TagStyle::default()
        },
    );
    let a = detect_grid(&rgb, &GridParams::default()).expect("rgb");
    let b = detect_grid(&bgr, &GridParams::default()).expect("bgr");
    assert_eq!(a, b);
}

#[test]
fn blank_photo_has_no_tag() {
    let img =
        PixelBuffer::from_fn(300, 200, ChannelOrder::Rgb, |_, _| [235, 235, 235]).expect("img");
    assert_eq!(
        detect_grid(&img, &GridParams::default()),
        Err(GridError::NoOutline)
    );
}

#[test]
fn detection_serializes_for_diagnostics() {
    let img = render(&checkerboard(3), 3, &TagStyle::default());
    let found = detect_grid(&img, &GridParams::default()).expect("detect");
    let json = serde_json::to_value(&found).expect("json");
    assert_eq!(json["geometry"]["size"], 3);
    assert_eq!(json["chosen"]["strategy"], "lines");
}
