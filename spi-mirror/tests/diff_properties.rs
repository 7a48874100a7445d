//! Property tests for the diff engine and pixel conversion

use proptest::prelude::*;
use spi_mirror::{convert, DirtyRect, FrameDiff, Pixel, SourceFrame};

const SRC_W: u32 = 24;
const SRC_H: u32 = 16;
const DST_W: u16 = 12;
const DST_H: u16 = 8;

fn frame_strategy() -> impl Strategy<Value = Vec<u8>> {
    // Small palette so consecutive frames share most pixels
    prop::collection::vec(0u8..4, (SRC_W * SRC_H) as usize).prop_map(|shades| {
        shades
            .into_iter()
            .flat_map(|s| {
                let c = s * 0x55;
                [c, c, c, 0]
            })
            .collect()
    })
}

fn expected(data: &[u8]) -> Vec<Pixel> {
    let frame = SourceFrame::packed(data, SRC_W, SRC_H).unwrap();
    let mut out = Vec::new();
    for y in 0..DST_H {
        for x in 0..DST_W {
            out.push(convert(&frame, DST_W, DST_H, x, y));
        }
    }
    out
}

proptest! {
    #[test]
    fn changed_pixels_lie_inside_rect(a in frame_strategy(), b in frame_strategy()) {
        let mut engine = FrameDiff::with_dimensions(DST_W, DST_H);
        engine.diff(&SourceFrame::packed(&a, SRC_W, SRC_H).unwrap());
        let before = engine.previous().clone();

        let rect = engine.diff(&SourceFrame::packed(&b, SRC_W, SRC_H).unwrap());
        let after = expected(&b);

        let mut any_change = false;
        for y in 0..DST_H {
            for x in 0..DST_W {
                let new = after[usize::from(y) * usize::from(DST_W) + usize::from(x)];
                if before.get_pixel(x, y) != Some(new) {
                    any_change = true;
                    prop_assert!(rect.is_some_and(|r| r.contains(x, y)));
                }
            }
        }
        prop_assert_eq!(any_change, rect.is_some());
    }

    #[test]
    fn buffers_match_converted_frame(frames in prop::collection::vec(frame_strategy(), 1..4)) {
        let mut engine = FrameDiff::with_dimensions(DST_W, DST_H);
        for data in &frames {
            engine.diff(&SourceFrame::packed(data, SRC_W, SRC_H).unwrap());
            let want = expected(data);
            prop_assert_eq!(engine.current(), engine.previous());
            prop_assert_eq!(engine.current().as_slice(), want.as_slice());
        }
    }

    #[test]
    fn rect_is_tight(x0 in 0u16..DST_W, y0 in 0u16..DST_H, x1 in 0u16..DST_W, y1 in 0u16..DST_H) {
        // Two white source pixels sampled by destinations (x0, y0) and (x1, y1)
        let mut data = vec![0u8; (SRC_W * SRC_H * 4) as usize];
        for (x, y) in [(x0, y0), (x1, y1)] {
            let off = ((u32::from(y) * 2 * SRC_W + u32::from(x) * 2) * 4) as usize;
            data[off..off + 3].copy_from_slice(&[0xFF, 0xFF, 0xFF]);
        }
        let mut engine = FrameDiff::with_dimensions(DST_W, DST_H);
        let rect = engine.diff(&SourceFrame::packed(&data, SRC_W, SRC_H).unwrap());
        prop_assert_eq!(
            rect,
            Some(DirtyRect {
                x_min: x0.min(x1),
                y_min: y0.min(y1),
                x_max: x0.max(x1),
                y_max: y0.max(y1),
            })
        );
    }
}
