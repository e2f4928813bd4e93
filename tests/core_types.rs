use patchsearch::lowlevel::{axis_bounds, temporal_range, AxisRange, TemporalRange, WindowBounds};
use patchsearch::video::flow::expand_flow_pair;
use patchsearch::{OwnedFlow, OwnedVideo, PatchSearchError, PixelCoord, VideoShape, VideoView};

#[test]
fn shape_rejects_invalid_dimensions() {
    let err = VideoShape::new(0, 1, 4, 4).err().unwrap();
    assert_eq!(
        err,
        PatchSearchError::InvalidDimensions {
            frames: 0,
            channels: 1,
            height: 4,
            width: 4,
        }
    );
    assert!(VideoShape::new(2, 3, 0, 4).is_err());
}

#[test]
fn view_rejects_small_buffer() {
    let data = [0.0f32; 20];
    let err = VideoView::from_slice(&data, 2, 1, 3, 4).err().unwrap();
    assert_eq!(err, PatchSearchError::BufferTooSmall { needed: 24, got: 20 });
}

#[test]
fn linear_index_round_trips_and_anchors_use_channel_zero() {
    let shape = VideoShape::new(5, 3, 7, 9).unwrap();
    assert_eq!(shape.frame_len(), 3 * 7 * 9);
    let coord = PixelCoord {
        t: 4,
        c: 2,
        row: 6,
        col: 1,
    };
    let idx = shape.to_linear(coord.t, coord.c, coord.row, coord.col);
    assert_eq!(idx, 4 * 189 + 2 * 63 + 6 * 9 + 1);
    assert_eq!(shape.from_linear(idx), coord);

    let anchor = shape.anchor_index(coord.row, coord.col, coord.t);
    assert_eq!(shape.from_linear(anchor), PixelCoord { c: 0, ..coord });
}

#[test]
fn owned_video_requires_exact_length() {
    let shape = VideoShape::new(1, 1, 2, 2).unwrap();
    assert!(OwnedVideo::new(vec![0.0; 4], shape).is_ok());
    assert_eq!(
        OwnedVideo::new(vec![0.0; 5], shape).err(),
        Some(PatchSearchError::BufferTooSmall { needed: 4, got: 5 })
    );
}

#[test]
fn windows_translate_instead_of_shrinking() {
    // near the top-left border the window is pushed inside
    assert_eq!(axis_bounds(0, 16, 5, 3).unwrap(), AxisRange { start: 0, end: 5 });
    // a center past the last anchor is pulled back
    assert_eq!(axis_bounds(15, 16, 5, 3).unwrap(), AxisRange { start: 9, end: 14 });
    // interior windows are centered
    assert_eq!(axis_bounds(8, 16, 5, 3).unwrap(), AxisRange { start: 6, end: 11 });
    // windows wider than the axis cover every anchor
    assert_eq!(axis_bounds(3, 6, 11, 3).unwrap(), AxisRange { start: 0, end: 4 });
}

#[test]
fn windows_never_leave_the_anchor_range() {
    for dim in 3..20 {
        for ws in [1, 2, 5, 8, 27] {
            for center in 0..dim {
                let range = axis_bounds(center, dim, ws, 3).unwrap();
                assert!(range.start < range.end);
                assert!(range.end <= dim - 3 + 1);
                assert!(range.len() <= ws.max(1));
            }
        }
    }
}

#[test]
fn degenerate_axis_is_rejected() {
    assert_eq!(
        axis_bounds(0, 2, 5, 3).err(),
        Some(PatchSearchError::DegenerateWindow { dim: 2, patch: 3 })
    );
    assert!(WindowBounds::build(0, (0, 0), 8, 2, 5, 3).is_err());
}

#[test]
fn temporal_range_balances_spans() {
    assert_eq!(
        temporal_range(0, 10, 3, 3, 2).unwrap(),
        TemporalRange {
            reference: 0,
            start: 0,
            end: 6
        }
    );
    assert_eq!(
        temporal_range(8, 10, 3, 3, 2).unwrap(),
        TemporalRange {
            reference: 8,
            start: 2,
            end: 8
        }
    );
    assert_eq!(temporal_range(5, 10, 3, 3, 2).unwrap().len(), 7);
    assert!(temporal_range(9, 10, 3, 3, 2).is_err());
}

#[test]
fn flow_pairs_expand_to_one_field_per_frame() {
    let fwd = OwnedFlow::uniform(3, 4, 4, 1.0, 0.0).unwrap();
    let bwd = OwnedFlow::uniform(3, 4, 4, -1.0, 0.0).unwrap();
    let (fwd, bwd) = expand_flow_pair(fwd, bwd, 4).unwrap();
    assert_eq!(fwd.frames(), 4);
    assert_eq!(bwd.frames(), 4);
    assert_eq!(fwd.view().displacement(3, 2, 2), (1.0, 0.0));
    assert_eq!(bwd.view().displacement(0, 2, 2), (-1.0, 0.0));
}
