use patchsearch::{
    search_reference, FlowFields, OwnedFlow, OwnedVideo, SearchConfig, Searcher, VideoShape,
    VideoView,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_video(shape: VideoShape, seed: u64) -> OwnedVideo {
    let mut rng = StdRng::seed_from_u64(seed);
    OwnedVideo::from_fn(shape, |_, _, _, _| rng.random_range(0.0f32..255.0))
}

/// Same accumulation order as the library kernels, single channel.
fn brute_distance(
    view: VideoView<'_>,
    a: (usize, usize, usize),
    b: (usize, usize, usize),
    ps: usize,
) -> f32 {
    let mut delta = 0.0f32;
    for pt in 0..2 {
        for pi in 0..ps {
            for pj in 0..ps {
                let x = view.get(a.0 + pt, 0, a.1 + pi, a.2 + pj).unwrap();
                let y = view.get(b.0 + pt, 0, b.1 + pi, b.2 + pj).unwrap();
                let diff = x / 255.0 - y / 255.0;
                delta += diff * diff;
            }
        }
    }
    delta / (ps * ps * 2) as f32
}

#[test]
fn search_matches_exhaustive_scan_when_windows_cover_the_volume() {
    let shape = VideoShape::new(4, 1, 16, 16).unwrap();
    let video = random_video(shape, 11);
    let view = video.view();
    let ps = 3;
    let cfg = SearchConfig {
        patch_size: ps,
        patch_frames: 2,
        num_similar: 10,
        window_size: 31,
        frames_forward: 3,
        frames_backward: 3,
        ..SearchConfig::default()
    };
    let searcher = Searcher::new(view, None, cfg).unwrap();

    for &(t, row, col) in &[(0, 0, 0), (1, 7, 9), (2, 13, 13), (2, 0, 12)] {
        let mut all = Vec::new();
        for ct in 0..=2 {
            for cr in 0..=13 {
                for cc in 0..=13 {
                    let d = brute_distance(view, (t, row, col), (ct, cr, cc), ps);
                    all.push((d, shape.anchor_index(cr, cc, ct)));
                }
            }
        }
        all.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let set = searcher.search(shape.anchor_index(row, col, t)).unwrap();
        assert_eq!(set.len(), 10);
        assert_eq!(set.best().unwrap().index, all[0].1);
        assert_eq!(set.best().unwrap().distance, 0.0);
        let expected: Vec<usize> = all.iter().take(10).map(|&(_, idx)| idx).collect();
        assert_eq!(set.indices().collect::<Vec<_>>(), expected);
        for (got, want) in set.distances().zip(all.iter().map(|&(d, _)| d)) {
            assert!((got - want).abs() <= 1e-7, "distance {got} vs {want}");
        }
    }
}

#[test]
fn small_video_scenario_returns_self_first() {
    let shape = VideoShape::new(3, 1, 8, 8).unwrap();
    let video = random_video(shape, 5);
    let cfg = SearchConfig {
        patch_size: 3,
        patch_frames: 2,
        num_similar: 4,
        ..SearchConfig::default()
    };
    let zeros = OwnedFlow::zeros(3, 8, 8).unwrap();
    let flows = FlowFields::new(zeros.view(), zeros.view());
    let reference = shape.anchor_index(4, 4, 1);
    let set = search_reference(video.view(), Some(&flows), reference, &cfg).unwrap();

    assert_eq!(set.len(), 4);
    assert!(!set.is_short());
    let best = set.best().unwrap();
    assert_eq!(best.index, reference);
    assert_eq!(best.distance, 0.0);
    let d: Vec<f32> = set.distances().collect();
    assert!(d.iter().all(|&v| v >= 0.0 && v.is_finite()));
    assert!(d.windows(2).all(|w| w[0] <= w[1]));

    // zero flow and no flow are the same search
    let without = search_reference(video.view(), None, reference, &cfg).unwrap();
    assert_eq!(set, without);
}

#[test]
fn returned_indices_anchor_patches_inside_the_volume() {
    let shape = VideoShape::new(5, 2, 13, 11).unwrap();
    let video = random_video(shape, 99);
    let cfg = SearchConfig {
        patch_size: 4,
        patch_frames: 2,
        num_similar: 40,
        window_size: 9,
        frames_forward: 2,
        frames_backward: 2,
        step1: false,
        ..SearchConfig::default()
    };
    let searcher = Searcher::new(video.view(), None, cfg).unwrap();
    for &(t, row, col) in &[(0, 0, 0), (3, 9, 7), (1, 4, 0), (2, 9, 2)] {
        let set = searcher.search(shape.anchor_index(row, col, t)).unwrap();
        for idx in set.indices() {
            let anchor = shape.from_linear(idx);
            assert_eq!(anchor.c, 0);
            assert!(anchor.t + 2 <= shape.frames());
            assert!(anchor.row + 4 <= shape.height());
            assert!(anchor.col + 4 <= shape.width());
        }
    }
}

/// Video translating by `(dy, dx)` pixels per frame over a random texture.
fn moving_video(shape: VideoShape, dy: usize, dx: usize, seed: u64) -> OwnedVideo {
    let margin_y = dy * shape.frames();
    let margin_x = dx * shape.frames();
    let tex_w = shape.width() + margin_x;
    let tex_h = shape.height() + margin_y;
    let mut rng = StdRng::seed_from_u64(seed);
    let texture: Vec<f32> = (0..tex_w * tex_h)
        .map(|_| rng.random_range(0.0f32..255.0))
        .collect();
    OwnedVideo::from_fn(shape, |t, _, row, col| {
        let y = row + margin_y - dy * t;
        let x = col + margin_x - dx * t;
        texture[y * tex_w + x]
    })
}

#[test]
fn flow_steers_windows_onto_moving_content() {
    let shape = VideoShape::new(4, 1, 24, 24).unwrap();
    let video = moving_video(shape, 2, 3, 17);
    let fwd = OwnedFlow::uniform(4, 24, 24, 3.0, 2.0).unwrap();
    let bwd = OwnedFlow::uniform(4, 24, 24, -3.0, -2.0).unwrap();
    let flows = FlowFields::new(fwd.view(), bwd.view());
    let cfg = SearchConfig {
        patch_size: 3,
        patch_frames: 2,
        num_similar: 3,
        window_size: 3,
        frames_forward: 1,
        frames_backward: 1,
        ..SearchConfig::default()
    };
    let reference = shape.anchor_index(8, 8, 1);

    let tracked = search_reference(video.view(), Some(&flows), reference, &cfg).unwrap();
    assert!(tracked.distances().all(|d| d == 0.0));
    assert_eq!(
        tracked.indices().collect::<Vec<_>>(),
        vec![
            shape.anchor_index(6, 5, 0),
            reference,
            shape.anchor_index(10, 11, 2)
        ]
    );

    let static_windows = search_reference(video.view(), None, reference, &cfg).unwrap();
    assert_eq!(static_windows.best().unwrap().index, reference);
    assert!(static_windows.as_slice()[1].distance > 0.0);
}
