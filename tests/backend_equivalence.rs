#![cfg(feature = "simd")]

mod common;

use common::{angle_diff_deg, plate, render, template, Placement};
use shapematch::lowlevel::{
    early_exit_checkpoint, GradientField, PoseOffsets, ScalarKernel, ScoreParams, SimdKernel,
};
use shapematch::{Backend, ImageView, Kernel, MatchParams, PixelBuffer, ShapeMatcher};

#[test]
fn gradient_fields_agree() {
    let scene = render(97, 61, &[(&plate(18.0), Placement::at(45.0, 30.0).rotated(33.0))]);
    let view = ImageView::from_slice(&scene, 97, 61).unwrap();
    let scalar = GradientField::build(view, &ScalarKernel).unwrap();
    let simd = GradientField::build(view, &SimdKernel).unwrap();
    for (a, b) in scalar.mag().iter().zip(simd.mag()) {
        assert!((a - b).abs() < 1e-2, "{a} vs {b}");
    }
    for (a, b) in scalar.gx().iter().zip(simd.gx()) {
        assert!((a - b).abs() < 1e-2);
    }
}

#[test]
fn matches_agree_across_backends() {
    let shape = plate(22.0);
    let tpl = template(72, 72, &shape);
    let scene = render(190, 170, &[(&shape, Placement::at(92.0, 80.0).rotated(57.0))]);

    let mut results = Vec::new();
    for backend in [Backend::Portable, Backend::Vectorized] {
        let mut matcher = ShapeMatcher::new(MatchParams::default())
            .unwrap()
            .with_backend(backend);
        matcher
            .train("plate", PixelBuffer::gray(&tpl, 72, 72).unwrap(), (0, 0))
            .unwrap();
        let result = matcher.run(PixelBuffer::gray(&scene, 190, 170).unwrap(), None);
        assert!(result.success, "{backend:?}: {:?}", result.error);
        results.push(result.pose);
    }
    let (a, b) = (results[0], results[1]);
    assert!((a.x - b.x).abs() < 0.05);
    assert!((a.y - b.y).abs() < 0.05);
    assert!(angle_diff_deg(a.angle_deg, b.angle_deg) < 0.05);
    assert!((a.score - b.score).abs() < 1e-3);
}

#[test]
fn scores_agree_on_arbitrary_offsets() {
    let scene = render(64, 64, &[(&plate(14.0), Placement::at(32.0, 32.0))]);
    let view = ImageView::from_slice(&scene, 64, 64).unwrap();
    let field = GradientField::build(view, &ScalarKernel).unwrap();

    let n = 37;
    let offsets: Vec<isize> = (0..n as isize).map(|i| (i * 61) % 900 - 450).collect();
    let dx: Vec<f32> = (0..n).map(|i| (i as f32 * 0.37).cos()).collect();
    let dy: Vec<f32> = (0..n).map(|i| (i as f32 * 0.37).sin()).collect();
    let pose = PoseOffsets {
        offsets: &offsets,
        dir_x: &dx,
        dir_y: &dy,
    };
    let params = ScoreParams {
        min_score: 0.0,
        greediness: 0.0,
        contrast_invariant: true,
        early_exit: true,
    };
    assert!(early_exit_checkpoint(n, &params) <= n);
    let center = 32 * 64 + 32;
    let a = ScalarKernel.score_pose(&field, center, pose, params);
    let b = SimdKernel.score_pose(&field, center, pose, params);
    assert!((a - b).abs() < 1e-4, "{a} vs {b}");
}
