mod common;

use common::{plate, template, Shape};
use shapematch::lowlevel::{hysteresis_edges, train_model, GradientField, ScalarKernel};
use shapematch::{MatchParams, PixelBuffer, ShapeMatchError, ShapeMatcher};

#[test]
fn point_count_respects_the_cap() {
    let size = 160;
    let tpl = template(size, size, &plate(60.0));
    for cap in [50usize, 120, 300] {
        let params = MatchParams {
            max_points: cap,
            ..MatchParams::default()
        };
        let model = train_model(
            "plate",
            PixelBuffer::gray(&tpl, size, size).unwrap(),
            (0, 0),
            &params,
            &ScalarKernel,
        )
        .unwrap();
        assert_eq!(model.points().len(), cap);
        assert_eq!(model.direction_index().len(), cap);
    }
}

#[test]
fn no_sampling_below_the_cap() {
    let size = 80;
    let tpl = template(size, size, &plate(25.0));
    let params = MatchParams {
        max_points: 5000,
        ..MatchParams::default()
    };
    let view = shapematch::ImageView::from_slice(&tpl, size, size).unwrap();
    let field = GradientField::build(view, &ScalarKernel).unwrap();
    let mask = hysteresis_edges(&field, params.thresholds());
    let raw = mask.iter_set().filter(|&i| field.mag()[i] > 1e-3).count();

    let model = train_model(
        "plate",
        PixelBuffer::gray(&tpl, size, size).unwrap(),
        (0, 0),
        &params,
        &ScalarKernel,
    )
    .unwrap();
    assert!(raw >= 10);
    assert_eq!(model.points().len(), raw);
}

#[test]
fn sampled_points_cover_the_whole_outline() {
    let size = 160;
    let tpl = template(size, size, &plate(60.0));
    let params = MatchParams {
        max_points: 40,
        ..MatchParams::default()
    };
    let model = train_model(
        "plate",
        PixelBuffer::gray(&tpl, size, size).unwrap(),
        (0, 0),
        &params,
        &ScalarKernel,
    )
    .unwrap();
    let quadrants = |sx: f32, sy: f32| {
        model
            .points()
            .iter()
            .filter(|p| p.x * sx > 0.0 && p.y * sy > 0.0)
            .count()
    };
    for (sx, sy) in [(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)] {
        assert!(quadrants(sx, sy) >= 4, "quadrant ({sx}, {sy}) undersampled");
    }
}

#[test]
fn rgb_template_matches_gray_template() {
    let size = 80;
    let gray = template(size, size, &plate(25.0));
    let rgb: Vec<u8> = gray.iter().flat_map(|&v| [v, v, v]).collect();
    let params = MatchParams::default();
    let from_gray = train_model(
        "g",
        PixelBuffer::gray(&gray, size, size).unwrap(),
        (0, 0),
        &params,
        &ScalarKernel,
    )
    .unwrap();
    let from_rgb = train_model(
        "c",
        PixelBuffer::new(&rgb, size, size, 3).unwrap(),
        (0, 0),
        &params,
        &ScalarKernel,
    )
    .unwrap();
    assert_eq!(from_gray.points(), from_rgb.points());
}

#[test]
fn flat_or_faint_templates_are_degenerate() {
    let mut matcher = ShapeMatcher::new(MatchParams::default()).unwrap();
    let flat = vec![90u8; 40 * 40];
    let err = matcher
        .train("flat", PixelBuffer::gray(&flat, 40, 40).unwrap(), (0, 0))
        .unwrap_err();
    assert!(matches!(
        err,
        ShapeMatchError::DegenerateTrainingInput { points: 0, .. }
    ));
    assert!(matcher.models().is_empty());

    // contrast 20 stays under the default high threshold
    let faint: Vec<u8> = template(60, 60, &plate(15.0))
        .iter()
        .map(|&v| if v > 100 { 50 } else { 30 })
        .collect();
    let err = matcher
        .train("faint", PixelBuffer::gray(&faint, 60, 60).unwrap(), (0, 0))
        .unwrap_err();
    assert!(matches!(err, ShapeMatchError::DegenerateTrainingInput { .. }));
}

#[test]
fn auto_tune_rescues_faint_templates() {
    let faint: Vec<u8> = template(60, 60, &plate(15.0))
        .iter()
        .map(|&v| if v > 100 { 50 } else { 30 })
        .collect();
    let params = MatchParams {
        auto_tune: true,
        ..MatchParams::default()
    };
    let mut matcher = ShapeMatcher::new(params).unwrap();
    let model = matcher
        .train("faint", PixelBuffer::gray(&faint, 60, 60).unwrap(), (0, 0))
        .unwrap();
    assert!(model.is_trained());
    let t = model.thresholds();
    assert!(t.high < 150.0 && t.low <= t.high);
}

#[test]
fn trained_center_includes_source_offset() {
    let tpl = template(50, 50, &Shape::SquareOutline {
        outer: 18.0,
        inner: 12.0,
    });
    let mut matcher = ShapeMatcher::new(MatchParams::default()).unwrap();
    let model = matcher
        .train("outline", PixelBuffer::gray(&tpl, 50, 50).unwrap(), (30, 40))
        .unwrap();
    assert_eq!(model.trained_center(), (55.0, 65.0));
    assert_eq!(model.template_size(), (50, 50));
    let (poses, stride) = model.arena().capacity();
    assert_eq!(poses, matcher.params().arena_poses());
    assert_eq!(stride, matcher.models()[0].points().len());
}

#[test]
fn set_params_grows_model_arenas() {
    let tpl = template(50, 50, &plate(15.0));
    let mut matcher = ShapeMatcher::new(MatchParams::default()).unwrap();
    matcher
        .train("plate", PixelBuffer::gray(&tpl, 50, 50).unwrap(), (0, 0))
        .unwrap();
    let before = matcher.models()[0].arena().capacity().0;

    let wider = MatchParams {
        angle_step: 0.5,
        scale_range: 0.4,
        ..MatchParams::default()
    };
    let expected = wider.arena_poses();
    matcher.set_params(wider).unwrap();
    assert!(expected > before);
    assert_eq!(matcher.models()[0].arena().capacity().0, expected);

    let invalid = MatchParams {
        angle_step: 0.0,
        ..MatchParams::default()
    };
    assert!(matcher.set_params(invalid).is_err());
}
