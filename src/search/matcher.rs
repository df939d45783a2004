//! Multi-model matching over one shared gradient field.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::edges::{edge_pixels, hysteresis_edges, EdgePixel, EdgeThresholds};
use crate::gradient::GradientField;
use crate::image::pyramid::ImagePyramid;
use crate::image::{ImageView, PixelBuffer, Rect};
use crate::kernel::{Backend, Kernel};
use crate::model::{train_model, Model};
use crate::overlay::Overlay;
use crate::search::hough::{vote_model, VoteInput};
use crate::search::refine::refine_pose;
use crate::search::{MatchParams, MatchResult, MatchedModel, ModelScore, Pose};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{ShapeMatchError, ShapeMatchResult};

/// Shape matching tool owning a set of trained models.
///
/// Models are matched in registration order and the first one wins ties.
/// Each model's pose arena is used by one call at a time, enforced by
/// [`ShapeMatcher::run`] taking `&mut self`.
pub struct ShapeMatcher {
    models: Vec<Model>,
    params: MatchParams,
    backend: Backend,
}

impl ShapeMatcher {
    /// Creates an empty matcher using the best available backend.
    pub fn new(params: MatchParams) -> ShapeMatchResult<Self> {
        params.validate()?;
        Ok(Self {
            models: Vec::new(),
            params,
            backend: Backend::detect(),
        })
    }

    /// Forces a backend; unavailable backends fall back to the portable one.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend.resolve();
        self
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn params(&self) -> &MatchParams {
        &self.params
    }

    /// Replaces the parameters and resizes every model's pose arena.
    pub fn set_params(&mut self, params: MatchParams) -> ShapeMatchResult<()> {
        params.validate()?;
        let poses = params.arena_poses();
        for model in &mut self.models {
            let points = model.points().len();
            model.arena_mut().ensure_capacity(poses, points);
        }
        self.params = params;
        Ok(())
    }

    /// Trains a model from a template and registers it under `name`.
    ///
    /// Retraining an existing name replaces that model in place and keeps
    /// its registration slot.
    pub fn train(
        &mut self,
        name: &str,
        template: PixelBuffer<'_>,
        origin: (usize, usize),
    ) -> ShapeMatchResult<&Model> {
        let model = train_model(name, template, origin, &self.params, self.backend.kernel())?;
        trace_event!(
            "model_trained",
            model = name,
            points = model.points().len()
        );
        let index = self.insert_model(model);
        Ok(&self.models[index])
    }

    /// Registers a model (e.g. one rebuilt from `ModelParts`) and returns
    /// its index. A model with the same name is replaced.
    pub fn insert_model(&mut self, mut model: Model) -> usize {
        let points = model.points().len();
        model
            .arena_mut()
            .ensure_capacity(self.params.arena_poses(), points);
        match self.models.iter().position(|m| m.name() == model.name()) {
            Some(index) => {
                self.models[index] = model;
                index
            }
            None => {
                self.models.push(model);
                self.models.len() - 1
            }
        }
    }

    /// Removes a model by name, releasing its buffers.
    pub fn remove(&mut self, name: &str) -> Option<Model> {
        let index = self.models.iter().position(|m| m.name() == name)?;
        let mut model = self.models.remove(index);
        model.arena_mut().release();
        Some(model)
    }

    /// Enables or disables a model; returns `false` if no model has `name`.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.models.iter_mut().find(|m| m.name() == name) {
            Some(model) => {
                model.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name() == name)
    }

    /// Matches every enabled model against `image`, optionally restricted to
    /// `region`.
    ///
    /// Never panics: errors and internal faults come back as a failed
    /// [`MatchResult`].
    pub fn run(&mut self, image: PixelBuffer<'_>, region: Option<Rect>) -> MatchResult {
        let search = region.unwrap_or(Rect::new(0, 0, image.width(), image.height()));
        let outcome = catch_unwind(AssertUnwindSafe(|| self.run_inner(image, search)));
        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                trace_warn!("match_failed", reason = err.to_string().as_str());
                MatchResult::failure(err, Overlay::search_only(search))
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                trace_warn!("match_fault", reason = reason.as_str());
                MatchResult::failure(
                    ShapeMatchError::Internal(reason),
                    Overlay::search_only(search),
                )
            }
        }
    }

    fn run_inner(&mut self, image: PixelBuffer<'_>, search: Rect) -> ShapeMatchResult<MatchResult> {
        let _span = trace_span!(
            "match",
            width = image.width(),
            height = image.height(),
            models = self.models.len()
        )
        .entered();

        let view = image.as_gray()?.roi(search)?;
        if !self.models.iter().any(|m| m.is_enabled() && m.is_trained()) {
            return Err(ShapeMatchError::NoTrainedModel);
        }

        let kernel = self.backend.kernel();
        let params = &self.params;
        let field = GradientField::build(view, kernel)?;
        let coarse = VotingLevel::build(view, &field, params.pyramid_levels, kernel)?;
        let mut edge_cache: Vec<(EdgeThresholds, Vec<EdgePixel>)> = Vec::new();

        let origin = (search.x as f32, search.y as f32);
        let mut scores = Vec::new();
        let mut best: Option<(usize, Pose)> = None;
        for (index, model) in self.models.iter_mut().enumerate() {
            if !model.is_enabled() || !model.is_trained() {
                continue;
            }
            let thresholds = model.thresholds();
            let cached = edge_cache.iter().position(|(t, _)| *t == thresholds);
            let slot = match cached {
                Some(slot) => slot,
                None => {
                    let vote_field = coarse.field(&field);
                    let mask = hysteresis_edges(vote_field, thresholds);
                    edge_cache.push((thresholds, edge_pixels(vote_field, &mask)));
                    edge_cache.len() - 1
                }
            };
            let vote_field = coarse.field(&field);
            let input = VoteInput {
                edges: &edge_cache[slot].1,
                width: vote_field.width(),
                height: vote_field.height(),
                factor: coarse.factor,
            };

            let pose = match vote_model(model, &input, params, kernel) {
                Some(peak) => refine_pose(model, &field, &peak, coarse.factor, params, kernel)?,
                None => None,
            };
            let pose = pose.map(|p| Pose {
                x: p.x + origin.0,
                y: p.y + origin.1,
                ..p
            });
            trace_event!(
                "model_score",
                index = index,
                score = pose.map_or(0.0, |p| p.score)
            );
            if let Some(p) = pose {
                if best.is_none_or(|(_, b)| p.score > b.score) {
                    best = Some((index, p));
                }
            }
            scores.push(ModelScore {
                index,
                name: model.name().to_string(),
                pose,
            });
        }

        let Some((index, pose)) = best else {
            return Ok(MatchResult {
                model_scores: scores,
                ..MatchResult::failure(
                    ShapeMatchError::NoMatchFound { best_score: 0.0 },
                    Overlay::search_only(search),
                )
            });
        };

        if pose.score < params.min_score {
            trace_warn!(
                "no_match",
                closest_score = pose.score,
                min_score = params.min_score
            );
            return Ok(MatchResult {
                pose,
                model_scores: scores,
                ..MatchResult::failure(
                    ShapeMatchError::NoMatchFound {
                        best_score: pose.score,
                    },
                    Overlay::search_only(search),
                )
            });
        }

        let model = &self.models[index];
        Ok(MatchResult {
            success: true,
            model: Some(MatchedModel {
                index,
                name: model.name().to_string(),
            }),
            pose,
            overlay: Overlay::for_pose(model, &pose, search),
            error: None,
            model_scores: scores,
        })
    }
}

/// Gradient field used for voting, downsampled when pyramid levels > 1.
struct VotingLevel {
    field: Option<GradientField>,
    factor: usize,
}

impl VotingLevel {
    fn build(
        view: ImageView<'_, u8>,
        full: &GradientField,
        levels: usize,
        kernel: &dyn Kernel,
    ) -> ShapeMatchResult<Self> {
        if levels <= 1 {
            return Ok(Self {
                field: None,
                factor: 1,
            });
        }
        let pyramid = ImagePyramid::build_u8(view, levels)?;
        let built = pyramid.len();
        let Some(coarsest) = pyramid.coarsest().filter(|_| built > 1) else {
            return Ok(Self {
                field: None,
                factor: 1,
            });
        };
        let field = GradientField::build(coarsest, kernel)?;
        trace_event!(
            "voting_level",
            levels = built,
            width = field.width(),
            height = field.height(),
            full_width = full.width()
        );
        Ok(Self {
            field: Some(field),
            factor: 1 << (built - 1),
        })
    }

    fn field<'a>(&'a self, full: &'a GradientField) -> &'a GradientField {
        self.field.as_ref().unwrap_or(full)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
