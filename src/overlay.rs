//! Geometry for the host to draw over a match.

use crate::image::Rect;
use crate::model::Model;
use crate::search::Pose;

/// Overlay data reported with every match result.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Overlay {
    /// Oriented template box, clockwise from the top-left; empty on failure.
    pub corners: Vec<(f32, f32)>,
    /// Model edge points mapped through the pose.
    pub edge_points: Vec<(f32, f32)>,
    /// Searched region, clockwise from the top-left.
    pub search_box: [(f32, f32); 4],
}

impl Overlay {
    /// Overlay carrying only the searched region.
    pub fn search_only(search: Rect) -> Self {
        Self {
            corners: Vec::new(),
            edge_points: Vec::new(),
            search_box: search.corners(),
        }
    }

    /// Projects `model` through `pose`.
    pub fn for_pose(model: &Model, pose: &Pose, search: Rect) -> Self {
        let (w, h) = model.template_size();
        let (cx, cy) = model.local_center();
        let left = -cx;
        let top = -cy;
        let right = w as f32 - cx;
        let bottom = h as f32 - cy;
        let corners = [(left, top), (right, top), (right, bottom), (left, bottom)]
            .iter()
            .map(|&(dx, dy)| pose.transform(dx, dy))
            .collect();
        let edge_points = model
            .points()
            .iter()
            .map(|p| pose.transform(p.x, p.y))
            .collect();
        Self {
            corners,
            edge_points,
            search_box: search.corners(),
        }
    }
}
