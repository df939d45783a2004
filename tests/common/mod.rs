#![allow(dead_code)]

//! Synthetic scenes shared by the integration tests.
//!
//! Shapes are described in model coordinates around their center and
//! rendered with 4x4 supersampling, so rotated and scaled copies stay close
//! to what a camera would see. Pixel `(i, j)` is centered at `(i, j)`.

pub const BACKGROUND: u8 = 30;
pub const FOREGROUND: u8 = 220;

const SUPERSAMPLE: usize = 4;

/// Closed shape tested by point membership.
pub enum Shape {
    /// Simple polygon, vertices in order.
    Polygon(Vec<(f32, f32)>),
    /// Square band between two half-sizes.
    SquareOutline { outer: f32, inner: f32 },
    /// Annulus between two radii.
    Ring { outer: f32, inner: f32 },
}

impl Shape {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        match self {
            Shape::Polygon(vertices) => {
                let mut inside = false;
                let n = vertices.len();
                let mut j = n - 1;
                for i in 0..n {
                    let (xi, yi) = vertices[i];
                    let (xj, yj) = vertices[j];
                    if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                        inside = !inside;
                    }
                    j = i;
                }
                inside
            }
            Shape::SquareOutline { outer, inner } => {
                let m = x.abs().max(y.abs());
                m <= *outer && m > *inner
            }
            Shape::Ring { outer, inner } => {
                let r = (x * x + y * y).sqrt();
                r <= *outer && r > *inner
            }
        }
    }
}

/// Placement of a shape in an image.
#[derive(Clone, Copy, Debug)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub angle_deg: f32,
    pub scale: f32,
}

impl Placement {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            angle_deg: 0.0,
            scale: 1.0,
        }
    }

    pub fn rotated(self, angle_deg: f32) -> Self {
        Self { angle_deg, ..self }
    }

    pub fn scaled(self, scale: f32) -> Self {
        Self { scale, ..self }
    }
}

/// Renders `shapes` onto a blank canvas.
pub fn render(width: usize, height: usize, shapes: &[(&Shape, Placement)]) -> Vec<u8> {
    let mut data = vec![BACKGROUND; width * height];
    for (shape, placement) in shapes {
        draw(&mut data, width, height, shape, *placement, FOREGROUND);
    }
    data
}

/// Blends `shape` into `data` with antialiasing.
pub fn draw(
    data: &mut [u8],
    width: usize,
    height: usize,
    shape: &Shape,
    placement: Placement,
    value: u8,
) {
    let (sin_a, cos_a) = placement.angle_deg.to_radians().sin_cos();
    let inv_scale = 1.0 / placement.scale;
    let step = 1.0 / SUPERSAMPLE as f32;
    let total = (SUPERSAMPLE * SUPERSAMPLE) as f32;
    for j in 0..height {
        for i in 0..width {
            let mut hits = 0usize;
            for sy in 0..SUPERSAMPLE {
                for sx in 0..SUPERSAMPLE {
                    let px = i as f32 - 0.5 + (sx as f32 + 0.5) * step - placement.x;
                    let py = j as f32 - 0.5 + (sy as f32 + 0.5) * step - placement.y;
                    // inverse rotation, then inverse scale
                    let mx = (cos_a * px + sin_a * py) * inv_scale;
                    let my = (-sin_a * px + cos_a * py) * inv_scale;
                    if shape.contains(mx, my) {
                        hits += 1;
                    }
                }
            }
            if hits > 0 {
                let idx = j * width + i;
                let cover = hits as f32 / total;
                let base = f32::from(data[idx]);
                data[idx] = (base + (f32::from(value) - base) * cover).round() as u8;
            }
        }
    }
}

/// Renders a template with the shape at its integer center `(w / 2, h / 2)`.
pub fn template(width: usize, height: usize, shape: &Shape) -> Vec<u8> {
    let cx = (width / 2) as f32;
    let cy = (height / 2) as f32;
    render(width, height, &[(shape, Placement::at(cx, cy))])
}

/// Copies `src` into `dst` with its top-left corner at `(ox, oy)`.
pub fn paste(
    dst: &mut [u8],
    dst_width: usize,
    src: &[u8],
    src_width: usize,
    src_height: usize,
    ox: usize,
    oy: usize,
) {
    for y in 0..src_height {
        let d = (oy + y) * dst_width + ox;
        dst[d..d + src_width].copy_from_slice(&src[y * src_width..(y + 1) * src_width]);
    }
}

/// An asymmetric five-sided plate; no rotation maps it onto itself.
pub fn plate(size: f32) -> Shape {
    let k = size / 20.0;
    Shape::Polygon(
        [(-20.0, -15.0), (22.0, -15.0), (22.0, -2.0), (0.0, 18.0), (-20.0, 18.0)]
            .iter()
            .map(|&(x, y)| (x * k, y * k))
            .collect(),
    )
}

/// A slim isosceles triangle pointing right.
pub fn arrow(size: f32) -> Shape {
    Shape::Polygon(vec![(-size, -0.6 * size), (size, 0.0), (-size, 0.6 * size)])
}

pub fn angle_diff_deg(a: f32, b: f32) -> f32 {
    let mut diff = (a - b) % 360.0;
    if diff < -180.0 {
        diff += 360.0;
    }
    if diff >= 180.0 {
        diff -= 360.0;
    }
    diff.abs()
}
