//! Face-mesh landmark types.
//!
//! Points are normalized to the video frame (0.0..=1.0 on both axes). The mesh
//! detector also reports a relative depth `z`, which is carried through
//! serialization but never used by any geometry in this crate.

use serde::{Deserialize, Serialize};

/// Number of points in a standard face mesh (without iris refinement).
pub const MESH_POINTS: usize = 468;

/// Six mesh indices describing one eye, ordered p1..p6:
/// outer corner, upper lid 1, upper lid 2, inner corner, lower lid 2, lower lid 1.
pub type EyeIndices = [usize; 6];

pub const LEFT_EYE: EyeIndices = [33, 160, 158, 133, 153, 144];
pub const RIGHT_EYE: EyeIndices = [362, 385, 387, 263, 373, 380];

/// A single normalized landmark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Planar Euclidean distance; `z` is ignored.
    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// All mesh points for one detected face, indexed by mesh position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceLandmarks {
    points: Vec<Landmark>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The six landmarks of one eye, or `None` if the mesh is too short to
    /// contain every index.
    pub fn eye(&self, indices: &EyeIndices) -> Option<[Landmark; 6]> {
        let mut eye = [Landmark::default(); 6];
        for (slot, &idx) in eye.iter_mut().zip(indices.iter()) {
            *slot = *self.points.get(idx)?;
        }
        Some(eye)
    }

    /// Build a full-size mesh whose two eyes both have the requested eye
    /// aspect ratio. Every non-eye point sits at the frame centre.
    pub fn synthetic(ear: f32) -> Self {
        let mut points = vec![Landmark::new(0.5, 0.5); MESH_POINTS];
        place_eye(&mut points, &LEFT_EYE, (0.40, 0.42), ear);
        place_eye(&mut points, &RIGHT_EYE, (0.60, 0.42), ear);
        Self { points }
    }
}

/// Eye width used by [`FaceLandmarks::synthetic`], in normalized units.
const SYNTHETIC_EYE_WIDTH: f32 = 0.08;

// Hexagon with corners at +-w/2 and lid points at +-w/6 horizontally. Both
// vertical pairs are 2h apart, so EAR = 4h / 2w and h = ear * w / 2.
fn place_eye(points: &mut [Landmark], indices: &EyeIndices, center: (f32, f32), ear: f32) {
    let (cx, cy) = center;
    let w = SYNTHETIC_EYE_WIDTH;
    let h = ear * w / 2.0;
    let layout = [
        (cx - w / 2.0, cy),
        (cx - w / 6.0, cy - h),
        (cx + w / 6.0, cy - h),
        (cx + w / 2.0, cy),
        (cx + w / 6.0, cy + h),
        (cx - w / 6.0, cy + h),
    ];
    for (&idx, (x, y)) in indices.iter().zip(layout) {
        points[idx] = Landmark::new(x, y);
    }
}

/// One processed video frame as delivered by the mesh detector.
///
/// An empty `faces` list means no face was found in the frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshFrame {
    #[serde(default)]
    pub faces: Vec<FaceLandmarks>,
}

impl MeshFrame {
    pub fn single(face: FaceLandmarks) -> Self {
        Self { faces: vec![face] }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// The face to analyse. Only frames with exactly one face count.
    pub fn primary_face(&self) -> Option<&FaceLandmarks> {
        match self.faces.as_slice() {
            [face] => Some(face),
            _ => None,
        }
    }
}
