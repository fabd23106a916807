//! Finished layers and the fixed-length stack that holds them.

use crate::geometry::{Polygon, Role};
use crate::render::{strokes_for, Stroke};
use crate::CoordF;
use std::fmt;
use std::sync::OnceLock;

/// Non-fatal problem found while building a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerIssue {
    /// Chains the stitcher could not close; kept with role [`Role::Open`].
    OpenContours { count: usize },
    /// The cutting plane produced no geometry.
    EmptyLayer,
    /// Boundaries that disappeared when eroded by half an extrusion width.
    VanishedOnErosion { count: usize },
    /// A boundary ran out of room before all shells were generated.
    ShellsTruncated { requested: usize, generated: usize },
    /// Touch points that matched no segment endpoint.
    IsolatedTouches { count: usize },
    /// Offsets that pinched a loop apart; the smaller pieces were dropped.
    SplitOnOffset { dropped: usize },
}

impl fmt::Display for LayerIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerIssue::OpenContours { count } => write!(f, "{} open contours", count),
            LayerIssue::EmptyLayer => write!(f, "empty layer"),
            LayerIssue::VanishedOnErosion { count } => {
                write!(f, "{} polygons vanished on erosion", count)
            }
            LayerIssue::ShellsTruncated {
                requested,
                generated,
            } => write!(f, "shells truncated: {} of {}", generated, requested),
            LayerIssue::IsolatedTouches { count } => write!(f, "{} isolated touch points", count),
            LayerIssue::SplitOnOffset { dropped } => {
                write!(f, "{} pieces dropped where offsets split a loop", dropped)
            }
        }
    }
}

/// Fatal problem for one layer. Other layers are unaffected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayerError {
    #[error("layer {index}: non-finite coordinate in cut geometry")]
    NonFinite { index: usize },

    #[error("layer {index}: offset failed: {reason}")]
    Offset { index: usize, reason: String },
}

impl LayerError {
    pub fn index(&self) -> usize {
        match self {
            LayerError::NonFinite { index } | LayerError::Offset { index, .. } => *index,
        }
    }
}

/// A finished layer.
#[derive(Clone)]
pub struct Layer {
    /// Position in the stack (0-based).
    pub index: usize,
    /// Print height of the layer top.
    pub z: CoordF,
    /// Height of the cutting plane.
    pub cut_z: CoordF,
    /// Polygons in output order.
    pub polygons: Vec<Polygon>,
    pub issues: Vec<LayerIssue>,
    strokes: OnceLock<Vec<Stroke>>,
}

impl Layer {
    pub fn new(index: usize, z: CoordF, cut_z: CoordF, polygons: Vec<Polygon>) -> Self {
        Self {
            index,
            z,
            cut_z,
            polygons,
            issues: Vec::new(),
            strokes: OnceLock::new(),
        }
    }

    pub fn with_issues(mut self, issues: Vec<LayerIssue>) -> Self {
        self.issues = issues;
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Polygons with the given role, in output order.
    pub fn polygons_with_role(&self, role: Role) -> impl Iterator<Item = &Polygon> {
        self.polygons.iter().filter(move |p| p.role() == role)
    }

    pub fn count_role(&self, role: Role) -> usize {
        self.polygons_with_role(role).count()
    }

    /// Render strokes for this layer, computed on first use.
    pub fn strokes(&self) -> &[Stroke] {
        self.strokes.get_or_init(|| strokes_for(&self.polygons))
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("index", &self.index)
            .field("z", &self.z)
            .field("polygons", &self.polygons.len())
            .field("issues", &self.issues)
            .finish()
    }
}

/// State of one position in a [`LayerStack`].
#[derive(Debug, Clone, Default)]
pub enum LayerSlot {
    #[default]
    Empty,
    Done(Layer),
    Failed {
        index: usize,
        error: LayerError,
    },
    Cancelled,
}

impl LayerSlot {
    /// Anything other than `Empty`.
    pub fn is_filled(&self) -> bool {
        !matches!(self, LayerSlot::Empty)
    }

    pub fn layer(&self) -> Option<&Layer> {
        match self {
            LayerSlot::Done(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&LayerError> {
        match self {
            LayerSlot::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Fixed-length, ordered sequence of layer slots.
///
/// Sized once before the pipeline fills it; slots are never added or removed
/// while workers run.
#[derive(Debug, Clone, Default)]
pub struct LayerStack {
    slots: Vec<LayerSlot>,
}

impl LayerStack {
    pub fn with_len(len: usize) -> Self {
        Self {
            slots: vec![LayerSlot::Empty; len],
        }
    }

    pub fn from_slots(slots: Vec<LayerSlot>) -> Self {
        Self { slots }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn slots(&self) -> &[LayerSlot] {
        &self.slots
    }

    #[inline]
    pub fn slots_mut(&mut self) -> &mut [LayerSlot] {
        &mut self.slots
    }

    pub fn get(&self, index: usize) -> Option<&LayerSlot> {
        self.slots.get(index)
    }

    /// Finished layers in stack order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.slots.iter().filter_map(LayerSlot::layer)
    }

    /// Errors of failed slots in stack order.
    pub fn failures(&self) -> impl Iterator<Item = &LayerError> {
        self.slots.iter().filter_map(LayerSlot::error)
    }

    pub fn cancelled_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, LayerSlot::Cancelled))
            .count()
    }

    /// Every slot has been written.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(LayerSlot::is_filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn triangle() -> Polygon {
        Polygon::closed(
            &[Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(0.0, 1.0)],
            Role::Contour,
        )
    }

    #[test]
    fn test_stack_starts_empty() {
        let stack = LayerStack::with_len(3);
        assert_eq!(stack.len(), 3);
        assert!(!stack.is_complete());
        assert_eq!(stack.layers().count(), 0);
    }

    #[test]
    fn test_stack_queries() {
        let mut stack = LayerStack::with_len(3);
        stack.slots_mut()[0] = LayerSlot::Done(Layer::new(0, 0.2, 0.1, vec![triangle()]));
        stack.slots_mut()[1] = LayerSlot::Failed {
            index: 1,
            error: LayerError::NonFinite { index: 1 },
        };
        stack.slots_mut()[2] = LayerSlot::Cancelled;
        assert!(stack.is_complete());
        assert_eq!(stack.layers().count(), 1);
        assert_eq!(stack.failures().count(), 1);
        assert_eq!(stack.cancelled_count(), 1);
    }

    #[test]
    fn test_strokes_cached() {
        let layer = Layer::new(0, 0.2, 0.1, vec![triangle()]);
        let first = layer.strokes().as_ptr();
        assert_eq!(layer.strokes().len(), 3);
        assert_eq!(layer.strokes().as_ptr(), first);
    }

    #[test]
    fn test_error_display() {
        let err = LayerError::Offset {
            index: 4,
            reason: "non-finite ring".into(),
        };
        assert_eq!(err.to_string(), "layer 4: offset failed: non-finite ring");
        assert_eq!(err.index(), 4);
    }

    #[test]
    fn test_issue_display() {
        assert_eq!(
            LayerIssue::ShellsTruncated {
                requested: 3,
                generated: 1
            }
            .to_string(),
            "shells truncated: 1 of 3"
        );
        assert_eq!(
            LayerIssue::SplitOnOffset { dropped: 2 }.to_string(),
            "2 pieces dropped where offsets split a loop"
        );
    }
}
