//! Pipeline module - orchestrates the complete slicing process.
//!
//! mesh → contours → walls → surfaces → infill → toolpath
//!
//! Slicing runs in two data-parallel phases over a pre-sized layer stack:
//!
//! 1. **Contour phase**: every layer cuts the mesh at its plane and stitches
//!    the segments. Layers are independent.
//! 2. **Finish phase**: every layer classifies holes, builds walls, detects
//!    top and bottom surfaces against the frozen contours of the layers
//!    directly below and above, fills the infill area and orders its
//!    polygons by role.
//!
//! The phase boundary is a barrier: no finishing task starts before every
//! contour slot is written.
//!
//! # Example
//!
//! ```rust,ignore
//! use stack_slicer::{Mesh, PipelineConfig, PrintPipeline};
//!
//! let mesh = Mesh::cube(20.0);
//! let pipeline = PrintPipeline::new(PipelineConfig::default());
//!
//! let toolpath = pipeline.process(&mesh)?;
//! toolpath.write_to_file("output.gcode")?;
//! ```

pub mod schedule;

use crate::clipper::Region;
use crate::config::{InfillKind, PipelineConfig};
use crate::gcode::{Extrusion, Toolpath, ToolpathWriter};
use crate::geometry::Role;
use crate::infill::{fill_region, kind_for_layer};
use crate::mesh::Mesh;
use crate::perimeter::{PerimeterConfig, PerimeterGenerator};
use crate::slice::{
    detect_surfaces, plan_layers, slice_layer, ContourLayer, Layer, LayerError, LayerPlan,
    LayerSlot, LayerStack,
};
use crate::{Error, Result};
use schedule::Neighbours;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancellation flag.
///
/// Workers check it at the start of each layer; layers not yet started when
/// it is set end up as [`LayerSlot::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Pipeline lifecycle.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle = 0,
    ContourPhase = 1,
    Barrier = 2,
    FinishPhase = 3,
    Done = 4,
}

impl PipelineState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => PipelineState::Idle,
            1 => PipelineState::ContourPhase,
            2 => PipelineState::Barrier,
            3 => PipelineState::FinishPhase,
            _ => PipelineState::Done,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Contour,
    Finish,
}

/// One layer finished a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    /// Layers done in this phase so far, this one included.
    pub completed: usize,
    pub total: usize,
}

impl ProgressEvent {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Per-phase completion counters plus an optional lossy event channel.
///
/// The counters are exact; events are dropped when the channel is full.
#[derive(Debug)]
struct ProgressTracker {
    sender: Option<SyncSender<ProgressEvent>>,
    contour: AtomicUsize,
    finish: AtomicUsize,
    dropped: AtomicUsize,
}

impl ProgressTracker {
    fn new(sender: Option<SyncSender<ProgressEvent>>) -> Self {
        Self {
            sender,
            contour: AtomicUsize::new(0),
            finish: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        }
    }

    fn tick(&self, phase: ProgressPhase, total: usize) {
        let counter = match phase {
            ProgressPhase::Contour => &self.contour,
            ProgressPhase::Finish => &self.finish,
        };
        let completed = counter.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(tx) = &self.sender {
            let event = ProgressEvent {
                phase,
                completed,
                total,
            };
            match tx.try_send(event) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    fn completed(&self, phase: ProgressPhase) -> usize {
        match phase {
            ProgressPhase::Contour => self.contour.load(Ordering::Relaxed),
            ProgressPhase::Finish => self.finish.load(Ordering::Relaxed),
        }
    }
}

/// Wall-clock time per phase.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseTimings {
    pub contour: Duration,
    pub finish: Duration,
    pub total: Duration,
}

/// Everything a slicing run produced.
#[derive(Debug, Clone, Default)]
pub struct SliceReport {
    pub stack: LayerStack,
    /// Cancellation was requested during the run.
    pub cancelled: bool,
    /// Leading empty layers dropped at the barrier.
    pub trimmed: usize,
    /// Layer issues across all finished layers.
    pub warnings: usize,
    /// Layers that completed the contour phase.
    pub contour_completed: usize,
    /// Layers that completed the finish phase.
    pub finish_completed: usize,
    pub timings: PhaseTimings,
}

impl SliceReport {
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.stack.layers()
    }

    pub fn failures(&self) -> Vec<&LayerError> {
        self.stack.failures().collect()
    }

    /// Every layer finished without error or cancellation.
    pub fn is_clean(&self) -> bool {
        !self.cancelled && self.stack.layers().count() == self.stack.len()
    }
}

/// The main slicing pipeline.
#[derive(Debug)]
pub struct PrintPipeline {
    config: PipelineConfig,
    perimeters: PerimeterGenerator,
    state: AtomicU8,
}

impl PrintPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let perimeters = PerimeterGenerator::new(
            PerimeterConfig::new(config.slice.nozzle_diameter, config.slice.shell_count)
                .with_miter_limit(config.slice.miter_limit),
        );
        Self {
            config,
            perimeters,
            state: AtomicU8::new(PipelineState::Idle as u8),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(PipelineConfig::default())
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        PipelineState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: PipelineState) {
        log::debug!("Pipeline state: {:?}", state);
        self.state.store(state as u8, Ordering::Release);
    }

    /// Bounded channel for [`slice_with`](Self::slice_with) progress events.
    pub fn progress_channel(&self) -> (SyncSender<ProgressEvent>, Receiver<ProgressEvent>) {
        sync_channel(self.config.progress_capacity)
    }

    /// Writer configured from this pipeline's settings.
    pub fn writer(&self) -> ToolpathWriter {
        ToolpathWriter::new(
            self.config.writer.clone(),
            Extrusion::from(&self.config.slice),
        )
    }

    /// Slice and write in one go. A cancelled run yields [`Error::Cancelled`].
    pub fn process(&self, mesh: &Mesh) -> Result<Toolpath> {
        let report = self.slice(mesh)?;
        if report.cancelled {
            return Err(Error::Cancelled);
        }
        Ok(self.write_toolpath(&report))
    }

    pub fn write_toolpath(&self, report: &SliceReport) -> Toolpath {
        self.writer().write_stack(&report.stack)
    }

    pub fn slice(&self, mesh: &Mesh) -> Result<SliceReport> {
        self.slice_with(mesh, &CancelToken::new(), None)
    }

    /// Slice `mesh` into a finished layer stack.
    ///
    /// Invalid configuration or mesh input fails before any layer runs.
    /// Per-layer failures are recorded in the stack.
    pub fn slice_with(
        &self,
        mesh: &Mesh,
        cancel: &CancelToken,
        progress: Option<SyncSender<ProgressEvent>>,
    ) -> Result<SliceReport> {
        self.set_state(PipelineState::Idle);
        let plans = match self.prepare(mesh) {
            Ok(plans) => plans,
            Err(e) => {
                self.set_state(PipelineState::Done);
                return Err(e);
            }
        };

        let pool = match self.config.threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| Error::Config(format!("thread pool: {}", e)))?,
            ),
            None => None,
        };

        log::info!(
            "Slicing {} triangles into {} layers",
            mesh.len(),
            plans.len()
        );

        let tracker = ProgressTracker::new(progress);
        let layer_height = self.config.slice.layer_height;
        let total = plans.len();
        let start = Instant::now();
        let mut contour_elapsed = Duration::ZERO;
        let mut trimmed = 0;
        let mut finish_total = total;

        let mut run = || {
            self.set_state(PipelineState::ContourPhase);
            schedule::run_two_phase(
                total,
                |i| {
                    let plan = plans[i];
                    let layer = if cancel.is_cancelled() {
                        ContourLayer::cancelled(plan)
                    } else {
                        slice_layer(mesh, plan)
                    };
                    tracker.tick(ProgressPhase::Contour, total);
                    layer
                },
                |slots: &mut Vec<ContourLayer>| {
                    self.set_state(PipelineState::Barrier);
                    contour_elapsed = start.elapsed();
                    if self.config.slice.trim_leading_empty {
                        trimmed = trim_leading_empty(slots, layer_height);
                    }
                    finish_total = slots.len();
                    self.set_state(PipelineState::FinishPhase);
                },
                |n| {
                    let slot = if cancel.is_cancelled() || n.current.cancelled {
                        LayerSlot::Cancelled
                    } else {
                        self.finish_layer(n)
                    };
                    tracker.tick(ProgressPhase::Finish, n.all.len());
                    slot
                },
            )
        };

        let slots = match &pool {
            Some(pool) => pool.install(run),
            None => run(),
        };

        let stack = LayerStack::from_slots(slots);
        let total_elapsed = start.elapsed();
        let timings = PhaseTimings {
            contour: contour_elapsed,
            finish: total_elapsed.saturating_sub(contour_elapsed),
            total: total_elapsed,
        };
        let warnings = stack.layers().map(|l| l.issues.len()).sum();
        let report = SliceReport {
            cancelled: cancel.is_cancelled(),
            trimmed,
            warnings,
            contour_completed: tracker.completed(ProgressPhase::Contour),
            finish_completed: tracker.completed(ProgressPhase::Finish),
            timings,
            stack,
        };

        let dropped = tracker.dropped.load(Ordering::Relaxed);
        if dropped > 0 {
            log::debug!("{} progress events dropped", dropped);
        }
        for error in report.stack.failures() {
            log::warn!("{}", error);
        }
        log::info!(
            "Sliced {} of {} layers in {:.2?} (contours {:.2?}, finish {:.2?}), {} warnings",
            report.stack.layers().count(),
            finish_total,
            timings.total,
            timings.contour,
            timings.finish,
            warnings
        );
        if report.cancelled {
            log::warn!("Slicing cancelled, {} layers cancelled", report.stack.cancelled_count());
        }

        self.set_state(PipelineState::Done);
        Ok(report)
    }

    fn prepare(&self, mesh: &Mesh) -> Result<Vec<LayerPlan>> {
        self.config.validate()?;
        mesh.validate()?;
        plan_layers(
            mesh,
            self.config.slice.layer_height,
            self.config.slice.layer_count,
        )
    }

    /// Walls, surfaces and infill for one layer.
    fn finish_layer(&self, n: Neighbours<'_, ContourLayer>) -> LayerSlot {
        let contour = n.current;
        let index = contour.plan.index;
        if let Some(error) = &contour.error {
            return LayerSlot::Failed {
                index,
                error: error.clone(),
            };
        }
        match self.build_layer(n) {
            Ok(layer) => LayerSlot::Done(layer),
            Err(error) => LayerSlot::Failed { index, error },
        }
    }

    fn build_layer(&self, n: Neighbours<'_, ContourLayer>) -> std::result::Result<Layer, LayerError> {
        let cfg = &self.config.slice;
        let contour = n.current;
        let plan = contour.plan;

        let classified = contour.classified();
        let walls = self.perimeters.generate(plan.index, classified)?;

        let surfaces = detect_surfaces(
            contour.region(),
            usable(n.below),
            usable(n.above),
            &walls.infill_region,
            cfg.min_surface_area,
        );

        let width = cfg.nozzle_diameter;
        let dense = fill_region(
            &surfaces.dense,
            width,
            1.0,
            kind_for_layer(InfillKind::Single, plan.index),
            Role::DenseInfill,
        );
        let sparse = fill_region(
            &surfaces.sparse,
            width,
            cfg.infill_spacing,
            kind_for_layer(cfg.infill_kind, plan.index),
            Role::SparseInfill,
        );

        let mut issues = contour.issues.clone();
        issues.extend(walls.issues.iter().cloned());

        let mut polygons = walls.into_polygons();
        polygons.extend(
            classified
                .iter()
                .filter(|p| p.role() == Role::Open)
                .cloned(),
        );
        polygons.extend(dense);
        polygons.extend(sparse);
        // Stable, so equal roles keep generation order.
        polygons.sort_by_key(|p| p.role().rank());

        Ok(Layer::new(plan.index, plan.z, plan.cut_z, polygons).with_issues(issues))
    }
}

impl Default for PrintPipeline {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Region of a neighbour that finished its contour pass.
fn usable(layer: Option<&ContourLayer>) -> Option<&Region> {
    layer.filter(|c| c.is_ok()).map(ContourLayer::region)
}

/// Drop empty layers before the first non-empty one and renumber the rest.
/// Returns how many were dropped.
fn trim_leading_empty(slots: &mut Vec<ContourLayer>, layer_height: f64) -> usize {
    let lead = slots
        .iter()
        .take_while(|c| c.is_ok() && c.is_empty())
        .count();
    if lead == 0 {
        return 0;
    }
    slots.drain(..lead);
    for (i, layer) in slots.iter_mut().enumerate() {
        layer.renumber(i, layer_height);
    }
    log::info!("Trimmed {} leading empty layers", lead);
    lead
}
