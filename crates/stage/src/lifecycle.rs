//! Lifecycle controller: one-shot async setup, then synchronous per-frame updates.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use glam::Vec3;
use hatchlight_common::{EulerTransform, NodeId};
use hatchlight_render::{PerspectiveCamera, Renderer};
use hatchlight_scene::{Geometry, Scene, SceneError};
use hatchlight_shading::shaders::{self, toon_hatch_schema, toon_hatch_source};
use hatchlight_shading::{
    CompileError, DirectionalLight, LightField, MaterialError, MaterialInstance, ShaderBackend,
    ShaderProgramBinding, ShaderSource, SharedLight, UniformSource, UniformValue,
};
use tracing::Instrument;

use crate::config::{ConfigError, HexColor, StageConfig};
use crate::controls::OrbitControls;
use crate::diagnostics::{Diagnostics, FpsCounter};
use crate::progress::{LogProgress, MonotonicProgress, ProgressSink};

/// Controller lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Ready,
    Running,
    Disposed,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

/// Setup phases, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetupStep {
    /// Camera and orbit controls.
    Controls,
    /// Light, programs, materials, geometry and nodes.
    Scene,
    /// Frame diagnostics.
    Diagnostics,
}

impl std::fmt::Display for SetupStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Controls => "controls",
            Self::Scene => "scene",
            Self::Diagnostics => "diagnostics",
        };
        f.write_str(name)
    }
}

/// Cause of a failed setup step.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SetupError {
    #[error("invalid config: {0}")]
    Config(String),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Material(#[from] MaterialError),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

impl From<ConfigError> for SetupError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Why `initialize` did not reach Ready.
///
/// `Clone` because every caller of an in-flight `initialize` receives the same result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InitializationError {
    #[error("setup failed in the {step} step: {cause}")]
    Step { step: SetupStep, cause: SetupError },
    #[error("setup cancelled by dispose")]
    Cancelled,
    #[error("controller is disposed")]
    Disposed,
}

/// Errors from [`LifecycleController::on_frame`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("frames are not accepted while {0}")]
    NotRunning(LifecycleState),
    #[error(
        "invalid frame timing: interval {interval}, elapsed {elapsed} (previous elapsed {previous})"
    )]
    InvalidInterval { interval: f64, elapsed: f64, previous: f64 },
}

/// Constant-rate rotation of one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spinner {
    pub node: NodeId,
    /// Radians per second about each axis.
    pub rate: Vec3,
    /// Cleared after the first failed update; the node is then left alone.
    pub enabled: bool,
}

impl Spinner {
    pub fn new(node: NodeId, rate: Vec3) -> Self {
        Self {
            node,
            rate,
            enabled: true,
        }
    }

    fn advance(&self, scene: &mut Scene, interval: f32) -> Result<(), SceneError> {
        let node = scene.node_mut(self.node)?;
        let rotation = node.rotation() + self.rate * interval;
        node.set_rotation(rotation)
    }
}

type InitResult = Result<(), InitializationError>;

/// Shared handle on the one setup run. Every `initialize` call gets a clone.
pub type InitFuture = Shared<LocalBoxFuture<'static, InitResult>>;

struct Inner {
    state: LifecycleState,
    config: StageConfig,
    scene: Scene,
    camera: PerspectiveCamera,
    viewport: Option<(u32, u32)>,
    controls: Option<OrbitControls>,
    light: Option<SharedLight>,
    spinners: Vec<Spinner>,
    diagnostics: Box<dyn Diagnostics>,
    progress: MonotonicProgress,
    pending: Option<InitFuture>,
    last_elapsed: Option<f64>,
}

impl Inner {
    fn transition(&mut self, to: LifecycleState) {
        tracing::info!(from = %self.state, to = %to, "lifecycle transition");
        self.state = to;
    }

    fn release(&mut self) {
        self.spinners.clear();
        self.scene.clear();
        self.controls = None;
        self.light = None;
        self.pending = None;
        self.last_elapsed = None;
        self.diagnostics.reset();
    }
}

/// Owns one scene from setup to teardown.
///
/// All access happens on the frame thread. Setup may suspend; `on_frame`
/// never does.
pub struct LifecycleController<B> {
    inner: Rc<RefCell<Inner>>,
    backend: Rc<B>,
}

impl<B: ShaderBackend + 'static> LifecycleController<B> {
    pub fn new(backend: B, config: StageConfig) -> Self {
        let camera = PerspectiveCamera::new(
            config.camera.fov_degrees,
            config.camera.near,
            config.camera.far,
            config.camera.position,
        );
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state: LifecycleState::Uninitialized,
                config,
                scene: Scene::new(),
                camera,
                viewport: None,
                controls: None,
                light: None,
                spinners: Vec::new(),
                diagnostics: Box::new(FpsCounter::default()),
                progress: MonotonicProgress::new(Box::new(LogProgress)),
                pending: None,
                last_elapsed: None,
            })),
            backend: Rc::new(backend),
        }
    }

    pub fn with_progress(self, sink: impl ProgressSink + 'static) -> Self {
        self.inner.borrow_mut().progress = MonotonicProgress::new(Box::new(sink));
        self
    }

    pub fn with_diagnostics(self, diagnostics: impl Diagnostics + 'static) -> Self {
        self.inner.borrow_mut().diagnostics = Box::new(diagnostics);
        self
    }

    /// Start setup, or join the setup already in flight.
    ///
    /// Setup runs at most once per controller. Later calls return a handle
    /// on the same run, which resolves to the same result. After `dispose`
    /// the result is [`InitializationError::Disposed`].
    pub fn initialize(&self) -> InitFuture {
        let mut inner = self.inner.borrow_mut();
        if let Some(pending) = &inner.pending {
            return pending.clone();
        }
        match inner.state {
            LifecycleState::Uninitialized => {}
            // Only dispose clears the handle once setup has started.
            state => {
                debug_assert_eq!(state, LifecycleState::Disposed, "setup handle missing");
                return futures::future::ready(Err(InitializationError::Disposed))
                    .boxed_local()
                    .shared();
            }
        }

        inner.transition(LifecycleState::Initializing);
        let setup = run_setup(Rc::downgrade(&self.inner), Rc::clone(&self.backend))
            .instrument(tracing::info_span!("initialize"))
            .boxed_local()
            .shared();
        inner.pending = Some(setup.clone());
        setup
    }

    /// Ready -> Running. A no-op when already running.
    pub fn begin_running(&self) -> Result<(), FrameError> {
        let mut inner = self.inner.borrow_mut();
        match inner.state {
            LifecycleState::Ready => {
                inner.transition(LifecycleState::Running);
                Ok(())
            }
            LifecycleState::Running => Ok(()),
            state => Err(FrameError::NotRunning(state)),
        }
    }

    /// Advance the scene by one frame.
    ///
    /// Spinners first, then camera controls, then diagnostics. `interval`
    /// and `elapsed` are seconds; `elapsed` must not go backwards. A spinner
    /// whose node rejects the update is disabled and the rest continue.
    pub fn on_frame(&self, interval: f64, elapsed: f64) -> Result<(), FrameError> {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        if inner.state != LifecycleState::Running {
            return Err(FrameError::NotRunning(inner.state));
        }
        let previous = inner.last_elapsed.unwrap_or(0.0);
        let interval_ok = interval.is_finite() && interval >= 0.0;
        if !(interval_ok && elapsed.is_finite() && elapsed >= previous) {
            return Err(FrameError::InvalidInterval {
                interval,
                elapsed,
                previous,
            });
        }
        inner.last_elapsed = Some(elapsed);

        let dt = interval as f32;
        for spinner in inner.spinners.iter_mut().filter(|s| s.enabled) {
            if let Err(err) = spinner.advance(&mut inner.scene, dt) {
                tracing::warn!(
                    node = ?spinner.node,
                    %err,
                    "node update failed, skipping node from now on"
                );
                spinner.enabled = false;
            }
        }

        if let Some(controls) = inner.controls.as_mut() {
            controls.update(&mut inner.camera);
        }
        inner.diagnostics.tick(interval);
        Ok(())
    }

    /// Release everything and move to Disposed. Safe to call repeatedly and
    /// from any state, including while setup is in flight.
    pub fn dispose(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.state == LifecycleState::Disposed {
            return;
        }
        inner.release();
        inner.transition(LifecycleState::Disposed);
    }

    /// Forward a surface size change to the camera aspect ratio.
    pub fn resize(&self, width: u32, height: u32) {
        let mut inner = self.inner.borrow_mut();
        if height == 0 {
            return;
        }
        inner.viewport = Some((width, height));
        inner.camera.set_viewport(width, height);
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.borrow().state
    }

    pub fn config(&self) -> Ref<'_, StageConfig> {
        Ref::map(self.inner.borrow(), |inner| &inner.config)
    }

    pub fn scene(&self) -> Ref<'_, Scene> {
        Ref::map(self.inner.borrow(), |inner| &inner.scene)
    }

    pub fn scene_mut(&self) -> RefMut<'_, Scene> {
        RefMut::map(self.inner.borrow_mut(), |inner| &mut inner.scene)
    }

    pub fn camera(&self) -> PerspectiveCamera {
        self.inner.borrow().camera
    }

    /// Orbit controls, once setup has built them.
    pub fn controls(&self) -> Option<RefMut<'_, OrbitControls>> {
        RefMut::filter_map(self.inner.borrow_mut(), |inner| inner.controls.as_mut()).ok()
    }

    /// Owner handle of the scene light, once setup has built it.
    pub fn light(&self) -> Option<SharedLight> {
        self.inner.borrow().light.clone()
    }

    pub fn spinners(&self) -> Vec<Spinner> {
        self.inner.borrow().spinners.clone()
    }

    /// Animate `node` at `rate` rad/s. Only accepted once setup has finished.
    pub fn add_spinner(&self, node: NodeId, rate: Vec3) -> Result<(), FrameError> {
        let mut inner = self.inner.borrow_mut();
        match inner.state {
            LifecycleState::Ready | LifecycleState::Running => {
                inner.spinners.push(Spinner::new(node, rate));
                Ok(())
            }
            state => Err(FrameError::NotRunning(state)),
        }
    }

    pub fn fps(&self) -> Option<f64> {
        self.inner.borrow().diagnostics.fps()
    }

    /// Draw the current scene with `renderer`.
    pub fn render_with<R: Renderer>(&self, renderer: &mut R) -> R::Output {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        renderer.render(&mut inner.scene, &inner.camera)
    }
}

/// Completes on the second poll, giving other tasks on the thread a turn.
struct YieldNow(bool);

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            return Poll::Ready(());
        }
        self.0 = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Report progress, then suspend so the host can present it.
async fn report(
    inner: &Weak<RefCell<Inner>>,
    fraction: f32,
    delay: Option<Duration>,
) -> InitResult {
    live(inner)?.borrow_mut().progress.report(fraction, delay);
    YieldNow(false).await;
    live(inner).map(|_| ())
}

/// The controller, if it still exists and has not been disposed.
fn live(inner: &Weak<RefCell<Inner>>) -> Result<Rc<RefCell<Inner>>, InitializationError> {
    let inner = inner.upgrade().ok_or(InitializationError::Cancelled)?;
    if inner.borrow().state == LifecycleState::Disposed {
        return Err(InitializationError::Cancelled);
    }
    Ok(inner)
}

async fn run_setup<B: ShaderBackend>(inner: Weak<RefCell<Inner>>, backend: Rc<B>) -> InitResult {
    let result = setup_steps(&inner, &*backend).await;
    match &result {
        Ok(()) => {}
        Err(InitializationError::Cancelled) => tracing::info!("setup abandoned"),
        Err(err) => {
            tracing::error!(%err, "setup failed");
            if let Some(inner) = inner.upgrade() {
                let mut inner = inner.borrow_mut();
                if inner.state != LifecycleState::Disposed {
                    inner.release();
                    inner.transition(LifecycleState::Disposed);
                }
            }
        }
    }
    result
}

fn step_err(step: SetupStep) -> impl Fn(SetupError) -> InitializationError {
    move |cause| InitializationError::Step { step, cause }
}

async fn setup_steps<B: ShaderBackend>(inner: &Weak<RefCell<Inner>>, backend: &B) -> InitResult {
    report(inner, 0.1, None).await?;

    // (a) camera and controls
    let (config, viewport) = {
        let rc = live(inner)?;
        let inner = rc.borrow();
        (inner.config.clone(), inner.viewport)
    };
    config
        .validate()
        .map_err(|e| step_err(SetupStep::Controls)(e.into()))?;
    let mut camera = PerspectiveCamera::new(
        config.camera.fov_degrees,
        config.camera.near,
        config.camera.far,
        config.camera.position,
    );
    camera.target = config.camera.target;
    if let Some((width, height)) = viewport {
        camera.set_viewport(width, height);
    }
    let controls = OrbitControls::from_config(config.camera.target, &config.controls);
    tracing::debug!(target = ?config.camera.target, "controls ready");
    report(inner, 0.25, None).await?;

    // (b) light, programs, materials, geometry, nodes
    let light = SharedLight::new(DirectionalLight {
        direction: config.light.direction,
        color: config.light.color.to_color(),
    });
    let (scene, spinners) = build_scene(inner, backend, &config, &light)
        .await
        .map_err(|e| match e {
            StepFailure::Interrupted(err) => err,
            StepFailure::Failed(cause) => step_err(SetupStep::Scene)(cause),
        })?;
    report(inner, 0.75, None).await?;
    report(inner, 1.0, Some(Duration::from_millis(100))).await?;

    // (c) diagnostics, then commit
    let rc = live(inner)?;
    {
        let mut guard = rc.borrow_mut();
        let inner = &mut *guard;
        inner.diagnostics.reset();
        inner.camera = camera;
        inner.controls = Some(controls);
        inner.light = Some(light);
        inner.scene = scene;
        inner.spinners = spinners;
        inner.last_elapsed = None;
        inner.transition(LifecycleState::Ready);
    }
    Ok(())
}

enum StepFailure {
    /// Cancelled or disposed while suspended.
    Interrupted(InitializationError),
    Failed(SetupError),
}

impl From<SetupError> for StepFailure {
    fn from(err: SetupError) -> Self {
        Self::Failed(err)
    }
}

impl From<SceneError> for StepFailure {
    fn from(err: SceneError) -> Self {
        Self::Failed(err.into())
    }
}

/// Compile each distinct program once. A program that fails to compile takes
/// out only the nodes that use it; if no node survives, the first compile
/// error fails the step.
async fn build_scene<B: ShaderBackend>(
    inner: &Weak<RefCell<Inner>>,
    backend: &B,
    config: &StageConfig,
    light: &SharedLight,
) -> Result<(Scene, Vec<Spinner>), StepFailure> {
    let mut programs: BTreeMap<String, Result<Rc<ShaderProgramBinding>, CompileError>> =
        BTreeMap::new();
    for node in &config.nodes {
        let key = program_key(node.shader.as_deref());
        if programs.contains_key(key) {
            continue;
        }
        let source = match &node.shader {
            None => toon_hatch_source(),
            Some(name) => {
                let shader = config
                    .shaders
                    .get(name)
                    .ok_or_else(|| SetupError::Config(format!("unknown shader `{name}`")))?;
                ShaderSource::new(name.as_str(), shader.vertex.as_str(), shader.fragment.as_str())
            }
        };
        let compiled = ShaderProgramBinding::compile(backend, source, toon_hatch_schema()).await;
        live(inner).map_err(StepFailure::Interrupted)?;
        programs.insert(key.to_string(), compiled.map(Rc::new));
    }

    let mut scene = Scene::new();
    let geometry = scene.add_geometry(Geometry::torus(
        config.torus.radius,
        config.torus.tube,
        config.torus.radial_segments,
        config.torus.tubular_segments,
    ));

    let mut materials = BTreeMap::new();
    let mut spinners = Vec::new();
    let mut first_compile_error = None;
    for node in &config.nodes {
        let key = program_key(node.shader.as_deref());
        let binding = match programs.get(key) {
            Some(Ok(binding)) => Rc::clone(binding),
            Some(Err(err)) => {
                tracing::error!(
                    node = %node.name,
                    material = %node.palette,
                    %err,
                    "shader compile failed, node omitted"
                );
                if first_compile_error.is_none() {
                    first_compile_error = Some(err.clone());
                }
                continue;
            }
            None => continue,
        };

        let material_key = (key.to_string(), node.palette.clone());
        let material = match materials.get(&material_key) {
            Some(id) => *id,
            None => {
                let instance = instantiate_palette(config, &node.palette, binding, light)?;
                let id = scene.add_material(instance);
                materials.insert(material_key, id);
                id
            }
        };

        let transform = EulerTransform {
            position: node.position,
            rotation: node.rotation,
            ..EulerTransform::default()
        };
        let id = scene.create_node(node.name.as_str(), geometry, material, transform)?;
        spinners.push(Spinner::new(id, node.spin));
    }

    if scene.node_count() == 0 {
        return Err(match first_compile_error {
            Some(err) => SetupError::Compile(err).into(),
            None => SetupError::Config("no nodes configured".into()).into(),
        });
    }
    tracing::debug!(
        nodes = scene.node_count(),
        materials = scene.material_count(),
        programs = programs.len(),
        "scene built"
    );
    Ok((scene, spinners))
}

fn program_key(shader: Option<&str>) -> &str {
    shader.unwrap_or(shaders::TOON_HATCH_LABEL)
}

fn instantiate_palette(
    config: &StageConfig,
    palette: &str,
    binding: Rc<ShaderProgramBinding>,
    light: &SharedLight,
) -> Result<MaterialInstance, SetupError> {
    let colors = config
        .palettes
        .get(palette)
        .ok_or_else(|| SetupError::Config(format!("unknown palette `{palette}`")))?;
    let color = |c: HexColor| UniformSource::from(UniformValue::Color(c.to_color()));

    let mut initial = vec![
        (
            shaders::DIR_LIGHT_POS.to_string(),
            UniformSource::Light(light.downgrade(), LightField::Direction),
        ),
        (
            shaders::DIR_LIGHT_COLOR.to_string(),
            UniformSource::Light(light.downgrade(), LightField::Color),
        ),
        (shaders::AMBIENT_LIGHT_COLOR.to_string(), color(config.ambient)),
        (shaders::BASE_COLOR.to_string(), color(config.base_color)),
    ];
    for (i, line) in colors.line_colors.iter().enumerate() {
        initial.push((shaders::line_color(i), color(*line)));
    }
    Ok(MaterialInstance::instantiate(palette, binding, initial)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use hatchlight_shading::NagaBackend;

    fn controller() -> LifecycleController<NagaBackend> {
        LifecycleController::new(NagaBackend::new(), StageConfig::default())
    }

    #[test]
    fn initialize_reaches_ready_with_configured_nodes() {
        let ctl = controller();
        assert_eq!(ctl.state(), LifecycleState::Uninitialized);
        block_on(ctl.initialize()).unwrap();
        assert_eq!(ctl.state(), LifecycleState::Ready);
        assert_eq!(ctl.scene().node_count(), 2);
        assert_eq!(ctl.scene().material_count(), 2);
        assert_eq!(ctl.spinners().len(), 2);
        assert!(ctl.light().is_some());
    }

    #[test]
    fn palettes_share_one_program() {
        let ctl = controller();
        block_on(ctl.initialize()).unwrap();
        let scene = ctl.scene();
        let bindings: Vec<_> = scene.materials().map(|(_, m)| Rc::clone(m.binding())).collect();
        assert!(Rc::ptr_eq(&bindings[0], &bindings[1]));
    }

    #[test]
    fn frames_refused_before_running() {
        let ctl = controller();
        assert_eq!(
            ctl.on_frame(0.1, 0.1),
            Err(FrameError::NotRunning(LifecycleState::Uninitialized))
        );
        block_on(ctl.initialize()).unwrap();
        assert_eq!(ctl.on_frame(0.1, 0.1), Err(FrameError::NotRunning(LifecycleState::Ready)));
        ctl.begin_running().unwrap();
        ctl.on_frame(0.1, 0.1).unwrap();
    }

    #[test]
    fn elapsed_may_not_go_backwards() {
        let ctl = controller();
        block_on(ctl.initialize()).unwrap();
        ctl.begin_running().unwrap();
        ctl.on_frame(0.1, 0.5).unwrap();
        assert!(matches!(
            ctl.on_frame(0.1, 0.4),
            Err(FrameError::InvalidInterval { .. })
        ));
        assert!(matches!(
            ctl.on_frame(-0.1, 0.6),
            Err(FrameError::InvalidInterval { .. })
        ));
        ctl.on_frame(0.0, 0.5).unwrap();
    }

    #[test]
    fn resize_updates_camera_before_and_after_setup() {
        let ctl = controller();
        ctl.resize(800, 400);
        block_on(ctl.initialize()).unwrap();
        assert!((ctl.camera().aspect - 2.0).abs() < 1e-6);
        ctl.resize(300, 300);
        assert!((ctl.camera().aspect - 1.0).abs() < 1e-6);
        ctl.resize(300, 0);
        assert!((ctl.camera().aspect - 1.0).abs() < 1e-6);
    }

    #[test]
    fn invalid_config_fails_controls_step_and_disposes() {
        let mut config = StageConfig::default();
        config.nodes.clear();
        let ctl = LifecycleController::new(NagaBackend::new(), config);
        let err = block_on(ctl.initialize()).unwrap_err();
        assert!(matches!(
            err,
            InitializationError::Step {
                step: SetupStep::Controls,
                cause: SetupError::Config(_)
            }
        ));
        assert_eq!(ctl.state(), LifecycleState::Disposed);
        assert!(ctl.scene().is_empty());
    }

    #[test]
    fn initialize_after_dispose_reports_disposed() {
        let ctl = controller();
        ctl.dispose();
        assert_eq!(block_on(ctl.initialize()), Err(InitializationError::Disposed));
    }

    #[test]
    fn initialize_after_setup_joins_the_finished_run() {
        let ctl = controller();
        block_on(ctl.initialize()).unwrap();
        block_on(ctl.initialize()).unwrap();
        assert_eq!(ctl.state(), LifecycleState::Ready);

        ctl.begin_running().unwrap();
        block_on(ctl.initialize()).unwrap();
        assert_eq!(ctl.state(), LifecycleState::Running);
        assert_eq!(ctl.scene().node_count(), 2);
    }

    #[test]
    fn moving_light_marks_materials_for_upload() {
        let ctl = controller();
        block_on(ctl.initialize()).unwrap();
        for (_, material) in ctl.scene_mut().materials_mut() {
            material.mark_uploaded();
        }
        ctl.light().unwrap().set_direction(Vec3::new(1.0, 0.0, 0.0));
        assert!(ctl.scene().materials().all(|(_, m)| m.needs_upload()));
    }
}
