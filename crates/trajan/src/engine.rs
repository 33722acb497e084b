//! # Engine
//!
//! Owns the ECS, the renderer and the platform, and drives frames:
//!
//! ```text
//! Frame N:
//! ┌──────────────────────────────────────────────────────────────┐
//! │ 1. POLL        platform events, resize, close requests       │
//! │ 2. BEGIN       clamp dt, upload frame data, begin_frame      │
//! │ 3. UPDATE      every system in registration order            │
//! │                (game systems ... MotionSystem ... Render)    │
//! │ 4. END         end_frame, frame counter, timing              │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::any::Any;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use trajan_core::{AsAny, ComponentSet, Orchestrator, System, SystemHandle};

use crate::assets::{AssetHandle, AssetStore, Mesh, Shader, Texture};
use crate::components::{Sprite, Transform2D, Velocity2D};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::math::Mat4;
use crate::platform::Platform;
use crate::render::{
    create_renderer, FrameData, MeshDescriptor, RenderCommand, Renderer, RendererInitInfo,
    ShaderDescriptor, TextureDescriptor, VertexAttrib, VertexLayout, VertexSemantic,
};
use crate::systems::{MotionSystem, RenderSystem};

/// Name under which [`EngineContext::load_quad`] caches its mesh.
pub const QUAD_MESH: &str = "builtin:quad";

/// Collaborators every system can reach through
/// [`SystemFrame::context`](trajan_core::SystemFrame).
pub struct EngineContext {
    renderer: Box<dyn Renderer>,
    /// Loaded meshes.
    pub meshes: AssetStore<Mesh>,
    /// Loaded shaders.
    pub shaders: AssetStore<Shader>,
    /// Loaded textures.
    pub textures: AssetStore<Texture>,
    /// Camera data uploaded at the start of every frame.
    pub frame_data: FrameData,
}

impl EngineContext {
    fn new(renderer: Box<dyn Renderer>) -> Self {
        Self {
            renderer,
            meshes: AssetStore::new(),
            shaders: AssetStore::new(),
            textures: AssetStore::new(),
            frame_data: FrameData::default(),
        }
    }

    /// The renderer.
    #[must_use]
    pub fn renderer(&self) -> &dyn Renderer {
        &*self.renderer
    }

    /// The renderer, mutably.
    pub fn renderer_mut(&mut self) -> &mut dyn Renderer {
        &mut *self.renderer
    }

    /// The renderer as its concrete type, if it is an `R`.
    #[must_use]
    pub fn renderer_as<R: Renderer>(&self) -> Option<&R> {
        let any: &dyn Any = (*self.renderer).as_any();
        any.downcast_ref::<R>()
    }

    /// Uploads a mesh, or shares the one already loaded under `name`.
    ///
    /// # Errors
    ///
    /// [`EngineError::Render`] if the renderer rejects the descriptor.
    pub fn load_mesh(
        &mut self,
        name: &str,
        desc: &MeshDescriptor,
    ) -> EngineResult<AssetHandle<Mesh>> {
        if let Some(handle) = self.meshes.find(name) {
            return Ok(handle);
        }
        let gpu = self.renderer.create_mesh(desc)?;
        debug!(name, vertices = desc.vertex_count(), "mesh loaded");
        Ok(self.meshes.insert_named(
            name,
            Mesh {
                name: name.to_owned(),
                vertex_count: desc.vertex_count(),
                index_count: desc.index_count(),
                gpu,
            },
        ))
    }

    /// The unit quad centered on the origin, with position and UV
    /// attributes. Loaded once and shared.
    ///
    /// # Errors
    ///
    /// [`EngineError::Render`].
    pub fn load_quad(&mut self) -> EngineResult<AssetHandle<Mesh>> {
        #[rustfmt::skip]
        const VERTICES: [f32; 20] = [
            -0.5, -0.5, 0.0,   0.0, 0.0,
             0.5, -0.5, 0.0,   1.0, 0.0,
             0.5,  0.5, 0.0,   1.0, 1.0,
            -0.5,  0.5, 0.0,   0.0, 1.0,
        ];

        let desc = MeshDescriptor {
            vertices: bytemuck::cast_slice(&VERTICES).to_vec(),
            indices: vec![0, 1, 2, 0, 2, 3],
            layout: VertexLayout {
                stride: 20,
                attribs: vec![
                    VertexAttrib::float(VertexSemantic::Position, 3, 0),
                    VertexAttrib::float(VertexSemantic::TexCoord0, 2, 12),
                ],
            },
        };
        self.load_mesh(QUAD_MESH, &desc)
    }

    /// Compiles a shader, or shares the one already loaded under `name`.
    ///
    /// # Errors
    ///
    /// [`EngineError::Render`].
    pub fn load_shader(
        &mut self,
        name: &str,
        desc: &ShaderDescriptor,
    ) -> EngineResult<AssetHandle<Shader>> {
        if let Some(handle) = self.shaders.find(name) {
            return Ok(handle);
        }
        let gpu = self.renderer.create_shader(desc)?;
        debug!(name, "shader loaded");
        Ok(self.shaders.insert_named(
            name,
            Shader {
                name: name.to_owned(),
                gpu,
            },
        ))
    }

    /// Compiles the shader whose sources sit next to each other as
    /// `<base>.vert.glsl` and `<base>.frag.glsl`, or shares the one already
    /// loaded from `base`.
    ///
    /// # Errors
    ///
    /// [`EngineError::AssetIo`] if either source cannot be read,
    /// [`EngineError::Render`] if the renderer rejects it.
    pub fn load_shader_file(&mut self, base: &Path) -> EngineResult<AssetHandle<Shader>> {
        let name = base.to_string_lossy();
        if let Some(handle) = self.shaders.find(&name) {
            return Ok(handle);
        }
        let desc = ShaderDescriptor {
            vertex_source: read_source(&with_suffix(base, ".vert.glsl"))?,
            fragment_source: read_source(&with_suffix(base, ".frag.glsl"))?,
        };
        self.load_shader(&name, &desc)
    }

    /// Uploads a texture, or shares the one already loaded under `name`.
    ///
    /// # Errors
    ///
    /// [`EngineError::Render`].
    pub fn load_texture(
        &mut self,
        name: &str,
        desc: &TextureDescriptor,
    ) -> EngineResult<AssetHandle<Texture>> {
        if let Some(handle) = self.textures.find(name) {
            return Ok(handle);
        }
        let gpu = self.renderer.create_texture(desc)?;
        debug!(name, width = desc.width, height = desc.height, "texture loaded");
        Ok(self.textures.insert_named(
            name,
            Texture {
                name: name.to_owned(),
                width: desc.width,
                height: desc.height,
                gpu,
            },
        ))
    }

    /// Drops a mesh reference, freeing the GPU buffers with the last one.
    /// If the renderer fails to free them, the mesh stays loaded with its
    /// last reference.
    ///
    /// # Errors
    ///
    /// [`EngineError::Asset`] or [`EngineError::Render`].
    pub fn release_mesh(&mut self, handle: AssetHandle<Mesh>) -> EngineResult<()> {
        if self.meshes.ref_count(handle) == 1 {
            let gpu = self.meshes.get(handle)?.gpu;
            self.renderer.destroy_mesh(gpu)?;
        }
        self.meshes.release(handle)?;
        Ok(())
    }

    /// Drops a shader reference, freeing the program with the last one.
    ///
    /// # Errors
    ///
    /// [`EngineError::Asset`] or [`EngineError::Render`].
    pub fn release_shader(&mut self, handle: AssetHandle<Shader>) -> EngineResult<()> {
        if self.shaders.ref_count(handle) == 1 {
            let gpu = self.shaders.get(handle)?.gpu;
            self.renderer.destroy_shader(gpu)?;
        }
        self.shaders.release(handle)?;
        Ok(())
    }

    /// Drops a texture reference, freeing the image with the last one.
    ///
    /// # Errors
    ///
    /// [`EngineError::Asset`] or [`EngineError::Render`].
    pub fn release_texture(&mut self, handle: AssetHandle<Texture>) -> EngineResult<()> {
        if self.textures.ref_count(handle) == 1 {
            let gpu = self.textures.get(handle)?.gpu;
            self.renderer.destroy_texture(gpu)?;
        }
        self.textures.release(handle)?;
        Ok(())
    }

    /// Resolves the sprite's assets and submits one mesh draw.
    ///
    /// # Errors
    ///
    /// [`EngineError::Asset`] if a handle is not loaded,
    /// [`EngineError::Render`] if the renderer rejects the command.
    pub fn draw(&mut self, sprite: &Sprite, transform: Mat4) -> EngineResult<()> {
        let mesh = self.meshes.get(sprite.mesh)?.gpu;
        let shader = self.shaders.get(sprite.shader)?.gpu;
        let texture = match sprite.texture {
            Some(handle) => Some(self.textures.get(handle)?.gpu),
            None => None,
        };

        let mut command = RenderCommand::mesh(mesh, shader, transform);
        command.texture = texture;
        self.renderer.submit(command)?;
        Ok(())
    }

    /// Frees every asset and its GPU resource regardless of reference
    /// counts. Renderer errors are logged, not returned.
    fn unload_all(&mut self) {
        for mesh in self.meshes.drain() {
            if let Err(error) = self.renderer.destroy_mesh(mesh.gpu) {
                warn!(mesh = %mesh.name, %error, "failed to free mesh");
            }
        }
        for shader in self.shaders.drain() {
            if let Err(error) = self.renderer.destroy_shader(shader.gpu) {
                warn!(shader = %shader.name, %error, "failed to free shader");
            }
        }
        for texture in self.textures.drain() {
            if let Err(error) = self.renderer.destroy_texture(texture.gpu) {
                warn!(texture = %texture.name, %error, "failed to free texture");
            }
        }
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut path = OsString::from(base.as_os_str());
    path.push(suffix);
    PathBuf::from(path)
}

fn read_source(path: &Path) -> EngineResult<String> {
    std::fs::read_to_string(path).map_err(|source| EngineError::AssetIo {
        path: path.to_path_buf(),
        source,
    })
}

/// Engine lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// Built; systems can still be added before `initialize`.
    Created,
    /// Initialized; frames can run.
    Running,
    /// Shut down; terminal.
    Stopped,
}

/// What happened during one [`Engine::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    /// Index of the frame that just ran, starting at zero.
    pub frame: u64,
    /// Delta time after clamping.
    pub dt: f32,
    /// Alive entities at the end of the frame.
    pub entities: usize,
    /// Draws the render system submitted.
    pub draw_calls: usize,
    /// Time spent in system updates.
    pub update_time: Duration,
}

/// The runtime.
pub struct Engine<P: Platform> {
    config: EngineConfig,
    ecs: Orchestrator<EngineContext>,
    context: EngineContext,
    platform: P,
    state: EngineState,
    shutdown_requested: bool,
    frame_count: u64,
    framebuffer: (u32, u32),
}

impl<P: Platform> Engine<P> {
    /// Creates an engine with the built-in components and [`MotionSystem`]
    /// registered. Nothing touches the renderer until
    /// [`initialize`](Self::initialize).
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidConfig`].
    pub fn new(
        config: EngineConfig,
        platform: P,
        renderer: Box<dyn Renderer>,
    ) -> EngineResult<Self> {
        config.validate()?;

        let mut ecs = Orchestrator::try_new(config.ecs)?;
        ecs.register_component::<Transform2D>()?;
        ecs.register_component::<Velocity2D>()?;
        ecs.register_component::<Sprite>()?;
        ecs.create_system::<MotionSystem, (Transform2D, Velocity2D)>()?;

        let framebuffer = platform.framebuffer_size();
        debug!(?framebuffer, api = ?config.render_api, "engine created");

        Ok(Self {
            config,
            ecs,
            context: EngineContext::new(renderer),
            platform,
            state: EngineState::Created,
            shutdown_requested: false,
            frame_count: 0,
            framebuffer,
        })
    }

    /// Like [`new`](Self::new), building the renderer named by
    /// `config.render_api`.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnsupportedRenderApi`] or
    /// [`EngineError::InvalidConfig`].
    pub fn with_config(config: EngineConfig, platform: P) -> EngineResult<Self> {
        let renderer = create_renderer(config.render_api)?;
        Self::new(config, platform, renderer)
    }

    /// Initializes the renderer, registers [`RenderSystem`] after every
    /// system added so far, and runs each system's `initialize`.
    ///
    /// # Errors
    ///
    /// [`EngineError::AlreadyInitialized`] or [`EngineError::Render`].
    pub fn initialize(&mut self) -> EngineResult<()> {
        if self.state != EngineState::Created {
            return Err(EngineError::AlreadyInitialized);
        }

        let (width, height) = self.platform.framebuffer_size();
        self.framebuffer = (width, height);
        self.context.renderer.initialize(RendererInitInfo {
            width,
            height,
            api: self.config.render_api,
        })?;

        self.ecs.create_system::<RenderSystem, (Transform2D, Sprite)>()?;
        self.ecs.initialize_systems(&mut self.context);
        self.state = EngineState::Running;

        info!(
            title = %self.config.window.title,
            width,
            height,
            systems = self.ecs.systems().len(),
            "engine initialized"
        );
        Ok(())
    }

    /// Runs one frame with the given delta time, clamped to
    /// `timing.max_delta_seconds`.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotInitialized`] or [`EngineError::Render`].
    pub fn tick(&mut self, dt: f32) -> EngineResult<FrameStats> {
        if self.state != EngineState::Running {
            return Err(EngineError::NotInitialized);
        }

        // 1. POLL
        self.platform.poll_events();
        let size = self.platform.framebuffer_size();
        if size != self.framebuffer {
            debug!(from = ?self.framebuffer, to = ?size, "framebuffer resized");
            self.context.renderer.resize(size.0, size.1)?;
            self.framebuffer = size;
        }

        // 2. BEGIN
        let dt = if dt.is_finite() { dt } else { 0.0 };
        let dt = dt.clamp(0.0, self.config.timing.max_delta_seconds);
        let frame_data = self.context.frame_data;
        self.context.renderer.set_frame_data(frame_data);
        self.context.renderer.begin_frame()?;

        // 3. UPDATE
        let update_start = Instant::now();
        self.ecs.update_systems(dt, &mut self.context);
        let update_time = update_start.elapsed();

        // 4. END
        self.context.renderer.end_frame()?;

        let stats = FrameStats {
            frame: self.frame_count,
            dt,
            entities: self.ecs.alive_count(),
            draw_calls: self.ecs.system::<RenderSystem>().map_or(0, RenderSystem::submitted),
            update_time,
        };
        self.frame_count += 1;
        Ok(stats)
    }

    /// Initializes if needed, then runs frames with wall-clock delta time
    /// until [`should_shutdown`](Self::should_shutdown), then shuts down.
    /// Returns the number of frames run.
    ///
    /// # Errors
    ///
    /// Any error from [`initialize`](Self::initialize) or
    /// [`tick`](Self::tick). The engine is shut down before the error is
    /// returned.
    pub fn run(&mut self) -> EngineResult<u64> {
        if self.state == EngineState::Created {
            self.initialize()?;
        }

        let slow_frame = Duration::from_millis(self.config.timing.slow_frame_ms);
        let first_frame = self.frame_count;
        let mut last = Instant::now();

        while !self.should_shutdown() {
            let now = Instant::now();
            let dt = now.duration_since(last).as_secs_f32();
            last = now;

            let stats = match self.tick(dt) {
                Ok(stats) => stats,
                Err(error) => {
                    self.shutdown();
                    return Err(error);
                }
            };

            let frame_time = now.elapsed();
            if frame_time > slow_frame {
                warn!(
                    frame = stats.frame,
                    frame_ms = frame_time.as_secs_f64() * 1000.0,
                    budget_ms = self.config.timing.slow_frame_ms,
                    "frame exceeded budget"
                );
            }
        }

        self.shutdown();
        Ok(self.frame_count - first_frame)
    }

    /// Asks [`run`](Self::run) to stop after the current frame.
    pub fn request_shutdown(&mut self) {
        self.shutdown_requested = true;
    }

    /// Returns true once shutdown was requested, the platform wants to
    /// close, or the engine already stopped.
    #[must_use]
    pub fn should_shutdown(&self) -> bool {
        self.shutdown_requested
            || self.state == EngineState::Stopped
            || self.platform.should_close()
    }

    /// Shuts systems down in registration order, frees every asset and
    /// cleans up the renderer. Calling it again does nothing.
    pub fn shutdown(&mut self) {
        match self.state {
            EngineState::Stopped => return,
            EngineState::Running => self.ecs.shutdown_systems(&mut self.context),
            EngineState::Created => {}
        }

        self.context.unload_all();
        self.context.renderer.cleanup();
        self.state = EngineState::Stopped;
        info!(frames = self.frame_count, "engine shut down");
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Frames completed so far.
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The ECS.
    #[must_use]
    pub fn ecs(&self) -> &Orchestrator<EngineContext> {
        &self.ecs
    }

    /// The ECS, mutably. Use it to spawn entities and register game
    /// components and systems.
    pub fn ecs_mut(&mut self) -> &mut Orchestrator<EngineContext> {
        &mut self.ecs
    }

    /// Registers a game system requiring the component types in `Q`. It runs
    /// after the systems registered before it and, if added before
    /// [`initialize`](Self::initialize), before the render system.
    ///
    /// # Errors
    ///
    /// [`EngineError::Ecs`].
    pub fn add_system<S, Q>(&mut self, system: S) -> EngineResult<SystemHandle<S>>
    where
        S: System<EngineContext>,
        Q: ComponentSet,
    {
        Ok(self.ecs.create_system_with::<S, Q>(system)?)
    }

    /// Collaborators shared with systems.
    #[must_use]
    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    /// Collaborators shared with systems, mutably. Use it to load assets.
    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.context
    }

    /// The platform.
    #[must_use]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// The platform, mutably.
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }
}
