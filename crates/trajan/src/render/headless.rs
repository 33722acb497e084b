//! In-memory renderer for servers, tests and CI.
//!
//! Performs the same state checks a GPU backend would and records what was
//! drawn instead of drawing it.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::{
    FrameData, GpuHandle, MeshDescriptor, RenderCommand, RenderError, Renderer, RendererInitInfo,
    ResourceKind, ShaderDescriptor, TextureDescriptor,
};

/// A completed frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordedFrame {
    /// Camera data in effect when the frame began.
    pub frame_data: FrameData,
    /// Draws in submission order.
    pub commands: Vec<RenderCommand>,
}

/// Renderer that records frames instead of drawing them.
#[derive(Debug)]
pub struct HeadlessRenderer {
    info: Option<RendererInitInfo>,
    pending_frame_data: FrameData,
    /// Open frame, if any.
    current: Option<RecordedFrame>,
    last_frame: Option<RecordedFrame>,
    frames_completed: u64,
    next_handle: u64,
    resources: HashMap<GpuHandle, ResourceKind>,
}

impl HeadlessRenderer {
    /// Creates an uninitialized renderer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            info: None,
            pending_frame_data: FrameData::default(),
            current: None,
            last_frame: None,
            frames_completed: 0,
            next_handle: 1,
            resources: HashMap::new(),
        }
    }

    /// Returns true between `initialize` and `cleanup`.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.info.is_some()
    }

    /// Current framebuffer size.
    #[must_use]
    pub fn size(&self) -> Option<(u32, u32)> {
        self.info.map(|info| (info.width, info.height))
    }

    /// Returns true while a frame is open.
    #[must_use]
    pub fn in_frame(&self) -> bool {
        self.current.is_some()
    }

    /// Number of `end_frame` calls since creation.
    #[must_use]
    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    /// The most recently completed frame.
    #[must_use]
    pub fn last_frame(&self) -> Option<&RecordedFrame> {
        self.last_frame.as_ref()
    }

    /// Number of live resources of `kind`.
    #[must_use]
    pub fn live_count(&self, kind: ResourceKind) -> usize {
        self.resources.values().filter(|&&k| k == kind).count()
    }

    /// Returns true if `handle` is a live resource of `kind`.
    #[must_use]
    pub fn is_live(&self, kind: ResourceKind, handle: GpuHandle) -> bool {
        self.resources.get(&handle) == Some(&kind)
    }

    fn require_initialized(&self) -> Result<(), RenderError> {
        if self.info.is_some() {
            Ok(())
        } else {
            Err(RenderError::NotInitialized)
        }
    }

    fn allocate(&mut self, kind: ResourceKind) -> GpuHandle {
        let handle = GpuHandle::from_raw(self.next_handle);
        self.next_handle += 1;
        self.resources.insert(handle, kind);
        trace!(%kind, ?handle, "resource created");
        handle
    }

    fn check(&self, kind: ResourceKind, handle: GpuHandle) -> Result<(), RenderError> {
        if self.is_live(kind, handle) {
            Ok(())
        } else {
            Err(RenderError::UnknownHandle { kind, handle })
        }
    }

    fn free(&mut self, kind: ResourceKind, handle: GpuHandle) -> Result<(), RenderError> {
        self.check(kind, handle)?;
        self.resources.remove(&handle);
        trace!(%kind, ?handle, "resource destroyed");
        Ok(())
    }
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for HeadlessRenderer {
    fn initialize(&mut self, info: RendererInitInfo) -> Result<(), RenderError> {
        if self.info.is_some() {
            return Err(RenderError::AlreadyInitialized);
        }
        debug!(width = info.width, height = info.height, "headless renderer initialized");
        self.info = Some(info);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        let info = self.info.as_mut().ok_or(RenderError::NotInitialized)?;
        info.width = width;
        info.height = height;
        debug!(width, height, "framebuffer resized");
        Ok(())
    }

    fn set_frame_data(&mut self, frame_data: FrameData) {
        self.pending_frame_data = frame_data;
    }

    fn begin_frame(&mut self) -> Result<(), RenderError> {
        self.require_initialized()?;
        if self.current.is_some() {
            return Err(RenderError::FrameInProgress);
        }
        self.current = Some(RecordedFrame {
            frame_data: self.pending_frame_data,
            commands: Vec::new(),
        });
        Ok(())
    }

    fn submit(&mut self, command: RenderCommand) -> Result<(), RenderError> {
        if self.current.is_none() {
            return Err(RenderError::NoFrameInProgress);
        }
        self.check(ResourceKind::Mesh, command.mesh)?;
        self.check(ResourceKind::Shader, command.shader)?;
        if let Some(texture) = command.texture {
            self.check(ResourceKind::Texture, texture)?;
        }

        if let Some(frame) = self.current.as_mut() {
            frame.commands.push(command);
        }
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        let frame = self.current.take().ok_or(RenderError::NoFrameInProgress)?;
        trace!(commands = frame.commands.len(), "frame recorded");
        self.frames_completed += 1;
        self.last_frame = Some(frame);
        Ok(())
    }

    fn create_mesh(&mut self, desc: &MeshDescriptor) -> Result<GpuHandle, RenderError> {
        self.require_initialized()?;
        let stride = desc.layout.effective_stride();
        if stride == 0 || desc.vertices.len() % stride as usize != 0 {
            return Err(RenderError::InvalidDescriptor {
                kind: ResourceKind::Mesh,
                reason: format!(
                    "{} vertex bytes do not divide into stride {stride}",
                    desc.vertices.len()
                ),
            });
        }
        let vertex_count = desc.vertex_count();
        if let Some(&index) = desc.indices.iter().find(|&&i| i >= vertex_count) {
            return Err(RenderError::InvalidDescriptor {
                kind: ResourceKind::Mesh,
                reason: format!("index {index} out of range for {vertex_count} vertices"),
            });
        }
        Ok(self.allocate(ResourceKind::Mesh))
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<GpuHandle, RenderError> {
        self.require_initialized()?;
        let expected = desc.width as usize * desc.height as usize * 4;
        if desc.width == 0 || desc.height == 0 || desc.pixels.len() != expected {
            return Err(RenderError::InvalidDescriptor {
                kind: ResourceKind::Texture,
                reason: format!(
                    "{}x{} RGBA8 needs {expected} bytes, got {}",
                    desc.width,
                    desc.height,
                    desc.pixels.len()
                ),
            });
        }
        Ok(self.allocate(ResourceKind::Texture))
    }

    fn create_shader(&mut self, desc: &ShaderDescriptor) -> Result<GpuHandle, RenderError> {
        self.require_initialized()?;
        if desc.vertex_source.trim().is_empty() || desc.fragment_source.trim().is_empty() {
            return Err(RenderError::InvalidDescriptor {
                kind: ResourceKind::Shader,
                reason: "both stages need source".to_owned(),
            });
        }
        Ok(self.allocate(ResourceKind::Shader))
    }

    fn destroy_mesh(&mut self, handle: GpuHandle) -> Result<(), RenderError> {
        self.free(ResourceKind::Mesh, handle)
    }

    fn destroy_texture(&mut self, handle: GpuHandle) -> Result<(), RenderError> {
        self.free(ResourceKind::Texture, handle)
    }

    fn destroy_shader(&mut self, handle: GpuHandle) -> Result<(), RenderError> {
        self.free(ResourceKind::Shader, handle)
    }

    fn cleanup(&mut self) {
        if self.info.take().is_some() {
            debug!(leaked = self.resources.len(), "headless renderer cleaned up");
        }
        self.resources.clear();
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Mat4;
    use crate::render::{RenderApi, VertexAttrib, VertexLayout, VertexSemantic};

    fn initialized() -> HeadlessRenderer {
        let mut renderer = HeadlessRenderer::new();
        renderer
            .initialize(RendererInitInfo {
                width: 320,
                height: 240,
                api: RenderApi::Headless,
            })
            .unwrap();
        renderer
    }

    fn triangle() -> MeshDescriptor {
        MeshDescriptor {
            vertices: vec![0; 3 * 8],
            indices: vec![0, 1, 2],
            layout: VertexLayout {
                stride: 0,
                attribs: vec![VertexAttrib::float(VertexSemantic::Position, 2, 0)],
            },
        }
    }

    fn shader() -> ShaderDescriptor {
        ShaderDescriptor {
            vertex_source: "void main() {}".into(),
            fragment_source: "void main() {}".into(),
        }
    }

    #[test]
    fn test_requires_initialize() {
        let mut renderer = HeadlessRenderer::new();
        assert_eq!(renderer.begin_frame(), Err(RenderError::NotInitialized));
        assert_eq!(renderer.create_mesh(&triangle()), Err(RenderError::NotInitialized));
    }

    #[test]
    fn test_frame_pairing() {
        let mut renderer = initialized();
        assert_eq!(renderer.end_frame(), Err(RenderError::NoFrameInProgress));

        renderer.begin_frame().unwrap();
        assert_eq!(renderer.begin_frame(), Err(RenderError::FrameInProgress));
        renderer.end_frame().unwrap();

        assert_eq!(renderer.frames_completed(), 1);
        assert!(!renderer.in_frame());
    }

    #[test]
    fn test_records_commands() {
        let mut renderer = initialized();
        let mesh = renderer.create_mesh(&triangle()).unwrap();
        let program = renderer.create_shader(&shader()).unwrap();
        assert_ne!(mesh, program);
        assert!(!mesh.is_null());

        let fd = FrameData {
            camera_position: crate::math::Vec3::new(0.0, 0.0, 5.0),
            ..FrameData::default()
        };
        renderer.set_frame_data(fd);
        renderer.begin_frame().unwrap();
        renderer.submit(RenderCommand::mesh(mesh, program, Mat4::IDENTITY)).unwrap();
        renderer.submit(RenderCommand::mesh(mesh, program, Mat4::IDENTITY)).unwrap();
        renderer.end_frame().unwrap();

        let frame = renderer.last_frame().unwrap();
        assert_eq!(frame.commands.len(), 2);
        assert_eq!(frame.frame_data, fd);
    }

    #[test]
    fn test_rejects_unknown_handles() {
        let mut renderer = initialized();
        let mesh = renderer.create_mesh(&triangle()).unwrap();
        let program = renderer.create_shader(&shader()).unwrap();

        renderer.begin_frame().unwrap();
        // Swapped handles: kinds are checked, not just liveness
        let err = renderer
            .submit(RenderCommand::mesh(program, mesh, Mat4::IDENTITY))
            .unwrap_err();
        assert!(matches!(err, RenderError::UnknownHandle { kind: ResourceKind::Mesh, .. }));

        renderer.destroy_mesh(mesh).unwrap();
        assert!(matches!(
            renderer.destroy_mesh(mesh),
            Err(RenderError::UnknownHandle { .. })
        ));
        assert_eq!(renderer.live_count(ResourceKind::Mesh), 0);
        assert_eq!(renderer.live_count(ResourceKind::Shader), 1);
    }

    #[test]
    fn test_invalid_descriptors() {
        let mut renderer = initialized();

        let mut bad_index = triangle();
        bad_index.indices.push(7);
        assert!(matches!(
            renderer.create_mesh(&bad_index),
            Err(RenderError::InvalidDescriptor { .. })
        ));

        let texture = TextureDescriptor {
            pixels: vec![255; 10],
            width: 2,
            height: 2,
            ..TextureDescriptor::default()
        };
        assert!(renderer.create_texture(&texture).is_err());
    }

    #[test]
    fn test_cleanup_allows_reinitialize() {
        let mut renderer = initialized();
        renderer.create_shader(&shader()).unwrap();
        renderer.cleanup();

        assert!(!renderer.is_initialized());
        assert_eq!(renderer.live_count(ResourceKind::Shader), 0);
        renderer
            .initialize(RendererInitInfo {
                width: 1,
                height: 1,
                api: RenderApi::Headless,
            })
            .unwrap();
        assert_eq!(renderer.size(), Some((1, 1)));
    }
}
