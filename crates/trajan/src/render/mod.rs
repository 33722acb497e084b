//! # Renderer Interface
//!
//! The engine talks to graphics backends only through [`Renderer`]. A frame
//! looks like:
//!
//! ```text
//! set_frame_data(fd) ─> begin_frame() ─> submit(cmd) * N ─> end_frame()
//! ```
//!
//! GPU resources are created from plain descriptors and referred to by
//! opaque [`GpuHandle`]s afterwards.

mod headless;

use std::fmt;

use bytemuck::{Pod, Zeroable};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use trajan_core::AsAny;

use crate::error::{EngineError, EngineResult};
use crate::math::{Mat4, Vec3};

pub use headless::{HeadlessRenderer, RecordedFrame};

// =============================================================================
// API SELECTION
// =============================================================================

/// Graphics backend selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderApi {
    /// In-memory recorder, no GPU.
    #[default]
    Headless,
    /// OpenGL 4.x.
    OpenGl,
    /// Vulkan 1.x.
    Vulkan,
}

/// Builds the renderer for `api`.
///
/// # Errors
///
/// [`EngineError::UnsupportedRenderApi`] for backends this build does not
/// ship.
pub fn create_renderer(api: RenderApi) -> EngineResult<Box<dyn Renderer>> {
    match api {
        RenderApi::Headless => Ok(Box::new(HeadlessRenderer::new())),
        RenderApi::OpenGl | RenderApi::Vulkan => {
            warn!(?api, "no backend for render API in this build");
            Err(EngineError::UnsupportedRenderApi(api))
        }
    }
}

/// Passed to [`Renderer::initialize`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RendererInitInfo {
    /// Framebuffer width in pixels.
    pub width: u32,
    /// Framebuffer height in pixels.
    pub height: u32,
    /// Backend the caller expects.
    pub api: RenderApi,
}

// =============================================================================
// HANDLES & DESCRIPTORS
// =============================================================================

/// Opaque id of a renderer-owned resource. Zero is never handed out.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GpuHandle(u64);

impl GpuHandle {
    /// The "no resource" handle.
    pub const NULL: Self = Self(0);

    /// Wraps a raw backend id.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw backend id.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns true for [`GpuHandle::NULL`].
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for GpuHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GpuHandle({})", self.0)
    }
}

/// Kind of GPU resource, for error reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Vertex + index buffers.
    Mesh,
    /// Sampled image.
    Texture,
    /// Linked program.
    Shader,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mesh => "mesh",
            Self::Texture => "texture",
            Self::Shader => "shader",
        };
        f.write_str(name)
    }
}

/// What a vertex attribute means to the shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexSemantic {
    /// Object-space position
    Position,
    /// Surface normal
    Normal,
    /// Tangent
    Tangent,
    /// Bitangent
    Bitangent,
    /// Vertex color
    Color0,
    /// Primary UV set
    TexCoord0,
    /// Secondary UV set
    TexCoord1,
    /// Anything else, bound by location
    Custom,
}

/// Scalar type of a vertex attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexDataType {
    /// 32-bit float
    Float32,
    /// 16-bit float
    HalfFloat,
    /// Unsigned byte
    UInt8,
    /// Unsigned short
    UInt16,
    /// Unsigned int
    UInt32,
    /// Signed byte
    Int8,
    /// Signed short
    Int16,
    /// Signed int
    Int32,
    /// Byte normalized to 0..1
    UNorm8,
    /// Short normalized to 0..1
    UNorm16,
}

impl VertexDataType {
    /// Size of one scalar in bytes.
    #[must_use]
    pub const fn size(self) -> u32 {
        match self {
            Self::UInt8 | Self::Int8 | Self::UNorm8 => 1,
            Self::UInt16 | Self::Int16 | Self::UNorm16 | Self::HalfFloat => 2,
            Self::Float32 | Self::UInt32 | Self::Int32 => 4,
        }
    }
}

/// One attribute inside a vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttrib {
    /// Meaning.
    pub semantic: VertexSemantic,
    /// Scalar type.
    pub data_type: VertexDataType,
    /// Scalars per attribute, 1..=4.
    pub components: u8,
    /// Integer data is normalized when read.
    pub normalized: bool,
    /// Byte offset from the vertex start.
    pub offset: u32,
}

impl VertexAttrib {
    /// A tightly packed `f32` attribute.
    #[must_use]
    pub const fn float(semantic: VertexSemantic, components: u8, offset: u32) -> Self {
        Self {
            semantic,
            data_type: VertexDataType::Float32,
            components,
            normalized: false,
            offset,
        }
    }

    /// Bytes covered by the attribute, starting at `offset`.
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.offset + self.data_type.size() * self.components as u32
    }
}

/// Vertex layout of a mesh.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexLayout {
    /// Bytes per vertex. Zero means "derive from the attributes".
    pub stride: u32,
    /// Attributes in any order.
    pub attribs: Vec<VertexAttrib>,
}

impl VertexLayout {
    /// Stride actually used: the explicit one, or the furthest attribute end.
    #[must_use]
    pub fn effective_stride(&self) -> u32 {
        if self.stride != 0 {
            return self.stride;
        }
        self.attribs.iter().map(VertexAttrib::end).max().unwrap_or(0)
    }
}

/// Everything needed to upload a mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshDescriptor {
    /// Raw vertex bytes.
    pub vertices: Vec<u8>,
    /// `u32` indices; empty for non-indexed draws.
    pub indices: Vec<u32>,
    /// Vertex layout.
    pub layout: VertexLayout,
}

impl MeshDescriptor {
    /// Number of whole vertices in `vertices`.
    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        match self.layout.effective_stride() {
            0 => 0,
            stride => (self.vertices.len() / stride as usize) as u32,
        }
    }

    /// Number of indices.
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

/// Everything needed to upload a texture (RGBA8).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextureDescriptor {
    /// Tightly packed RGBA8 pixels.
    pub pixels: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Build a mip chain on upload.
    pub generate_mipmaps: bool,
    /// Pixels are sRGB encoded.
    pub srgb: bool,
}

/// Shader sources.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShaderDescriptor {
    /// Vertex stage source.
    pub vertex_source: String,
    /// Fragment stage source.
    pub fragment_source: String,
}

// =============================================================================
// PER-FRAME DATA
// =============================================================================

/// A per-draw uniform value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    /// `int`
    Int(i32),
    /// `float`
    Float(f32),
    /// `mat4`
    Mat4(Mat4),
}

/// A named per-draw uniform.
#[derive(Clone, Debug, PartialEq)]
pub struct Uniform {
    /// Name in the shader.
    pub name: String,
    /// Value.
    pub value: UniformValue,
}

/// Camera data shared by every draw in a frame.
///
/// Laid out for direct upload into a uniform buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FrameData {
    /// World → view.
    pub view: Mat4,
    /// View → clip.
    pub projection: Mat4,
    /// Camera position in world space.
    pub camera_position: Vec3,
    /// Pads the block to a 16-byte multiple.
    pub _padding: f32,
}

/// One draw.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderCommand {
    /// Mesh to draw.
    pub mesh: GpuHandle,
    /// Program to draw it with.
    pub shader: GpuHandle,
    /// Optional texture bound to unit 0.
    pub texture: Option<GpuHandle>,
    /// Model matrix.
    pub transform: Mat4,
    /// Extra uniforms.
    pub uniforms: Vec<Uniform>,
}

impl RenderCommand {
    /// Untextured mesh draw with no extra uniforms.
    #[must_use]
    pub fn mesh(mesh: GpuHandle, shader: GpuHandle, transform: Mat4) -> Self {
        Self {
            mesh,
            shader,
            texture: None,
            transform,
            uniforms: Vec::new(),
        }
    }
}

// =============================================================================
// RENDERER
// =============================================================================

/// Renderer failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Called before [`Renderer::initialize`].
    #[error("renderer not initialized")]
    NotInitialized,

    /// [`Renderer::initialize`] called twice.
    #[error("renderer already initialized")]
    AlreadyInitialized,

    /// `submit` or `end_frame` outside `begin_frame`/`end_frame`.
    #[error("no frame in progress")]
    NoFrameInProgress,

    /// `begin_frame` while a frame is open.
    #[error("frame already in progress")]
    FrameInProgress,

    /// Handle does not name a live resource of that kind.
    #[error("unknown {kind} handle {handle:?}")]
    UnknownHandle {
        /// Expected resource kind.
        kind: ResourceKind,
        /// Offending handle.
        handle: GpuHandle,
    },

    /// Descriptor contents are inconsistent.
    #[error("invalid {kind} descriptor: {reason}")]
    InvalidDescriptor {
        /// Resource kind.
        kind: ResourceKind,
        /// What is wrong.
        reason: String,
    },
}

/// A graphics backend.
///
/// `AsAny` lets callers that know the concrete backend reach its extra API
/// (see [`EngineContext::renderer_as`](crate::EngineContext::renderer_as)).
pub trait Renderer: AsAny {
    /// Prepares the backend for drawing.
    ///
    /// # Errors
    ///
    /// [`RenderError::AlreadyInitialized`].
    fn initialize(&mut self, info: RendererInitInfo) -> Result<(), RenderError>;

    /// Framebuffer size changed.
    ///
    /// # Errors
    ///
    /// [`RenderError::NotInitialized`].
    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    /// Sets the camera data used by the next frame.
    fn set_frame_data(&mut self, frame_data: FrameData);

    /// Opens a frame.
    ///
    /// # Errors
    ///
    /// [`RenderError::NotInitialized`] or [`RenderError::FrameInProgress`].
    fn begin_frame(&mut self) -> Result<(), RenderError>;

    /// Queues one draw.
    ///
    /// # Errors
    ///
    /// [`RenderError::NoFrameInProgress`] or [`RenderError::UnknownHandle`].
    fn submit(&mut self, command: RenderCommand) -> Result<(), RenderError>;

    /// Closes and presents the frame.
    ///
    /// # Errors
    ///
    /// [`RenderError::NoFrameInProgress`].
    fn end_frame(&mut self) -> Result<(), RenderError>;

    /// Uploads a mesh.
    ///
    /// # Errors
    ///
    /// [`RenderError::NotInitialized`] or [`RenderError::InvalidDescriptor`].
    fn create_mesh(&mut self, desc: &MeshDescriptor) -> Result<GpuHandle, RenderError>;

    /// Uploads a texture.
    ///
    /// # Errors
    ///
    /// [`RenderError::NotInitialized`] or [`RenderError::InvalidDescriptor`].
    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<GpuHandle, RenderError>;

    /// Compiles and links a shader.
    ///
    /// # Errors
    ///
    /// [`RenderError::NotInitialized`] or [`RenderError::InvalidDescriptor`].
    fn create_shader(&mut self, desc: &ShaderDescriptor) -> Result<GpuHandle, RenderError>;

    /// Frees a mesh.
    ///
    /// # Errors
    ///
    /// [`RenderError::UnknownHandle`].
    fn destroy_mesh(&mut self, handle: GpuHandle) -> Result<(), RenderError>;

    /// Frees a texture.
    ///
    /// # Errors
    ///
    /// [`RenderError::UnknownHandle`].
    fn destroy_texture(&mut self, handle: GpuHandle) -> Result<(), RenderError>;

    /// Frees a shader.
    ///
    /// # Errors
    ///
    /// [`RenderError::UnknownHandle`].
    fn destroy_shader(&mut self, handle: GpuHandle) -> Result<(), RenderError>;

    /// Releases every backend resource. The renderer may be initialized again
    /// afterwards.
    fn cleanup(&mut self);
}
