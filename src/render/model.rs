//! GPU instantiation of a loaded model: vertex/index buffers, per-node
//! transform uniforms, and materials with a swappable base texture.
//!
//! Resource lifetime rules live here. The base-texture slot is an atomic
//! bind-then-release operation, and `dispose` releases textures and geometry
//! before the owning material and mesh objects.

use wgpu::util::DeviceExt;

use crate::assets::TextureImage;
use crate::scene::{Model, NodeKind};

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2],
    };
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct NodeUniform {
    model: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialUniform {
    base_color: [f32; 4],
    /// x: roughness, y: metalness, z: has base texture, w: unused.
    params: [f32; 4],
}

/// Layout and fallback resources shared by every material bind group.
pub struct MaterialShared<'a> {
    pub layout: &'a wgpu::BindGroupLayout,
    pub white_view: &'a wgpu::TextureView,
    pub sampler: &'a wgpu::Sampler,
}

/// A GPU-resident 2D texture plus its default view.
#[derive(Debug)]
pub struct GpuTexture {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &TextureImage,
        label: &str,
    ) -> Self {
        let format = if image.srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let size = wgpu::Extent3d {
            width: image.width.max(1),
            height: image.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.width),
                rows_per_image: Some(size.height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// 1x1 opaque white, the stand-in for materials without a base texture.
    pub fn white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::from_image(
            device,
            queue,
            &TextureImage {
                pixels: vec![0xff; 4],
                width: 1,
                height: 1,
                srgb: true,
            },
            "white texture",
        )
    }

    /// Release the GPU allocation. The view becomes unusable with it.
    pub fn dispose(&self) {
        self.texture.destroy();
    }
}

/// One primitive's surface state on the GPU.
#[derive(Debug)]
pub struct GpuMaterial {
    pub base_color: [f32; 4],
    pub roughness: f32,
    pub metalness: f32,
    map: Option<GpuTexture>,
    uniform: wgpu::Buffer,
    bind_group: Option<wgpu::BindGroup>,
    dirty: bool,
}

impl GpuMaterial {
    fn new(
        device: &wgpu::Device,
        base_color: [f32; 4],
        roughness: f32,
        metalness: f32,
        map: Option<GpuTexture>,
    ) -> Self {
        let uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("material uniform"),
            size: std::mem::size_of::<MaterialUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            base_color,
            roughness,
            metalness,
            map,
            uniform,
            bind_group: None,
            dirty: true,
        }
    }

    pub fn has_map(&self) -> bool {
        self.map.is_some()
    }

    /// Overwrite the surface factors and mark the material for re-upload.
    pub fn set_surface(&mut self, base_color: [f32; 4], roughness: f32, metalness: f32) {
        self.base_color = base_color;
        self.roughness = roughness;
        self.metalness = metalness;
        self.dirty = true;
    }

    /// Swap the base texture. The new texture is bound before the previous
    /// one is released, so the slot never holds a destroyed image.
    pub fn bind_base_texture(&mut self, new: GpuTexture) {
        let previous = self.map.replace(new);
        self.bind_group = None;
        self.dirty = true;
        if let Some(previous) = previous {
            previous.dispose();
        }
    }

    fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, shared: &MaterialShared) {
        if self.dirty {
            let uniform = MaterialUniform {
                base_color: self.base_color,
                params: [
                    self.roughness,
                    self.metalness,
                    if self.map.is_some() { 1.0 } else { 0.0 },
                    0.0,
                ],
            };
            queue.write_buffer(&self.uniform, 0, bytemuck::bytes_of(&uniform));
            self.dirty = false;
        }
        if self.bind_group.is_none() {
            let view = self
                .map
                .as_ref()
                .map(|texture| &texture.view)
                .unwrap_or(shared.white_view);
            self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("material bind group"),
                layout: shared.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.uniform.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(shared.sampler),
                    },
                ],
            }));
        }
    }

    fn release_texture(&mut self) {
        self.bind_group = None;
        if let Some(map) = self.map.take() {
            map.dispose();
        }
    }

    fn release_object(&mut self) {
        self.uniform.destroy();
    }
}

#[derive(Debug)]
pub struct GpuPrimitive {
    vertex_buf: wgpu::Buffer,
    index_buf: wgpu::Buffer,
    index_count: u32,
    pub material: GpuMaterial,
}

impl GpuPrimitive {
    fn dispose(&mut self) {
        // Bound images and geometry buffers go first, the owning material
        // object last.
        self.material.release_texture();
        self.vertex_buf.destroy();
        self.index_buf.destroy();
        self.material.release_object();
    }
}

struct GpuMeshNode {
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    primitives: Vec<GpuPrimitive>,
}

/// GPU resources for every mesh node of a model, indexed in parallel with
/// the scene arena. Nodes without geometry have no entry and disposal skips
/// them silently.
pub struct GpuModel {
    nodes: Vec<Option<GpuMeshNode>>,
}

impl GpuModel {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        model: &Model,
        node_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let mut nodes = Vec::with_capacity(model.nodes.len());
        for node in &model.nodes {
            let NodeKind::Mesh(mesh) = &node.kind else {
                nodes.push(None);
                continue;
            };
            let mut primitives = Vec::with_capacity(mesh.primitives.len());
            for prim in &mesh.primitives {
                let vertices: Vec<Vertex> = prim
                    .positions
                    .iter()
                    .enumerate()
                    .map(|(i, position)| Vertex {
                        position: *position,
                        normal: prim.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                        uv: prim.uvs.get(i).copied().unwrap_or([0.0, 0.0]),
                    })
                    .collect();
                let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("mesh vertices"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("mesh indices"),
                    contents: bytemuck::cast_slice(&prim.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
                let map = prim.material.base_texture.as_ref().map(|image| {
                    GpuTexture::from_image(device, queue, image, "material base texture")
                });
                primitives.push(GpuPrimitive {
                    vertex_buf,
                    index_buf,
                    index_count: prim.indices.len() as u32,
                    material: GpuMaterial::new(
                        device,
                        prim.material.base_color,
                        prim.material.roughness,
                        prim.material.metalness,
                        map,
                    ),
                });
            }
            let uniform = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("node uniform"),
                size: std::mem::size_of::<NodeUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("node bind group"),
                layout: node_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                }],
            });
            nodes.push(Some(GpuMeshNode {
                uniform,
                bind_group,
                primitives,
            }));
        }
        Self { nodes }
    }

    /// The material the flag texture is applied to: the first primitive
    /// material of the given mesh node.
    pub fn material_mut(&mut self, node: usize) -> Option<&mut GpuMaterial> {
        self.nodes
            .get_mut(node)?
            .as_mut()?
            .primitives
            .first_mut()
            .map(|prim| &mut prim.material)
    }

    /// Upload current global transforms and any dirty material state.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        model: &Model,
        shared: &MaterialShared,
    ) {
        for (index, slot) in self.nodes.iter_mut().enumerate() {
            let Some(gpu_node) = slot else { continue };
            if let Some(node) = model.nodes.get(index) {
                let uniform = NodeUniform {
                    model: node.global.to_cols_array_2d(),
                };
                queue.write_buffer(&gpu_node.uniform, 0, bytemuck::bytes_of(&uniform));
            }
            for prim in &mut gpu_node.primitives {
                prim.material.prepare(device, queue, shared);
            }
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        for gpu_node in self.nodes.iter().flatten() {
            pass.set_bind_group(1, &gpu_node.bind_group, &[]);
            for prim in &gpu_node.primitives {
                let Some(material_group) = prim.material.bind_group.as_ref() else {
                    continue;
                };
                pass.set_bind_group(2, material_group, &[]);
                pass.set_vertex_buffer(0, prim.vertex_buf.slice(..));
                pass.set_index_buffer(prim.index_buf.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..prim.index_count, 0, 0..1);
            }
        }
    }

    /// Recursively release every GPU resource of the subtree: textures and
    /// geometry for every primitive of every node, across all materials.
    pub fn dispose(&mut self) {
        for slot in &mut self.nodes {
            let Some(gpu_node) = slot else { continue };
            for prim in &mut gpu_node.primitives {
                prim.dispose();
            }
            gpu_node.uniform.destroy();
        }
        self.nodes.clear();
    }
}
