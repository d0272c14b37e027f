//! Environment prefiltering: equirectangular HDR to the cubemaps used for
//! image-based lighting.
//!
//! Three compute stages: equirect to a base cubemap, a diffuse irradiance
//! convolution, and a GGX-prefiltered specular chain with one mip per
//! roughness step. The prefilter object owns only the pipelines; it is
//! created for the conversion and dropped right after, and the intermediate
//! equirect/base-cube textures are destroyed as soon as the maps exist.

use wgpu::util::DeviceExt;

use crate::assets::EquirectImage;

pub const SPECULAR_SIZE: u32 = 128;
pub const SPECULAR_MIPS: u32 = 5;
pub const IRRADIANCE_SIZE: u32 = 32;

/// Filtered lighting resource shared by the scene's ambient lighting and its
/// visible background. Lives for the whole session.
pub struct EnvironmentMap {
    specular: wgpu::Texture,
    pub specular_view: wgpu::TextureView,
    irradiance: wgpu::Texture,
    pub irradiance_view: wgpu::TextureView,
    pub mip_count: u32,
}

impl EnvironmentMap {
    pub fn dispose(&mut self) {
        self.specular.destroy();
        self.irradiance.destroy();
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ConvolveParams {
    face_size: u32,
    sample_count: u32,
    roughness: f32,
    _pad: u32,
}

pub struct EnvironmentPrefilter {
    equirect_layout: wgpu::BindGroupLayout,
    convolve_layout: wgpu::BindGroupLayout,
    equirect_pipeline: wgpu::ComputePipeline,
    irradiance_pipeline: wgpu::ComputePipeline,
    specular_pipeline: wgpu::ComputePipeline,
    sampler: wgpu::Sampler,
}

impl EnvironmentPrefilter {
    pub fn new(device: &wgpu::Device) -> Self {
        let equirect_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("equirect to cube"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/equirect_to_cube.wgsl").into()),
        });
        let irradiance_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("irradiance convolve"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/irradiance.wgsl").into()),
        });
        let specular_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("specular prefilter"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!("shaders/prefilter_specular.wgsl").into(),
            ),
        });

        let equirect_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("equirect layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba16Float,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                    },
                    count: None,
                },
            ],
        });

        let convolve_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("convolve layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba16Float,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                    },
                    count: None,
                },
            ],
        });

        let equirect_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("equirect pipeline layout"),
                bind_group_layouts: &[&equirect_layout],
                push_constant_ranges: &[],
            });
        let convolve_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("convolve pipeline layout"),
                bind_group_layouts: &[&convolve_layout],
                push_constant_ranges: &[],
            });

        let equirect_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("equirect to cube"),
            layout: Some(&equirect_pipeline_layout),
            module: &equirect_shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });
        let irradiance_pipeline =
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("irradiance convolve"),
                layout: Some(&convolve_pipeline_layout),
                module: &irradiance_shader,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            });
        let specular_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("specular prefilter"),
            layout: Some(&convolve_pipeline_layout),
            module: &specular_shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("prefilter sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            equirect_layout,
            convolve_layout,
            equirect_pipeline,
            irradiance_pipeline,
            specular_pipeline,
            sampler,
        }
    }

    /// Run the full conversion. Source and intermediate textures are
    /// destroyed before returning.
    pub fn prefilter(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        equirect: &EquirectImage,
    ) -> EnvironmentMap {
        let equirect_tex = self.upload_equirect(device, queue, equirect);
        let base_cube = create_cube(device, "environment base cube", SPECULAR_SIZE, 1);
        let specular = create_cube(device, "environment specular", SPECULAR_SIZE, SPECULAR_MIPS);
        let irradiance = create_cube(device, "environment irradiance", IRRADIANCE_SIZE, 1);

        let base_cube_view = cube_view(&base_cube, "base cube view");

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("environment prefilter"),
        });

        // Equirect to the base cubemap.
        {
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("equirect bind group"),
                layout: &self.equirect_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(
                            &equirect_tex.create_view(&wgpu::TextureViewDescriptor::default()),
                        ),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&storage_face_view(
                            &base_cube, 0,
                        )),
                    },
                ],
            });
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("equirect to cube"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.equirect_pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(SPECULAR_SIZE / 8, SPECULAR_SIZE / 8, 6);
        }

        // Diffuse irradiance.
        self.convolve_pass(
            device,
            &mut encoder,
            &self.irradiance_pipeline,
            &base_cube_view,
            &storage_face_view(&irradiance, 0),
            ConvolveParams {
                face_size: IRRADIANCE_SIZE,
                sample_count: 512,
                roughness: 0.0,
                _pad: 0,
            },
            IRRADIANCE_SIZE,
        );

        // Specular chain, one roughness step per mip.
        for mip in 0..SPECULAR_MIPS {
            let face_size = SPECULAR_SIZE >> mip;
            self.convolve_pass(
                device,
                &mut encoder,
                &self.specular_pipeline,
                &base_cube_view,
                &storage_face_view(&specular, mip),
                ConvolveParams {
                    face_size,
                    sample_count: 256,
                    roughness: mip as f32 / (SPECULAR_MIPS - 1) as f32,
                    _pad: 0,
                },
                face_size,
            );
        }

        queue.submit(Some(encoder.finish()));

        // The source image and the unfiltered cube are no longer needed;
        // destruction is deferred past the in-flight work by wgpu.
        equirect_tex.destroy();
        base_cube.destroy();

        let specular_view = cube_view(&specular, "specular view");
        let irradiance_view = cube_view(&irradiance, "irradiance view");
        EnvironmentMap {
            specular,
            specular_view,
            irradiance,
            irradiance_view,
            mip_count: SPECULAR_MIPS,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn convolve_pass(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::ComputePipeline,
        source: &wgpu::TextureView,
        target: &wgpu::TextureView,
        params: ConvolveParams,
        face_size: u32,
    ) {
        let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("convolve params"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("convolve bind group"),
            layout: &self.convolve_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(target),
                },
            ],
        });
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("environment convolve"),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        let groups = face_size.div_ceil(8).max(1);
        pass.dispatch_workgroups(groups, groups, 6);
    }

    fn upload_equirect(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        equirect: &EquirectImage,
    ) -> wgpu::Texture {
        let size = wgpu::Extent3d {
            width: equirect.width,
            height: equirect.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("equirect source"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
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
            bytemuck::cast_slice(&equirect.pixels),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(16 * equirect.width),
                rows_per_image: Some(equirect.height),
            },
            size,
        );
        texture
    }
}

fn create_cube(device: &wgpu::Device, label: &str, size: u32, mips: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 6,
        },
        mip_level_count: mips,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba16Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::STORAGE_BINDING,
        view_formats: &[],
    })
}

fn cube_view(texture: &wgpu::Texture, label: &str) -> wgpu::TextureView {
    texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some(label),
        dimension: Some(wgpu::TextureViewDimension::Cube),
        ..Default::default()
    })
}

fn storage_face_view(texture: &wgpu::Texture, mip: u32) -> wgpu::TextureView {
    texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("storage face view"),
        dimension: Some(wgpu::TextureViewDimension::D2Array),
        base_mip_level: mip,
        mip_level_count: Some(1),
        ..Default::default()
    })
}
