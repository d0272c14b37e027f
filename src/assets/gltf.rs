//! glTF import: node hierarchy, mesh primitives, PBR materials, and
//! animation clips, flattened into the CPU scene graph.

use std::path::Path;

use glam::{Mat4, Quat, Vec3};
use gltf::mesh::util::ReadIndices;

use crate::assets::{AssetError, TextureImage};
use crate::scene::animation::{Channel, ChannelValues, Clip, Interpolation};
use crate::scene::{Aabb, MaterialData, MeshData, Model, Node, NodeKind, PrimitiveData, Transform};

/// Import a `.glb`/`.gltf` file into a [`Model`]. Node indices in the arena
/// match the glTF node indices, so animation channels can target them
/// directly.
pub fn load_model(path: &Path) -> Result<Model, AssetError> {
    let (doc, buffers, images) = gltf::import(path).map_err(|source| AssetError::Gltf {
        path: path.display().to_string(),
        source: Box::new(source),
    })?;

    let mut nodes = Vec::with_capacity(doc.nodes().len());
    for node in doc.nodes() {
        let (translation, rotation, scale) = node.transform().decomposed();
        let kind = if let Some(mesh) = node.mesh() {
            NodeKind::Mesh(read_mesh(&mesh, &buffers, &images, path)?)
        } else if node.light().is_some() {
            NodeKind::Light
        } else if node.children().len() > 0 {
            NodeKind::Group
        } else {
            NodeKind::Other
        };
        nodes.push(Node {
            name: node.name().unwrap_or_default().to_string(),
            kind,
            parent: None,
            children: node.children().map(|child| child.index()).collect(),
            local: Transform {
                translation: Vec3::from(translation),
                rotation: Quat::from_array(rotation),
                scale: Vec3::from(scale),
            },
            global: Mat4::IDENTITY,
        });
    }
    for index in 0..nodes.len() {
        for child in nodes[index].children.clone() {
            nodes[child].parent = Some(index);
        }
    }

    let roots = doc
        .default_scene()
        .or_else(|| doc.scenes().next())
        .map(|scene| scene.nodes().map(|node| node.index()).collect())
        .unwrap_or_default();

    let clips = read_clips(&doc, &buffers);

    let mut model = Model { nodes, roots, clips };
    model.update_global_transforms();
    Ok(model)
}

fn read_mesh(
    mesh: &gltf::Mesh,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
    path: &Path,
) -> Result<MeshData, AssetError> {
    let mut primitives = Vec::new();
    for prim in mesh.primitives() {
        let reader = prim.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
        let positions: Vec<[f32; 3]> = match reader.read_positions() {
            Some(iter) => iter.collect(),
            None => continue,
        };
        let normals: Vec<[f32; 3]> = match reader.read_normals() {
            Some(iter) => iter.collect(),
            None => vec![[0.0, 1.0, 0.0]; positions.len()],
        };
        let uvs: Vec<[f32; 2]> = match reader.read_tex_coords(0) {
            Some(coords) => coords.into_f32().collect(),
            None => vec![[0.0, 0.0]; positions.len()],
        };
        let indices: Vec<u32> = match reader.read_indices() {
            Some(ReadIndices::U8(iter)) => iter.map(u32::from).collect(),
            Some(ReadIndices::U16(iter)) => iter.map(u32::from).collect(),
            Some(ReadIndices::U32(iter)) => iter.collect(),
            None => (0..positions.len() as u32).collect(),
        };
        let Some(aabb) = Aabb::from_points(positions.iter().map(|p| Vec3::from(*p))) else {
            continue;
        };
        let material = read_material(&prim.material(), images, path);
        primitives.push(PrimitiveData {
            positions,
            normals,
            uvs,
            indices,
            material,
            aabb,
        });
    }
    Ok(MeshData { primitives })
}

fn read_material(
    material: &gltf::Material,
    images: &[gltf::image::Data],
    path: &Path,
) -> MaterialData {
    let pbr = material.pbr_metallic_roughness();
    let base_texture = pbr
        .base_color_texture()
        .and_then(|info| images.get(info.texture().source().index()))
        .and_then(|data| match convert_image(data) {
            Some(image) => Some(image),
            None => {
                log::warn!(
                    "unsupported base color pixel format {:?} in {}",
                    data.format,
                    path.display()
                );
                None
            }
        });
    MaterialData {
        base_color: pbr.base_color_factor(),
        roughness: pbr.roughness_factor(),
        metalness: pbr.metallic_factor(),
        base_texture,
    }
}

/// Expand the glTF pixel data to RGBA8. Base color is always sRGB.
fn convert_image(data: &gltf::image::Data) -> Option<TextureImage> {
    use gltf::image::Format;
    let pixel_count = (data.width * data.height) as usize;
    let pixels = match data.format {
        Format::R8G8B8A8 => data.pixels.clone(),
        Format::R8G8B8 => {
            let mut out = Vec::with_capacity(pixel_count * 4);
            for rgb in data.pixels.chunks_exact(3) {
                out.extend_from_slice(rgb);
                out.push(0xff);
            }
            out
        }
        Format::R8 => {
            let mut out = Vec::with_capacity(pixel_count * 4);
            for &gray in &data.pixels {
                out.extend_from_slice(&[gray, gray, gray, 0xff]);
            }
            out
        }
        _ => return None,
    };
    Some(TextureImage {
        pixels,
        width: data.width,
        height: data.height,
        srgb: true,
    })
}

fn read_clips(doc: &gltf::Document, buffers: &[gltf::buffer::Data]) -> Vec<Clip> {
    let mut clips = Vec::new();
    for animation in doc.animations() {
        let mut channels = Vec::new();
        for channel in animation.channels() {
            let reader =
                channel.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
            let Some(times) = reader.read_inputs().map(|iter| iter.collect::<Vec<f32>>()) else {
                continue;
            };
            let Some(outputs) = reader.read_outputs() else {
                continue;
            };
            let cubic =
                channel.sampler().interpolation() == gltf::animation::Interpolation::CubicSpline;
            let values = match outputs {
                gltf::animation::util::ReadOutputs::Translations(iter) => ChannelValues::Translations(
                    collapse_cubic(iter.map(Vec3::from).collect(), cubic),
                ),
                gltf::animation::util::ReadOutputs::Rotations(rotations) => ChannelValues::Rotations(
                    collapse_cubic(
                        rotations
                            .into_f32()
                            .map(|q| Quat::from_array(q).normalize())
                            .collect(),
                        cubic,
                    ),
                ),
                gltf::animation::util::ReadOutputs::Scales(iter) => {
                    ChannelValues::Scales(collapse_cubic(iter.map(Vec3::from).collect(), cubic))
                }
                gltf::animation::util::ReadOutputs::MorphTargetWeights(_) => continue,
            };
            let interpolation = match channel.sampler().interpolation() {
                gltf::animation::Interpolation::Step => Interpolation::Step,
                _ => Interpolation::Linear,
            };
            channels.push(Channel {
                node: channel.target().node().index(),
                times,
                values,
                interpolation,
            });
        }
        if !channels.is_empty() {
            clips.push(Clip::new(
                animation.name().unwrap_or("clip").to_string(),
                channels,
            ));
        }
    }
    clips
}

/// Cubic-spline samplers store in-tangent/value/out-tangent triples per key;
/// keep only the values and play them back linearly.
fn collapse_cubic<T: Copy>(values: Vec<T>, cubic: bool) -> Vec<T> {
    if !cubic {
        return values;
    }
    values.chunks_exact(3).map(|triple| triple[1]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cubic_samplers_keep_middle_values() {
        let collapsed = collapse_cubic(vec![0, 1, 2, 3, 4, 5], true);
        assert_eq!(collapsed, vec![1, 4]);
        let untouched = collapse_cubic(vec![0, 1, 2], false);
        assert_eq!(untouched, vec![0, 1, 2]);
    }

    #[test]
    fn missing_model_file_reports_path() {
        let err = load_model(Path::new("no/such/model.glb")).unwrap_err();
        assert!(err.to_string().contains("no/such/model.glb"));
    }
}
