//! CPU-side scene graph for a loaded model.
//!
//! The graph is a flat node arena with parent/child indices and a sum-typed
//! node kind. GPU instantiation lives in `render::model`; everything here is
//! plain data so traversal, framing, and animation stay testable.

pub mod animation;

use glam::{Mat4, Quat, Vec3};

use crate::assets::TextureImage;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut aabb = Self { min: first, max: first };
        for p in iter {
            aabb.min = aabb.min.min(p);
            aabb.max = aabb.max.max(p);
        }
        Some(aabb)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Bounds of the box's eight corners under `matrix`.
    pub fn transform(&self, matrix: Mat4) -> Aabb {
        let mut corners = [Vec3::ZERO; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let select = Vec3::new(
                if i & 1 != 0 { self.max.x } else { self.min.x },
                if i & 2 != 0 { self.max.y } else { self.min.y },
                if i & 4 != 0 { self.max.z } else { self.min.z },
            );
            *corner = matrix.transform_point3(select);
        }
        // Eight corners, so the iterator is never empty.
        Aabb::from_points(corners).unwrap_or(*self)
    }
}

/// Local TRS transform of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Surface description of one primitive, as authored in the source asset.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialData {
    pub base_color: [f32; 4],
    pub roughness: f32,
    pub metalness: f32,
    pub base_texture: Option<TextureImage>,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            roughness: 1.0,
            metalness: 0.0,
            base_texture: None,
        }
    }
}

/// One drawable primitive: geometry plus its material.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub material: MaterialData,
    pub aabb: Aabb,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub primitives: Vec<PrimitiveData>,
}

/// Sum-typed node classification. The flag mesh is located by name among
/// `Mesh` nodes only; groups or lights with the same name never match.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Mesh(MeshData),
    Group,
    Light,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub local: Transform,
    pub global: Mat4,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            children: Vec::new(),
            local: Transform::default(),
            global: Mat4::IDENTITY,
        }
    }
}

/// A loaded model: node arena, scene roots, and any animation clips.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub nodes: Vec<Node>,
    pub roots: Vec<usize>,
    pub clips: Vec<animation::Clip>,
}

impl Model {
    /// Depth-first visitor returning the first mesh node with the given name,
    /// or `None` - an absent mesh is an expected state, not a fault.
    pub fn find_mesh_by_name(&self, name: &str) -> Option<usize> {
        fn visit(nodes: &[Node], index: usize, name: &str) -> Option<usize> {
            let node = nodes.get(index)?;
            if matches!(node.kind, NodeKind::Mesh(_)) && node.name == name {
                return Some(index);
            }
            node.children
                .iter()
                .find_map(|&child| visit(nodes, child, name))
        }
        self.roots
            .iter()
            .find_map(|&root| visit(&self.nodes, root, name))
    }

    /// Propagate local transforms to global matrices, parents first.
    pub fn update_global_transforms(&mut self) {
        fn walk(nodes: &mut [Node], index: usize, parent: Mat4) {
            let global = parent * nodes[index].local.matrix();
            nodes[index].global = global;
            let children = nodes[index].children.clone();
            for child in children {
                walk(nodes, child, global);
            }
        }
        for root in self.roots.clone() {
            walk(&mut self.nodes, root, Mat4::IDENTITY);
        }
    }

    /// World-space bounds of all mesh content. `None` when the model has no
    /// geometry. Assumes global transforms are current.
    pub fn bounding_box(&self) -> Option<Aabb> {
        let mut bounds: Option<Aabb> = None;
        for node in &self.nodes {
            let NodeKind::Mesh(mesh) = &node.kind else {
                continue;
            };
            for primitive in &mesh.primitives {
                let world = primitive.aabb.transform(node.global);
                bounds = Some(match bounds {
                    Some(existing) => existing.union(&world),
                    None => world,
                });
            }
        }
        bounds
    }

    /// Translate the scene roots so the bounding-box center sits at the
    /// origin. Returns the offset that was applied.
    pub fn center_at_origin(&mut self) -> Vec3 {
        let Some(bounds) = self.bounding_box() else {
            return Vec3::ZERO;
        };
        let center = bounds.center();
        for &root in &self.roots.clone() {
            self.nodes[root].local.translation -= center;
        }
        self.update_global_transforms();
        center
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_primitive(offset: Vec3) -> PrimitiveData {
        let positions = vec![
            [offset.x - 0.5, offset.y - 0.5, offset.z - 0.5],
            [offset.x + 0.5, offset.y + 0.5, offset.z + 0.5],
        ];
        let aabb = Aabb::from_points(positions.iter().map(|p| Vec3::from(*p))).unwrap();
        PrimitiveData {
            positions,
            normals: vec![[0.0, 1.0, 0.0]; 2],
            uvs: vec![[0.0, 0.0]; 2],
            indices: vec![0, 1],
            material: MaterialData::default(),
            aabb,
        }
    }

    fn test_model() -> Model {
        let mut root = Node::new("Root", NodeKind::Group);
        root.children = vec![1, 2];
        let mut flag = Node::new(
            "Bandera_Mesh",
            NodeKind::Mesh(MeshData {
                primitives: vec![unit_primitive(Vec3::new(2.0, 1.0, 0.0))],
            }),
        );
        flag.parent = Some(0);
        let mut lamp = Node::new("Bandera_Mesh", NodeKind::Light);
        lamp.parent = Some(0);
        let mut model = Model {
            nodes: vec![root, flag, lamp],
            roots: vec![0],
            clips: Vec::new(),
        };
        model.update_global_transforms();
        model
    }

    #[test]
    fn find_mesh_matches_meshes_only() {
        let model = test_model();
        assert_eq!(model.find_mesh_by_name("Bandera_Mesh"), Some(1));
        assert_eq!(model.find_mesh_by_name("Root"), None);
        assert_eq!(model.find_mesh_by_name("Missing"), None);
    }

    #[test]
    fn global_transforms_compose_parent_first() {
        let mut model = test_model();
        model.nodes[0].local.translation = Vec3::new(0.0, 3.0, 0.0);
        model.update_global_transforms();
        let origin = model.nodes[1].global.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(0.0, 3.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn bounding_box_follows_transforms() {
        let mut model = test_model();
        model.nodes[0].local.translation = Vec3::new(1.0, 0.0, 0.0);
        model.update_global_transforms();
        let bounds = model.bounding_box().unwrap();
        assert!((bounds.center() - Vec3::new(3.0, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn center_at_origin_moves_bbox_center_to_origin() {
        let mut model = test_model();
        let offset = model.center_at_origin();
        assert!((offset - Vec3::new(2.0, 1.0, 0.0)).length() < 1e-6);
        let bounds = model.bounding_box().unwrap();
        assert!(bounds.center().length() < 1e-6);
    }

    #[test]
    fn empty_model_has_no_bounds() {
        let model = Model::default();
        assert!(model.bounding_box().is_none());
    }

    #[test]
    fn aabb_transform_covers_rotated_corners() {
        let aabb = Aabb {
            min: Vec3::new(-1.0, -1.0, -1.0),
            max: Vec3::new(1.0, 1.0, 1.0),
        };
        let rotated = aabb.transform(Mat4::from_rotation_y(std::f32::consts::FRAC_PI_4));
        let expected = 2.0_f32.sqrt();
        assert!((rotated.max.x - expected).abs() < 1e-5);
        assert!((rotated.max.y - 1.0).abs() < 1e-5);
    }
}
