use anyhow::{anyhow, Context, Result};
use glam::{Mat4, Quat, Vec3};
use gltf::mesh::Mode;

/// Geometry of one mesh primitive in a collision asset, ready to become a fixed collider.
///
/// Positions are in the node's local frame with the node's world scale already applied;
/// `translation`/`rotation` place that frame in the world.
#[derive(Clone, Debug)]
pub struct CollisionMesh {
    pub name: String,
    pub translation: Vec3,
    pub rotation: Quat,
    pub positions: Vec<Vec3>,
    pub indices: Option<Vec<u32>>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalBounds {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl CollisionMesh {
    pub fn triangles(&self) -> Option<Vec<[u32; 3]>> {
        let indices = self.indices.as_ref()?;
        let count = self.positions.len() as u32;
        let triangles: Vec<[u32; 3]> = indices
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]])
            .filter(|tri| tri.iter().all(|&i| i < count))
            .collect();
        if triangles.is_empty() {
            None
        } else {
            Some(triangles)
        }
    }

    pub fn bounds(&self) -> Option<LocalBounds> {
        if self.positions.is_empty() {
            return None;
        }
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for pos in &self.positions {
            min = min.min(*pos);
            max = max.max(*pos);
        }
        Some(LocalBounds { center: (min + max) * 0.5, half_extents: ((max - min) * 0.5).max(Vec3::splat(0.001)) })
    }
}

pub fn collision_meshes_from_slice(bytes: &[u8], origin: &str) -> Result<Vec<CollisionMesh>> {
    let (document, buffers, _images) =
        gltf::import_slice(bytes).with_context(|| format!("Failed to import glTF {origin}"))?;
    collect_meshes(&document, &buffers, origin)
}

fn collect_meshes(document: &gltf::Document, buffers: &[gltf::buffer::Data], origin: &str) -> Result<Vec<CollisionMesh>> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| anyhow!("glTF {origin} contains no scenes"))?;
    let mut meshes = Vec::new();
    for node in scene.nodes() {
        visit_node(&node, Mat4::IDENTITY, buffers, &mut meshes);
    }
    if meshes.is_empty() {
        return Err(anyhow!("glTF {origin} contains no triangle meshes"));
    }
    Ok(meshes)
}

fn visit_node(node: &gltf::Node, parent: Mat4, buffers: &[gltf::buffer::Data], out: &mut Vec<CollisionMesh>) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        let (scale, rotation, translation) = world.to_scale_rotation_translation();
        let node_name = node.name().or_else(|| mesh.name()).map(str::to_string).unwrap_or_else(|| format!("node_{}", node.index()));
        for (primitive_index, primitive) in mesh.primitives().enumerate() {
            if primitive.mode() != Mode::Triangles {
                continue;
            }
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
            let Some(positions_iter) = reader.read_positions() else {
                log::warn!("Collision mesh '{node_name}' primitive {primitive_index} has no positions, skipping");
                continue;
            };
            let positions: Vec<Vec3> = positions_iter.map(|p| Vec3::from_array(p) * scale).collect();
            if positions.is_empty() {
                continue;
            }
            let indices = reader.read_indices().map(|read| read.into_u32().collect());
            out.push(CollisionMesh {
                name: format!("{node_name}::{primitive_index}"),
                translation,
                rotation,
                positions,
                indices,
            });
        }
    }
    for child in node.children() {
        visit_node(&child, world, buffers, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(indices: Option<Vec<u32>>) -> CollisionMesh {
        CollisionMesh {
            name: "floor::0".into(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            positions: vec![
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(-1.0, 0.0, 1.0),
            ],
            indices,
        }
    }

    #[test]
    fn indexed_meshes_yield_triangles() {
        let mesh = quad(Some(vec![0, 1, 2, 0, 2, 3]));
        assert_eq!(mesh.triangles(), Some(vec![[0, 1, 2], [0, 2, 3]]));
    }

    #[test]
    fn out_of_range_indices_are_dropped() {
        let mesh = quad(Some(vec![0, 1, 9]));
        assert_eq!(mesh.triangles(), None);
    }

    #[test]
    fn flat_bounds_keep_a_minimum_thickness() {
        let bounds = quad(None).bounds().expect("bounds");
        assert_eq!(bounds.center, Vec3::ZERO);
        assert_eq!(bounds.half_extents, Vec3::new(1.0, 0.001, 1.0));
    }

    /// Binary glTF with one indexed triangle on a translated, scaled node.
    fn ramp_glb() -> Vec<u8> {
        let mut bin = Vec::new();
        for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0] {
            bin.extend_from_slice(&value.to_le_bytes());
        }
        for index in [0u16, 1, 2] {
            bin.extend_from_slice(&index.to_le_bytes());
        }
        bin.extend_from_slice(&[0, 0]);
        let mut json = format!(
            r#"{{"asset":{{"version":"2.0"}},"scene":0,"scenes":[{{"nodes":[0]}}],
            "nodes":[{{"name":"ramp","mesh":0,"translation":[0,2,0],"scale":[2,2,2]}}],
            "meshes":[{{"primitives":[{{"attributes":{{"POSITION":0}},"indices":1}}]}}],
            "buffers":[{{"byteLength":{len}}}],
            "bufferViews":[{{"buffer":0,"byteOffset":0,"byteLength":36}},{{"buffer":0,"byteOffset":36,"byteLength":6}}],
            "accessors":[
                {{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0,0,0],"max":[1,0,1]}},
                {{"bufferView":1,"componentType":5123,"count":3,"type":"SCALAR"}}
            ]}}"#,
            len = bin.len()
        )
        .into_bytes();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut glb = Vec::with_capacity(total);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(&json);
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"BIN\0");
        glb.extend_from_slice(&bin);
        glb
    }

    #[test]
    fn binary_gltf_is_read() {
        let meshes = collision_meshes_from_slice(&ramp_glb(), "ramp.glb").expect("binary gltf");
        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.name, "ramp::0");
        assert!((mesh.translation - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-5);
        assert_eq!(mesh.positions[1], Vec3::new(2.0, 0.0, 0.0), "world scale is baked into vertices");
        assert_eq!(mesh.indices, Some(vec![0, 1, 2]));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let err = collision_meshes_from_slice(b"not a model", "broken.glb").unwrap_err();
        assert!(format!("{err:#}").contains("broken.glb"));
    }
}
