use wgpu::util::DeviceExt;

use crate::data_structures::model;

/// Vertices of an .obj mesh. Missing texture coordinates and normals are
/// zero-filled; the v axis is flipped to wgpu's top-left origin.
pub fn obj_vertices(mesh: &tobj::Mesh) -> Vec<model::ModelVertex> {
    (0..mesh.positions.len() / 3)
        .map(|i| model::ModelVertex {
            position: [
                mesh.positions[i * 3],
                mesh.positions[i * 3 + 1],
                mesh.positions[i * 3 + 2],
            ],
            tex_coords: [
                mesh.texcoords.get(i * 2).map_or(0.0, |f| *f),
                1.0 - mesh.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
            ],
            normal: [
                mesh.normals.get(i * 3).map_or(0.0, |f| *f),
                mesh.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                mesh.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
            ],
        })
        .collect()
}

pub fn create_mesh(
    device: &wgpu::Device,
    name: &str,
    vertices: &[model::ModelVertex],
    indices: &[u32],
    material: usize,
) -> model::Mesh {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{:?} Vertex Buffer", name)),
        contents: bytemuck::cast_slice(vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{:?} Index Buffer", name)),
        contents: bytemuck::cast_slice(indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    model::Mesh {
        name: name.to_string(),
        vertex_buffer,
        index_buffer,
        num_elements: indices.len() as u32,
        material,
    }
}

/// Upload every non-empty mesh of an .obj file.
pub fn load_meshes(
    models: &[tobj::Model],
    file_name: &str,
    device: &wgpu::Device,
) -> Vec<model::Mesh> {
    models
        .iter()
        .filter_map(|m| {
            if m.mesh.indices.is_empty() {
                log::warn!("Mesh {} in file {} has no faces", m.name, file_name);
                return None;
            }
            let vertices = obj_vertices(&m.mesh);
            let name = format!("{}:{}", file_name, m.name);
            Some(create_mesh(
                device,
                &name,
                &vertices,
                &m.mesh.indices,
                m.mesh.material_id.unwrap_or(0),
            ))
        })
        .collect()
}
