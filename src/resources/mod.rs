use std::path::Path;

use anyhow::{anyhow, bail};
use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, SquareMatrix, Transform};

use crate::{
    data_structures::{model, texture::Texture},
    resources::texture::{
        colour_bytes, default_material, diffuse_layout, load_binary, load_texture, sibling,
    },
};

/**
 * This module contains all logic for loading mesh/textures/etc. from external files.
 */
pub mod mesh;
pub mod texture;

/// Load a model, picking the parser from the file extension.
pub async fn load_model(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<model::Model> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("obj") => load_model_obj(file_name, device, queue).await,
        Some("gltf") | Some("glb") => load_model_gltf(file_name, device, queue).await,
        _ => bail!("Unsupported model format: {file_name}"),
    }
}

pub async fn load_model_obj(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<model::Model> {
    let bind_group_layout = diffuse_layout(device);

    let (mut materials, models) =
        texture::load_obj_materials(file_name, queue, device, &bind_group_layout).await?;
    let meshes = mesh::load_meshes(&models, file_name, device);
    if meshes.is_empty() {
        bail!("{file_name} contains no drawable mesh");
    }
    if materials.is_empty() {
        materials.push(default_material(device, queue, &bind_group_layout));
    }

    log::info!(
        "Loaded {} with {} meshes and {} materials",
        file_name,
        meshes.len(),
        materials.len()
    );
    Ok(model::Model { meshes, materials })
}

pub async fn load_model_gltf(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<model::Model> {
    let gltf_data = load_binary(file_name).await?;
    let gltf = gltf::Gltf::from_slice(&gltf_data)?;

    // Load buffers
    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .ok_or_else(|| anyhow!("{file_name} references a missing binary chunk"))?;
                buffer_data.push(blob.into());
            }
            gltf::buffer::Source::Uri(uri) => {
                if uri.starts_with("data:") {
                    bail!("Embedded data URIs are not supported ({file_name})");
                }
                buffer_data.push(load_binary(&sibling(file_name, uri)).await?);
            }
        }
    }

    // Load materials
    let layout = diffuse_layout(device);
    let mut materials = Vec::new();
    for material in gltf.materials() {
        let pbr = material.pbr_metallic_roughness();
        let name = material.name().unwrap_or("gltf material");
        let diffuse_texture = match pbr.base_color_texture() {
            Some(info) => match info.texture().source().source() {
                gltf::image::Source::View { view, mime_type } => {
                    let buffer = buffer_data
                        .get(view.buffer().index())
                        .ok_or_else(|| anyhow!("{file_name}: image buffer out of range"))?;
                    let bytes = buffer
                        .get(view.offset()..view.offset() + view.length())
                        .ok_or_else(|| anyhow!("{file_name}: image view out of range"))?;
                    Texture::from_bytes(device, queue, bytes, name, mime_type.split('/').last())?
                }
                gltf::image::Source::Uri { uri, mime_type } => {
                    load_texture(
                        &sibling(file_name, uri),
                        device,
                        queue,
                        mime_type.and_then(|mt| mt.split('/').last()),
                    )
                    .await?
                }
            },
            None => {
                let [r, g, b, a] = pbr.base_color_factor();
                Texture::from_colour(device, queue, colour_bytes([r, g, b], a), name)
            }
        };
        materials.push(model::Material::new(device, name, diffuse_texture, &layout));
    }
    // Primitives without a material use this one.
    let default_index = materials.len();
    materials.push(default_material(device, queue, &layout));

    let mut meshes = Vec::new();
    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .ok_or_else(|| anyhow!("{file_name} contains no scene"))?;
    for node in scene.nodes() {
        collect_meshes(
            &node,
            Matrix4::identity(),
            &buffer_data,
            default_index,
            device,
            &mut meshes,
        );
    }
    if meshes.is_empty() {
        bail!("{file_name} contains no drawable mesh");
    }

    log::info!(
        "Loaded {} with {} meshes and {} materials",
        file_name,
        meshes.len(),
        materials.len()
    );
    Ok(model::Model { meshes, materials })
}

/// Walk the node tree and bake each node's world transform into its
/// vertices, so a glTF file turns into a flat list of meshes.
fn collect_meshes(
    node: &gltf::Node,
    parent: Matrix4<f32>,
    buffers: &[Vec<u8>],
    default_material: usize,
    device: &wgpu::Device,
    meshes: &mut Vec<model::Mesh>,
) {
    let world = parent * Matrix4::from(node.transform().matrix());
    let linear = Matrix3::from_cols(world.x.truncate(), world.y.truncate(), world.z.truncate());
    let normal_matrix = linear
        .invert()
        .map(|inverse| inverse.transpose())
        .unwrap_or(linear);

    if let Some(mesh) = node.mesh() {
        let mesh_name = mesh.name().unwrap_or("unknown_mesh");
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping primitive {} of {}: only triangles are drawn",
                    primitive.index(),
                    mesh_name
                );
                continue;
            }
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

            let mut vertices: Vec<model::ModelVertex> = match reader.read_positions() {
                Some(positions) => positions
                    .map(|p| model::ModelVertex {
                        position: world.transform_point(p.into()).into(),
                        ..Default::default()
                    })
                    .collect(),
                None => continue,
            };
            if let Some(normals) = reader.read_normals() {
                for (vertex, normal) in vertices.iter_mut().zip(normals) {
                    let n = normal_matrix * cgmath::Vector3::from(normal);
                    if n.magnitude2() > 0.0 {
                        vertex.normal = n.normalize().into();
                    }
                }
            }
            if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
                for (vertex, uv) in vertices.iter_mut().zip(tex_coords) {
                    vertex.tex_coords = uv;
                }
            }

            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..vertices.len() as u32).collect(),
            };
            if indices.is_empty() {
                continue;
            }
            let material = primitive.material().index().unwrap_or(default_material);
            meshes.push(mesh::create_mesh(
                device, mesh_name, &vertices, &indices, material,
            ));
        }
    }

    for child in node.children() {
        collect_meshes(&child, world, buffers, default_material, device, meshes);
    }
}
