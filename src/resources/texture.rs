use std::{
    io::{BufReader, Cursor},
    path::{Path, PathBuf},
};

use crate::data_structures::{model, texture};

/// Layout of a material bind group: diffuse texture and its sampler.
pub fn diffuse_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("Model texture_bind_group_layout"),
    })
}

/// Resolve `name` next to the file `relative_to`, e.g. a .mtl or texture
/// referenced from inside a model file.
pub fn sibling(relative_to: &str, name: &str) -> String {
    if Path::new(name).is_absolute() {
        return name.to_string();
    }
    match Path::new(relative_to).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            dir.join(name).to_string_lossy().replace('\\', "/")
        }
        _ => name.to_string(),
    }
}

/// Relative paths live under `./assets`; absolute ones are taken as they are.
pub fn asset_path(file_name: &str) -> PathBuf {
    let path = Path::new(file_name);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        Path::new("./").join("assets").join(path)
    }
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("No browser window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("Page has no origin"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = tokio::fs::read_to_string(asset_path(file_name)).await?;

    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = tokio::fs::read(asset_path(file_name)).await?;

    Ok(data)
}

pub async fn load_texture(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    format: Option<&str>,
) -> anyhow::Result<texture::Texture> {
    let data = load_binary(file_name).await?;
    texture::Texture::from_bytes(device, queue, &data, file_name, format)
}

/// Turn a linear [0, 1] colour from a model file into sRGB bytes.
pub fn colour_bytes(rgb: [f32; 3], alpha: f32) -> [u8; 4] {
    let encode = |c: f32| {
        let c = c.clamp(0.0, 1.0);
        let srgb = if c <= 0.003_130_8 {
            c * 12.92
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        };
        (srgb * 255.0).round() as u8
    };
    [
        encode(rgb[0]),
        encode(rgb[1]),
        encode(rgb[2]),
        (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
    ]
}

/// A plain white material, used when a model brings none of its own.
pub fn default_material(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> model::Material {
    let white = texture::Texture::from_colour(device, queue, [255; 4], "Default Material");
    model::Material::new(device, "default", white, layout)
}

/// Parse an .obj file and build its materials. Material libraries and
/// textures are looked up next to the .obj file.
pub async fn load_obj_materials(
    file_name: &str,
    queue: &wgpu::Queue,
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<(Vec<model::Material>, Vec<tobj::Model>)> {
    let obj_text: String = load_string(file_name).await?;
    let obj_cursor = Cursor::new(obj_text);
    let mut obj_reader = BufReader::new(obj_cursor);

    let (models, obj_materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |p| async move {
            let mtl_path = sibling(file_name, &p);
            match load_string(&mtl_path).await {
                Ok(mat_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text))),
                Err(e) => {
                    log::warn!("Material library {mtl_path} could not be read: {e}");
                    Err(tobj::LoadError::OpenFileFailed)
                }
            }
        },
    )
    .await?;

    let obj_materials = obj_materials.unwrap_or_else(|e| {
        log::warn!("{file_name} is drawn without its materials: {e}");
        Vec::new()
    });

    let mut materials = Vec::new();
    for m in obj_materials {
        let diffuse_texture = match &m.diffuse_texture {
            Some(path) => load_texture(&sibling(file_name, path), device, queue, None).await?,
            None => {
                let rgba = colour_bytes(m.diffuse.unwrap_or([1.0; 3]), m.dissolve.unwrap_or(1.0));
                texture::Texture::from_colour(device, queue, rgba, &m.name)
            }
        };
        materials.push(model::Material::new(
            device,
            &m.name,
            diffuse_texture,
            layout,
        ));
    }
    Ok((materials, models))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn siblings_share_the_directory() {
        assert_eq!(sibling("models/tree.obj", "tree.mtl"), "models/tree.mtl");
        assert_eq!(sibling("tree.obj", "tree.mtl"), "tree.mtl");
    }

    #[test]
    fn relative_assets_live_under_assets() {
        assert_eq!(
            asset_path("models/tree.obj"),
            Path::new("./assets/models/tree.obj")
        );
    }

    #[test]
    fn colour_bytes_are_srgb_encoded() {
        assert_eq!(colour_bytes([0.0, 1.0, 0.0], 1.0), [0, 255, 0, 255]);
        // linear 0.5 is brighter than half in sRGB
        assert_eq!(colour_bytes([0.5, 0.5, 0.5], 0.5)[0], 188);
    }
}
