use anyhow::{Context, Result};
use outfit_forge::assets::mesh::decode;
use outfit_forge::config::AssetSettings;
use std::env;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <file.mesh> [texture-extension]", args[0]);
        std::process::exit(1);
    }

    let path = &args[1];
    let texture_extension = args
        .get(2)
        .cloned()
        .unwrap_or_else(|| AssetSettings::default().texture_extension);

    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path))?;
    let asset = decode(&bytes).with_context(|| format!("decoding {}", path))?;

    println!("📦 {} ({} bytes, format version {})", path, bytes.len(), asset.version);
    println!();
    println!("Materials: {}", asset.materials.len());
    for (position, material) in asset.materials.iter().enumerate() {
        println!("  [{}] id {}", position, material.id);
        for texture in material.texture_names(&texture_extension) {
            println!("      texture {}", texture);
        }
        for color in &material.colors {
            println!("      color slot {} = {:?}", color.slot, color.rgba);
        }
    }

    println!();
    println!("Meshes: {}", asset.meshes.len());
    for mesh in &asset.meshes {
        let layout = mesh.layout;
        println!(
            "  mesh {} → material {} (position {:?})",
            mesh.id,
            mesh.material_id,
            asset.material_position(mesh.material_id)
        );
        println!(
            "      {} vertices, stride {} ({} uv, color {}, tangent {}, skin {})",
            mesh.vertex_count,
            mesh.stride(),
            layout.uv_count,
            layout.has_color,
            layout.has_tangent,
            layout.has_skin
        );
        println!(
            "      {} indices at {} bytes each",
            mesh.indices.len(),
            mesh.indices.width()
        );
    }

    match asset.animation_name(&AssetSettings::default().animation_extension) {
        Some(animation) => println!("\nAnimation: {}", animation),
        None => println!("\nAnimation: none"),
    }
    Ok(())
}
