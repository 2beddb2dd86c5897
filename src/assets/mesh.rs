//! Mesh container codec
//!
//! Decodes the interleaved-vertex mesh format into material and mesh records.
//! Layout (little-endian throughout):
//!
//! ```text
//! magic u32 | version u8
//! material_count u8 { id u8 | uv_channels u8 { images u8 { name str16 | hint u8 } } | colors u8 { slot u8 | rgba f32x4 } }
//! mesh_count u8 { id u8 | material u8 | vertex_count u32 | uv_count u8 | color u8 | tangent u8 | skin u8
//!                 | vertices f32[vertex_count * stride] | index_count u32 | index_width u8 | indices }
//! has_animation u8 [ name str16 ]
//! ```

use super::reader::ByteReader;
use super::{DecodeError, DecodeResult};
use tracing::debug;

/// Fixed container magic
pub const MESH_MAGIC: u32 = u32::from_le_bytes(*b"PMSH");

/// Placeholder in texture and animation names, replaced by a real extension
pub const WILDCARD: char = '*';

/// Replace every wildcard in `name` with `extension`
pub fn substitute_wildcard(name: &str, extension: &str) -> String {
    name.replace(WILDCARD, extension)
}

/// Image reference inside a UV channel
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    pub file_name: String,
    pub type_hint: u8,
}

impl ImageRef {
    pub fn resolved(&self, texture_extension: &str) -> String {
        substitute_wildcard(&self.file_name, texture_extension)
    }
}

/// Literal color declared by a material for one color slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorEntry {
    pub slot: u8,
    pub rgba: [f32; 4],
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRecord {
    pub id: u8,
    /// One image list per UV channel
    pub uv_channels: Vec<Vec<ImageRef>>,
    pub colors: Vec<ColorEntry>,
}

impl MaterialRecord {
    /// Texture file names with the wildcard resolved, channel by channel
    pub fn texture_names(&self, texture_extension: &str) -> Vec<String> {
        self.uv_channels
            .iter()
            .flatten()
            .map(|image| image.resolved(texture_extension))
            .collect()
    }

    pub fn color(&self, slot: u8) -> Option<[f32; 4]> {
        self.colors.iter().find(|c| c.slot == slot).map(|c| c.rgba)
    }
}

/// Per-vertex attribute flags; they fully determine the interleaved stride
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexLayout {
    pub uv_count: u8,
    pub has_color: bool,
    pub has_tangent: bool,
    pub has_skin: bool,
}

impl VertexLayout {
    /// Floats per vertex: position, normal, uvs, color, tangent, skin weights + indices
    pub fn stride(&self) -> usize {
        3 + 3
            + 2 * self.uv_count as usize
            + if self.has_color { 4 } else { 0 }
            + if self.has_tangent { 4 } else { 0 }
            + if self.has_skin { 8 } else { 0 }
    }

    pub fn uv_offset(&self, channel: u8) -> Option<usize> {
        (channel < self.uv_count).then(|| 6 + 2 * channel as usize)
    }

    pub fn color_offset(&self) -> Option<usize> {
        self.has_color.then(|| 6 + 2 * self.uv_count as usize)
    }

    pub fn tangent_offset(&self) -> Option<usize> {
        self.has_tangent
            .then(|| 6 + 2 * self.uv_count as usize + if self.has_color { 4 } else { 0 })
    }

    /// Offset of the four skin weights; the four joint indices follow them
    pub fn skin_offset(&self) -> Option<usize> {
        self.has_skin.then(|| self.stride() - 8)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U16(v) => v.len(),
            IndexBuffer::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn width(&self) -> u8 {
        match self {
            IndexBuffer::U16(_) => 2,
            IndexBuffer::U32(_) => 4,
        }
    }

    pub fn to_u32(&self) -> Vec<u32> {
        match self {
            IndexBuffer::U16(v) => v.iter().map(|&i| i as u32).collect(),
            IndexBuffer::U32(v) => v.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshRecord {
    pub id: u8,
    pub material_id: u8,
    pub vertex_count: u32,
    pub layout: VertexLayout,
    /// Interleaved vertex data, `vertex_count * layout.stride()` floats
    pub vertices: Vec<f32>,
    pub indices: IndexBuffer,
}

impl MeshRecord {
    pub fn stride(&self) -> usize {
        self.layout.stride()
    }

    pub fn is_skinned(&self) -> bool {
        self.layout.has_skin
    }

    pub fn vertex(&self, index: usize) -> Option<&[f32]> {
        let stride = self.stride();
        self.vertices.get(index * stride..(index + 1) * stride)
    }

    pub fn position(&self, index: usize) -> Option<[f32; 3]> {
        self.vertex(index).map(|v| [v[0], v[1], v[2]])
    }
}

/// Fully decoded container
#[derive(Debug, Clone, PartialEq)]
pub struct MeshAsset {
    pub version: u8,
    pub materials: Vec<MaterialRecord>,
    pub meshes: Vec<MeshRecord>,
    /// Companion animation name, wildcard not yet substituted
    pub animation: Option<String>,
    /// Indexed by material id, holds the material's position in decode order
    material_slots: Vec<Option<usize>>,
}

impl MeshAsset {
    /// Position of material `id` in decode order
    pub fn material_position(&self, id: u8) -> Option<usize> {
        self.material_slots.get(id as usize).copied().flatten()
    }

    pub fn material(&self, id: u8) -> Option<&MaterialRecord> {
        self.material_position(id).and_then(|pos| self.materials.get(pos))
    }

    pub fn animation_name(&self, extension: &str) -> Option<String> {
        self.animation
            .as_deref()
            .map(|name| substitute_wildcard(name, extension))
    }

    pub fn has_skinned_meshes(&self) -> bool {
        self.meshes.iter().any(MeshRecord::is_skinned)
    }
}

/// Decode a mesh container. Any structural violation aborts the whole parse.
pub fn decode(bytes: &[u8]) -> DecodeResult<MeshAsset> {
    let mut reader = ByteReader::new(bytes);

    let magic = reader.get_u32()?;
    if magic != MESH_MAGIC {
        return Err(DecodeError::BadMagic {
            expected: MESH_MAGIC,
            actual: magic,
        });
    }
    let version = reader.get_u8()?;

    let material_count = reader.get_u8()? as usize;
    let mut materials = Vec::with_capacity(material_count);
    for _ in 0..material_count {
        materials.push(decode_material(&mut reader)?);
    }

    let mesh_count = reader.get_u8()? as usize;
    let mut meshes = Vec::with_capacity(mesh_count);
    for _ in 0..mesh_count {
        meshes.push(decode_mesh(&mut reader)?);
    }

    let animation = if reader.get_bool()? {
        Some(reader.get_string()?)
    } else {
        None
    };

    let mut material_slots = Vec::new();
    for (position, material) in materials.iter().enumerate() {
        let id = material.id as usize;
        if material_slots.len() <= id {
            material_slots.resize(id + 1, None);
        }
        material_slots[id] = Some(position);
    }

    debug!(
        "Decoded mesh container v{}: {} materials, {} meshes, animation {:?}",
        version,
        materials.len(),
        meshes.len(),
        animation
    );

    Ok(MeshAsset {
        version,
        materials,
        meshes,
        animation,
        material_slots,
    })
}

fn decode_material(reader: &mut ByteReader<'_>) -> DecodeResult<MaterialRecord> {
    let id = reader.get_u8()?;

    let channel_count = reader.get_u8()? as usize;
    let mut uv_channels = Vec::with_capacity(channel_count);
    for _ in 0..channel_count {
        let image_count = reader.get_u8()? as usize;
        let mut images = Vec::with_capacity(image_count);
        for _ in 0..image_count {
            let file_name = reader.get_string()?;
            let type_hint = reader.get_u8()?;
            images.push(ImageRef { file_name, type_hint });
        }
        uv_channels.push(images);
    }

    let color_count = reader.get_u8()? as usize;
    let mut colors = Vec::with_capacity(color_count);
    for _ in 0..color_count {
        let slot = reader.get_u8()?;
        let rgba = [
            reader.get_f32()?,
            reader.get_f32()?,
            reader.get_f32()?,
            reader.get_f32()?,
        ];
        colors.push(ColorEntry { slot, rgba });
    }

    Ok(MaterialRecord {
        id,
        uv_channels,
        colors,
    })
}

fn decode_mesh(reader: &mut ByteReader<'_>) -> DecodeResult<MeshRecord> {
    let id = reader.get_u8()?;
    let material_id = reader.get_u8()?;
    let vertex_count = reader.get_u32()?;
    let layout = VertexLayout {
        uv_count: reader.get_u8()?,
        has_color: reader.get_bool()?,
        has_tangent: reader.get_bool()?,
        has_skin: reader.get_bool()?,
    };

    let float_count = (vertex_count as usize).saturating_mul(layout.stride());
    let vertices = reader.get_f32_array(float_count)?;

    let index_count = reader.get_u32()? as usize;
    let width = reader.get_u8()?;
    let indices = match width {
        2 => IndexBuffer::U16(reader.get_u16_array(index_count)?),
        4 => IndexBuffer::U32(reader.get_u32_array(index_count)?),
        other => return Err(DecodeError::InvalidIndexWidth { width: other }),
    };

    Ok(MeshRecord {
        id,
        material_id,
        vertex_count,
        layout,
        vertices,
        indices,
    })
}

#[doc(hidden)]
pub mod test_support {
    //! Encoder for hand-built containers, shared by unit and integration tests

    use super::*;

    pub struct MeshSpec {
        pub id: u8,
        pub material_id: u8,
        pub vertex_count: u32,
        pub layout: VertexLayout,
        pub index_width: u8,
        pub indices: Vec<u32>,
    }

    pub fn push_string(out: &mut Vec<u8>, s: &str) {
        out.extend_from_slice(&(s.len() as u16).to_le_bytes());
        out.extend_from_slice(s.as_bytes());
    }

    pub fn encode(materials: &[MaterialRecord], meshes: &[MeshSpec], animation: Option<&str>) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MESH_MAGIC.to_le_bytes());
        out.push(1);

        out.push(materials.len() as u8);
        for material in materials {
            out.push(material.id);
            out.push(material.uv_channels.len() as u8);
            for channel in &material.uv_channels {
                out.push(channel.len() as u8);
                for image in channel {
                    push_string(&mut out, &image.file_name);
                    out.push(image.type_hint);
                }
            }
            out.push(material.colors.len() as u8);
            for color in &material.colors {
                out.push(color.slot);
                for c in color.rgba {
                    out.extend_from_slice(&c.to_le_bytes());
                }
            }
        }

        out.push(meshes.len() as u8);
        for mesh in meshes {
            out.push(mesh.id);
            out.push(mesh.material_id);
            out.extend_from_slice(&mesh.vertex_count.to_le_bytes());
            out.push(mesh.layout.uv_count);
            out.push(mesh.layout.has_color as u8);
            out.push(mesh.layout.has_tangent as u8);
            out.push(mesh.layout.has_skin as u8);
            let floats = mesh.vertex_count as usize * mesh.layout.stride();
            for i in 0..floats {
                out.extend_from_slice(&(i as f32).to_le_bytes());
            }
            out.extend_from_slice(&(mesh.indices.len() as u32).to_le_bytes());
            out.push(mesh.index_width);
            for &index in &mesh.indices {
                if mesh.index_width == 2 {
                    out.extend_from_slice(&(index as u16).to_le_bytes());
                } else {
                    out.extend_from_slice(&index.to_le_bytes());
                }
            }
        }

        match animation {
            Some(name) => {
                out.push(1);
                push_string(&mut out, name);
            }
            None => out.push(0),
        }
        out
    }

    pub fn plain_material(id: u8) -> MaterialRecord {
        MaterialRecord {
            id,
            uv_channels: Vec::new(),
            colors: Vec::new(),
        }
    }

    pub fn triangle(id: u8, material_id: u8, layout: VertexLayout) -> MeshSpec {
        MeshSpec {
            id,
            material_id,
            vertex_count: 3,
            layout,
            index_width: 2,
            indices: vec![0, 1, 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_single_triangle() {
        let bytes = encode(
            &[plain_material(0)],
            &[triangle(0, 0, VertexLayout::default())],
            None,
        );
        let asset = decode(&bytes).unwrap();

        assert_eq!(asset.meshes.len(), 1);
        let mesh = &asset.meshes[0];
        assert_eq!(mesh.stride(), 6);
        assert_eq!(mesh.vertices.len(), 18);
        assert_eq!(mesh.indices.len(), 3);
        assert_eq!(mesh.position(1), Some([6.0, 7.0, 8.0]));
        assert!(asset.animation.is_none());
    }

    #[test]
    fn test_stride_for_every_layout() {
        let layouts = [
            VertexLayout { uv_count: 1, has_color: false, has_tangent: false, has_skin: false },
            VertexLayout { uv_count: 2, has_color: true, has_tangent: false, has_skin: false },
            VertexLayout { uv_count: 0, has_color: false, has_tangent: true, has_skin: true },
            VertexLayout { uv_count: 3, has_color: true, has_tangent: true, has_skin: true },
        ];
        let meshes: Vec<MeshSpec> = layouts
            .iter()
            .enumerate()
            .map(|(i, layout)| MeshSpec {
                id: i as u8,
                material_id: 0,
                vertex_count: 5,
                layout: *layout,
                index_width: if i % 2 == 0 { 2 } else { 4 },
                indices: vec![0, 1, 2, 2, 3, 4],
            })
            .collect();
        let bytes = encode(&[plain_material(0)], &meshes, None);
        let asset = decode(&bytes).unwrap();

        for (mesh, layout) in asset.meshes.iter().zip(layouts.iter()) {
            let expected = 3
                + 3
                + 2 * layout.uv_count as usize
                + 4 * layout.has_color as usize
                + 4 * layout.has_tangent as usize
                + 8 * layout.has_skin as usize;
            assert_eq!(mesh.stride(), expected);
            assert_eq!(mesh.vertices.len(), 5 * expected);
            assert_eq!(mesh.indices.to_u32(), vec![0, 1, 2, 2, 3, 4]);
        }
        assert_eq!(asset.meshes[1].indices.width(), 4);
        assert!(asset.has_skinned_meshes());
    }

    #[test]
    fn test_attribute_offsets() {
        let layout = VertexLayout { uv_count: 2, has_color: true, has_tangent: true, has_skin: true };
        assert_eq!(layout.uv_offset(1), Some(8));
        assert_eq!(layout.uv_offset(2), None);
        assert_eq!(layout.color_offset(), Some(10));
        assert_eq!(layout.tangent_offset(), Some(14));
        assert_eq!(layout.skin_offset(), Some(18));
        assert_eq!(layout.stride(), 26);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = encode(&[plain_material(0)], &[], None);
        bytes[0..4].copy_from_slice(&0xDEADBEEFu32.to_le_bytes());
        match decode(&bytes) {
            Err(DecodeError::BadMagic { expected, actual }) => {
                assert_eq!(expected, MESH_MAGIC);
                assert_eq!(actual, 0xDEADBEEF);
            }
            other => panic!("expected bad magic, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_vertex_data() {
        let bytes = encode(&[plain_material(0)], &[triangle(0, 0, VertexLayout::default())], None);
        let cut = &bytes[..bytes.len() - 20];
        assert!(matches!(decode(cut), Err(DecodeError::OutOfRange { .. })));
    }

    #[test]
    fn test_invalid_index_width() {
        let mut spec = triangle(0, 0, VertexLayout::default());
        spec.index_width = 3;
        let bytes = encode(&[plain_material(0)], &[spec], None);
        assert!(matches!(decode(&bytes), Err(DecodeError::InvalidIndexWidth { width: 3 })));
    }

    #[test]
    fn test_material_positions_follow_decode_order() {
        let mut visor = plain_material(7);
        visor.colors.push(ColorEntry { slot: 1, rgba: [0.1, 0.2, 0.3, 1.0] });
        visor.uv_channels.push(vec![ImageRef { file_name: "visor.*".into(), type_hint: 0 }]);
        let bytes = encode(&[plain_material(3), visor], &[], Some("wave.*"));
        let asset = decode(&bytes).unwrap();

        assert_eq!(asset.material_position(3), Some(0));
        assert_eq!(asset.material_position(7), Some(1));
        assert_eq!(asset.material_position(5), None);
        let visor = asset.material(7).unwrap();
        assert_eq!(visor.color(1), Some([0.1, 0.2, 0.3, 1.0]));
        assert_eq!(visor.texture_names("png"), vec!["visor.png".to_string()]);
        assert_eq!(asset.animation_name("anim.json").as_deref(), Some("wave.anim.json"));
    }
}
