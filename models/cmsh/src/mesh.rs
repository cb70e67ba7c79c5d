use ultraviolet::vec::Vec3;

use rgk_core::scene::{
	Mesh,
	Submesh,
	Vertex,
	VertexBoneData
};

use crate::{
	chunk::BinaryChunk,
	codec::{
		Codec,
		Endianness
	},
	error::CmshError,
	tag::ChunkType,
	version::{
		BoneLayout,
		FaceLayout,
		VertexLayout
	}
};

#[cfg(feature = "export")]
use crate::protocol::{
	BinaryWrite,
	WriteContext,
	write_name,
	write_sub_entity,
	write_value,
	write_values
};

#[cfg(feature = "import")]
use crate::{
	protocol::{
		ChunkParser,
		ParseContext,
		parse_entity,
		parse_name,
		parse_value,
		parse_values
	},
	ImportFlag
};

#[cfg(feature = "import")]
use rgk_core::color::Color;

/// Vertex record of the double precision layout, bitangent included
#[derive(Clone, Copy, Debug, PartialEq)]
struct InterleavedVertex64 {
	position: [f64; 3],
	normal: [f64; 3],
	tangent: [f64; 3],
	bitangent: [f64; 3],
	uvw: [f64; 3],
}

fn widen(v: Vec3) -> [f64; 3] {
	[v.x as f64, v.y as f64, v.z as f64]
}

fn narrow(v: [f64; 3]) -> Vec3 {
	Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32)
}

impl From<&Vertex> for InterleavedVertex64 {
	fn from(v: &Vertex) -> Self {
		InterleavedVertex64 {
			position: widen(v.position),
			normal: widen(v.normal),
			tangent: widen(v.tangent),
			bitangent: widen(v.normal.cross(v.tangent)),
			uvw: widen(v.uvw),
		}
	}
}

impl From<InterleavedVertex64> for Vertex {
	/// The bitangent is dropped, being derivable from the normal and tangent
	fn from(v: InterleavedVertex64) -> Self {
		Vertex {
			position: narrow(v.position),
			normal: narrow(v.normal),
			tangent: narrow(v.tangent),
			uvw: narrow(v.uvw),
		}
	}
}

impl Codec for InterleavedVertex64 {
	const SIZE: usize = 5 * <[f64; 3]>::SIZE;

	fn view(&self, host: Endianness, out: &mut Vec<u8>) {
		self.position.view(host, out);
		self.normal.view(host, out);
		self.tangent.view(host, out);
		self.bitangent.view(host, out);
		self.uvw.view(host, out);
	}

	fn load(host: Endianness, bytes: &mut &[u8]) -> Self {
		InterleavedVertex64 {
			position: Codec::load(host, bytes),
			normal: Codec::load(host, bytes),
			tangent: Codec::load(host, bytes),
			bitangent: Codec::load(host, bytes),
			uvw: Codec::load(host, bytes),
		}
	}

	fn flip(&mut self) {
		self.position.flip();
		self.normal.flip();
		self.tangent.flip();
		self.bitangent.flip();
		self.uvw.flip();
	}
}

/// Vertex record of the single precision layout
#[derive(Clone, Copy, Debug, PartialEq)]
struct InterleavedVertex32 {
	position: Vec3,
	normal: Vec3,
	tangent: Vec3,
	uvw: Vec3,
}

impl From<&Vertex> for InterleavedVertex32 {
	fn from(v: &Vertex) -> Self {
		InterleavedVertex32 {
			position: v.position,
			normal: v.normal,
			tangent: v.tangent,
			uvw: v.uvw,
		}
	}
}

impl From<InterleavedVertex32> for Vertex {
	fn from(v: InterleavedVertex32) -> Self {
		Vertex {
			position: v.position,
			normal: v.normal,
			tangent: v.tangent,
			uvw: v.uvw,
		}
	}
}

impl Codec for InterleavedVertex32 {
	const SIZE: usize = 4 * Vec3::SIZE;

	fn view(&self, host: Endianness, out: &mut Vec<u8>) {
		self.position.view(host, out);
		self.normal.view(host, out);
		self.tangent.view(host, out);
		self.uvw.view(host, out);
	}

	fn load(host: Endianness, bytes: &mut &[u8]) -> Self {
		InterleavedVertex32 {
			position: Codec::load(host, bytes),
			normal: Codec::load(host, bytes),
			tangent: Codec::load(host, bytes),
			uvw: Codec::load(host, bytes),
		}
	}

	fn flip(&mut self) {
		self.position.flip();
		self.normal.flip();
		self.tangent.flip();
		self.uvw.flip();
	}
}

/// Bone influences of the four-slot layout
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct VertexBoneData4 {
	ids: [u32; 4],
	weights: [f32; 4],
}

impl From<&VertexBoneData> for VertexBoneData4 {
	/// Keeps the four heaviest influences
	fn from(data: &VertexBoneData) -> Self {
		let mut slots: Vec<usize> = (0..data.weights.len()).collect();
		slots.sort_by(|a, b| data.weights[*b].total_cmp(&data.weights[*a]));

		let mut out = VertexBoneData4::default();
		for (i, slot) in slots.into_iter().take(4).enumerate() {
			out.ids[i] = data.ids[slot];
			out.weights[i] = data.weights[slot];
		}
		out
	}
}

impl From<VertexBoneData4> for VertexBoneData {
	fn from(data: VertexBoneData4) -> Self {
		let mut out = VertexBoneData::default();
		out.ids[..4].copy_from_slice(&data.ids);
		out.weights[..4].copy_from_slice(&data.weights);
		out
	}
}

impl Codec for VertexBoneData4 {
	const SIZE: usize = 32;

	fn view(&self, host: Endianness, out: &mut Vec<u8>) {
		self.ids.view(host, out);
		self.weights.view(host, out);
	}

	fn load(host: Endianness, bytes: &mut &[u8]) -> Self {
		VertexBoneData4 {
			ids: Codec::load(host, bytes),
			weights: Codec::load(host, bytes),
		}
	}

	fn flip(&mut self) {
		self.ids.flip();
		self.weights.flip();
	}
}

#[cfg(feature = "export")]
impl BinaryWrite for Submesh {
	const CHUNK: ChunkType = ChunkType::Submesh;

	fn write_fields(&self, chunk: &mut BinaryChunk, ctx: &WriteContext) -> Result<(), CmshError> {
		if let Some(material) = &self.material {
			write_name(ChunkType::SubmeshMaterial, material, chunk, ctx)?;
		}

		write_value(ChunkType::SubmeshVertexCount, &(self.vertices.len() as u32), chunk, ctx)?;
		match ctx.shapes.vertex {
			VertexLayout::Double => {
				let vertices: Vec<InterleavedVertex64> = self.vertices.iter().map(|v| v.into()).collect();
				write_values(ChunkType::SubmeshVertex, &vertices, chunk, ctx)?;
			}
			VertexLayout::Single => {
				let vertices: Vec<InterleavedVertex32> = self.vertices.iter().map(|v| v.into()).collect();
				write_values(ChunkType::SubmeshVertex, &vertices, chunk, ctx)?;
			}
		}

		if !self.colors.is_empty() {
			write_values(ChunkType::SubmeshColors, &self.colors, chunk, ctx)?;
		}

		write_value(ChunkType::SubmeshFaceCount, &(self.faces.len() as u32), chunk, ctx)?;
		match ctx.shapes.faces {
			FaceLayout::U16 => {
				let mut faces = Vec::with_capacity(self.faces.len());
				for face in self.faces.iter() {
					let mut small = [0u16; 3];
					for (i, index) in face.iter().enumerate() {
						if *index > u16::MAX as u32 {
							return Err(CmshError::IndexOverflow {
								tag: ChunkType::SubmeshFaces.tag(),
								index: *index as u64,
								limit: u16::MAX as u64,
							});
						}
						small[i] = *index as u16;
					}
					faces.push(small);
				}
				write_values(ChunkType::SubmeshFaces, &faces, chunk, ctx)?;
			}
			FaceLayout::U32 => write_values(ChunkType::SubmeshFaces, &self.faces, chunk, ctx)?,
		}

		if self.has_bone_data() {
			write_value(ChunkType::SubmeshBoneCount, &(self.bones.len() as u32), chunk, ctx)?;
			match ctx.shapes.bones {
				BoneLayout::Four => {
					let bones: Vec<VertexBoneData4> = self.bones.iter().map(|b| b.into()).collect();
					write_values(ChunkType::SubmeshBones, &bones, chunk, ctx)?;
				}
				BoneLayout::Eight => write_values(ChunkType::SubmeshBones, &self.bones, chunk, ctx)?,
			}
		}

		Ok(())
	}
}

#[cfg(feature = "export")]
impl BinaryWrite for Mesh {
	const CHUNK: ChunkType = ChunkType::Mesh;

	fn write_fields(&self, chunk: &mut BinaryChunk, ctx: &WriteContext) -> Result<(), CmshError> {
		write_name(ChunkType::Name, &self.name, chunk, ctx)?;

		if let Some(skeleton) = &self.skeleton {
			write_name(ChunkType::MeshSkeleton, skeleton, chunk, ctx)?;
		}

		for submesh in self.submeshes.iter() {
			write_sub_entity(submesh, chunk, ctx)?;
		}

		Ok(())
	}
}

/// Collects the fields of a submesh. Each buffer is checked against its declared
/// count once the chunk is exhausted.
#[cfg(feature = "import")]
#[derive(Default)]
pub struct SubmeshParser {
	material: Option<String>,
	vertex_count: Option<u32>,
	vertices: Vec<Vertex>,
	colors: Vec<Color>,
	face_count: Option<u32>,
	faces: Vec<[u32; 3]>,
	bone_count: Option<u32>,
	bones: Vec<VertexBoneData>,
}

#[cfg(feature = "import")]
impl ChunkParser for SubmeshParser {
	/// `None` when the vertex buffer is inconsistent and the submesh was dropped
	type Output = Option<Submesh>;
	const CHUNK: ChunkType = ChunkType::Submesh;

	fn parse_field(&mut self, kind: ChunkType, sub: &mut BinaryChunk, ctx: &mut ParseContext)
		-> Result<bool, CmshError>
	{
		match kind {
			ChunkType::SubmeshMaterial => self.material = Some(parse_name(sub)?),
			ChunkType::SubmeshVertexCount => self.vertex_count = Some(parse_value(sub)?),
			ChunkType::SubmeshVertex => match ctx.shapes.vertex {
				VertexLayout::Double => self.vertices.extend(
					parse_values::<InterleavedVertex64>(sub)?.into_iter().map(Vertex::from)),
				VertexLayout::Single => self.vertices.extend(
					parse_values::<InterleavedVertex32>(sub)?.into_iter().map(Vertex::from)),
			},
			ChunkType::SubmeshColors => self.colors.extend(parse_values::<Color>(sub)?),
			ChunkType::SubmeshFaceCount => self.face_count = Some(parse_value(sub)?),
			ChunkType::SubmeshFaces => match ctx.shapes.faces {
				FaceLayout::U16 => self.faces.extend(parse_values::<[u16; 3]>(sub)?.into_iter()
					.map(|f| [f[0] as u32, f[1] as u32, f[2] as u32])),
				FaceLayout::U32 => self.faces.extend(parse_values::<[u32; 3]>(sub)?),
			},
			ChunkType::SubmeshBoneCount => self.bone_count = Some(parse_value(sub)?),
			ChunkType::SubmeshBones => {
				if ctx.flags.contains(ImportFlag::SKIP_BONE_DATA) {
					sub.end_parse();
					return Ok(true);
				}

				match ctx.shapes.bones {
					BoneLayout::Four => self.bones.extend(
						parse_values::<VertexBoneData4>(sub)?.into_iter().map(VertexBoneData::from)),
					BoneLayout::Eight => self.bones.extend(parse_values::<VertexBoneData>(sub)?),
				}
			}
			_ => return Ok(false),
		}

		Ok(true)
	}

	fn finish(mut self, ctx: &mut ParseContext) -> Result<Option<Submesh>, CmshError> {
		let tag = Self::CHUNK.tag();
		let vertex_count = self.vertex_count.unwrap_or(0) as usize;

		if vertex_count != self.vertices.len() {
			ctx.warn("submesh", tag, format!("{} vertices declared, {} stored", vertex_count,
				self.vertices.len()));
			return Ok(None);
		}

		if !self.colors.is_empty() && self.colors.len() != vertex_count {
			ctx.warn("submesh colours", tag, format!("{} colours for {} vertices", self.colors.len(),
				vertex_count));
			self.colors.clear();
		}

		let face_count = self.face_count.unwrap_or(0) as usize;
		if face_count != self.faces.len() {
			ctx.warn("submesh faces", tag, format!("{} faces declared, {} stored", face_count,
				self.faces.len()));
			self.faces.clear();
		} else if let Some(face) = self.faces.iter().find(|f| f.iter().any(|i| *i as usize >= vertex_count)) {
			ctx.warn("submesh faces", tag, format!("face {:?} out of {} vertices", face, vertex_count));
			self.faces.clear();
		}

		if !ctx.flags.contains(ImportFlag::SKIP_BONE_DATA) {
			let bone_count = self.bone_count.unwrap_or(0) as usize;
			if bone_count != self.bones.len() {
				ctx.warn("submesh bones", tag, format!("{} bone entries declared, {} stored", bone_count,
					self.bones.len()));
				self.bones.clear();
			} else if !self.bones.is_empty() && self.bones.len() != vertex_count {
				ctx.warn("submesh bones", tag, format!("{} bone entries for {} vertices", self.bones.len(),
					vertex_count));
				self.bones.clear();
			}
		}

		Ok(Some(Submesh {
			material: self.material,
			vertices: self.vertices,
			colors: self.colors,
			faces: self.faces,
			bones: self.bones,
		}))
	}
}

#[cfg(feature = "import")]
#[derive(Default)]
pub struct MeshParser {
	name: Option<String>,
	skeleton: Option<String>,
	submeshes: Vec<Submesh>,
}

#[cfg(feature = "import")]
impl ChunkParser for MeshParser {
	type Output = Mesh;
	const CHUNK: ChunkType = ChunkType::Mesh;

	fn parse_field(&mut self, kind: ChunkType, sub: &mut BinaryChunk, ctx: &mut ParseContext)
		-> Result<bool, CmshError>
	{
		match kind {
			ChunkType::Name => self.name = Some(parse_name(sub)?),
			ChunkType::MeshSkeleton => self.skeleton = Some(parse_name(sub)?),
			ChunkType::Submesh => {
				if let Some(submesh) = parse_entity::<SubmeshParser>(sub, ctx)? {
					self.submeshes.push(submesh);
				}
			}
			_ => return Ok(false),
		}

		Ok(true)
	}

	fn finish(self, ctx: &mut ParseContext) -> Result<Mesh, CmshError> {
		let name = match self.name {
			Some(name) => name,
			None => {
				ctx.warn("mesh name", Self::CHUNK.tag(), "no name chunk");
				String::new()
			}
		};

		Ok(Mesh {
			name: name,
			skeleton: self.skeleton,
			submeshes: self.submeshes,
		})
	}
}

#[cfg(all(test, feature = "import", feature = "export"))]
mod tests {
	use rgk_core::color::Color;

	use super::*;
	use crate::{
		protocol::write_entity,
		version::{
			CURRENT,
			FormatVersion,
			OLDEST
		}
	};

	fn triangle() -> Submesh {
		let mut vertices = vec![
			Vertex::new(Vec3::new(0.0, 0.0, 0.0)),
			Vertex::new(Vec3::new(1.0, 0.0, 0.0)),
			Vertex::new(Vec3::new(0.0, 1.0, 0.0)),
		];
		for v in vertices.iter_mut() {
			v.normal = Vec3::unit_z();
			v.tangent = Vec3::unit_x();
			v.uvw = Vec3::new(v.position.x, v.position.y, 0.0);
		}

		let mut bones = vec![VertexBoneData::default(); 3];
		for (i, b) in bones.iter_mut().enumerate() {
			b.add(i as u32, 1.0);
		}

		Submesh {
			material: Some("stone".to_string()),
			vertices: vertices,
			colors: vec![Color::default(); 3],
			faces: vec![[0, 1, 2]],
			bones: bones,
		}
	}

	fn roundtrip(mesh: &Mesh, version: FormatVersion, flags: ImportFlag) -> (Mesh, ParseContext) {
		let wctx = WriteContext::new(version, Endianness::native());
		let mut chunk = write_entity(mesh, &wctx).unwrap();

		let mut ctx = ParseContext::new(version, flags);
		let parsed = parse_entity::<MeshParser>(&mut chunk, &mut ctx).unwrap();
		(parsed, ctx)
	}

	#[test]
	fn test_mesh_roundtrip() {
		let mut mesh = Mesh::new("wall");
		mesh.skeleton = Some("rig".to_string());
		mesh.submeshes.push(triangle());
		mesh.submeshes.push(Submesh::default());

		let (parsed, ctx) = roundtrip(&mesh, CURRENT, ImportFlag::empty());
		assert_eq!(parsed, mesh);
		assert!(ctx.warnings.is_empty());
	}

	#[test]
	fn test_every_version() {
		let mut mesh = Mesh::new("wall");
		mesh.submeshes.push(triangle());

		for version in [OLDEST, FormatVersion::new(1, 1, 0), FormatVersion::new(1, 2, 0), CURRENT] {
			let (parsed, ctx) = roundtrip(&mesh, version, ImportFlag::empty());
			assert_eq!(parsed, mesh, "version {}", version);
			assert!(ctx.warnings.is_empty());
		}
	}

	#[test]
	fn test_double_layout_size() {
		let mut mesh = Mesh::new("wall");
		mesh.submeshes.push(triangle());

		let single = write_entity(&mesh, &WriteContext::new(CURRENT, Endianness::native())).unwrap();
		let double = write_entity(&mesh, &WriteContext::new(FormatVersion::new(1, 2, 0),
			Endianness::native())).unwrap();

		// 3 vertices of 15 f64 instead of 12 f32
		assert_eq!(double.data_size() - single.data_size(), 3 * (120 - 48));
	}

	#[test]
	fn test_four_heaviest_influences() {
		let mut data = VertexBoneData::default();
		for (id, weight) in [(1, 0.05), (2, 0.3), (3, 0.1), (4, 0.25), (5, 0.2), (6, 0.1)] {
			data.add(id, weight);
		}

		let legacy = VertexBoneData4::from(&data);
		assert_eq!(legacy.ids, [2, 4, 5, 3]);
		assert_eq!(VertexBoneData::from(legacy).influences(), 4);
	}

	#[test]
	fn test_u16_overflow() {
		let mut mesh = Mesh::new("big");
		let mut submesh = Submesh::default();
		submesh.vertices = vec![Vertex::default(); 70_000];
		submesh.faces = vec![[0, 1, 69_999]];
		mesh.submeshes.push(submesh);

		let wctx = WriteContext::new(OLDEST, Endianness::native());
		assert!(matches!(write_entity(&mesh, &wctx),
			Err(CmshError::IndexOverflow { index: 69_999, limit: 65_535, .. })));
	}

	#[test]
	fn test_skip_bone_data() {
		let mut mesh = Mesh::new("wall");
		mesh.submeshes.push(triangle());

		let (parsed, ctx) = roundtrip(&mesh, CURRENT, ImportFlag::SKIP_BONE_DATA);
		assert!(!parsed.submeshes[0].has_bone_data());
		assert_eq!(parsed.submeshes[0].faces, mesh.submeshes[0].faces);
		assert!(ctx.warnings.is_empty());
	}

	#[test]
	fn test_inconsistent_submeshes() {
		let wctx = WriteContext::new(CURRENT, Endianness::native());
		let mut mesh_chunk = BinaryChunk::new(ChunkType::Mesh);
		write_name(ChunkType::Name, "broken", &mut mesh_chunk, &wctx).unwrap();

		// vertex count disagrees with the buffer: dropped entirely
		let mut bad_vertices = BinaryChunk::new(ChunkType::Submesh);
		write_value(ChunkType::SubmeshVertexCount, &4u32, &mut bad_vertices, &wctx).unwrap();
		let three: Vec<InterleavedVertex32> = triangle().vertices.iter().map(|v| v.into()).collect();
		write_values(ChunkType::SubmeshVertex, &three, &mut bad_vertices, &wctx).unwrap();
		bad_vertices.finalise();
		mesh_chunk.add_sub_chunk(&bad_vertices).unwrap();

		// face beyond the vertex buffer: faces cleared, vertices kept
		let mut bad_faces = BinaryChunk::new(ChunkType::Submesh);
		write_value(ChunkType::SubmeshVertexCount, &3u32, &mut bad_faces, &wctx).unwrap();
		write_values(ChunkType::SubmeshVertex, &three, &mut bad_faces, &wctx).unwrap();
		write_value(ChunkType::SubmeshFaceCount, &1u32, &mut bad_faces, &wctx).unwrap();
		write_values(ChunkType::SubmeshFaces, &[[0u32, 1, 3]], &mut bad_faces, &wctx).unwrap();
		bad_faces.finalise();
		mesh_chunk.add_sub_chunk(&bad_faces).unwrap();
		mesh_chunk.finalise();

		let mut ctx = ParseContext::new(CURRENT, ImportFlag::empty());
		let mesh = parse_entity::<MeshParser>(&mut mesh_chunk, &mut ctx).unwrap();

		assert_eq!(mesh.name, "broken");
		assert_eq!(mesh.submeshes.len(), 1);
		assert_eq!(mesh.submeshes[0].vertices.len(), 3);
		assert!(mesh.submeshes[0].faces.is_empty());
		assert_eq!(ctx.warnings.len(), 2);
	}
}
