use rgk_core::scene::{
	Bone,
	Skeleton
};

use crate::{
	chunk::BinaryChunk,
	error::CmshError,
	tag::ChunkType
};

#[cfg(feature = "export")]
use crate::protocol::{
	BinaryWrite,
	WriteContext,
	write_name,
	write_sub_entity,
	write_value
};

#[cfg(feature = "import")]
use ultraviolet::mat::Mat4;

#[cfg(feature = "import")]
use crate::protocol::{
	ChunkParser,
	ParseContext,
	parse_entity,
	parse_name,
	parse_value
};

#[cfg(feature = "export")]
impl BinaryWrite for Bone {
	const CHUNK: ChunkType = ChunkType::SkeletonBone;

	fn write_fields(&self, chunk: &mut BinaryChunk, ctx: &WriteContext) -> Result<(), CmshError> {
		write_name(ChunkType::Name, &self.name, chunk, ctx)?;

		if let Some(parent) = &self.parent {
			write_name(ChunkType::BoneParentName, parent, chunk, ctx)?;
		}

		write_value(ChunkType::BoneOffsetMatrix, &self.offset, chunk, ctx)
	}
}

#[cfg(feature = "export")]
impl BinaryWrite for Skeleton {
	const CHUNK: ChunkType = ChunkType::Skeleton;

	fn write_fields(&self, chunk: &mut BinaryChunk, ctx: &WriteContext) -> Result<(), CmshError> {
		write_name(ChunkType::Name, &self.name, chunk, ctx)?;
		write_value(ChunkType::SkeletonGlobalInverse, &self.global_inverse, chunk, ctx)?;

		for bone in self.bones.iter() {
			write_sub_entity(bone, chunk, ctx)?;
		}

		Ok(())
	}
}

#[cfg(feature = "import")]
#[derive(Default)]
pub struct BoneParser {
	name: Option<String>,
	parent: Option<String>,
	offset: Option<Mat4>,
}

#[cfg(feature = "import")]
impl ChunkParser for BoneParser {
	/// `None` for a bone without name, which nothing could refer to
	type Output = Option<Bone>;
	const CHUNK: ChunkType = ChunkType::SkeletonBone;

	fn parse_field(&mut self, kind: ChunkType, sub: &mut BinaryChunk, _ctx: &mut ParseContext)
		-> Result<bool, CmshError>
	{
		match kind {
			ChunkType::Name => self.name = Some(parse_name(sub)?),
			ChunkType::BoneParentName => self.parent = Some(parse_name(sub)?),
			ChunkType::BoneOffsetMatrix => self.offset = Some(parse_value(sub)?),
			_ => return Ok(false),
		}

		Ok(true)
	}

	fn finish(self, ctx: &mut ParseContext) -> Result<Option<Bone>, CmshError> {
		let name = match self.name {
			Some(name) => name,
			None => {
				ctx.warn("bone", Self::CHUNK.tag(), "no name chunk");
				return Ok(None);
			}
		};

		Ok(Some(Bone {
			name: name,
			parent: self.parent,
			offset: self.offset.unwrap_or_else(Mat4::identity),
		}))
	}
}

#[cfg(feature = "import")]
#[derive(Default)]
pub struct SkeletonParser {
	name: Option<String>,
	global_inverse: Option<Mat4>,
	bones: Vec<Bone>,
}

#[cfg(feature = "import")]
impl ChunkParser for SkeletonParser {
	type Output = Skeleton;
	const CHUNK: ChunkType = ChunkType::Skeleton;

	fn parse_field(&mut self, kind: ChunkType, sub: &mut BinaryChunk, ctx: &mut ParseContext)
		-> Result<bool, CmshError>
	{
		match kind {
			ChunkType::Name => self.name = Some(parse_name(sub)?),
			ChunkType::SkeletonGlobalInverse => self.global_inverse = Some(parse_value(sub)?),
			ChunkType::SkeletonBone => {
				if let Some(mut bone) = parse_entity::<BoneParser>(sub, ctx)? {
					// parents are always stored before their children
					let orphan = match &bone.parent {
						Some(parent) => !self.bones.iter().any(|b| &b.name == parent),
						None => false,
					};
					if orphan {
						ctx.warn("bone parent", ChunkType::BoneParentName.tag(), format!(
							"{} refers to undefined parent {}", bone.name,
							bone.parent.as_deref().unwrap_or_default()));
						bone.parent = None;
					}

					self.bones.push(bone);
				}
			}
			_ => return Ok(false),
		}

		Ok(true)
	}

	fn finish(self, ctx: &mut ParseContext) -> Result<Skeleton, CmshError> {
		let name = match self.name {
			Some(name) => name,
			None => {
				ctx.warn("skeleton name", Self::CHUNK.tag(), "no name chunk");
				String::new()
			}
		};

		Ok(Skeleton {
			name: name,
			global_inverse: self.global_inverse.unwrap_or_else(Mat4::identity),
			bones: self.bones,
		})
	}
}
