use rgk_core::scene::{
	Animation,
	BoneTransform,
	Keyframe
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
use ultraviolet::{
	rotor::Rotor3,
	vec::Vec3
};

#[cfg(feature = "import")]
use crate::protocol::{
	ChunkParser,
	ParseContext,
	parse_entity,
	parse_name,
	parse_value
};

#[cfg(feature = "export")]
impl BinaryWrite for BoneTransform {
	const CHUNK: ChunkType = ChunkType::KeyframeObject;

	fn write_fields(&self, chunk: &mut BinaryChunk, ctx: &WriteContext) -> Result<(), CmshError> {
		write_name(ChunkType::Name, &self.bone, chunk, ctx)?;
		write_value(ChunkType::KeyframeTranslate, &self.translation, chunk, ctx)?;
		write_value(ChunkType::KeyframeRotate, &self.rotation, chunk, ctx)?;
		write_value(ChunkType::KeyframeScale, &self.scale, chunk, ctx)
	}
}

#[cfg(feature = "export")]
impl BinaryWrite for Keyframe {
	const CHUNK: ChunkType = ChunkType::Keyframe;

	fn write_fields(&self, chunk: &mut BinaryChunk, ctx: &WriteContext) -> Result<(), CmshError> {
		write_value(ChunkType::KeyframeTime, &self.time, chunk, ctx)?;

		for transform in self.transforms.iter() {
			write_sub_entity(transform, chunk, ctx)?;
		}

		Ok(())
	}
}

#[cfg(feature = "export")]
impl BinaryWrite for Animation {
	const CHUNK: ChunkType = ChunkType::Animation;

	fn write_fields(&self, chunk: &mut BinaryChunk, ctx: &WriteContext) -> Result<(), CmshError> {
		write_name(ChunkType::Name, &self.name, chunk, ctx)?;
		write_value(ChunkType::AnimationLength, &self.length, chunk, ctx)?;

		for keyframe in self.keyframes.iter() {
			write_sub_entity(keyframe, chunk, ctx)?;
		}

		Ok(())
	}
}

/// Missing components keep the identity transform
#[cfg(feature = "import")]
#[derive(Default)]
pub struct TransformParser {
	bone: Option<String>,
	translation: Option<Vec3>,
	rotation: Option<Rotor3>,
	scale: Option<Vec3>,
}

#[cfg(feature = "import")]
impl ChunkParser for TransformParser {
	type Output = Option<BoneTransform>;
	const CHUNK: ChunkType = ChunkType::KeyframeObject;

	fn parse_field(&mut self, kind: ChunkType, sub: &mut BinaryChunk, _ctx: &mut ParseContext)
		-> Result<bool, CmshError>
	{
		match kind {
			ChunkType::Name => self.bone = Some(parse_name(sub)?),
			ChunkType::KeyframeTranslate => self.translation = Some(parse_value(sub)?),
			ChunkType::KeyframeRotate => self.rotation = Some(parse_value(sub)?),
			ChunkType::KeyframeScale => self.scale = Some(parse_value(sub)?),
			_ => return Ok(false),
		}

		Ok(true)
	}

	fn finish(self, ctx: &mut ParseContext) -> Result<Option<BoneTransform>, CmshError> {
		let bone = match self.bone {
			Some(bone) => bone,
			None => {
				ctx.warn("key-frame object", Self::CHUNK.tag(), "no bone name");
				return Ok(None);
			}
		};

		let mut transform = BoneTransform::new(&bone);
		if let Some(t) = self.translation {
			transform.translation = t;
		}
		if let Some(r) = self.rotation {
			transform.rotation = r;
		}
		if let Some(s) = self.scale {
			transform.scale = s;
		}

		Ok(Some(transform))
	}
}

#[cfg(feature = "import")]
#[derive(Default)]
pub struct KeyframeParser {
	time: Option<f32>,
	transforms: Vec<BoneTransform>,
}

#[cfg(feature = "import")]
impl ChunkParser for KeyframeParser {
	/// `None` for a key-frame without time, which cannot be placed
	type Output = Option<Keyframe>;
	const CHUNK: ChunkType = ChunkType::Keyframe;

	fn parse_field(&mut self, kind: ChunkType, sub: &mut BinaryChunk, ctx: &mut ParseContext)
		-> Result<bool, CmshError>
	{
		match kind {
			ChunkType::KeyframeTime => self.time = Some(parse_value(sub)?),
			ChunkType::KeyframeObject => {
				if let Some(transform) = parse_entity::<TransformParser>(sub, ctx)? {
					self.transforms.push(transform);
				}
			}
			_ => return Ok(false),
		}

		Ok(true)
	}

	fn finish(self, ctx: &mut ParseContext) -> Result<Option<Keyframe>, CmshError> {
		match self.time {
			Some(time) => Ok(Some(Keyframe {
				time: time,
				transforms: self.transforms,
			})),
			None => {
				ctx.warn("key-frame", Self::CHUNK.tag(), "no time chunk");
				Ok(None)
			}
		}
	}
}

#[cfg(feature = "import")]
#[derive(Default)]
pub struct AnimationParser {
	name: Option<String>,
	length: Option<f32>,
	keyframes: Vec<Keyframe>,
}

#[cfg(feature = "import")]
impl ChunkParser for AnimationParser {
	type Output = Animation;
	const CHUNK: ChunkType = ChunkType::Animation;

	fn parse_field(&mut self, kind: ChunkType, sub: &mut BinaryChunk, ctx: &mut ParseContext)
		-> Result<bool, CmshError>
	{
		match kind {
			ChunkType::Name => self.name = Some(parse_name(sub)?),
			ChunkType::AnimationLength => self.length = Some(parse_value(sub)?),
			ChunkType::Keyframe => {
				if let Some(keyframe) = parse_entity::<KeyframeParser>(sub, ctx)? {
					self.keyframes.push(keyframe);
				}
			}
			_ => return Ok(false),
		}

		Ok(true)
	}

	fn finish(self, ctx: &mut ParseContext) -> Result<Animation, CmshError> {
		let name = match self.name {
			Some(name) => name,
			None => {
				ctx.warn("animation name", Self::CHUNK.tag(), "no name chunk");
				String::new()
			}
		};

		let mut animation = Animation::new(&name);
		animation.keyframes = self.keyframes;
		animation.length = match self.length {
			Some(length) => length,
			None => animation.last_keyframe_time(),
		};

		Ok(animation)
	}
}
