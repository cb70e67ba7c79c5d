use ultraviolet::{
	mat::Mat4,
	rotor::Rotor3,
	vec::Vec3
};

use crate::color::Color;

/// Maximum number of bones influencing a single vertex
pub const MAX_BONES_PER_VERTEX: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
	pub position: Vec3,
	pub normal: Vec3,
	pub tangent: Vec3,
	pub uvw: Vec3,
}

impl Vertex {
	pub fn new(position: Vec3) -> Vertex {
		Vertex {
			position: position,
			normal: Vec3::zero(),
			tangent: Vec3::zero(),
			uvw: Vec3::zero(),
		}
	}
}

impl Default for Vertex {
	fn default() -> Self {
		Vertex::new(Vec3::zero())
	}
}

/// Bone influences of a single vertex. Unused slots have a weight of 0.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VertexBoneData {
	pub ids: [u32; MAX_BONES_PER_VERTEX],
	pub weights: [f32; MAX_BONES_PER_VERTEX],
}

impl VertexBoneData {
	/// Stores an influence in the first free slot. Returns `false` when every slot is taken.
	pub fn add(&mut self, id: u32, weight: f32) -> bool {
		for i in 0..MAX_BONES_PER_VERTEX {
			if self.weights[i] == 0.0 {
				self.ids[i] = id;
				self.weights[i] = weight;
				return true;
			}
		}

		false
	}

	/// Number of slots holding a non-zero weight
	pub fn influences(&self) -> usize {
		self.weights.iter().filter(|w| **w != 0.0).count()
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Submesh {
	pub material: Option<String>,
	pub vertices: Vec<Vertex>,
	/// Per-vertex colours; either empty or one per vertex
	pub colors: Vec<Color>,
	pub faces: Vec<[u32; 3]>,
	/// Per-vertex bone influences; either empty or one per vertex
	pub bones: Vec<VertexBoneData>,
}

impl Submesh {
	pub fn has_bone_data(&self) -> bool {
		!self.bones.is_empty()
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
	pub name: String,
	/// Name of the skeleton animating this mesh, if any
	pub skeleton: Option<String>,
	pub submeshes: Vec<Submesh>,
}

impl Mesh {
	pub fn new(name: &str) -> Mesh {
		Mesh {
			name: name.to_string(),
			skeleton: None,
			submeshes: vec![],
		}
	}

	pub fn vertex_count(&self) -> usize {
		self.submeshes.iter().map(|s| s.vertices.len()).sum()
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bone {
	pub name: String,
	pub parent: Option<String>,
	/// Mesh space to bone space transform
	pub offset: Mat4,
}

impl Bone {
	pub fn new(name: &str, parent: Option<&str>) -> Bone {
		Bone {
			name: name.to_string(),
			parent: parent.map(|p| p.to_string()),
			offset: Mat4::identity(),
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Skeleton {
	pub name: String,
	pub global_inverse: Mat4,
	/// Bones, parents always listed before their children
	pub bones: Vec<Bone>,
}

impl Skeleton {
	pub fn new(name: &str) -> Skeleton {
		Skeleton {
			name: name.to_string(),
			global_inverse: Mat4::identity(),
			bones: vec![],
		}
	}

	pub fn find_bone(&self, name: &str) -> Option<&Bone> {
		self.bones.iter().find(|b| b.name == name)
	}
}

impl Default for Skeleton {
	fn default() -> Self {
		Skeleton::new("")
	}
}

/// Local transform of one bone at a key-frame
#[derive(Clone, Debug, PartialEq)]
pub struct BoneTransform {
	pub bone: String,
	pub translation: Vec3,
	pub rotation: Rotor3,
	pub scale: Vec3,
}

impl BoneTransform {
	pub fn new(bone: &str) -> BoneTransform {
		BoneTransform {
			bone: bone.to_string(),
			translation: Vec3::zero(),
			rotation: Rotor3::identity(),
			scale: Vec3::one(),
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Keyframe {
	/// Time in seconds from the start of the animation
	pub time: f32,
	pub transforms: Vec<BoneTransform>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Animation {
	pub name: String,
	/// Length in seconds
	pub length: f32,
	pub keyframes: Vec<Keyframe>,
}

impl Animation {
	pub fn new(name: &str) -> Animation {
		Animation {
			name: name.to_string(),
			length: 0.0,
			keyframes: vec![],
		}
	}

	/// Time of the latest key-frame, or 0 without any
	pub fn last_keyframe_time(&self) -> f32 {
		self.keyframes.iter().map(|k| k.time).fold(0.0, f32::max)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_bone_data_add() {
		let mut data = VertexBoneData::default();
		for i in 0..(MAX_BONES_PER_VERTEX as u32) {
			assert!(data.add(i, 0.125));
		}
		assert!(!data.add(99, 1.0));
		assert_eq!(data.influences(), MAX_BONES_PER_VERTEX);
		assert_eq!(data.ids[7], 7);
	}

	#[test]
	fn test_last_keyframe_time() {
		let mut anim = Animation::new("walk");
		assert_eq!(anim.last_keyframe_time(), 0.0);

		anim.keyframes.push(Keyframe { time: 1.5, transforms: vec![] });
		anim.keyframes.push(Keyframe { time: 0.5, transforms: vec![] });
		assert_eq!(anim.last_keyframe_time(), 1.5);
	}

	#[test]
	fn test_find_bone() {
		let mut skel = Skeleton::new("rig");
		skel.bones.push(Bone::new("root", None));
		skel.bones.push(Bone::new("spine", Some("root")));

		assert_eq!(skel.find_bone("spine").and_then(|b| b.parent.as_deref()), Some("root"));
		assert!(skel.find_bone("tail").is_none());
	}
}
