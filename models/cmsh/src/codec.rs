//! Byte encoding of every value type stored in a chunk.
//!
//! Each type describes how it lies in memory on a given host ([`Codec::view`] and
//! [`Codec::load`]) and how to switch its byte order ([`Codec::flip`]). [`encode`] and
//! [`decode`] combine the two so that the bytes on disk are always [`WIRE_ORDER`],
//! whatever the host.

use byteorder::{
	BE,
	ByteOrder,
	LE
};

use ultraviolet::{
	bivec::Bivec3,
	mat::{
		Mat3,
		Mat4
	},
	rotor::Rotor3,
	vec::{
		Vec2,
		Vec3,
		Vec4
	}
};

use rgk_core::{
	color::Color,
	scene::{
		MAX_BONES_PER_VERTEX,
		VertexBoneData
	}
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endianness {
	Little,
	Big,
}

impl Endianness {
	pub const fn native() -> Endianness {
		if cfg!(target_endian = "big") {
			Endianness::Big
		} else {
			Endianness::Little
		}
	}
}

/// Byte order of every multi-byte value on disk
pub const WIRE_ORDER: Endianness = Endianness::Big;

pub trait Codec: Copy {
	/// Encoded size in bytes
	const SIZE: usize;

	/// Appends the bytes of this value as laid out in memory on `host`
	fn view(&self, host: Endianness, out: &mut Vec<u8>);

	/// Reads a value laid out as on `host`, consuming `SIZE` bytes.
	/// Callers guarantee at least `SIZE` bytes are present.
	fn load(host: Endianness, bytes: &mut &[u8]) -> Self;

	/// Reverses the byte order of every scalar making up this value
	fn flip(&mut self);
}

/// Encodes a value in wire order on behalf of `host`
pub fn encode<T: Codec>(value: &T, host: Endianness, out: &mut Vec<u8>) {
	let mut value = *value;
	if host != WIRE_ORDER {
		value.flip();
	}
	value.view(host, out);
}

/// Decodes a wire order value on behalf of `host`. `bytes` must hold at least `T::SIZE` bytes.
pub fn decode<T: Codec>(host: Endianness, bytes: &mut &[u8]) -> T {
	let mut value = T::load(host, bytes);
	if host != WIRE_ORDER {
		value.flip();
	}
	value
}

pub fn encode_slice<T: Codec>(values: &[T], host: Endianness, out: &mut Vec<u8>) {
	out.reserve(values.len() * T::SIZE);
	for value in values.iter() {
		encode(value, host, out);
	}
}

/// Decodes as many whole values as `bytes` holds
pub fn decode_vec<T: Codec>(host: Endianness, mut bytes: &[u8]) -> Vec<T> {
	let mut values = Vec::with_capacity(bytes.len() / T::SIZE);
	while bytes.len() >= T::SIZE {
		values.push(decode(host, &mut bytes));
	}
	values
}

fn split<'a>(bytes: &mut &'a [u8], n: usize) -> &'a [u8] {
	let (head, rest) = bytes.split_at(n);
	*bytes = rest;
	head
}

macro_rules! scalar_codec {
	($t: ty, $n: literal, $read: ident, $write: ident) => {
		impl Codec for $t {
			const SIZE: usize = $n;

			fn view(&self, host: Endianness, out: &mut Vec<u8>) {
				let mut raw = [0; $n];
				match host {
					Endianness::Little => LE::$write(&mut raw, *self),
					Endianness::Big => BE::$write(&mut raw, *self),
				}
				out.extend_from_slice(&raw);
			}

			fn load(host: Endianness, bytes: &mut &[u8]) -> Self {
				let raw = split(bytes, $n);
				match host {
					Endianness::Little => LE::$read(raw),
					Endianness::Big => BE::$read(raw),
				}
			}

			fn flip(&mut self) {
				let mut raw = self.to_ne_bytes();
				raw.reverse();
				*self = <$t>::from_ne_bytes(raw);
			}
		}
	}
}

scalar_codec!(u16, 2, read_u16, write_u16);
scalar_codec!(i16, 2, read_i16, write_i16);
scalar_codec!(u32, 4, read_u32, write_u32);
scalar_codec!(i32, 4, read_i32, write_i32);
scalar_codec!(u64, 8, read_u64, write_u64);
scalar_codec!(i64, 8, read_i64, write_i64);
scalar_codec!(f32, 4, read_f32, write_f32);
scalar_codec!(f64, 8, read_f64, write_f64);

impl Codec for u8 {
	const SIZE: usize = 1;

	fn view(&self, _host: Endianness, out: &mut Vec<u8>) {
		out.push(*self);
	}

	fn load(_host: Endianness, bytes: &mut &[u8]) -> Self {
		split(bytes, 1)[0]
	}

	fn flip(&mut self) {}
}

impl Codec for i8 {
	const SIZE: usize = 1;

	fn view(&self, _host: Endianness, out: &mut Vec<u8>) {
		out.push(*self as u8);
	}

	fn load(_host: Endianness, bytes: &mut &[u8]) -> Self {
		split(bytes, 1)[0] as i8
	}

	fn flip(&mut self) {}
}

impl<T: Codec, const N: usize> Codec for [T; N] {
	const SIZE: usize = N * T::SIZE;

	fn view(&self, host: Endianness, out: &mut Vec<u8>) {
		for v in self.iter() {
			v.view(host, out);
		}
	}

	fn load(host: Endianness, bytes: &mut &[u8]) -> Self {
		std::array::from_fn(|_| T::load(host, bytes))
	}

	fn flip(&mut self) {
		for v in self.iter_mut() {
			v.flip();
		}
	}
}

impl Codec for Vec2 {
	const SIZE: usize = 8;

	fn view(&self, host: Endianness, out: &mut Vec<u8>) {
		[self.x, self.y].view(host, out);
	}

	fn load(host: Endianness, bytes: &mut &[u8]) -> Self {
		let [x, y] = <[f32; 2]>::load(host, bytes);
		Vec2::new(x, y)
	}

	fn flip(&mut self) {
		self.x.flip();
		self.y.flip();
	}
}

impl Codec for Vec3 {
	const SIZE: usize = 12;

	fn view(&self, host: Endianness, out: &mut Vec<u8>) {
		[self.x, self.y, self.z].view(host, out);
	}

	fn load(host: Endianness, bytes: &mut &[u8]) -> Self {
		let [x, y, z] = <[f32; 3]>::load(host, bytes);
		Vec3::new(x, y, z)
	}

	fn flip(&mut self) {
		self.x.flip();
		self.y.flip();
		self.z.flip();
	}
}

impl Codec for Vec4 {
	const SIZE: usize = 16;

	fn view(&self, host: Endianness, out: &mut Vec<u8>) {
		[self.x, self.y, self.z, self.w].view(host, out);
	}

	fn load(host: Endianness, bytes: &mut &[u8]) -> Self {
		let [x, y, z, w] = <[f32; 4]>::load(host, bytes);
		Vec4::new(x, y, z, w)
	}

	fn flip(&mut self) {
		self.x.flip();
		self.y.flip();
		self.z.flip();
		self.w.flip();
	}
}

/// Column major
impl Codec for Mat3 {
	const SIZE: usize = 3 * Vec3::SIZE;

	fn view(&self, host: Endianness, out: &mut Vec<u8>) {
		self.cols.view(host, out);
	}

	fn load(host: Endianness, bytes: &mut &[u8]) -> Self {
		let [c0, c1, c2] = <[Vec3; 3]>::load(host, bytes);
		Mat3::new(c0, c1, c2)
	}

	fn flip(&mut self) {
		self.cols.flip();
	}
}

/// Column major
impl Codec for Mat4 {
	const SIZE: usize = 4 * Vec4::SIZE;

	fn view(&self, host: Endianness, out: &mut Vec<u8>) {
		self.cols.view(host, out);
	}

	fn load(host: Endianness, bytes: &mut &[u8]) -> Self {
		let [c0, c1, c2, c3] = <[Vec4; 4]>::load(host, bytes);
		Mat4::new(c0, c1, c2, c3)
	}

	fn flip(&mut self) {
		self.cols.flip();
	}
}

/// Stored as scalar, then the xy, xz and yz bivector parts
impl Codec for Rotor3 {
	const SIZE: usize = 16;

	fn view(&self, host: Endianness, out: &mut Vec<u8>) {
		[self.s, self.bv.xy, self.bv.xz, self.bv.yz].view(host, out);
	}

	fn load(host: Endianness, bytes: &mut &[u8]) -> Self {
		let [s, xy, xz, yz] = <[f32; 4]>::load(host, bytes);
		Rotor3::new(s, Bivec3::new(xy, xz, yz))
	}

	fn flip(&mut self) {
		self.s.flip();
		self.bv.xy.flip();
		self.bv.xz.flip();
		self.bv.yz.flip();
	}
}

/// Stored as red, green, blue, alpha
impl Codec for Color {
	const SIZE: usize = 16;

	fn view(&self, host: Endianness, out: &mut Vec<u8>) {
		[self.red, self.green, self.blue, self.alpha].view(host, out);
	}

	fn load(host: Endianness, bytes: &mut &[u8]) -> Self {
		let [r, g, b, a] = <[f32; 4]>::load(host, bytes);
		Color::new(r, g, b, a)
	}

	fn flip(&mut self) {
		self.red.flip();
		self.green.flip();
		self.blue.flip();
		self.alpha.flip();
	}
}

/// Stored as all ids, then all weights
impl Codec for VertexBoneData {
	const SIZE: usize = MAX_BONES_PER_VERTEX * 8;

	fn view(&self, host: Endianness, out: &mut Vec<u8>) {
		self.ids.view(host, out);
		self.weights.view(host, out);
	}

	fn load(host: Endianness, bytes: &mut &[u8]) -> Self {
		VertexBoneData {
			ids: Codec::load(host, bytes),
			weights: Codec::load(host, bytes),
		}
	}

	fn flip(&mut self) {
		self.ids.flip();
		self.weights.flip();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn roundtrip_across_hosts<T: Codec + PartialEq + std::fmt::Debug>(value: T) {
		let mut le = vec![];
		encode(&value, Endianness::Little, &mut le);
		let mut be = vec![];
		encode(&value, Endianness::Big, &mut be);

		// the wire bytes do not depend on the host
		assert_eq!(le, be);
		assert_eq!(le.len(), T::SIZE);

		let from_le: T = decode(Endianness::Big, &mut le.as_slice());
		let from_be: T = decode(Endianness::Little, &mut be.as_slice());
		assert_eq!(from_le, value);
		assert_eq!(from_be, value);
	}

	#[test]
	fn test_wire_is_big_endian() {
		let mut out = vec![];
		encode(&0x0102_0304u32, Endianness::Little, &mut out);
		assert_eq!(out, [1, 2, 3, 4]);

		out.clear();
		encode(&1.0f32, Endianness::native(), &mut out);
		assert_eq!(out, 1.0f32.to_be_bytes());
	}

	#[test]
	fn test_flip_twice() {
		let mut v = -123_456_789i64;
		v.flip();
		assert_ne!(v, -123_456_789);
		v.flip();
		assert_eq!(v, -123_456_789);

		let mut f = 0.15625f32;
		f.flip();
		f.flip();
		assert_eq!(f, 0.15625);
	}

	#[test]
	fn test_portable_scalars() {
		roundtrip_across_hosts(0xBEEFu16);
		roundtrip_across_hosts(-2i16);
		roundtrip_across_hosts(0xDEAD_BEEFu32);
		roundtrip_across_hosts(-70_000i32);
		roundtrip_across_hosts(u64::MAX - 7);
		roundtrip_across_hosts(i64::MIN + 3);
		roundtrip_across_hosts(3.5f32);
		roundtrip_across_hosts(-0.000_1f64);
		roundtrip_across_hosts(0x7Fu8);
		roundtrip_across_hosts(-5i8);
	}

	#[test]
	fn test_portable_aggregates() {
		roundtrip_across_hosts([1u32, 2, 3]);
		roundtrip_across_hosts(Vec2::new(0.5, -0.25));
		roundtrip_across_hosts(Vec3::new(1.0, 2.0, 3.0));
		roundtrip_across_hosts(Vec4::new(0.0155714415, 0.117667466, 0.089328438, -0.106262207));
		roundtrip_across_hosts(Mat3::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0),
			Vec3::new(7.0, 8.0, 9.0)));
		roundtrip_across_hosts(Mat4::from_translation(Vec3::new(1.0, -2.0, 3.0)));
		roundtrip_across_hosts(Rotor3::new(0.5, Bivec3::new(0.5, -0.5, 0.5)));
		roundtrip_across_hosts(Color::new(0.25, 0.5, 0.75, 1.0));

		let mut bones = VertexBoneData::default();
		bones.add(3, 0.75);
		bones.add(9, 0.25);
		roundtrip_across_hosts(bones);
	}

	#[test]
	fn test_mat4_column_major() {
		let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
		let mut out = vec![];
		encode(&m, WIRE_ORDER, &mut out);

		// translation lives in the fourth column, i.e. the last 16 bytes
		let mut tail = &out[48..];
		let t: Vec4 = decode(WIRE_ORDER, &mut tail);
		assert_eq!(t, Vec4::new(1.0, 2.0, 3.0, 1.0));
	}

	#[test]
	fn test_slices() {
		let faces = vec![[0u32, 1, 2], [2, 1, 3]];
		let mut out = vec![];
		encode_slice(&faces, Endianness::Little, &mut out);
		assert_eq!(out.len(), 24);
		assert_eq!(decode_vec::<[u32; 3]>(Endianness::Big, &out), faces);

		// trailing partial values are ignored
		out.push(0);
		assert_eq!(decode_vec::<[u32; 3]>(Endianness::Little, &out).len(), 2);
	}
}
