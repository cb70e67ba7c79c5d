use std::io;
use thiserror::Error;

use crate::{
	State,
	tag::tag_name,
	version::FormatVersion
};

/// Failures aborting the import or export of a whole stream.
/// Offsets are absolute positions in the stream where known.
#[derive(Debug, Error)]
pub enum CmshError {
	#[error("Chunk {} already finalised", tag_name(*.0))]
	Finalised(u64),
	#[error("Deprecated chunk {} cannot be written", tag_name(*.0))]
	Deprecated(u64),
	#[error("Chunk {} payload of {size} bytes at offset {offset} is not a valid {expected}", tag_name(*.tag))]
	FieldTypeMismatch {
		tag: u64,
		offset: usize,
		size: usize,
		expected: &'static str,
	},
	#[error("Index {index} in chunk {} does not fit the limit of {limit}", tag_name(*.tag))]
	IndexOverflow {
		tag: u64,
		index: u64,
		limit: u64,
	},
	#[error("Operation not allowed in state {0:?}")]
	InvalidState(State),
	#[error("I/O error")]
	IO {
		#[from]
		source: io::Error,
	},
	#[error("Chunk {} declares {length} bytes, over the limit of {limit}", tag_name(*.tag))]
	LengthOverflow {
		tag: u64,
		length: u64,
		limit: u64,
	},
	#[error("Chunk {} at offset {offset} is not allowed inside {}", tag_name(*.tag), tag_name(*.parent))]
	MisplacedChunk {
		tag: u64,
		parent: u64,
		offset: usize,
	},
	#[error("Missing header or format version")]
	MissingHeader,
	#[error("Chunk {} must be finalised before being embedded or written", tag_name(*.0))]
	NotFinalised(u64),
	#[error("Chunk {} truncated at offset {offset}: needed {needed} bytes, {available} available", tag_name(*.tag))]
	StreamTruncated {
		tag: u64,
		offset: usize,
		needed: usize,
		available: usize,
	},
	#[error("Not a CMSH container: {}", tag_name(*.tag))]
	UnknownTopLevelTag {
		tag: u64,
	},
	#[error("Format version {found} is newer than the supported {supported}")]
	VersionTooNew {
		found: FormatVersion,
		supported: FormatVersion,
	},
}

/// Non-fatal problems. The affected sub-entity was dropped or defaulted.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Warning {
	#[error("{entity} in chunk {} dropped: {reason}", tag_name(*.tag))]
	SubEntityMissing {
		entity: &'static str,
		tag: u64,
		reason: String,
	},
}
