//! Payload compressors. The container only knows them through [`Compressor`] and the layer flags.

pub mod rle;
pub mod zx0;

use {
	crate::attributes::LayerAttributes,
	log::info,
	thiserror::Error,
};

pub use {rle::Rle, zx0::Zx0};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
	#[error("compressed stream ends early")]
	UnexpectedEnd,

	#[error("back-reference to offset {offset} with only {available} bytes decoded")]
	InvalidOffset { offset: usize, available: usize },

	#[error("decoded {actual} bytes, expected {expected}")]
	LengthMismatch { expected: usize, actual: usize },

	#[error("{len} bytes is not a whole number of {elementSize}-byte elements")]
	Misaligned { len: usize, elementSize: usize },

	#[error("decoded output exceeds {limit} bytes")]
	OutputTooLarge { limit: usize },

	#[error("Elias-gamma value out of range")]
	GammaOverflow,
}

/// How many bytes a decompressor may produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputLen {
	/// Anything else is corrupt.
	Exact(usize),
	/// Decoding fails as soon as the output would grow past this.
	AtMost(usize),
	Unbounded,
}

impl OutputLen {
	#[must_use]
	pub fn limit(self) -> usize {
		match self {
			Self::Exact(len) | Self::AtMost(len) => len,
			Self::Unbounded => usize::MAX,
		}
	}

	fn initialCapacity(self, inputLen: usize) -> usize {
		match self {
			Self::Exact(len) => len,
			_ => inputLen.saturating_mul(4).min(self.limit()),
		}
	}

	/// Fails when `len` more bytes would not fit after `current`.
	fn reserve(self, current: usize, len: usize) -> Result<(), CodecError> {
		let actual = current.saturating_add(len);
		match self {
			_ if actual <= self.limit() => Ok(()),
			Self::Exact(expected) => Err(CodecError::LengthMismatch { expected, actual }),
			_ => Err(CodecError::OutputTooLarge { limit: self.limit() }),
		}
	}

	fn finish(self, output: Vec<u8>) -> Result<Vec<u8>, CodecError> {
		match self {
			Self::Exact(expected) if expected != output.len() => {
				Err(CodecError::LengthMismatch { expected, actual: output.len() })
			}
			_ => Ok(output),
		}
	}
}

pub trait Compressor {
	fn name(&self) -> &'static str;

	/// Flags a layer must carry so a reader picks this compressor again.
	fn layerAttributes(&self) -> LayerAttributes;

	fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

	fn decompress(&self, data: &[u8], outputLen: OutputLen) -> Result<Vec<u8>, CodecError>;

	/// Largest stream [`Self::compress`] can make out of `decodedLen` bytes, if known.
	fn maxEncodedLen(&self, _decodedLen: usize) -> Option<usize> {
		None
	}
}

/// Compressors applied to a layer with `attributes`, in compression order.
#[must_use]
pub fn stagesFor(attributes: LayerAttributes) -> Vec<Box<dyn Compressor>> {
	let mut stages: Vec<Box<dyn Compressor>> = Vec::with_capacity(2);
	if attributes.contains(LayerAttributes::COMPRESSED_RLE) {
		let interleaved = attributes.contains(LayerAttributes::EXTENDED_512)
			&& !attributes.contains(LayerAttributes::SPLIT);
		stages.push(Box::new(Rle { elementSize: if interleaved { 2 } else { 1 } }));
	}
	if attributes.contains(LayerAttributes::COMPRESSED_ZX0) {
		stages.push(Box::new(Zx0 {
			quick: attributes.contains(LayerAttributes::QUICK_MODE),
			backwards: attributes.contains(LayerAttributes::BACKWARDS_MODE),
		}));
	}
	stages
}

pub fn compressPayload(mut data: Vec<u8>, attributes: LayerAttributes) -> Result<Vec<u8>, CodecError> {
	for stage in stagesFor(attributes) {
		let oldLength = data.len();
		data = stage.compress(&data)?;
		info!("{}: {oldLength} -> {}", stage.name(), data.len());
	}
	Ok(data)
}

/// Undoes [`compressPayload`]. The last stage to run must produce exactly `expectedLen` bytes;
/// inner ones are bounded by what the stage after them can encode that length into.
pub fn decompressPayload(
	data: &[u8],
	attributes: LayerAttributes,
	expectedLen: usize,
) -> Result<Vec<u8>, CodecError> {
	let stages = stagesFor(attributes);
	let mut outputLens = Vec::with_capacity(stages.len());
	let mut outputLen = OutputLen::Exact(expectedLen);
	for stage in &stages {
		outputLens.push(outputLen);
		outputLen = match stage.maxEncodedLen(outputLen.limit()) {
			Some(len) => OutputLen::AtMost(len),
			None => OutputLen::Unbounded,
		};
	}
	let mut data = data.to_vec();
	for (stage, &outputLen) in stages.iter().zip(&outputLens).rev() {
		data = stage.decompress(&data, outputLen)?;
	}
	OutputLen::Exact(expectedLen).finish(data)
}
