use {
	super::{CodecError, Compressor, OutputLen},
	crate::attributes::LayerAttributes,
};

const MAX_LITERALS: usize = 0x80;
const MIN_RUN: usize = 2;
const MAX_RUN: usize = 0x7F + MIN_RUN;
const RUN_BIT: u8 = 0x80;

/*
	Every block starts with a control byte :

	0x00..=0x7F : copy the next (c + 1) elements verbatim
	0x80..=0xFF : repeat the next element ((c & 0x7F) + 2) times

	An element is one byte, or an (id, attribute) pair for interleaved extended layers.
*/
#[derive(Clone, Copy, Debug)]
pub struct Rle {
	pub elementSize: usize,
}

impl Compressor for Rle {
	fn name(&self) -> &'static str {
		"RLE"
	}

	fn layerAttributes(&self) -> LayerAttributes {
		LayerAttributes::COMPRESSED_RLE
	}

	fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
		let elementSize = self.elementSize;
		if data.len() % elementSize != 0 {
			return Err(CodecError::Misaligned { len: data.len(), elementSize });
		}
		let elements = data.chunks_exact(elementSize).collect::<Vec<_>>();
		let (mut output, mut i, mut literalStart) = (Vec::with_capacity(data.len() / 2), 0, 0);
		let flushLiterals = |output: &mut Vec<u8>, from: usize, to: usize| {
			for chunk in elements[from..to].chunks(MAX_LITERALS) {
				output.push((chunk.len() - 1) as u8);
				for element in chunk {
					output.extend_from_slice(element);
				}
			}
		};
		while i < elements.len() {
			let mut run = 1;
			while i + run < elements.len() && run < MAX_RUN && elements[i + run] == elements[i] {
				run += 1;
			}
			if run >= MIN_RUN {
				flushLiterals(&mut output, literalStart, i);
				output.push(RUN_BIT | (run - MIN_RUN) as u8);
				output.extend_from_slice(elements[i]);
				i += run;
				literalStart = i;
			} else {
				i += 1;
			}
		}
		flushLiterals(&mut output, literalStart, elements.len());
		Ok(output)
	}

	fn decompress(&self, data: &[u8], outputLen: OutputLen) -> Result<Vec<u8>, CodecError> {
		let elementSize = self.elementSize;
		let (mut output, mut i) = (Vec::with_capacity(outputLen.initialCapacity(data.len())), 0);
		while i < data.len() {
			let control = data[i];
			i += 1;
			let (count, bytes) = if control & RUN_BIT == 0 {
				let count = usize::from(control) + 1;
				(1, count * elementSize)
			} else {
				(usize::from(control & !RUN_BIT) + MIN_RUN, elementSize)
			};
			let block = data.get(i..i + bytes).ok_or(CodecError::UnexpectedEnd)?;
			i += bytes;
			outputLen.reserve(output.len(), count * block.len())?;
			for _ in 0..count {
				output.extend_from_slice(block);
			}
		}
		outputLen.finish(output)
	}

	/// Every element as a one-element literal block.
	fn maxEncodedLen(&self, decodedLen: usize) -> Option<usize> {
		decodedLen.checked_add(decodedLen.div_ceil(self.elementSize))
	}
}
