use {
	super::{CodecError, Compressor, OutputLen},
	crate::attributes::LayerAttributes,
	rustc_hash::FxHashMap,
};

const INITIAL_OFFSET: usize = 1;
const MAX_OFFSET: usize = 32640;
const MAX_OFFSET_QUICK: usize = 2176;
const MAX_CHAIN: usize = 1024;
const MAX_CHAIN_QUICK: usize = 32;
const END_MARKER: usize = 256;
const MAX_GAMMA: usize = 1 << 24;
/// Largest value [`BitReader::readGamma`] accepts, and so the longest block.
const MAX_BLOCK_LEN: usize = 2 * MAX_GAMMA - 1;

/// ZX0 bitstream with the v2 inverted offset MSB. `backwards` streams are meant to be decoded
/// from their last byte towards the first.
#[derive(Clone, Copy, Debug, Default)]
pub struct Zx0 {
	pub quick: bool,
	pub backwards: bool,
}

enum Block {
	Literals { start: usize, len: usize },
	LastOffset { len: usize },
	NewOffset { offset: usize, len: usize },
}

impl Compressor for Zx0 {
	fn name(&self) -> &'static str {
		"ZX0"
	}

	fn layerAttributes(&self) -> LayerAttributes {
		let mut attributes = LayerAttributes::COMPRESSED_ZX0;
		attributes.set(LayerAttributes::QUICK_MODE, self.quick);
		attributes.set(LayerAttributes::BACKWARDS_MODE, self.backwards);
		attributes
	}

	fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
		if data.is_empty() {
			return Ok(Vec::new());
		}
		if self.backwards {
			let reversed = data.iter().rev().copied().collect::<Vec<_>>();
			let mut output = self.encode(&reversed, &self.parse(&reversed)?);
			output.reverse();
			Ok(output)
		} else {
			Ok(self.encode(data, &self.parse(data)?))
		}
	}

	fn decompress(&self, data: &[u8], outputLen: OutputLen) -> Result<Vec<u8>, CodecError> {
		let output = if data.is_empty() {
			Vec::new()
		} else if self.backwards {
			let reversed = data.iter().rev().copied().collect::<Vec<_>>();
			let mut output = self.decode(&reversed, outputLen)?;
			output.reverse();
			output
		} else {
			self.decode(data, outputLen)?
		};
		outputLen.finish(output)
	}
}

impl Zx0 {
	/// Greedy parse over hash chains of 2-byte prefixes. Matches stop at [`MAX_BLOCK_LEN`]; a
	/// longer literal run can't be encoded.
	fn parse(&self, input: &[u8]) -> Result<Vec<Block>, CodecError> {
		let (maxOffset, maxChain) =
			if self.quick { (MAX_OFFSET_QUICK, MAX_CHAIN_QUICK) } else { (MAX_OFFSET, MAX_CHAIN) };
		let (mut blocks, mut chains) = (Vec::new(), FxHashMap::<[u8; 2], Vec<usize>>::default());
		let (mut i, mut literalStart, mut lastOffset) = (0, 0, INITIAL_OFFSET);
		let matchLen = |at: usize, offset: usize| {
			let mut len = 0;
			while len < MAX_BLOCK_LEN
				&& at + len < input.len()
				&& input[at + len] == input[at + len - offset]
			{
				len += 1;
			}
			len
		};
		let literals = |start: usize, end: usize| match end - start {
			len if len > MAX_BLOCK_LEN => Err(CodecError::GammaOverflow),
			len => Ok(Block::Literals { start, len }),
		};
		let insert = |chains: &mut FxHashMap<[u8; 2], Vec<usize>>, at: usize| {
			if at + 1 < input.len() {
				chains.entry([input[at], input[at + 1]]).or_default().push(at);
			}
		};
		while i < input.len() {
			let afterLiterals = i > literalStart;
			let repLen = if afterLiterals && lastOffset <= i { matchLen(i, lastOffset) } else { 0 };
			let (mut bestOffset, mut bestLen) = (0, 0);
			if i + 1 < input.len() {
				if let Some(chain) = chains.get(&[input[i], input[i + 1]]) {
					for &candidate in chain.iter().rev().take(maxChain) {
						let offset = i - candidate;
						if offset > maxOffset {
							break;
						}
						let len = matchLen(i, offset);
						if len > bestLen {
							(bestOffset, bestLen) = (offset, len);
						}
					}
				}
			}
			let (block, len) = if repLen >= 1 && repLen >= bestLen {
				(Block::LastOffset { len: repLen }, repLen)
			} else if bestLen >= 2 {
				lastOffset = bestOffset;
				(Block::NewOffset { offset: bestOffset, len: bestLen }, bestLen)
			} else {
				insert(&mut chains, i);
				i += 1;
				continue;
			};
			if afterLiterals {
				blocks.push(literals(literalStart, i)?);
			}
			blocks.push(block);
			for at in i..i + len {
				insert(&mut chains, at);
			}
			i += len;
			literalStart = i;
		}
		if i > literalStart {
			blocks.push(literals(literalStart, i)?);
		}
		Ok(blocks)
	}

	fn encode(&self, input: &[u8], blocks: &[Block]) -> Vec<u8> {
		let (writer, backwards) = (&mut BitWriter::default(), self.backwards);
		let invert = !backwards;
		for (i, block) in blocks.iter().enumerate() {
			match *block {
				Block::Literals { start, len } => {
					if i != 0 {
						writer.writeBit(false);
					}
					writer.writeGamma(len, backwards, false);
					for &byte in &input[start..start + len] {
						writer.writeByte(byte);
					}
				}
				Block::LastOffset { len } => {
					writer.writeBit(false);
					writer.writeGamma(len, backwards, false);
				}
				Block::NewOffset { offset, len } => {
					writer.writeBit(true);
					writer.writeGamma((offset - 1) / 128 + 1, backwards, invert);
					let lsb = (offset - 1) % 128;
					let lsb = if backwards { lsb } else { 127 - lsb };
					writer.writeByte((lsb << 1) as u8);
					writer.backtrack = true;
					writer.writeGamma(len - 1, backwards, false);
				}
			}
		}
		writer.writeBit(true);
		writer.writeGamma(END_MARKER, backwards, invert);
		std::mem::take(&mut writer.output)
	}

	fn decode(&self, input: &[u8], outputLen: OutputLen) -> Result<Vec<u8>, CodecError> {
		enum State {
			Literals,
			LastOffset,
			NewOffset,
		}
		let (reader, backwards) = (&mut BitReader::new(input), self.backwards);
		let invert = !backwards;
		let (mut output, mut lastOffset, mut state) =
			(Vec::with_capacity(outputLen.initialCapacity(input.len())), INITIAL_OFFSET, State::Literals);
		let checkCapacity = |output: &Vec<u8>, len: usize| outputLen.reserve(output.len(), len);
		loop {
			state = match state {
				State::Literals => {
					let len = reader.readGamma(backwards, false)?;
					checkCapacity(&output, len)?;
					for _ in 0..len {
						output.push(reader.readByte()?);
					}
					if reader.readBit()? { State::NewOffset } else { State::LastOffset }
				}
				State::LastOffset => {
					let len = reader.readGamma(backwards, false)?;
					checkCapacity(&output, len)?;
					copyMatch(&mut output, lastOffset, len)?;
					if reader.readBit()? { State::NewOffset } else { State::Literals }
				}
				State::NewOffset => {
					let msb = reader.readGamma(backwards, invert)?;
					if msb == END_MARKER {
						return Ok(output);
					}
					let lsb = usize::from(reader.readByte()? >> 1);
					lastOffset = if backwards { (msb - 1) * 128 + lsb + 1 } else { msb * 128 - lsb };
					reader.backtrack = true;
					let len = reader.readGamma(backwards, false)? + 1;
					checkCapacity(&output, len)?;
					copyMatch(&mut output, lastOffset, len)?;
					if reader.readBit()? { State::NewOffset } else { State::Literals }
				}
			};
		}

		fn copyMatch(output: &mut Vec<u8>, offset: usize, len: usize) -> Result<(), CodecError> {
			if offset == 0 || offset > output.len() {
				return Err(CodecError::InvalidOffset { offset, available: output.len() });
			}
			for _ in 0..len {
				output.push(output[output.len() - offset]);
			}
			Ok(())
		}
	}
}

#[derive(Default)]
struct BitWriter {
	output: Vec<u8>,
	bitMask: u8,
	bitIndex: usize,
	backtrack: bool,
}

impl BitWriter {
	fn writeByte(&mut self, byte: u8) {
		self.output.push(byte);
	}

	fn writeBit(&mut self, bit: bool) {
		if self.backtrack {
			if let (true, Some(last)) = (bit, self.output.last_mut()) {
				*last |= 1;
			}
			self.backtrack = false;
		} else {
			if self.bitMask == 0 {
				self.bitMask = 0x80;
				self.bitIndex = self.output.len();
				self.writeByte(0);
			}
			if bit {
				self.output[self.bitIndex] |= self.bitMask;
			}
			self.bitMask >>= 1;
		}
	}

	/// Interlaced Elias-gamma: the bits after the leading 1, each preceded by a "continue" flag.
	fn writeGamma(&mut self, value: usize, backwards: bool, invert: bool) {
		let mut i = 2;
		while i <= value {
			i <<= 1;
		}
		i >>= 1;
		while {
			i >>= 1;
			i > 0
		} {
			self.writeBit(backwards);
			self.writeBit((value & i != 0) != invert);
		}
		self.writeBit(!backwards);
	}
}

struct BitReader<'a> {
	input: &'a [u8],
	index: usize,
	bitMask: u8,
	bitValue: u8,
	backtrack: bool,
}

impl<'a> BitReader<'a> {
	fn new(input: &'a [u8]) -> Self {
		Self { input, index: 0, bitMask: 0, bitValue: 0, backtrack: false }
	}

	fn readByte(&mut self) -> Result<u8, CodecError> {
		let byte = *self.input.get(self.index).ok_or(CodecError::UnexpectedEnd)?;
		self.index += 1;
		Ok(byte)
	}

	fn readBit(&mut self) -> Result<bool, CodecError> {
		if self.backtrack {
			self.backtrack = false;
			return Ok(self.input[self.index - 1] & 1 != 0);
		}
		self.bitMask >>= 1;
		if self.bitMask == 0 {
			self.bitMask = 0x80;
			self.bitValue = self.readByte()?;
		}
		Ok(self.bitValue & self.bitMask != 0)
	}

	fn readGamma(&mut self, backwards: bool, invert: bool) -> Result<usize, CodecError> {
		let mut value = 1;
		while self.readBit()? == backwards {
			if value >= MAX_GAMMA {
				return Err(CodecError::GammaOverflow);
			}
			value = value << 1 | usize::from(self.readBit()? != invert);
		}
		Ok(value)
	}
}

#[cfg(test)]
mod tests {
	use {
		super::*,
		rand::{rngs::StdRng, Rng, SeedableRng},
	};

	const MODES: [Zx0; 4] = [
		Zx0 { quick: false, backwards: false },
		Zx0 { quick: true, backwards: false },
		Zx0 { quick: false, backwards: true },
		Zx0 { quick: true, backwards: true },
	];

	#[test]
	fn single_byte_stream() {
		let zx0 = Zx0::default();
		assert_eq!(zx0.compress(b"A").unwrap(), [0xD5, 0x41, 0x55, 0x60]);
		assert_eq!(zx0.decompress(&[0xD5, 0x41, 0x55, 0x60], OutputLen::Exact(1)).unwrap(), b"A");
	}

	#[test]
	fn round_trips_in_every_mode() {
		let mut rng = StdRng::seed_from_u64(0x7a78_3000);
		let samples: [Vec<u8>; 5] = [
			b"abracadabra abracadabra abracadabra".to_vec(),
			vec![0; 1000],
			(0..=255).cycle().take(3000).collect(),
			(0..2048).map(|_| rng.gen_range(0..4)).collect(),
			(0..777).map(|_| rng.gen()).collect(),
		];
		for zx0 in MODES {
			for sample in &samples {
				let compressed = zx0.compress(sample).unwrap();
				assert_eq!(&zx0.decompress(&compressed, OutputLen::Exact(sample.len())).unwrap(), sample, "{zx0:?}");
			}
		}
	}

	#[test]
	fn repetitive_data_shrinks() {
		let data: Vec<u8> = (0..4096).map(|i| (i % 7) as u8).collect();
		let compressed = Zx0::default().compress(&data).unwrap();
		assert!(compressed.len() < 64, "{}", compressed.len());
	}

	#[test]
	fn wrong_length_and_garbage() {
		let zx0 = Zx0::default();
		let compressed = zx0.compress(b"hello hello hello").unwrap();
		assert!(matches!(zx0.decompress(&compressed, OutputLen::Exact(5)), Err(CodecError::LengthMismatch { .. })));
		assert_eq!(zx0.decompress(&compressed[..compressed.len() - 2], OutputLen::Unbounded), Err(CodecError::UnexpectedEnd));
		assert!(zx0.decompress(&[0x00], OutputLen::Unbounded).is_err());
	}

	#[test]
	fn longest_block_length_reads_back() {
		for backwards in [false, true] {
			let writer = &mut BitWriter::default();
			writer.writeGamma(MAX_BLOCK_LEN, backwards, false);
			writer.writeGamma(MAX_BLOCK_LEN + 1, backwards, false);
			let reader = &mut BitReader::new(&writer.output);
			assert_eq!(reader.readGamma(backwards, false), Ok(MAX_BLOCK_LEN));
			assert_eq!(reader.readGamma(backwards, false), Err(CodecError::GammaOverflow));
		}
	}

	#[test]
	fn bounded_output_stops_early() {
		let stream = Zx0::default().compress(&vec![7; 100_000]).unwrap();
		assert_eq!(
			Zx0::default().decompress(&stream, OutputLen::AtMost(1000)),
			Err(CodecError::OutputTooLarge { limit: 1000 })
		);
		assert_eq!(Zx0::default().decompress(&stream, OutputLen::AtMost(100_000)).unwrap().len(), 100_000);
	}

	#[test]
	fn empty_input() {
		for zx0 in MODES {
			assert!(zx0.compress(&[]).unwrap().is_empty());
			assert!(zx0.decompress(&[], OutputLen::Exact(0)).unwrap().is_empty());
		}
	}
}
