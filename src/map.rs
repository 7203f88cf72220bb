//! The binary container: a 6-byte header, then per layer a 26-byte block and its payload.

use {
	crate::{attributes::LayerAttributes, Error, Result},
	byteorder::{ReadBytesExt, WriteBytesExt, LE},
	log::warn,
	serde::Serialize,
	std::io::{self, Write},
};

pub const MAGIC: [u8; 4] = *b"map\0";
pub const VERSION: u8 = 0;
pub const HEADER_SIZE: usize = 6;
pub const TILESET_NAME_LEN: usize = 16;
pub const LAYER_HEADER_SIZE: usize = 26;

/*
	Layer block, little-endian :

	 0 : id               u8
	 1 : tileset name     [u8; 16], NUL-padded
	17 : attributes       u8
	18 : width           u16
	20 : height          u16
	22 : tile width       u8
	23 : tile height      u8
	24 : payload length  u16
*/
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Layer {
	pub id: u8,
	pub tileset: String,
	#[serde(serialize_with = "serializeBits")]
	pub attributes: LayerAttributes,
	pub width: u16,
	pub height: u16,
	pub tileWidth: u8,
	pub tileHeight: u8,
}

fn serializeBits<S: serde::Serializer>(attributes: &LayerAttributes, serializer: S) -> Result<S::Ok, S::Error> {
	serializer.serialize_u8(attributes.bits())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerData {
	pub layer: Layer,
	/// Stored bytes, compressed when the attributes say so.
	pub payload: Vec<u8>,
}

impl LayerData {
	pub fn dataLength(&self) -> Result<u16> {
		u16::try_from(self.payload.len()).map_err(|_| Error::PayloadTooLarge(self.payload.len()))
	}

	fn writeHeader(&self, writer: &mut impl Write) -> Result<()> {
		let Layer { id, ref tileset, attributes, width, height, tileWidth, tileHeight } = self.layer;
		let dataLength = self.dataLength()?;
		writer.write_u8(id)?;
		writer.write_all(&packName(tileset))?;
		writer.write_u8(attributes.bits())?;
		writer.write_u16::<LE>(width)?;
		writer.write_u16::<LE>(height)?;
		writer.write_u8(tileWidth)?;
		writer.write_u8(tileHeight)?;
		writer.write_u16::<LE>(dataLength)?;
		Ok(())
	}
}

/// ASCII, cut to 16 bytes, NUL-padded.
#[must_use]
pub fn packName(name: &str) -> [u8; TILESET_NAME_LEN] {
	let mut packed = [0; TILESET_NAME_LEN];
	for (byte, character) in packed.iter_mut().zip(name.chars()) {
		*byte = if character.is_ascii() { character as u8 } else { b'?' };
	}
	packed
}

fn unpackName(packed: &[u8]) -> String {
	let end = memchr::memchr(0, packed).unwrap_or(packed.len());
	String::from_utf8_lossy(&packed[..end]).into_owned()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Container {
	pub version: u8,
	pub layers: Vec<LayerData>,
}

impl Container {
	#[must_use]
	pub fn new(layers: Vec<LayerData>) -> Self {
		Self { version: VERSION, layers }
	}

	pub fn writeTo(&self, writer: &mut impl Write) -> Result<()> {
		let layerCount = u8::try_from(self.layers.len())
			.map_err(|_| Error::InvalidContainer(format!("{} layers, at most 255 fit", self.layers.len())))?;
		writer.write_all(&MAGIC)?;
		writer.write_u8(self.version)?;
		writer.write_u8(layerCount)?;
		for layerData in &self.layers {
			layerData.writeHeader(writer)?;
			writer.write_all(&layerData.payload)?;
		}
		Ok(())
	}

	pub fn toBytes(&self) -> Result<Vec<u8>> {
		let payloadsLength = self.layers.iter().map(|layerData| layerData.payload.len()).sum::<usize>();
		let mut bytes = Vec::with_capacity(HEADER_SIZE + self.layers.len() * LAYER_HEADER_SIZE + payloadsLength);
		self.writeTo(&mut bytes)?;
		Ok(bytes)
	}

	pub fn read(bytes: &[u8]) -> Result<Self> {
		let cursor = &mut io::Cursor::new(bytes);
		let header = &mut io::Cursor::new(cursor.readSlice("header", HEADER_SIZE)?);
		let magic = header.readSlice("magic", MAGIC.len())?;
		if magic != MAGIC {
			return Err(Error::InvalidContainer(format!("bad magic {:?}", String::from_utf8_lossy(magic))));
		}
		let (version, layerCount) = (header.read_u8()?, header.read_u8()?);
		if version != VERSION {
			return Err(Error::InvalidContainer(format!("unsupported version {version}")));
		}
		let mut layers = Vec::with_capacity(layerCount.into());
		for _ in 0..layerCount {
			let block = &mut io::Cursor::new(cursor.readSlice("layer header", LAYER_HEADER_SIZE)?);
			let id = block.read_u8()?;
			let tileset = unpackName(block.readSlice("tileset name", TILESET_NAME_LEN)?);
			let attributeBits = block.read_u8()?;
			let attributes = LayerAttributes::from_bits_truncate(attributeBits);
			if attributes.bits() != attributeBits {
				warn!("layer {id}: ignoring unknown attribute bits {:#04x}", attributeBits & !attributes.bits());
			}
			let layer = Layer {
				id,
				tileset,
				attributes,
				width: block.read_u16::<LE>()?,
				height: block.read_u16::<LE>()?,
				tileWidth: block.read_u8()?,
				tileHeight: block.read_u8()?,
			};
			let dataLength = block.read_u16::<LE>()?;
			let payload = cursor.readSlice("layer payload", dataLength.into())?.to_vec();
			layers.push(LayerData { layer, payload });
		}
		let trailing = bytes.len() - cursor.position() as usize;
		if trailing != 0 {
			warn!("ignoring {trailing} bytes after the last layer");
		}
		Ok(Self { version, layers })
	}
}

trait ReadExt<'a> {
	fn readSlice(&mut self, what: &'static str, len: usize) -> Result<&'a [u8]>;
}
impl<'a> ReadExt<'a> for io::Cursor<&'a [u8]> {
	fn readSlice(&mut self, what: &'static str, len: usize) -> Result<&'a [u8]> {
		let (offset, underlyingSlice) = (self.position() as usize, *self.get_ref());
		let available = underlyingSlice.len().saturating_sub(offset);
		if len > available {
			return Err(Error::TruncatedContainer { what, offset, needed: len, available });
		}
		self.set_position((offset + len) as _);
		Ok(&underlyingSlice[offset..offset + len])
	}
}
