use {
	crate::compress::CodecError,
	std::{io, path::PathBuf},
	thiserror::Error,
};

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Everything that can abort the processing of one input file.
///
/// None of these stop a batch: the caller reports the error and moves on to the next file.
#[derive(Debug, Error)]
pub enum Error {
	#[error("{0:?}: file not found")]
	FileNotFound(PathBuf),

	#[error(
		"image of {imageWidth}x{imageHeight} pixels can't be cut into {tileWidth}x{tileHeight} tiles"
	)]
	GeometryMismatch { imageWidth: usize, imageHeight: usize, tileWidth: usize, tileHeight: usize },

	#[error("invalid container: {0}")]
	InvalidContainer(String),

	#[error("truncated container: {what} needs {needed} bytes at offset {offset}, only {available} left")]
	TruncatedContainer { what: &'static str, offset: usize, needed: usize, available: usize },

	#[error("layer payload of {0} bytes doesn't fit the 16-bit length field")]
	PayloadTooLarge(usize),

	#[error("codec failure: {0}")]
	CodecFailure(#[from] CodecError),

	#[error("invalid grid: {0}")]
	InvalidGrid(String),

	#[error(transparent)]
	Io(#[from] io::Error),

	#[error(transparent)]
	PngDecoding(#[from] png::DecodingError),

	#[error(transparent)]
	PngEncoding(#[from] png::EncodingError),

	#[error(transparent)]
	Xml(#[from] quick_xml::Error),

	#[error(transparent)]
	XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

	#[error(transparent)]
	Csv(#[from] csv::Error),

	#[error(transparent)]
	Config(#[from] toml::de::Error),
}
