#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

pub mod atlas;
pub mod attributes;
pub mod batch;
pub mod cells;
pub mod compress;
pub mod config;
pub mod error;
pub mod grid;
pub mod image;
pub mod map;
pub mod slice;
pub mod tilemap;
pub mod tmx;

pub use {
	attributes::{LayerAttributes, TileAttributes, TiledFlags},
	error::{Error, Result},
	image::Image,
};

use {
	serde::ser,
	std::{
		fs,
		io::{self, Read},
		path::Path,
	},
};

pub fn toml_toStringPretty<T: ?Sized + ser::Serialize>(value: &T) -> Result<String, toml::ser::Error> {
	let mut string = String::with_capacity(128);
	value.serialize((&mut toml::ser::Serializer::pretty(&mut string)).pretty_array(false))?;
	Ok(string)
}

pub fn io_readToVec(mut reader: impl Read) -> io::Result<Vec<u8>> {
	let mut vec = Vec::new();
	reader.read_to_end(&mut vec)?;
	Ok(vec)
}

/// [`fs::read`], with a missing file reported as [`Error::FileNotFound`].
pub fn fs_read(path: &Path) -> Result<Vec<u8>> {
	fs::read(path).map_err(|err| match err.kind() {
		io::ErrorKind::NotFound => Error::FileNotFound(path.to_owned()),
		_ => err.into(),
	})
}
