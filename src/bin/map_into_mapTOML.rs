#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	log::error,
	serde::Serialize,
	std::{
		io::{self, Write},
		path::Path,
		process::ExitCode,
	},
	tiled2bin::{fs_read, grid::fileStem, io_readToVec, map::Container, tilemap::TileMap, toml_toStringPretty, Result},
};

// Scalars before arrays of tables, or toml refuses to serialize.
#[derive(Serialize)]
struct ContainerTOML<'a> {
	version: u8,
	layers: Vec<LayerTOML<'a>>,
}

#[derive(Serialize)]
struct LayerTOML<'a> {
	#[serde(flatten)]
	tileMap: &'a TileMap,
	dataLength: usize,
	words: Vec<Vec<u16>>,
}

fn containerTOML(bytes: &[u8], stem: &str) -> Result<String> {
	let container = Container::read(bytes)?;
	let tileMaps = container
		.layers
		.iter()
		.map(|layerData| TileMap::fromLayer(stem, layerData))
		.collect::<Result<Vec<_>>>()?;
	let layers = tileMaps
		.iter()
		.zip(&container.layers)
		.map(|(tileMap, layerData)| LayerTOML {
			tileMap,
			dataLength: layerData.payload.len(),
			words: tileMap.words(),
		})
		.collect();
	toml_toStringPretty(&ContainerTOML { version: container.version, layers })
		.map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err).into())
}

/// Prints each container named on the command line, or the one on stdin, as TOML.
fn main() -> ExitCode {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let paths = std::env::args().skip(1).collect::<Vec<_>>();
	let inputs: Vec<(String, Result<Vec<u8>>)> = if paths.is_empty() {
		vec![("map".to_owned(), io_readToVec(io::stdin()).map_err(Into::into))]
	} else {
		paths.iter().map(|path| (fileStem(Path::new(path)), fs_read(Path::new(path)))).collect()
	};

	let (stdout, mut exitCode) = (&mut io::stdout().lock(), ExitCode::SUCCESS);
	for (stem, bytes) in inputs {
		match bytes.and_then(|bytes| containerTOML(&bytes, &stem)) {
			Ok(toml) => {
				if let Err(err) = stdout.write_all(toml.as_bytes()) {
					error!("{err}");
					return ExitCode::FAILURE;
				}
			}
			Err(err) => {
				error!("{stem}: {err}");
				exitCode = ExitCode::FAILURE;
			}
		}
	}
	exitCode
}
