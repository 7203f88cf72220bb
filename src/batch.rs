//! Whole runs over many files. A failing file is reported and skipped, never fatal to the batch.

use {
	crate::{
		atlas::packTileset,
		config::Config,
		fs_read,
		grid::{fileStem, readGrid},
		image::Image,
		map::{Container, LayerData},
		slice::sliceImage,
		tilemap::encodeGrid,
		tmx::writeTMX,
		Error, Result,
	},
	log::{error, info, warn},
	std::{
		fs, io,
		path::{Path, PathBuf},
	},
};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
	pub processed: usize,
	pub failed: usize,
	pub warnings: usize,
	pub outputs: Vec<PathBuf>,
}

impl BatchReport {
	fn fail(&mut self, path: &Path, err: &Error) {
		error!("{}: {err}", path.display());
		self.failed += 1;
	}

	fn write(&mut self, outputPath: PathBuf, bytes: Result<Vec<u8>>) {
		match bytes.and_then(|bytes| writeOutput(&outputPath, &bytes)) {
			Ok(()) => {
				info!("wrote {}", outputPath.display());
				self.outputs.push(outputPath);
			}
			Err(err) => self.fail(&outputPath, &err),
		}
	}
}

/// Expands glob patterns. A pattern that matches nothing is kept as a literal path so that
/// opening it reports the missing file.
#[must_use]
pub fn expandPatterns(patterns: &[String]) -> Vec<PathBuf> {
	let mut paths = Vec::with_capacity(patterns.len());
	for pattern in patterns {
		let mut matched = false;
		match glob::glob(pattern) {
			Ok(entries) => {
				for entry in entries {
					match entry {
						Ok(path) => {
							paths.push(path);
							matched = true;
						}
						Err(err) => warn!("{err}"),
					}
				}
			}
			Err(err) => warn!("{pattern:?}: {err}"),
		}
		if !matched {
			paths.push(PathBuf::from(pattern));
		}
	}
	paths
}

/// Writes `bytes` in one go. A file left behind by a failed write is removed.
pub fn writeOutput(path: &Path, bytes: &[u8]) -> Result<()> {
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent)?;
	}
	fs::write(path, bytes).map_err(|err| {
		removeOutput(path);
		err.into()
	})
}

fn removeOutput(path: &Path) {
	match fs::remove_file(path) {
		Err(err) if err.kind() != io::ErrorKind::NotFound => warn!("{}: can't remove: {err}", path.display()),
		_ => {}
	}
}

/// Encodes every grid into a layer. With a header, all layers share one container named after
/// the first file that encoded; without, each payload gets its own file.
pub fn encodeFiles(paths: &[PathBuf], config: &Config) -> BatchReport {
	let (mut report, mut layers) = (BatchReport::default(), Vec::<(String, LayerData)>::new());
	let (encode, output) = (&config.encode, &config.output);
	for path in paths {
		match readGrid(path, encode.gridFormat, &encode.csv).and_then(|grid| encodeGrid(&grid, encode)) {
			Ok((layerData, overflow)) => {
				if let Some(overflow) = overflow {
					warn!("{}: {overflow}", path.display());
					report.warnings += 1;
				}
				info!(
					"{}: layer {} ({}x{}), {} bytes",
					path.display(),
					layerData.layer.id,
					layerData.layer.width,
					layerData.layer.height,
					layerData.payload.len()
				);
				report.processed += 1;
				layers.push((fileStem(path), layerData));
			}
			Err(err) => report.fail(path, &err),
		}
	}

	let extension = output.extensionFor(encode);
	if output.noHeader {
		for (stem, layerData) in layers {
			report.write(output.outputPath(&stem, extension), Ok(layerData.payload));
		}
	} else if let Some((stem, _)) = layers.first() {
		let outputPath = output.outputPath(stem, extension);
		let container = Container::new(layers.into_iter().map(|(_, layerData)| layerData).collect());
		report.write(outputPath, container.toBytes());
	}
	report
}

/// Slices every image into `<stem>Tiles.png` and a `<stem>.tmx` grid referring to it.
pub fn sliceFiles(paths: &[PathBuf], config: &Config) -> BatchReport {
	let mut report = BatchReport::default();
	for path in paths {
		match sliceFile(path, config) {
			Ok(outputs) => {
				info!("{}: sliced into {}", path.display(), outputs[1].display());
				report.processed += 1;
				report.outputs.extend(outputs);
			}
			Err(err) => report.fail(path, &err),
		}
	}
	report
}

fn sliceFile(path: &Path, config: &Config) -> Result<[PathBuf; 2]> {
	let (options, output) = (&config.slice, &config.output);
	let image = Image::fromPNG(fs_read(path)?.as_slice())?;
	let sliced = sliceImage(&image, options)?;
	let atlas = packTileset(&sliced.uniqueTiles, options.tilesetWidth)?;

	let stem = fileStem(path);
	let (atlasPath, tmxPath) = (output.outputPath(&format!("{stem}Tiles"), "png"), output.outputPath(&stem, "tmx"));
	let mut png = Vec::new();
	atlas.image.writePNG(&mut png)?;
	let mut tmx = Vec::new();
	let atlasFileName = atlasPath.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
	writeTMX(&mut tmx, &sliced, &atlas, &atlasFileName, options.clearMap)?;
	writeOutput(&atlasPath, &png)?;
	if let Err(err) = writeOutput(&tmxPath, &tmx) {
		removeOutput(&atlasPath);
		return Err(err);
	}
	Ok([atlasPath, tmxPath])
}
