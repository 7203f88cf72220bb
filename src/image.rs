use {
	crate::{attributes::TiledFlags, Result},
	core::hash::Hasher,
	png::{BitDepth, ColorType},
	rustc_hash::FxHasher,
	std::{
		io::{Read, Write},
		rc::Rc,
	},
};

pub type Vec2 = [usize; 2];
pub const X: usize = 0;
pub const Y: usize = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
	pub rgb: Vec<u8>,
	pub trns: Option<Vec<u8>>,
}

impl Palette {
	#[must_use]
	pub fn colour(&self, index: u8) -> [u8; 4] {
		let index = usize::from(index);
		let alpha = self.trns.as_ref().and_then(|trns| trns.get(index)).copied().unwrap_or(u8::MAX);
		match self.rgb.get(index * 3..index * 3 + 3) {
			Some(&[r, g, b]) => [r, g, b, alpha],
			_ => [0, 0, 0, alpha],
		}
	}
}

/// A raster of either 8-bit palette indices or 32-bit RGBA pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
	pub width: usize,
	pub height: usize,
	pub bitsPerPixel: u8,
	pub palette: Option<Rc<Palette>>,
	pub data: Vec<u8>,
}

impl Image {
	#[must_use]
	pub fn fromRGBA(width: usize, height: usize, data: Vec<u8>) -> Self {
		assert_eq!(data.len(), width * height * 4);
		Self { width, height, bitsPerPixel: 32, palette: None, data }
	}

	#[must_use]
	pub fn fromIndexed(width: usize, height: usize, palette: Palette, data: Vec<u8>) -> Self {
		assert_eq!(data.len(), width * height);
		Self { width, height, bitsPerPixel: 8, palette: Some(Rc::new(palette)), data }
	}

	/// Zero-filled image sharing `self`'s pixel format and palette.
	#[must_use]
	pub fn blankLike(&self, width: usize, height: usize) -> Self {
		Self {
			width,
			height,
			bitsPerPixel: self.bitsPerPixel,
			palette: self.palette.clone(),
			data: vec![0; width * height * self.bytesPerPixel()],
		}
	}

	#[must_use]
	pub fn bytesPerPixel(&self) -> usize {
		usize::from(self.bitsPerPixel / 8)
	}

	#[must_use]
	pub fn pixel(&self, [x, y]: Vec2) -> &[u8] {
		let bytesPerPixel = self.bytesPerPixel();
		let start = (y * self.width + x) * bytesPerPixel;
		&self.data[start..start + bytesPerPixel]
	}

	/// RGBA value of a pixel, looked up in the palette for indexed images.
	#[must_use]
	pub fn colour(&self, point: Vec2) -> [u8; 4] {
		let pixel = self.pixel(point);
		match (&self.palette, pixel) {
			(Some(palette), &[index]) => palette.colour(index),
			(None, &[index]) => [index, index, index, u8::MAX],
			(_, &[r, g, b, a]) => [r, g, b, a],
			_ => unreachable!("{} bits per pixel", self.bitsPerPixel),
		}
	}

	pub fn blitRectangle(&mut self, destPoint: Vec2, dimensions: Vec2, src: &Image, srcPoint: Vec2) {
		assert_eq!(self.bitsPerPixel, src.bitsPerPixel);
		let (bytesPerPixel, rowLength) = (self.bytesPerPixel(), dimensions[X] * self.bytesPerPixel());
		for row in 0..dimensions[Y] {
			let srcStart = ((srcPoint[Y] + row) * src.width + srcPoint[X]) * bytesPerPixel;
			let destStart = ((destPoint[Y] + row) * self.width + destPoint[X]) * bytesPerPixel;
			self.data[destStart..destStart + rowLength].copy_from_slice(&src.data[srcStart..srcStart + rowLength]);
		}
	}

	#[must_use]
	pub fn crop(&self, point: Vec2, dimensions: Vec2) -> Self {
		let mut cropped = self.blankLike(dimensions[X], dimensions[Y]);
		cropped.blitRectangle([0, 0], dimensions, self, point);
		cropped
	}

	#[must_use]
	pub fn isBlank(&self) -> bool {
		self.data.iter().all(|&byte| byte == 0)
	}

	/// Dimensions once rendered with `flags`.
	#[must_use]
	pub fn transformedDimensions(&self, flags: TiledFlags) -> Vec2 {
		if flags.contains(TiledFlags::ANTI_DIAGONAL) {
			[self.height, self.width]
		} else {
			[self.width, self.height]
		}
	}

	/// Source point shown at `point` of the image rendered with `flags`.
	fn sourcePoint(&self, flags: TiledFlags, [x, y]: Vec2) -> Vec2 {
		let [width, height] = self.transformedDimensions(flags);
		let u = if flags.contains(TiledFlags::HORIZONTAL) { width - 1 - x } else { x };
		let v = if flags.contains(TiledFlags::VERTICAL) { height - 1 - y } else { y };
		if flags.contains(TiledFlags::ANTI_DIAGONAL) {
			[v, u]
		} else {
			[u, v]
		}
	}

	/// The image as the editor draws it for a cell carrying `flags`.
	#[must_use]
	pub fn transformed(&self, flags: TiledFlags) -> Self {
		let [width, height] = self.transformedDimensions(flags);
		let mut image = self.blankLike(width, height);
		for y in 0..height {
			for x in 0..width {
				image.blitRectangle([x, y], [1, 1], self, self.sourcePoint(flags, [x, y]));
			}
		}
		image
	}

	/// Hash of the colours of the image rendered with `flags`. Equal for pixel-identical renders,
	/// whatever the palette indices behind them.
	#[must_use]
	pub fn contentHash(&self, flags: TiledFlags) -> u64 {
		let mut hasher = FxHasher::default();
		let [width, height] = self.transformedDimensions(flags);
		hasher.write_usize(width);
		hasher.write_usize(height);
		for y in 0..height {
			for x in 0..width {
				hasher.write(&self.colour(self.sourcePoint(flags, [x, y])));
			}
		}
		hasher.finish()
	}

	/// Decodes a PNG into indexed pixels (palette images) or RGBA (everything else).
	pub fn fromPNG(reader: impl Read) -> Result<Self> {
		let mut decoder = png::Decoder::new(reader);
		decoder.set_transformations(png::Transformations::IDENTITY);
		let png = &mut decoder.read_info()?;
		let mut buffer = vec![0; png.output_buffer_size()];
		let frame = png.next_frame(&mut buffer)?;
		let (width, height, depth) = (frame.width as usize, frame.height as usize, frame.bit_depth as u8);
		let (info, rows) = (png.info(), buffer[..frame.buffer_size()].chunks_exact(frame.line_size));
		if frame.color_type == ColorType::Indexed {
			let palette = Palette {
				rgb: info.palette.as_ref().map(|palette| palette.to_vec()).unwrap_or_default(),
				trns: info.trns.as_ref().map(|trns| trns.to_vec()),
			};
			let mut data = Vec::with_capacity(width * height);
			for row in rows {
				data.extend(unpackSamples(row, depth).take(width).map(|index| index as u8));
			}
			return Ok(Self::fromIndexed(width, height, palette, data));
		}

		let channels = frame.color_type.samples();
		let colourKey = match (frame.color_type, info.trns.as_deref()) {
			(ColorType::Grayscale | ColorType::Rgb, Some(key)) => {
				Some(key.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect::<Vec<_>>())
			}
			_ => None,
		};
		let scale = |sample: u16| match depth {
			16 => (sample >> 8) as u8,
			8 => sample as u8,
			_ => (u32::from(sample) * 255 / ((1 << depth) - 1)) as u8,
		};
		let mut data = Vec::with_capacity(width * height * 4);
		for row in rows {
			let samples = unpackSamples(row, depth).take(width * channels).collect::<Vec<_>>();
			for pixel in samples.chunks_exact(channels) {
				let rgba = match *pixel {
					[gray] | [gray, _] => [scale(gray), scale(gray), scale(gray), u8::MAX],
					[r, g, b] | [r, g, b, _] => [scale(r), scale(g), scale(b), u8::MAX],
					_ => unreachable!("{channels} channels"),
				};
				let alpha = match (pixel, &colourKey) {
					(&[_, alpha] | &[_, _, _, alpha], _) => scale(alpha),
					(_, Some(key)) if key.as_slice() == pixel => 0,
					_ => u8::MAX,
				};
				data.extend_from_slice(&rgba[..3]);
				data.push(alpha);
			}
		}
		Ok(Self::fromRGBA(width, height, data))
	}

	pub fn writePNG(&self, writer: impl Write) -> Result<()> {
		let mut png = png::Encoder::new(writer, self.width as _, self.height as _);
		png.set_depth(BitDepth::Eight);
		match &self.palette {
			Some(palette) if self.bitsPerPixel == 8 => {
				png.set_color(ColorType::Indexed);
				png.set_palette(palette.rgb.clone());
				if let Some(trns) = &palette.trns {
					png.set_trns(trns.clone());
				}
			}
			_ if self.bitsPerPixel == 8 => png.set_color(ColorType::Grayscale),
			_ => png.set_color(ColorType::Rgba),
		}
		let mut png = png.write_header()?;
		png.write_image_data(&self.data)?;
		png.finish()?;
		Ok(())
	}
}

/// Samples of one scanline, most significant bits first for depths below 8.
fn unpackSamples(row: &[u8], depth: u8) -> Box<dyn Iterator<Item = u16> + '_> {
	match depth {
		16 => Box::new(row.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]]))),
		8 => Box::new(row.iter().map(|&byte| u16::from(byte))),
		_ => {
			let mask = (1_u8 << depth) - 1;
			Box::new(row.iter().flat_map(move |&byte| {
				(1..=8 / depth).map(move |i| u16::from(byte >> (8 - depth * i) & mask))
			}))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn numbered(width: usize, height: usize) -> Image {
		let palette = Palette { rgb: (0..=255).flat_map(|i| [i, i, i]).collect(), trns: None };
		Image::fromIndexed(width, height, palette, (0..(width * height) as u8).collect())
	}

	#[test]
	fn transforms_render_like_the_editor() {
		// 0 1 2
		// 3 4 5
		let image = numbered(3, 2);
		assert_eq!(image.transformed(TiledFlags::HORIZONTAL).data, [2, 1, 0, 5, 4, 3]);
		assert_eq!(image.transformed(TiledFlags::VERTICAL).data, [3, 4, 5, 0, 1, 2]);
		let transposed = image.transformed(TiledFlags::ANTI_DIAGONAL);
		assert_eq!([transposed.width, transposed.height], [2, 3]);
		assert_eq!(transposed.data, [0, 3, 1, 4, 2, 5]);
		// diagonal + horizontal is a clockwise quarter turn
		assert_eq!(image.transformed(TiledFlags::ANTI_DIAGONAL | TiledFlags::HORIZONTAL).data, [3, 0, 4, 1, 5, 2]);
	}

	#[test]
	fn hash_matches_the_rendered_image() {
		let image = numbered(4, 4);
		for flags in TiledFlags::ALL {
			let rendered = image.transformed(flags);
			assert_eq!(rendered.contentHash(TiledFlags::empty()), image.contentHash(flags), "{flags:?}");
		}
		assert_ne!(image.contentHash(TiledFlags::empty()), image.contentHash(TiledFlags::HORIZONTAL));
	}

	#[test]
	fn hash_follows_colours_not_indices() {
		let palette = Palette { rgb: vec![9, 9, 9, 9, 9, 9], trns: None };
		let first = Image::fromIndexed(2, 1, palette.clone(), vec![0, 0]);
		let second = Image::fromIndexed(2, 1, palette, vec![0, 1]);
		assert_eq!(first.contentHash(TiledFlags::empty()), second.contentHash(TiledFlags::empty()));
	}

	#[test]
	fn crop_and_blit() {
		let image = numbered(4, 4);
		let cropped = image.crop([1, 2], [2, 2]);
		assert_eq!(cropped.data, [9, 10, 13, 14]);
		let mut canvas = image.blankLike(3, 3);
		canvas.blitRectangle([1, 1], [2, 2], &cropped, [0, 0]);
		assert_eq!(canvas.data, [0, 0, 0, 0, 9, 10, 0, 13, 14]);
		assert!(image.blankLike(2, 2).isBlank());
	}

	#[test]
	fn indexed_png_keeps_indices() {
		let mut image = numbered(3, 2);
		image.palette = Some(Rc::new(Palette { rgb: vec![1; 18], trns: Some(vec![0]) }));
		let mut bytes = Vec::new();
		image.writePNG(&mut bytes).unwrap();
		assert_eq!(Image::fromPNG(&bytes[..]).unwrap(), image);
	}

	#[test]
	fn low_depth_grayscale_becomes_rgba() {
		let mut bytes = Vec::new();
		{
			let mut png = png::Encoder::new(&mut bytes, 3, 1);
			png.set_color(ColorType::Grayscale);
			png.set_depth(BitDepth::One);
			let mut png = png.write_header().unwrap();
			png.write_image_data(&[0b1010_0000]).unwrap();
		}
		let image = Image::fromPNG(&bytes[..]).unwrap();
		assert_eq!(image.bitsPerPixel, 32);
		assert_eq!(image.data, [255, 255, 255, 255, 0, 0, 0, 255, 255, 255, 255, 255]);
	}
}
