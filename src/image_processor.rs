//! # Image Processing Module
//!
//! Ottimizzazione dei formati raster supportati. Il formato di output è sempre
//! lo stesso dell'input (png resta png, jpg/jpeg diventano JPEG, webp resta
//! webp, avif resta avif).
//!
//! ## Strategia per formato
//!
//! | Formato | Encoder                     | Qualità |
//! |---------|-----------------------------|---------|
//! | PNG     | crate `image` (in memoria)  | lossless, ignorata |
//! | JPEG    | crate `image` (in memoria)  | 1-100, EXIF e ICC conservati |
//! | WebP    | cwebp, poi magick           | 1-100 |
//! | AVIF    | magick, fallback su WebP    | 1-100 |
//!
//! ## Error handling
//! Nessun errore risale alla pipeline: ogni fallimento diventa un warning
//! legato al file e l'adapter restituisce i byte originali. Se l'encoding
//! AVIF fallisce viene emesso un warning che nomina il fallback e si riprova
//! con l'encoder WebP alla stessa qualità.
//!
//! ## Concorrenza
//! - Decode/encode in memoria su `spawn_blocking` (lavoro CPU-bound)
//! - Tool esterni con `tokio::process::Command` su file temporanei

use crate::asset::Asset;
use crate::encoder::{AssetEncoder, WarningReporter};
use crate::error::OptimizeError;
use crate::platform::{command_args, PlatformCommands};
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, GenericImageView, ImageEncoder};
use tokio::process::Command;
use tracing::{debug, warn};

/// Argument builder for an external tool: (input, output, quality) -> args
type ToolArgs = fn(&str, &str, u8) -> Vec<String>;

fn cwebp_args(input: &str, output: &str, quality: u8) -> Vec<String> {
    command_args(["-q", &quality.to_string(), "-m", "4", "-mt", input, "-o", output])
}

fn magick_args(input: &str, output: &str, quality: u8) -> Vec<String> {
    command_args([input, "-quality", &quality.to_string(), output])
}

const WEBP_TOOLS: &[(&str, ToolArgs)] = &[("cwebp", cwebp_args), ("magick", magick_args)];

const AVIF_TOOLS: &[(&str, ToolArgs)] = &[("magick", magick_args)];

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_APP0: u8 = 0xE0;
/// APP1 (EXIF, XMP) and APP2 (ICC profile) survive a re-encode
const JPEG_KEPT_SEGMENTS: [u8; 2] = [0xE1, 0xE2];

/// Header segments of a JPEG as (marker, whole segment bytes), up to the
/// start of scan. Stops quietly at the first malformed segment.
fn jpeg_header_segments(data: &[u8]) -> Vec<(u8, &[u8])> {
    let mut segments = Vec::new();
    if !data.starts_with(&JPEG_SOI) {
        return segments;
    }

    let mut pos = JPEG_SOI.len();
    while pos + 4 <= data.len() && data[pos] == 0xFF {
        let marker = data[pos + 1];
        // SOS, EOI
        if marker == 0xDA || marker == 0xD9 {
            break;
        }
        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        let end = pos + 2 + length;
        if length < 2 || end > data.len() {
            break;
        }
        segments.push((marker, &data[pos..end]));
        pos = end;
    }
    segments
}

/// Copies the EXIF and ICC segments of `original` into `encoded`, after
/// the JFIF header the encoder wrote. Pixels keep their stored orientation,
/// so the carried orientation tag still describes them.
fn carry_jpeg_metadata(original: &[u8], encoded: Vec<u8>) -> Vec<u8> {
    let kept: Vec<&[u8]> = jpeg_header_segments(original)
        .into_iter()
        .filter(|(marker, _)| JPEG_KEPT_SEGMENTS.contains(marker))
        .map(|(_, segment)| segment)
        .collect();
    if kept.is_empty() || !encoded.starts_with(&JPEG_SOI) {
        return encoded;
    }

    let insert_at = jpeg_header_segments(&encoded)
        .into_iter()
        .take_while(|(marker, _)| *marker == JPEG_APP0)
        .fold(JPEG_SOI.len(), |at, (_, segment)| at + segment.len());

    let extra: usize = kept.iter().map(|segment| segment.len()).sum();
    let mut out = Vec::with_capacity(encoded.len() + extra);
    out.extend_from_slice(&encoded[..insert_at]);
    for segment in kept {
        out.extend_from_slice(segment);
    }
    out.extend_from_slice(&encoded[insert_at..]);
    out
}

/// Raster sub-format, derived from the registry extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    WebP,
    Avif,
}

impl ImageKind {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            "avif" => Some(Self::Avif),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::WebP => "WebP",
            Self::Avif => "AVIF",
        }
    }
}

/// Image encoder adapter
#[derive(Debug, Default, Clone)]
pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Lossless PNG re-encode with maximum compression.
    pub fn reencode_png(data: &[u8]) -> Result<Vec<u8>, OptimizeError> {
        let img = image::load_from_memory_with_format(data, image::ImageFormat::Png)?;
        let (width, height) = img.dimensions();

        let mut out = Vec::new();
        PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive)
            .write_image(img.as_bytes(), width, height, img.color())?;
        Ok(out)
    }

    /// Baseline JPEG re-encode at `quality` (alpha is dropped).
    /// EXIF and ICC segments of the source are carried over.
    pub fn reencode_jpeg(data: &[u8], quality: u8) -> Result<Vec<u8>, OptimizeError> {
        let img = image::load_from_memory(data)?;
        let (width, height) = img.dimensions();

        let mut out = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut out, quality);
        match img.color() {
            ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16 => {
                encoder.write_image(img.to_luma8().as_raw(), width, height, ColorType::L8)?
            }
            _ => encoder.write_image(img.to_rgb8().as_raw(), width, height, ColorType::Rgb8)?,
        }
        Ok(carry_jpeg_metadata(data, out))
    }

    async fn encode_in_memory(&self, asset: &Asset, kind: ImageKind, quality: u8) -> Result<Vec<u8>, OptimizeError> {
        let data = asset.data.clone();
        tokio::task::spawn_blocking(move || match kind {
            ImageKind::Jpeg => Self::reencode_jpeg(&data, quality),
            _ => Self::reencode_png(&data),
        })
        .await
        .map_err(|e| OptimizeError::Tool(format!("encoder task failed: {}", e)))?
    }

    /// WebP encode; reports and falls back to the original bytes on failure.
    async fn encode_webp(&self, asset: &Asset, quality: u8, warnings: &dyn WarningReporter) -> Vec<u8> {
        match self.try_optimization_tools(asset, "webp", WEBP_TOOLS, quality).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warnings.report(format!(
                    "{}: image compression failed ({}): {}",
                    asset.relative_path.display(),
                    ImageKind::WebP.label(),
                    e
                ));
                asset.data.clone()
            }
        }
    }

    /// Runs the first available tool that succeeds on a temporary copy of the asset.
    ///
    /// The input keeps the asset's own extension so tools can sniff it; the
    /// output extension selects the target format.
    async fn try_optimization_tools(
        &self,
        asset: &Asset,
        output_extension: &str,
        tools: &[(&str, ToolArgs)],
        quality: u8,
    ) -> Result<Vec<u8>, OptimizeError> {
        let platform = PlatformCommands::instance();

        let input = tempfile::Builder::new()
            .prefix("asset-optimizer-")
            .suffix(&format!(".{}", asset.descriptor.extension))
            .tempfile()?;
        let output = tempfile::Builder::new()
            .prefix("asset-optimizer-")
            .suffix(&format!(".{}", output_extension))
            .tempfile()?;
        tokio::fs::write(input.path(), &asset.data).await?;

        let input_str = input
            .path()
            .to_str()
            .ok_or_else(|| OptimizeError::Tool(format!("invalid temp path: {:?}", input.path())))?;
        let output_str = output
            .path()
            .to_str()
            .ok_or_else(|| OptimizeError::Tool(format!("invalid temp path: {:?}", output.path())))?;

        let mut any_tool_available = false;
        for (tool_name, args_builder) in tools {
            if !platform.is_command_available(tool_name).await {
                continue;
            }
            any_tool_available = true;

            let args = args_builder(input_str, output_str, quality);
            debug!("Running {} {:?}", tool_name, args);

            let start_time = std::time::Instant::now();
            let result = Command::new(platform.get_command(tool_name))
                .args(&args)
                .output()
                .await?;
            let elapsed = start_time.elapsed();

            if result.status.success() {
                let bytes = tokio::fs::read(output.path()).await?;
                if !bytes.is_empty() {
                    debug!("{} finished {} in {:?}", tool_name, asset.relative_path.display(), elapsed);
                    return Ok(bytes);
                }
                warn!("{} produced an empty file for {}", tool_name, asset.relative_path.display());
            } else {
                debug!(
                    "{} failed on {} after {:?}: {}",
                    tool_name,
                    asset.relative_path.display(),
                    elapsed,
                    String::from_utf8_lossy(&result.stderr).trim()
                );
            }
        }

        let tool_names: Vec<&str> = tools.iter().map(|(name, _)| *name).collect();
        if any_tool_available {
            Err(OptimizeError::Tool(format!("all tools failed ({})", tool_names.join(", "))))
        } else {
            Err(OptimizeError::MissingDependency(format!(
                "install one of: {}",
                tool_names.join(", ")
            )))
        }
    }
}

#[async_trait]
impl AssetEncoder for ImageProcessor {
    fn name(&self) -> &'static str {
        "image"
    }

    async fn encode(&self, asset: &Asset, quality: u8, warnings: &dyn WarningReporter) -> Vec<u8> {
        let Some(kind) = ImageKind::from_extension(asset.descriptor.extension) else {
            warnings.report(format!(
                "{}: unsupported image format {}",
                asset.relative_path.display(),
                asset.descriptor.extension
            ));
            return asset.data.clone();
        };

        match kind {
            ImageKind::Png | ImageKind::Jpeg => match self.encode_in_memory(asset, kind, quality).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warnings.report(format!(
                        "{}: image compression failed ({}): {}",
                        asset.relative_path.display(),
                        kind.label(),
                        e
                    ));
                    asset.data.clone()
                }
            },
            ImageKind::WebP => self.encode_webp(asset, quality, warnings).await,
            ImageKind::Avif => match self.try_optimization_tools(asset, "avif", AVIF_TOOLS, quality).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warnings.report(format!(
                        "{}: AVIF encoding failed ({}), falling back to WebP",
                        asset.relative_path.display(),
                        e
                    ));
                    self.encode_webp(asset, quality, warnings).await
                }
            },
        }
    }
}
