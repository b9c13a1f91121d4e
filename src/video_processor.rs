//! # Video Processing Module
//!
//! Questo modulo gestisce la ricodifica dei video supportati tramite FFmpeg.
//!
//! ## Negoziazione delle capacità
//! FFmpeg è un collaboratore opzionale: prima di qualsiasi transcodifica
//! viene verificata la disponibilità del binario (una sola volta per processo)
//! e poi la presenza degli encoder richiesti dal container. L'esito è un
//! [`VideoCapability`] tipizzato:
//! - `Available`: si procede con la transcodifica
//! - `Unavailable`: un solo warning, byte originali restituiti
//! - `Partial`: mancano encoder necessari, warning e byte originali
//!
//! ## Pipeline di transcodifica:
//! 1. Scrive i byte originali in un file temporaneo
//! 2. Esegue FFmpeg verso lo stesso container (mp4 → mp4, webm → webm)
//!    a qualità media fissa per video e audio
//! 3. Legge il risultato; output vuoto o errore → warning e originale
//!
//! | Container | Video       | Audio   |
//! |-----------|-------------|---------|
//! | mp4       | libx264     | aac     |
//! | webm      | libvpx-vp9  | libopus |

use crate::asset::Asset;
use crate::encoder::{AssetEncoder, WarningReporter};
use crate::error::OptimizeError;
use crate::platform::{command_args, PlatformCommands};
use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::debug;

/// Medium quality video bitrate
pub const VIDEO_BITRATE: &str = "1000k";
/// Medium quality audio bitrate
pub const AUDIO_BITRATE: &str = "128k";

/// Target container, same as the input one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Mp4,
    WebM,
}

impl Container {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "mp4" => Some(Self::Mp4),
            "webm" => Some(Self::WebM),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::WebM => "webm",
        }
    }

    /// (video codec, audio codec) ffmpeg encoder names
    pub fn codecs(&self) -> (&'static str, &'static str) {
        match self {
            Self::Mp4 => ("libx264", "aac"),
            Self::WebM => ("libvpx-vp9", "libopus"),
        }
    }
}

/// Outcome of probing the transcoding backend for one container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoCapability {
    Available,
    Unavailable(String),
    Partial { missing: Vec<&'static str> },
}

impl VideoCapability {
    /// Checks an `ffmpeg -encoders` listing for the encoders `container` needs.
    pub fn negotiate(encoder_listing: &str, container: Container) -> Self {
        let (video, audio) = container.codecs();
        let listed: Vec<&str> = encoder_listing
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .collect();

        let missing: Vec<&'static str> = [video, audio]
            .into_iter()
            .filter(|codec| !listed.contains(codec))
            .collect();

        if missing.is_empty() {
            Self::Available
        } else {
            Self::Partial { missing }
        }
    }
}

/// Handles video optimization
#[derive(Debug)]
pub struct VideoProcessor {
    /// Base name of the ffmpeg executable, resolved through [`PlatformCommands`]
    tool: &'static str,
    encoders: OnceCell<Option<String>>,
}

impl Default for VideoProcessor {
    fn default() -> Self {
        Self::with_tool("ffmpeg")
    }
}

impl VideoProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Processor driving an ffmpeg-compatible executable named `tool`
    pub fn with_tool(tool: &'static str) -> Self {
        Self {
            tool,
            encoders: OnceCell::new(),
        }
    }

    /// Encoder listing from ffmpeg, `None` when ffmpeg is missing or unusable.
    async fn encoder_listing(&self) -> &Option<String> {
        self.encoders
            .get_or_init(|| async {
                let platform = PlatformCommands::instance();
                if !platform.is_command_available(self.tool).await {
                    return None;
                }

                let output = Command::new(platform.get_command(self.tool))
                    .args(["-hide_banner", "-encoders"])
                    .output()
                    .await
                    .ok()?;
                if !output.status.success() {
                    return None;
                }
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            })
            .await
    }

    pub async fn capability(&self, container: Container) -> VideoCapability {
        match self.encoder_listing().await {
            Some(listing) => VideoCapability::negotiate(listing, container),
            None => VideoCapability::Unavailable(format!("{} not found", self.tool)),
        }
    }

    async fn transcode(&self, asset: &Asset, container: Container) -> Result<Vec<u8>, OptimizeError> {
        let platform = PlatformCommands::instance();
        let suffix = format!(".{}", container.extension());

        let input = tempfile::Builder::new()
            .prefix("asset-optimizer-")
            .suffix(&suffix)
            .tempfile()?;
        let output = tempfile::Builder::new()
            .prefix("asset-optimizer-")
            .suffix(&suffix)
            .tempfile()?;
        tokio::fs::write(input.path(), &asset.data).await?;

        let input_str = input.path().to_string_lossy().into_owned();
        let output_str = output.path().to_string_lossy().into_owned();
        let (video_codec, audio_codec) = container.codecs();

        let mut args = command_args([
            "-hide_banner",
            "-loglevel", "error",
            "-y",
            "-i", &input_str,
            "-c:v", video_codec,
            "-b:v", VIDEO_BITRATE,
            "-c:a", audio_codec,
            "-b:a", AUDIO_BITRATE,
        ]);
        if container == Container::Mp4 {
            args.extend(command_args(["-movflags", "+faststart"]));
        }
        args.push(output_str);

        debug!("Transcoding {} with {} {:?}", asset.relative_path.display(), self.tool, args);
        let start_time = std::time::Instant::now();
        let result = Command::new(platform.get_command(self.tool))
            .args(&args)
            .output()
            .await?;

        if !result.status.success() {
            return Err(OptimizeError::FFmpeg(
                String::from_utf8_lossy(&result.stderr).trim().to_string(),
            ));
        }

        let bytes = tokio::fs::read(output.path()).await?;
        if bytes.is_empty() {
            return Err(OptimizeError::FFmpeg("conversion produced an empty file".to_string()));
        }

        debug!(
            "Transcoded {} in {:.1}s",
            asset.relative_path.display(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(bytes)
    }
}

#[async_trait]
impl AssetEncoder for VideoProcessor {
    fn name(&self) -> &'static str {
        "video"
    }

    async fn encode(&self, asset: &Asset, _quality: u8, warnings: &dyn WarningReporter) -> Vec<u8> {
        let path = asset.relative_path.display();

        let Some(container) = Container::from_extension(asset.descriptor.extension) else {
            warnings.report(format!("{}: unsupported video container {}", path, asset.descriptor.extension));
            return asset.data.clone();
        };

        match self.capability(container).await {
            VideoCapability::Available => {}
            VideoCapability::Unavailable(reason) => {
                warnings.report(format!("{}: video transcoding unavailable ({}), keeping original", path, reason));
                return asset.data.clone();
            }
            VideoCapability::Partial { missing } => {
                warnings.report(format!(
                    "{}: ffmpeg lacks required encoders ({}), keeping original",
                    path,
                    missing.join(", ")
                ));
                return asset.data.clone();
            }
        }

        match self.transcode(asset, container).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warnings.report(format!("{}: video conversion failed: {}", path, e));
                asset.data.clone()
            }
        }
    }
}
