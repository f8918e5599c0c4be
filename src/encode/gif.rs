use std::borrow::Cow;
use std::collections::HashMap;

use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{FrameIndex, Rgba8};
use crate::foundation::error::{PosecastError, PosecastResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::backend::FrameRGBA;

pub const GIF_MIME: &str = "image/gif";

/// NeuQuant sampling factor (1 = best, 30 = fastest).
const NEUQUANT_SAMPLEFAC: i32 = 10;

/// Finished animated image. Immutable once produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GifBlob {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    frame_count: u64,
}

impl GifBlob {
    pub fn mime(&self) -> &'static str {
        GIF_MIME
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Reduced color table for one frame.
pub enum Palette {
    /// Every distinct color of the frame, in first-seen order.
    Exact {
        rgb: Vec<u8>,
        lookup: HashMap<[u8; 3], u8>,
    },
    /// Learned table for frames with more distinct colors than fit.
    Learned(color_quant::NeuQuant),
}

impl Palette {
    /// Packed RGB triplets as stored in the GIF color table.
    pub fn rgb(&self) -> Vec<u8> {
        match self {
            Self::Exact { rgb, .. } => rgb.clone(),
            Self::Learned(nq) => nq.color_map_rgb(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Exact { lookup, .. } => lookup.len(),
            Self::Learned(nq) => nq.color_map_rgb().len() / 3,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Self::Exact { .. })
    }

    fn index_of(&self, px: &[u8]) -> u8 {
        match self {
            Self::Exact { lookup, .. } => {
                lookup.get(&[px[0], px[1], px[2]]).copied().unwrap_or(0)
            }
            Self::Learned(nq) => nq.index_of(&[px[0], px[1], px[2], 255]) as u8,
        }
    }
}

/// Build a palette of at most `max_colors` entries for opaque RGBA8 pixels.
pub fn quantize_rgba(rgba: &[u8], max_colors: usize) -> PosecastResult<Palette> {
    if !(1..=256).contains(&max_colors) {
        return Err(PosecastError::validation("palette size must be in 1..=256"));
    }
    if !rgba.len().is_multiple_of(4) {
        return Err(PosecastError::encode("quantize_rgba expects rgba8 pixels"));
    }

    let mut lookup = HashMap::new();
    let mut rgb = Vec::new();
    for px in rgba.chunks_exact(4) {
        let key = [px[0], px[1], px[2]];
        if lookup.contains_key(&key) {
            continue;
        }
        if lookup.len() == max_colors {
            return Ok(Palette::Learned(color_quant::NeuQuant::new(
                NEUQUANT_SAMPLEFAC,
                max_colors,
                rgba,
            )));
        }
        lookup.insert(key, lookup.len() as u8);
        rgb.extend_from_slice(&key);
    }
    Ok(Palette::Exact { rgb, lookup })
}

/// Map every pixel to its palette index.
pub fn apply_palette(rgba: &[u8], palette: &Palette) -> Vec<u8> {
    rgba.chunks_exact(4).map(|px| palette.index_of(px)).collect()
}

/// Flatten `src` over an opaque background color into `dst`.
pub(crate) fn flatten_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    src_is_premul: bool,
    bg: Rgba8,
) -> PosecastResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(PosecastError::encode(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg = [u16::from(bg.r), u16::from(bg.g), u16::from(bg.b)];
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            let fg = if src_is_premul {
                u16::from(s[c])
            } else {
                mul_div255_u16(u16::from(s[c]), a)
            };
            d[c] = (fg + mul_div255_u16(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

/// Animated GIF encoder sink.
///
/// Each frame is flattened over the background, reduced to its own local palette and appended
/// with a fixed delay. The loop flag is written once, ahead of the first frame.
pub struct GifSink {
    background: Rgba8,
    max_colors: usize,
    cfg: Option<SinkConfig>,
    encoder: Option<gif::Encoder<Vec<u8>>>,
    delay_cs: u16,
    scratch: Vec<u8>,
    last: Option<FrameIndex>,
    frames: u64,
    blob: Option<GifBlob>,
}

impl GifSink {
    pub fn new(background: Rgba8, max_colors: usize) -> Self {
        Self {
            background,
            max_colors,
            cfg: None,
            encoder: None,
            delay_cs: 0,
            scratch: Vec::new(),
            last: None,
            frames: 0,
            blob: None,
        }
    }

    /// Take the finished blob after a successful `end`.
    pub fn take_blob(&mut self) -> Option<GifBlob> {
        self.blob.take()
    }

    pub fn frames_written(&self) -> u64 {
        self.frames
    }
}

fn encode_err(e: gif::EncodingError) -> PosecastError {
    PosecastError::encode(format!("gif: {e}"))
}

impl FrameSink for GifSink {
    #[tracing::instrument(skip(self))]
    fn begin(&mut self, cfg: SinkConfig) -> PosecastResult<()> {
        let (Ok(w), Ok(h)) = (u16::try_from(cfg.width), u16::try_from(cfg.height)) else {
            return Err(PosecastError::validation("gif width/height must fit in u16"));
        };
        if w == 0 || h == 0 {
            return Err(PosecastError::validation("gif width/height must be non-zero"));
        }
        if !(1..=256).contains(&self.max_colors) {
            return Err(PosecastError::validation("palette size must be in 1..=256"));
        }

        let mut encoder = gif::Encoder::new(Vec::new(), w, h, &[]).map_err(encode_err)?;
        encoder.set_repeat(gif::Repeat::Infinite).map_err(encode_err)?;

        // GIF delays are centiseconds.
        self.delay_cs = ((cfg.fps.frame_delay_ms() + 5) / 10).min(u32::from(u16::MAX)) as u16;
        self.encoder = Some(encoder);
        self.scratch = vec![0; (cfg.width as usize) * (cfg.height as usize) * 4];
        self.cfg = Some(cfg);
        self.last = None;
        self.frames = 0;
        self.blob = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> PosecastResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| PosecastError::encode("push_frame called before begin"))?;
        if let Some(last) = self.last
            && idx <= last
        {
            return Err(PosecastError::encode(format!(
                "frames must arrive in increasing order (got {} after {})",
                idx.0, last.0
            )));
        }
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(PosecastError::encode(format!(
                "frame is {}x{}, sink expects {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        frame.check_len()?;

        flatten_to_opaque_rgba8(
            &mut self.scratch,
            &frame.data,
            frame.premultiplied,
            self.background,
        )?;
        let palette = quantize_rgba(&self.scratch, self.max_colors)?;
        let indices = apply_palette(&self.scratch, &palette);

        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| PosecastError::encode("gif encoder already finished"))?;
        let out = gif::Frame {
            width: cfg.width as u16,
            height: cfg.height as u16,
            delay: self.delay_cs,
            palette: Some(palette.rgb()),
            buffer: Cow::Owned(indices),
            ..gif::Frame::default()
        };
        encoder.write_frame(&out).map_err(encode_err)?;

        self.last = Some(idx);
        self.frames += 1;
        Ok(())
    }

    fn end(&mut self) -> PosecastResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| PosecastError::encode("end called before begin"))?;
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| PosecastError::encode("gif encoder already finished"))?;
        if self.frames == 0 {
            return Err(PosecastError::encode("gif needs at least one frame"));
        }
        let bytes = encoder
            .into_inner()
            .map_err(|e| PosecastError::encode(format!("gif finalize: {e}")))?;
        tracing::debug!(frames = self.frames, bytes = bytes.len(), "gif finalized");
        self.blob = Some(GifBlob {
            bytes,
            width: cfg.width,
            height: cfg.height,
            frame_count: self.frames,
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/gif.rs"]
mod tests;
