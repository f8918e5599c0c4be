use kurbo::{Affine, BezPath, Point, Rect, RoundedRect, Shape};

use crate::animation::ease::Ease;
use crate::foundation::core::{Canvas, LOOP_DURATION_SECS, Rgba8};
use crate::foundation::error::{PosecastError, PosecastResult};
use crate::foundation::math::{lerp, mul_div255_u8};
use crate::overlay::font::{self, GLYPH_HEIGHT};
use crate::overlay::style::SpeechStyle;
use crate::render::backend::FrameRGBA;

pub const MAX_SPEECH_CHARS: usize = 24;

const FADE_IN_SECS: f32 = 0.2;
const FADE_OUT_SECS: f32 = 0.4;
const MIN_VISIBLE_OPACITY: f32 = 0.001;

const MAX_PIXEL_SCALE: u32 = 6;
const MIN_PIXEL_SCALE: u32 = 2;
const MAX_TEXT_WIDTH_FRAC: f64 = 0.64;
const MARGIN_FRAC: f64 = 0.06;

const PAD_X: f64 = 14.0;
const PAD_Y: f64 = 12.0;
const MIN_BUBBLE_W: f64 = 120.0;
const MIN_BUBBLE_H: f64 = 56.0;
const BORDER: f64 = 4.0;
const RADIUS: f64 = 8.0;
const TAIL_W: f64 = 16.0;
const TAIL_H: f64 = 10.0;
const TAIL_MAX_INSET: f64 = 28.0;
const SHADOW_OFFSET: f64 = 4.0;
const SHADOW: Rgba8 = Rgba8::new(0, 0, 0, 46);
const TEXT_SHADOW: Rgba8 = Rgba8::new(0, 0, 0, 64);

/// One of the nine anchor points of a 3×3 grid over the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpeechPosition {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    #[default]
    BottomCenter,
    BottomRight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Middle,
    Bottom,
}

impl SpeechPosition {
    pub const ALL: [Self; 9] = [
        Self::TopLeft,
        Self::TopCenter,
        Self::TopRight,
        Self::MiddleLeft,
        Self::MiddleCenter,
        Self::MiddleRight,
        Self::BottomLeft,
        Self::BottomCenter,
        Self::BottomRight,
    ];

    pub fn h_align(self) -> HAlign {
        match self {
            Self::TopLeft | Self::MiddleLeft | Self::BottomLeft => HAlign::Left,
            Self::TopCenter | Self::MiddleCenter | Self::BottomCenter => HAlign::Center,
            Self::TopRight | Self::MiddleRight | Self::BottomRight => HAlign::Right,
        }
    }

    pub fn v_align(self) -> VAlign {
        match self {
            Self::TopLeft | Self::TopCenter | Self::TopRight => VAlign::Top,
            Self::MiddleLeft | Self::MiddleCenter | Self::MiddleRight => VAlign::Middle,
            Self::BottomLeft | Self::BottomCenter | Self::BottomRight => VAlign::Bottom,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpeechRenderMode {
    #[default]
    Bubble,
    TextOnly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TailDirection {
    Up,
    Down,
}

/// Everything needed to draw one speech overlay.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeechOverlay {
    pub text: String,
    pub position: SpeechPosition,
    pub mode: SpeechRenderMode,
    pub style: SpeechStyle,
}

impl SpeechOverlay {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            position: SpeechPosition::default(),
            mode: SpeechRenderMode::default(),
            style: SpeechStyle::default(),
        }
    }
}

/// Trim, collapse whitespace runs (newlines included) to single spaces and keep at most
/// [`MAX_SPEECH_CHARS`] characters.
pub fn normalize_speech(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(MAX_SPEECH_CHARS).collect()
}

fn entrance(t: f32) -> f32 {
    Ease::Linear.window(t, 0.0, FADE_IN_SECS)
}

/// Overlay opacity at loop time `t`: fades in over the first 0.2 s and out over the last 0.4 s.
pub fn overlay_opacity(t: f32) -> f32 {
    let fade_out = Ease::Linear.window(t, LOOP_DURATION_SECS - FADE_OUT_SECS, LOOP_DURATION_SECS);
    (entrance(t) * (1.0 - fade_out)).clamp(0.0, 1.0)
}

/// Scale applied around the anchor while the overlay fades in.
pub fn entrance_scale(t: f32) -> f32 {
    lerp(0.95, 1.0, entrance(t))
}

/// Pixel scale and drawn size of a text block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextBlock {
    pub pixel_scale: u32,
    pub width: f64,
    pub height: f64,
}

/// Largest pixel scale, from 6 down to 2, at which `text` fits `max_width`. The block keeps a
/// one-font-pixel gutter on every side for the drop shadow and halo.
pub fn fit_text(text: &str, max_width: f64) -> TextBlock {
    let units = font::text_units(text);
    let mut scale = MAX_PIXEL_SCALE;
    while scale > MIN_PIXEL_SCALE && f64::from(units * scale) > max_width {
        scale -= 1;
    }
    TextBlock {
        pixel_scale: scale,
        width: f64::from((units + 2) * scale),
        height: f64::from((GLYPH_HEIGHT + 2) * scale),
    }
}

/// Speech geometry in anchor-local coordinates (before the entrance scale).
#[derive(Clone, Debug, PartialEq)]
pub struct SpeechLayout {
    pub text: String,
    pub anchor: Point,
    pub h_align: HAlign,
    pub v_align: VAlign,
    pub bubble: Rect,
    pub tail_direction: TailDirection,
    /// Left edge of the tail base, already clamped inside the straight part of the edge.
    pub tail_x: f64,
    pub text_block: TextBlock,
}

impl SpeechLayout {
    /// Bubble rectangle in frame coordinates at full scale.
    pub fn bubble_in_frame(&self) -> Rect {
        self.bubble + self.anchor.to_vec2()
    }

    fn tail_path(&self, grow: f64) -> BezPath {
        let b = self.bubble;
        let (base_y, tip_y) = match self.tail_direction {
            TailDirection::Down => (b.y1 - grow, b.y1 + TAIL_H + grow),
            TailDirection::Up => (b.y0 + grow, b.y0 - TAIL_H - grow),
        };
        let mut p = BezPath::new();
        p.move_to((self.tail_x - grow, base_y));
        p.line_to((self.tail_x + TAIL_W + grow, base_y));
        p.line_to((self.tail_x + TAIL_W / 2.0, tip_y));
        p.close_path();
        p
    }
}

/// Lay out `text` for a frame. Returns `None` when the normalized text is empty.
pub fn layout_speech(
    text: &str,
    canvas: Canvas,
    position: SpeechPosition,
) -> Option<SpeechLayout> {
    let text = normalize_speech(text);
    if text.is_empty() {
        return None;
    }
    let w = f64::from(canvas.width);
    let h = f64::from(canvas.height);
    let margin = (w.min(h) * MARGIN_FRAC).round();

    let h_align = position.h_align();
    let v_align = position.v_align();
    let anchor = Point::new(
        match h_align {
            HAlign::Left => margin,
            HAlign::Center => w * 0.5,
            HAlign::Right => w - margin,
        },
        match v_align {
            VAlign::Top => margin,
            VAlign::Middle => h * 0.5,
            VAlign::Bottom => h - margin,
        },
    );

    let measured = fit_text(&text, w * MAX_TEXT_WIDTH_FRAC);
    let bubble_w = (w - margin * 2.0).min(MIN_BUBBLE_W.max(measured.width + PAD_X * 2.0));
    let bubble_h = MIN_BUBBLE_H.max(measured.height + PAD_Y * 2.0);
    let bx = match h_align {
        HAlign::Left => 0.0,
        HAlign::Center => -bubble_w / 2.0,
        HAlign::Right => -bubble_w,
    };
    let by = match v_align {
        VAlign::Top => 0.0,
        VAlign::Middle => -bubble_h / 2.0,
        VAlign::Bottom => -bubble_h,
    };
    let bubble = Rect::new(
        bx.round(),
        by.round(),
        bx.round() + bubble_w.round(),
        by.round() + bubble_h.round(),
    );

    // The tail leans toward the frame center.
    let tail_inset = TAIL_MAX_INSET.min(bubble_w * 0.22);
    let tail_center = match h_align {
        HAlign::Right => bx + tail_inset,
        HAlign::Left => bx + bubble_w - tail_inset,
        HAlign::Center => bx + bubble_w / 2.0,
    };
    // On bubbles too narrow for both bounds the right bound wins.
    let tail_x = (tail_center - TAIL_W / 2.0)
        .max(bubble.x0 + RADIUS + 6.0)
        .min(bubble.x1 - RADIUS - 6.0 - TAIL_W);
    let tail_direction = match v_align {
        VAlign::Bottom => TailDirection::Up,
        VAlign::Top | VAlign::Middle => TailDirection::Down,
    };

    let text_block = fit_text(&text, bubble.width() - PAD_X * 2.0);
    Some(SpeechLayout {
        text,
        anchor,
        h_align,
        v_align,
        bubble,
        tail_direction,
        tail_x,
        text_block,
    })
}

/// Draws speech overlays onto rendered frames.
///
/// The vector context and scratch pixmap are reused between frames of the same size.
#[derive(Default)]
pub struct OverlayCompositor {
    ctx: Option<vello_cpu::RenderContext>,
    pixmap: Option<vello_cpu::Pixmap>,
}

impl OverlayCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Composite `overlay` at loop time `t` over a premultiplied frame.
    ///
    /// Returns `false` and leaves the frame untouched when there is nothing to draw.
    pub fn draw(
        &mut self,
        frame: &mut FrameRGBA,
        t: f32,
        overlay: &SpeechOverlay,
    ) -> PosecastResult<bool> {
        let Some(layout) = layout_speech(&overlay.text, frame.canvas(), overlay.position) else {
            return Ok(false);
        };
        let opacity = overlay_opacity(t);
        if opacity <= MIN_VISIBLE_OPACITY {
            return Ok(false);
        }
        if !frame.premultiplied {
            return Err(PosecastError::render("overlay target must be premultiplied"));
        }
        frame.check_len()?;
        let (Ok(w), Ok(h)) = (u16::try_from(frame.width), u16::try_from(frame.height)) else {
            return Err(PosecastError::render("overlay target width/height must fit in u16"));
        };

        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w && ctx.height() == h => ctx,
            _ => vello_cpu::RenderContext::new(w, h),
        };
        ctx.reset();
        let mut pixmap = match self.pixmap.take() {
            Some(p) if p.width() == w && p.height() == h => p,
            _ => vello_cpu::Pixmap::new(w, h),
        };
        pixmap.data_as_u8_slice_mut().fill(0);

        let scale = f64::from(entrance_scale(t));
        let transform = Affine::translate(layout.anchor.to_vec2()) * Affine::scale(scale);
        ctx.set_transform(affine_to_cpu(transform));
        ctx.push_opacity_layer(opacity);
        match overlay.mode {
            SpeechRenderMode::Bubble => {
                paint_bubble(&mut ctx, &layout, &overlay.style);
                paint_text(&mut ctx, &layout, overlay.style.text, None);
            }
            SpeechRenderMode::TextOnly => {
                paint_text(&mut ctx, &layout, overlay.style.text, Some(overlay.style.frame));
            }
        }
        ctx.pop_layer();
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);

        premul_over_in_place(&mut frame.data, pixmap.data_as_u8_slice())?;
        self.ctx = Some(ctx);
        self.pixmap = Some(pixmap);
        Ok(true)
    }
}

/// One-shot [`OverlayCompositor::draw`].
pub fn draw_overlay(
    frame: &mut FrameRGBA,
    t: f32,
    overlay: &SpeechOverlay,
) -> PosecastResult<bool> {
    OverlayCompositor::new().draw(frame, t, overlay)
}

fn set_color(ctx: &mut vello_cpu::RenderContext, c: Rgba8) {
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a));
}

fn fill(ctx: &mut vello_cpu::RenderContext, path: &BezPath) {
    ctx.fill_path(&bezpath_to_cpu(path));
}

fn rounded(rect: Rect, grow: f64) -> BezPath {
    RoundedRect::from_rect(rect.inflate(grow, grow), (RADIUS + grow).max(0.0)).to_path(0.1)
}

fn paint_bubble(ctx: &mut vello_cpu::RenderContext, layout: &SpeechLayout, style: &SpeechStyle) {
    let half = BORDER / 2.0;

    set_color(ctx, SHADOW);
    fill(
        ctx,
        &rounded(layout.bubble + kurbo::Vec2::new(SHADOW_OFFSET, SHADOW_OFFSET), 0.0),
    );

    // Border: the outline shapes in the frame color, then the fill inset by the border width.
    set_color(ctx, style.frame);
    fill(ctx, &rounded(layout.bubble, half));
    fill(ctx, &layout.tail_path(half));

    set_color(ctx, style.fill);
    fill(ctx, &rounded(layout.bubble, -half));
    fill(ctx, &layout.tail_path(-half));
}

fn paint_text(
    ctx: &mut vello_cpu::RenderContext,
    layout: &SpeechLayout,
    color: Rgba8,
    halo: Option<Rgba8>,
) {
    let block = layout.text_block;
    let s = f64::from(block.pixel_scale);
    let center = layout.bubble.center();
    let origin_x = (center.x - block.width / 2.0).round() + s;
    let origin_y = (center.y - block.height / 2.0).round() + s;

    let pass = |ctx: &mut vello_cpu::RenderContext, dx: f64, dy: f64| {
        font::for_each_pixel(&layout.text, |x, y| {
            let x0 = origin_x + f64::from(x) * s + dx;
            let y0 = origin_y + f64::from(y) * s + dy;
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(x0, y0, x0 + s, y0 + s));
        });
    };

    match halo {
        Some(halo) => {
            set_color(ctx, halo);
            for (dx, dy) in [
                (-1.0, -1.0),
                (0.0, -1.0),
                (1.0, -1.0),
                (-1.0, 0.0),
                (1.0, 0.0),
                (-1.0, 1.0),
                (0.0, 1.0),
                (1.0, 1.0),
            ] {
                pass(&mut *ctx, dx * s, dy * s);
            }
        }
        None => {
            set_color(ctx, TEXT_SHADOW);
            pass(&mut *ctx, s, s);
        }
    }
    set_color(ctx, color);
    pass(&mut *ctx, 0.0, 0.0);
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn premul_over_in_place(dst: &mut [u8], src: &[u8]) -> PosecastResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(PosecastError::render(
            "premul_over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let sa = u16::from(s[3]);
        if sa == 0 {
            continue;
        }
        let inv = 255 - sa;
        d[3] = s[3].saturating_add(mul_div255_u8(u16::from(d[3]), inv));
        for c in 0..3 {
            d[c] = s[c].saturating_add(mul_div255_u8(u16::from(d[c]), inv));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/speech.rs"]
mod tests;
