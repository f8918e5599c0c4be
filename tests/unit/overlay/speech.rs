use super::*;
use crate::overlay::style::speech_style;

fn black(size: u32) -> FrameRGBA {
    FrameRGBA::solid(Canvas::square(size), Rgba8::BLACK)
}

#[test]
fn normalization_truncates_and_flattens() {
    let long = "abcdefghijklmnopqrstuvwxyz0123456789";
    assert_eq!(normalize_speech(long).chars().count(), MAX_SPEECH_CHARS);
    assert_eq!(normalize_speech(long), "abcdefghijklmnopqrstuvwx");
    assert_eq!(normalize_speech("  Hi \n\n there\t!  "), "Hi there !");
    assert!(!normalize_speech("a\nb").contains('\n'));
    assert_eq!(normalize_speech(" \n\t "), "");
}

#[test]
fn opacity_envelope() {
    assert_eq!(overlay_opacity(0.0), 0.0);
    assert!((overlay_opacity(0.1) - 0.5).abs() < 1e-5);
    assert_eq!(overlay_opacity(0.2), 1.0);
    assert_eq!(overlay_opacity(1.5), 1.0);
    assert!((overlay_opacity(2.8) - 0.5).abs() < 1e-5);
    assert_eq!(overlay_opacity(LOOP_DURATION_SECS), 0.0);
    assert!((entrance_scale(0.0) - 0.95).abs() < 1e-6);
    assert_eq!(entrance_scale(1.0), 1.0);
}

#[test]
fn pixel_scale_shrinks_to_fit() {
    assert_eq!(fit_text("Hello", 327.0).pixel_scale, 6);
    let long = normalize_speech("abcdefghijklmnopqrstuvwxyz");
    let block = fit_text(&long, 327.0);
    assert_eq!(block.pixel_scale, 2);
    assert_eq!(block.width, f64::from((143 + 2) * 2));
    // Never below the minimum, even when nothing fits.
    assert_eq!(fit_text(&long, 10.0).pixel_scale, 2);
}

#[test]
fn nine_anchors_keep_equal_margins() {
    let canvas = Canvas::square(512);
    let margin = 31.0;
    for position in SpeechPosition::ALL {
        let l = layout_speech("Hello there", canvas, position).unwrap();
        let b = l.bubble_in_frame();
        assert!(b.x0 >= margin - 1.0 && b.x1 <= 512.0 - margin + 1.0, "{position:?} {b:?}");
        assert!(b.y0 >= margin - 1.0 && b.y1 <= 512.0 - margin + 1.0, "{position:?} {b:?}");
        match l.h_align {
            HAlign::Left => assert_eq!(b.x0, margin),
            HAlign::Right => assert_eq!(b.x1, 512.0 - margin),
            HAlign::Center => assert!((b.center().x - 256.0).abs() <= 1.0),
        }
        match l.v_align {
            VAlign::Top => assert_eq!(b.y0, margin),
            VAlign::Bottom => assert_eq!(b.y1, 512.0 - margin),
            VAlign::Middle => assert!((b.center().y - 256.0).abs() <= 1.0),
        }
    }
}

#[test]
fn tail_points_and_leans_toward_center() {
    let canvas = Canvas::square(512);
    let bottom = layout_speech("Hi", canvas, SpeechPosition::BottomLeft).unwrap();
    assert_eq!(bottom.tail_direction, TailDirection::Up);
    let top = layout_speech("Hi", canvas, SpeechPosition::TopRight).unwrap();
    assert_eq!(top.tail_direction, TailDirection::Down);
    let middle = layout_speech("Hi", canvas, SpeechPosition::MiddleCenter).unwrap();
    assert_eq!(middle.tail_direction, TailDirection::Down);

    let tail_center = |l: &SpeechLayout| l.tail_x + TAIL_W / 2.0;
    assert!(tail_center(&bottom) > bottom.bubble.center().x);
    assert!(tail_center(&top) < top.bubble.center().x);
    assert!((tail_center(&middle) - middle.bubble.center().x).abs() < 1e-9);

    for l in [&bottom, &top, &middle] {
        assert!(l.tail_x >= l.bubble.x0 + RADIUS + 6.0);
        assert!(l.tail_x + TAIL_W <= l.bubble.x1 - RADIUS - 6.0);
    }
}

#[test]
fn narrow_bubble_tail_takes_the_right_bound() {
    let l = layout_speech("Hi", Canvas::square(40), SpeechPosition::BottomLeft).unwrap();
    let lo = l.bubble.x0 + RADIUS + 6.0;
    let hi = l.bubble.x1 - RADIUS - 6.0 - TAIL_W;
    assert!(hi < lo);
    assert_eq!(l.tail_x, hi);
}

#[test]
fn empty_or_invisible_overlay_leaves_frame_untouched() {
    let original = black(64);
    let mut frame = original.clone();
    assert!(!draw_overlay(&mut frame, 1.5, &SpeechOverlay::new("  \n ")).unwrap());
    assert_eq!(frame, original);
    assert!(!draw_overlay(&mut frame, 0.0, &SpeechOverlay::new("Hello")).unwrap());
    assert!(!draw_overlay(&mut frame, LOOP_DURATION_SECS, &SpeechOverlay::new("Hello")).unwrap());
    assert_eq!(frame, original);
}

#[test]
fn bubble_fill_covers_inside_only() {
    let mut frame = black(256);
    let overlay = SpeechOverlay::new("Hi");
    assert!(draw_overlay(&mut frame, 1.5, &overlay).unwrap());
    let inside = frame.pixel(88, 169).unwrap();
    assert!(inside[0] > 200 && inside[1] > 200 && inside[2] > 200, "{inside:?}");
    assert_eq!(frame.pixel(5, 5), Some([0, 0, 0, 255]));
    assert!(frame.data.chunks_exact(4).all(|p| p[3] == 255));
}

#[test]
fn text_only_mode_skips_the_bubble() {
    let mut frame = black(256);
    let overlay = SpeechOverlay {
        mode: SpeechRenderMode::TextOnly,
        style: speech_style("inverse"),
        ..SpeechOverlay::new("Hi")
    };
    assert!(draw_overlay(&mut frame, 1.5, &overlay).unwrap());
    assert_eq!(frame.pixel(88, 169), Some([0, 0, 0, 255]));
    assert!(frame.data.chunks_exact(4).any(|p| p[0] > 200));
}

#[test]
fn compositor_requires_premultiplied_target() {
    let mut frame = black(32);
    frame.premultiplied = false;
    assert!(draw_overlay(&mut frame, 1.0, &SpeechOverlay::new("x")).is_err());

    let mut compositor = OverlayCompositor::new();
    let mut a = black(32);
    let mut b = black(32);
    compositor.draw(&mut a, 1.0, &SpeechOverlay::new("x")).unwrap();
    compositor.draw(&mut b, 1.0, &SpeechOverlay::new("x")).unwrap();
    assert_eq!(a, b);
}
