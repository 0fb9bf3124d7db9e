//! Template existence checking against live screenshots.
//!
//! Normalized cross-correlation over grayscale frames; a template "exists"
//! when the best score reaches its descriptor threshold.

use crate::capture::CaptureError;
use crate::device::DeviceSession;
use crate::templates::TemplateDescriptor;
use image::GrayImage;
use imageproc::template_matching::{MatchTemplateMethod, match_template};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Best correlation score of `template` anywhere in `frame`.
///
/// CrossCorrelationNormalized scores are in [0, 1] for non-negative images,
/// 1.0 being a perfect match.
pub fn best_score(frame: &GrayImage, template: &GrayImage) -> f32 {
    let result = match_template(
        frame,
        template,
        MatchTemplateMethod::CrossCorrelationNormalized,
    );
    result
        .pixels()
        .map(|p| p[0])
        .fold(f32::MIN, f32::max)
}

/// Take one snapshot and check whether `descriptor` appears on screen.
pub fn template_exists<S: DeviceSession>(
    session: &mut S,
    descriptor: &TemplateDescriptor,
) -> Result<bool, CaptureError> {
    let template = image::open(&descriptor.path)
        .map_err(|e| CaptureError::TemplateRead {
            path: descriptor.path.clone(),
            source: e,
        })?
        .to_luma8();

    let snapshot = session.snapshot()?;
    let frame = image::load_from_memory(&snapshot.bytes)
        .map_err(|e| CaptureError::Decode { source: e })?
        .to_luma8();

    if template.width() > frame.width() || template.height() > frame.height() {
        return Err(CaptureError::TemplateLargerThanFrame {
            name: descriptor.name.clone(),
            t_width: template.width(),
            t_height: template.height(),
            width: frame.width(),
            height: frame.height(),
        });
    }

    let score = best_score(&frame, &template);
    let threshold = descriptor.effective_threshold();
    log::debug!(
        "Template '{}': score {:.3} vs threshold {:.3}",
        descriptor.name,
        score,
        threshold
    );
    Ok(score >= threshold)
}

/// Poll `template_exists` every `interval` until it reports a hit, `timeout`
/// elapses, or `running` clears (operator interrupt).
pub fn poll_exists<S: DeviceSession>(
    session: &mut S,
    descriptor: &TemplateDescriptor,
    timeout: Duration,
    interval: Duration,
    running: &AtomicBool,
) -> Result<bool, CaptureError> {
    let deadline = Instant::now() + timeout;
    loop {
        if !running.load(Ordering::SeqCst) {
            return Ok(false);
        }
        if template_exists(session, descriptor)? {
            return Ok(true);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }
        std::thread::sleep(interval.min(deadline - now));
    }
}
