//! Resize and rotate math for element transforms.

use crate::element::Transform;
use crate::selection::ResizeHandle;
use crate::snap::{GridSnap, normalize_degrees, snap_angle};
use kurbo::{Point, Vec2};

/// Smallest width or height a resize gesture can produce.
pub const MIN_RESIZE_SIZE: f64 = 20.0;

/// Rotate a document-space delta into the element's unrotated, unscaled frame.
fn to_local_delta(t: &Transform, delta: Vec2) -> Vec2 {
    let (sin, cos) = t.rotation.to_radians().sin_cos();
    let local = Vec2::new(delta.x * cos + delta.y * sin, -delta.x * sin + delta.y * cos);
    let sx = if t.scale_x.abs() > f64::EPSILON { t.scale_x } else { 1.0 };
    let sy = if t.scale_y.abs() > f64::EPSILON { t.scale_y } else { 1.0 };
    Vec2::new(local.x / sx, local.y / sy)
}

/// Local point that stays fixed while dragging `handle`.
fn anchor(handle: ResizeHandle, width: f64, height: f64) -> Point {
    Point::new(
        if handle.moves_west() { width } else { 0.0 },
        if handle.moves_north() { height } else { 0.0 },
    )
}

/// Compute a resized transform from the gesture's original transform and the
/// total document-space pointer delta.
///
/// With `aspect_ratio` set the ratio is preserved: edge handles derive the
/// other dimension, corner handles follow whichever dimension changed more.
/// Grid snapping applies to the moved edges of free resizes only. Width and
/// height never drop below [`MIN_RESIZE_SIZE`] and all four fields are
/// rounded to whole units.
pub fn resize_transform(
    original: &Transform,
    handle: ResizeHandle,
    delta: Vec2,
    aspect_ratio: Option<f64>,
    snap: &GridSnap,
) -> Transform {
    let d = to_local_delta(original, delta);
    let (w0, h0) = (original.width, original.height);

    let (x, y, width, height) = match aspect_ratio.filter(|r| r.is_finite() && *r > 0.0) {
        Some(ratio) => resize_locked(original, handle, d, ratio),
        None => resize_free(original, handle, d, snap),
    };

    let mut result = Transform {
        x,
        y,
        width,
        height,
        ..*original
    };

    // Keep the anchor fixed in document space under rotation and scale.
    let before = original.local_to_document() * anchor(handle, w0, h0);
    let after = result.local_to_document() * anchor(handle, width, height);
    result.translate(before - after);

    result.x = result.x.round();
    result.y = result.y.round();
    result.width = result.width.round();
    result.height = result.height.round();
    result
}

fn resize_free(o: &Transform, handle: ResizeHandle, d: Vec2, snap: &GridSnap) -> (f64, f64, f64, f64) {
    let (mut x0, mut y0) = (o.x, o.y);
    let (mut x1, mut y1) = (o.x + o.width, o.y + o.height);

    if handle.moves_west() {
        x0 = snap.snap(x0 + d.x);
    }
    if handle.moves_east() {
        x1 = snap.snap(x1 + d.x);
    }
    if handle.moves_north() {
        y0 = snap.snap(y0 + d.y);
    }
    if handle.moves_south() {
        y1 = snap.snap(y1 + d.y);
    }

    if x1 - x0 < MIN_RESIZE_SIZE {
        if handle.moves_west() {
            x0 = x1 - MIN_RESIZE_SIZE;
        } else {
            x1 = x0 + MIN_RESIZE_SIZE;
        }
    }
    if y1 - y0 < MIN_RESIZE_SIZE {
        if handle.moves_north() {
            y0 = y1 - MIN_RESIZE_SIZE;
        } else {
            y1 = y0 + MIN_RESIZE_SIZE;
        }
    }
    (x0, y0, x1 - x0, y1 - y0)
}

fn resize_locked(o: &Transform, handle: ResizeHandle, d: Vec2, ratio: f64) -> (f64, f64, f64, f64) {
    let (w0, h0) = (o.width, o.height);
    let dragged_w = if handle.moves_west() { w0 - d.x } else { w0 + d.x };
    let dragged_h = if handle.moves_north() { h0 - d.y } else { h0 + d.y };

    let (mut width, mut height) = match handle {
        ResizeHandle::E | ResizeHandle::W => (dragged_w, dragged_w / ratio),
        ResizeHandle::N | ResizeHandle::S => (dragged_h * ratio, dragged_h),
        _ => {
            let dw = (dragged_w - w0).abs() / w0.max(f64::EPSILON);
            let dh = (dragged_h - h0).abs() / h0.max(f64::EPSILON);
            if dw >= dh {
                (dragged_w, dragged_w / ratio)
            } else {
                (dragged_h * ratio, dragged_h)
            }
        }
    };

    if width < MIN_RESIZE_SIZE || height < MIN_RESIZE_SIZE {
        if ratio >= 1.0 {
            height = MIN_RESIZE_SIZE;
            width = MIN_RESIZE_SIZE * ratio;
        } else {
            width = MIN_RESIZE_SIZE;
            height = MIN_RESIZE_SIZE / ratio;
        }
    }

    let x = if handle.moves_west() { o.x + w0 - width } else { o.x };
    let y = if handle.moves_north() { o.y + h0 - height } else { o.y };
    (x, y, width, height)
}

/// Rotation in degrees for a pointer at `pointer`, measured from the
/// element center with 0° pointing up. Result is in `[0, 360)`.
pub fn rotation_towards(transform: &Transform, pointer: Point, snap_to_increment: bool) -> f64 {
    let center = transform.center();
    let dx = pointer.x - center.x;
    let dy = pointer.y - center.y;
    let mut degrees = dy.atan2(dx).to_degrees() + 90.0;
    if snap_to_increment {
        degrees = snap_angle(degrees);
    }
    normalize_degrees(degrees)
}
