//! Model and model-view-projection matrices.

use glam::{Mat4, Vec3};

/// Vertical field of view shared by both passes.
pub const FOV_Y_DEGREES: f32 = 45.0;
pub const Z_NEAR: f32 = 0.01;
pub const Z_FAR: f32 = 20.0;

/// Right-handed perspective projection with a 45° vertical FOV.
pub fn perspective(aspect: f32) -> Mat4 {
    Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), aspect, Z_NEAR, Z_FAR)
}

/// Projection for a `width` x `height` framebuffer.
///
/// A zero height (minimized window) falls back to a 1:1 aspect.
pub fn perspective_for(width: u32, height: u32) -> Mat4 {
    if width == 0 || height == 0 {
        return perspective(1.0);
    }
    perspective(width as f32 / height as f32)
}

/// `translate(position) * rotateX(rot_x) * rotateY(rot_y)`; angles in radians.
pub fn compute_model(position: Vec3, rot_x: f32, rot_y: f32) -> Mat4 {
    Mat4::from_translation(position) * Mat4::from_rotation_x(rot_x) * Mat4::from_rotation_y(rot_y)
}

/// `proj * view * model`.
pub fn compute_mvp(proj: Mat4, view: Mat4, model: Mat4) -> Mat4 {
    proj * view * model
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn zero_rotation_is_pure_translation() {
        let pos = Vec3::new(0.0, 0.0, -2.0);
        let m = compute_model(pos, 0.0, 0.0);
        assert!(m.abs_diff_eq(Mat4::from_translation(pos), EPS));
        assert!(m.transform_point3(Vec3::ZERO).abs_diff_eq(pos, EPS));
    }

    #[test]
    fn rotation_order_matters() {
        let (rx, ry) = (0.7, 1.3);
        let m = compute_model(Vec3::ZERO, rx, ry);
        let swapped = Mat4::from_rotation_y(ry) * Mat4::from_rotation_x(rx);
        assert!(!m.abs_diff_eq(swapped, 1e-3));

        // Y rotation is applied to the vertex first.
        let p = Vec3::X;
        let expected = Mat4::from_rotation_x(rx).transform_point3(Mat4::from_rotation_y(ry).transform_point3(p));
        assert!(m.transform_point3(p).abs_diff_eq(expected, EPS));
    }

    #[test]
    fn model_differs_from_every_other_ordering() {
        let pos = Vec3::new(0.0, 0.0, -2.0);
        let (rx, ry) = (0.7, 1.3);
        let t = Mat4::from_translation(pos);
        let x = Mat4::from_rotation_x(rx);
        let y = Mat4::from_rotation_y(ry);
        let m = compute_model(pos, rx, ry);
        assert!(m.abs_diff_eq(t * x * y, EPS));

        let others = [t * y * x, x * t * y, x * y * t, y * t * x, y * x * t];
        for (i, other) in others.iter().enumerate() {
            assert!(!m.abs_diff_eq(*other, 1e-3), "ordering {i} matches");
        }
    }

    #[test]
    fn mvp_composes_in_order() {
        let proj = perspective(1.0);
        let pos = Vec3::new(0.0, 0.0, -2.0);
        let model = compute_model(pos, 0.02, 0.01);
        let mvp = compute_mvp(proj, Mat4::IDENTITY, model);
        let expected = proj * model;
        assert!(mvp.abs_diff_eq(expected, EPS));

        let view = Mat4::from_translation(Vec3::new(0.5, 0.0, 0.0));
        let expected = proj * view * model;
        assert!(compute_mvp(proj, view, model).abs_diff_eq(expected, EPS));
    }

    #[test]
    fn origin_projects_inside_the_frustum() {
        let model = compute_model(Vec3::new(0.0, 0.0, -2.0), 0.3, 0.2);
        let mvp = compute_mvp(perspective(4.0 / 3.0), Mat4::IDENTITY, model);
        let clip = mvp * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(clip.w > 0.0);
        assert!(ndc.x.abs() < EPS && ndc.y.abs() < EPS);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn projection_tracks_aspect() {
        let wide = perspective_for(800, 600);
        let square = perspective_for(512, 512);
        assert!(wide.abs_diff_eq(perspective(800.0 / 600.0), EPS));
        assert!(square.abs_diff_eq(perspective(1.0), EPS));
        // wider framebuffer compresses x
        assert!(wide.x_axis.x < square.x_axis.x);
        assert!((wide.y_axis.y - square.y_axis.y).abs() < EPS);
        assert!(perspective_for(800, 0).abs_diff_eq(square, EPS));
    }
}
