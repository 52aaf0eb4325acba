use glam::{Mat4, Vec3};

use crate::mesh::Bounds;
use crate::settings::ViewerSettings;
use crate::ui::InteractionState;

/// Fixed perspective camera on the +Z axis looking at the origin. The model turns, the eye only
/// slides along Z with the zoom distance.
pub struct Camera {
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(settings: &ViewerSettings) -> Self {
        let (width, height) = settings.window_size;
        let mut camera = Self {
            fov: settings.fov.to_radians(),
            aspect: 1.0,
            near: settings.near,
            far: settings.far,
        };
        camera.set_aspect(width as f32, height as f32);
        camera
    }

    pub fn eye(state: &InteractionState) -> Vec3 {
        Vec3::new(0.0, 0.0, state.zoom_distance)
    }

    /// Centers the mesh, scales it into the unit sphere, then applies the Y and X rotations.
    pub fn model_matrix(state: &InteractionState, bounds: &Bounds) -> Mat4 {
        Mat4::from_rotation_x(state.rotation_x.to_radians())
            * Mat4::from_rotation_y(state.rotation_y.to_radians())
            * Mat4::from_scale(Vec3::splat(bounds.scale()))
            * Mat4::from_translation(-bounds.center)
    }

    pub fn view_matrix(state: &InteractionState) -> Mat4 {
        Mat4::look_at_rh(Self::eye(state), Vec3::ZERO, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    /// Ignored while the window is minimized.
    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.aspect = width / height;
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniform {
    pub model: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub view_pos: [f32; 4],
    pub light_dir: [f32; 4],
    pub material_color: [f32; 4],
    /// `x` is the exponent applied to the final color; 1.0 on sRGB surfaces.
    pub output_gamma: [f32; 4],
}

impl SceneUniform {
    pub fn new(
        camera: &Camera,
        state: &InteractionState,
        bounds: &Bounds,
        settings: &ViewerSettings,
    ) -> Self {
        let model = Camera::model_matrix(state, bounds);
        let view_proj = camera.projection_matrix() * Camera::view_matrix(state);

        Self {
            model: model.to_cols_array_2d(),
            view_proj: view_proj.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
            view_pos: Camera::eye(state).extend(1.0).to_array(),
            light_dir: settings.light_dir.extend(0.0).to_array(),
            material_color: settings.material_color.extend(1.0).to_array(),
            output_gamma: [1.0, 0.0, 0.0, 0.0],
        }
    }

    pub fn with_output_gamma(mut self, exponent: f32) -> Self {
        self.output_gamma[0] = exponent;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn bounds() -> Bounds {
        Bounds {
            center: Vec3::new(10.0, -4.0, 2.0),
            radius: 4.0,
        }
    }

    #[test]
    fn model_fits_mesh_into_unit_sphere() {
        let state = InteractionState::default();
        let model = Camera::model_matrix(&state, &bounds());

        assert!(model.transform_point3(bounds().center).abs_diff_eq(Vec3::ZERO, EPS));
        let edge = bounds().center + Vec3::new(0.0, 4.0, 0.0);
        assert!(model.transform_point3(edge).abs_diff_eq(Vec3::Y, EPS));
    }

    #[test]
    fn rotations_are_applied_after_fitting() {
        let state = InteractionState {
            rotation_y: 90.0,
            ..Default::default()
        };
        let model = Camera::model_matrix(&state, &bounds());
        let edge = bounds().center + Vec3::new(4.0, 0.0, 0.0);
        assert!(model.transform_point3(edge).abs_diff_eq(-Vec3::Z, EPS));

        let state = InteractionState {
            rotation_x: 90.0,
            rotation_y: 90.0,
            ..Default::default()
        };
        let model = Camera::model_matrix(&state, &bounds());
        assert!(model.transform_point3(edge).abs_diff_eq(Vec3::Y, EPS));
    }

    #[test]
    fn eye_follows_zoom() {
        let state = InteractionState {
            zoom_distance: 7.5,
            ..Default::default()
        };
        assert_eq!(Camera::eye(&state), Vec3::new(0.0, 0.0, 7.5));

        let view = Camera::view_matrix(&state);
        assert!(view.transform_point3(Vec3::ZERO).abs_diff_eq(Vec3::new(0.0, 0.0, -7.5), EPS));
    }

    #[test]
    fn aspect_tracks_window_and_ignores_zero() {
        let mut camera = Camera::new(&ViewerSettings::default());
        assert!((camera.aspect - 1.5).abs() < EPS);

        camera.set_aspect(1920.0, 1080.0);
        assert!((camera.aspect - 16.0 / 9.0).abs() < EPS);

        camera.set_aspect(1920.0, 0.0);
        assert!((camera.aspect - 16.0 / 9.0).abs() < EPS);
    }

    #[test]
    fn uniform_layout_is_std140_friendly() {
        assert_eq!(std::mem::size_of::<SceneUniform>(), 256);
        assert_eq!(std::mem::size_of::<SceneUniform>() % 16, 0);
    }

    #[test]
    fn uniform_carries_fitted_transforms() {
        let settings = ViewerSettings::default();
        let camera = Camera::new(&settings);
        let state = InteractionState::default();
        let uniform = SceneUniform::new(&camera, &state, &bounds(), &settings);

        let model = Mat4::from_cols_array_2d(&uniform.model);
        assert!(model.transform_point3(bounds().center).abs_diff_eq(Vec3::ZERO, EPS));
        assert_eq!(uniform.view_pos, [0.0, 0.0, state.zoom_distance, 1.0]);
        assert_eq!(uniform.light_dir[3], 0.0);
        assert_eq!(uniform.output_gamma[0], 1.0);
        assert_eq!(uniform.with_output_gamma(0.5).output_gamma[0], 0.5);
    }
}
