use glam::Vec3;

/// Fixed viewer tunables. Nothing here is read from disk or the environment.
pub struct ViewerSettings {
    pub window_title: &'static str,
    pub window_size: (u32, u32),

    /// Vertical field of view, degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,

    pub light_dir: Vec3,
    pub material_color: Vec3,
    pub clear_color: wgpu::Color,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            window_title: "OBJ Viewer",
            window_size: (1200, 800),

            fov: 45.0,
            near: 0.1,
            far: 100.0,

            light_dir: Vec3::ONE.normalize(),
            material_color: Vec3::new(0.9, 0.9, 0.95),
            // linear value of a 0.15 sRGB gray
            clear_color: wgpu::Color {
                r: 0.0194,
                g: 0.0194,
                b: 0.0194,
                a: 1.0,
            },
        }
    }
}
