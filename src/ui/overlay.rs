use egui::{Color32, Context, RichText};

use crate::ui::theme::*;

pub struct OverlayStats {
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub normals_synthesized: bool,
    pub wireframe: bool,
    pub wireframe_supported: bool,
    pub rotation: [f32; 2],
    pub zoom_distance: f32,
    pub fps: f32,
}

pub fn draw_overlay(ctx: &Context, stats: &OverlayStats) {
    egui::Area::new(egui::Id::new("help_overlay"))
        .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(12.0, -12.0))
        .show(ctx, |ui| {
            egui::Frame::default()
                .fill(Color32::from_black_alpha(180))
                .rounding(6.0)
                .inner_margin(10.0)
                .show(ui, |ui| {
                    ui.style_mut().override_font_id =
                        Some(egui::FontId::new(11.0, egui::FontFamily::Monospace));

                    ui.label(
                        RichText::new("LMB+Drag - Rotate | Scroll - Zoom | W - Wireframe | H - Help | Esc - Quit")
                            .color(TEXT_MUTED),
                    );
                    ui.label(
                        RichText::new(format!(
                            "Vertices: {} | Triangles: {} | Normals: {}",
                            fmt_num(stats.vertex_count),
                            fmt_num(stats.triangle_count),
                            if stats.normals_synthesized { "smooth" } else { "file" }
                        ))
                        .color(TEXT_PRIMARY),
                    );
                    ui.label(
                        RichText::new(format!(
                            "Rot: ({:.0}, {:.0}) | Dist: {:.1} | {:.0} fps",
                            stats.rotation[0], stats.rotation[1], stats.zoom_distance, stats.fps
                        ))
                        .color(TEXT_MUTED),
                    );

                    let (text, color) = match (stats.wireframe, stats.wireframe_supported) {
                        (false, _) => ("Wireframe: off", TEXT_MUTED),
                        (true, true) => ("Wireframe: on", ACCENT_GREEN),
                        (true, false) => ("Wireframe: unsupported by adapter", ACCENT_ORANGE),
                    };
                    ui.label(RichText::new(text).color(color));
                });
        });
}

fn fmt_num(n: usize) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        format!("{}", n)
    }
}
