use egui::{Color32, FontFamily, FontId, Rounding, Stroke, Style, TextStyle, Visuals};

pub const BG_PANEL: Color32 = Color32::from_rgb(5, 5, 7);

pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(168, 168, 171);
pub const TEXT_MUTED: Color32 = Color32::from_rgb(107, 107, 112);

pub const ACCENT_GREEN: Color32 = Color32::from_rgb(46, 172, 35);
pub const ACCENT_ORANGE: Color32 = Color32::from_rgb(172, 117, 35);

pub const BORDER_SUBTLE: Color32 = Color32::from_rgba_premultiplied(50, 51, 113, 77);

pub fn apply_theme(ctx: &egui::Context) {
    let mut style = Style::default();

    let mut visuals = Visuals::dark();
    visuals.override_text_color = Some(TEXT_PRIMARY);
    visuals.window_fill = BG_PANEL;
    visuals.panel_fill = BG_PANEL;
    visuals.window_stroke = Stroke::new(1.0, BORDER_SUBTLE);
    visuals.window_rounding = Rounding::same(6.0);
    style.visuals = visuals;

    style.spacing.item_spacing = egui::vec2(8.0, 4.0);

    style.text_styles = [
        (
            TextStyle::Small,
            FontId::new(11.0, FontFamily::Proportional),
        ),
        (TextStyle::Body, FontId::new(13.0, FontFamily::Proportional)),
        (
            TextStyle::Button,
            FontId::new(13.0, FontFamily::Proportional),
        ),
        (
            TextStyle::Heading,
            FontId::new(16.0, FontFamily::Proportional),
        ),
        (
            TextStyle::Monospace,
            FontId::new(11.0, FontFamily::Monospace),
        ),
    ]
    .into();

    ctx.set_style(style);
}
