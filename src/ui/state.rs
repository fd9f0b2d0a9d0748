use crate::config::{Color, SketchConfig};
use crate::sketch::{DrawState, FalloffShape};

/// Widget-side copy of the editable settings. Colors are kept as sRGB bytes
/// because that is what the egui color buttons edit.
pub struct UiState {
    pub crayon_color: [u8; 3],
    pub sky_color: [u8; 3],
    pub ground_color: [u8; 3],

    pub stroke_width: f32,
    pub falloff_shape: FalloffShape,
    pub falloff_radius: f32,

    pub vsync_enabled: bool,
    pub show_help: bool,
    pub show_stats: bool,
}

impl UiState {
    pub fn from_config(config: &SketchConfig) -> Self {
        Self {
            crayon_color: config.crayon_color.to_srgb_u8(),
            sky_color: config.sky_color.to_srgb_u8(),
            ground_color: config.ground_color.to_srgb_u8(),

            stroke_width: config.stroke_width,
            falloff_shape: config.falloff.shape,
            falloff_radius: config.falloff.radius,

            vsync_enabled: true,
            show_help: true,
            show_stats: true,
        }
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::from_config(&SketchConfig::default())
    }
}

/// Read-only numbers the panel displays each frame.
pub struct SceneStats<'a> {
    pub fps: f32,
    pub billboards: usize,
    pub draw_state: DrawState,
    pub stroke_points: usize,
    pub last_diagnostic: Option<&'a str>,
}

#[derive(Default)]
pub struct UiActions {
    pub crayon_color: Option<Color>,
    pub sky_color: Option<Color>,
    pub ground_color: Option<Color>,
    pub stroke_width: Option<f32>,
    pub falloff_changed: bool,
}
