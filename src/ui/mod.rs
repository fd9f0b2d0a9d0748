pub mod panels;
pub mod state;
pub mod theme;

pub use panels::{draw_help_overlay, draw_side_panel};
pub use state::{SceneStats, UiActions, UiState};
pub use theme::apply_theme;
