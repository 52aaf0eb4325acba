pub mod overlay;
pub mod state;
pub mod theme;

pub use overlay::{OverlayStats, draw_overlay};
pub use state::{InteractionState, KeyAction, PointerDrag, key_action};
pub use theme::apply_theme;
