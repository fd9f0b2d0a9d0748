pub mod billboard;
pub mod session;
pub mod stroke;
pub mod terrain;
pub mod view;

pub use session::{DrawState, Sketcher, StrokeOutcome};
pub use terrain::{DeformOutcome, FalloffKernel, FalloffShape};
pub use view::{SceneNode, ViewCamera};
