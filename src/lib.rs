pub mod border;
pub mod cli;
pub mod codec;
pub mod enhance;
pub mod error;
pub mod geometry;
pub mod pdf;
pub mod pipeline;
pub mod transform;

pub use border::add_border;
pub use cli::Cli;
pub use enhance::{enhance, EnhancementParams};
pub use error::{Result, ScanError};
pub use geometry::{order_corners, OrderedQuad, Point2D, Quadrilateral};
pub use pipeline::{scan, ScanOptions};
pub use transform::rectify;
