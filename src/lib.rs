pub mod format;
pub mod pixel;
pub mod codec;
pub mod container;
pub mod script;
pub mod image_io;
pub mod report;
pub mod driver;
pub mod relocate;

pub use format::FormatTag;
pub use pixel::{PixelBuffer, PixelLayout};
pub use codec::{decode, encode, CodecError};
pub use container::{ContainerImage, ContainerWriter};
pub use script::{parse_script, PlacementRecord};
pub use report::{BatchReport, Outcome};
pub use driver::{extract, inject, ExtractOptions, InjectOptions};
