//! Everything that touches media files through external tools or decoders.

pub mod probe;
pub mod sampler;
pub mod tools;

pub use probe::{MediaInfo, MediaProbe};
pub use sampler::{sample_offsets, SampleOutcome, SampledFrame, ScreenshotSampler};
pub use tools::{ToolError, ToolPaths, ToolRunner};
