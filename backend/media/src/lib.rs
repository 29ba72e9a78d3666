//! Capture tool orchestration: locating the tool, recording clips,
//! extracting thumbnails, and owning the temp files in between.

pub mod capture;
pub mod process;
pub mod temp;
pub mod thumbnail;
pub mod tool;

pub use capture::{capture_args, require_source, CaptureOrchestrator, EncodingProfile, LocalClip};
pub use process::{run_tool, ToolOutput};
pub use temp::TempArtifacts;
pub use thumbnail::{LocalThumbnail, ThumbnailExtractor};
pub use tool::{install_hint, parse_version, tool_version, ToolLocator, ToolStatus, DEFAULT_TOOL};
