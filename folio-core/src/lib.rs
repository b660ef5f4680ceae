pub mod assets;
pub mod behavior;
pub mod builder;
pub mod client;
pub mod config;
pub mod dom;
pub mod form;
pub mod loader;
pub mod notify;
pub mod page;
pub mod renderer;
pub mod site;
pub mod template;

// Re-export main types
pub use builder::{BuildError, Page, PageBuilder, build_site};
pub use dom::{Document, NodeId};
pub use loader::{ContentSource, FileSource, LoadError, StaticSource};
pub use page::{Outcome, PageController, PageEvent};
pub use renderer::{RenderError, Renderer};
pub use site::Site;
pub use template::{TemplateError, TemplateRenderer};
