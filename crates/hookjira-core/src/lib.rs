pub mod composer;
pub mod config;
pub mod paths;
pub mod scanner;
pub mod template;
pub mod types;

pub use composer::CommentComposer;
pub use config::{ConfigError, HookConfig};
pub use paths::HookPaths;
pub use scanner::{normalize_issue_id, ReferenceScanner};
pub use template::{render, TemplateError, TemplateVars};
pub use types::*;
