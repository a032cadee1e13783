//! Capability router: the pure, deterministic tool-selection core.
//!
//! The router has no state of its own. A caller loads a [`ToolRegistry`]
//! and [`PolicyBundle`] once (validating them with [`validate`]), then
//! calls [`plan_tools`] per agent invocation. Given the same inputs it
//! always returns the same [`ToolPlan`], including the embedded
//! [`DecisionRecord`] used for audit replay.

mod env;
pub mod loader;
mod plan;
mod validate;

pub use env::{CrawlHint, RouterEnv, RouterHints};
pub use loader::load;
pub use plan::plan_tools;
pub use validate::validate;

pub use crate::domain::models::decision::{DecisionRecord, ToolPlan};
pub use crate::domain::models::policy::PolicyBundle;
pub use crate::domain::models::tool::ToolRegistry;
