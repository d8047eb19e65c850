//! Terminal UI rendering using ratatui.
//!
//! Each view is implemented in its own submodule with a `render` function.
//!
//! ## Submodules
//!
//! - [`login`]: Login form shown until a user is authenticated
//! - [`overview`]: Latest batch with gauges, quality score and batch trend
//! - [`analytics`]: Problem machines and the per-batch quality map
//! - [`compare`]: Plastification draw and forming speed comparisons
//! - [`machines`]: Per-machine history with trend indicators
//! - [`detail`]: Modal overlay with one machine's last batches
//! - [`admin`]: Visit statistics for administrators
//! - [`common`]: Shared components (header, tabs, status bar, help overlay)
//! - [`theme`]: Light/dark theme support with terminal auto-detection
//!
//! ## Rendering Architecture
//!
//! The main loop in `main.rs` renders the login form until a session
//! exists, then calls into these modules based on the current view:
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header (common::render_header)       │
//! ├──────────────────────────────────────┤
//! │ Tabs (common::render_tabs)           │
//! ├──────────────────────────────────────┤
//! │                                      │
//! │ View Content                         │
//! │ (overview/analytics/compare/         │
//! │  machines/admin::render)             │
//! │                                      │
//! ├──────────────────────────────────────┤
//! │ Status Bar (common::render_status)   │
//! └──────────────────────────────────────┘
//!         ↑
//!    Overlays rendered on top:
//!    - detail::render_overlay
//!    - common::render_help
//! ```

pub mod admin;
pub mod analytics;
pub mod common;
pub mod compare;
pub mod detail;
pub mod login;
pub mod machines;
pub mod overview;
pub mod theme;

pub use theme::Theme;
