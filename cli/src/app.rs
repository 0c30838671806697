//! Application context: unified state passed to the command handler.
//!
//! Adding a new cross-cutting concern (e.g. `--verbose`) requires only one
//! field change here.

use std::path::PathBuf;

use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::assets::EmbeddedAssets;
use crate::infra::config::YamlConfigStore;
use crate::infra::system::HostSystem;
use crate::output::OutputContext;
use crate::output::human::HumanRenderer;
use crate::output::reporter::TerminalReporter;

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
    /// Explicit configuration file.
    pub config: Option<PathBuf>,
}

/// Unified application context passed to the command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Host adapter for every system port.
    pub system: HostSystem<TokioCommandRunner>,
    /// Compiled-in X11 configuration files.
    pub assets: EmbeddedAssets,
    /// Configuration loader.
    pub config_store: YamlConfigStore,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// JSON mode implies quiet terminal output so stdout carries only JSON.
    #[must_use]
    pub fn new(flags: &AppFlags) -> Self {
        let mode = if flags.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        let quiet = flags.quiet || flags.json;

        Self {
            output: OutputContext::new(flags.no_color, quiet),
            mode,
            system: HostSystem::default_runner(quiet),
            assets: EmbeddedAssets,
            config_store: YamlConfigStore::new(flags.config.clone()),
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Progress reporter bound to this context's output.
    #[must_use]
    pub fn terminal_reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    /// Human renderer bound to this context's output.
    #[must_use]
    pub fn renderer(&self) -> HumanRenderer<'_> {
        HumanRenderer::new(&self.output)
    }
}
