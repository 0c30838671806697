//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;

use crate::domain::ProvisionSummary;
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the end-of-run summary.
    ///
    /// The tunnel URL is printed even in quiet mode; it is the one thing a
    /// caller cannot get anywhere else.
    pub fn render_summary(&self, summary: &ProvisionSummary) {
        if self.ctx.quiet {
            println!("{}", summary.tunnel_url);
            return;
        }

        println!();
        self.ctx.header("Streaming host ready");
        self.ctx.kv(
            "Tunnel:     ",
            &summary.tunnel_url.style(self.ctx.styles.url).to_string(),
        );
        self.ctx.kv("Web UI:     ", &summary.web_ui_url);
        self.ctx.kv(
            "Sunshine:   ",
            &format!("pid {} ({})", summary.streaming_pid, launch_mode_display(summary)),
        );
        self.ctx.kv("Logs:       ", &summary.log_dir.display().to_string());
        self.ctx.kv("Tunnel log: ", &summary.tunnel_log.display().to_string());

        println!();
        self.ctx.header("Next steps:");
        for (i, step) in summary.next_steps().iter().enumerate() {
            self.ctx.info(&format!("{}. {step}", i + 1));
        }
    }
}

fn launch_mode_display(summary: &ProvisionSummary) -> &'static str {
    match summary.launch_mode {
        crate::domain::LaunchMode::Session => "tmux session 'sunshine'",
        crate::domain::LaunchMode::Direct => "direct background launch",
    }
}
