//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, ContentArrangement, Table};
use console::{Style, Term};
use pkbridge_config::Config;
use pkbridge_events::{EventMessage, JobEvent};
use std::io;
use std::path::Path;

/// Output renderer for the report stream
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool) -> Self {
        Self {
            json_output,
            term: Term::stdout(),
        }
    }

    /// Render one report, one JSON object per line in JSON mode
    pub fn render_event(&self, message: &EventMessage) -> io::Result<()> {
        if self.json_output {
            let json = serde_json::to_string(message).map_err(io::Error::other)?;
            return self.term.write_line(&json);
        }

        let bold = Style::new().bold();
        match &message.event {
            JobEvent::StatusChanged { status } => {
                self.term
                    .write_line(&format!("{} {status}", Style::new().cyan().bold().apply_to("==>")))
            }
            JobEvent::Percentage { percent } => self.term.write_line(&format!("    {percent:>3}%")),
            JobEvent::Package {
                package_id, info, ..
            } => self
                .term
                .write_line(&format!("  {:<11} {package_id}", bold.apply_to(info))),
            JobEvent::Message { text } => {
                for line in render_markup(text).lines() {
                    self.term.write_line(&format!("  | {line}"))?;
                }
                Ok(())
            }
            JobEvent::Files { package_id, files } => {
                self.term.write_line(&format!("  files of {package_id}:"))?;
                for file in files.split(';') {
                    self.term.write_line(&format!("    {file}"))?;
                }
                Ok(())
            }
            JobEvent::Error { kind, failure } => {
                let red = Style::new().red().bold();
                self.term
                    .write_line(&format!("{} {kind}: {}", red.apply_to("error:"), failure.message))?;
                if let Some(hint) = &failure.hint {
                    self.term.write_line(&format!("  hint: {hint}"))?;
                }
                Ok(())
            }
            JobEvent::Finished { success } => {
                let (style, text) = if *success {
                    (Style::new().green().bold(), "finished")
                } else {
                    (Style::new().yellow().bold(), "finished without success")
                };
                self.term.write_line(&style.apply_to(text).to_string())
            }
            JobEvent::SubPercentage { .. } | JobEvent::AllowCancel { .. } => Ok(()),
        }
    }

    /// Show the effective configuration
    pub fn render_config(&self, config: &Config, source: Option<&Path>) -> io::Result<()> {
        if self.json_output {
            let json = serde_json::json!({
                "valid": true,
                "source": source.map(|path| path.display().to_string()),
                "config": config,
            });
            let text = serde_json::to_string_pretty(&json).map_err(io::Error::other)?;
            return self.term.write_line(&text);
        }

        let transaction = &config.transaction;
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Setting").add_attribute(Attribute::Bold),
                Cell::new("Value").add_attribute(Attribute::Bold),
            ]);
        table.add_row(vec![
            "source".to_string(),
            source.map_or_else(|| "defaults".to_string(), |p| p.display().to_string()),
        ]);
        table.add_row(vec!["log_level".to_string(), config.general.log_level.clone()]);
        table.add_row(vec![
            "xfer_command".to_string(),
            transaction
                .xfer_command
                .clone()
                .unwrap_or_else(|| "(built-in)".to_string()),
        ]);
        table.add_row(vec!["use_delta".to_string(), transaction.use_delta.to_string()]);
        table.add_row(vec![
            "hold_packages".to_string(),
            transaction.hold_packages.join(" "),
        ]);
        table.add_row(vec![
            "log_file".to_string(),
            transaction.log_file.display().to_string(),
        ]);
        table.add_row(vec![
            "cache_dir".to_string(),
            transaction.cache_dir.display().to_string(),
        ]);
        table.add_row(vec!["log_prefix".to_string(), transaction.log_prefix.clone()]);

        self.term.write_line(&table.to_string())?;
        self.term
            .write_line(&Style::new().green().apply_to("configuration is valid").to_string())
    }

    /// Report a file fetched by the external command
    pub fn render_fetched(&self, path: &Path) -> io::Result<()> {
        if self.json_output {
            let json = serde_json::json!({ "fetched": path.display().to_string() });
            return self.term.write_line(&json.to_string());
        }
        self.term.write_line(&format!("fetched {}", path.display()))
    }
}

/// Turn the `<b>NAME</b>` header of package output into terminal bold
fn render_markup(text: &str) -> String {
    let bold = Style::new().bold();
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<b>") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 3..];
        match after.find("</b>") {
            Some(end) => {
                out.push_str(&bold.apply_to(&after[..end]).to_string());
                rest = &after[end + 4..];
            }
            None => {
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
