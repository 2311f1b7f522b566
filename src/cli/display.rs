use console::{Style, style};
use indicatif::{ProgressBar, ProgressStyle};

use crate::case::CaseStatus;
use crate::orchestrator::VerificationReport;
use crate::scoring::{MAX_SCORE, SCAM_THRESHOLD, SUSPICIOUS_THRESHOLD, Verdict};
use crate::stats::CaseStatistics;
use crate::store::CaseRecord;

pub struct Display;

impl Display {
    pub fn new() -> Self {
        Self
    }

    pub fn print_header(&self, text: &str) {
        println!();
        println!("{}", style(text).bold().cyan());
        println!("{}", style("═".repeat(60)).dim());
        println!();
    }

    pub fn print_report(&self, report: &VerificationReport) {
        self.print_header(&format!("Case: {}", report.case_id));

        let verdict_style = self.verdict_style(report.verdict);
        println!(
            "Verdict:  {}",
            verdict_style.apply_to(report.verdict.as_str())
        );
        println!(
            "Score:    {} {}/{}",
            self.score_bar(report.risk_score, 30),
            report.risk_score,
            MAX_SCORE
        );
        println!();
        println!("{}", report.summary);
        println!();

        if !report.risk_factors.is_empty() {
            println!("{}", style("Risk Factors:").bold());
            for factor in &report.risk_factors {
                println!("  {} {}", style("!").yellow(), factor);
            }
            println!();
        }

        if !report.entities.is_empty() {
            println!("{}", style("Entities:").bold());
            for entity in &report.entities {
                let marker = if entity.is_flagged {
                    style("✗").red().bold()
                } else {
                    style("✓").green()
                };
                println!(
                    "  {} {} {}",
                    marker,
                    style(&entity.kind).dim(),
                    style(&entity.value).bold()
                );
                println!("      {}", style(&entity.verification_status).dim());
            }
            println!();
        }

        println!("{}", style("Recommendations:").bold());
        for rec in &report.recommendations {
            println!("  {} {}", style("→").cyan(), rec);
        }

        if !report.sources.is_empty() {
            println!();
            println!("{}", style("Sources:").bold());
            for source in &report.sources {
                println!("  {} {}", source.title, style(&source.uri).dim().underlined());
            }
        }

        println!();
        println!(
            "{}",
            style(format!(
                "{} evidence items, {} narrative, {}ms",
                report.evidence_count, report.narrative_tier, report.elapsed_ms
            ))
            .dim()
        );
    }

    /// Cases that never reached a verdict.
    pub fn print_case_detail(&self, record: &CaseRecord) {
        self.print_header(&format!("Case: {}", record.case_id));

        println!(
            "Status:      {}",
            self.status_style(record.status)
                .apply_to(record.status.as_str())
        );
        println!("Identifiers: {}", record.identifiers.len());
        for identifier in &record.identifiers {
            println!("  {} {}", style("-").dim(), identifier);
        }
        println!("Evidence:    {}", record.evidence.len());

        if let Some(reason) = &record.failure_reason {
            println!();
            println!("{} {}", style("Failure:").red().bold(), reason);
        }

        println!();
        println!(
            "{}",
            style(format!(
                "Created: {}",
                record.created_at.format("%Y-%m-%d %H:%M:%S")
            ))
            .dim()
        );
        if let Some(completed) = record.completed_at {
            println!(
                "{}",
                style(format!("Closed:  {}", completed.format("%Y-%m-%d %H:%M:%S"))).dim()
            );
        }
    }

    pub fn print_cases_table(&self, records: &[CaseRecord]) {
        if records.is_empty() {
            println!("{}", style("No cases found.").dim());
            return;
        }

        println!(
            "{:<14} {:<20} {:<14} {:<12} {:>6}",
            style("ID").bold(),
            style("Created").bold(),
            style("Status").bold(),
            style("Verdict").bold(),
            style("Score").bold()
        );
        println!("{}", style("─".repeat(70)).dim());

        for record in records {
            let verdict = match record.verdict {
                Some(v) => self.verdict_style(v).apply_to(v.as_str()).to_string(),
                None => style("-").dim().to_string(),
            };
            let score = record
                .risk_score
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());

            println!(
                "{:<14} {:<20} {:<14} {:<12} {:>6}",
                record.case_id.as_str(),
                record.created_at.format("%Y-%m-%d %H:%M"),
                self.status_style(record.status)
                    .apply_to(record.status.as_str()),
                verdict,
                score
            );
        }
    }

    pub fn print_statistics(&self, stats: &CaseStatistics) {
        self.print_header("Verification Statistics");
        println!("Monitored:  {}", style(stats.monitored).bold());
        println!("Debunked:   {}", style(stats.debunked).red().bold());
        println!("Suspicious: {}", style(stats.suspicious).yellow());
        println!("Safe:       {}", style(stats.safe).green());
        if stats.failed > 0 {
            println!("Failed:     {}", style(stats.failed).red());
        }
        if stats.investigating > 0 {
            println!("Open:       {}", style(stats.investigating).dim());
        }
        println!();
        println!(
            "{}",
            style(format!("Debunk rate: {:.0}%", stats.debunk_rate() * 100.0)).dim()
        );
    }

    pub fn print_success(&self, message: &str) {
        println!("{} {}", style("✓").green().bold(), message);
    }

    pub fn print_error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red().bold(), message);
    }

    pub fn print_warning(&self, message: &str) {
        println!("{} {}", style("!").yellow().bold(), message);
    }

    pub fn print_info(&self, message: &str) {
        println!("{} {}", style("→").cyan(), message);
    }

    pub fn create_spinner(&self, message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(spinner.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        pb
    }

    fn verdict_style(&self, verdict: Verdict) -> Style {
        match verdict {
            Verdict::Safe => Style::new().green().bold(),
            Verdict::Suspicious => Style::new().yellow().bold(),
            Verdict::Scam => Style::new().red().bold().underlined(),
        }
    }

    fn status_style(&self, status: CaseStatus) -> Style {
        match status {
            CaseStatus::Investigating => Style::new().yellow(),
            CaseStatus::Completed => Style::new().green(),
            CaseStatus::Failed => Style::new().red().bold(),
        }
    }

    fn score_bar(&self, score: u32, width: usize) -> String {
        let filled = (width as f64 * score.min(MAX_SCORE) as f64 / MAX_SCORE as f64) as usize;
        let empty = width - filled;
        let bar = style("█".repeat(filled));
        let bar = if score >= SCAM_THRESHOLD {
            bar.red()
        } else if score >= SUSPICIOUS_THRESHOLD {
            bar.yellow()
        } else {
            bar.green()
        };
        format!("{}{}", bar, style("░".repeat(empty)).dim())
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}
