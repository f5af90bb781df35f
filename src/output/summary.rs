use std::fmt::Write;

use comfy_table::Cell;

use crate::deploy::NotifyAction;
use crate::model::short_sha;
use crate::pipeline::RunReport;

use super::styling::{bright, bright_green, bright_yellow, cyan, dim};
use super::tables::{action_cell, create_table, cyan_header};

/// Prints a human-readable summary of a finished run to stdout.
pub fn print_summary(report: &RunReport) {
    println!("{}", render_summary(report));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn render_summary(report: &RunReport) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📦", "Deploy");

    let previous_deploy = if report.range.truncated {
        bright_yellow(format!(
            "{} (outside the checked window)",
            short_sha(&report.range.last_deploy_sha)
        ))
    } else {
        cyan(short_sha(&report.range.last_deploy_sha))
    };

    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n",
        dim("Previous deploy:"),
        previous_deploy,
        dim("Commits shipped:"),
        bright_yellow(report.range.commits.len()),
        dim("Pull requests:"),
        bright_yellow(report.pull_requests.len()),
    );

    if report.pull_requests.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No merged pull requests found."));
        return output;
    }

    let title = if report.dry_run {
        "Linear issues (dry run)"
    } else {
        "Linear issues"
    };
    add_section_header(&mut output, "🔗", title);

    let mut table = create_table();
    table.set_header(cyan_header(&["Pull request", "Title", "Issue", "Action"]));

    for pull_request in &report.pull_requests {
        let outcomes: Vec<_> = report
            .notifications
            .iter()
            .filter(|outcome| outcome.pull_request_url == pull_request.url)
            .collect();

        if outcomes.is_empty() {
            table.add_row(vec![
                Cell::new(&pull_request.url),
                Cell::new(&pull_request.title),
                Cell::new("-"),
                Cell::new("no linked issue"),
            ]);
            continue;
        }

        for outcome in outcomes {
            table.add_row(vec![
                Cell::new(&pull_request.url),
                Cell::new(&pull_request.title),
                Cell::new(&outcome.issue_identifier),
                action_cell(outcome.action),
            ]);
        }
    }

    let _ = writeln!(output, "{table}");

    let (action, label) = if report.dry_run {
        (NotifyAction::WouldCreate, "Issues that would be notified:")
    } else {
        (NotifyAction::Created, "Issues notified:")
    };
    let notified = report
        .notifications
        .iter()
        .filter(|outcome| outcome.action == action)
        .count();
    let _ = writeln!(output, "\n  {} {}", dim(label), bright_green(notified));

    output
}
