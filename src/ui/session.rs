use std::fmt::Write;

use crate::onboard::{Message, SessionView, StepResult};

/// Stepper glyph for a step's state
pub fn step_marker(result: StepResult) -> char {
    match result {
        StepResult::Completed => '✓',
        StepResult::Pending => '●',
        StepResult::Locked => '○',
    }
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() { "-" } else { value }
}

pub fn render_session(view: &SessionView<'_>) -> String {
    let mut out = String::new();

    // Header: stepper and save status
    let stepper: Vec<String> = view
        .steps
        .iter()
        .map(|(step, result)| format!("{} {}", step_marker(*result), step.short_name()))
        .collect();
    let _ = writeln!(out, "{}", stepper.join("  "));

    let status = if view.loading {
        "Loading...".to_string()
    } else if view.saving {
        "Saving...".to_string()
    } else if let Some(at) = &view.last_saved_display {
        format!("Last saved {at}")
    } else {
        "Not saved yet".to_string()
    };
    let _ = writeln!(out, "{status}");

    if let Some(error) = view.error {
        let _ = writeln!(out, "[error] {error}");
    }
    if view.is_completed {
        let _ = writeln!(out, "Onboarding completed.");
    }

    let draft = view.draft;
    let _ = writeln!(out);
    let _ = writeln!(out, "Name:    {}", or_dash(&draft.full_name));
    let _ = writeln!(out, "Email:   {}", or_dash(&draft.email));
    let _ = writeln!(out, "Summary: {}", or_dash(&draft.summary));

    let _ = writeln!(out, "Experience:");
    if draft.experiences.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for (i, exp) in draft.experiences.iter().enumerate() {
        let start = exp
            .start_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "?".to_string());
        let end = if exp.is_current {
            "present".to_string()
        } else {
            exp.end_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "?".to_string())
        };
        let _ = writeln!(
            out,
            "  [{i}] {} at {} ({start} to {end})",
            or_dash(&exp.job_title),
            or_dash(&exp.company)
        );
        if !exp.description.trim().is_empty() {
            let _ = writeln!(out, "      {}", exp.description.trim());
        }
    }

    let skills = if draft.skills.is_empty() {
        "(none)".to_string()
    } else {
        draft.skills.join(", ")
    };
    let _ = writeln!(out, "Skills:  {skills}");

    if !draft.educations.is_empty() {
        let _ = writeln!(out, "Education:");
        for edu in &draft.educations {
            let _ = writeln!(out, "  {} - {}", or_dash(&edu.degree), or_dash(&edu.institution));
        }
    }

    if view.step.is_last() && !view.is_completed {
        let hint = if view.can_finish {
            "Ready to finish."
        } else {
            "Add a name and at least one experience or skill to finish."
        };
        let _ = writeln!(out);
        let _ = writeln!(out, "{hint}");
    }

    out
}

pub fn render_message(message: &Message) -> String {
    if message.is_error {
        format!("[error] {}", message.text)
    } else {
        format!("[info] {}", message.text)
    }
}
