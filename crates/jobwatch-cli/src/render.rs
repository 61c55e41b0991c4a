use jobwatch_api::{JobResult, JobStatus, STATUS_SUCCEEDED};
use jobwatch_stream::StreamState;

/// Line to print for a snapshot change, if the visible progress moved.
pub fn progress_line(previous: &StreamState, current: &StreamState) -> Option<String> {
    if current.step.is_empty() {
        return None;
    }
    if current.step == previous.step && current.detail == previous.detail {
        return None;
    }
    Some(if current.detail.is_empty() {
        format!("[{}]", current.step)
    } else {
        format!("[{}] {}", current.step, current.detail)
    })
}

pub fn final_line(state: &StreamState) -> String {
    if state.done {
        format!("finished: {}", state.status)
    } else {
        "stopped before the job finished".to_string()
    }
}

pub fn succeeded(state: &StreamState) -> bool {
    state.done && state.status == STATUS_SUCCEEDED
}

pub fn status_summary(job: &JobStatus) -> String {
    let mut out = format!("{} {} ({})", job.id, job.status, job.job_type);
    if let Some(progress) = job.progress.as_ref() {
        let step = progress.get("current_step").and_then(|v| v.as_str());
        let detail = progress.get("detail").and_then(|v| v.as_str());
        if let Some(step) = step {
            out.push_str(&format!("\n  step: {step}"));
            if let Some(detail) = detail.filter(|d| !d.is_empty()) {
                out.push_str(&format!(" - {detail}"));
            }
        }
    }
    if let Some(message) = job.error_message() {
        out.push_str(&format!("\n  error: {message}"));
    }
    out
}

pub fn result_markdown(result: &JobResult) -> String {
    let mut out = String::new();
    if !result.themes.is_empty() {
        out.push_str(&format!("Themes: {}\n\n", result.themes.join(", ")));
    }
    out.push_str(&result.essay_markdown);
    if !result.book_summary.trim().is_empty() {
        out.push_str("\n\n## Book summary\n\n");
        out.push_str(&result.book_summary);
    }
    out
}
