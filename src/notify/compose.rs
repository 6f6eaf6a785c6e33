use chrono::NaiveDate;
use log::warn;
use serde::Deserialize;

use super::blocks::{Block, Message};
use crate::aggregate::AreaAggregate;
use crate::status::BuildOutcome;

const GLYPH_ALL_CLEAR: &str = "🟢";
const GLYPH_FAILED: &str = "🔴";
const GLYPH_PENDING: &str = "🟠";

/// Per-area classification result the messages are built from.
#[derive(Debug, Default)]
pub struct AreaAnalysis {
    pub success: usize,
    pub failed: usize,
    pub pending: usize,
    pub failed_repos: Vec<FailedRepo>,
    pub pending_repos: Vec<PendingRepo>,
}

#[derive(Debug)]
pub struct FailedRepo {
    pub repo: String,
    pub author: String,
    pub pipeline_url: String,
    pub job_url: String,
}

#[derive(Debug)]
pub struct PendingRepo {
    pub repo: String,
    pub pipelines_url: String,
}

/// Classify an area's repositories and collect the link material for the
/// failed and pending sections.
pub fn analyze_area(aggregate: &AreaAggregate, gitlab_base: &str) -> AreaAnalysis {
    let mut analysis = AreaAnalysis::default();

    for entry in &aggregate.repos {
        let status = &entry.build_status;
        match entry.outcome() {
            BuildOutcome::Success => analysis.success += 1,
            BuildOutcome::Failed => {
                analysis.failed += 1;

                let pipeline_url = if !status.full_path.is_empty() && !status.pipeline_id.is_empty()
                {
                    format!(
                        "{gitlab_base}/{}/-/pipelines/{}",
                        status.full_path, status.pipeline_id
                    )
                } else {
                    String::new()
                };
                let job_url = if status.failed_job.is_empty() {
                    String::new()
                } else {
                    format!("{gitlab_base}{}", status.failed_job)
                };

                analysis.failed_repos.push(FailedRepo {
                    repo: entry.repo.clone(),
                    author: status.commit.author.clone(),
                    pipeline_url,
                    job_url,
                });
            }
            BuildOutcome::Pending => {
                analysis.pending += 1;

                let path = if status.full_path.is_empty() {
                    entry.repo.as_str()
                } else {
                    status.full_path.as_str()
                };
                analysis.pending_repos.push(PendingRepo {
                    repo: entry.repo.clone(),
                    pipelines_url: format!("{gitlab_base}/{path}/-/pipelines"),
                });
            }
        }
    }

    analysis
}

/// One glyph per non-success repository, failed before pending, with a
/// distinct all-clear glyph when everything succeeds.
pub fn emoji_line(analysis: &AreaAnalysis) -> String {
    let mut glyphs: Vec<&str> = Vec::new();
    if analysis.success > 0 && analysis.failed == 0 && analysis.pending == 0 {
        glyphs.push(GLYPH_ALL_CLEAR);
    }
    glyphs.extend(std::iter::repeat(GLYPH_FAILED).take(analysis.failed));
    glyphs.extend(std::iter::repeat(GLYPH_PENDING).take(analysis.pending));
    glyphs.join(" ")
}

/// Header message announcing the reporting date.
pub fn header_message(date: NaiveDate) -> Message {
    Message::new(vec![Block::header(format!(
        "Build Status - {}",
        date.format("%d.%m.%Y")
    ))])
}

/// Summary message for one area.
pub fn area_message(area_name: &str, analysis: &AreaAnalysis) -> Message {
    let title = capitalize(area_name);
    let mut blocks = vec![Block::section(format!(
        "*{title}:* {}",
        emoji_line(analysis)
    ))];

    if analysis.failed == 0 && analysis.pending == 0 && analysis.success > 0 {
        blocks.push(Block::section("🎉 All repositories passing!"));
        return Message::new(blocks);
    }

    if !analysis.failed_repos.is_empty() {
        let mut section = String::new();
        for failed in &analysis.failed_repos {
            let mut failure_info = format!("<{}|Pipeline>", failed.pipeline_url);
            if !failed.job_url.is_empty() {
                failure_info.push_str(&format!(" | <{}|Job>", failed.job_url));
            }
            section.push_str(&format!("- *{}* - {failure_info}\n", failed.repo));
            if !failed.author.is_empty() {
                section.push_str(&format!(
                    "    _maybe {} knows something about their recent change_\n\n",
                    failed.author
                ));
            }
        }
        blocks.push(Block::section(format!("*Failed Repositories:*\n\n{section}")));
    }

    if !analysis.pending_repos.is_empty() {
        let section: String = analysis
            .pending_repos
            .iter()
            .map(|pending| {
                format!(
                    "- *{}* - <{}|Pipelines overview>\n",
                    pending.repo, pending.pipelines_url
                )
            })
            .collect();
        blocks.push(Block::section(format!(
            "*Pending Repositories:*\n\n{section}"
        )));
    }

    Message::new(blocks)
}

#[derive(Debug, Deserialize)]
struct MoodJoke {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    joke: Option<String>,
    #[serde(default)]
    setup: Option<String>,
    #[serde(default)]
    delivery: Option<String>,
}

fn mood_message(joke: &MoodJoke) -> Message {
    let mut blocks = vec![Block::Divider];
    if joke.kind == "single" {
        if let Some(text) = &joke.joke {
            blocks.push(Block::section(text.clone()));
        }
    } else {
        if let Some(setup) = &joke.setup {
            blocks.push(Block::section(setup.clone()));
        }
        if let Some(delivery) = &joke.delivery {
            blocks.push(Block::section(delivery.clone()));
        }
    }
    Message::new(blocks)
}

/// Fetch the optional closing mood message. Failures skip the message; the
/// area summaries have already been delivered at this point.
pub async fn fetch_mood_message(client: &reqwest::Client, url: &str) -> Option<Message> {
    match client.get(url).send().await {
        Ok(response) => match response.json::<MoodJoke>().await {
            Ok(joke) => Some(mood_message(&joke)),
            Err(e) => {
                warn!("Mood message response unreadable: {e}");
                None
            }
        },
        Err(e) => {
            warn!("Mood message fetch failed: {e}");
            None
        }
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
