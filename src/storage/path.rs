//! Destination paths for saved screenshots.

use super::types::{CompositedArtifact, ComputedPath, SaveOptions};
use crate::capture::filename::{extract_domain, generate_filename};

/// Relative destination of `artifact` below the download directory.
///
/// Layout: `{root}[/{yyyy}/{MM}-{MonthName}/by-domain/{domain}]/{filename}`.
/// A custom path replaces the whole folder and a filename override replaces
/// the generated name. Pure and deterministic.
pub fn compute_path(artifact: &CompositedArtifact, options: &SaveOptions) -> ComputedPath {
    let filename = options
        .filename
        .as_deref()
        .map(sanitize_filename)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| {
            generate_filename(
                &artifact.source_url,
                artifact.timestamp,
                artifact.annotation_text.as_deref(),
                artifact.transcription_text.as_deref(),
                artifact.format,
            )
        });

    let folder = match options
        .custom_path
        .as_deref()
        .map(normalize_folder)
        .filter(|path| !path.is_empty())
    {
        Some(custom) => custom,
        None => {
            let mut segments = vec![normalize_folder(&options.root_folder)];
            if options.organize_by_month {
                segments.push(artifact.timestamp.format("%Y").to_string());
                segments.push(artifact.timestamp.format("%m-%B").to_string());
                segments.push("by-domain".to_string());
                segments.push(sanitize_segment(&extract_domain(&artifact.source_url)));
            }
            segments.retain(|segment| !segment.is_empty());
            segments.join("/")
        }
    };

    let full_path = if folder.is_empty() {
        filename.clone()
    } else {
        format!("{folder}/{filename}")
    };

    ComputedPath {
        full_path,
        filename,
    }
}

/// Splits on `/` or `\`, drops empty, `.` and `..` segments, and sanitizes
/// what remains.
fn normalize_folder(path: &str) -> String {
    path.split(['/', '\\'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .map(sanitize_segment)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' | '/' | '\\' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect::<String>()
        .trim_matches(['.', ' '])
        .to_string()
}

fn sanitize_filename(name: &str) -> String {
    sanitize_segment(name.rsplit(['/', '\\']).next().unwrap_or_default())
}
