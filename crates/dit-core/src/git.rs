//! Repository author listing, used to suggest assignees and ranking authors.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};

/// List the authors of the repository at `repo` as `Name <email>`, most
/// commits first.
///
/// # Errors
///
/// Fails if `git` cannot be spawned or exits unsuccessfully.
pub fn authors(repo: &Path) -> Result<Vec<String>> {
    let output = Command::new("git")
        .args(["shortlog", "-sen", "--all", "--no-merges"])
        .current_dir(repo)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .context("Failed to spawn git shortlog")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("git shortlog failed: {}", stderr.trim());
    }

    let stdout = String::from_utf8(output.stdout).context("Invalid UTF-8 from git shortlog")?;
    let authors = parse_shortlog(&stdout);
    tracing::debug!(count = authors.len(), repo = %repo.display(), "listed authors");
    Ok(authors)
}

/// Parse `git shortlog -sen` output (`<count>\t<Name> <email>` per line).
///
/// Lines without a leading count are ignored. Order is preserved, which for
/// `-n` means descending commit count.
#[must_use]
pub fn parse_shortlog(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let (count, author) = line.trim_start().split_once('\t')?;
            count.trim().parse::<u64>().ok()?;
            let author = author.trim();
            (!author.is_empty()).then(|| author.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_shortlog;

    #[test]
    fn parses_counted_lines_in_order() {
        let out = "   42\tAda Lovelace <ada@example.com>\n     7\tGrace Hopper <grace@example.com>\n";
        assert_eq!(
            parse_shortlog(out),
            vec![
                "Ada Lovelace <ada@example.com>",
                "Grace Hopper <grace@example.com>"
            ]
        );
    }

    #[test]
    fn ignores_noise() {
        let out = "\nnot a count\tSomeone <s@example.com>\n   3\t   \n   1\tBot <bot@example.com>";
        assert_eq!(parse_shortlog(out), vec!["Bot <bot@example.com>"]);
    }

    #[test]
    fn empty_output_has_no_authors() {
        assert!(parse_shortlog("").is_empty());
    }
}
