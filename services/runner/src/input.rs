//! Task input assembly from config lists, text files and a picture directory

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use orchestrator::{PollTarget, Selection, TaskInput};
use tracing::info;

use crate::config::InputConfig;
use crate::error::{Error, Result};

const PICTURE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Non-empty, trimmed lines of a text file.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path).map_err(|source| Error::Input {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Base64-encode every image in `dir`, ordered by file name.
pub fn load_pictures(dir: &Path) -> Result<Vec<String>> {
    let io_err = |source| Error::Input {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .map_err(io_err)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    PICTURE_EXTENSIONS
                        .iter()
                        .any(|known| known.eq_ignore_ascii_case(ext))
                })
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(Error::NoPictures(dir.to_path_buf()));
    }

    let mut pictures = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = std::fs::read(&path).map_err(|source| Error::Input {
            path: path.clone(),
            source,
        })?;
        pictures.push(STANDARD.encode(bytes));
    }
    info!(dir = %dir.display(), pictures = pictures.len(), "loaded pictures");
    Ok(pictures)
}

/// Build the orchestrator's task input from the `[input]` section.
///
/// File-backed lists are appended after the inline entries.
pub fn build_task_input(input: &InputConfig) -> Result<TaskInput> {
    let mut tweets = input.tweets.clone();
    if let Some(path) = &input.tweets_file {
        tweets.extend(read_lines(path)?);
    }
    let mut comments = input.comments.clone();
    if let Some(path) = &input.comments_file {
        comments.extend(read_lines(path)?);
    }
    let pictures = match &input.pictures_dir {
        Some(dir) => load_pictures(dir)?,
        None => Vec::new(),
    };

    let poll = match (&input.poll_choice, input.poll_links.is_empty()) {
        (None, true) => None,
        (choice, _) => Some(PollTarget {
            links: input.poll_links.clone(),
            choice: choice.clone().unwrap_or_default(),
        }),
    };

    Ok(TaskInput {
        follow_targets: usernames(&input.follow_targets),
        unfollow_targets: usernames(&input.unfollow_targets),
        like_links: input.like_links.clone(),
        retweet_links: input.retweet_links.clone(),
        quote_tweet_links: input.quote_tweet_links.clone(),
        comment_links: input.comment_links.clone(),
        poll,
        tweets,
        comments,
        pictures,
        names: input.names.clone(),
        bios: input.bios.clone(),
        locations: input.locations.clone(),
        selection: selection(input.random_texts),
        picture_selection: selection(input.random_pictures),
    })
}

fn selection(random: bool) -> Selection {
    if random {
        Selection::Random
    } else {
        Selection::Indexed
    }
}

// Targets are often pasted as `@handle`.
fn usernames(list: &[String]) -> Vec<String> {
    list.iter()
        .map(|name| name.trim().trim_start_matches('@').to_string())
        .filter(|name| !name.is_empty())
        .collect()
}
