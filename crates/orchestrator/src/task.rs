//! Task selection, task input and typed actions
//!
//! A run selects an ordered list of `TaskKind`s. Before dispatch the
//! `TaskInput` is validated against that selection and the number of accounts,
//! so workers never index past the end of an input list. Each worker then
//! resolves a `TaskKind` into an `Action` carrying the concrete payload for its
//! account and performs it step by step (one step per target link/username).

use std::fmt;
use std::str::FromStr;

use account_client::{AccountClient, ActionResult, ProfileField, TweetOptions};
use rand::RngExt;
use serde::Deserialize;

use crate::error::{Error, Result};

/// One selectable task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum TaskKind {
    /// No-op: the validity gate already ran
    CheckValid,
    Follow,
    Unfollow,
    Like,
    Retweet,
    Tweet,
    TweetWithPicture,
    QuoteTweet,
    QuoteTweetWithPicture,
    Comment,
    CommentWithPicture,
    VotePoll,
    ChangeProfile(ProfileField),
}

impl TaskKind {
    pub const ALL: [TaskKind; 17] = [
        TaskKind::CheckValid,
        TaskKind::Follow,
        TaskKind::Unfollow,
        TaskKind::Like,
        TaskKind::Retweet,
        TaskKind::Tweet,
        TaskKind::TweetWithPicture,
        TaskKind::QuoteTweet,
        TaskKind::QuoteTweetWithPicture,
        TaskKind::Comment,
        TaskKind::CommentWithPicture,
        TaskKind::VotePoll,
        TaskKind::ChangeProfile(ProfileField::Name),
        TaskKind::ChangeProfile(ProfileField::Bio),
        TaskKind::ChangeProfile(ProfileField::Location),
        TaskKind::ChangeProfile(ProfileField::Avatar),
        TaskKind::ChangeProfile(ProfileField::Banner),
    ];

    /// Name used in config files and logs.
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::CheckValid => "Check Valid",
            TaskKind::Follow => "Follow",
            TaskKind::Unfollow => "Unfollow",
            TaskKind::Like => "Like",
            TaskKind::Retweet => "Retweet",
            TaskKind::Tweet => "Tweet",
            TaskKind::TweetWithPicture => "Tweet with Picture",
            TaskKind::QuoteTweet => "Quote Tweet",
            TaskKind::QuoteTweetWithPicture => "Quote Tweet with Picture",
            TaskKind::Comment => "Comment",
            TaskKind::CommentWithPicture => "Comment with Picture",
            TaskKind::VotePoll => "Vote on Poll",
            TaskKind::ChangeProfile(ProfileField::Name) => "Change Name",
            TaskKind::ChangeProfile(ProfileField::Bio) => "Change Bio",
            TaskKind::ChangeProfile(ProfileField::Location) => "Change Location",
            TaskKind::ChangeProfile(ProfileField::Avatar) => "Change Avatar",
            TaskKind::ChangeProfile(ProfileField::Banner) => "Change Banner",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskKind {
    type Err = Error;

    /// Case-insensitive match on the task label.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        TaskKind::ALL
            .iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| Error::UnknownTask(wanted.to_string()))
    }
}

impl TryFrom<String> for TaskKind {
    type Error = Error;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Parse task names into an ordered selection, dropping repeats.
pub fn parse_selection<S: AsRef<str>>(names: &[S]) -> Result<Vec<TaskKind>> {
    let mut selection = Vec::with_capacity(names.len());
    for name in names {
        let kind: TaskKind = name.as_ref().parse()?;
        if !selection.contains(&kind) {
            selection.push(kind);
        }
    }
    Ok(selection)
}

/// How a per-account input list is consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Entry `i` goes to the account dispatched at position `i`
    #[default]
    Indexed,
    /// A uniformly random entry per call
    Random,
}

/// Poll to vote on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollTarget {
    /// Poll links, consumed per account
    pub links: Vec<String>,
    /// 1-based answer number
    pub choice: String,
}

/// Fully resolved input for every task kind.
///
/// Target lists (follow targets, tweet links) are shared: every account acts
/// on all of them. Content lists (texts, pictures, poll links, profile values)
/// are per account and consumed according to `selection` /
/// `picture_selection`.
#[derive(Debug, Clone, Default)]
pub struct TaskInput {
    pub follow_targets: Vec<String>,
    pub unfollow_targets: Vec<String>,
    pub like_links: Vec<String>,
    pub retweet_links: Vec<String>,
    pub quote_tweet_links: Vec<String>,
    pub comment_links: Vec<String>,
    pub poll: Option<PollTarget>,
    pub tweets: Vec<String>,
    pub comments: Vec<String>,
    /// Base64-encoded pictures
    pub pictures: Vec<String>,
    pub names: Vec<String>,
    pub bios: Vec<String>,
    pub locations: Vec<String>,
    pub selection: Selection,
    pub picture_selection: Selection,
}

impl TaskInput {
    /// Check that every list a selected task reads is present and, in indexed
    /// mode, long enough for `accounts` accounts.
    pub fn validate(&self, tasks: &[TaskKind], accounts: usize) -> Result<()> {
        for kind in tasks {
            let task = kind.label();
            match kind {
                TaskKind::CheckValid => {}
                TaskKind::Follow => require_shared(task, "follow_targets", &self.follow_targets)?,
                TaskKind::Unfollow => {
                    require_shared(task, "unfollow_targets", &self.unfollow_targets)?
                }
                TaskKind::Like => require_shared(task, "like_links", &self.like_links)?,
                TaskKind::Retweet => require_shared(task, "retweet_links", &self.retweet_links)?,
                TaskKind::Tweet => self.require_texts(task, "tweets", &self.tweets, accounts)?,
                TaskKind::TweetWithPicture => {
                    self.require_texts(task, "tweets", &self.tweets, accounts)?;
                    self.require_pictures(task, accounts)?;
                }
                TaskKind::QuoteTweet => {
                    require_shared(task, "quote_tweet_links", &self.quote_tweet_links)?;
                    self.require_texts(task, "tweets", &self.tweets, accounts)?;
                }
                TaskKind::QuoteTweetWithPicture => {
                    require_shared(task, "quote_tweet_links", &self.quote_tweet_links)?;
                    self.require_texts(task, "tweets", &self.tweets, accounts)?;
                    self.require_pictures(task, accounts)?;
                }
                TaskKind::Comment => {
                    require_shared(task, "comment_links", &self.comment_links)?;
                    self.require_texts(task, "comments", &self.comments, accounts)?;
                }
                TaskKind::CommentWithPicture => {
                    require_shared(task, "comment_links", &self.comment_links)?;
                    self.require_texts(task, "comments", &self.comments, accounts)?;
                    self.require_pictures(task, accounts)?;
                }
                TaskKind::VotePoll => {
                    let poll = self.poll.as_ref().ok_or(Error::MissingInput {
                        task,
                        input: "poll",
                    })?;
                    if poll.choice.trim().is_empty() {
                        return Err(Error::MissingInput {
                            task,
                            input: "poll choice",
                        });
                    }
                    self.require_texts(task, "poll links", &poll.links, accounts)?;
                }
                TaskKind::ChangeProfile(field) => match field {
                    ProfileField::Name => self.require_texts(task, "names", &self.names, accounts)?,
                    ProfileField::Bio => self.require_texts(task, "bios", &self.bios, accounts)?,
                    ProfileField::Location => {
                        self.require_texts(task, "locations", &self.locations, accounts)?
                    }
                    ProfileField::Avatar | ProfileField::Banner => {
                        self.require_pictures(task, accounts)?
                    }
                },
            }
        }
        Ok(())
    }

    fn require_texts(
        &self,
        task: &'static str,
        input: &'static str,
        list: &[String],
        accounts: usize,
    ) -> Result<()> {
        require_per_account(task, input, list, self.selection, accounts)
    }

    fn require_pictures(&self, task: &'static str, accounts: usize) -> Result<()> {
        require_per_account(task, "pictures", &self.pictures, self.picture_selection, accounts)
    }

    /// Resolve `kind` into the concrete action for the account dispatched at
    /// `index`. `CheckValid` resolves to `None`.
    ///
    /// Errors only if the input was not validated for this selection.
    pub fn resolve(&self, kind: TaskKind, index: usize) -> Result<Option<Action>> {
        let task = kind.label();
        let action = match kind {
            TaskKind::CheckValid => return Ok(None),
            TaskKind::Follow => Action::Follow {
                targets: self.follow_targets.clone(),
            },
            TaskKind::Unfollow => Action::Unfollow {
                targets: self.unfollow_targets.clone(),
            },
            TaskKind::Like => Action::Like {
                links: self.like_links.clone(),
            },
            TaskKind::Retweet => Action::Retweet {
                links: self.retweet_links.clone(),
            },
            TaskKind::Tweet => Action::Tweet {
                text: self.text(task, "tweets", &self.tweets, index)?,
                media: None,
            },
            TaskKind::TweetWithPicture => Action::Tweet {
                text: self.text(task, "tweets", &self.tweets, index)?,
                media: Some(self.picture(task, index)?),
            },
            TaskKind::QuoteTweet => Action::QuoteTweet {
                text: self.text(task, "tweets", &self.tweets, index)?,
                media: None,
                links: self.quote_tweet_links.clone(),
            },
            TaskKind::QuoteTweetWithPicture => Action::QuoteTweet {
                text: self.text(task, "tweets", &self.tweets, index)?,
                media: Some(self.picture(task, index)?),
                links: self.quote_tweet_links.clone(),
            },
            TaskKind::Comment => Action::Comment {
                text: self.text(task, "comments", &self.comments, index)?,
                media: None,
                links: self.comment_links.clone(),
            },
            TaskKind::CommentWithPicture => Action::Comment {
                text: self.text(task, "comments", &self.comments, index)?,
                media: Some(self.picture(task, index)?),
                links: self.comment_links.clone(),
            },
            TaskKind::VotePoll => {
                let poll = self.poll.as_ref().ok_or(Error::MissingInput {
                    task,
                    input: "poll",
                })?;
                Action::VotePoll {
                    link: self.text(task, "poll links", &poll.links, index)?,
                    choice: poll.choice.clone(),
                }
            }
            TaskKind::ChangeProfile(field) => {
                let value = match field {
                    ProfileField::Name => self.text(task, "names", &self.names, index)?,
                    ProfileField::Bio => self.text(task, "bios", &self.bios, index)?,
                    ProfileField::Location => {
                        self.text(task, "locations", &self.locations, index)?
                    }
                    ProfileField::Avatar | ProfileField::Banner => self.picture(task, index)?,
                };
                Action::ChangeProfile { field, value }
            }
        };
        Ok(Some(action))
    }

    fn text(
        &self,
        task: &'static str,
        input: &'static str,
        list: &[String],
        index: usize,
    ) -> Result<String> {
        pick(list, self.selection, index).ok_or(Error::InsufficientInput {
            task,
            input,
            needed: index + 1,
            available: list.len(),
        })
    }

    fn picture(&self, task: &'static str, index: usize) -> Result<String> {
        pick(&self.pictures, self.picture_selection, index).ok_or(Error::InsufficientInput {
            task,
            input: "pictures",
            needed: index + 1,
            available: self.pictures.len(),
        })
    }
}

fn require_shared(task: &'static str, input: &'static str, list: &[String]) -> Result<()> {
    if list.is_empty() {
        return Err(Error::MissingInput { task, input });
    }
    Ok(())
}

fn require_per_account(
    task: &'static str,
    input: &'static str,
    list: &[String],
    selection: Selection,
    accounts: usize,
) -> Result<()> {
    if list.is_empty() {
        return Err(Error::MissingInput { task, input });
    }
    if selection == Selection::Indexed && list.len() < accounts {
        return Err(Error::InsufficientInput {
            task,
            input,
            needed: accounts,
            available: list.len(),
        });
    }
    Ok(())
}

fn pick(list: &[String], selection: Selection, index: usize) -> Option<String> {
    match selection {
        Selection::Indexed => list.get(index).cloned(),
        Selection::Random => {
            if list.is_empty() {
                return None;
            }
            let i = rand::rng().random_range(0..list.len());
            list.get(i).cloned()
        }
    }
}

/// Task selection plus input, shared read-only by every account unit.
#[derive(Debug, Clone, Default)]
pub struct TaskSet {
    pub tasks: Vec<TaskKind>,
    pub input: TaskInput,
}

impl TaskSet {
    pub fn new(tasks: Vec<TaskKind>, input: TaskInput) -> Self {
        Self { tasks, input }
    }

    pub fn validate(&self, accounts: usize) -> Result<()> {
        self.input.validate(&self.tasks, accounts)
    }
}

/// A task resolved for one account, with its payload.
///
/// Actions over a list of targets run one step per target; the rest are a
/// single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Follow {
        targets: Vec<String>,
    },
    Unfollow {
        targets: Vec<String>,
    },
    Like {
        links: Vec<String>,
    },
    Retweet {
        links: Vec<String>,
    },
    Tweet {
        text: String,
        media: Option<String>,
    },
    QuoteTweet {
        text: String,
        media: Option<String>,
        links: Vec<String>,
    },
    Comment {
        text: String,
        media: Option<String>,
        links: Vec<String>,
    },
    VotePoll {
        link: String,
        choice: String,
    },
    ChangeProfile {
        field: ProfileField,
        value: String,
    },
}

impl Action {
    pub fn step_count(&self) -> usize {
        match self {
            Action::Follow { targets } | Action::Unfollow { targets } => targets.len(),
            Action::Like { links }
            | Action::Retweet { links }
            | Action::QuoteTweet { links, .. }
            | Action::Comment { links, .. } => links.len(),
            Action::Tweet { .. } | Action::VotePoll { .. } | Action::ChangeProfile { .. } => 1,
        }
    }

    /// What a step acts on, for log lines.
    pub fn step_target(&self, step: usize) -> &str {
        match self {
            Action::Follow { targets } | Action::Unfollow { targets } => nth(targets, step),
            Action::Like { links }
            | Action::Retweet { links }
            | Action::QuoteTweet { links, .. }
            | Action::Comment { links, .. } => nth(links, step),
            Action::Tweet { .. } => "timeline",
            Action::VotePoll { link, .. } => link,
            Action::ChangeProfile { field, .. } => field.label(),
        }
    }

    /// Perform one step against the client.
    pub async fn perform(&self, client: &dyn AccountClient, step: usize) -> ActionResult {
        if step >= self.step_count() {
            return ActionResult::failed(format!("step {step} out of range"));
        }
        match self {
            Action::Follow { targets } => client.follow(nth(targets, step)).await,
            Action::Unfollow { targets } => client.unfollow(nth(targets, step)).await,
            Action::Like { links } => client.like(nth(links, step)).await,
            Action::Retweet { links } => client.retweet(nth(links, step)).await,
            Action::Tweet { text, media } => {
                let options = TweetOptions {
                    media_base64: media.clone(),
                    quote_tweet_url: None,
                };
                client.tweet(text, options).await
            }
            Action::QuoteTweet { text, media, links } => {
                let options = TweetOptions {
                    media_base64: media.clone(),
                    quote_tweet_url: Some(nth(links, step).to_string()),
                };
                client.tweet(text, options).await
            }
            Action::Comment { text, media, links } => {
                client.comment(text, nth(links, step), media.clone()).await
            }
            Action::VotePoll { link, choice } => client.vote_poll(link, choice).await,
            Action::ChangeProfile { field, value } => client.change_profile(*field, value).await,
        }
    }
}

fn nth(list: &[String], step: usize) -> &str {
    list.get(step).map(String::as_str).unwrap_or_default()
}
