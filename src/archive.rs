use super::config::Account;
use super::cursor;
use super::session::{self, ImapSession, MailSession};
use super::writer;
use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Outcome of one mailbox run. `archived` holds the sequence numbers files
/// were stored under, as answered by the server. `skipped` holds requested
/// numbers that failed this time; they are not recorded anywhere else and
/// will not be retried once a later message has been archived.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MailboxReport {
    pub mailbox: String,
    pub from: u32,
    pub to: u32,
    pub archived: Vec<u32>,
    pub skipped: Vec<u32>,
}

impl MailboxReport {
    pub fn attempted(&self) -> usize {
        self.archived.len() + self.skipped.len()
    }
}

/// Archive directory of `mailbox` under `target`. Leading separators are
/// dropped so that every mailbox stays below `target`; `..` is refused.
pub fn mailbox_dir(target: &Path, mailbox: &str) -> Result<PathBuf> {
    let mut dir = target.to_path_buf();
    let mut pushed = false;
    for component in Path::new(mailbox).components() {
        match component {
            Component::Normal(part) => {
                dir.push(part);
                pushed = true;
            }
            Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(anyhow!("mailbox name {:?} escapes the archive root", mailbox))
            }
        }
    }
    if !pushed {
        return Err(anyhow!("mailbox name {:?} has no usable path", mailbox));
    }
    Ok(dir)
}

/// Fetches and stores one message, returning the sequence number it was
/// stored under.
fn fetch_one<S: MailSession>(
    session: &mut S,
    dir: &Path,
    mailbox: &str,
    seq: u32,
) -> Option<u32> {
    debug!("({}) deal with message {}", mailbox, seq);
    let msg = match session.fetch(seq) {
        Ok(msg) => msg,
        Err(e) => {
            error!("({}) fetching message {} failed: {}", mailbox, seq, e);
            return None;
        }
    };

    debug!("  subject: {:?}", msg.subject);
    debug!("  datetime: {:?}", msg.internal_date);
    debug!("  size: {:?}", msg.size);

    let body = match &msg.body {
        Some(body) => body,
        None => {
            error!("({}) server returned no body for message {}", mailbox, seq);
            return None;
        }
    };
    debug!("  body length: {}", body.len());

    // the server may answer with a different sequence number than requested
    if msg.seq != seq {
        warn!("({}) asked for message {}, got {}", mailbox, seq, msg.seq);
    }
    match writer::write_message(dir, msg.seq, &body[..]) {
        Ok(_) => Some(msg.seq),
        Err(e) => {
            error!("({}) saving message {} failed: {}", mailbox, msg.seq, e);
            None
        }
    }
}

/// Fetches `from..=to` one message at a time, never stopping on a failed one.
pub fn fetch_range<S: MailSession>(
    session: &mut S,
    dir: &Path,
    mailbox: &str,
    from: u32,
    to: u32,
) -> MailboxReport {
    let mut report = MailboxReport {
        mailbox: mailbox.to_owned(),
        from,
        to,
        ..MailboxReport::default()
    };

    for seq in from..=to {
        match fetch_one(session, dir, mailbox, seq) {
            Some(stored) => report.archived.push(stored),
            None => report.skipped.push(seq),
        }
    }
    report
}

pub fn archive_mailbox<S: MailSession>(
    session: &mut S,
    target: &Path,
    mailbox: &str,
) -> Result<MailboxReport> {
    info!("download mailbox {}", mailbox);
    let dir = mailbox_dir(target, mailbox)?;
    let to = session
        .examine(mailbox)
        .with_context(|| format!("failed to examine mailbox {}", mailbox))?;
    debug!("({}) has {} messages", mailbox, to);

    let from = cursor::next_sequence(&dir)
        .with_context(|| format!("failed to list archive dir {:?}", dir))?;
    if from > to {
        info!("({}) up to date", mailbox);
        return Ok(MailboxReport {
            mailbox: mailbox.to_owned(),
            from,
            to,
            ..MailboxReport::default()
        });
    }

    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create archive dir {:?}", dir))?;
    info!("({}) fetching messages {} to {}", mailbox, from, to);
    Ok(fetch_range(session, &dir, mailbox, from, to))
}

/// Archives every wanted mailbox of the session, one after another. Only a
/// failure to list mailboxes is returned; anything else is logged and skipped.
pub fn archive_all<S, F>(session: &mut S, target: &Path, wanted: F) -> Result<Vec<MailboxReport>>
where
    S: MailSession,
    F: Fn(&str) -> bool,
{
    debug!("listing all");
    let names = session.list_mailboxes().context("failed to list mailboxes")?;
    info!("{} mailboxes found", names.len());
    for name in &names {
        debug!("  * {}", name);
    }

    let mut reports = Vec::new();
    for name in names.iter().filter(|n| wanted(n.as_str())) {
        match archive_mailbox(session, target, name) {
            Ok(report) => {
                info!(
                    "({}) done: {} of {} archived",
                    name,
                    report.archived.len(),
                    report.attempted()
                );
                if !report.skipped.is_empty() {
                    warn!("({}) skipped messages: {:?}", name, report.skipped);
                }
                reports.push(report);
            }
            Err(e) => error!("skipping mailbox {}: {:?}", name, e),
        }
    }
    Ok(reports)
}

/// Runs `f` and logs out afterwards whatever it returned.
pub fn with_session<S, T, F>(session: &mut S, f: F) -> Result<T>
where
    S: MailSession,
    F: FnOnce(&mut S) -> Result<T>,
{
    let result = f(session);
    if let Err(e) = session.logout() {
        warn!("logout failed: {}", e);
    }
    result
}

pub fn get(acc: &Account) -> Result<Vec<MailboxReport>> {
    let mut session: ImapSession = session::establish_session(acc)?;
    with_session(&mut session, |s| {
        archive_all(s, &acc.target, |name| acc.wants_mailbox(name))
    })
}
