use super::config::*;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset};
use imap::types::NameAttribute;
use log::debug;
use native_tls::{TlsConnector, TlsStream};
use quick_error::quick_error;
use std::ffi::OsString;
use std::net::TcpStream;
use std::process::Command;

quick_error! {
    #[derive(Debug)]
    pub enum MailError {
        Io(err: std::io::Error) {
            from()
        }
        ImapError(err: imap::error::Error) {
            from()
        }
        TlsError(err: native_tls::Error) {
            from()
        }
        NoResponse(seq: u32) {
            display("server returned nothing for message {}", seq)
        }
    }
}

/// One message as returned by a combined metadata and body fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchedMessage {
    pub seq: u32,
    pub subject: Option<String>,
    pub internal_date: Option<DateTime<FixedOffset>>,
    pub size: Option<u32>,
    pub body: Option<Vec<u8>>,
}

/// What the archiver needs from a logged-in mail session.
pub trait MailSession {
    fn list_mailboxes(&mut self) -> Result<Vec<String>, MailError>;
    /// Selects `mailbox` read-only and returns its message count.
    fn examine(&mut self, mailbox: &str) -> Result<u32, MailError>;
    fn fetch(&mut self, seq: u32) -> Result<FetchedMessage, MailError>;
    fn logout(&mut self) -> Result<(), MailError>;
}

const FETCH_QUERY: &str = "(INTERNALDATE RFC822.SIZE ENVELOPE BODY.PEEK[])";

pub struct ImapSession {
    inner: imap::Session<TlsStream<TcpStream>>,
}

impl MailSession for ImapSession {
    fn list_mailboxes(&mut self) -> Result<Vec<String>, MailError> {
        let names = self.inner.list(None, Some("*"))?;
        Ok(names
            .iter()
            .filter(|n| !n.attributes().contains(&NameAttribute::NoSelect))
            .map(|n| n.name().to_string())
            .collect())
    }

    fn examine(&mut self, mailbox: &str) -> Result<u32, MailError> {
        let mailbox = self.inner.examine(mailbox)?;
        debug!("examine: {:?}", mailbox);
        Ok(mailbox.exists)
    }

    fn fetch(&mut self, seq: u32) -> Result<FetchedMessage, MailError> {
        let fetches = self.inner.fetch(seq.to_string(), FETCH_QUERY)?;
        let fetch = response_for(fetches.as_slice(), seq, |f| f.message)
            .ok_or(MailError::NoResponse(seq))?;
        let subject = fetch
            .envelope()
            .and_then(|env| env.subject.as_deref())
            .map(|s| String::from_utf8_lossy(s).trim().to_string());

        Ok(FetchedMessage {
            seq: fetch.message,
            subject,
            internal_date: fetch.internal_date(),
            size: fetch.size,
            body: fetch.body().map(|b| b.to_vec()),
        })
    }

    fn logout(&mut self) -> Result<(), MailError> {
        Ok(self.inner.logout()?)
    }
}

/// Picks the response for `seq` out of a FETCH answer. Servers may add
/// unsolicited responses for other messages; the first one is the fallback.
fn response_for<T, F>(responses: &[T], seq: u32, seq_of: F) -> Option<&T>
where
    F: Fn(&T) -> u32,
{
    responses
        .iter()
        .find(|r| seq_of(*r) == seq)
        .or_else(|| responses.first())
}

fn connect(acc: &Account) -> Result<imap::Client<TlsStream<TcpStream>>, MailError> {
    use Method::*;

    let host: &str = &acc.host;
    let port = acc.port;
    let tls = TlsConnector::new()?;
    match &acc.method {
        Tls => Ok(imap::connect((host, port), host, &tls)?),
        StartTls => Ok(imap::connect_starttls((host, port), host, &tls)?),
    }
}

pub fn retrieve_password(pc: &PasswordContainer) -> Result<String> {
    use PasswordContainer::*;
    match pc {
        Plaintext(p) => Ok(p.clone()),
        Shell(cmd) => {
            debug!("start shell command to retrieve password {}", &cmd);
            let mut spl = shlex::split(cmd)
                .context("failed parsing password command")?
                .into_iter()
                .map(OsString::from);
            let output = Command::new(
                spl.next()
                    .ok_or_else(|| anyhow!("The shell command for password is required"))?,
            )
            .args(spl)
            .output()
            .context("failed executing password command")?;
            if !output.status.success() {
                return Err(anyhow!("password command exited with {}", output.status));
            }
            let pass = String::from_utf8(output.stdout)
                .context("password command returned non-utf text on stdout")?;
            Ok(pass.trim().to_owned())
        }
    }
}

/// Connects and logs in. Nothing needs logging out if this fails.
pub fn establish_session(acc: &Account) -> Result<ImapSession> {
    let pass = retrieve_password(&acc.password).context("unable to retrieve password")?;

    debug!("connecting to mailserver for {:?}", &acc);
    let client = connect(acc)
        .with_context(|| format!("failed to connect to mail server {}:{}", acc.host, acc.port))?;
    debug!("connected!");

    debug!("logging in...");
    let inner = client
        .login(&acc.username, &pass)
        .map_err(|(e, _)| MailError::from(e))
        .context("failed to login")?;
    debug!("login ok!");
    Ok(ImapSession { inner })
}
