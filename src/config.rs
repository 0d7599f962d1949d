use log::debug;
use serde::Deserialize;
use std::fmt::{self, Debug, Formatter};
use std::fs::File;
use std::io::{Read, Result};
use std::path::{Path, PathBuf};

#[derive(Deserialize, Clone, PartialEq)]
pub enum PasswordContainer {
    Plaintext(String),
    Shell(String),
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum Method {
    StartTls,
    Tls,
}

#[derive(Deserialize, Clone)]
pub struct Account {
    pub host: String,
    pub port: u16,
    pub method: Method,
    pub username: String,
    pub password: PasswordContainer,
    /// Archive root; every mailbox gets a subdirectory of the same name.
    pub target: PathBuf,
    /// Restricts archiving to these mailboxes when set.
    #[serde(default)]
    pub mailboxes: Option<Vec<String>>,
}

#[derive(Deserialize, Debug)]
pub struct Config {
    pub accounts: Vec<Account>,
}

impl Config {
    pub fn read_from<P: AsRef<Path>>(path: P) -> Result<Config> {
        let mut f = File::open(path.as_ref())?;
        debug!("config file {:?} open", path.as_ref());
        let mut buf = String::new();
        f.read_to_string(&mut buf)?;
        debug!("config file text read");
        Config::parse(&buf)
    }

    pub fn parse(text: &str) -> Result<Config> {
        Ok(toml::from_str(text)?)
    }
}

impl Account {
    pub fn wants_mailbox(&self, name: &str) -> bool {
        match &self.mailboxes {
            Some(names) => names.iter().any(|n| n == name),
            None => true,
        }
    }
}

impl Debug for PasswordContainer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use PasswordContainer::*;
        match &self {
            Plaintext(_) => write!(f, "[plaintext password]"),
            Shell(_) => write!(f, "[shell command]"),
        }
    }
}

// we want the Debug impl to not print user details
impl Debug for Account {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Account {{ method: {:?}, port: {:?}, password: {:?} }}",
            self.method, self.port, self.password,
        )
    }
}
