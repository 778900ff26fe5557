use std::net::TcpStream;

use log::{debug, info};
use native_tls::TlsConnector;
use thiserror::Error;

use crate::config::{Account, ImapSecurity};
use crate::session::{ImapSession, MailSession};

#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    TlsError(String),

    #[error("IMAP error: {0}")]
    ImapError(String),

    #[error("Login failed for {user}: {reason}")]
    LoginError { user: String, reason: String },
}

impl From<imap::error::Error> for ConnectError {
    fn from(err: imap::error::Error) -> Self {
        ConnectError::ImapError(err.to_string())
    }
}

impl From<native_tls::Error> for ConnectError {
    fn from(err: native_tls::Error) -> Self {
        ConnectError::TlsError(err.to_string())
    }
}

/// Opens a connection to `account`, records its greeting and logs in.
pub fn connect(account: &Account) -> Result<Box<dyn MailSession>, ConnectError> {
    debug!("Connecting to {} using {:?}", account, account.security);
    let session: Box<dyn MailSession> = match account.security {
        ImapSecurity::None => {
            let (client, greeting) = connect_plain(account)?;
            Box::new(login(client, greeting, account)?)
        }
        ImapSecurity::StartTLS => {
            let (client, greeting) = connect_plain(account)?;
            let tls = TlsConnector::builder().build()?;
            let client = client.secure(account.host.as_str(), &tls)?;
            Box::new(login(client, greeting, account)?)
        }
        ImapSecurity::SSL => {
            let (client, greeting) = connect_ssl(account)?;
            Box::new(login(client, greeting, account)?)
        }
    };
    info!("Logged in to {}", account);
    Ok(session)
}

fn connect_plain(account: &Account) -> Result<(imap::Client<TcpStream>, String), ConnectError> {
    let tcp_stream = TcpStream::connect((account.host.as_str(), account.port))?;
    let mut client = imap::Client::new(tcp_stream);
    let greeting = client.read_greeting()?;
    Ok((client, String::from_utf8_lossy(&greeting).trim_end().to_string()))
}

fn connect_ssl(
    account: &Account,
) -> Result<(imap::Client<native_tls::TlsStream<TcpStream>>, String), ConnectError> {
    let tls = TlsConnector::builder().build()?;
    let tcp_stream = TcpStream::connect((account.host.as_str(), account.port))?;
    let tls_stream = tls
        .connect(account.host.as_str(), tcp_stream)
        .map_err(|e| ConnectError::TlsError(e.to_string()))?;
    let mut client = imap::Client::new(tls_stream);
    let greeting = client.read_greeting()?;
    Ok((client, String::from_utf8_lossy(&greeting).trim_end().to_string()))
}

fn login<T: std::io::Read + std::io::Write + 'static>(
    client: imap::Client<T>,
    greeting: String,
    account: &Account,
) -> Result<ImapSession<T>, ConnectError> {
    debug!("Server greeting: {}", greeting);
    let session = client
        .login(&account.username, &account.password)
        .map_err(|(e, _)| ConnectError::LoginError {
            user: account.username.clone(),
            reason: e.to_string(),
        })?;
    Ok(ImapSession::new(session, greeting))
}
