//! End-to-end command scenarios against a scripted SMTP server.
//!
//! The server is a real `TcpListener` speaking just enough SMTP for a single
//! scripted session, so every scenario exercises the full stack: attachment
//! loading, message assembly, envelope resolution and the wire protocol.

use std::{
    io::{BufRead, BufReader, Write},
    net::{TcpListener, TcpStream},
    thread::{self, JoinHandle},
};

use missive::{AttachmentSpec, ConnectorConfig, Limits, SendEmail};

#[derive(Clone, Copy, Default)]
struct ServerOptions {
    advertise_starttls: bool,
    reject_rcpt: bool,
}

#[derive(Default)]
struct Transcript {
    commands: Vec<String>,
    data: String,
}

impl Transcript {
    fn saw(&self, prefix: &str) -> bool {
        self.commands.iter().any(|line| line.starts_with(prefix))
    }
}

fn spawn_server(opts: ServerOptions) -> (u16, JoinHandle<Transcript>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || match listener.accept() {
        Ok((stream, _)) => serve(stream, opts),
        Err(_) => Transcript::default(),
    });
    (port, handle)
}

fn serve(stream: TcpStream, opts: ServerOptions) -> Transcript {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut writer = stream;
    let mut transcript = Transcript::default();

    let _ = writer.write_all(b"220 mock ESMTP ready\r\n");

    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let command = line.trim_end().to_owned();
        transcript.commands.push(command.clone());
        let verb = command.to_ascii_uppercase();

        let response: &[u8] = if verb.starts_with("EHLO") {
            if opts.advertise_starttls {
                b"250-mock\r\n250-STARTTLS\r\n250-AUTH PLAIN LOGIN\r\n250 8BITMIME\r\n"
            } else {
                b"250-mock\r\n250-AUTH PLAIN LOGIN\r\n250 8BITMIME\r\n"
            }
        } else if verb.starts_with("AUTH") {
            b"235 2.7.0 authentication successful\r\n"
        } else if verb.starts_with("MAIL") {
            b"250 2.1.0 ok\r\n"
        } else if verb.starts_with("RCPT") {
            if opts.reject_rcpt {
                b"550 5.1.1 no such user here\r\n"
            } else {
                b"250 2.1.5 ok\r\n"
            }
        } else if verb.starts_with("DATA") {
            let _ = writer.write_all(b"354 go ahead\r\n");
            loop {
                line.clear();
                match reader.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) if line == ".\r\n" => break,
                    Ok(_) => transcript.data.push_str(&line),
                }
            }
            b"250 2.0.0 queued\r\n"
        } else if verb.starts_with("QUIT") {
            let _ = writer.write_all(b"221 bye\r\n");
            break;
        } else {
            b"500 unrecognized command\r\n"
        };
        if writer.write_all(response).is_err() {
            break;
        }
    }

    transcript
}

fn config() -> ConnectorConfig {
    ConnectorConfig {
        attachments_root: std::env::temp_dir(),
        limits: Limits::default(),
    }
}

fn base_command(port: u16) -> SendEmail {
    SendEmail {
        smtp_host: "127.0.0.1".to_owned(),
        smtp_port: port,
        email_subject: "Monthly report".to_owned(),
        email_body: "See attached.".to_owned(),
        email_from: "robot@example.com".to_owned(),
        email_to: "ops@example.com".to_owned(),
        ..SendEmail::default()
    }
}

#[test]
fn sends_with_auth_and_inline_attachment() {
    let (port, server) = spawn_server(ServerOptions::default());

    let mut command = base_command(port);
    command.smtp_user = Some("user".to_owned());
    command.smtp_password = Some("secret".to_owned());
    command.email_to = "ops@example.com, ops@example.com".to_owned();
    command.email_cc = Some("watchers@example.com".to_owned());
    command.email_bcc = Some("hidden@example.com".to_owned());
    command.attachments = vec![AttachmentSpec {
        filename: "hello.txt".to_owned(),
        content_base64: Some("aGVsbG8gd29ybGQ=".to_owned()),
        ..AttachmentSpec::default()
    }];

    let response = command.execute(&config());
    assert_eq!(response.error, None, "logs: {:?}", response.logs);
    assert!(response.logs.iter().any(|l| l == "did login"));
    assert!(response.logs.iter().any(|l| l == "did send to 3 recipient(s)"));
    assert!(response
        .logs
        .iter()
        .any(|l| l == "attached: hello.txt (text/plain, 11 bytes)"));

    let transcript = server.join().unwrap();
    assert!(transcript.saw("AUTH PLAIN "));
    assert!(transcript.saw("MAIL FROM:<robot@example.com>"));
    assert!(transcript.saw("RCPT TO:<ops@example.com>"));
    assert!(transcript.saw("RCPT TO:<watchers@example.com>"));
    assert!(transcript.saw("RCPT TO:<hidden@example.com>"));
    // RCPT order is To, then Cc, then Bcc — deduped
    let rcpts: Vec<&String> = transcript
        .commands
        .iter()
        .filter(|c| c.starts_with("RCPT"))
        .collect();
    assert_eq!(rcpts.len(), 3);

    assert!(transcript.data.contains("Subject: Monthly report"));
    assert!(transcript.data.contains("To: ops@example.com, ops@example.com"));
    assert!(transcript.data.contains("Cc: watchers@example.com"));
    assert!(transcript
        .data
        .contains("Content-Disposition: attachment; filename=\"hello.txt\""));
    // base64 of "hello world"
    assert!(transcript.data.contains("aGVsbG8gd29ybGQ="));
    // Bcc recipients exist only in the envelope, never in the message
    assert!(!transcript.data.contains("hidden@example.com"));
    assert!(!transcript.data.contains("Bcc"));
}

#[test]
fn starttls_requested_but_not_advertised_is_a_tls_error() {
    let (port, server) = spawn_server(ServerOptions::default());

    let mut command = base_command(port);
    command.smtp_starttls = true;
    command.smtp_user = Some("user".to_owned());
    command.smtp_password = Some("secret".to_owned());

    let response = command.execute(&config());
    let error = response.error.unwrap();
    assert_eq!(error.error_code, "TLSError");

    assert!(response.logs.iter().any(|l| l == "will starttls"));
    assert!(!response.logs.iter().any(|l| l == "will login"));
    assert!(!response.logs.iter().any(|l| l.starts_with("did send")));

    let transcript = server.join().unwrap();
    assert!(transcript.saw("EHLO"));
    assert!(!transcript.saw("STARTTLS"));
    assert!(!transcript.saw("AUTH"));
    assert!(!transcript.saw("MAIL"));
}

#[test]
fn rejected_recipient_is_a_send_error() {
    let (port, server) = spawn_server(ServerOptions {
        reject_rcpt: true,
        ..ServerOptions::default()
    });

    let command = base_command(port);
    let response = command.execute(&config());

    let error = response.error.unwrap();
    assert_eq!(error.error_code, "SendError");
    assert!(error.message.contains("no such user here"));
    assert!(response.logs.iter().any(|l| l.starts_with("did error:")));
    assert!(!response.logs.iter().any(|l| l.starts_with("did send")));

    let transcript = server.join().unwrap();
    assert!(transcript.saw("RCPT TO:<ops@example.com>"));
    assert!(!transcript.saw("DATA"));
}

#[test]
fn connection_refused_is_a_connection_error() {
    // Bind to get a free port, then drop the listener before connecting.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let response = base_command(port).execute(&config());
    let error = response.error.unwrap();
    assert_eq!(error.error_code, "ConnectionError");
    assert!(response.logs.iter().any(|l| l.starts_with("will send")));
}

#[test]
fn path_escape_never_reaches_the_network() {
    let root = tempfile::tempdir().unwrap();
    let config = ConnectorConfig {
        attachments_root: root.path().to_path_buf(),
        limits: Limits::default(),
    };

    // Port without a listener: the test fails loudly if delivery is tried.
    let mut command = base_command(1);
    command.attachments = vec![AttachmentSpec {
        filename: "passwd".to_owned(),
        path: Some("/etc/passwd".to_owned()),
        ..AttachmentSpec::default()
    }];

    let response = command.execute(&config);
    let error = response.error.unwrap();
    assert_eq!(error.error_code, "InvalidPath");
    assert!(response
        .logs
        .iter()
        .any(|l| l.starts_with("attachment error:")));
    assert!(!response.logs.iter().any(|l| l.starts_with("will send")));
}

#[test]
fn oversized_inline_attachment_never_reaches_the_network() {
    let root = tempfile::tempdir().unwrap();
    let config = ConnectorConfig {
        attachments_root: root.path().to_path_buf(),
        limits: Limits {
            attachment_bytes: 1024,
            ..Limits::default()
        },
    };

    let mut command = base_command(1);
    command.attachments = vec![AttachmentSpec {
        filename: "bomb.bin".to_owned(),
        // ~6 KB decoded estimate, never decoded at all
        content_base64: Some("A".repeat(8 * 1024)),
        ..AttachmentSpec::default()
    }];

    let response = command.execute(&config);
    let error = response.error.unwrap();
    assert_eq!(error.error_code, "AttachmentTooLarge");
    assert!(error.message.contains("bomb.bin"));
    assert!(!response.logs.iter().any(|l| l.starts_with("will send")));
}

#[test]
fn attachment_is_read_from_the_allowed_root() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("report.csv"), "a,b\n1,2\n").unwrap();
    let config = ConnectorConfig {
        attachments_root: root.path().to_path_buf(),
        limits: Limits::default(),
    };

    let (port, server) = spawn_server(ServerOptions::default());
    let mut command = base_command(port);
    command.attachments = vec![AttachmentSpec {
        filename: "report.csv".to_owned(),
        path: Some(root.path().join("report.csv").to_str().unwrap().to_owned()),
        ..AttachmentSpec::default()
    }];

    let response = command.execute(&config);
    assert_eq!(response.error, None, "logs: {:?}", response.logs);
    assert!(response.logs.iter().any(|l| l.starts_with("attached: report.csv")));

    let transcript = server.join().unwrap();
    assert!(transcript
        .data
        .contains("Content-Disposition: attachment; filename=\"report.csv\""));
}
