use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use postconfirm_filter::MtaSession;

/// A minimal, first-party stand-in for the real MTA-facing wire protocol
/// (milter or similar), which is an external collaborator out of scope
/// here. Reads one transaction per connection: `MAIL FROM:<...>`, one or
/// more `RCPT TO:<...>`, `DATA`, header lines, a blank line, the body, and
/// a lone `.` terminator — enough to drive the decider end to end.
pub struct LineSession {
    from: String,
    recipients: Vec<String>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

#[async_trait]
impl MtaSession for LineSession {
    fn envelope_from(&self) -> &str {
        &self.from
    }

    fn envelope_recipients(&self) -> &[String] {
        &self.recipients
    }

    fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    async fn body(&self) -> Vec<u8> {
        self.body.clone()
    }
}

/// Reads one transaction off `stream`. Returns `Ok(None)` on a clean EOF
/// before any `MAIL FROM` line (the peer simply closed the connection).
pub async fn read_transaction<R: AsyncRead + Unpin>(stream: &mut BufReader<R>) -> Result<Option<LineSession>> {
    let mut line = String::new();

    loop {
        line.clear();
        if stream.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end();
        if let Some(rest) = trimmed.strip_prefix("MAIL FROM:") {
            let from = rest.trim().to_string();
            return Ok(Some(read_recipients_and_data(stream, from).await?));
        }
    }
}

async fn read_recipients_and_data<R: AsyncRead + Unpin>(stream: &mut BufReader<R>, from: String) -> Result<LineSession> {
    let mut recipients = Vec::new();
    let mut line = String::new();

    loop {
        line.clear();
        if stream.read_line(&mut line).await? == 0 {
            bail!("connection closed mid-envelope");
        }
        let trimmed = line.trim_end();
        if let Some(rest) = trimmed.strip_prefix("RCPT TO:") {
            recipients.push(rest.trim().to_string());
        } else if trimmed == "DATA" {
            break;
        } else {
            bail!("unexpected line in envelope phase: {trimmed}");
        }
    }

    let mut headers = Vec::new();
    loop {
        line.clear();
        if stream.read_line(&mut line).await? == 0 {
            bail!("connection closed mid-headers");
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }
        match trimmed.split_once(':') {
            Some((name, value)) => headers.push((name.to_string(), value.to_string())),
            None => bail!("malformed header line: {trimmed}"),
        }
    }

    let mut body = Vec::new();
    loop {
        line.clear();
        if stream.read_line(&mut line).await? == 0 {
            break;
        }
        if line.trim_end_matches(['\r', '\n']) == "." {
            break;
        }
        body.extend_from_slice(line.as_bytes());
    }

    Ok(LineSession {
        from,
        recipients,
        headers,
        body,
    })
}

pub async fn write_verdict<W: AsyncWrite + Unpin>(stream: &mut W, verdict: postconfirm_filter::Verdict) -> Result<()> {
    let line = match verdict {
        postconfirm_filter::Verdict::Accept => "250 2.0.0 Ok\r\n",
        postconfirm_filter::Verdict::Reject => "550 5.7.1 Rejected\r\n",
        postconfirm_filter::Verdict::Discard => "250 2.0.0 Discarded\r\n",
    };
    stream.write_all(line.as_bytes()).await?;
    Ok(())
}
