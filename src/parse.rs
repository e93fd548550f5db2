use anyhow::Result;
use chrono::NaiveDate;

/// Date format used by the appointments endpoint and the export file names.
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// Splits a `key=value` query parameter. Only the first `=` separates.
pub fn parse_param(input: &str) -> Result<(String, String)> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("expected key=value, got '{}'", input))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow::anyhow!("empty parameter name in '{}'", input));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Parses a `mm/dd/yyyy` date.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|_| -> anyhow::Error {
        crate::error::ExportError::InvalidDate { value: input.to_string() }.into()
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses an SFTP target `user@host[:port]`; the port defaults to 22.
pub fn parse_remote_host(input: &str) -> Result<(String, String, u16)> {
    let at_pos = input
        .find('@')
        .ok_or_else(|| anyhow::anyhow!("missing username, expected user@host[:port]"))?;
    let (user_part, host_part) = input.split_at(at_pos);
    let user = user_part.trim();
    let host_port = &host_part[1..];
    if user.is_empty() || host_port.is_empty() {
        return Err(anyhow::anyhow!("username or host is empty"));
    }

    let (host, port) = if let Some(colon) = host_port.rfind(':') {
        let (h, p_str) = host_port.split_at(colon);
        let p_str = &p_str[1..];
        let p: u16 = p_str.parse().map_err(|_| anyhow::anyhow!("invalid port: {}", p_str))?;
        (h.to_string(), p)
    } else {
        (host_port.to_string(), 22)
    };

    Ok((user.to_string(), host, port))
}
