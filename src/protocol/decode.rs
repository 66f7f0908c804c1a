//! Pure decoding: reply bytes + command context → Reply.
//!
//! No I/O, no side effects. The `cmd` parameter tells us which grammar to
//! expect: the controller never says what a reply is, only the query that
//! produced it does.

use std::collections::BTreeMap;

use crate::domain::{
    AotfError, AotfResult, BlankingStatus, Channel, ChannelStatus, DriverMode, LineStatus,
    ModeFlag, PllState, StateFlag, VoltageRange, MAX_CHANNELS,
};

use super::{Command, Dialect, Framing, Reply, LINE_STATUS_LINES, PROMPT_SENTINEL};

/// Whole reply line the firmware sends for a command it refuses
const REJECTED: &str = "?";

/// Decode the raw bytes read after sending `cmd` into a typed Reply.
///
/// `raw` holds the complete reply, terminators included, exactly as the
/// session read it for the framing `dialect` prescribes.
pub fn decode(raw: &[u8], cmd: &Command, dialect: &Dialect) -> AotfResult<Reply> {
    use Command::*;

    if !raw.is_ascii() {
        return Err(AotfError::malformed(format!(
            "reply to {cmd:?} is not ASCII: {:?}",
            String::from_utf8_lossy(raw)
        )));
    }
    let text = std::str::from_utf8(raw)
        .map_err(|e| AotfError::malformed(format!("reply to {cmd:?} is not text: {e}")))?;
    let eol = dialect.line_ending.as_str();

    let value = match dialect.framing(cmd) {
        Framing::Prompted => unprompt(text, eol)?,
        Framing::Lines(_) => text.strip_suffix(eol).unwrap_or(text).trim(),
    };

    match cmd {
        LinesStatusQuery => parse_line_status(text, eol).map(Reply::LineStatus),
        ChannelQuery => parse_channel(value).map(Reply::Channel),
        FrequencyQuery => parse_f64(value, "frequency").map(Reply::FrequencyMhz),
        PowerQuery => parse_coarse_power(value).map(Reply::CoarsePower),
        FinePowerQuery => parse_f64(value, "fine power").map(Reply::FinePowerDbm),
        DriverModeQuery => DriverMode::from_code(value).map(Reply::DriverMode),
        PllQuery => PllState::from_code(value).map(Reply::Pll),
        VoltageRangeQuery => VoltageRange::from_code(value).map(Reply::VoltageRange),
        ProductIdQuery => parse_product_id(value).map(Reply::ProductId),
        ChannelSelect(_) | FrequencyAdjust(_) | CoarsePowerAdjust(_) | FinePowerAdjust(_)
        | DriverModeSet(_) | PllSwitch(_) | VoltageRangeSet(_) | Reset | DataStorage => {
            if value == REJECTED {
                Err(AotfError::malformed(format!("device rejected {cmd:?}")))
            } else {
                Ok(Reply::Ack)
            }
        }
    }
}

/// Strip `<eol>` … `?` framing from a prompted reply.
fn unprompt<'a>(text: &'a str, eol: &str) -> AotfResult<&'a str> {
    let body = text.strip_prefix(eol).unwrap_or(text);
    body.strip_suffix(PROMPT_SENTINEL as char)
        .map(str::trim)
        .ok_or_else(|| {
            AotfError::malformed(format!("prompted reply '{}' lacks '?' sentinel", text.escape_debug()))
        })
}

fn parse_f64(value: &str, what: &str) -> AotfResult<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AotfError::malformed(format!("invalid {what} '{value}'")))
}

fn parse_i64(value: &str, what: &str) -> AotfResult<i64> {
    value
        .parse::<i64>()
        .map_err(|e| AotfError::malformed(format!("invalid {what} '{value}': {e}")))
}

fn parse_channel(value: &str) -> AotfResult<Channel> {
    let raw = parse_i64(value, "channel")?;
    u8::try_from(raw)
        .ok()
        .and_then(|c| Channel::new(c).ok())
        .ok_or_else(|| {
            AotfError::malformed(format!("channel {raw} outside [1, {MAX_CHANNELS}]"))
        })
}

fn parse_coarse_power(value: &str) -> AotfResult<u16> {
    let raw = parse_i64(value, "coarse power")?;
    u16::try_from(raw)
        .map_err(|_| AotfError::malformed(format!("coarse power {raw} is not a 16-bit level")))
}

fn parse_product_id(value: &str) -> AotfResult<String> {
    if value.is_empty() {
        Err(AotfError::malformed("empty product id"))
    } else {
        Ok(value.to_string())
    }
}

/// Parse `MAX_CHANNELS` channel lines followed by one blanking line.
/// All-or-nothing: any bad line fails the whole reply.
fn parse_line_status(text: &str, eol: &str) -> AotfResult<LineStatus> {
    let body = text.strip_suffix(eol).unwrap_or(text);
    let lines: Vec<&str> = body.split(eol).collect();
    if lines.len() != LINE_STATUS_LINES {
        return Err(AotfError::malformed(format!(
            "line status expects {LINE_STATUS_LINES} lines, got {}",
            lines.len()
        )));
    }

    let (blanking_line, channel_lines) = lines
        .split_last()
        .ok_or_else(|| AotfError::malformed("empty line status"))?;

    let mut channels = BTreeMap::new();
    for (index, line) in channel_lines.iter().enumerate() {
        let line_no = index + 1;
        let (raw_channel, status) =
            parse_channel_line(line).map_err(|e| AotfError::malformed_line(line_no, e))?;
        let channel = u8::try_from(raw_channel)
            .ok()
            .and_then(|c| Channel::new(c).ok())
            .ok_or_else(|| {
                AotfError::malformed_line(
                    line_no,
                    format!("channel {raw_channel} outside [1, {MAX_CHANNELS}]"),
                )
            })?;
        if channels.insert(channel, status).is_some() {
            return Err(AotfError::malformed_line(
                line_no,
                format!("channel {channel} reported twice"),
            ));
        }
    }

    let blanking = parse_blanking_line(blanking_line)
        .map_err(|e| AotfError::malformed_line(LINE_STATUS_LINES, e))?;

    LineStatus::new(channels, blanking)
}

/// `l<channel> F=<freq> P=<power> <state> <mode>`
fn parse_channel_line(line: &str) -> Result<(i64, ChannelStatus), String> {
    let mut tokens = line.split_whitespace();

    let marker = tokens.next().ok_or("empty line")?;
    let index = marker
        .strip_prefix('l')
        .or_else(|| marker.strip_prefix('L'))
        .ok_or_else(|| format!("expected 'l<channel>', got '{marker}'"))?;
    let channel = index
        .parse::<i64>()
        .map_err(|_| format!("invalid channel index '{index}'"))?;

    let frequency_mhz = keyed_value(&mut tokens, "F")?;
    let power = keyed_value(&mut tokens, "P")?;
    let state = state_flag(tokens.next())?;
    let mode = mode_flag(tokens.next())?;
    if let Some(extra) = tokens.next() {
        return Err(format!("unexpected trailing token '{extra}'"));
    }

    Ok((
        channel,
        ChannelStatus {
            frequency_mhz,
            power,
            state,
            mode,
        },
    ))
}

/// `<label> <state> <mode>`
fn parse_blanking_line(line: &str) -> Result<BlankingStatus, String> {
    let mut tokens = line.split_whitespace();
    tokens.next().ok_or("empty blanking line")?;
    let state = state_flag(tokens.next())?;
    let mode = mode_flag(tokens.next())?;
    if let Some(extra) = tokens.next() {
        return Err(format!("unexpected trailing token '{extra}'"));
    }
    Ok(BlankingStatus { state, mode })
}

/// Read `KEY=value`, tolerating whitespace after the `=` (`F= 88.000`).
fn keyed_value<'a>(tokens: &mut impl Iterator<Item = &'a str>, key: &str) -> Result<f64, String> {
    let token = tokens.next().ok_or_else(|| format!("missing {key}= field"))?;
    let value = match token.strip_prefix(key).and_then(|t| t.strip_prefix('=')) {
        Some("") => tokens
            .next()
            .ok_or_else(|| format!("missing value after {key}="))?,
        Some(v) => v,
        None => return Err(format!("expected '{key}=', got '{token}'")),
    };
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("invalid {key} value '{value}'"))
}

fn state_flag(token: Option<&str>) -> Result<StateFlag, String> {
    let token = token.ok_or("missing state flag")?;
    StateFlag::parse(token).ok_or_else(|| format!("unknown state flag '{token}'"))
}

fn mode_flag(token: Option<&str>) -> Result<ModeFlag, String> {
    let token = token.ok_or("missing mode flag")?;
    ModeFlag::parse(token).ok_or_else(|| format!("unknown mode flag '{token}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LineEnding;
    use Command::*;

    fn plain() -> Dialect {
        Dialect::default()
    }

    fn prompted() -> Dialect {
        Dialect {
            prompted_replies: true,
            ..Dialect::default()
        }
    }

    fn status_reply(channel_lines: usize, eol: &str) -> String {
        let mut reply = String::new();
        for c in 1..=channel_lines {
            reply += &format!("l{c} F={:.3} P={:.3} ON INT{eol}", 80.0 + c as f64, 10.5);
        }
        reply += &format!("Blanking ON EXT{eol}");
        reply
    }

    fn malformed_line(result: AotfResult<Reply>) -> Option<usize> {
        match result {
            Err(AotfError::MalformedReply { line, .. }) => line,
            other => panic!("expected MalformedReply, got {other:?}"),
        }
    }

    // --- Scalars ---

    #[test]
    fn decode_frequency() {
        assert_eq!(
            decode(b"88.000\r", &FrequencyQuery, &plain()).unwrap(),
            Reply::FrequencyMhz(88.0)
        );
    }

    #[test]
    fn decode_frequency_garbage_is_malformed() {
        assert!(matches!(
            decode(b"abc\r", &FrequencyQuery, &plain()),
            Err(AotfError::MalformedReply { line: None, .. })
        ));
        assert!(decode(b"NaN\r", &FrequencyQuery, &plain()).is_err());
    }

    #[test]
    fn decode_channel() {
        assert_eq!(
            decode(b"4\r", &ChannelQuery, &plain()).unwrap(),
            Reply::Channel(Channel::new(4).unwrap())
        );
    }

    #[test]
    fn decode_channel_out_of_range_is_malformed() {
        assert!(matches!(
            decode(b"9\r", &ChannelQuery, &plain()),
            Err(AotfError::MalformedReply { .. })
        ));
        assert!(decode(b"-1\r", &ChannelQuery, &plain()).is_err());
    }

    #[test]
    fn decode_coarse_power() {
        assert_eq!(
            decode(b"0512\r", &PowerQuery, &plain()).unwrap(),
            Reply::CoarsePower(512)
        );
        assert!(decode(b"70000\r", &PowerQuery, &plain()).is_err());
        assert!(decode(b"12.5\r", &PowerQuery, &plain()).is_err());
    }

    #[test]
    fn decode_fine_power() {
        assert_eq!(
            decode(b"15.25\r", &FinePowerQuery, &plain()).unwrap(),
            Reply::FinePowerDbm(15.25)
        );
    }

    #[test]
    fn decode_with_crlf_dialect() {
        let dialect = Dialect {
            line_ending: LineEnding::CrLf,
            prompted_replies: false,
        };
        assert_eq!(
            decode(b"0042\r\n", &PowerQuery, &dialect).unwrap(),
            Reply::CoarsePower(42)
        );
    }

    // --- Enumerations ---

    #[test]
    fn decode_enumerations() {
        assert_eq!(
            decode(b"1\r", &DriverModeQuery, &plain()).unwrap(),
            Reply::DriverMode(DriverMode::External)
        );
        assert_eq!(
            decode(b"0\r", &PllQuery, &plain()).unwrap(),
            Reply::Pll(PllState::Off)
        );
        assert_eq!(
            decode(b"1\r", &VoltageRangeQuery, &plain()).unwrap(),
            Reply::VoltageRange(VoltageRange::ZeroToTen)
        );
    }

    #[test]
    fn decode_unknown_digit_is_unrecognized_code() {
        match decode(b"7\r", &PllQuery, &plain()) {
            Err(AotfError::UnrecognizedCode { raw }) => assert_eq!(raw, "7"),
            other => panic!("expected UnrecognizedCode, got {other:?}"),
        }
    }

    // --- Product id / acks ---

    #[test]
    fn decode_product_id() {
        assert_eq!(
            decode(b"MPDS8C-3 v1.4\r", &ProductIdQuery, &plain()).unwrap(),
            Reply::ProductId("MPDS8C-3 v1.4".into())
        );
        assert!(decode(b"\r", &ProductIdQuery, &plain()).is_err());
    }

    #[test]
    fn decode_set_commands_ack() {
        assert_eq!(decode(b"\r", &Reset, &plain()).unwrap(), Reply::Ack);
        assert_eq!(
            decode(b"F012.500\r", &FrequencyAdjust(12.5), &plain()).unwrap(),
            Reply::Ack
        );
    }

    #[test]
    fn decode_rejected_set_is_malformed() {
        assert!(matches!(
            decode(b"?\r", &PllSwitch(PllState::On), &plain()),
            Err(AotfError::MalformedReply { line: None, .. })
        ));
        assert!(matches!(
            decode(b" ? \r", &ChannelSelect(Channel::new(2).unwrap()), &plain()),
            Err(AotfError::MalformedReply { .. })
        ));
    }

    #[test]
    fn decode_rejects_non_ascii_reply() {
        assert!(matches!(
            decode("\u{e9}\r".as_bytes(), &ProductIdQuery, &plain()),
            Err(AotfError::MalformedReply { .. })
        ));
    }

    // --- Prompted framing ---

    #[test]
    fn decode_prompted_frequency() {
        assert_eq!(
            decode(b"\r88.500?", &FrequencyQuery, &prompted()).unwrap(),
            Reply::FrequencyMhz(88.5)
        );
        assert_eq!(
            decode(b"\r3?", &ChannelQuery, &prompted()).unwrap(),
            Reply::Channel(Channel::new(3).unwrap())
        );
    }

    #[test]
    fn decode_prompted_without_sentinel_is_malformed() {
        assert!(matches!(
            decode(b"\r88.500\r", &FrequencyQuery, &prompted()),
            Err(AotfError::MalformedReply { .. })
        ));
    }

    #[test]
    fn prompted_dialect_keeps_plain_framing_for_other_queries() {
        assert_eq!(
            decode(b"0042\r", &PowerQuery, &prompted()).unwrap(),
            Reply::CoarsePower(42)
        );
    }

    // --- Line status ---

    #[test]
    fn decode_line_status_full() {
        let reply = status_reply(8, "\r");
        let Reply::LineStatus(status) = decode(reply.as_bytes(), &LinesStatusQuery, &plain())
            .unwrap()
        else {
            panic!("expected LineStatus");
        };
        assert_eq!(status.channels().count(), 8);
        let ch3 = status.channel(Channel::new(3).unwrap());
        assert_eq!(ch3.frequency_mhz, 83.0);
        assert_eq!(ch3.power, 10.5);
        assert_eq!(ch3.state, StateFlag::On);
        assert_eq!(ch3.mode, ModeFlag::Internal);
        assert_eq!(status.blanking().mode, ModeFlag::External);
    }

    #[test]
    fn decode_line_status_wrong_channel_count() {
        for count in [7, 9] {
            let reply = status_reply(count, "\r");
            assert_eq!(
                malformed_line(decode(reply.as_bytes(), &LinesStatusQuery, &plain())),
                None,
                "{count} channel lines should fail"
            );
        }
    }

    #[test]
    fn decode_line_status_channel_nine_names_line_three() {
        let reply = status_reply(8, "\r").replacen("l3 ", "l9 ", 1);
        assert_eq!(
            malformed_line(decode(reply.as_bytes(), &LinesStatusQuery, &plain())),
            Some(3)
        );
    }

    #[test]
    fn decode_line_status_duplicate_channel() {
        let reply = status_reply(8, "\r").replacen("l5 ", "l4 ", 1);
        assert_eq!(
            malformed_line(decode(reply.as_bytes(), &LinesStatusQuery, &plain())),
            Some(5)
        );
    }

    #[test]
    fn decode_line_status_bad_template() {
        let reply = status_reply(8, "\r").replacen("P=10.500 ON INT", "P=10.500 ON", 1);
        assert_eq!(
            malformed_line(decode(reply.as_bytes(), &LinesStatusQuery, &plain())),
            Some(1)
        );
        let reply = status_reply(8, "\r").replace("Blanking ON EXT", "Blanking ON");
        assert_eq!(
            malformed_line(decode(reply.as_bytes(), &LinesStatusQuery, &plain())),
            Some(9)
        );
    }

    #[test]
    fn decode_line_status_padded_fields_and_uppercase_marker() {
        let mut reply = String::new();
        for c in 1..=8 {
            reply += &format!("L{c} F= 88.000 P= 12.250 off ext\r");
        }
        reply += "Blanking OFF INT\r";
        let Reply::LineStatus(status) =
            decode(reply.as_bytes(), &LinesStatusQuery, &plain()).unwrap()
        else {
            panic!("expected LineStatus");
        };
        let ch8 = status.channel(Channel::new(8).unwrap());
        assert_eq!(ch8.frequency_mhz, 88.0);
        assert_eq!(ch8.power, 12.25);
        assert_eq!(ch8.state, StateFlag::Off);
        assert_eq!(ch8.mode, ModeFlag::External);
    }

    #[test]
    fn decode_line_status_crlf() {
        let dialect = Dialect {
            line_ending: LineEnding::CrLf,
            prompted_replies: false,
        };
        let reply = status_reply(8, "\r\n");
        assert!(decode(reply.as_bytes(), &LinesStatusQuery, &dialect).is_ok());
    }

    #[test]
    fn decode_non_ascii_is_malformed() {
        assert!(matches!(
            decode(&[0xff, b'\r'], &FrequencyQuery, &plain()),
            Err(AotfError::MalformedReply { .. })
        ));
    }
}
