//! Pure encoding: Command → AOTF wire string.
//!
//! No I/O, no side effects. Field widths are fixed by the firmware and
//! zero-padded; the line ending comes from the firmware dialect.

use crate::domain::LineEnding;

use super::Command;

/// Encode a Command into the wire string, including the line ending.
pub fn encode(cmd: &Command, line_ending: LineEnding) -> String {
    use Command::*;
    let root = cmd.root();
    let body = match cmd {
        ChannelSelect(channel) => format!("{root}{channel}"),
        FrequencyAdjust(mhz) => format!("{root}{mhz:07.3}"),
        CoarsePowerAdjust(level) => format!("{root}{level:04}"),
        FinePowerAdjust(dbm) => format!("{root}{dbm:05.2}"),
        DriverModeSet(mode) => format!("{root}{}", mode.code()),
        PllSwitch(state) => format!("{root}{}", state.code()),
        VoltageRangeSet(range) => format!("{root}{}", range.code()),
        Reset | DataStorage => root.to_string(),
        LinesStatusQuery | ChannelQuery | FrequencyQuery | PowerQuery | FinePowerQuery
        | DriverModeQuery | PllQuery | VoltageRangeQuery | ProductIdQuery => format!("{root}?"),
    };
    body + line_ending.as_str()
}
