//! Telnet option negotiation (RFC 854/855).
//!
//! [`TelnetFilter`] separates payload bytes from `IAC` command sequences.
//! State survives across calls, so a command split between two reads is
//! still recognized. Replies are only produced when an option actually
//! changes state, which keeps two agreeing peers from looping.

use log::debug;

use crate::SessionSize;

pub(crate) const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;
pub(crate) const NOP: u8 = 241;

const OPT_BINARY: u8 = 0;
const OPT_ECHO: u8 = 1;
const OPT_SGA: u8 = 3;
const OPT_TTYPE: u8 = 24;
pub(crate) const OPT_NAWS: u8 = 31;

const TTYPE_IS: u8 = 0;
const TTYPE_SEND: u8 = 1;

/// Terminal type reported for TTYPE.
const TERMINAL_TYPE: &[u8] = b"ANSI";

/// Cap on a single subnegotiation payload.
const MAX_SUBNEGOTIATION: usize = 256;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum State {
    #[default]
    Data,
    Iac,
    Option(u8),
    Sub,
    SubIac,
}

/// Output of one [`TelnetFilter::advance`] call.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Filtered {
    /// Payload bytes for the application.
    pub data: Vec<u8>,
    /// Bytes that must be written back to the peer.
    pub replies: Vec<u8>,
    /// NAWS was just agreed; the caller should treat the size as sent.
    pub naws_enabled: bool,
}

#[derive(Debug)]
pub(crate) struct TelnetFilter {
    state: State,
    sub: Vec<u8>,
    /// Options we perform (answered `WILL`).
    local: [bool; 256],
    /// Options the peer performs (answered `DO`).
    remote: [bool; 256],
}

impl Default for TelnetFilter {
    fn default() -> Self {
        Self {
            state: State::Data,
            sub: Vec::new(),
            local: [false; 256],
            remote: [false; 256],
        }
    }
}

impl TelnetFilter {
    pub(crate) fn advance(
        &mut self,
        input: &[u8],
        size: SessionSize,
    ) -> Filtered {
        let mut out = Filtered {
            data: Vec::with_capacity(input.len()),
            ..Filtered::default()
        };

        for &byte in input {
            self.state = match (self.state, byte) {
                (State::Data, IAC) => State::Iac,
                (State::Data, byte) => {
                    out.data.push(byte);
                    State::Data
                },
                (State::Iac, IAC) => {
                    out.data.push(IAC);
                    State::Data
                },
                (State::Iac, DO | DONT | WILL | WONT) => State::Option(byte),
                (State::Iac, SB) => {
                    self.sub.clear();
                    State::Sub
                },
                (State::Iac, _) => State::Data,
                (State::Option(command), option) => {
                    self.negotiate(command, option, size, &mut out);
                    State::Data
                },
                (State::Sub, IAC) => State::SubIac,
                (State::Sub, byte) => {
                    if self.sub.len() < MAX_SUBNEGOTIATION {
                        self.sub.push(byte);
                    }
                    State::Sub
                },
                (State::SubIac, SE) => {
                    self.subnegotiate(&mut out.replies);
                    State::Data
                },
                (State::SubIac, IAC) => {
                    if self.sub.len() < MAX_SUBNEGOTIATION {
                        self.sub.push(IAC);
                    }
                    State::Sub
                },
                (State::SubIac, _) => State::Sub,
            };
        }

        out
    }

    fn negotiate(
        &mut self,
        command: u8,
        option: u8,
        size: SessionSize,
        out: &mut Filtered,
    ) {
        let idx = usize::from(option);
        match command {
            DO => {
                let supported = matches!(
                    option,
                    OPT_BINARY | OPT_SGA | OPT_TTYPE | OPT_NAWS
                );
                if !supported {
                    debug!("[telnet] refusing DO {option}");
                    out.replies.extend_from_slice(&[IAC, WONT, option]);
                    return;
                }
                if !self.local[idx] {
                    self.local[idx] = true;
                    out.replies.extend_from_slice(&[IAC, WILL, option]);
                }
                if option == OPT_NAWS {
                    out.replies.extend(naws_payload(size));
                    out.naws_enabled = true;
                }
            },
            DONT => {
                if self.local[idx] {
                    self.local[idx] = false;
                    out.replies.extend_from_slice(&[IAC, WONT, option]);
                }
            },
            WILL => {
                let supported =
                    matches!(option, OPT_BINARY | OPT_ECHO | OPT_SGA);
                if !supported {
                    debug!("[telnet] refusing WILL {option}");
                    out.replies.extend_from_slice(&[IAC, DONT, option]);
                    return;
                }
                if !self.remote[idx] {
                    self.remote[idx] = true;
                    out.replies.extend_from_slice(&[IAC, DO, option]);
                }
            },
            WONT => {
                if self.remote[idx] {
                    self.remote[idx] = false;
                    out.replies.extend_from_slice(&[IAC, DONT, option]);
                }
            },
            _ => {},
        }
    }

    fn subnegotiate(&mut self, replies: &mut Vec<u8>) {
        match self.sub.as_slice() {
            [OPT_TTYPE, TTYPE_SEND, ..] => {
                replies.extend_from_slice(&[IAC, SB, OPT_TTYPE, TTYPE_IS]);
                replies.extend_from_slice(TERMINAL_TYPE);
                replies.extend_from_slice(&[IAC, SE]);
            },
            other => debug!("[telnet] ignoring subnegotiation {other:?}"),
        }
        self.sub.clear();
    }
}

/// `IAC SB NAWS <cols> <rows> IAC SE`, with 255 bytes doubled.
pub(crate) fn naws_payload(size: SessionSize) -> Vec<u8> {
    let mut payload = vec![IAC, SB, OPT_NAWS];
    let [c0, c1] = size.cols.to_be_bytes();
    let [r0, r1] = size.rows.to_be_bytes();
    for byte in [c0, c1, r0, r1] {
        payload.push(byte);
        if byte == IAC {
            payload.push(IAC);
        }
    }
    payload.extend_from_slice(&[IAC, SE]);
    payload
}

/// Double every `IAC` so payload bytes are not read as commands.
pub(crate) fn escape_iac(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    for &byte in input {
        out.push(byte);
        if byte == IAC {
            out.push(IAC);
        }
    }
    out
}
