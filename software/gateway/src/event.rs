// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Filename: <event.rs>

/// Unsolicited "new message stored in ME" indication.
pub const NEW_MESSAGE_INDICATOR: &str = "+CMTI: \"ME\"";
/// Prefix of every entry in a message listing response.
pub const LISTING_MARKER: &str = "+CMGL:";

/// What a chunk of modem output means to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemEvent {
    NewMessage,
    Listing,
    Info,
}

impl ModemEvent {
    /// First match wins: an indicator takes precedence over a listing.
    pub fn classify(text: &str) -> Self {
        if text.contains(NEW_MESSAGE_INDICATOR) {
            ModemEvent::NewMessage
        } else if text.contains(LISTING_MARKER) {
            ModemEvent::Listing
        } else {
            ModemEvent::Info
        }
    }
}

/// Upper bound for a buffered listing that never sees its result code.
pub const MAX_PENDING: usize = 64 * 1024;

/// Joins serial reads into whole notifications.
///
/// A listing arrives over several reads at modem baud rates; it is held back
/// until the final result code (`OK`, `ERROR`, `+CMS ERROR: n`) ends it.
/// Everything else is released as soon as it is read.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    pending: String,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one read; returns the text to handle once it is complete.
    pub fn push(&mut self, chunk: &str) -> Option<String> {
        self.pending.push_str(chunk);

        let waiting =
            self.pending.contains(LISTING_MARKER) && !has_final_result(&self.pending);
        if waiting {
            if self.pending.len() < MAX_PENDING {
                return None;
            }
            log::warn!(
                "[Port] Listing exceeded {} bytes without a result code, handling it as is",
                MAX_PENDING
            );
        }
        Some(std::mem::take(&mut self.pending))
    }

    /// Releases whatever is held, complete or not.
    pub fn flush(&mut self) -> Option<String> {
        (!self.pending.is_empty()).then(|| std::mem::take(&mut self.pending))
    }
}

/// True when the last line of `text` is a final result code.
fn has_final_result(text: &str) -> bool {
    if !text.ends_with('\n') {
        return false;
    }
    let last = text.trim_end().rsplit('\n').next().unwrap_or("").trim();
    last == "OK" || last == "ERROR" || last.starts_with("+CMS ERROR") || last.starts_with("+CME ERROR")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_modem_output() {
        assert_eq!(ModemEvent::classify("\r\n+CMTI: \"ME\",3\r\n"), ModemEvent::NewMessage);
        assert_eq!(
            ModemEvent::classify("+CMGL: 1,\"REC UNREAD\",\"1\",,\"t\"\r\nx\r\n"),
            ModemEvent::Listing
        );
        assert_eq!(ModemEvent::classify("\r\nOK\r\n"), ModemEvent::Info);
        assert_eq!(ModemEvent::classify("+CMTI: \"SM\",1"), ModemEvent::Info);
    }

    const LISTING: &str = "AT+CMGL=\"ALL\"\r\r\n+CMGL: 1,\"REC UNREAD\",\"12345\",,\"24/05/01,12:30:45+08\"\r\nHello\r\n\r\nOK\r\n";

    #[test]
    fn listing_split_across_reads_is_joined() {
        let split = LISTING.find("12:30").unwrap();
        let mut buffer = ResponseBuffer::new();

        assert_eq!(buffer.push(&LISTING[..split]), None);
        assert_eq!(buffer.push(&LISTING[split..]).as_deref(), Some(LISTING));
        assert_eq!(buffer.flush(), None);
    }

    #[test]
    fn result_code_must_end_the_read() {
        let mut buffer = ResponseBuffer::new();
        // "OK" without its line end may still be the start of a body.
        assert_eq!(buffer.push(&LISTING[..LISTING.len() - 2]), None);
        assert_eq!(buffer.push("\r\n").as_deref(), Some(LISTING));
    }

    #[test]
    fn error_result_releases_listing() {
        let mut buffer = ResponseBuffer::new();
        assert_eq!(buffer.push("+CMGL: 1,\"REC UNREAD\",\"1"), None);
        let text = buffer.push("\r\n+CMS ERROR: 321\r\n").unwrap();
        assert!(text.ends_with("+CMS ERROR: 321\r\n"));
    }

    #[test]
    fn other_output_passes_straight_through() {
        let mut buffer = ResponseBuffer::new();
        assert_eq!(buffer.push("\r\nOK\r\n").as_deref(), Some("\r\nOK\r\n"));
        assert_eq!(
            buffer.push("\r\n+CMTI: \"ME\",2\r\n").as_deref(),
            Some("\r\n+CMTI: \"ME\",2\r\n")
        );
        assert_eq!(buffer.flush(), None);
    }

    #[test]
    fn oversized_listing_is_released() {
        let mut buffer = ResponseBuffer::new();
        assert_eq!(buffer.push("+CMGL: 1,\"REC UNREAD\",\"1\",,\"t\"\r\n"), None);
        let filler = "x".repeat(MAX_PENDING);
        assert!(buffer.push(&filler).is_some());
        assert_eq!(buffer.flush(), None);
    }

    #[test]
    fn flush_releases_incomplete_listing() {
        let mut buffer = ResponseBuffer::new();
        assert_eq!(buffer.push("+CMGL: 1,\"REC UNREAD\""), None);
        assert_eq!(buffer.flush().as_deref(), Some("+CMGL: 1,\"REC UNREAD\""));
        assert_eq!(buffer.flush(), None);
    }

    #[test]
    fn indicator_wins_over_listing() {
        let text = "+CMGL: 1,\"REC READ\",\"1\",,\"t\"\r\nx\r\n+CMTI: \"ME\",2\r\n";
        assert_eq!(ModemEvent::classify(text), ModemEvent::NewMessage);
    }
}
