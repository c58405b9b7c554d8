// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Filename: <parser.rs>

//! Text-mode `+CMGL` listing parser.
//!
//! A listing looks like
//!
//! ```text
//! +CMGL: 1,"REC UNREAD","+31628870634",,"11/01/09,10:26:26+04"
//! This is text message 1
//! +CMGL: 2,"REC READ","+31628870634",,"11/01/09,10:26:49+04"
//! This is text message 2
//!
//! OK
//! ```
//!
//! Field lengths vary, so every field is located relative to the end of the
//! previous one. A missing delimiter ends the scan; entries read up to that
//! point are kept.

use crate::message::SmsMessage;

pub const UNREAD_STATUS: &str = "REC UNREAD";

/// Forward-only scanner over the listing text.
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Cursor { text, pos: 0 }
    }

    /// Moves past the next occurrence of `delim`.
    fn skip_past(&mut self, delim: &str) -> Option<()> {
        let found = self.text[self.pos..].find(delim)?;
        self.pos += found + delim.len();
        Some(())
    }

    /// Returns the text up to the next `delim` and moves past the delimiter.
    fn take_until(&mut self, delim: &str) -> Option<&'a str> {
        let rest = &self.text[self.pos..];
        let found = rest.find(delim)?;
        self.pos += found + delim.len();
        Some(&rest[..found])
    }
}

/// One header/content pair of a listing.
#[derive(Debug, PartialEq)]
struct ListingEntry<'a> {
    index: &'a str,
    status: &'a str,
    sender: &'a str,
    alpha: &'a str,
    timestamp: &'a str,
    content: &'a str,
}

impl<'a> ListingEntry<'a> {
    /// Reads the fields following a header `:`.
    fn read(cursor: &mut Cursor<'a>) -> Option<Self> {
        let index = cursor.take_until(",")?.trim();

        cursor.skip_past("\"")?;
        let status = cursor.take_until("\"")?;

        cursor.skip_past(",\"")?;
        let sender = cursor.take_until("\"")?;

        cursor.skip_past(",")?;
        let alpha = cursor.take_until(",")?;

        cursor.skip_past("\"")?;
        let timestamp = cursor.take_until("\"")?;

        cursor.skip_past("\n")?;
        let content = cursor.take_until("\r")?;

        Some(ListingEntry {
            index,
            status,
            sender,
            alpha,
            timestamp,
            content,
        })
    }
}

/// Extracts every unread message from a listing response, in listing order.
pub fn parse_listing(text: &str) -> Vec<SmsMessage> {
    let mut cursor = Cursor::new(text);
    let mut messages = Vec::new();

    while cursor.skip_past(":").is_some() {
        let Some(entry) = ListingEntry::read(&mut cursor) else {
            log::warn!(
                "[Parser] Malformed listing after {} message(s), rest ignored",
                messages.len()
            );
            break;
        };

        log::debug!(
            "[Parser] Index: {}, Status: {}, Sender: {}, Unknown: {}, Time: {}, Content: {}",
            entry.index,
            entry.status,
            entry.sender,
            entry.alpha,
            entry.timestamp,
            entry.content
        );

        if entry.status != UNREAD_STATUS {
            log::warn!("[Parser] Message {} already read, skipping", entry.index);
            continue;
        }

        messages.push(SmsMessage::inbound(entry.content, entry.sender));
    }

    messages
}
