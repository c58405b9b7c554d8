// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Filename: <test_util.rs>

use chrono::Utc;

use crate::message::SmsMessage;

/// An outbound message as a bus client would publish it.
pub fn outbound(content: &str, receiver: &str) -> SmsMessage {
    SmsMessage {
        content: content.to_string(),
        timestamp: Utc::now(),
        sender: None,
        receiver: Some(receiver.to_string()),
    }
}
