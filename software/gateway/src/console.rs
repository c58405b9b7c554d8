// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Filename: <console.rs>

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite};

use crate::error::Result;
use crate::modem::Modem;

pub const QUIT: &str = "QUIT";

/// Passes operator lines to the modem verbatim until `QUIT` or end of input.
pub async fn run_console<R, W>(input: R, modem: Option<&Modem<W>>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.eq_ignore_ascii_case(QUIT) {
            log::info!("[Console] Quit requested");
            break;
        }

        log::info!("PC: {}", line);
        match modem {
            Some(modem) => {
                if let Err(e) = modem.write_line(&line).await {
                    log::error!("[Console] Could not write to modem: {}", e);
                }
            }
            None => log::warn!("[Console] No modem, line discarded"),
        }
    }
    Ok(())
}
