//! Terminal rendering of presentation blocks.

use std::io::{self, Write};

use anyhow::Context;
use docdesk_core::response::{render_payload, render_turn, AssistantPayload, Block, Icon, Turn};

use crate::error::AppError;

const USER_PROMPT: &str = "you";
const ASSISTANT_PROMPT: &str = "docdesk";

fn glyph(icon: Icon) -> &'static str {
    match icon {
        Icon::Link => "🔗",
        Icon::Document => "📄",
    }
}

pub fn write_blocks<W: Write>(out: &mut W, blocks: &[Block]) -> io::Result<()> {
    for block in blocks {
        match block {
            Block::Markdown(text) => writeln!(out, "{}", text)?,
            Block::Success { text, icon } => writeln!(out, "  ✔ {} {}", glyph(*icon), text)?,
            Block::Info { text, icon } => writeln!(out, "    {} {}", glyph(*icon), text)?,
            Block::Divider => writeln!(out, "{}", "-".repeat(40))?,
            Block::Heading(text) => writeln!(out, "## {}", text)?,
        }
    }
    Ok(())
}

/// Show a fresh answer. A write failure is a non-fatal display error.
pub fn write_answer<W: Write>(out: &mut W, payload: &AssistantPayload) -> Result<(), AppError> {
    write_blocks(out, &render_payload(payload))
        .and_then(|()| out.flush())
        .context("failed to write answer")
        .map_err(|e| AppError::Display(e).logged())
}

/// One stored turn, prefixed with who said it.
pub fn write_turn<W: Write>(out: &mut W, turn: &Turn) -> io::Result<()> {
    let who = match turn {
        Turn::User(_) => USER_PROMPT,
        Turn::Assistant(_) => ASSISTANT_PROMPT,
    };
    writeln!(out, "[{}]", who)?;
    write_blocks(out, &render_turn(turn))?;
    writeln!(out)
}
