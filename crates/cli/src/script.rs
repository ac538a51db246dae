//! Recorded editor sessions replayed against an [`EditorSession`].

use anyhow::{Context, Result};
use pdf_annotator_core::{EditorSession, ScreenPoint, Tool};
use pdf_engine::PdfEngine;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub steps: Vec<ScriptStep>,
}

/// One UI event. Pointer coordinates are screen pixels at the current scale.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptStep {
    SetTool { tool: Tool },
    SetFontSize { size: f32 },
    SetScale { scale: f32 },
    NextPage,
    PreviousPage,
    GoToPage { page: u32 },
    Click { x: f32, y: f32 },
    DoubleClick { x: f32, y: f32 },
    Press { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Release,
    Input { text: String },
    Blur,
    /// Delete the selected annotation
    Delete,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse script {}", path.display()))
    }

    pub fn replay<E: PdfEngine>(&self, session: &mut EditorSession<E>) -> Result<()> {
        for (index, step) in self.steps.iter().enumerate() {
            apply(session, step).with_context(|| format!("script step {} failed", index + 1))?;
        }
        Ok(())
    }
}

fn apply<E: PdfEngine>(session: &mut EditorSession<E>, step: &ScriptStep) -> Result<()> {
    log::debug!("replaying {step:?}");
    match step {
        ScriptStep::SetTool { tool } => session.set_tool(*tool),
        ScriptStep::SetFontSize { size } => session.set_font_size(*size)?,
        ScriptStep::SetScale { scale } => session.set_scale(*scale)?,
        ScriptStep::NextPage => session.next_page(),
        ScriptStep::PreviousPage => session.previous_page(),
        ScriptStep::GoToPage { page } => session.go_to_page(*page),
        ScriptStep::Click { x, y } => {
            session.click(ScreenPoint::new(*x, *y));
        }
        ScriptStep::DoubleClick { x, y } => {
            session.double_click(ScreenPoint::new(*x, *y));
        }
        ScriptStep::Press { x, y } => session.pointer_down(ScreenPoint::new(*x, *y)),
        ScriptStep::Move { x, y } => session.pointer_move(ScreenPoint::new(*x, *y)),
        ScriptStep::Release => session.pointer_up(),
        ScriptStep::Input { text } => session.input_text(text),
        ScriptStep::Blur => session.blur(),
        ScriptStep::Delete => {
            session.delete_selected();
        }
    }
    Ok(())
}
