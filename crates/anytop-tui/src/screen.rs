//! The rendering backend as seen by the renderer: a grid of text rows.

use anyhow::{Context, Result};
use ratatui::Terminal;
use ratatui::backend::Backend;
use ratatui::text::Line;
use ratatui::widgets::Paragraph;

/// A fixed-size character grid that is repainted in full every frame.
pub trait Screen {
    /// Current `(rows, cols)`.
    ///
    /// # Errors
    /// Returns an error if the backend cannot report its size.
    fn size(&self) -> Result<(u16, u16)>;

    /// Replaces the whole grid; `rows[i]` is drawn on screen row `i`.
    ///
    /// # Errors
    /// Returns an error if the frame cannot be drawn.
    fn paint(&mut self, rows: &[String]) -> Result<()>;
}

impl<B> Screen for Terminal<B>
where
    B: Backend,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    fn size(&self) -> Result<(u16, u16)> {
        let size = Terminal::size(self).context("Failed to query terminal size")?;
        Ok((size.height, size.width))
    }

    fn paint(&mut self, rows: &[String]) -> Result<()> {
        let lines: Vec<Line<'_>> = rows.iter().map(|row| Line::raw(row.as_str())).collect();
        self.draw(|frame| frame.render_widget(Paragraph::new(lines), frame.area()))
            .context("Failed to draw frame")?;
        Ok(())
    }
}
