//! Styled report model and the painter that writes it to a terminal.
//!
//! Views build a [`Report`] out of ratatui [`Line`]s and simple tables; the
//! [`Painter`] turns that into crossterm styling commands, or plain text when
//! color is off.

use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{
    Attribute, Color as TermColor, Print, ResetColor, SetAttribute, SetBackgroundColor,
    SetForegroundColor,
};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::format::{display_width, pad_right};

const COLUMN_GAP: &str = "  ";

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub label: String,
    /// Minimum display width; the column grows to fit its widest cell.
    pub width: Option<usize>,
}

impl Column {
    pub fn new(label: impl Into<String>, width: Option<usize>) -> Self {
        Self {
            label: label.into(),
            width,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Line<'static>>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Line<'static>>) {
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                let widest_cell = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(index))
                    .map(line_width)
                    .max()
                    .unwrap_or(0);
                display_width(&column.label)
                    .max(column.width.unwrap_or(0))
                    .max(widest_cell)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Line(Line<'static>),
    Table(Table),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub blocks: Vec<Block>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, line: impl Into<Line<'static>>) {
        self.blocks.push(Block::Line(line.into()));
    }

    pub fn blank(&mut self) {
        self.line(Line::default());
    }

    pub fn table(&mut self, table: Table) {
        self.blocks.push(Block::Table(table));
    }

    /// The report as it prints without color.
    pub fn plain_text(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = Painter::new(false).paint(self, &mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

pub fn line_width(line: &Line<'_>) -> usize {
    line.spans
        .iter()
        .map(|span| display_width(&span.content))
        .sum()
}

pub struct Painter {
    color: bool,
}

impl Painter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn paint(&self, report: &Report, out: &mut impl Write) -> io::Result<()> {
        for block in &report.blocks {
            match block {
                Block::Line(line) => {
                    self.paint_line(line, out)?;
                    queue!(out, Print("\n"))?;
                }
                Block::Table(table) => self.paint_table(table, out)?,
            }
        }
        out.flush()
    }

    fn paint_table(&self, table: &Table, out: &mut impl Write) -> io::Result<()> {
        let widths = table.widths();
        let header_style = Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD);
        let last = widths.len().saturating_sub(1);

        for (index, (column, width)) in table.columns.iter().zip(&widths).enumerate() {
            let label = if index == last {
                column.label.clone()
            } else {
                pad_right(&column.label, *width)
            };
            self.paint_span(&Span::styled(label, header_style), Style::default(), out)?;
            if index != last {
                queue!(out, Print(COLUMN_GAP))?;
            }
        }
        queue!(out, Print("\n"))?;

        let rule_width =
            widths.iter().sum::<usize>() + COLUMN_GAP.len() * widths.len().saturating_sub(1);
        let rule = Span::styled("─".repeat(rule_width), styles::separator());
        self.paint_span(&rule, Style::default(), out)?;
        queue!(out, Print("\n"))?;

        for row in &table.rows {
            for (index, width) in widths.iter().enumerate() {
                let cell = row.get(index);
                if let Some(cell) = cell {
                    self.paint_line(cell, out)?;
                }
                if index != last {
                    let used = cell.map(line_width).unwrap_or(0);
                    let pad = width.saturating_sub(used);
                    queue!(out, Print(" ".repeat(pad)), Print(COLUMN_GAP))?;
                }
            }
            queue!(out, Print("\n"))?;
        }
        Ok(())
    }

    fn paint_line(&self, line: &Line<'_>, out: &mut impl Write) -> io::Result<()> {
        for span in &line.spans {
            self.paint_span(span, line.style, out)?;
        }
        Ok(())
    }

    fn paint_span(&self, span: &Span<'_>, base: Style, out: &mut impl Write) -> io::Result<()> {
        let style = base.patch(span.style);
        if !self.color || style == Style::default() {
            queue!(out, Print(span.content.as_ref()))?;
            return Ok(());
        }

        if let Some(fg) = style.fg.and_then(term_color) {
            queue!(out, SetForegroundColor(fg))?;
        }
        if let Some(bg) = style.bg.and_then(term_color) {
            queue!(out, SetBackgroundColor(bg))?;
        }
        for attribute in attributes(style.add_modifier) {
            queue!(out, SetAttribute(attribute))?;
        }
        queue!(
            out,
            Print(span.content.as_ref()),
            SetAttribute(Attribute::Reset),
            ResetColor
        )?;
        Ok(())
    }
}

fn attributes(modifier: Modifier) -> Vec<Attribute> {
    [
        (Modifier::BOLD, Attribute::Bold),
        (Modifier::DIM, Attribute::Dim),
        (Modifier::ITALIC, Attribute::Italic),
        (Modifier::UNDERLINED, Attribute::Underlined),
        (Modifier::REVERSED, Attribute::Reverse),
    ]
    .into_iter()
    .filter(|(flag, _)| modifier.contains(*flag))
    .map(|(_, attribute)| attribute)
    .collect()
}

fn term_color(color: Color) -> Option<TermColor> {
    let mapped = match color {
        Color::Reset => return None,
        Color::Black => TermColor::Black,
        Color::Red => TermColor::DarkRed,
        Color::Green => TermColor::DarkGreen,
        Color::Yellow => TermColor::DarkYellow,
        Color::Blue => TermColor::DarkBlue,
        Color::Magenta => TermColor::DarkMagenta,
        Color::Cyan => TermColor::DarkCyan,
        Color::Gray => TermColor::Grey,
        Color::DarkGray => TermColor::DarkGrey,
        Color::LightRed => TermColor::Red,
        Color::LightGreen => TermColor::Green,
        Color::LightYellow => TermColor::Yellow,
        Color::LightBlue => TermColor::Blue,
        Color::LightMagenta => TermColor::Magenta,
        Color::LightCyan => TermColor::Cyan,
        Color::White => TermColor::White,
        Color::Rgb(r, g, b) => TermColor::Rgb { r, g, b },
        Color::Indexed(value) => TermColor::AnsiValue(value),
    };
    Some(mapped)
}

/// Named styles shared by the views and the command output.
pub mod styles {
    use ratatui::style::{Color, Modifier, Style};

    pub fn title() -> Style {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    }

    pub fn heading() -> Style {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    }

    pub fn separator() -> Style {
        Style::default().add_modifier(Modifier::DIM)
    }

    pub fn bar_filled(running: bool) -> Style {
        if running {
            Style::default().fg(Color::Rgb(0xF5, 0x9E, 0x0B))
        } else {
            Style::default().fg(Color::Green)
        }
    }

    pub fn bar_empty(running: bool) -> Style {
        if running {
            Style::default().fg(Color::Rgb(0xFE, 0xF3, 0xC7))
        } else {
            Style::default().fg(Color::White)
        }
    }

    pub fn top_marker() -> Style {
        Style::default().fg(Color::Blue)
    }

    pub fn running() -> Style {
        Style::default().fg(Color::Yellow)
    }

    pub fn success() -> Style {
        Style::default().fg(Color::Green)
    }

    pub fn warning() -> Style {
        Style::default().fg(Color::Yellow)
    }

    pub fn error() -> Style {
        Style::default().fg(Color::Red)
    }
}
