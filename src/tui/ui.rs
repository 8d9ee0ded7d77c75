//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use crate::cpu::{Reg, Registers, MEMORY_SIZE};
use super::app::{DebuggerApp, MEMORY_ROW};

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(55),
            Constraint::Percentage(45),
        ])
        .split(frame.area());

    // Left side: code and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(7),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: memory, output and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(4),
        ])
        .split(chunks[1]);

    draw_memory(frame, right_chunks[0], app);
    draw_output(frame, right_chunks[1], app);
    draw_help(frame, right_chunks[2]);
}

/// Draw disassembly from the current PC onwards.
fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(line, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let has_bp = app.breakpoints.contains(&line.address);
            let bp = if has_bp { "●" } else { " " };
            let text = format!("{}{:03}: {}", prefix, line.address, line.text);

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if has_bp {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}", bp, text)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

/// Draw the register file.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = &app.cpu.regs;
    let pending = regs.timer_interrupt_pending();
    let content = vec![
        register_line(regs, 0..4),
        register_line(regs, 4..8),
        Line::from(vec![
            Span::raw("PC: "),
            Span::styled(format!("{:03}", regs.pc), Style::default().fg(Color::Yellow)),
            Span::raw("   IR: "),
            Span::styled(format!("{:08b}", regs.ir), Style::default().fg(Color::White)),
            Span::raw("   SP: "),
            Span::styled(format!("{:#04x}", regs.sp()), Style::default().fg(Color::Cyan)),
            Span::raw("   IS: "),
            Span::styled(
                format!("{:08b}", regs.get(Reg::IS)),
                if pending { Style::default().fg(Color::Magenta) } else { Style::default().fg(Color::Gray) },
            ),
        ]),
        Line::from(vec![
            Span::raw("Cycles: "),
            Span::styled(format!("{}", app.cpu.cycles), Style::default().fg(Color::Cyan)),
            Span::raw("   State: "),
            Span::styled(format!("{:?}", app.cpu.state),
                if app.cpu.is_running() {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::Red)
                }),
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// One row of general purpose registers.
fn register_line(regs: &Registers, range: std::ops::Range<usize>) -> Line<'static> {
    let spans: Vec<Span<'static>> = range
        .flat_map(|i| {
            [
                Span::raw(format!("R{}: ", i)),
                Span::styled(format!("{:3}  ", regs.general[i]), Style::default().fg(Color::White)),
            ]
        })
        .collect();
    Line::from(spans)
}

/// Draw memory as a hex dump.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let start = app.mem_scroll;
    let end = (start + visible_rows).min(MEMORY_SIZE / MEMORY_ROW);
    let pc = app.cpu.regs.pc as usize;
    let sp = app.cpu.regs.sp() as usize;

    let items: Vec<ListItem> = (start..end)
        .map(|row| {
            let base = row * MEMORY_ROW;
            let mut spans = vec![Span::raw(format!("{:02X}: ", base))];

            for addr in base..base + MEMORY_ROW {
                let value = app.cpu.peek(addr as u8);
                let style = if addr == pc {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else if addr == sp {
                    Style::default().fg(Color::Cyan)
                } else if value != 0 {
                    Style::default().fg(Color::White)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                spans.push(Span::styled(format!("{:02X} ", value), style));
            }

            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

/// Draw the values printed so far, newest last.
fn draw_output(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible = (area.height as usize).saturating_sub(2);
    let output = &app.cpu.console().output;
    let skip = output.len().saturating_sub(visible);

    let lines: Vec<Line> = output[skip..]
        .iter()
        .map(|v| Line::from(v.to_string()))
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(Block::default()
            .title(" Output ")
            .borders(Borders::ALL));

    frame.render_widget(paragraph, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Step  r: Run  p: Pause  b: Breakpoint"),
        Line::from("x: Reset  ↑↓: Scroll memory  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}
