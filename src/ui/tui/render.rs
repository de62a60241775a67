// UI rendering functions for the TUI

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::core::readiness::SCORE_BAR_SEGMENTS;
use crate::ui::colors::{PastelColor, Theme};
use crate::ui::report::score_bar;

use super::state::{AppState, GpuPanel};

fn fg(color: PastelColor) -> Style {
    Style::default().fg(color.as_ratatui())
}

fn bold(color: PastelColor) -> Style {
    fg(color).add_modifier(Modifier::BOLD)
}

fn panel<'a>(title: &'a str, border: PastelColor) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(Span::styled(title, bold(border)))
        .border_style(fg(border))
}

/// Main UI render function
pub fn ui(f: &mut Frame, app: &AppState) {
    let theme = Theme::default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(10),   // Main content
            Constraint::Length(8), // Console log
            Constraint::Length(3), // Footer
        ])
        .split(f.size());

    render_title(f, app, chunks[0], &theme);
    if app.show_usb {
        render_usb(f, app, chunks[1], &theme);
    } else {
        render_dashboard(f, app, chunks[1], &theme);
    }
    render_console(f, app, chunks[2]);
    render_footer(f, app, chunks[3], &theme);

    if let Some(message) = &app.loading_message {
        render_loading_overlay(f, message, &theme);
    }
}

/// Render a loading overlay
fn render_loading_overlay(f: &mut Frame, message: &str, theme: &Theme) {
    let area = f.size();
    let overlay_height = 3;
    let overlay_width = (UnicodeWidthStr::width(message) as u16 + 10).min(area.width);

    let x = area.width.saturating_sub(overlay_width) / 2;
    let y = area.height.saturating_sub(overlay_height) / 2;
    let overlay_area = Rect::new(x, y, overlay_width, overlay_height.min(area.height));

    let overlay = Paragraph::new(Line::from(Span::styled(message, bold(theme.primary))))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(fg(theme.accent)),
        )
        .alignment(Alignment::Center);

    f.render_widget(overlay, overlay_area);
}

/// Render the title bar
fn render_title(f: &mut Frame, app: &AppState, area: Rect, theme: &Theme) {
    let title = format!(" ✨ {} ✨ ", app.title);
    let subtitle = Paragraph::new(Line::from(Span::styled(
        "macOS GPU compatibility and passthrough readiness",
        fg(theme.secondary),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(Span::styled(title, bold(theme.primary)))
            .border_style(fg(theme.primary)),
    )
    .alignment(Alignment::Center);

    f.render_widget(subtitle, area);
}

/// System and readiness on the left, GPU compatibility on the right
fn render_dashboard(f: &mut Frame, app: &AppState, area: Rect, theme: &Theme) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(5)])
        .split(columns[0]);

    render_system_info(f, app, left[0], theme);
    render_readiness(f, app, left[1], theme);
    render_gpu_panel(f, app, columns[1], theme);
}

fn render_system_info(f: &mut Frame, app: &AppState, area: Rect, theme: &Theme) {
    let block = panel(" System ", theme.secondary);

    let lines: Vec<Line> = match &app.system_info {
        Some(info) => info
            .summary()
            .lines()
            .map(|line| match line.split_once(": ") {
                Some((key, value)) => Line::from(vec![
                    Span::styled(format!("{}: ", key), fg(theme.secondary)),
                    Span::styled(value.to_string(), fg(theme.text)),
                ]),
                None => Line::from(Span::styled(line.to_string(), fg(theme.text))),
            })
            .collect(),
        None => vec![Line::from(Span::styled("Detecting...", fg(theme.muted)))],
    };

    f.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}

fn render_readiness(f: &mut Frame, app: &AppState, area: Rect, theme: &Theme) {
    let title = format!(" {} ", app.selected_suite.title());
    let block = panel(&title, theme.primary);

    let Some(report) = &app.readiness else {
        let waiting = Paragraph::new(Line::from(Span::styled("Not run yet", fg(theme.muted)))).block(block);
        f.render_widget(waiting, area);
        return;
    };

    let mut lines: Vec<Line> = report
        .results
        .iter()
        .map(|result| {
            Line::from(vec![
                Span::styled(format!("{} ", result.status.glyph()), bold(theme.check(result.status))),
                Span::styled(result.message.clone(), fg(theme.text)),
            ])
        })
        .collect();

    let tier_color = theme.tier(report.tier);
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled(score_bar(report), fg(tier_color)),
        Span::styled(format!(" {}/{} ", report.total, SCORE_BAR_SEGMENTS), fg(theme.text)),
        Span::styled(report.tier.label(), bold(tier_color)),
    ]));

    f.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}

fn render_gpu_panel(f: &mut Frame, app: &AppState, area: Rect, theme: &Theme) {
    let block = panel(" GPU Compatibility ", theme.accent);

    let lines: Vec<Line> = match &app.gpu_panel {
        GpuPanel::Pending => vec![Line::from(Span::styled("Detecting...", fg(theme.muted)))],
        GpuPanel::TableError(message) => vec![Line::from(Span::styled(message.clone(), fg(theme.error)))],
        GpuPanel::Reports(reports) if reports.is_empty() => vec![
            Line::from(Span::styled("No supported GPU recognized.", fg(theme.warning))),
            Line::from(Span::styled(
                format!("{} display device(s) found.", app.devices.len()),
                fg(theme.muted),
            )),
        ],
        GpuPanel::Reports(reports) => reports
            .iter()
            .flat_map(|report| {
                let color = theme.support(report.supported, report.end_of_support.is_some());
                let mut entry = vec![
                    Line::from(Span::styled(report.display_name.clone(), bold(theme.primary))),
                    Line::from(vec![
                        Span::styled("● ", fg(color)),
                        Span::styled(report.headline.clone(), bold(color)),
                    ]),
                    Line::from(vec![
                        Span::styled("Maximum macOS: ", fg(theme.secondary)),
                        Span::styled(report.max_os.clone(), fg(theme.text)),
                    ]),
                    Line::from(vec![
                        Span::styled("Minimum macOS: ", fg(theme.secondary)),
                        Span::styled(report.min_os.clone(), fg(theme.text)),
                    ]),
                    Line::from(Span::styled(report.quirks.clone(), fg(theme.muted))),
                ];
                if let Some(note) = &report.end_of_support {
                    entry.push(Line::from(Span::styled(note.clone(), fg(theme.warning))));
                }
                entry.push(Line::from(""));
                entry
            })
            .collect(),
    };

    f.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}

/// USB device list with the cursor row highlighted, flags below
fn render_usb(f: &mut Frame, app: &AppState, area: Rect, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(6)])
        .split(area);

    let items: Vec<ListItem> = app
        .usb
        .devices()
        .iter()
        .enumerate()
        .map(|(index, device)| {
            let selected = app.usb.is_selected(index);
            let mark = if selected { "[x]" } else { "[ ]" };
            let mut style = fg(if selected { theme.success } else { theme.text });
            if index == app.usb_cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:>3}. {} ", index + 1, mark), style),
                Span::styled(format!("{}  {}", device.id, device.name), style),
            ]))
        })
        .collect();

    let list = if items.is_empty() {
        List::new(vec![ListItem::new(Line::from(Span::styled("No USB devices detected.", fg(theme.warning))))])
    } else {
        List::new(items)
    };
    f.render_widget(list.block(panel(" USB Devices ", theme.secondary)), chunks[0]);

    let flags: Vec<Line> = app
        .usb
        .qemu_flags()
        .into_iter()
        .map(|flag| Line::from(Span::styled(flag, fg(theme.text))))
        .collect();
    let flags = if flags.is_empty() {
        vec![Line::from(Span::styled("Select devices with space", fg(theme.muted)))]
    } else {
        flags
    };
    f.render_widget(Paragraph::new(flags).block(panel(" QEMU Flags ", theme.primary)), chunks[1]);
}

/// Render console log panel, newest entries at the bottom
fn render_console(f: &mut Frame, app: &AppState, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let skip = app.log_messages.len().saturating_sub(visible);

    let log_items: Vec<ListItem> = app
        .log_messages
        .iter()
        .skip(skip)
        .map(|msg| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("[{}] ", msg.timestamp), fg(PastelColor::Gray)),
                Span::styled(msg.text.as_str(), Style::default().fg(msg.level.color())),
            ]))
        })
        .collect();

    f.render_widget(List::new(log_items).block(panel(" Console ", PastelColor::Gray)), area);
}

/// Render the footer
fn render_footer(f: &mut Frame, app: &AppState, area: Rect, theme: &Theme) {
    let key = |k: &'static str| Span::styled(k, bold(theme.accent));
    let text = |t: &'static str| Span::styled(t, fg(theme.text));

    let mut help = vec![key("r"), text("efresh | ")];
    if app.show_usb {
        help.extend([
            key("↑/↓"),
            text(" move | "),
            key("space"),
            text(" toggle | "),
            key("w"),
            text("rite script | "),
            key("Esc"),
            text(" back | "),
        ]);
    } else {
        help.extend([key("1/2/3"), text(" KVM/VFIO/USB checks | "), key("u"), text("sb devices | ")]);
    }
    help.extend([key("q"), text("uit")]);

    let paragraph = Paragraph::new(Line::from(help))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(fg(PastelColor::Gray)),
        )
        .alignment(Alignment::Center);

    f.render_widget(paragraph, area);
}
