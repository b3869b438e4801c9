use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;

use crate::fmt::money;

/// Every style the review screen uses. Built once and handed to render
/// functions so nothing reads global style state.
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub footer: Style,
    pub amount_pos: Style,
    pub amount_neg: Style,
    pub cursor: Style,
    pub selected: Style,
    pub search_match: Style,
    pub muted: Style,
    pub transfer: Style,
    pub error: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            header: Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            footer: Style::new().fg(Color::DarkGray),
            amount_pos: Style::new().fg(Color::Rgb(80, 220, 100)),
            amount_neg: Style::new().fg(Color::Red),
            cursor: Style::new()
                .bg(Color::Rgb(40, 40, 60))
                .add_modifier(Modifier::BOLD),
            selected: Style::new().bg(Color::Rgb(60, 50, 20)),
            search_match: Style::new().fg(Color::Cyan),
            muted: Style::new().fg(Color::DarkGray),
            transfer: Style::new().fg(Color::Magenta),
            error: Style::new().fg(Color::Red).add_modifier(Modifier::BOLD),
        }
    }
}

impl Theme {
    /// Format an amount as a colored Span (green for income, red for expense).
    /// Shows absolute value; color conveys the sign.
    pub fn money_span(&self, cents: i64) -> Span<'static> {
        let style = if cents < 0 {
            self.amount_neg
        } else {
            self.amount_pos
        };
        let text = money(cents);
        Span::styled(text.trim_start_matches('-').to_string(), style)
    }
}

/// Restore the terminal before the default panic output runs.
pub fn install_panic_hook() {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        hook(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_span_uses_sign_for_color() {
        let theme = Theme::default();
        let neg = theme.money_span(-1250);
        assert_eq!(neg.content, "$12.50");
        assert_eq!(neg.style, theme.amount_neg);
        let pos = theme.money_span(1250);
        assert_eq!(pos.style, theme.amount_pos);
    }

    #[test]
    fn test_money_span_handles_extreme_amounts() {
        let theme = Theme::default();
        let span = theme.money_span(i64::MIN);
        assert_eq!(span.content, "$92,233,720,368,547,758.08");
        assert_eq!(span.style, theme.amount_neg);
    }
}
