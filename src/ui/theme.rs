use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Terminal styles; every style is empty when stdout is not a terminal
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub warn: Style,
    pub info: Style,
    pub dim: Style,
    pub muted: Style,
}

impl Theme {
    pub fn new(colored: bool) -> Self {
        let pick = |style: Style| if colored { style } else { Style::new() };
        Self {
            header: pick(Style::new().blue().bold()),
            success: pick(Style::new().green().bold()),
            warn: pick(Style::new().yellow().bold()),
            info: pick(Style::new().cyan()),
            dim: pick(Style::new().white().dimmed()),
            muted: pick(Style::new().bright_black()),
        }
    }

    /// Style for a similarity score: strong matches green, weak ones muted
    pub fn for_similarity(&self, similarity: f64) -> &Style {
        if similarity >= 0.9 {
            &self.success
        } else if similarity >= 0.5 {
            &self.info
        } else {
            &self.muted
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(|| Theme::new(console::Term::stdout().is_term()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use owo_colors::OwoColorize;

    #[test]
    fn test_plain_theme_adds_no_escapes() {
        let theme = Theme::new(false);
        assert_eq!("0.42".style(theme.for_similarity(0.42).clone()).to_string(), "0.42");
        assert_eq!("ok".style(theme.success.clone()).to_string(), "ok");
    }
}
