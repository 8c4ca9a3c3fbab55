use std::fmt::Display;

use console::{style, StyledObject};

/// Terminal roles used across refscout's output.
pub fn title(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

pub fn heading(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().underlined()
}

pub fn muted(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

/// Counts and work that is still running
pub fn highlight(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn success(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn failure(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub fn project_name(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_keep_text() {
        for styled in [
            title("refscout"),
            heading("refscout"),
            muted("refscout"),
            highlight("refscout"),
            success("refscout"),
            failure("refscout"),
            project_name("refscout"),
        ] {
            assert_eq!(console::strip_ansi_codes(&styled.to_string()), "refscout");
        }
    }
}
