//! Maps raw process identifiers to the display names usage is stored under.

/// Ordered alias rules. Each pattern is matched as a substring of the lowercased identifier and
/// the first matching rule wins, so more specific patterns have to come before broader ones.
pub const APP_ALIASES: &[(&str, &str)] = &[
    ("chrome", "Google Chrome"),
    ("msedge", "Microsoft Edge"),
    ("firefox", "Mozilla Firefox"),
    ("code", "Visual Studio Code"),
    ("notepad++", "Notepad++"),
    ("devenv", "Visual Studio"),
    ("winword", "Microsoft Word"),
    ("excel", "Microsoft Excel"),
    ("powerpnt", "Microsoft PowerPoint"),
    ("outlook", "Microsoft Outlook"),
    ("discord", "Discord"),
    ("spotify", "Spotify"),
    ("steam", "Steam"),
    ("vlc", "VLC Media Player"),
];

const EXECUTABLE_SUFFIX: &str = ".exe";

/// Removes a trailing `.exe` in any case. Anything else, slashes included, is kept.
pub fn strip_executable(raw: &str) -> &str {
    let name = raw.trim();
    let cut = name.len().saturating_sub(EXECUTABLE_SUFFIX.len());
    match name.get(cut..) {
        Some(suffix) if cut > 0 && suffix.eq_ignore_ascii_case(EXECUTABLE_SUFFIX) => {
            &name[..cut]
        }
        _ => name,
    }
}

/// Canonical display name for a raw process identifier. Total: never fails and never panics.
pub fn normalize_app_name(raw: &str) -> String {
    let stripped = strip_executable(raw);
    let lowered = stripped.to_lowercase();

    if let Some((_, canonical)) = APP_ALIASES
        .iter()
        .find(|(pattern, _)| lowered.contains(pattern))
    {
        return canonical.to_string();
    }

    stripped
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_app_name, strip_executable};

    #[test]
    fn aliases_ignore_case_and_suffix() {
        assert_eq!(normalize_app_name("CHROME.EXE"), "Google Chrome");
        assert_eq!(normalize_app_name("Code.exe"), "Visual Studio Code");
        assert_eq!(normalize_app_name("msedge"), "Microsoft Edge");
    }

    #[test]
    fn first_alias_wins() {
        // Contains both "chrome" and "code"; chrome comes first in the table.
        assert_eq!(normalize_app_name("chromecode"), "Google Chrome");
        assert_eq!(normalize_app_name("vscode-insiders"), "Visual Studio Code");
    }

    #[test]
    fn fallback_capitalizes_words() {
        assert_eq!(normalize_app_name("unknownapp123"), "Unknownapp123");
        assert_eq!(normalize_app_name("my  TERMINAL app.exe"), "My Terminal App");
        assert_eq!(normalize_app_name(""), "");
        assert_eq!(normalize_app_name("   "), "");
    }

    #[test]
    fn only_the_suffix_is_stripped() {
        assert_eq!(strip_executable(" firefox.EXE "), "firefox");
        assert_eq!(strip_executable(".exe"), ".exe");
        assert_eq!(strip_executable("AC/DC Player"), "AC/DC Player");
    }

    #[test]
    fn titles_with_slashes_keep_every_word() {
        assert_eq!(normalize_app_name("AC/DC Player"), "Ac/dc Player");
        assert_eq!(
            normalize_app_name("Inbox - me@x.com/Work Mail"),
            "Inbox - Me@x.com/work Mail"
        );
    }
}
