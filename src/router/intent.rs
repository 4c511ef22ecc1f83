//! Keyword classification
//!
//! Pure, I/O-free half of the router: turns a command into an [`Intent`]
//! by walking an ordered rule table. First match wins.

use crate::config::Keywords;

/// Value the listener produces when the microphone or recognizer failed
pub const ERROR_SENTINEL: &str = "ERROR_MIC";

/// Normalized inputs treated as "nothing usable was heard"
const SENTINELS: [&str; 3] = ["error", "timeout", "error_mic"];

/// What a command asks for, before any side effect runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Empty input or an error sentinel
    Error,
    /// Farewell; the session ends
    Exit,
    /// Open a web search for `query`
    WebSearch {
        /// Search term
        query: String,
    },
    /// Open a video search for `query`
    VideoSearch {
        /// Search term
        query: String,
    },
    /// Summarize an encyclopedia article about `query`
    Encyclopedia {
        /// Lookup term, filler words removed (may be empty)
        query: String,
    },
    /// Launch an application named somewhere in the command
    OpenApp,
    /// Anything else goes to the chat backend
    Chat,
}

/// One row of the priority table: which phrases select it and how the intent is built
struct Rule {
    name: &'static str,
    phrases: fn(&Keywords) -> &[String],
    build: fn(&str, &str, &Keywords) -> Intent,
}

/// Classification order after the sentinel check
const RULES: &[Rule] = &[
    Rule {
        name: "exit",
        phrases: exit_phrases,
        build: build_exit,
    },
    Rule {
        name: "web_search",
        phrases: google_phrases,
        build: build_web_search,
    },
    Rule {
        name: "video_search",
        phrases: youtube_phrases,
        build: build_video_search,
    },
    Rule {
        name: "encyclopedia",
        phrases: wikipedia_phrases,
        build: build_encyclopedia,
    },
    Rule {
        name: "open_app",
        phrases: open_phrases,
        build: build_open_app,
    },
];

/// Lower-case and trim a raw command
#[must_use]
pub fn normalize(command: &str) -> String {
    command.trim().to_lowercase()
}

/// Classify a command
///
/// Never fails: unmatched input is [`Intent::Chat`].
#[must_use]
pub fn classify(command: &str, keywords: &Keywords) -> Intent {
    let command = normalize(command);

    if command.is_empty() || SENTINELS.contains(&command.as_str()) {
        return Intent::Error;
    }

    for rule in RULES {
        if let Some(phrase) = first_match(&command, (rule.phrases)(keywords)) {
            tracing::trace!(rule = rule.name, phrase, "keyword matched");
            return (rule.build)(&command, phrase, keywords);
        }
    }

    Intent::Chat
}

/// First phrase of `phrases` (in list order) contained in `command`
#[must_use]
pub fn first_match<'a>(command: &str, phrases: &'a [String]) -> Option<&'a str> {
    phrases
        .iter()
        .map(String::as_str)
        .find(|p| !p.is_empty() && command.contains(p))
}

/// Remove `phrase` from `command` and trim; an empty remainder yields the whole command
#[must_use]
pub fn extract_query(command: &str, phrase: &str) -> String {
    let query = command.replace(phrase, "");
    let query = query.trim();

    if query.is_empty() {
        command.trim().to_string()
    } else {
        query.to_string()
    }
}

/// Drop filler words (whole words only)
#[must_use]
pub fn strip_filler(query: &str, filler: &[String]) -> String {
    query
        .split_whitespace()
        .filter(|w| !filler.iter().any(|f| f == w))
        .collect::<Vec<_>>()
        .join(" ")
}

fn exit_phrases(k: &Keywords) -> &[String] {
    &k.exit
}

fn google_phrases(k: &Keywords) -> &[String] {
    &k.google
}

fn youtube_phrases(k: &Keywords) -> &[String] {
    &k.youtube
}

fn wikipedia_phrases(k: &Keywords) -> &[String] {
    &k.wikipedia
}

fn open_phrases(k: &Keywords) -> &[String] {
    &k.open
}

fn build_exit(_: &str, _: &str, _: &Keywords) -> Intent {
    Intent::Exit
}

fn build_web_search(command: &str, phrase: &str, _: &Keywords) -> Intent {
    Intent::WebSearch {
        query: extract_query(command, phrase),
    }
}

fn build_video_search(command: &str, phrase: &str, _: &Keywords) -> Intent {
    Intent::VideoSearch {
        query: extract_query(command, phrase),
    }
}

fn build_encyclopedia(command: &str, phrase: &str, keywords: &Keywords) -> Intent {
    let query = extract_query(command, phrase);
    Intent::Encyclopedia {
        query: strip_filler(&query, &keywords.filler),
    }
}

fn build_open_app(_: &str, _: &str, _: &Keywords) -> Intent {
    Intent::OpenApp
}
