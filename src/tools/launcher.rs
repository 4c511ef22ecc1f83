//! Desktop application launcher
//!
//! Builds a table of launchable programs (built-in names per OS, configured
//! extras, and whatever is detected on the machine) and resolves free-text
//! names like "abre el navegador" against it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use async_trait::async_trait;
use regex::Regex;

use super::AppLauncher;
use crate::config::{Keywords, LauncherConfig};

/// Articles dropped from application names
const ARTICLES: &[&str] = &["el", "la", "los", "las"];

/// Minimum word length for the word-by-word fallback lookup
const MIN_WORD_LEN: usize = 3;

/// Desktop entry field codes (`%U`, `%f`, ...)
static FIELD_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*%[fFuUdDnNickvm]").expect("valid regex"));

static DESKTOP_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Name=(.+)$").expect("valid regex"));

static DESKTOP_EXEC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Exec=(.+)$").expect("valid regex"));

const LINUX_BASE: &[(&str, &str)] = &[
    ("navegador", "firefox"),
    ("firefox", "firefox"),
    ("chrome", "google-chrome-stable"),
    ("chromium", "chromium-browser"),
    ("código", "code"),
    ("visual studio code", "code"),
    ("vscode", "code"),
    ("terminal", "gnome-terminal"),
    ("konsole", "konsole"),
    ("archivos", "nautilus"),
    ("dolphin", "dolphin"),
    ("calculadora", "gnome-calculator"),
    ("calendario", "gnome-calendar"),
    ("música", "rhythmbox"),
    ("videos", "totem"),
    ("texto", "gedit"),
    ("kate", "kate"),
    ("spotify", "spotify"),
    ("discord", "discord"),
    ("telegram", "telegram-desktop"),
    ("vlc", "vlc"),
    ("gimp", "gimp"),
    ("inkscape", "inkscape"),
    ("libreoffice", "libreoffice"),
    ("writer", "libreoffice --writer"),
    ("calc", "libreoffice --calc"),
    ("impress", "libreoffice --impress"),
];

const WINDOWS_BASE: &[(&str, &str)] = &[
    ("navegador", "start firefox"),
    ("firefox", "start firefox"),
    ("chrome", "start chrome"),
    ("edge", "start msedge"),
    ("código", "code"),
    ("visual studio code", "code"),
    ("vscode", "code"),
    ("terminal", "start cmd"),
    ("powershell", "start powershell"),
    ("archivos", "start explorer"),
    ("explorador", "start explorer"),
    ("calculadora", "calc"),
    ("notepad", "notepad"),
    ("bloc de notas", "notepad"),
    ("paint", "mspaint"),
    ("word", "start winword"),
    ("excel", "start excel"),
    ("powerpoint", "start powerpnt"),
    ("outlook", "start outlook"),
];

const MACOS_BASE: &[(&str, &str)] = &[
    ("navegador", "open -a Firefox"),
    ("firefox", "open -a Firefox"),
    ("chrome", "open -a 'Google Chrome'"),
    ("safari", "open -a Safari"),
    ("código", "open -a 'Visual Studio Code'"),
    ("visual studio code", "open -a 'Visual Studio Code'"),
    ("vscode", "open -a 'Visual Studio Code'"),
    ("terminal", "open -a Terminal"),
    ("finder", "open -a Finder"),
    ("archivos", "open -a Finder"),
    ("calculadora", "open -a Calculator"),
    ("calendario", "open -a Calendar"),
    ("música", "open -a Music"),
    ("notas", "open -a Notes"),
];

/// Binaries probed on `PATH`
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
const COMMON_BINARIES: &[&str] = &[
    "gimp", "inkscape", "blender", "audacity", "obs", "obs-studio", "steam", "lutris",
    "discord", "telegram-desktop", "slack", "zoom", "skype", "vlc", "mpv", "rhythmbox",
    "clementine", "thunderbird", "evolution", "geary", "darktable", "kdenlive", "shotcut",
    "handbrake", "transmission", "qbittorrent", "deluge", "wine", "bottles", "krita",
    "mypaint", "scribus", "calibre",
];

/// Ordered name → command table; the first entry for a name wins
#[derive(Debug, Clone, Default)]
pub struct ProgramTable {
    entries: Vec<(String, String)>,
}

impl ProgramTable {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `name` unless it is already present; returns whether it was added
    pub fn insert_if_absent(&mut self, name: &str, command: &str) -> bool {
        let name = name.trim().to_lowercase();
        let command = command.trim();
        if name.is_empty() || command.is_empty() || self.get(&name).is_some() {
            return false;
        }
        self.entries.push((name, command.to_string()));
        true
    }

    /// Command registered under exactly `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.as_str())
    }

    /// Number of programs
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, command)` pairs in table order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, c)| (n.as_str(), c.as_str()))
    }

    /// Resolve a spoken name to `(name, command)`
    ///
    /// Exact name first, then a substring match in either direction, then
    /// any word of at least three characters contained in a program name.
    #[must_use]
    pub fn find(&self, query: &str) -> Option<(&str, &str)> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }

        if let Some(hit) = self.iter().find(|(name, _)| *name == query) {
            return Some(hit);
        }

        if let Some(hit) = self
            .iter()
            .find(|(name, _)| name.contains(query.as_str()) || query.contains(name))
        {
            return Some(hit);
        }

        query
            .split_whitespace()
            .filter(|word| word.chars().count() >= MIN_WORD_LEN)
            .find_map(|word| self.iter().find(|(name, _)| name.contains(word)))
    }

    /// Build the full table: configured extras, the built-in names for this
    /// OS, then programs detected on the machine
    #[must_use]
    pub fn detect(extra: &BTreeMap<String, String>) -> Self {
        let mut table = Self::new();
        for (name, command) in extra {
            table.insert_if_absent(name, command);
        }
        for (name, command) in base_programs() {
            table.insert_if_absent(name, command);
        }

        let before = table.len();
        detect_installed(&mut table);

        tracing::info!(
            programs = table.len(),
            detected = table.len() - before,
            "application table built"
        );
        table
    }
}

fn base_programs() -> &'static [(&'static str, &'static str)] {
    if cfg!(target_os = "windows") {
        WINDOWS_BASE
    } else if cfg!(target_os = "macos") {
        MACOS_BASE
    } else {
        LINUX_BASE
    }
}

#[cfg(target_os = "linux")]
fn detect_installed(table: &mut ProgramTable) {
    let mut dirs = vec![PathBuf::from("/usr/share/applications")];
    if let Some(base) = directories::BaseDirs::new() {
        dirs.push(base.data_local_dir().join("applications"));
    }

    for dir in dirs {
        for path in list_dir(&dir, "desktop") {
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    if let Some((name, exec)) = parse_desktop_entry(&content) {
                        table.insert_if_absent(&name, &exec);
                    }
                }
                Err(e) => tracing::debug!(path = %path.display(), error = %e, "skipping desktop entry"),
            }
        }
    }

    for binary in COMMON_BINARIES {
        if which::which(binary).is_ok() {
            table.insert_if_absent(binary, binary);
        }
    }
}

#[cfg(target_os = "macos")]
fn detect_installed(table: &mut ProgramTable) {
    for app in list_dir(Path::new("/Applications"), "app") {
        if let Some(stem) = app.file_stem().and_then(|s| s.to_str()) {
            table.insert_if_absent(stem, &format!("open -a \"{stem}\""));
        }
    }
}

#[cfg(target_os = "windows")]
fn detect_installed(table: &mut ProgramTable) {
    let mut roots = vec![
        PathBuf::from("C:/Program Files"),
        PathBuf::from("C:/Program Files (x86)"),
    ];
    if let Some(base) = directories::BaseDirs::new() {
        roots.push(base.data_local_dir().join("Programs"));
    }

    for root in roots {
        let Ok(apps) = std::fs::read_dir(&root) else {
            continue;
        };
        for app in apps.flatten().map(|e| e.path()).filter(|p| p.is_dir()) {
            let Some(exe) = list_dir(&app, "exe").into_iter().next() else {
                continue;
            };
            if let Some(stem) = exe.file_stem().and_then(|s| s.to_str()) {
                table.insert_if_absent(stem, &format!("start \"\" \"{}\"", exe.display()));
            }
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn detect_installed(_table: &mut ProgramTable) {}

/// Files in `dir` with the given extension, sorted for a stable table order
#[cfg_attr(
    not(any(target_os = "linux", target_os = "macos", target_os = "windows")),
    allow(dead_code)
)]
fn list_dir(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == extension))
        .collect();
    paths.sort();
    paths
}

/// Extract `(name, command)` from a `.desktop` file
#[must_use]
pub fn parse_desktop_entry(content: &str) -> Option<(String, String)> {
    let name = DESKTOP_NAME.captures(content)?.get(1)?.as_str().trim().to_lowercase();
    let exec = DESKTOP_EXEC.captures(content)?.get(1)?.as_str();
    let exec = FIELD_CODE.replace_all(exec, "").trim().to_string();

    if name.is_empty() || exec.is_empty() {
        return None;
    }
    Some((name, exec))
}

/// Strip the open trigger words and articles from a command
#[must_use]
pub fn extract_app_name(command: &str, open_words: &[String]) -> String {
    let mut text = command.to_lowercase();
    for phrase in open_words.iter().filter(|p| p.contains(' ')) {
        text = text.replace(phrase.as_str(), " ");
    }

    text.split_whitespace()
        .filter(|word| !open_words.iter().any(|o| o == word) && !ARTICLES.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether any open trigger appears in `command` as whole words
#[must_use]
pub fn has_open_word(command: &str, open_words: &[String]) -> bool {
    let words = words_of(command);
    open_words.iter().any(|phrase| {
        let phrase = words_of(phrase);
        !phrase.is_empty() && words.windows(phrase.len()).any(|w| w == phrase.as_slice())
    })
}

fn words_of(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Result of a launch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Nothing left after removing the trigger words
    NoName,
    /// Program started
    Launched { name: String },
    /// Program found but could not be started
    Failed { name: String, error: String },
    /// No program matched
    NotFound { name: String },
}

impl LaunchOutcome {
    /// Sentence for the user
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::NoName => "No entendí qué programa quieres abrir.".to_string(),
            Self::Launched { name } => format!("Abriendo {name}."),
            Self::Failed { name, .. } => format!("Error al abrir {name}."),
            Self::NotFound { name } => format!("No encontré el programa '{name}' instalado."),
        }
    }
}

/// Launches desktop applications by spoken name
///
/// Clones share the program table.
#[derive(Clone)]
pub struct DesktopLauncher {
    open_words: Arc<[String]>,
    extra: Arc<BTreeMap<String, String>>,
    fallback_to_chat: bool,
    table: Arc<Mutex<Option<Arc<ProgramTable>>>>,
}

impl DesktopLauncher {
    /// Create a launcher; the program table is built on first use
    #[must_use]
    pub fn new(config: &LauncherConfig, keywords: &Keywords) -> Self {
        Self {
            open_words: keywords.open.clone().into(),
            extra: Arc::new(config.programs.clone()),
            fallback_to_chat: config.fallback_to_chat,
            table: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a launcher over a fixed program table
    #[must_use]
    pub fn with_programs(config: &LauncherConfig, keywords: &Keywords, table: ProgramTable) -> Self {
        let launcher = Self::new(config, keywords);
        *launcher.table.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(table));
        launcher
    }

    /// Current program table, detecting it if needed
    #[must_use]
    pub fn programs(&self) -> Arc<ProgramTable> {
        let mut slot = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert_with(|| Arc::new(ProgramTable::detect(&self.extra)))
            .clone()
    }

    /// Re-run detection, e.g. after installing a program
    #[must_use]
    pub fn refresh(&self) -> Arc<ProgramTable> {
        let table = Arc::new(ProgramTable::detect(&self.extra));
        *self.table.lock().unwrap_or_else(PoisonError::into_inner) = Some(table.clone());
        table
    }

    /// Resolve and start the application named in `command`
    #[must_use]
    pub fn open(&self, command: &str) -> LaunchOutcome {
        let name = extract_app_name(command, &self.open_words);
        if name.is_empty() {
            return LaunchOutcome::NoName;
        }

        tracing::info!(name = %name, "looking up application");
        let programs = self.programs();
        let Some((found, program)) = programs.find(&name) else {
            tracing::warn!(name = %name, "application not found");
            return LaunchOutcome::NotFound { name };
        };

        let found = found.to_string();
        match spawn_detached(program) {
            Ok(()) => {
                tracing::info!(name = %found, command = program, "application started");
                LaunchOutcome::Launched { name: found }
            }
            Err(e) => {
                tracing::error!(name = %found, command = program, error = %e, "failed to start application");
                LaunchOutcome::Failed {
                    name: found,
                    error: e.to_string(),
                }
            }
        }
    }
}

#[async_trait]
impl AppLauncher for DesktopLauncher {
    async fn launch(&self, command: &str) -> Option<String> {
        // "sabremos" contains "abre" but is not an open command
        if !has_open_word(command, &self.open_words) {
            tracing::debug!("no open word in command, not launching");
            return None;
        }

        // Detection walks directories and spawns processes
        let launcher = self.clone();
        let owned = command.to_string();
        let outcome = match tokio::task::spawn_blocking(move || launcher.open(&owned)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "launcher task failed");
                return Some("Error al abrir la aplicación.".to_string());
            }
        };

        match outcome {
            LaunchOutcome::NotFound { .. } if self.fallback_to_chat => None,
            outcome => Some(outcome.message()),
        }
    }
}

/// Start `program` without waiting for it
///
/// On Linux the command line is split on whitespace; elsewhere it goes
/// through the shell so `start` and `open -a 'X'` work.
fn spawn_detached(program: &str) -> std::io::Result<()> {
    let mut cmd = if cfg!(target_os = "linux") {
        let mut parts = program.split_whitespace();
        let Some(bin) = parts.next() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty command",
            ));
        };
        let mut cmd = Command::new(bin);
        cmd.args(parts);
        cmd
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", program]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", program]);
        cmd
    };

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    std::thread::spawn(move || {
        let _ = child.wait();
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ProgramTable {
        let mut t = ProgramTable::new();
        t.insert_if_absent("navegador", "firefox");
        t.insert_if_absent("visual studio code", "code");
        t.insert_if_absent("telegram", "telegram-desktop");
        t.insert_if_absent("calculadora", "gnome-calculator");
        t
    }

    fn open_words() -> Vec<String> {
        Keywords::default().open
    }

    #[test]
    fn test_first_insert_wins() {
        let mut t = table();
        assert!(!t.insert_if_absent("Navegador", "chromium"));
        assert_eq!(t.get("navegador"), Some("firefox"));
        assert!(!t.insert_if_absent("  ", "x"));
    }

    #[test]
    fn test_find_order() {
        let t = table();
        assert_eq!(t.find("navegador"), Some(("navegador", "firefox")));
        // Substring either way
        assert_eq!(t.find("calcu"), Some(("calculadora", "gnome-calculator")));
        assert_eq!(t.find("telegram desktop"), Some(("telegram", "telegram-desktop")));
        // Single word fallback
        assert_eq!(t.find("mi studio favorito"), Some(("visual studio code", "code")));
        // Short words are ignored
        assert_eq!(t.find("la tv"), None);
        assert_eq!(t.find(""), None);
    }

    #[test]
    fn test_extract_app_name() {
        let words = open_words();
        assert_eq!(extract_app_name("abre el navegador", &words), "navegador");
        assert_eq!(extract_app_name("Abrir la calculadora", &words), "calculadora");
        assert_eq!(extract_app_name("abre", &words), "");
        // Articles only go as whole words
        assert_eq!(extract_app_name("abre telegram", &words), "telegram");

        let phrase = vec!["ejecuta el programa".to_string()];
        assert_eq!(extract_app_name("ejecuta el programa gimp", &phrase), "gimp");
    }

    #[test]
    fn test_open_word_must_be_whole() {
        let words = open_words();
        assert!(has_open_word("abre el navegador", &words));
        assert!(has_open_word("¿Puedes abrir, por favor, telegram?", &words));
        assert!(!has_open_word("sabremos quien gana el partido", &words));
        assert!(!has_open_word("me cabrea escribir texto", &words));

        let phrase = vec!["ejecuta el programa".to_string()];
        assert!(has_open_word("ejecuta el programa gimp", &phrase));
        assert!(!has_open_word("ejecuta el script", &phrase));
        assert!(!has_open_word("abre", &[String::new()]));
    }

    #[test]
    fn test_parse_desktop_entry() {
        let entry = "[Desktop Entry]\nType=Application\nName=Firefox Web Browser\nExec=firefox %u\n";
        assert_eq!(
            parse_desktop_entry(entry),
            Some(("firefox web browser".to_string(), "firefox".to_string()))
        );

        let entry = "[Desktop Entry]\nName=Files\nExec=nautilus --new-window %U\n";
        assert_eq!(
            parse_desktop_entry(entry).map(|(_, e)| e),
            Some("nautilus --new-window".to_string())
        );

        assert_eq!(parse_desktop_entry("[Desktop Entry]\nName=Broken\n"), None);
    }

    #[test]
    fn test_outcome_messages() {
        assert_eq!(LaunchOutcome::NoName.message(), "No entendí qué programa quieres abrir.");
        assert_eq!(
            LaunchOutcome::Launched { name: "gimp".into() }.message(),
            "Abriendo gimp."
        );
        assert_eq!(
            LaunchOutcome::NotFound { name: "foo".into() }.message(),
            "No encontré el programa 'foo' instalado."
        );
    }

    #[tokio::test]
    async fn test_miss_is_terminal_unless_fallback() {
        let keywords = Keywords::default();
        let strict = DesktopLauncher::with_programs(&LauncherConfig::default(), &keywords, table());
        assert_eq!(
            strict.launch("abre zzqx").await.as_deref(),
            Some("No encontré el programa 'zzqx' instalado.")
        );
        assert_eq!(
            strict.launch("abre").await.as_deref(),
            Some("No entendí qué programa quieres abrir.")
        );

        let config = LauncherConfig {
            fallback_to_chat: true,
            ..LauncherConfig::default()
        };
        let lenient = DesktopLauncher::with_programs(&config, &keywords, table());
        assert_eq!(lenient.launch("abre zzqx").await, None);
    }

    #[tokio::test]
    async fn test_open_inside_another_word_is_not_launched() {
        let strict =
            DesktopLauncher::with_programs(&LauncherConfig::default(), &Keywords::default(), table());
        assert_eq!(strict.launch("sabremos quien gana el partido").await, None);
        assert_eq!(strict.launch("me cabrea la calculadora").await, None);
    }

    #[test]
    fn test_refresh_rebuilds_with_extras() {
        let config = LauncherConfig {
            programs: BTreeMap::from([("editor".to_string(), "kate".to_string())]),
            ..LauncherConfig::default()
        };
        let launcher = DesktopLauncher::with_programs(&config, &Keywords::default(), table());
        assert_eq!(launcher.programs().get("editor"), None);

        let refreshed = launcher.refresh();
        assert_eq!(refreshed.get("editor"), Some("kate"));
        assert!(refreshed.get("navegador").is_some());
        assert_eq!(launcher.programs().get("editor"), Some("kate"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_spawn_failure_reports_error() {
        let mut t = ProgramTable::new();
        t.insert_if_absent("fantasma", "/nonexistent/aura-test-binary");
        let launcher =
            DesktopLauncher::with_programs(&LauncherConfig::default(), &Keywords::default(), t);

        match launcher.open("abre fantasma") {
            LaunchOutcome::Failed { name, .. } => assert_eq!(name, "fantasma"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
