//! Installed applications, as the freedesktop `.desktop` files describe them.

use std::{
    collections::HashSet,
    env,
    ffi::OsStr,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use freedesktop_desktop_entry::{default_paths, get_languages_from_env, DesktopEntry, Iter};
use log::debug;

use crate::error::LaunchError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppDescriptor {
    pub id: String,
    pub display_name: String,
    pub description: Option<String>,
    pub executable: Option<String>,
    pub icon: Option<String>,
    pub categories: Vec<String>,
    pub exec: Option<String>,
    pub working_dir: Option<PathBuf>,
}

pub trait AppRegistry {
    fn list_all(&self) -> Vec<AppDescriptor>;
    fn launch(&self, app: &AppDescriptor) -> Result<(), LaunchError>;
}

pub struct DesktopRegistry {
    dirs: Vec<PathBuf>,
    locales: Vec<String>,
}
impl DesktopRegistry {
    pub fn new() -> Self {
        Self::with_dirs(default_paths().into_iter().collect())
    }

    pub fn with_dirs(dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs,
            locales: get_languages_from_env(),
        }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn descriptor(&self, entry: &DesktopEntry) -> Option<AppDescriptor> {
        // `Hidden` means the entry was deleted
        if entry.desktop_entry("Hidden").is_some_and(|hidden| hidden.eq_ignore_ascii_case("true")) {
            return None;
        }
        // links and directories are not launchable
        if entry.desktop_entry("Type") != Some("Application") {
            return None;
        }
        if let Some(try_exec) = entry.desktop_entry("TryExec").filter(|program| !program.is_empty()) {
            if find_program(try_exec, env::var_os("PATH").as_deref()).is_none() {
                debug!("Skipping {}: TryExec '{try_exec}' is not installed", entry.appid);
                return None;
            }
        }
        let display_name = entry.full_name(self.locales.as_slice())?.to_string();
        let exec = entry.exec().map(str::to_string);

        Some(AppDescriptor {
            id: entry.appid.clone(),
            display_name,
            description: entry.comment(self.locales.as_slice()).map(|comment| comment.to_string()),
            executable: exec.as_deref().and_then(executable_of),
            icon: entry.icon().filter(|icon| !icon.is_empty()).map(str::to_string),
            categories: entry.desktop_entry("Categories").map(split_list).unwrap_or_default(),
            exec,
            working_dir: entry.desktop_entry("Path").filter(|path| !path.is_empty()).map(PathBuf::from),
        })
    }
}
impl AppRegistry for DesktopRegistry {
    fn list_all(&self) -> Vec<AppDescriptor> {
        let mut seen = HashSet::new();
        Iter::new(self.dirs.clone().into_iter())
            .entries(Some(self.locales.as_slice()))
            // earlier directories shadow later ones
            .filter(|entry| seen.insert(entry.appid.clone()))
            .filter_map(|entry| self.descriptor(&entry))
            .collect()
    }

    fn launch(&self, app: &AppDescriptor) -> Result<(), LaunchError> {
        let exec = app.exec.as_deref().ok_or_else(|| LaunchError::NoExec(app.display_name.clone()))?;
        let command = strip_field_codes(exec);
        if command.is_empty() {
            return Err(LaunchError::NoExec(app.display_name.clone()));
        }
        debug!("Launching '{}' as `{command}`", app.display_name);

        let mut process = Command::new("sh");
        process
            .args(["-c", &command])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = app.working_dir.as_ref().filter(|dir| dir.is_dir()) {
            process.current_dir(dir);
        }

        #[allow(clippy::zombie_processes)]
        let spawned = process.spawn();
        spawned
            .map(|_| ())
            .map_err(|source| LaunchError::Spawn { command, source })
    }
}

/// Removes `%f`, `%U` and friends from an Exec line.
pub fn strip_field_codes(exec: &str) -> String {
    exec.split_whitespace()
        .filter(|token| !(token.len() == 2 && token.starts_with('%')))
        .collect::<Vec<&str>>()
        .join(" ")
}

/// First word of an Exec line: the program that gets run.
pub fn executable_of(exec: &str) -> Option<String> {
    let first = exec.split_whitespace().next()?;
    let unquoted = first.trim_matches('"');
    (!unquoted.is_empty()).then(|| unquoted.to_string())
}

/// Resolves `program` the way a shell would: paths containing a slash are
/// taken as is, bare names are searched for in `search_path`.
pub fn find_program(program: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    if program.contains('/') {
        let path = Path::new(program);
        return is_executable(path).then(|| path.to_path_buf());
    }
    env::split_paths(search_path?)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
