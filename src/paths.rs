use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "worklog";
const DEFAULT_DATA_DIR: &str = ".worklog_cli";
const CONFIG_FILE: &str = "config.toml";

pub fn config_path() -> PathBuf {
	if let Some(path) = non_empty_var("WORKLOG_CONFIG") {
		return absolutize(PathBuf::from(path));
	}

	if let Some(path) = non_empty_var("XDG_CONFIG_HOME") {
		return PathBuf::from(path).join(APP_DIR).join(CONFIG_FILE);
	}

	home_dir().join(".config").join(APP_DIR).join(CONFIG_FILE)
}

/// `--data-dir`, then `WORKLOG_DATA_DIR`, then the config file, then `~/.worklog_cli`.
pub fn data_dir(cli_path: Option<PathBuf>, configured: Option<&Path>) -> PathBuf {
	pick_data_dir(
		cli_path,
		non_empty_var("WORKLOG_DATA_DIR").map(PathBuf::from),
		configured,
		&home_dir(),
	)
}

fn pick_data_dir(
	cli_path: Option<PathBuf>,
	env_path: Option<PathBuf>,
	configured: Option<&Path>,
	home: &Path,
) -> PathBuf {
	if let Some(path) = cli_path {
		return absolutize(path);
	}

	if let Some(path) = env_path {
		return absolutize(path);
	}

	if let Some(path) = configured {
		return absolutize(expand_home(path, home));
	}

	home.join(DEFAULT_DATA_DIR)
}

/// Directory for log files.
pub fn state_dir() -> PathBuf {
	if let Some(path) = non_empty_var("WORKLOG_STATE_DIR") {
		return PathBuf::from(path);
	}

	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("LOCALAPPDATA") {
			return PathBuf::from(path).join(APP_DIR);
		}
	}

	if let Some(path) = non_empty_var("XDG_STATE_HOME") {
		return PathBuf::from(path).join(APP_DIR);
	}

	home_dir().join(".local").join("state").join(APP_DIR)
}

fn home_dir() -> PathBuf {
	non_empty_var("HOME")
		.or_else(|| non_empty_var("USERPROFILE"))
		.map(PathBuf::from)
		.unwrap_or_else(|| PathBuf::from("."))
}

fn non_empty_var(name: &str) -> Option<OsString> {
	env::var_os(name).filter(|value| !value.is_empty())
}

fn expand_home(path: &Path, home: &Path) -> PathBuf {
	match path.strip_prefix("~") {
		Ok(rest) => home.join(rest),
		Err(_) => path.to_path_buf(),
	}
}

fn absolutize(path: PathBuf) -> PathBuf {
	let path = if path.is_absolute() {
		path
	} else if let Ok(cwd) = env::current_dir() {
		cwd.join(path)
	} else {
		path
	};

	if path.exists() {
		fs::canonicalize(&path).unwrap_or(path)
	} else {
		path
	}
}

#[cfg(test)]
mod tests {
	use std::path::{Path, PathBuf};

	use super::pick_data_dir;

	#[test]
	fn command_line_wins_over_everything() {
		let picked = pick_data_dir(
			Some(PathBuf::from("/srv/cli")),
			Some(PathBuf::from("/srv/env")),
			Some(Path::new("/srv/config")),
			Path::new("/home/me"),
		);
		assert_eq!(picked, PathBuf::from("/srv/cli"));
	}

	#[test]
	fn environment_wins_over_config() {
		let picked = pick_data_dir(
			None,
			Some(PathBuf::from("/srv/env")),
			Some(Path::new("/srv/config")),
			Path::new("/home/me"),
		);
		assert_eq!(picked, PathBuf::from("/srv/env"));
	}

	#[test]
	fn config_path_expands_tilde() {
		let picked = pick_data_dir(None, None, Some(Path::new("~/worklogs")), Path::new("/home/me"));
		assert_eq!(picked, PathBuf::from("/home/me/worklogs"));
	}

	#[test]
	fn falls_back_to_home_directory() {
		let picked = pick_data_dir(None, None, None, Path::new("/home/me"));
		assert_eq!(picked, PathBuf::from("/home/me/.worklog_cli"));
	}
}
