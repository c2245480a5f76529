use anyhow::Result;
use std::path::{Path, PathBuf};

/// Install directory shared with the other lumi tools
pub fn install_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".lumi-tester"))
}

fn exe_name(name: &str) -> String {
    if cfg!(windows) && !name.ends_with(".exe") {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

/// Find a binary: bundled next to the executable, then the install
/// directory, then system PATH
pub fn find_binary(name: &str) -> Result<PathBuf> {
    let file_name = exe_name(name);
    let mut checked_paths = Vec::new();

    // 1. Bundled resources (resources/binaries next to the executable)
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            for candidate in bundled_candidates(exe_dir, &file_name) {
                checked_paths.push(format!("Bundled: {:?}", candidate));
                if candidate.exists() {
                    return Ok(candidate);
                }
            }
        }
    } else {
        checked_paths.push("Failed to get current_exe".to_string());
    }

    // 2. Install directory (~/.lumi-tester)
    if let Some(install_dir) = install_dir() {
        let sub_dir = match name.trim_end_matches(".exe") {
            "adb" => Some("platform-tools"),
            "scrcpy" => Some("scrcpy"),
            _ => None,
        };
        if let Some(sub_dir) = sub_dir {
            let path = install_dir.join(sub_dir).join(&file_name);
            checked_paths.push(format!("Install Dir: {:?}", path));
            if path.exists() {
                return Ok(path);
            }
        }
    }

    // 3. System PATH
    if let Ok(path) = which::which(&file_name) {
        return Ok(path);
    }
    checked_paths.push(format!("PATH: {}", file_name));

    Err(anyhow::anyhow!(
        "Could not find binary '{}'. Checked paths:\n{}",
        name,
        checked_paths.join("\n")
    ))
}

fn bundled_candidates(exe_dir: &Path, file_name: &str) -> Vec<PathBuf> {
    let mut candidates = vec![
        exe_dir.join("resources").join("binaries").join(file_name),
        exe_dir.join(file_name),
    ];

    // macOS app bundle: App.app/Contents/MacOS/<exe>, resources in Contents/Resources
    #[cfg(target_os = "macos")]
    {
        if let Some(contents) = exe_dir.parent() {
            candidates.push(contents.join("Resources").join("binaries").join(file_name));
        }
    }

    candidates
}

/// Find the adb binary
pub fn find_adb() -> Result<PathBuf> {
    find_binary("adb")
}

/// Find the scrcpy binary
pub fn find_scrcpy() -> Result<PathBuf> {
    find_binary("scrcpy")
}

/// Find the system ping binary (PATH only)
pub fn find_ping() -> Result<PathBuf> {
    which::which(exe_name("ping")).map_err(|e| anyhow::anyhow!("ping not found on PATH: {}", e))
}
