//! Toolchain detection functions.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::util::config::ToolchainSettings;

use super::{GccToolchain, MsvcToolchain, Toolchain, ToolchainPlatform};

/// Detect the available toolchain.
///
/// Tries to find a C compiler with the following priority:
/// 1. `[toolchain] cc` from the configuration
/// 2. The `CC` environment variable
/// 3. On Windows: `cl.exe` from a Developer Command Prompt
/// 4. On Unix-like systems: cc/gcc/clang from PATH
pub fn detect_toolchain(settings: &ToolchainSettings) -> Result<Box<dyn Toolchain>> {
    if let Some(cc) = &settings.cc {
        if cc.exists() || which::which(cc).is_ok() {
            tracing::info!("Using compiler from config: {}", cc.display());
            return from_compiler_path(cc.clone());
        }
        tracing::warn!("Configured C compiler not found: {}", cc.display());
    }

    if let Ok(cc_env) = std::env::var("CC") {
        return from_compiler_path(PathBuf::from(cc_env));
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(toolchain) = try_detect_msvc()? {
            return Ok(toolchain);
        }
    }

    if let Ok(cc) = which::which("cc")
        .or_else(|_| which::which("gcc"))
        .or_else(|_| which::which("clang"))
    {
        return from_compiler_path(cc);
    }

    bail!(
        "no C compiler found\n\
         \n\
         Building the extensions requires a C compiler (gcc, clang, or cl).\n\
         Set the CC environment variable, set `toolchain.cc` in .cmfbuild/config.toml,\n\
         or install a compiler."
    )
}

/// Toolchain for an explicitly chosen compiler.
///
/// `cc` overrides the conventional driver name of `platform`.
pub fn toolchain_for(platform: ToolchainPlatform, cc: Option<PathBuf>) -> Box<dyn Toolchain> {
    let cc = cc.unwrap_or_else(|| PathBuf::from(platform.default_program()));
    match platform {
        ToolchainPlatform::Msvc => {
            // link.exe ships next to cl.exe
            let link = match cc.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.join("link"),
                _ => PathBuf::from("link"),
            };
            Box::new(MsvcToolchain::new(cc, link))
        }
        family => Box::new(GccToolchain::new(cc, family)),
    }
}

fn from_compiler_path(cc: PathBuf) -> Result<Box<dyn Toolchain>> {
    let family = detect_compiler_family(&cc)?;
    Ok(toolchain_for(family, Some(cc)))
}

/// Try to use an already configured MSVC environment.
#[cfg(target_os = "windows")]
fn try_detect_msvc() -> Result<Option<Box<dyn Toolchain>>> {
    use which::which;

    if let Ok(cl) = which("cl") {
        if std::env::var("INCLUDE").is_ok() && std::env::var("LIB").is_ok() {
            let link = which("link")
                .map_err(|_| anyhow::anyhow!("MSVC cl.exe found but link.exe not in PATH"))?;
            return Ok(Some(Box::new(MsvcToolchain::new(cl, link))));
        }
        tracing::debug!(
            "cl.exe found but INCLUDE/LIB are not set; run from a Developer Command Prompt"
        );
    }

    Ok(None)
}

/// Detect whether the compiler is GCC, Clang, Apple Clang or MSVC.
pub fn detect_compiler_family(cc: &Path) -> Result<ToolchainPlatform> {
    if let Some(family) = family_from_name(cc) {
        if family == ToolchainPlatform::Clang {
            return Ok(detect_clang_variant(cc));
        }
        return Ok(family);
    }

    // Try to detect from --version output
    let output = std::process::Command::new(cc).arg("--version").output();

    if let Ok(output) = output {
        let stdout = String::from_utf8_lossy(&output.stdout).to_lowercase();
        if stdout.contains("clang") {
            return Ok(if stdout.contains("apple") {
                ToolchainPlatform::AppleClang
            } else {
                ToolchainPlatform::Clang
            });
        } else if stdout.contains("gcc") || stdout.contains("free software foundation") {
            return Ok(ToolchainPlatform::Gcc);
        }
    }

    // Default to GCC
    Ok(ToolchainPlatform::Gcc)
}

fn family_from_name(cc: &Path) -> Option<ToolchainPlatform> {
    let name = cc
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase();

    if name == "cl" || name == "clang-cl" {
        Some(ToolchainPlatform::Msvc)
    } else if name.contains("clang") {
        Some(ToolchainPlatform::Clang)
    } else if name.contains("gcc") {
        Some(ToolchainPlatform::Gcc)
    } else {
        None
    }
}

/// Detect if Clang is Apple Clang or regular Clang.
fn detect_clang_variant(cc: &Path) -> ToolchainPlatform {
    let output = std::process::Command::new(cc).arg("--version").output();

    if let Ok(output) = output {
        let stdout = String::from_utf8_lossy(&output.stdout).to_lowercase();
        if stdout.contains("apple") {
            return ToolchainPlatform::AppleClang;
        }
    }

    ToolchainPlatform::Clang
}
