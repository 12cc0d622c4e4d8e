//! MSVC toolchain implementation.

use std::path::{Path, PathBuf};

use super::{CommandSpec, CompileInput, LinkInput, Toolchain, ToolchainPlatform};

/// MSVC toolchain (Windows).
#[derive(Debug, Clone)]
pub struct MsvcToolchain {
    /// Path to cl.exe (compiler)
    pub cl: PathBuf,
    /// Path to link.exe (linker)
    pub link: PathBuf,
}

impl MsvcToolchain {
    pub fn new(cl: PathBuf, link: PathBuf) -> Self {
        MsvcToolchain { cl, link }
    }
}

impl Toolchain for MsvcToolchain {
    fn platform(&self) -> ToolchainPlatform {
        ToolchainPlatform::Msvc
    }

    fn compiler_path(&self) -> &Path {
        &self.cl
    }

    fn compile_command(&self, input: &CompileInput) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.cl).arg("/nologo").arg("/c");

        for dir in &input.include_dirs {
            cmd = cmd.arg(format!("/I{}", dir.display()));
        }

        for define in &input.defines {
            match &define.value {
                Some(v) => cmd = cmd.arg(format!("/D{}={}", define.name, v)),
                None => cmd = cmd.arg(format!("/D{}", define.name)),
            }
        }

        cmd.args(input.cflags.iter().cloned())
            .arg(input.source.display().to_string())
            .arg(format!("/Fo{}", input.output.display()))
    }

    fn link_shared_command(&self, input: &LinkInput) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.link)
            .arg("/nologo")
            .arg("/DLL")
            .arg(format!("/OUT:{}", input.output.display()));

        if let Some(symbol) = &input.export {
            cmd = cmd.arg(format!("/EXPORT:{}", symbol));
        }

        for obj in &input.objects {
            cmd = cmd.arg(obj.display().to_string());
        }

        cmd.args(input.ldflags.iter().cloned())
    }

    fn object_extension(&self) -> &str {
        "obj"
    }
}
