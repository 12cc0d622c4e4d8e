//! GCC/Clang toolchain implementation.

use std::path::{Path, PathBuf};

use super::{CommandSpec, CompileInput, LinkInput, Toolchain, ToolchainPlatform};

/// GCC/Clang toolchain (Unix-like systems).
#[derive(Debug, Clone)]
pub struct GccToolchain {
    /// Path to the C compiler driver
    pub cc: PathBuf,
    /// Compiler family (gcc, clang, apple-clang)
    pub family: ToolchainPlatform,
}

impl GccToolchain {
    pub fn new(cc: PathBuf, family: ToolchainPlatform) -> Self {
        GccToolchain { cc, family }
    }
}

impl Toolchain for GccToolchain {
    fn platform(&self) -> ToolchainPlatform {
        self.family
    }

    fn compiler_path(&self) -> &Path {
        &self.cc
    }

    fn compile_command(&self, input: &CompileInput) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.cc).arg("-c");

        if input.pic {
            cmd = cmd.arg("-fPIC");
        }

        for dir in &input.include_dirs {
            cmd = cmd.arg(format!("-I{}", dir.display()));
        }

        for define in &input.defines {
            cmd = cmd.arg(define.to_flag());
        }

        cmd.args(input.cflags.iter().cloned())
            .arg(input.source.display().to_string())
            .arg("-o")
            .arg(input.output.display().to_string())
    }

    fn link_shared_command(&self, input: &LinkInput) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.cc);

        // Extension modules resolve interpreter symbols at load time.
        if self.family == ToolchainPlatform::AppleClang {
            cmd = cmd.args(["-bundle", "-undefined", "dynamic_lookup"]);
        } else {
            cmd = cmd.arg("-shared");
        }

        cmd = cmd.arg("-o").arg(input.output.display().to_string());

        for obj in &input.objects {
            cmd = cmd.arg(obj.display().to_string());
        }

        cmd.args(input.ldflags.iter().cloned())
    }

    fn object_extension(&self) -> &str {
        "o"
    }
}
